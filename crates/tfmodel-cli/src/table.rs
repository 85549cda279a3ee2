use std::fmt::Write;

use tfmodel_core::{ModelSpec, SignatureSpec, TensorSpec};
use tfmodel_runtime::{BenchOutcome, BenchReport};

const TENSOR_HEADER: [&str; 4] = ["Key", "Tensor", "DType", "Shape"];
const BENCH_HEADER: [&str; 5] = ["Batch", "Latency (ms)", "Runs/s", "Samples/s", "Status"];

/// Plain-text table with columns sized to their widest cell.
pub fn render(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = header.iter().map(|h| h.len()).collect::<Vec<_>>();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let rule = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let rule = format!("+{rule}+\n");

    let mut out = rule.clone();
    out.push_str(&line(header.iter().copied(), &widths));
    out.push_str(&rule);
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str), &widths));
    }
    if !rows.is_empty() {
        out.push_str(&rule);
    }
    out
}

fn line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut out = String::from("|");
    for (cell, &w) in cells.zip(widths) {
        let _ = write!(out, " {cell:<w$} |");
    }
    out.push('\n');
    out
}

fn tensor_rows(tensors: &[TensorSpec]) -> Vec<Vec<String>> {
    tensors
        .iter()
        .map(|t| {
            vec![
                t.key.clone(),
                t.name.to_string(),
                t.dtype.to_string(),
                t.shape_string(),
            ]
        })
        .collect()
}

pub fn render_signature(sig: &SignatureSpec) -> String {
    let mut out = format!("Signature: {} ({})\n", sig.name, sig.method_name);
    out.push_str("Inputs:\n");
    out.push_str(&render(&TENSOR_HEADER, &tensor_rows(&sig.inputs)));
    out.push_str("Outputs:\n");
    out.push_str(&render(&TENSOR_HEADER, &tensor_rows(&sig.outputs)));
    out
}

pub fn render_model(spec: &ModelSpec) -> String {
    let mut out = format!("Tags: {}\n", spec.tags.join(", "));
    if let Some(version) = &spec.tensorflow_version {
        let _ = writeln!(out, "TensorFlow version: {version}");
    }
    for sig in &spec.signatures {
        out.push('\n');
        out.push_str(&render_signature(sig));
    }
    out
}

pub fn render_bench(report: &BenchReport) -> String {
    let rows = report
        .results
        .iter()
        .map(|r| match &r.outcome {
            BenchOutcome::Ok(stats) => vec![
                r.batch_size.to_string(),
                format!("{:.3}", stats.mean_latency_ms),
                format!("{:.2}", stats.throughput),
                format!("{:.2}", stats.samples_per_sec),
                "ok".to_string(),
            ],
            BenchOutcome::Failed { error } => vec![
                r.batch_size.to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                format!("failed: {error}"),
            ],
        })
        .collect::<Vec<_>>();

    format!(
        "Signature: {}\n{}",
        report.signature,
        render(&BENCH_HEADER, &rows)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfmodel_core::DType;

    #[test]
    fn columns_fit_the_widest_cell() {
        let table = render(
            &["A", "B"],
            &[vec!["long cell".to_string(), "x".to_string()]],
        );
        let lines = table.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "+-----------+---+");
        assert_eq!(lines[1], "| A         | B |");
        assert_eq!(lines[3], "| long cell | x |");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn signature_table_lists_tensors() {
        let sig = SignatureSpec {
            name: "serving_default".to_string(),
            method_name: "tensorflow/serving/predict".to_string(),
            inputs: vec![TensorSpec::new("x", "Placeholder:0", DType::F32, &[-1, 9])],
            outputs: Vec::new(),
        };

        let out = render_signature(&sig);

        assert!(out.starts_with("Signature: serving_default (tensorflow/serving/predict)"));
        assert!(out.contains("| x   | Placeholder:0 | DT_FLOAT | [-1, 9] |"), "{out}");
    }
}
