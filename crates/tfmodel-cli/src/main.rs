mod cli;
mod table;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{BenchmarkArgs, Cli, Command};
use tfmodel_backend_tf::TfBackend;
use tfmodel_core::{
    Backend, BackendModel, BatchSize, LoadOptions, ModelArtifact, UnknownDTypePolicy,
    DEFAULT_SIGNATURE,
};
use tfmodel_runtime::{BenchPolicy, Benchmark};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log)?;

    let opts = LoadOptions { tags: cli.tags };
    match cli.command {
        Command::Validate { model } => validate(ModelArtifact::saved_model(model), &opts),
        Command::Inspect {
            model,
            signature,
            json,
        } => inspect(ModelArtifact::saved_model(model), &opts, signature, json),
        Command::Benchmark(args) => benchmark(args, &opts),
    }
}

fn init_logging(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter).context("invalid --log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn validate(artifact: ModelArtifact, opts: &LoadOptions) -> Result<()> {
    tracing::info!(model = %artifact.path().display(), "validating model");

    let problems = tfmodel_backend_tf::validate(&artifact, opts);
    if problems.is_empty() {
        tracing::info!("model is valid");
        return Ok(());
    }

    for problem in &problems {
        tracing::error!(%problem, "validation failed");
    }
    bail!("model is not valid ({} problem(s))", problems.len());
}

fn inspect(
    artifact: ModelArtifact,
    opts: &LoadOptions,
    signature: Option<String>,
    json: bool,
) -> Result<()> {
    tracing::info!(model = %artifact.path().display(), "inspecting model");

    let model = TfBackend::new().load(&artifact, opts)?;
    let spec = model.spec();

    match signature {
        Some(name) => {
            let sig = spec
                .signature(&name)
                .with_context(|| format!("signature not found: {name}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(sig)?);
            } else {
                print!("{}", table::render_signature(sig));
            }
        }
        None if json => println!("{}", serde_json::to_string_pretty(spec)?),
        None => print!("{}", table::render_model(spec)),
    }
    Ok(())
}

fn benchmark(args: BenchmarkArgs, opts: &LoadOptions) -> Result<()> {
    let backend = TfBackend::new();
    if !backend.capabilities().can_execute {
        bail!("benchmarking needs a build with `--features tensorflow`");
    }

    let batch_sizes = args
        .batch_sizes
        .iter()
        .map(|&n| BatchSize::new(n).context("batch sizes must be at least 1"))
        .collect::<Result<Vec<_>>>()?;
    let policy = BenchPolicy {
        batch_sizes,
        iterations: args.iterations,
        warmup: args.warmup,
        unknown_dtype: if args.strict_dtypes {
            UnknownDTypePolicy::Reject
        } else {
            UnknownDTypePolicy::Fallback
        },
    };

    let artifact = ModelArtifact::saved_model(args.model);
    tracing::info!(model = %artifact.path().display(), "benchmarking model");
    let mut model = backend.load(&artifact, opts)?;

    let signature = args
        .signature
        .unwrap_or_else(|| DEFAULT_SIGNATURE.to_string());
    let report = Benchmark::new(policy).run(&mut model, &signature)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", table::render_bench(&report));
    }

    if report.failures() == report.results.len() {
        bail!("every batch size failed");
    }
    Ok(())
}
