use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use prost::Message;
use tfmodel_backend_tf::proto::{
    tensor_shape_proto::Dim, MetaGraphDef, MetaInfoDef, SavedModel, SignatureDef, TensorInfo,
    TensorShapeProto,
};
use tfmodel_backend_tf::{validate, validate_spec, TfBackend};
use tfmodel_core::{Backend, BackendModel, DType, LoadOptions, ModelArtifact};

fn tensor(name: &str, dtype: i32, dims: &[i64]) -> TensorInfo {
    TensorInfo {
        name: name.to_string(),
        dtype,
        tensor_shape: Some(TensorShapeProto {
            dim: dims
                .iter()
                .map(|&size| Dim {
                    size,
                    name: String::new(),
                })
                .collect(),
            unknown_rank: false,
        }),
    }
}

fn meta_graph(tags: &[&str], signatures: Vec<(&str, SignatureDef)>) -> MetaGraphDef {
    MetaGraphDef {
        meta_info_def: Some(MetaInfoDef {
            meta_graph_version: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            tensorflow_version: "1.4.0".to_string(),
            tensorflow_git_version: String::new(),
        }),
        signature_def: signatures
            .into_iter()
            .map(|(name, def)| (name.to_string(), def))
            .collect(),
    }
}

fn predict_signature() -> SignatureDef {
    SignatureDef {
        inputs: HashMap::from([
            ("keys".to_string(), tensor("Placeholder_1:0", 10, &[-1])),
            ("features".to_string(), tensor("Placeholder:0", 1, &[-1, 9])),
        ]),
        outputs: HashMap::from([("softmax".to_string(), tensor("Softmax:0", 1, &[-1, 2]))]),
        method_name: "tensorflow/serving/predict".to_string(),
    }
}

fn write_model(dir: &Path, model: &SavedModel) -> Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("saved_model.pb"), model.encode_to_vec())?;
    Ok(())
}

fn serving_model() -> SavedModel {
    SavedModel {
        saved_model_schema_version: 1,
        meta_graphs: vec![
            meta_graph(&["train"], Vec::new()),
            meta_graph(&["serve"], vec![("serving_default", predict_signature())]),
        ],
    }
}

#[test]
fn reads_signatures_from_latest_version() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_model(&tmp.path().join("1"), &SavedModel::default())?;
    write_model(&tmp.path().join("2"), &serving_model())?;

    let model = TfBackend::new().load(
        &ModelArtifact::saved_model(tmp.path()),
        &LoadOptions::default(),
    )?;
    assert_eq!(model.export().version, Some(2));

    let spec = model.spec();
    assert_eq!(spec.tags, vec!["serve".to_string()]);
    assert_eq!(spec.tensorflow_version.as_deref(), Some("1.4.0"));

    let sig = spec.signature("serving_default").context("missing signature")?;
    assert_eq!(sig.method_name, "tensorflow/serving/predict");

    let keys = sig.inputs.iter().map(|t| t.key.as_str()).collect::<Vec<_>>();
    assert_eq!(keys, vec!["features", "keys"]);

    let features = &sig.inputs[0];
    assert_eq!(features.name.as_str(), "Placeholder:0");
    assert_eq!(features.dtype, DType::F32);
    assert_eq!(features.dims, Some(vec![-1, 9]));

    assert_eq!(sig.inputs[1].dtype, DType::Bool);
    assert_eq!(sig.outputs[0].name.as_str(), "Softmax:0");
    Ok(())
}

#[test]
fn missing_tags_are_reported() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_model(tmp.path(), &serving_model())?;

    let opts = LoadOptions {
        tags: vec!["gpu".to_string()],
    };
    let err = match TfBackend::new().load(&ModelArtifact::saved_model(tmp.path()), &opts) {
        Ok(_) => anyhow::bail!("load should fail for unknown tags"),
        Err(err) => err,
    };

    let msg = err.to_string();
    assert!(msg.contains("no meta graph with tags"), "{msg}");
    assert!(msg.contains("serve"), "{msg}");
    Ok(())
}

#[test]
fn unknown_rank_and_missing_shape() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let mut sig = predict_signature();
    sig.inputs.insert(
        "anything".to_string(),
        TensorInfo {
            name: "Any:0".to_string(),
            dtype: 7,
            tensor_shape: Some(TensorShapeProto {
                dim: Vec::new(),
                unknown_rank: true,
            }),
        },
    );
    sig.inputs.insert(
        "rate".to_string(),
        TensorInfo {
            name: "rate:0".to_string(),
            dtype: 1,
            tensor_shape: None,
        },
    );
    let model = SavedModel {
        saved_model_schema_version: 1,
        meta_graphs: vec![meta_graph(&["serve"], vec![("predict", sig)])],
    };
    write_model(tmp.path(), &model)?;

    let model = TfBackend::new().load(
        &ModelArtifact::saved_model(tmp.path()),
        &LoadOptions::default(),
    )?;
    let sig = model.spec().default_signature().context("missing signature")?;

    assert_eq!(sig.name, "predict");
    assert_eq!(sig.inputs[0].key, "anything");
    assert_eq!(sig.inputs[0].dims, None);
    assert_eq!(sig.inputs[0].dtype, DType::String);
    let rate = sig.inputs.iter().find(|t| t.key == "rate").context("missing rate")?;
    assert_eq!(rate.dims, Some(Vec::new()));
    Ok(())
}

#[test]
fn valid_model_has_no_problems() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_model(tmp.path(), &serving_model())?;

    let problems = validate(&ModelArtifact::saved_model(tmp.path()), &LoadOptions::default());
    assert!(problems.is_empty(), "{problems:?}");
    Ok(())
}

#[test]
fn validation_collects_problems() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let mut sig = predict_signature();
    sig.inputs
        .insert("broken".to_string(), tensor("Broken:0", 1, &[-2, 3]));
    sig.outputs.insert("sparse".to_string(), tensor("", 9, &[-1]));
    let model = SavedModel {
        saved_model_schema_version: 1,
        meta_graphs: vec![meta_graph(&["serve"], vec![("serving_default", sig)])],
    };
    write_model(tmp.path(), &model)?;

    let loaded = TfBackend::new().load(
        &ModelArtifact::saved_model(tmp.path()),
        &LoadOptions::default(),
    )?;
    let problems = validate_spec(loaded.spec());

    assert_eq!(problems.len(), 2, "{problems:?}");
    assert!(problems.iter().any(|p| p.contains("invalid dimension -2")));
    assert!(problems.iter().any(|p| p.contains("no dense tensor name")));
    Ok(())
}

#[test]
fn garbage_graph_is_invalid() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    fs::write(tmp.path().join("saved_model.pb"), [0xff, 0xff, 0xff])?;

    let problems = validate(&ModelArtifact::saved_model(tmp.path()), &LoadOptions::default());
    assert_eq!(problems.len(), 1);
    assert!(problems[0].contains("failed to decode"), "{problems:?}");
    Ok(())
}

#[test]
fn model_without_signatures_is_invalid() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let model = SavedModel {
        saved_model_schema_version: 1,
        meta_graphs: vec![meta_graph(&["serve"], Vec::new())],
    };
    write_model(tmp.path(), &model)?;

    let problems = validate(&ModelArtifact::saved_model(tmp.path()), &LoadOptions::default());
    assert_eq!(problems, vec!["model has no signatures".to_string()]);
    Ok(())
}

#[cfg(not(feature = "tensorflow"))]
#[test]
fn inference_needs_the_tensorflow_feature() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_model(tmp.path(), &serving_model())?;

    let backend = TfBackend::new();
    assert!(!backend.capabilities().can_execute);

    let mut model = backend.load(
        &ModelArtifact::saved_model(tmp.path()),
        &LoadOptions::default(),
    )?;
    let err = model
        .prepare("serving_default", &Default::default())
        .expect_err("prepare must fail without the tensorflow feature");
    assert!(err.to_string().contains("`tensorflow` feature"));

    let err = model
        .infer("serving_default", &Default::default())
        .expect_err("inference must fail without the tensorflow feature");
    assert!(err.to_string().contains("`tensorflow` feature"));
    Ok(())
}
