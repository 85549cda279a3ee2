use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use prost::Message;
use tfmodel_core::{
    Backend, BackendCapabilities, BackendModel, DType, FeedMap, IOName, LoadOptions,
    ModelArtifact, ModelSpec, OutputSummary, ResolvedModel, SignatureSpec, TensorSpec,
    UNBOUND_DIM,
};
use tracing::{debug, info};

pub mod proto;
#[cfg(feature = "tensorflow")]
mod session;

pub struct TfBackend;

impl TfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TfBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TfModel {
    spec: ModelSpec,
    export: ResolvedModel,
    /// Opened by `prepare` or the first inference.
    #[cfg(feature = "tensorflow")]
    session: Option<session::TfSession>,
    /// Last prepared signature and feed, with its converted tensors.
    #[cfg(feature = "tensorflow")]
    bound: Option<(String, FeedMap, session::BoundFeed)>,
    #[cfg(feature = "tensorflow")]
    tags: Vec<String>,
}

impl TfModel {
    pub fn export(&self) -> &ResolvedModel {
        &self.export
    }
}

impl Backend for TfBackend {
    type Model = TfModel;

    fn name(&self) -> &'static str {
        "tensorflow-savedmodel"
    }

    fn load(&self, artifact: &ModelArtifact, opts: &LoadOptions) -> Result<Self::Model> {
        let export = artifact.resolve()?;
        info!(
            export_dir = %export.export_dir.display(),
            version = ?export.version,
            "loading SavedModel"
        );

        let saved = read_saved_model(&export.graph_path())?;
        let meta = select_meta_graph(&saved, &opts.tags)?;
        let spec = build_model_spec(meta);
        debug!(signatures = spec.signatures.len(), "parsed signatures");

        Ok(TfModel {
            spec,
            export,
            #[cfg(feature = "tensorflow")]
            session: None,
            #[cfg(feature = "tensorflow")]
            bound: None,
            #[cfg(feature = "tensorflow")]
            tags: opts.tags.clone(),
        })
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            can_execute: cfg!(feature = "tensorflow"),
        }
    }
}

impl BackendModel for TfModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn prepare(&mut self, signature: &str, feed: &FeedMap) -> Result<()> {
        let sig = self
            .spec
            .signature(signature)
            .with_context(|| format!("signature not found: {signature}"))?;

        #[cfg(feature = "tensorflow")]
        {
            let session = open_session(&mut self.session, &self.export, &self.tags)?;
            let bound = session.bind(sig, feed)?;
            self.bound = Some((sig.name.clone(), feed.clone(), bound));
            Ok(())
        }
        #[cfg(not(feature = "tensorflow"))]
        {
            let _ = feed;
            Err(execution_unavailable(sig))
        }
    }

    fn infer(&mut self, signature: &str, feed: &FeedMap) -> Result<Vec<OutputSummary>> {
        let sig = self
            .spec
            .signature(signature)
            .with_context(|| format!("signature not found: {signature}"))?;

        #[cfg(feature = "tensorflow")]
        {
            let session = open_session(&mut self.session, &self.export, &self.tags)?;
            match &self.bound {
                Some((name, prepared, bound)) if *name == sig.name && prepared == feed => {
                    session.run(sig, bound)
                }
                _ => session.run(sig, &session.bind(sig, feed)?),
            }
        }
        #[cfg(not(feature = "tensorflow"))]
        {
            let _ = feed;
            Err(execution_unavailable(sig))
        }
    }
}

#[cfg(feature = "tensorflow")]
fn open_session<'a>(
    slot: &'a mut Option<session::TfSession>,
    export: &ResolvedModel,
    tags: &[String],
) -> Result<&'a session::TfSession> {
    if slot.is_none() {
        info!(export_dir = %export.export_dir.display(), "opening TensorFlow session");
        *slot = Some(session::TfSession::load(&export.export_dir, tags)?);
    }
    slot.as_ref().context("TensorFlow session is not open")
}

#[cfg(not(feature = "tensorflow"))]
fn execution_unavailable(sig: &SignatureSpec) -> anyhow::Error {
    anyhow::anyhow!(
        "cannot run signature {}: tfmodel-backend-tf was built without the `tensorflow` feature",
        sig.name
    )
}

/// Loads the model and reports every problem that would make it unusable.
/// An empty list means the model is valid.
pub fn validate(artifact: &ModelArtifact, opts: &LoadOptions) -> Vec<String> {
    match TfBackend::new().load(artifact, opts) {
        Ok(model) => validate_spec(model.spec()),
        Err(err) => vec![format!("{err:#}")],
    }
}

pub fn validate_spec(spec: &ModelSpec) -> Vec<String> {
    let mut problems = Vec::new();
    if spec.signatures.is_empty() {
        problems.push("model has no signatures".to_string());
    }

    for sig in &spec.signatures {
        let tensors = sig
            .inputs
            .iter()
            .map(|t| ("input", t))
            .chain(sig.outputs.iter().map(|t| ("output", t)));
        for (kind, tensor) in tensors {
            if tensor.name.as_str().is_empty() {
                problems.push(format!(
                    "signature {}: {kind} {} has no dense tensor name",
                    sig.name, tensor.key
                ));
            }
            if let Some(dims) = &tensor.dims {
                if let Some(dim) = dims.iter().find(|d| **d < UNBOUND_DIM) {
                    problems.push(format!(
                        "signature {}: {kind} {} has invalid dimension {dim}",
                        sig.name, tensor.key
                    ));
                }
            }
        }
    }
    problems
}

pub fn read_saved_model(path: &Path) -> Result<proto::SavedModel> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    proto::SavedModel::decode(bytes.as_slice())
        .with_context(|| format!("failed to decode {}", path.display()))
}

/// First meta graph carrying every requested tag.
pub fn select_meta_graph<'a>(
    saved: &'a proto::SavedModel,
    tags: &[String],
) -> Result<&'a proto::MetaGraphDef> {
    if saved.meta_graphs.is_empty() {
        bail!("SavedModel contains no meta graphs");
    }

    let found = saved.meta_graphs.iter().find(|meta| {
        let meta_tags = meta_tags(meta);
        tags.iter().all(|t| meta_tags.contains(t))
    });

    match found {
        Some(meta) => Ok(meta),
        None => {
            let available = saved
                .meta_graphs
                .iter()
                .map(|meta| format!("{:?}", meta_tags(meta)))
                .collect::<Vec<_>>()
                .join(", ");
            bail!("no meta graph with tags {tags:?} (available: {available})")
        }
    }
}

fn meta_tags(meta: &proto::MetaGraphDef) -> &[String] {
    meta.meta_info_def
        .as_ref()
        .map(|info| info.tags.as_slice())
        .unwrap_or_default()
}

pub fn build_model_spec(meta: &proto::MetaGraphDef) -> ModelSpec {
    let mut signatures = meta
        .signature_def
        .iter()
        .map(|(name, def)| SignatureSpec {
            name: name.clone(),
            method_name: def.method_name.clone(),
            inputs: tensor_specs(&def.inputs),
            outputs: tensor_specs(&def.outputs),
        })
        .collect::<Vec<_>>();
    signatures.sort_by(|a, b| a.name.cmp(&b.name));

    let tensorflow_version = meta
        .meta_info_def
        .as_ref()
        .map(|info| info.tensorflow_version.clone())
        .filter(|v| !v.is_empty());

    ModelSpec {
        tags: meta_tags(meta).to_vec(),
        signatures,
        tensorflow_version,
    }
}

fn tensor_specs(infos: &HashMap<String, proto::TensorInfo>) -> Vec<TensorSpec> {
    let mut specs = infos
        .iter()
        .map(|(key, info)| tensor_spec_from_info(key, info))
        .collect::<Vec<_>>();
    specs.sort_by(|a, b| a.key.cmp(&b.key));
    specs
}

fn tensor_spec_from_info(key: &str, info: &proto::TensorInfo) -> TensorSpec {
    let dims = match &info.tensor_shape {
        Some(shape) if shape.unknown_rank => None,
        Some(shape) => Some(shape.dim.iter().map(|d| d.size).collect()),
        // An absent shape proto is a scalar.
        None => Some(Vec::new()),
    };

    TensorSpec {
        key: key.to_string(),
        name: IOName(info.name.clone()),
        dtype: DType::from_code(info.dtype),
        dims,
    }
}
