use anyhow::Result;
use serde::Serialize;

use crate::{DType, FeedMap, IOName, ModelArtifact, ModelSpec, Shape};

#[derive(Clone, Copy, Debug)]
pub struct BackendCapabilities {
    /// False when the backend can only read signatures.
    pub can_execute: bool,
}

#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Meta graph tags that must all be present, e.g. `serve`.
    pub tags: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            tags: vec!["serve".to_string()],
        }
    }
}

/// Dtype and shape of one fetched output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputSummary {
    pub name: IOName,
    pub dtype: DType,
    pub shape: Shape,
}

pub trait Backend: Send + Sync + 'static {
    type Model: BackendModel;

    fn name(&self) -> &'static str;
    fn load(&self, artifact: &ModelArtifact, opts: &LoadOptions) -> Result<Self::Model>;
    fn capabilities(&self) -> BackendCapabilities;
}

pub trait BackendModel: Send + 'static {
    fn spec(&self) -> &ModelSpec;

    /// Does the one-off work for running `signature` with `feed`: opening the
    /// session and converting the feed. Later `infer` calls with an equal feed reuse it.
    fn prepare(&mut self, _signature: &str, _feed: &FeedMap) -> Result<()> {
        Ok(())
    }

    /// Runs `signature` once, feeding every entry of `feed` and fetching all outputs.
    fn infer(&mut self, signature: &str, feed: &FeedMap) -> Result<Vec<OutputSummary>>;
}
