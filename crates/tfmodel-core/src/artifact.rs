use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

pub const SAVED_MODEL_PB: &str = "saved_model.pb";
pub const SAVED_MODEL_PBTXT: &str = "saved_model.pbtxt";

#[derive(Clone, Debug)]
pub enum ModelArtifact {
    /// A SavedModel export, or a base directory of numbered version exports.
    SavedModelDir(PathBuf),
}

/// A concrete export directory picked from a [`ModelArtifact`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedModel {
    pub export_dir: PathBuf,
    pub version: Option<u64>,
}

impl ResolvedModel {
    pub fn graph_path(&self) -> PathBuf {
        self.export_dir.join(SAVED_MODEL_PB)
    }
}

impl ModelArtifact {
    pub fn saved_model(path: impl Into<PathBuf>) -> Self {
        ModelArtifact::SavedModelDir(path.into())
    }

    pub fn path(&self) -> &Path {
        match self {
            ModelArtifact::SavedModelDir(p) => p,
        }
    }

    /// Version subdirectories holding a `saved_model.pb`, ascending.
    pub fn versions(&self) -> Result<Vec<u64>> {
        let base = self.path();
        let entries = fs::read_dir(base)
            .with_context(|| format!("failed to list model directory {}", base.display()))?;

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(version) = entry.file_name().to_str().and_then(|n| n.parse::<u64>().ok())
            else {
                continue;
            };
            if entry.path().join(SAVED_MODEL_PB).is_file() {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    pub fn resolve(&self) -> Result<ResolvedModel> {
        let base = self.path();
        if !base.exists() {
            bail!("model path does not exist: {}", base.display());
        }
        if !base.is_dir() {
            bail!("model path is not a directory: {}", base.display());
        }

        if base.join(SAVED_MODEL_PB).is_file() {
            return Ok(ResolvedModel {
                export_dir: base.to_path_buf(),
                version: None,
            });
        }
        if base.join(SAVED_MODEL_PBTXT).is_file() {
            bail!(
                "{} only has {SAVED_MODEL_PBTXT}; text SavedModels are not supported",
                base.display()
            );
        }

        match self.versions()?.last() {
            Some(&version) => Ok(ResolvedModel {
                export_dir: base.join(version.to_string()),
                version: Some(version),
            }),
            None => bail!(
                "no {SAVED_MODEL_PB} or version subdirectory found in {}",
                base.display()
            ),
        }
    }
}
