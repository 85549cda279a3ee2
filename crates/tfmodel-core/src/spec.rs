use std::borrow::Borrow;
use std::fmt;

use serde::Serialize;

use crate::DType;

pub const DEFAULT_SIGNATURE: &str = "serving_default";

/// Graph tensor name, e.g. `Placeholder:0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IOName(pub String);

impl IOName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits `op:index` into the operation name and output index.
    /// A missing or non-numeric suffix means output 0 of the whole name.
    pub fn op_and_index(&self) -> (&str, i32) {
        match self.0.rsplit_once(':') {
            Some((op, idx)) => match idx.parse::<i32>() {
                Ok(idx) => (op, idx),
                Err(_) => (&self.0, 0),
            },
            None => (&self.0, 0),
        }
    }
}

impl fmt::Display for IOName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IOName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for IOName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for IOName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TensorSpec {
    /// Alias of the tensor inside its signature.
    pub key: String,
    pub name: IOName,
    pub dtype: DType,
    /// Declared dims, `-1` = bound per call. `None` = unknown rank.
    pub dims: Option<Vec<i64>>,
}

impl TensorSpec {
    pub fn new(key: impl Into<String>, name: impl Into<String>, dtype: DType, dims: &[i64]) -> Self {
        Self {
            key: key.into(),
            name: IOName::new(name),
            dtype,
            dims: Some(dims.to_vec()),
        }
    }

    pub fn shape_string(&self) -> String {
        match &self.dims {
            Some(dims) => format!("{dims:?}"),
            None => "<unknown>".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SignatureSpec {
    pub name: String,
    pub method_name: String,
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelSpec {
    pub tags: Vec<String>,
    pub signatures: Vec<SignatureSpec>,
    pub tensorflow_version: Option<String>,
}

impl ModelSpec {
    pub fn signature(&self, name: &str) -> Option<&SignatureSpec> {
        self.signatures.iter().find(|s| s.name == name)
    }

    /// `serving_default` when present, otherwise the first signature by name.
    pub fn default_signature(&self) -> Option<&SignatureSpec> {
        self.signature(DEFAULT_SIGNATURE).or_else(|| {
            self.signatures
                .iter()
                .min_by(|a, b| a.name.cmp(&b.name))
        })
    }
}
