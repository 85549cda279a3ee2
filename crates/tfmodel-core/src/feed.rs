//! Synthetic feeds for driving a model without real data.
//!
//! Every input of a signature gets a nested value whose nesting follows the declared
//! shape, with each `-1` dimension bound to the caller's batch size. All leaves of one
//! input hold the same placeholder scalar, picked from the input's dtype:
//!
//! | dtype category | scalar |
//! |---|---|
//! | integer (any width, signed or unsigned) | `1` |
//! | boolean | `true` |
//! | string | `"A"` |
//! | floating point | `1.0` |
//! | anything else | `1.0` under [`UnknownDTypePolicy::Fallback`] (the default) |

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::{DType, DTypeCategory, IOName, Shape, TensorSpec};

/// Marker for a dimension bound at call time.
pub const UNBOUND_DIM: i64 = -1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("input {name}: invalid shape: {reason}")]
    InvalidShape { name: IOName, reason: String },
    #[error("duplicate operation name {0}")]
    DuplicateOperationName(IOName),
    #[error("input {name}: no placeholder value for dtype {dtype}")]
    UnknownDType { name: IOName, dtype: DType },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Bool(bool),
    Text(String),
    Float(f64),
}

impl Scalar {
    pub fn default_for(category: DTypeCategory) -> Self {
        match category {
            DTypeCategory::Integer => Scalar::Int(1),
            DTypeCategory::Boolean => Scalar::Bool(true),
            DTypeCategory::Text => Scalar::Text("A".to_string()),
            DTypeCategory::Floating => Scalar::Float(1.0),
            DTypeCategory::Unrecognized => Scalar::Float(1.0),
        }
    }
}

/// A nested placeholder value.
///
/// A sequence stores its element once behind an [`Arc`] together with its length,
/// so building a value costs one node per dimension regardless of element count.
/// Equality compares lengths and the shared element; serialization expands it.
#[derive(Clone, Debug, PartialEq)]
pub enum SyntheticValue {
    Scalar(Scalar),
    /// `len` copies of `item`.
    Repeat { len: usize, item: Arc<SyntheticValue> },
}

impl SyntheticValue {
    pub fn repeat(item: SyntheticValue, len: usize) -> Self {
        SyntheticValue::Repeat {
            len,
            item: Arc::new(item),
        }
    }

    /// Wraps `scalar` in one sequence per dim, innermost dim first.
    pub fn replicate(scalar: Scalar, dims: &[usize]) -> Self {
        dims.iter()
            .rev()
            .fold(SyntheticValue::Scalar(scalar), |inner, &d| {
                SyntheticValue::repeat(inner, d)
            })
    }

    /// Sequence length, `None` for a scalar.
    pub fn len(&self) -> Option<usize> {
        match self {
            SyntheticValue::Scalar(_) => None,
            SyntheticValue::Repeat { len, .. } => Some(*len),
        }
    }

    /// Element `index` of a sequence.
    pub fn get(&self, index: usize) -> Option<&SyntheticValue> {
        match self {
            SyntheticValue::Repeat { len, item } if index < *len => Some(item.as_ref()),
            _ => None,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            SyntheticValue::Scalar(_) => 0,
            SyntheticValue::Repeat { item, .. } => 1 + item.depth(),
        }
    }

    /// Sequence lengths from the outside in.
    pub fn shape(&self) -> Vec<usize> {
        let mut dims = Vec::new();
        let mut cur = self;
        while let SyntheticValue::Repeat { len, item } = cur {
            dims.push(*len);
            cur = item.as_ref();
        }
        dims
    }

    /// The replicated scalar, or `None` when some dimension is zero.
    pub fn leaf(&self) -> Option<&Scalar> {
        match self {
            SyntheticValue::Scalar(s) => Some(s),
            SyntheticValue::Repeat { len: 0, .. } => None,
            SyntheticValue::Repeat { item, .. } => item.leaf(),
        }
    }

    /// Nodes actually held in memory.
    pub fn stored_nodes(&self) -> usize {
        self.depth() + 1
    }
}

impl Serialize for SyntheticValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SyntheticValue::Scalar(scalar) => scalar.serialize(serializer),
            SyntheticValue::Repeat { len, item } => {
                let mut seq = serializer.serialize_seq(Some(*len))?;
                for _ in 0..*len {
                    seq.serialize_element(item.as_ref())?;
                }
                seq.end()
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    pub fn new(n: usize) -> Option<Self> {
        NonZeroUsize::new(n).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl From<NonZeroUsize> for BatchSize {
    fn from(n: NonZeroUsize) -> Self {
        Self(n)
    }
}

/// What to do with an input whose dtype has no placeholder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownDTypePolicy {
    /// Feed `1.0`.
    #[default]
    Fallback,
    Reject,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedEntry {
    pub dtype: DType,
    pub shape: Shape,
    pub value: SyntheticValue,
}

/// Synthetic values keyed by graph tensor name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedMap {
    entries: HashMap<IOName, FeedEntry>,
}

impl FeedMap {
    pub fn get(&self, name: &str) -> Option<&SyntheticValue> {
        self.entries.get(name).map(|e| &e.value)
    }

    pub fn entry(&self, name: &str) -> Option<&FeedEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IOName, &FeedEntry)> {
        self.entries.iter()
    }
}

#[derive(Clone, Debug)]
pub struct FeedBuilder {
    batch_size: BatchSize,
    unknown_dtype: UnknownDTypePolicy,
}

impl FeedBuilder {
    pub fn new(batch_size: BatchSize) -> Self {
        Self {
            batch_size,
            unknown_dtype: UnknownDTypePolicy::default(),
        }
    }

    pub fn unknown_dtype(mut self, policy: UnknownDTypePolicy) -> Self {
        self.unknown_dtype = policy;
        self
    }

    /// Builds one value per descriptor. Nothing is materialised until every
    /// descriptor has been checked.
    pub fn build(&self, descriptors: &[TensorSpec]) -> Result<FeedMap, FeedError> {
        let mut seen = HashSet::with_capacity(descriptors.len());
        let mut plans = Vec::with_capacity(descriptors.len());

        for desc in descriptors {
            if !seen.insert(&desc.name) {
                return Err(FeedError::DuplicateOperationName(desc.name.clone()));
            }
            let dims = self.resolve_dims(desc)?;
            let scalar = self.scalar_for(desc)?;
            plans.push((desc, dims, scalar));
        }

        let entries = plans
            .into_iter()
            .map(|(desc, dims, scalar)| {
                let value = SyntheticValue::replicate(scalar, &dims);
                let entry = FeedEntry {
                    dtype: desc.dtype,
                    shape: Shape::from_slice(&dims),
                    value,
                };
                (desc.name.clone(), entry)
            })
            .collect();

        Ok(FeedMap { entries })
    }

    fn resolve_dims(&self, desc: &TensorSpec) -> Result<Vec<usize>, FeedError> {
        let Some(dims) = &desc.dims else {
            return Err(FeedError::InvalidShape {
                name: desc.name.clone(),
                reason: "unknown rank".to_string(),
            });
        };

        dims.iter()
            .enumerate()
            .map(|(index, &dim)| {
                if dim == UNBOUND_DIM {
                    return Ok(self.batch_size.get());
                }
                usize::try_from(dim).map_err(|_| FeedError::InvalidShape {
                    name: desc.name.clone(),
                    reason: format!("dimension {index} is {dim}"),
                })
            })
            .collect()
    }

    fn scalar_for(&self, desc: &TensorSpec) -> Result<Scalar, FeedError> {
        let category = desc.dtype.category();
        if category == DTypeCategory::Unrecognized && self.unknown_dtype == UnknownDTypePolicy::Reject
        {
            return Err(FeedError::UnknownDType {
                name: desc.name.clone(),
                dtype: desc.dtype,
            });
        }
        Ok(Scalar::default_for(category))
    }
}

/// [`FeedBuilder`] with the default dtype policy.
pub fn build(descriptors: &[TensorSpec], batch_size: BatchSize) -> Result<FeedMap, FeedError> {
    FeedBuilder::new(batch_size).build(descriptors)
}
