use std::path::Path;

use anyhow::{bail, Context, Result};
use half::f16;
use tensorflow::{
    BFloat16, FetchToken, Graph, Operation, SavedModelBundle, SessionOptions, SessionRunArgs, Tensor,
    TensorType,
};
use tfmodel_core::{DType, FeedEntry, FeedMap, OutputSummary, Scalar, Shape, SignatureSpec};
use tracing::debug;

pub struct TfSession {
    graph: Graph,
    bundle: SavedModelBundle,
}

impl TfSession {
    pub fn load(export_dir: &Path, tags: &[String]) -> Result<Self> {
        let mut graph = Graph::new();
        let bundle = SavedModelBundle::load(&SessionOptions::new(), tags, &mut graph, export_dir)
            .context("failed to load SavedModel into a TensorFlow session")?;
        Ok(Self { graph, bundle })
    }

    /// Converts `feed` into graph tensors for the inputs of `sig`.
    pub fn bind(&self, sig: &SignatureSpec, feed: &FeedMap) -> Result<BoundFeed> {
        let mut inputs = Vec::with_capacity(sig.inputs.len());
        for input in &sig.inputs {
            let entry = feed
                .entry(input.name.as_str())
                .with_context(|| format!("no feed for input {}", input.name))?;
            let (op, index) = self.operation(input.name.op_and_index())?;
            inputs.push((op, index, FeedTensor::from_entry(entry)?));
        }
        Ok(BoundFeed { inputs })
    }

    pub fn run(&self, sig: &SignatureSpec, feed: &BoundFeed) -> Result<Vec<OutputSummary>> {
        let mut args = SessionRunArgs::new();
        for (op, index, tensor) in &feed.inputs {
            tensor.add_to(&mut args, op, *index);
        }

        let mut fetches = Vec::with_capacity(sig.outputs.len());
        for output in &sig.outputs {
            let (op, index) = self.operation(output.name.op_and_index())?;
            fetches.push((output, args.request_fetch(&op, index)));
        }

        self.bundle
            .session
            .run(&mut args)
            .with_context(|| format!("session run failed for signature {}", sig.name))?;

        let mut summaries = Vec::with_capacity(fetches.len());
        for (output, token) in fetches {
            let dims = fetch_dims(&mut args, token, output.dtype)?;
            let shape = dims.iter().map(|&d| d as usize).collect::<Vec<_>>();
            debug!(output = %output.name, shape = ?shape, "fetched output");
            summaries.push(OutputSummary {
                name: output.name.clone(),
                dtype: output.dtype,
                shape: Shape::from_slice(&shape),
            });
        }
        Ok(summaries)
    }

    fn operation(&self, (name, index): (&str, i32)) -> Result<(Operation, i32)> {
        let op = self
            .graph
            .operation_by_name_required(name)
            .with_context(|| format!("operation not found in graph: {name}"))?;
        Ok((op, index))
    }
}

/// Session-ready input tensors.
pub struct BoundFeed {
    inputs: Vec<(Operation, i32, FeedTensor)>,
}

enum FeedTensor {
    F32(Tensor<f32>),
    F64(Tensor<f64>),
    F16(Tensor<f16>),
    BF16(Tensor<BFloat16>),
    I8(Tensor<i8>),
    I16(Tensor<i16>),
    I32(Tensor<i32>),
    I64(Tensor<i64>),
    U8(Tensor<u8>),
    U16(Tensor<u16>),
    U32(Tensor<u32>),
    U64(Tensor<u64>),
    Bool(Tensor<bool>),
    Str(Tensor<String>),
}

impl FeedTensor {
    fn from_entry(entry: &FeedEntry) -> Result<Self> {
        let scalar = entry
            .value
            .leaf()
            .cloned()
            .unwrap_or_else(|| Scalar::default_for(entry.dtype.category()));
        let shape = &entry.shape;

        let tensor = match (entry.dtype, scalar) {
            (DType::F32, Scalar::Float(v)) => FeedTensor::F32(filled(shape, v as f32)?),
            (DType::F64, Scalar::Float(v)) => FeedTensor::F64(filled(shape, v)?),
            (DType::F16, Scalar::Float(v)) => FeedTensor::F16(filled(shape, f16::from_f64(v))?),
            (DType::BF16, Scalar::Float(v)) => {
                FeedTensor::BF16(filled(shape, BFloat16::from(v as f32))?)
            }
            (DType::I8, Scalar::Int(v)) => FeedTensor::I8(filled(shape, v as i8)?),
            (DType::I16, Scalar::Int(v)) => FeedTensor::I16(filled(shape, v as i16)?),
            (DType::I32, Scalar::Int(v)) => FeedTensor::I32(filled(shape, v as i32)?),
            (DType::I64, Scalar::Int(v)) => FeedTensor::I64(filled(shape, v)?),
            (DType::U8, Scalar::Int(v)) => FeedTensor::U8(filled(shape, v as u8)?),
            (DType::U16, Scalar::Int(v)) => FeedTensor::U16(filled(shape, v as u16)?),
            (DType::U32, Scalar::Int(v)) => FeedTensor::U32(filled(shape, v as u32)?),
            (DType::U64, Scalar::Int(v)) => FeedTensor::U64(filled(shape, v as u64)?),
            (DType::Bool, Scalar::Bool(v)) => FeedTensor::Bool(filled(shape, v)?),
            (DType::String, Scalar::Text(v)) => FeedTensor::Str(filled(shape, v)?),
            (dtype, scalar) => bail!("cannot feed {scalar:?} as {dtype}"),
        };
        Ok(tensor)
    }

    fn add_to<'l>(&'l self, args: &mut SessionRunArgs<'l>, op: &Operation, index: i32) {
        match self {
            FeedTensor::F32(t) => args.add_feed(op, index, t),
            FeedTensor::F64(t) => args.add_feed(op, index, t),
            FeedTensor::F16(t) => args.add_feed(op, index, t),
            FeedTensor::BF16(t) => args.add_feed(op, index, t),
            FeedTensor::I8(t) => args.add_feed(op, index, t),
            FeedTensor::I16(t) => args.add_feed(op, index, t),
            FeedTensor::I32(t) => args.add_feed(op, index, t),
            FeedTensor::I64(t) => args.add_feed(op, index, t),
            FeedTensor::U8(t) => args.add_feed(op, index, t),
            FeedTensor::U16(t) => args.add_feed(op, index, t),
            FeedTensor::U32(t) => args.add_feed(op, index, t),
            FeedTensor::U64(t) => args.add_feed(op, index, t),
            FeedTensor::Bool(t) => args.add_feed(op, index, t),
            FeedTensor::Str(t) => args.add_feed(op, index, t),
        }
    }
}

fn filled<T: TensorType + Clone>(shape: &Shape, value: T) -> Result<Tensor<T>> {
    let dims = shape.0.iter().map(|&d| d as u64).collect::<Vec<_>>();
    let values = vec![value; shape.numel()];
    Ok(Tensor::new(&dims).with_values(&values)?)
}

fn fetch_dims(args: &mut SessionRunArgs<'_>, token: FetchToken, dtype: DType) -> Result<Vec<u64>> {
    macro_rules! dims {
        ($t:ty) => {
            args.fetch::<$t>(token)?.dims().to_vec()
        };
    }

    let dims = match dtype {
        DType::F32 => dims!(f32),
        DType::F64 => dims!(f64),
        DType::F16 => dims!(f16),
        DType::BF16 => dims!(BFloat16),
        DType::I8 => dims!(i8),
        DType::I16 => dims!(i16),
        DType::I32 => dims!(i32),
        DType::I64 => dims!(i64),
        DType::U8 => dims!(u8),
        DType::U16 => dims!(u16),
        DType::U32 => dims!(u32),
        DType::U64 => dims!(u64),
        DType::Bool => dims!(bool),
        DType::String => dims!(String),
        other => bail!("fetching {other} outputs is not supported"),
    };
    Ok(dims)
}
