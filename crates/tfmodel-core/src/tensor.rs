use std::fmt;

use serde::{Serialize, Serializer};
use smallvec::SmallVec;

/// Element type of a tensor, keyed by the TensorFlow `DataType` code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
    I32,
    U8,
    I16,
    I8,
    String,
    Complex64,
    I64,
    Bool,
    QI8,
    QU8,
    QI32,
    BF16,
    QI16,
    QU16,
    U16,
    Complex128,
    F16,
    Resource,
    Variant,
    U32,
    U64,
    /// A code this table does not know about.
    Unknown(i32),
}

/// Coarse grouping used to pick a placeholder scalar for a dtype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DTypeCategory {
    Integer,
    Boolean,
    Text,
    Floating,
    Unrecognized,
}

const DTYPE_TABLE: &[(i32, DType, &str)] = &[
    (1, DType::F32, "DT_FLOAT"),
    (2, DType::F64, "DT_DOUBLE"),
    (3, DType::I32, "DT_INT32"),
    (4, DType::U8, "DT_UINT8"),
    (5, DType::I16, "DT_INT16"),
    (6, DType::I8, "DT_INT8"),
    (7, DType::String, "DT_STRING"),
    (8, DType::Complex64, "DT_COMPLEX64"),
    (9, DType::I64, "DT_INT64"),
    (10, DType::Bool, "DT_BOOL"),
    (11, DType::QI8, "DT_QINT8"),
    (12, DType::QU8, "DT_QUINT8"),
    (13, DType::QI32, "DT_QINT32"),
    (14, DType::BF16, "DT_BFLOAT16"),
    (15, DType::QI16, "DT_QINT16"),
    (16, DType::QU16, "DT_QUINT16"),
    (17, DType::U16, "DT_UINT16"),
    (18, DType::Complex128, "DT_COMPLEX128"),
    (19, DType::F16, "DT_HALF"),
    (20, DType::Resource, "DT_RESOURCE"),
    (21, DType::Variant, "DT_VARIANT"),
    (22, DType::U32, "DT_UINT32"),
    (23, DType::U64, "DT_UINT64"),
];

impl DType {
    pub fn from_code(code: i32) -> Self {
        DTYPE_TABLE
            .iter()
            .find(|(c, _, _)| *c == code)
            .map(|(_, dtype, _)| *dtype)
            .unwrap_or(DType::Unknown(code))
    }

    pub fn code(self) -> i32 {
        if let DType::Unknown(code) = self {
            return code;
        }
        DTYPE_TABLE
            .iter()
            .find(|(_, dtype, _)| *dtype == self)
            .map(|(c, _, _)| *c)
            .unwrap_or(0)
    }

    pub fn category(self) -> DTypeCategory {
        match self {
            DType::I8
            | DType::U8
            | DType::I16
            | DType::U16
            | DType::I32
            | DType::U32
            | DType::I64
            | DType::U64 => DTypeCategory::Integer,
            DType::Bool => DTypeCategory::Boolean,
            DType::String => DTypeCategory::Text,
            DType::F16 | DType::BF16 | DType::F32 | DType::F64 => DTypeCategory::Floating,
            DType::Complex64
            | DType::Complex128
            | DType::QI8
            | DType::QU8
            | DType::QI16
            | DType::QU16
            | DType::QI32
            | DType::Resource
            | DType::Variant
            | DType::Unknown(_) => DTypeCategory::Unrecognized,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let DType::Unknown(code) = self {
            return write!(f, "DT_UNKNOWN({code})");
        }
        let name = DTYPE_TABLE
            .iter()
            .find(|(_, dtype, _)| dtype == self)
            .map(|(_, _, name)| *name)
            .unwrap_or("DT_INVALID");
        f.write_str(name)
    }
}

impl Serialize for DType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A fully resolved shape, outermost dimension first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }
    pub fn rank(&self) -> usize {
        self.0.len()
    }
    pub fn numel(&self) -> usize {
        self.0.iter().product::<usize>()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0.as_slice())
    }
}
