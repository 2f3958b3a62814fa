//! Core data model types shared by importers, the reconciler and the store boundary.
//!
//! An importer describes its records as a list of typed, shaped fields ([`ColumnSpec`]) and
//! yields each record as a [`Record`]: one [`Tensor`] per field, in the same order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Element type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// Unsigned 8-bit integer.
    UInt8,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating point number.
    Float32,
    /// 64-bit floating point number.
    Float64,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UInt8 => "uint8",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        };
        f.write_str(s)
    }
}

/// Fixed shape of a single column entry. The empty shape is a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self(dims.into())
    }

    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of elements an entry of this shape holds.
    pub fn element_count(&self) -> usize {
        self.0.iter().product()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, ")")
    }
}

/// Description of one column: what the reconciler asks the store to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name, unique within an importer.
    pub name: String,
    /// Element type of every entry.
    pub dtype: ElementType,
    /// Shape of every entry (upper bound when `variable_shape` is set).
    pub shape: Shape,
    /// Whether entries may have any shape.
    pub variable_shape: bool,
}

impl ColumnSpec {
    pub fn new(
        name: impl Into<String>,
        dtype: ElementType,
        shape: Shape,
        variable_shape: bool,
    ) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape,
            variable_shape,
        }
    }

    /// Returns `None` if `value` may be stored in this column, or a description of the mismatch.
    pub fn mismatch(&self, value: &Tensor) -> Option<String> {
        if value.dtype() != self.dtype {
            return Some(format!("expected dtype {}, got {}", self.dtype, value.dtype()));
        }
        if !self.variable_shape && value.shape() != &self.shape {
            return Some(format!("expected shape {}, got {}", self.shape, value.shape()));
        }
        None
    }
}

/// Flat element storage of a [`Tensor`].
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    UInt8(Vec<u8>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl TensorData {
    pub fn dtype(&self) -> ElementType {
        match self {
            Self::UInt8(_) => ElementType::UInt8,
            Self::Int64(_) => ElementType::Int64,
            Self::Float32(_) => ElementType::Float32,
            Self::Float64(_) => ElementType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::UInt8(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Little-endian byte image of the elements, used for content digests.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            Self::UInt8(v) => v.clone(),
            Self::Int64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::Float32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::Float64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }
}

/// A dense, row-major, typed array: the value of one field of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: TensorData,
}

impl Tensor {
    /// Create a tensor. Returns `None` if the element count does not match the shape.
    pub fn new(shape: Shape, data: TensorData) -> Option<Self> {
        (shape.element_count() == data.len()).then_some(Self { shape, data })
    }

    /// A scalar `int64` tensor.
    pub fn scalar_i64(v: i64) -> Self {
        Self {
            shape: Shape::scalar(),
            data: TensorData::Int64(vec![v]),
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> ElementType {
        self.data.dtype()
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }
}

/// One record produced by an importer: field `i` belongs to column `i`.
pub type Record = Vec<Tensor>;
