//! Literal attributes attached to operations.

use std::fmt;

use ciphir_core::{
    apint::ApInt,
    rlwe::{Encoding, Ring},
    types::FloatKind,
};
use thiserror::Error;

/// Errors raised while building an attribute.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum AttrError {
    /// The number of elements implied by the shape does not fit in 64 bits.
    #[error("dense attribute of shape {shape:?} has too many elements")]
    ShapeOverflow {
        /// Declared shape.
        shape: Vec<u64>,
    },
    /// The number of elements does not match the shape.
    #[error("dense attribute of shape {shape:?} needs {expected} elements, got {found}")]
    ElementCount {
        /// Declared shape.
        shape: Vec<u64>,
        /// Number of elements implied by the shape.
        expected: u64,
        /// Number of elements given.
        found: usize,
    },
    /// An element does not have the width shared by the whole attribute.
    #[error("dense element #{index} has width {found}, expected {expected}")]
    ElementWidth {
        /// Position of the offending element.
        index: usize,
        /// Width of the attribute's elements.
        expected: u32,
        /// Width of the offending element.
        found: u32,
    },
}

fn check_count(shape: &[u64], found: usize) -> Result<(), AttrError> {
    let expected = shape
        .iter()
        .try_fold(1u64, |acc, dim| acc.checked_mul(*dim))
        .ok_or_else(|| AttrError::ShapeOverflow {
            shape: shape.to_vec(),
        })?;
    if expected != found as u64 {
        return Err(AttrError::ElementCount {
            shape: shape.to_vec(),
            expected,
            found,
        });
    }
    Ok(())
}

/// Statically shaped integer elements sharing one bit width.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DenseIntElements {
    shape: Vec<u64>,
    element_width: u32,
    values: Vec<ApInt>,
}

impl DenseIntElements {
    /// Creates the attribute, checking the element count and widths.
    pub fn new(
        shape: impl Into<Vec<u64>>,
        element_width: u32,
        values: impl Into<Vec<ApInt>>,
    ) -> Result<Self, AttrError> {
        let shape = shape.into();
        let values = values.into();
        check_count(&shape, values.len())?;
        if let Some((index, value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| v.width() != element_width)
        {
            return Err(AttrError::ElementWidth {
                index,
                expected: element_width,
                found: value.width(),
            });
        }
        Ok(Self {
            shape,
            element_width,
            values,
        })
    }

    /// Shape of the attribute.
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Bit width shared by every element.
    pub fn element_width(&self) -> u32 {
        self.element_width
    }

    /// Elements in row-major order.
    pub fn values(&self) -> &[ApInt] {
        &self.values
    }
}

/// Statically shaped floating point elements.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseFloatElements {
    shape: Vec<u64>,
    element_kind: FloatKind,
    values: Vec<f64>,
}

impl DenseFloatElements {
    /// Creates the attribute, checking the element count.
    pub fn new(
        shape: impl Into<Vec<u64>>,
        element_kind: FloatKind,
        values: impl Into<Vec<f64>>,
    ) -> Result<Self, AttrError> {
        let shape = shape.into();
        let values = values.into();
        check_count(&shape, values.len())?;
        Ok(Self {
            shape,
            element_kind,
            values,
        })
    }

    /// Shape of the attribute.
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Float format of the elements.
    pub fn element_kind(&self) -> FloatKind {
        self.element_kind
    }

    /// Elements in row-major order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Attribute values.
#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    /// Fixed-width integer.
    Integer(ApInt),
    /// Floating point number.
    Float(f64),
    /// Dense integer elements.
    DenseInt(DenseIntElements),
    /// Dense float elements.
    DenseFloat(DenseFloatElements),
    /// Plaintext encoding.
    Encoding(Encoding),
    /// Polynomial ring.
    Ring(Ring),
}

impl Attribute {
    /// Returns the integer if the attribute is one.
    pub fn as_integer(&self) -> Option<ApInt> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the dense integer elements if the attribute holds them.
    pub fn as_dense_int(&self) -> Option<&DenseIntElements> {
        match self {
            Self::DenseInt(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the encoding if the attribute is one.
    pub fn as_encoding(&self) -> Option<Encoding> {
        match self {
            Self::Encoding(e) => Some(*e),
            _ => None,
        }
    }

    /// Returns the ring if the attribute is one.
    pub fn as_ring(&self) -> Option<Ring> {
        match self {
            Self::Ring(r) => Some(*r),
            _ => None,
        }
    }

    /// Static shape of a dense attribute.
    pub fn dense_shape(&self) -> Option<&[u64]> {
        match self {
            Self::DenseInt(d) => Some(d.shape()),
            Self::DenseFloat(d) => Some(d.shape()),
            _ => None,
        }
    }

    /// Short name of the attribute kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::DenseInt(_) => "dense integer elements",
            Self::DenseFloat(_) => "dense float elements",
            Self::Encoding(_) => "encoding",
            Self::Ring(_) => "ring",
        }
    }
}

impl From<ApInt> for Attribute {
    fn from(value: ApInt) -> Self {
        Self::Integer(value)
    }
}

impl From<DenseIntElements> for Attribute {
    fn from(value: DenseIntElements) -> Self {
        Self::DenseInt(value)
    }
}

impl From<DenseFloatElements> for Attribute {
    fn from(value: DenseFloatElements) -> Self {
        Self::DenseFloat(value)
    }
}

impl From<Encoding> for Attribute {
    fn from(value: Encoding) -> Self {
        Self::Encoding(value)
    }
}

impl From<Ring> for Attribute {
    fn from(value: Ring) -> Self {
        Self::Ring(value)
    }
}

fn fmt_list<T>(
    f: &mut fmt::Formatter<'_>,
    values: &[T],
    mut item: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    write!(f, "dense<[")?;
    for (n, value) in values.iter().enumerate() {
        if n > 0 {
            write!(f, ", ")?;
        }
        item(f, value)?;
    }
    write!(f, "]>")
}

/// Dense attributes print as a flat list; the shape is carried by the type.
impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::DenseInt(d) => fmt_list(f, d.values(), |f, v| write!(f, "{v}")),
            Self::DenseFloat(d) => fmt_list(f, d.values(), |f, v| write!(f, "{v:?}")),
            Self::Encoding(e) => write!(f, "{e}"),
            Self::Ring(r) => write!(f, "{r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ints(values: &[u32], width: u32) -> Vec<ApInt> {
        values
            .iter()
            .map(|v| ApInt::new(*v, width).unwrap())
            .collect()
    }

    #[rstest]
    #[case(vec![3], 3, true)]
    #[case(vec![2, 2], 3, false)]
    #[case(vec![0], 0, true)]
    #[case(vec![4], 3, false)]
    fn dense_int_element_count(#[case] shape: Vec<u64>, #[case] n: usize, #[case] ok: bool) {
        let values = ints(&vec![1; n], 4);
        assert_eq!(DenseIntElements::new(shape, 4, values).is_ok(), ok);
    }

    #[test]
    fn huge_shapes_are_rejected() {
        let shape = vec![u64::MAX, 2];
        assert_eq!(
            DenseIntElements::new(shape.clone(), 4, ints(&[1], 4)),
            Err(AttrError::ShapeOverflow {
                shape: shape.clone()
            })
        );
        assert_eq!(
            DenseFloatElements::new(shape.clone(), FloatKind::F32, vec![1.0]),
            Err(AttrError::ShapeOverflow { shape })
        );
    }

    #[test]
    fn dense_shape_of_attributes() {
        let dense = DenseIntElements::new(vec![2, 2], 4, ints(&[1, 2, 3, 4], 4)).unwrap();
        assert_eq!(Attribute::from(dense).dense_shape(), Some(&[2u64, 2][..]));
        assert_eq!(Attribute::Float(1.0).dense_shape(), None);
    }

    #[test]
    fn dense_int_rejects_mixed_widths() {
        let mut values = ints(&[1, 2], 4);
        values.push(ApInt::new(3u32, 5).unwrap());
        assert_eq!(
            DenseIntElements::new(vec![3], 4, values),
            Err(AttrError::ElementWidth {
                index: 2,
                expected: 4,
                found: 5
            })
        );
    }

    #[test]
    fn display() {
        let dense = DenseIntElements::new(vec![3], 7, ints(&[0, 3, 100], 7)).unwrap();
        assert_eq!(Attribute::from(dense).to_string(), "dense<[0, 3, 100]>");
        let floats = DenseFloatElements::new(vec![2], FloatKind::F32, vec![0.0, 1.0]).unwrap();
        assert_eq!(Attribute::from(floats).to_string(), "dense<[0.0, 1.0]>");
        assert_eq!(Attribute::Float(2.5).to_string(), "2.5");
    }
}
