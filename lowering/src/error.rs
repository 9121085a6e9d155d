//! Error type.

use ciphir_core::{apint::IntError, types::Type};
use ciphir_ir::{
    attr::AttrError, dialect::scheme::InferError, ops::ValueId, rewrite::RewriteError,
};
use num_bigint::BigInt;
use thiserror::Error;

/// Lowering error type.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Happens when the extract offset is not produced by an integer `arith.constant`.
    #[error("Expected extract offset arg to be constant integer, found {0}")]
    NonConstantOffset(ValueId),
    /// Happens when the extracted message is not an integer, index or float.
    #[error(
        "Expected extract op to extract scalar from tensor type, but found input underlying type {input} and output underlying type {output}"
    )]
    NonScalarElement {
        /// Message type of the input ciphertext.
        input: Type,
        /// Message type of the result ciphertext.
        output: Type,
    },
    /// Happens when the offset does not select one of the ring's slots.
    #[error("extract offset {offset} is outside the {degree} slots of the ciphertext")]
    OffsetOutOfRange {
        /// The constant offset, read as a signed value.
        offset: BigInt,
        /// Number of slots, i.e. the ring degree.
        degree: u64,
    },
    /// Happens when an operand or result of the extract is not a ciphertext.
    #[error("extract {what} must be a ciphertext, got {ty}")]
    NotCiphertext {
        /// Which value of the extract was checked.
        what: &'static str,
        /// Its type.
        ty: Type,
    },
    /// Happens when the extract does not have the expected operands or results.
    #[error("extract has no {0}")]
    Malformed(&'static str),
    /// Error raised while building the replacement operations.
    #[error(transparent)]
    Ir(#[from] ciphir_ir::error::Error),
    /// Error raised while building the selection mask.
    #[error(transparent)]
    Attr(#[from] AttrError),
    /// Error raised while building a mask element.
    #[error(transparent)]
    Int(#[from] IntError),
    /// Error raised while inferring the type of the product.
    #[error(transparent)]
    Infer(#[from] InferError),
}

impl From<Error> for RewriteError {
    fn from(value: Error) -> Self {
        ciphir_ir::pattern_err!(value)
    }
}
