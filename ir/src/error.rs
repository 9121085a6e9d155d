//! Error type.

use ciphir_core::{apint::IntError, error::TypeError};
use thiserror::Error;

use crate::{
    attr::AttrError,
    diagnostics::OpDiagnostic,
    ops::{OpId, OpKind, ValueId},
};

/// IR error type.
#[derive(Error, Clone, Debug)]
pub enum Error {
    /// The operation kind is missing from the registry.
    #[error("operation '{0}' is not registered")]
    Unregistered(OpKind),
    /// The operation was built with the wrong number of operands or results.
    #[error("'{kind}' expects {expected} {what} but got {found}")]
    Arity {
        /// Kind of the operation.
        kind: OpKind,
        /// Either "operands" or "results".
        what: &'static str,
        /// Count required by the registry.
        expected: usize,
        /// Count given.
        found: usize,
    },
    /// The value does not belong to the module.
    #[error("unknown value {0}")]
    UnknownValue(ValueId),
    /// The operation does not belong to the module or was erased.
    #[error("unknown operation {0}")]
    UnknownOp(OpId),
    /// Results of the operation are still used by other operations.
    #[error("cannot erase '{kind}' op {op}: its results still have uses")]
    OpInUse {
        /// The operation.
        op: OpId,
        /// Kind of the operation.
        kind: OpKind,
    },
    /// The number of replacement values differs from the number of results.
    #[error("'{kind}' op {op} has {results} results but got {replacements} replacement values")]
    ReplacementArity {
        /// The replaced operation.
        op: OpId,
        /// Kind of the replaced operation.
        kind: OpKind,
        /// Number of results of the operation.
        results: usize,
        /// Number of values given.
        replacements: usize,
    },
    /// The created operation failed verification and was discarded.
    #[error("'{kind}' failed verification with {} error(s)", .diagnostics.len())]
    Verification {
        /// Kind of the discarded operation.
        kind: OpKind,
        /// Everything the verifier reported.
        diagnostics: Vec<OpDiagnostic>,
    },
    /// Integer construction error.
    #[error(transparent)]
    Int(#[from] IntError),
    /// Type construction error.
    #[error(transparent)]
    Type(#[from] TypeError),
    /// Attribute construction error.
    #[error(transparent)]
    Attr(#[from] AttrError),
}
