//! Operation kinds and verifiers, grouped by dialect.

use ciphir_core::types::Type;

use crate::{diagnostics::OpDiagnostic, module::OpRef, registry::Registry};

pub mod arith;
pub mod lwe;
pub mod mod_arith;
pub mod scheme;

pub(crate) fn register_all(registry: &mut Registry) {
    mod_arith::register(registry);
    arith::register(registry);
    lwe::register(registry);
    scheme::register(registry);
}

/// Turns a single-diagnostic check into the shape verifiers return.
pub(crate) fn verified(result: Result<(), OpDiagnostic>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    result.map(|()| vec![]).map_err(|diag| vec![diag])
}

pub(crate) fn operand_type(op: &OpRef<'_>, index: usize) -> Result<Type, OpDiagnostic> {
    op.operand_type(index)
        .ok_or_else(|| op.emit_error(format!("operand #{index} is missing")))
}

pub(crate) fn result_type(op: &OpRef<'_>, index: usize) -> Result<Type, OpDiagnostic> {
    op.result_type(index)
        .ok_or_else(|| op.emit_error(format!("result #{index} is missing")))
}
