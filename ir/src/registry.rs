//! Registry of the operation kinds a module may contain.

use std::collections::HashMap;

use crate::{
    diagnostics::OpDiagnostic,
    dialect,
    error::Error,
    module::OpRef,
    ops::{OpKind, OperationState},
};

/// Verification hook of an operation kind.
///
/// Returns `Ok` with warnings or `Err` with every diagnostic found.
pub type VerifyFn = fn(&OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>>;

/// What the registry knows about an operation kind.
#[derive(Copy, Clone, Debug)]
pub struct OpInfo {
    operands: usize,
    results: usize,
    verifier: Option<VerifyFn>,
}

impl OpInfo {
    /// Creates the info for a kind with fixed operand and result counts and no verifier.
    pub fn new(operands: usize, results: usize) -> Self {
        Self {
            operands,
            results,
            verifier: None,
        }
    }

    /// Sets the verification hook.
    pub fn with_verifier(self, verifier: VerifyFn) -> Self {
        Self {
            verifier: Some(verifier),
            ..self
        }
    }

    /// Number of operands.
    pub fn operands(&self) -> usize {
        self.operands
    }

    /// Number of results.
    pub fn results(&self) -> usize {
        self.results
    }
}

/// Maps operation kinds to their arity and verifier.
///
/// The registry is passed explicitly to every construction and verification call. The default
/// registry contains every dialect of this crate, see [`Registry::with_dialects`].
#[derive(Clone, Debug)]
pub struct Registry {
    ops: HashMap<OpKind, OpInfo>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_dialects()
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            ops: HashMap::new(),
        }
    }

    /// Creates a registry with the `mod_arith`, `arith`, `lwe`, `bgv` and `ckks` dialects.
    pub fn with_dialects() -> Self {
        let mut registry = Self::new();
        dialect::register_all(&mut registry);
        registry
    }

    /// Registers an operation kind, returning the previous info if it was already registered.
    pub fn register(&mut self, kind: impl Into<OpKind>, info: OpInfo) -> Option<OpInfo> {
        let kind = kind.into();
        log::trace!("[Registry::register] {kind}");
        self.ops.insert(kind, info)
    }

    /// Looks up an operation kind.
    pub fn info(&self, kind: OpKind) -> Option<&OpInfo> {
        self.ops.get(&kind)
    }

    /// Returns true if the kind is registered.
    pub fn is_registered(&self, kind: OpKind) -> bool {
        self.ops.contains_key(&kind)
    }

    pub(crate) fn check_structure(&self, state: &OperationState) -> Result<(), Error> {
        let info = self
            .info(state.kind)
            .ok_or(Error::Unregistered(state.kind))?;
        let arity = |what, expected, found| {
            if expected == found {
                Ok(())
            } else {
                Err(Error::Arity {
                    kind: state.kind,
                    what,
                    expected,
                    found,
                })
            }
        };
        arity("operands", info.operands, state.operands.len())?;
        arity("results", info.results, state.result_types.len())
    }

    /// Runs the structural checks and the verifier of the operation's kind.
    pub fn verify(&self, op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
        let Some(info) = self.info(op.kind()) else {
            return Err(vec![op.emit_error("operation is not registered")]);
        };
        if op.operands().len() != info.operands {
            return Err(vec![op.emit_error(format!(
                "expected {} operands, found {}",
                info.operands,
                op.operands().len()
            ))]);
        }
        if op.results().len() != info.results {
            return Err(vec![op.emit_error(format!(
                "expected {} results, found {}",
                info.results,
                op.results().len()
            ))]);
        }
        match info.verifier {
            Some(verifier) => verifier(op),
            None => Ok(vec![]),
        }
    }
}
