//! Pattern rewriting to a fixpoint.

use std::{
    collections::{HashSet, VecDeque},
    fmt,
    sync::Arc,
};

use thiserror::Error;

use crate::{
    diagnostics::{Diagnostic, DiagnosticsError, OpDiagnostic, Validation},
    error::Error,
    module::Module,
    ops::{OpId, OpKind, OperationState, ValueId},
    registry::Registry,
};

/// Why a pattern did not rewrite an operation.
#[derive(Error, Debug, Clone)]
pub enum RewriteError {
    /// The pattern does not apply. Not reported.
    #[error("pattern did not match")]
    NoMatch,
    /// The pattern applies but the operation cannot be rewritten. Reported as a diagnostic
    /// attached to the operation.
    ///
    /// Use [`pattern_err!`](crate::pattern_err) to easily create this kind of error.
    #[error("{0}")]
    Failed(Arc<dyn std::error::Error + Send + Sync>),
}

/// Convenience macro for creating [`RewriteError::Failed`] errors.
#[macro_export]
macro_rules! pattern_err {
    ($err:expr) => {
        $crate::rewrite::RewriteError::Failed(std::sync::Arc::new($err))
    };
}

impl From<Error> for RewriteError {
    fn from(value: Error) -> Self {
        pattern_err!(value)
    }
}

/// A rewrite rooted at operations of one kind.
pub trait RewritePattern {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Kind of the operations the pattern applies to.
    fn root(&self) -> OpKind;

    /// Rewrites `op`. On error every operation created through the rewriter is removed again.
    fn match_and_rewrite(&self, op: OpId, rewriter: &mut Rewriter<'_>) -> Result<(), RewriteError>;
}

/// Mutation interface handed to patterns.
///
/// New operations are inserted right before the operation being rewritten.
pub struct Rewriter<'m> {
    module: &'m mut Module,
    registry: &'m Registry,
    insertion_point: OpId,
    created: Vec<OpId>,
    modified: Vec<OpId>,
}

impl<'m> Rewriter<'m> {
    fn new(module: &'m mut Module, registry: &'m Registry, insertion_point: OpId) -> Self {
        Self {
            module,
            registry,
            insertion_point,
            created: vec![],
            modified: vec![],
        }
    }

    /// The module being rewritten.
    pub fn module(&self) -> &Module {
        &*self.module
    }

    /// The registry operations are checked against.
    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Creates and verifies an operation before the insertion point.
    pub fn create(&mut self, state: OperationState) -> Result<OpId, Error> {
        let id = self
            .module
            .create_before(self.registry, state, self.insertion_point)?;
        self.created.push(id);
        Ok(id)
    }

    /// Creates a single-result operation and returns its result.
    pub fn create_value(&mut self, state: OperationState) -> Result<ValueId, Error> {
        let kind = state.kind();
        let id = self.create(state)?;
        self.module
            .op(id)
            .and_then(|op| op.result(0))
            .ok_or(Error::Arity {
                kind,
                what: "results",
                expected: 1,
                found: 0,
            })
    }

    /// Replaces every use of the results of `op` with `values` and erases `op`.
    pub fn replace_op(&mut self, op: OpId, values: &[ValueId]) -> Result<(), Error> {
        let target = self.module.op(op).ok_or(Error::UnknownOp(op))?;
        let results = target.results().to_vec();
        if results.len() != values.len() {
            return Err(Error::ReplacementArity {
                op,
                kind: target.kind(),
                results: results.len(),
                replacements: values.len(),
            });
        }
        for (from, to) in results.into_iter().zip(values) {
            let users = self.module.replace_all_uses_with(from, *to);
            self.modified.extend(users);
        }
        self.erase_op(op)
    }

    /// Erases an operation whose results are unused.
    pub fn erase_op(&mut self, op: OpId) -> Result<(), Error> {
        self.module.erase_op(op)
    }

    fn rollback(self) {
        for id in self.created.into_iter().rev() {
            if let Err(err) = self.module.erase_op(id) {
                log::warn!("[Rewriter::rollback] could not erase {id}: {err}");
            }
        }
    }
}

impl fmt::Debug for Rewriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rewriter")
            .field("insertion_point", &self.insertion_point)
            .field("created", &self.created)
            .field("modified", &self.modified)
            .finish()
    }
}

/// Ordered set of patterns. Earlier patterns are tried first.
#[derive(Default)]
pub struct PatternSet {
    patterns: Vec<Box<dyn RewritePattern>>,
}

impl PatternSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pattern.
    pub fn add(&mut self, pattern: impl RewritePattern + 'static) -> &mut Self {
        self.patterns.push(Box::new(pattern));
        self
    }

    /// Adds a pattern, builder style.
    pub fn with(mut self, pattern: impl RewritePattern + 'static) -> Self {
        self.add(pattern);
        self
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns true if the set has no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &dyn RewritePattern> {
        self.patterns.iter().map(AsRef::as_ref)
    }
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.patterns.iter().map(|p| p.name()))
            .finish()
    }
}

/// Bounds of [`apply_patterns_greedily`].
#[derive(Debug, Copy, Clone)]
pub struct GreedyRewriteConfig {
    max_iterations: usize,
    max_rewrites: Option<usize>,
}

impl Default for GreedyRewriteConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            max_rewrites: None,
        }
    }
}

impl GreedyRewriteConfig {
    /// Sets the maximum number of sweeps over the module.
    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    /// Sets the maximum number of successful rewrites.
    pub fn with_max_rewrites(self, max_rewrites: usize) -> Self {
        Self {
            max_rewrites: Some(max_rewrites),
            ..self
        }
    }

    /// Maximum number of sweeps over the module.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Maximum number of successful rewrites, if bounded.
    pub fn max_rewrites(&self) -> Option<usize> {
        self.max_rewrites
    }
}

/// What [`apply_patterns_greedily`] did.
#[derive(Debug, Default)]
pub struct RewriteOutcome {
    rewrites: usize,
    iterations: usize,
    converged: bool,
    diagnostics: Vec<OpDiagnostic>,
}

impl RewriteOutcome {
    /// Number of successful rewrites.
    pub fn rewrites(&self) -> usize {
        self.rewrites
    }

    /// Number of sweeps performed.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns true if a sweep finished without rewriting anything.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Diagnostics of the patterns that failed, errors first.
    pub fn diagnostics(&self) -> &[OpDiagnostic] {
        &self.diagnostics
    }

    /// Returns the number of rewrites, or the diagnostics if any pattern failed.
    pub fn into_result(self) -> Result<usize, DiagnosticsError> {
        if self.diagnostics.iter().any(Diagnostic::is_error) {
            return Err(self.diagnostics.into());
        }
        Ok(self.rewrites)
    }
}

/// Applies the patterns until none matches or a bound of the config is hit.
///
/// Each sweep visits the module's operations in program order plus every operation created or
/// modified by a rewrite during the sweep. A pattern that fails on an operation is reported once
/// and not retried on it.
pub fn apply_patterns_greedily(
    module: &mut Module,
    registry: &Registry,
    patterns: &PatternSet,
    config: &GreedyRewriteConfig,
) -> RewriteOutcome {
    let mut outcome = RewriteOutcome::default();
    let mut failed = HashSet::new();
    let mut validation = Validation::new();

    'sweeps: for iteration in 0..config.max_iterations {
        outcome.iterations = iteration + 1;
        log::debug!("[apply_patterns_greedily] sweep {iteration} over {} ops", module.len());
        let mut worklist: VecDeque<OpId> = module.ops().map(|op| op.id()).collect();
        let mut changed = false;

        while let Some(id) = worklist.pop_front() {
            let Some(kind) = module.op(id).map(|op| op.kind()) else {
                continue;
            };
            for (index, pattern) in patterns.iter().enumerate() {
                if pattern.root() != kind || failed.contains(&(id, index)) {
                    continue;
                }
                if config.max_rewrites.is_some_and(|max| outcome.rewrites >= max) {
                    log::warn!(
                        "[apply_patterns_greedily] stopping after {} rewrites",
                        outcome.rewrites
                    );
                    break 'sweeps;
                }

                let mut rewriter = Rewriter::new(module, registry, id);
                match pattern.match_and_rewrite(id, &mut rewriter) {
                    Ok(()) => {
                        log::debug!(
                            "[apply_patterns_greedily] '{}' rewrote '{kind}' op {id}",
                            pattern.name()
                        );
                        worklist.extend(rewriter.created.iter().chain(&rewriter.modified));
                        outcome.rewrites += 1;
                        changed = true;
                        break;
                    }
                    Err(RewriteError::NoMatch) => rewriter.rollback(),
                    Err(RewriteError::Failed(err)) => {
                        rewriter.rollback();
                        log::debug!(
                            "[apply_patterns_greedily] '{}' failed on '{kind}' op {id}: {err}",
                            pattern.name()
                        );
                        failed.insert((id, index));
                        validation.with_error(OpDiagnostic::error(id, kind, err));
                    }
                }
            }
        }

        if !changed {
            outcome.converged = true;
            break;
        }
    }

    if !outcome.converged {
        log::warn!(
            "[apply_patterns_greedily] did not converge after {} sweeps",
            outcome.iterations
        );
    }
    let diagnostics: Result<Vec<_>, Vec<_>> = validation.into();
    outcome.diagnostics = match diagnostics {
        Ok(diags) | Err(diags) => diags,
    };
    outcome
}
