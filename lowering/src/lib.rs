#![doc = include_str!("../README.md")]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

use ciphir_ir::{
    Module, Registry,
    rewrite::{GreedyRewriteConfig, PatternSet, RewriteOutcome, apply_patterns_greedily},
};

use crate::{extract::ConvertExtract, scheme::RlweScheme};

pub mod error;
pub mod extract;
pub mod scheme;

/// Result type for lowering related operations.
pub type Result<T> = std::result::Result<T, error::Error>;

/// Patterns lowering the extract operations of scheme `S`.
pub fn extract_patterns<S: RlweScheme>() -> PatternSet {
    PatternSet::new().with(ConvertExtract::<S>::new())
}

/// Lowers every extract operation of scheme `S` in `module`.
///
/// Extracts that cannot be lowered are left in place and reported in the outcome's
/// diagnostics.
pub fn lower_extract_ops<S: RlweScheme>(
    module: &mut Module,
    registry: &Registry,
    config: &GreedyRewriteConfig,
) -> RewriteOutcome {
    log::debug!(
        "[lower_extract_ops] lowering {} ops in a module of {} ops",
        S::EXTRACT,
        module.len()
    );
    let outcome = apply_patterns_greedily(module, registry, &extract_patterns::<S>(), config);
    log::debug!(
        "[lower_extract_ops] {} rewrites, {} failures",
        outcome.rewrites(),
        outcome.diagnostics().len()
    );
    outcome
}
