//! Common traits used in IR objects.

use crate::diagnostics::Diagnostic;

/// Trait for performing validation on the IR.
pub trait Validatable {
    /// The type used to represent diagnostics.
    type Diagnostic: Diagnostic;

    /// Context necessary for validating the IR.
    type Context: ?Sized;

    /// Performs validation checks, returning either
    /// `Ok` with a list of non-error diagnostics or `Err` with a list of all the diagnostics.
    fn validate_with_context(
        &self,
        context: &Self::Context,
    ) -> Result<Vec<Self::Diagnostic>, Vec<Self::Diagnostic>>;

    /// Performs validation checks, returning either
    /// `Ok` with a list of non-error diagnostics or `Err` with a list of all the diagnostics.
    fn validate(&self) -> Result<Vec<Self::Diagnostic>, Vec<Self::Diagnostic>>
    where
        Self::Context: Default,
    {
        self.validate_with_context(&Default::default())
    }
}
