//! Types and traits related to diagnostics.

use std::fmt;

use crate::ops::{OpId, OpKind};

/// In-progress validation
#[derive(Debug, Default)]
pub struct Validation<D> {
    errors: Vec<D>,
    warnings: Vec<D>,
}

impl<D> Validation<D> {
    /// Creates a new validation.
    pub fn new() -> Self {
        Self {
            errors: vec![],
            warnings: vec![],
        }
    }

    /// Appends an error.
    pub fn with_error(&mut self, error: D) {
        self.errors.push(error)
    }

    /// Appends a list of warnings.
    pub fn with_warnings(&mut self, warnings: impl IntoIterator<Item = D>) {
        self.warnings.extend(warnings)
    }

    /// Appends a list of errors.
    pub fn with_errors(&mut self, errors: impl IntoIterator<Item = D>) {
        self.errors.extend(errors)
    }

    /// Appends a list of diagnostics.
    pub fn append(&mut self, diags: impl IntoIterator<Item = D>)
    where
        D: Diagnostic,
    {
        let (errors, warnings): (Vec<_>, Vec<_>) = diags.into_iter().partition(D::is_error);
        self.with_warnings(warnings);
        self.with_errors(errors);
    }

    /// Returns true if no errors have been recorded.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<D> From<Validation<D>> for Result<Vec<D>, Vec<D>> {
    fn from(mut value: Validation<D>) -> Self {
        if value.errors.is_empty() {
            Ok(value.warnings)
        } else {
            value.errors.extend(value.warnings);
            Err(value.errors)
        }
    }
}

/// Diagnostic kinds
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    /// Warnings
    Warning,
    /// Errors
    Error,
    /// Others
    Other,
}

/// Marker trait for a diagnostic.
pub trait Diagnostic: fmt::Display {
    /// Gets the kind of diagnostic.
    fn kind(&self) -> DiagnosticKind;

    /// Returns true if it's an error diagnostic.
    fn is_error(&self) -> bool {
        self.kind() == DiagnosticKind::Error
    }

    /// Adds additional context to the diagnostic.
    fn contextualize<C>(self, context: &C) -> Self
    where
        C: ToString + ?Sized,
        Self: Sized;
}

/// Diagnostic attached to an operation of a [`Module`](crate::module::Module).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpDiagnostic {
    op: OpId,
    op_kind: OpKind,
    kind: DiagnosticKind,
    message: String,
}

impl OpDiagnostic {
    /// Creates an error diagnostic.
    pub fn error(op: OpId, op_kind: OpKind, message: impl ToString) -> Self {
        Self::new(op, op_kind, DiagnosticKind::Error, message)
    }

    fn new(op: OpId, op_kind: OpKind, kind: DiagnosticKind, message: impl ToString) -> Self {
        Self {
            op,
            op_kind,
            kind,
            message: message.to_string(),
        }
    }

    /// The operation the diagnostic is attached to.
    pub fn op(&self) -> OpId {
        self.op
    }

    /// The kind of the operation the diagnostic is attached to.
    pub fn op_kind(&self) -> OpKind {
        self.op_kind
    }

    /// The diagnostic message, without the operation prefix.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Diagnostic for OpDiagnostic {
    fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    fn contextualize<C>(self, context: &C) -> Self
    where
        C: ToString + ?Sized,
    {
        let mut final_message = context.to_string();
        if final_message.is_empty() {
            return self;
        }
        final_message.reserve(2 + self.message.len());
        final_message.push_str(": ");
        final_message.push_str(&self.message);
        Self {
            message: final_message,
            ..self
        }
    }
}

impl fmt::Display for OpDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: '{}' op {}: {}",
            match self.kind {
                DiagnosticKind::Warning => "warning",
                DiagnosticKind::Error => "error",
                DiagnosticKind::Other => "other",
            },
            self.op_kind,
            self.op,
            self.message
        )
    }
}

/// Error type for a collection of diagnostics
pub struct DiagnosticsError {
    diags: Vec<Box<dyn Diagnostic>>,
}

impl std::fmt::Debug for DiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticsError")
            .field("n_diags", &self.diags.len())
            .finish()
    }
}

impl std::fmt::Display for DiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.diags
            .iter()
            .map(AsRef::as_ref)
            .try_for_each(|diag| writeln!(f, "- {diag}"))
    }
}

impl DiagnosticsError {
    /// Number of diagnostics in the error.
    pub fn len(&self) -> usize {
        self.diags.len()
    }

    /// Returns true if the error carries no diagnostics.
    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }
}

impl std::error::Error for DiagnosticsError {}

impl<D: Diagnostic + 'static> FromIterator<D> for DiagnosticsError {
    fn from_iter<T: IntoIterator<Item = D>>(iter: T) -> Self {
        Self {
            diags: iter
                .into_iter()
                .map(|d| -> Box<dyn Diagnostic> { Box::new(d) })
                .collect(),
        }
    }
}

impl<I: IntoIterator> From<I> for DiagnosticsError
where
    I::Item: Diagnostic + 'static,
{
    fn from(value: I) -> Self {
        Self::from_iter(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::mod_arith::ModArithOp;
    use rstest::rstest;

    fn diag(kind: DiagnosticKind) -> OpDiagnostic {
        OpDiagnostic::new(OpId(3), OpKind::ModArith(ModArithOp::Add), kind, "bad width")
    }

    #[test]
    fn display_names_the_operation() {
        assert_eq!(
            diag(DiagnosticKind::Error).to_string(),
            "error: 'mod_arith.add' op #3: bad width"
        );
    }

    #[test]
    fn contextualize_prefixes_message() {
        let d = diag(DiagnosticKind::Warning).contextualize("convert-extract");
        assert_eq!(d.message(), "convert-extract: bad width");
        assert_eq!(diag(DiagnosticKind::Error).contextualize(""), diag(DiagnosticKind::Error));
    }

    #[rstest]
    #[case(&[], true)]
    #[case(&[DiagnosticKind::Warning], true)]
    #[case(&[DiagnosticKind::Warning, DiagnosticKind::Error], false)]
    fn validation_into_result(#[case] kinds: &[DiagnosticKind], #[case] ok: bool) {
        let mut validation = Validation::new();
        validation.append(kinds.iter().copied().map(diag));
        let result: Result<Vec<_>, Vec<_>> = validation.into();
        assert_eq!(result.is_ok(), ok);
        assert_eq!(result.unwrap_or_else(|e| e).len(), kinds.len());
    }

    #[test]
    fn errors_are_listed_first() {
        let mut validation = Validation::new();
        validation.with_warnings([diag(DiagnosticKind::Warning)]);
        validation.with_error(diag(DiagnosticKind::Error));
        let result: Result<Vec<_>, Vec<_>> = validation.into();
        let all = result.unwrap_err();
        assert!(all[0].is_error());
        assert!(!all[1].is_error());
    }
}
