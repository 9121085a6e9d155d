//! Operation kinds, operations and the state used to build them.

use std::{collections::BTreeMap, fmt};

use ciphir_core::types::Type;

use crate::{
    attr::Attribute,
    dialect::{arith::ArithOp, lwe::LweOp, mod_arith::ModArithOp, scheme::Scheme, scheme::SchemeOp},
};

/// Identifies a value of a [`Module`](crate::module::Module).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(pub(crate) usize);

impl ValueId {
    /// Position of the value in its module.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Identifies an operation of a [`Module`](crate::module::Module).
///
/// Identifiers are never reused, so an id of an erased operation stays dangling.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpId(pub(crate) usize);

impl OpId {
    /// Creation index of the operation.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Every kind of operation known to the IR.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum OpKind {
    /// Modular arithmetic.
    ModArith(ModArithOp),
    /// Plain integer and float constants.
    Arith(ArithOp),
    /// Scheme-agnostic RLWE operations.
    Lwe(LweOp),
    /// Operations of a concrete RLWE scheme.
    Scheme(Scheme, SchemeOp),
}

impl OpKind {
    /// Namespace of the operation.
    pub fn dialect(&self) -> &'static str {
        match self {
            Self::ModArith(_) => "mod_arith",
            Self::Arith(_) => "arith",
            Self::Lwe(_) => "lwe",
            Self::Scheme(scheme, _) => scheme.name(),
        }
    }

    /// Name of the operation inside its dialect.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ModArith(op) => op.name(),
            Self::Arith(op) => op.name(),
            Self::Lwe(op) => op.name(),
            Self::Scheme(_, op) => op.name(),
        }
    }

    /// Returns true for the constant operations whose value lives in the `value` attribute.
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Self::ModArith(ModArithOp::Constant) | Self::Arith(ArithOp::Constant)
        )
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dialect(), self.name())
    }
}

impl From<ModArithOp> for OpKind {
    fn from(value: ModArithOp) -> Self {
        Self::ModArith(value)
    }
}

impl From<ArithOp> for OpKind {
    fn from(value: ArithOp) -> Self {
        Self::Arith(value)
    }
}

impl From<LweOp> for OpKind {
    fn from(value: LweOp) -> Self {
        Self::Lwe(value)
    }
}

/// Named attributes, kept sorted for stable printing.
pub type Attributes = BTreeMap<String, Attribute>;

/// An operation stored in a module.
#[derive(Clone, Debug)]
pub struct Operation {
    pub(crate) kind: OpKind,
    pub(crate) operands: Vec<ValueId>,
    pub(crate) results: Vec<ValueId>,
    pub(crate) attributes: Attributes,
}

impl Operation {
    /// Kind of the operation.
    pub fn kind(&self) -> OpKind {
        self.kind
    }

    /// Operand values.
    pub fn operands(&self) -> &[ValueId] {
        &self.operands
    }

    /// Result values.
    pub fn results(&self) -> &[ValueId] {
        &self.results
    }

    /// All attributes.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Looks up an attribute by name.
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }
}

/// Everything needed to create an operation.
#[derive(Clone, Debug)]
pub struct OperationState {
    pub(crate) kind: OpKind,
    pub(crate) operands: Vec<ValueId>,
    pub(crate) result_types: Vec<Type>,
    pub(crate) attributes: Attributes,
}

impl OperationState {
    /// Starts building an operation of the given kind.
    pub fn new(kind: impl Into<OpKind>) -> Self {
        Self {
            kind: kind.into(),
            operands: vec![],
            result_types: vec![],
            attributes: Default::default(),
        }
    }

    /// Appends an operand.
    pub fn with_operand(mut self, value: ValueId) -> Self {
        self.operands.push(value);
        self
    }

    /// Appends a list of operands.
    pub fn with_operands(mut self, values: impl IntoIterator<Item = ValueId>) -> Self {
        self.operands.extend(values);
        self
    }

    /// Appends a result type.
    pub fn with_result_type(mut self, ty: Type) -> Self {
        self.result_types.push(ty);
        self
    }

    /// Sets an attribute, replacing any previous value under the same name.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Attribute>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Kind of the operation being built.
    pub fn kind(&self) -> OpKind {
        self.kind
    }

    /// Operands collected so far.
    pub fn operands(&self) -> &[ValueId] {
        &self.operands
    }

    /// Result types collected so far.
    pub fn result_types(&self) -> &[Type] {
        &self.result_types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OpKind::ModArith(ModArithOp::BarrettReduce), "mod_arith.barrett_reduce")]
    #[case(OpKind::Arith(ArithOp::Constant), "arith.constant")]
    #[case(OpKind::Lwe(LweOp::RlweEncode), "lwe.rlwe_encode")]
    #[case(OpKind::Scheme(Scheme::Ckks, SchemeOp::MulPlain), "ckks.mul_plain")]
    #[case(OpKind::Scheme(Scheme::Bgv, SchemeOp::Rotate), "bgv.rotate")]
    fn kind_display(#[case] kind: OpKind, #[case] expected: &str) {
        assert_eq!(kind.to_string(), expected);
    }

    #[test]
    fn state_builder_keeps_order() {
        let state = OperationState::new(ModArithOp::Add)
            .with_operand(ValueId(1))
            .with_operands([ValueId(0)])
            .with_result_type(Type::integer(8));
        assert_eq!(state.operands(), &[ValueId(1), ValueId(0)]);
        assert_eq!(state.result_types(), &[Type::integer(8)]);
        assert!(!state.kind().is_constant());
    }
}
