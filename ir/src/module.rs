//! Container owning operations and values.

use std::fmt;

use ciphir_core::types::Type;

use crate::{
    attr::Attribute,
    diagnostics::{OpDiagnostic, Validation},
    error::Error,
    ops::{OpId, OpKind, Operation, OperationState, ValueId},
    registry::Registry,
    traits::Validatable,
};

/// Where a value comes from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueDef {
    /// The n-th argument of the module.
    Argument(usize),
    /// The n-th result of an operation.
    Result(OpId, usize),
}

#[derive(Clone, Debug)]
struct ValueInfo {
    ty: Type,
    def: ValueDef,
}

/// A single block of operations in program order plus its arguments.
#[derive(Clone, Debug, Default)]
pub struct Module {
    ops: Vec<Option<Operation>>,
    order: Vec<OpId>,
    values: Vec<ValueInfo>,
    arguments: Vec<ValueId>,
}

impl Module {
    /// Creates an empty module.
    pub fn new() -> Self {
        Self::default()
    }

    fn new_value(&mut self, ty: Type, def: ValueDef) -> ValueId {
        self.values.push(ValueInfo { ty, def });
        ValueId(self.values.len() - 1)
    }

    /// Adds an argument of the given type.
    pub fn add_argument(&mut self, ty: Type) -> ValueId {
        let value = self.new_value(ty, ValueDef::Argument(self.arguments.len()));
        self.arguments.push(value);
        value
    }

    /// Arguments of the module.
    pub fn arguments(&self) -> &[ValueId] {
        &self.arguments
    }

    /// Type of the value.
    pub fn value_type(&self, value: ValueId) -> Option<Type> {
        self.values.get(value.0).map(|info| info.ty)
    }

    /// Where the value is defined.
    pub fn value_def(&self, value: ValueId) -> Option<ValueDef> {
        self.values.get(value.0).map(|info| info.def)
    }

    /// The operation producing the value, if it is a live operation result.
    pub fn defining_op(&self, value: ValueId) -> Option<OpRef<'_>> {
        match self.value_def(value)? {
            ValueDef::Result(op, _) => self.op(op),
            ValueDef::Argument(_) => None,
        }
    }

    /// Looks up a live operation.
    pub fn op(&self, id: OpId) -> Option<OpRef<'_>> {
        let op = self.ops.get(id.0)?.as_ref()?;
        Some(OpRef {
            module: self,
            id,
            op,
        })
    }

    /// Live operations in program order.
    pub fn ops(&self) -> impl Iterator<Item = OpRef<'_>> + '_ {
        self.order.iter().filter_map(|id| self.op(*id))
    }

    /// Number of live operations.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the module holds no operations.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of the operation in program order.
    pub fn position(&self, id: OpId) -> Option<usize> {
        self.order.iter().position(|o| *o == id)
    }

    /// Operations using the value, in program order. An operation using the value twice is
    /// listed once.
    pub fn users(&self, value: ValueId) -> Vec<OpId> {
        self.ops()
            .filter(|op| op.operands().contains(&value))
            .map(|op| op.id())
            .collect()
    }

    /// Returns true if any operation uses the value.
    pub fn has_uses(&self, value: ValueId) -> bool {
        self.ops().any(|op| op.operands().contains(&value))
    }

    /// Creates and verifies an operation at the end of the module.
    ///
    /// An operation that fails verification is removed again and its diagnostics are returned
    /// in [`Error::Verification`].
    pub fn create(&mut self, registry: &Registry, state: OperationState) -> Result<OpId, Error> {
        self.build(registry, state, self.order.len(), true)
    }

    /// Creates and verifies an operation right before `before`.
    pub fn create_before(
        &mut self,
        registry: &Registry,
        state: OperationState,
        before: OpId,
    ) -> Result<OpId, Error> {
        let position = self.position(before).ok_or(Error::UnknownOp(before))?;
        self.build(registry, state, position, true)
    }

    /// Creates an operation at the end of the module checking only its structure.
    ///
    /// The operation must be registered and have the registered arity, but its verifier is not
    /// run. Use [`Validatable::validate_with_context`] to verify it afterwards.
    pub fn create_unverified(
        &mut self,
        registry: &Registry,
        state: OperationState,
    ) -> Result<OpId, Error> {
        self.build(registry, state, self.order.len(), false)
    }

    fn build(
        &mut self,
        registry: &Registry,
        state: OperationState,
        position: usize,
        verify: bool,
    ) -> Result<OpId, Error> {
        registry.check_structure(&state)?;
        if let Some(unknown) = state
            .operands
            .iter()
            .find(|value| value.0 >= self.values.len())
        {
            return Err(Error::UnknownValue(*unknown));
        }

        let id = OpId(self.ops.len());
        let first_result = self.values.len();
        let results = state
            .result_types
            .iter()
            .enumerate()
            .map(|(n, ty)| self.new_value(*ty, ValueDef::Result(id, n)))
            .collect();
        self.ops.push(Some(Operation {
            kind: state.kind,
            operands: state.operands,
            results,
            attributes: state.attributes,
        }));
        self.order.insert(position, id);
        log::trace!("[Module::build] created '{}' op {id}", state.kind);

        if verify {
            let op = self.op(id).ok_or(Error::UnknownOp(id))?;
            if let Err(diagnostics) = registry.verify(&op) {
                log::debug!(
                    "[Module::build] '{}' op {id} failed verification: {} diagnostic(s)",
                    state.kind,
                    diagnostics.len()
                );
                self.order.retain(|o| *o != id);
                self.ops.truncate(id.0);
                self.values.truncate(first_result);
                return Err(Error::Verification {
                    kind: state.kind,
                    diagnostics,
                });
            }
        }
        Ok(id)
    }

    fn remove(&mut self, id: OpId) -> Option<Operation> {
        self.order.retain(|o| *o != id);
        self.ops.get_mut(id.0).and_then(Option::take)
    }

    /// Makes every user of `from` use `to` instead. Returns the operations that changed.
    pub fn replace_all_uses_with(&mut self, from: ValueId, to: ValueId) -> Vec<OpId> {
        let mut changed = vec![];
        for id in &self.order {
            let Some(op) = self.ops[id.0].as_mut() else {
                continue;
            };
            let mut touched = false;
            for operand in op.operands.iter_mut().filter(|o| **o == from) {
                *operand = to;
                touched = true;
            }
            if touched {
                changed.push(*id);
            }
        }
        changed
    }

    /// Removes an operation whose results are unused.
    pub fn erase_op(&mut self, id: OpId) -> Result<(), Error> {
        let op = self.op(id).ok_or(Error::UnknownOp(id))?;
        if op.results().iter().any(|r| self.has_uses(*r)) {
            return Err(Error::OpInUse {
                op: id,
                kind: op.kind(),
            });
        }
        log::trace!("[Module::erase_op] erasing '{}' op {id}", op.kind());
        self.remove(id);
        Ok(())
    }
}

impl Validatable for Module {
    type Diagnostic = OpDiagnostic;

    type Context = Registry;

    fn validate_with_context(
        &self,
        registry: &Registry,
    ) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
        let mut validation = Validation::new();
        for op in self.ops() {
            match registry.verify(&op) {
                Ok(warnings) => validation.with_warnings(warnings),
                Err(diags) => validation.append(diags),
            }
        }
        validation.into()
    }
}

/// Borrowed view of a live operation together with its module.
#[derive(Copy, Clone)]
pub struct OpRef<'m> {
    module: &'m Module,
    id: OpId,
    op: &'m Operation,
}

impl<'m> OpRef<'m> {
    /// Identifier of the operation.
    pub fn id(&self) -> OpId {
        self.id
    }

    /// Kind of the operation.
    pub fn kind(&self) -> OpKind {
        self.op.kind
    }

    /// The underlying operation.
    pub fn operation(&self) -> &'m Operation {
        self.op
    }

    /// The module the operation lives in.
    pub fn module(&self) -> &'m Module {
        self.module
    }

    /// Operand values.
    pub fn operands(&self) -> &'m [ValueId] {
        &self.op.operands
    }

    /// Result values.
    pub fn results(&self) -> &'m [ValueId] {
        &self.op.results
    }

    /// The n-th operand.
    pub fn operand(&self, index: usize) -> Option<ValueId> {
        self.op.operands.get(index).copied()
    }

    /// The n-th result.
    pub fn result(&self, index: usize) -> Option<ValueId> {
        self.op.results.get(index).copied()
    }

    /// Type of the n-th operand.
    pub fn operand_type(&self, index: usize) -> Option<Type> {
        self.module.value_type(self.operand(index)?)
    }

    /// Type of the n-th result.
    pub fn result_type(&self, index: usize) -> Option<Type> {
        self.module.value_type(self.result(index)?)
    }

    /// Looks up an attribute by name.
    pub fn attr(&self, name: &str) -> Option<&'m Attribute> {
        self.op.attr(name)
    }

    /// Creates an error diagnostic attached to this operation.
    pub fn emit_error(&self, message: impl ToString) -> OpDiagnostic {
        OpDiagnostic::error(self.id, self.kind(), message)
    }
}

impl fmt::Debug for OpRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpRef")
            .field("id", &self.id)
            .field("kind", &self.op.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{arith, mod_arith::ModArithOp};
    use ciphir_core::{apint::ApInt, mod_arith::ModArithType};
    use rstest::{fixture, rstest};

    #[fixture]
    fn registry() -> Registry {
        Registry::with_dialects()
    }

    fn mod17() -> Type {
        ModArithType::new(17u32, 8).unwrap().into()
    }

    fn add(lhs: ValueId, rhs: ValueId, ty: Type) -> OperationState {
        OperationState::new(ModArithOp::Add)
            .with_operands([lhs, rhs])
            .with_result_type(ty)
    }

    #[rstest]
    fn create_appends_and_tracks_uses(registry: Registry) {
        let mut module = Module::new();
        let a = module.add_argument(mod17());
        let b = module.add_argument(mod17());
        let id = module.create(&registry, add(a, b, mod17())).unwrap();
        let op = module.op(id).unwrap();
        let sum = op.result(0).unwrap();
        assert_eq!(module.value_def(sum), Some(ValueDef::Result(id, 0)));
        assert_eq!(module.users(a), vec![id]);
        assert!(!module.has_uses(sum));
        assert_eq!(module.defining_op(sum).map(|op| op.id()), Some(id));
        assert!(module.defining_op(a).is_none());
    }

    #[rstest]
    fn failed_verification_leaves_module_unchanged(registry: Registry) {
        let mut module = Module::new();
        let a = module.add_argument(mod17());
        let bad: Type = ModArithType::from_apint(ApInt::new(17u32, 5).unwrap()).into();
        let err = module.create(&registry, add(a, a, bad)).unwrap_err();
        assert!(matches!(err, Error::Verification { .. }));
        assert!(module.is_empty());
        assert_eq!(module.value_type(ValueId(1)), None);

        let id = module.create(&registry, add(a, a, mod17())).unwrap();
        assert_eq!(id, OpId(0));
        assert_eq!(module.op(id).unwrap().result(0), Some(ValueId(1)));
    }

    #[rstest]
    fn structure_is_checked_before_creation(registry: Registry) {
        let mut module = Module::new();
        let a = module.add_argument(mod17());
        let err = module
            .create_unverified(
                &registry,
                OperationState::new(ModArithOp::Add)
                    .with_operand(a)
                    .with_result_type(mod17()),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Arity {
                what: "operands",
                expected: 2,
                found: 1,
                ..
            }
        ));
        let err = module
            .create_unverified(&registry, add(a, ValueId(42), mod17()))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownValue(ValueId(42))));
        assert!(matches!(
            module.create(&Registry::new(), add(a, a, mod17())),
            Err(Error::Unregistered(_))
        ));
    }

    #[rstest]
    fn create_before_inserts_in_place(registry: Registry) {
        let mut module = Module::new();
        let a = module.add_argument(mod17());
        let last = module.create(&registry, add(a, a, mod17())).unwrap();
        let first = module
            .create_before(&registry, arith::index_constant(3), last)
            .unwrap();
        let order: Vec<_> = module.ops().map(|op| op.id()).collect();
        assert_eq!(order, vec![first, last]);
        assert_eq!(module.position(last), Some(1));
    }

    #[rstest]
    fn erase_requires_no_uses(registry: Registry) {
        let mut module = Module::new();
        let a = module.add_argument(mod17());
        let first = module.create(&registry, add(a, a, mod17())).unwrap();
        let x = module.op(first).unwrap().result(0).unwrap();
        let second = module.create(&registry, add(x, x, mod17())).unwrap();
        assert!(matches!(
            module.erase_op(first),
            Err(Error::OpInUse { op, .. }) if op == first
        ));
        assert_eq!(module.replace_all_uses_with(x, a), vec![second]);
        module.erase_op(first).unwrap();
        assert_eq!(module.len(), 1);
        assert!(module.op(first).is_none());
        assert!(matches!(module.erase_op(first), Err(Error::UnknownOp(_))));
    }

    #[rstest]
    fn validation_reports_every_bad_op(registry: Registry) {
        let mut module = Module::new();
        let a = module.add_argument(mod17());
        let bad: Type = ModArithType::from_apint(ApInt::new(17u32, 5).unwrap()).into();
        module.create_unverified(&registry, add(a, a, bad)).unwrap();
        module.create_unverified(&registry, add(a, a, mod17())).unwrap();
        module.create_unverified(&registry, add(a, a, bad)).unwrap();
        let errors = module.validate_with_context(&registry).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(module.validate().is_err());
    }
}
