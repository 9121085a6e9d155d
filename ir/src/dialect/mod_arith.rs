//! Modular arithmetic operations.
//!
//! Every modular value is stored in an integer one bit wider than its modulus needs. The
//! verifiers here enforce that invariant on the types flowing through each operation, plus the
//! input range of Barrett reduction and the agreement between constants and their types.

use ciphir_core::{
    apint::ApInt,
    mod_arith::ModArithType,
    types::{Type, TypeKind},
};

use crate::{
    attr::Attribute,
    diagnostics::{OpDiagnostic, Validation},
    module::OpRef,
    ops::{OperationState, ValueId},
    registry::{OpInfo, Registry},
};

use super::{operand_type, result_type, verified};

/// Operations of the `mod_arith` dialect.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ModArithOp {
    /// Scalar or dense constant of a modular type.
    Constant,
    /// Modular addition.
    Add,
    /// Modular subtraction.
    Sub,
    /// Modular multiplication.
    Mul,
    /// Multiply-accumulate, `lhs * rhs + acc`.
    Mac,
    /// Reduction into the canonical range.
    Reduce,
    /// Reinterprets a modular value as a plain integer of the storage width.
    Extract,
    /// Barrett reduction of a plain integer by the `modulus` attribute.
    BarrettReduce,
}

impl ModArithOp {
    /// Name of the operation.
    pub fn name(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Mac => "mac",
            Self::Reduce => "reduce",
            Self::Extract => "extract",
            Self::BarrettReduce => "barrett_reduce",
        }
    }
}

pub(crate) fn register(registry: &mut Registry) {
    registry.register(
        ModArithOp::Constant,
        OpInfo::new(0, 1).with_verifier(verify_constant),
    );
    for op in [ModArithOp::Add, ModArithOp::Sub, ModArithOp::Mul] {
        registry.register(op, OpInfo::new(2, 1).with_verifier(verify_arithmetic));
    }
    registry.register(
        ModArithOp::Mac,
        OpInfo::new(3, 1).with_verifier(verify_arithmetic),
    );
    registry.register(
        ModArithOp::Reduce,
        OpInfo::new(1, 1).with_verifier(verify_arithmetic),
    );
    registry.register(
        ModArithOp::Extract,
        OpInfo::new(1, 1).with_verifier(verify_extract),
    );
    registry.register(
        ModArithOp::BarrettReduce,
        OpInfo::new(1, 1).with_verifier(verify_barrett_reduce),
    );
}

/// Builds a constant. The value must be an integer or dense integer attribute.
pub fn constant(value: impl Into<Attribute>, ty: Type) -> OperationState {
    OperationState::new(ModArithOp::Constant)
        .with_attr("value", value)
        .with_result_type(ty)
}

/// Builds an `add`, `sub` or `mul`.
pub fn binary(op: ModArithOp, lhs: ValueId, rhs: ValueId, ty: Type) -> OperationState {
    OperationState::new(op)
        .with_operands([lhs, rhs])
        .with_result_type(ty)
}

/// Builds a multiply-accumulate.
pub fn mac(lhs: ValueId, rhs: ValueId, acc: ValueId, ty: Type) -> OperationState {
    OperationState::new(ModArithOp::Mac)
        .with_operands([lhs, rhs, acc])
        .with_result_type(ty)
}

/// Builds a reduction.
pub fn reduce(input: ValueId, ty: Type) -> OperationState {
    OperationState::new(ModArithOp::Reduce)
        .with_operand(input)
        .with_result_type(ty)
}

/// Builds an extraction into a plain integer of type `ty`.
pub fn extract(input: ValueId, ty: Type) -> OperationState {
    OperationState::new(ModArithOp::Extract)
        .with_operand(input)
        .with_result_type(ty)
}

/// Builds a Barrett reduction. `ty` is the type of the input, which is also the result type.
pub fn barrett_reduce(input: ValueId, modulus: ApInt, ty: Type) -> OperationState {
    OperationState::new(ModArithOp::BarrettReduce)
        .with_operand(input)
        .with_attr("modulus", modulus)
        .with_result_type(ty)
}

/// Checks that the storage integer of the type has a bit to spare above the modulus.
pub fn verify_mod_arith_type(op: &OpRef<'_>, ty: ModArithType) -> Result<(), OpDiagnostic> {
    if ty.has_spare_bit() {
        return Ok(());
    }
    Err(op.emit_error(format!(
        "underlying type's bitwidth must be 1 bit larger than the modulus bitwidth, but got {} while modulus requires width {}.",
        ty.storage_width(),
        ty.modulus_width()
    )))
}

/// Checks that a plain integer has exactly the storage width of the modular type.
pub fn verify_same_width(
    op: &OpRef<'_>,
    ty: ModArithType,
    integer_width: u32,
) -> Result<(), OpDiagnostic> {
    if integer_width == ty.storage_width() {
        return Ok(());
    }
    Err(op.emit_error(format!(
        "the result integer type should be of the same width as the mod arith type width, but got {integer_width} while mod arith type width {}.",
        ty.storage_width()
    )))
}

fn mod_arith_element(op: &OpRef<'_>, ty: Type, what: &str) -> Result<ModArithType, OpDiagnostic> {
    ty.element_type_or_self().as_mod_arith().ok_or_else(|| {
        op.emit_error(format!(
            "{what} must be a mod_arith type or a tensor of mod_arith, got {ty}"
        ))
    })
}

fn verify_arithmetic(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    let result = match result_type(op, 0) {
        Ok(ty) => ty,
        Err(diag) => return Err(vec![diag]),
    };
    let mut validation = Validation::new();
    match mod_arith_element(op, result, "result") {
        Ok(ty) => {
            if let Err(diag) = verify_mod_arith_type(op, ty) {
                validation.with_error(diag);
            }
        }
        Err(diag) => validation.with_error(diag),
    }
    for index in 0..op.operands().len() {
        match operand_type(op, index) {
            Ok(ty) if ty == result => {}
            Ok(ty) => validation.with_error(op.emit_error(format!(
                "operand #{index} has type {ty} but the result has type {result}"
            ))),
            Err(diag) => validation.with_error(diag),
        }
    }
    validation.into()
}

fn check_extract(op: &OpRef<'_>) -> Result<(), OpDiagnostic> {
    let input = operand_type(op, 0)?;
    let output = result_type(op, 0)?;
    let modular = mod_arith_element(op, input, "input")?;
    let width = output
        .element_type_or_self()
        .integer_width()
        .ok_or_else(|| {
            op.emit_error(format!(
                "result must be an integer or a tensor of integers, got {output}"
            ))
        })?;
    verify_same_width(op, modular, width)?;
    verify_mod_arith_type(op, modular)
}

fn verify_extract(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    verified(check_extract(op))
}

fn verify_barrett_reduce(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    let input = operand_type(op, 0).map_err(|diag| vec![diag])?;
    let width = match input.kind() {
        TypeKind::Tensor(tensor) => tensor.element().integer_width(),
        _ => input.integer_width(),
    };
    let Some(width) = width else {
        return Err(vec![op.emit_error(format!(
            "input must be an integer or a tensor of integers, got {input}"
        ))]);
    };
    let Some(modulus) = op.attr("modulus").and_then(Attribute::as_integer) else {
        return Err(vec![
            op.emit_error("requires an integer `modulus` attribute"),
        ]);
    };

    let mut validation = Validation::new();
    let expected = modulus.wrapping_dec().active_bits();
    if width < expected || 2 * expected < width {
        validation.with_error(op.emit_error(format!(
            "input bitwidth is required to be in the range [w, 2w], where w is the smallest bit-width that contains the range [0, modulus). Got {width} but w is {expected}."
        )));
    }
    if modulus.is_negative() || modulus.is_zero() {
        validation.with_error(op.emit_error(format!(
            "provided modulus {} is not a positive integer.",
            modulus.to_signed()
        )));
    }
    if result_type(op, 0).is_ok_and(|ty| ty != input) {
        validation.with_error(op.emit_error("result type must match the input type"));
    }
    validation.into()
}

/// A kind mismatch between value and type stops verification; for dense values the shape and
/// the element width are both checked.
fn verify_constant(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    let ty = result_type(op, 0).map_err(|diag| vec![diag])?;
    let modular = mod_arith_element(op, ty, "result").map_err(|diag| vec![diag])?;
    let storage_width = modular.storage_width();
    let value = op.attr("value");
    let dense = value.and_then(Attribute::as_dense_int);

    if ty.is_shaped() != dense.is_some() {
        return Err(vec![
            op.emit_error("must have shaped type iff value is `dense`."),
        ]);
    }

    if let Some(int) = value.and_then(Attribute::as_integer) {
        if int.width() > storage_width {
            return Err(vec![op.emit_error(format!(
                "value's bitwidth {} must not be larger than underlying type width {storage_width}.",
                int.width()
            ))]);
        }
        return Ok(vec![]);
    }

    if let Some(dense) = dense {
        let mut validation = Validation::new();
        let shape = ty.as_tensor().and_then(|t| t.static_shape());
        let value_shape = value.and_then(Attribute::dense_shape);
        if shape.as_deref() != value_shape {
            validation.with_error(op.emit_error(format!(
                "tensor shape must be static and match value shape {:?}, got {ty}.",
                value_shape.unwrap_or_default()
            )));
        }
        if dense.element_width() > storage_width {
            validation.with_error(op.emit_error(format!(
                "values's bitwidth {} must not be larger than underlying type width {storage_width}.",
                dense.element_width()
            )));
        }
        return validation.into();
    }

    Err(vec![op.emit_error(
        "value must be an integer or dense integer elements attribute.",
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{attr::DenseIntElements, error::Error, module::Module};
    use quickcheck_macros::quickcheck;
    use rstest::{fixture, rstest};

    #[fixture]
    fn registry() -> Registry {
        Registry::with_dialects()
    }

    fn unchecked(modulus: u64, width: u32) -> Type {
        ModArithType::from_apint(ApInt::new(modulus, width).unwrap()).into()
    }

    fn errors(module: &mut Module, registry: &Registry, state: OperationState) -> Vec<String> {
        match module.create(registry, state) {
            Ok(_) => vec![],
            Err(Error::Verification { diagnostics, .. }) => {
                diagnostics.iter().map(|d| d.message().to_owned()).collect()
            }
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    #[rstest]
    #[case(7, 3, false)]
    #[case(7, 4, true)]
    #[case(17, 5, false)]
    #[case(17, 6, true)]
    #[case(65537, 32, true)]
    fn arithmetic_result_needs_spare_bit(
        registry: Registry,
        #[case] modulus: u64,
        #[case] width: u32,
        #[case] ok: bool,
    ) {
        for op in [ModArithOp::Add, ModArithOp::Sub, ModArithOp::Mul] {
            let mut module = Module::new();
            let ty = unchecked(modulus, width);
            let a = module.add_argument(ty);
            let errs = errors(&mut module, &registry, binary(op, a, a, ty));
            assert_eq!(errs.is_empty(), ok, "{op:?}: {errs:?}");
        }
        let mut module = Module::new();
        let ty = unchecked(modulus, width);
        let a = module.add_argument(ty);
        assert_eq!(errors(&mut module, &registry, mac(a, a, a, ty)).is_empty(), ok);
        assert_eq!(errors(&mut module, &registry, reduce(a, ty)).is_empty(), ok);
    }

    #[quickcheck]
    fn verifier_agrees_with_width_invariant(modulus: u32, width: u8) -> bool {
        let width = u32::from(width % 40) + 1;
        let Ok(modulus) = ApInt::new(modulus, width) else {
            return true;
        };
        let ty = ModArithType::from_apint(modulus);
        let mut module = Module::new();
        let a = module.add_argument(ty.into());
        let created = module.create(
            &Registry::with_dialects(),
            binary(ModArithOp::Add, a, a, ty.into()),
        );
        created.is_ok() == (ty.modulus_width() <= width - 1)
    }

    #[test]
    fn width_message() {
        let mut module = Module::new();
        let ty = unchecked(7, 3);
        let a = module.add_argument(ty);
        let errs = errors(&mut module, &Registry::with_dialects(), reduce(a, ty));
        assert_eq!(
            errs,
            vec![
                "underlying type's bitwidth must be 1 bit larger than the modulus bitwidth, but got 3 while modulus requires width 3."
            ]
        );
    }

    #[rstest]
    fn operands_must_match_result(registry: Registry) {
        let mut module = Module::new();
        let a = module.add_argument(unchecked(17, 8));
        let b = module.add_argument(unchecked(17, 16));
        let errs = errors(
            &mut module,
            &registry,
            binary(ModArithOp::Add, a, b, unchecked(17, 8)),
        );
        assert_eq!(errs.len(), 1);
        assert!(errs[0].starts_with("operand #1"));
    }

    #[rstest]
    #[case(8, false)]
    #[case(16, true)]
    #[case(32, false)]
    fn extract_requires_same_width(registry: Registry, #[case] width: u32, #[case] ok: bool) {
        let mut module = Module::new();
        let a = module.add_argument(unchecked(65521, 16)); // 16 bits needed, no spare bit
        let b = module.add_argument(unchecked(17, 16));
        let errs = errors(&mut module, &registry, extract(b, Type::integer(width)));
        assert_eq!(errs.is_empty(), ok, "{errs:?}");
        if !ok {
            assert!(errs[0].starts_with("the result integer type should be"));
        }
        let errs = errors(&mut module, &registry, extract(a, Type::integer(width)));
        assert_eq!(errs.len(), 1);
        if ok {
            assert!(errs[0].starts_with("underlying type's bitwidth"));
        }
    }

    #[rstest]
    #[case(4, false)]
    #[case(5, true)]
    #[case(8, true)]
    #[case(10, true)]
    #[case(11, false)]
    fn barrett_input_range(registry: Registry, #[case] width: u32, #[case] ok: bool) {
        let modulus = ApInt::new(17u32, 64).unwrap();
        for ty in [Type::integer(width), Type::ranked(&[4], Type::integer(width))] {
            let mut module = Module::new();
            let a = module.add_argument(ty);
            let errs = errors(&mut module, &registry, barrett_reduce(a, modulus, ty));
            assert_eq!(errs.is_empty(), ok, "{ty}: {errs:?}");
            if !ok {
                assert!(errs[0].ends_with(&format!("Got {width} but w is 5.")));
            }
        }
    }

    #[rstest]
    fn barrett_reports_both_defects(registry: Registry) {
        let mut module = Module::new();
        let ty = Type::integer(200);
        let a = module.add_argument(ty);
        let errs = errors(
            &mut module,
            &registry,
            barrett_reduce(a, ApInt::from_i64(-17), ty),
        );
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[1], "provided modulus -17 is not a positive integer.");

        let zero = errors(&mut module, &registry, barrett_reduce(a, ApInt::zero(8).unwrap(), ty));
        assert!(zero.iter().any(|e| e.contains("not a positive integer")));
    }

    #[rstest]
    fn barrett_needs_integer_input(registry: Registry) {
        let mut module = Module::new();
        let ty = unchecked(17, 8);
        let a = module.add_argument(ty);
        let modulus = ApInt::new(17u32, 64).unwrap();
        let errs = errors(&mut module, &registry, barrett_reduce(a, modulus, ty));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].starts_with("input must be an integer"));
    }

    fn dense(values: &[u32], width: u32) -> DenseIntElements {
        let values: Vec<_> = values
            .iter()
            .map(|v| ApInt::new(*v, width).unwrap())
            .collect();
        DenseIntElements::new(vec![values.len() as u64], width, values).unwrap()
    }

    #[rstest]
    #[case::scalar_ok(Attribute::Integer(ApInt::new(5u32, 4).unwrap()), false, 0)]
    #[case::scalar_too_wide(Attribute::Integer(ApInt::new(5u32, 9).unwrap()), false, 1)]
    #[case::dense_for_scalar(dense(&[1, 2, 3], 4).into(), false, 1)]
    #[case::scalar_for_tensor(Attribute::Integer(ApInt::new(5u32, 4).unwrap()), true, 1)]
    #[case::dense_ok(dense(&[1, 2, 3], 4).into(), true, 0)]
    #[case::dense_bad_shape(dense(&[1, 2], 4).into(), true, 1)]
    #[case::dense_bad_shape_and_width(dense(&[1, 2], 12).into(), true, 2)]
    #[case::float(Attribute::Float(1.0), false, 1)]
    fn constant_agrees_with_type(
        registry: Registry,
        #[case] value: Attribute,
        #[case] shaped: bool,
        #[case] n_errors: usize,
    ) {
        let element = unchecked(17, 8);
        let ty = if shaped {
            Type::ranked(&[3], element)
        } else {
            element
        };
        let mut module = Module::new();
        let errs = errors(&mut module, &registry, constant(value, ty));
        assert_eq!(errs.len(), n_errors, "{errs:?}");
    }

    #[rstest]
    fn constant_rejects_dynamic_shape(registry: Registry) {
        use ciphir_core::types::Dim;
        let ty = Type::tensor([Dim::Dynamic], unchecked(17, 8));
        let mut module = Module::new();
        let errs = errors(&mut module, &registry, constant(dense(&[1, 2], 4), ty));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].starts_with("tensor shape must be static"));
    }
}
