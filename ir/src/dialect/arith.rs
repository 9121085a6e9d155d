//! Plain integer, index and float constants.

use ciphir_core::{
    apint::ApInt,
    types::{Type, TypeKind, INDEX_WIDTH},
};

use crate::{
    attr::Attribute,
    diagnostics::OpDiagnostic,
    module::OpRef,
    ops::{OpKind, OperationState},
    registry::{OpInfo, Registry},
};

use super::{result_type, verified};

/// Operations of the `arith` dialect.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ArithOp {
    /// Constant value held in the `value` attribute.
    Constant,
}

impl ArithOp {
    /// Name of the operation.
    pub fn name(self) -> &'static str {
        match self {
            Self::Constant => "constant",
        }
    }
}

pub(crate) fn register(registry: &mut Registry) {
    registry.register(
        ArithOp::Constant,
        OpInfo::new(0, 1).with_verifier(verify_constant),
    );
}

/// Builds a constant of the given type.
pub fn constant(value: impl Into<Attribute>, ty: Type) -> OperationState {
    OperationState::new(ArithOp::Constant)
        .with_attr("value", value)
        .with_result_type(ty)
}

/// Builds an integer constant whose type width is the width of the value.
pub fn integer_constant(value: ApInt) -> OperationState {
    constant(value, Type::integer(value.width()))
}

/// Builds an `index` constant.
pub fn index_constant(value: i64) -> OperationState {
    constant(ApInt::from_i64(value), Type::index())
}

/// Returns the integer held by `op` if it is an `arith.constant` with an integer value.
pub fn constant_integer(op: &OpRef<'_>) -> Option<ApInt> {
    if op.kind() != OpKind::Arith(ArithOp::Constant) {
        return None;
    }
    op.attr("value").and_then(Attribute::as_integer)
}

fn scalar_width(ty: Type) -> Option<u32> {
    match ty.kind() {
        TypeKind::Integer(width) => Some(*width),
        TypeKind::Index => Some(INDEX_WIDTH),
        _ => None,
    }
}

fn check_constant(op: &OpRef<'_>) -> Result<(), OpDiagnostic> {
    let ty = result_type(op, 0)?;
    let value = op
        .attr("value")
        .ok_or_else(|| op.emit_error("requires a `value` attribute"))?;
    let mismatch = || {
        op.emit_error(format!(
            "{} value does not match result type {ty}",
            value.kind_name()
        ))
    };
    match value {
        Attribute::Integer(int) => {
            let width = scalar_width(ty).ok_or_else(mismatch)?;
            if int.width() != width {
                return Err(op.emit_error(format!(
                    "value width {} does not match result type {ty}",
                    int.width()
                )));
            }
        }
        Attribute::Float(_) => {
            if !matches!(ty.kind(), TypeKind::Float(_)) {
                return Err(mismatch());
            }
        }
        Attribute::DenseInt(_) | Attribute::DenseFloat(_) => {
            let tensor = ty.as_tensor().ok_or_else(mismatch)?;
            if tensor.static_shape().as_deref() != value.dense_shape() {
                return Err(mismatch());
            }
            let element_matches = match (value, tensor.element().kind()) {
                (Attribute::DenseInt(dense), _) => {
                    scalar_width(tensor.element()) == Some(dense.element_width())
                }
                (Attribute::DenseFloat(dense), TypeKind::Float(kind)) => {
                    *kind == dense.element_kind()
                }
                _ => false,
            };
            if !element_matches {
                return Err(mismatch());
            }
        }
        Attribute::Encoding(_) | Attribute::Ring(_) => return Err(mismatch()),
    }
    Ok(())
}

fn verify_constant(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    verified(check_constant(op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attr::{DenseFloatElements, DenseIntElements},
        module::Module,
    };
    use ciphir_core::{mod_arith::ModArithType, types::FloatKind};
    use rstest::rstest;

    fn ones(n: usize, width: u32) -> Attribute {
        let values = vec![ApInt::new(1u32, width).unwrap(); n];
        DenseIntElements::new(vec![n as u64], width, values)
            .unwrap()
            .into()
    }

    #[rstest]
    #[case(ApInt::new(3u32, 32).unwrap().into(), Type::integer(32), true)]
    #[case(ApInt::new(3u32, 16).unwrap().into(), Type::integer(32), false)]
    #[case(ApInt::from_i64(-1).into(), Type::index(), true)]
    #[case(Attribute::Float(0.5), Type::float(FloatKind::F32), true)]
    #[case(Attribute::Float(0.5), Type::integer(32), false)]
    #[case(ones(8, 16), Type::ranked(&[8], Type::integer(16)), true)]
    #[case(ones(8, 64), Type::ranked(&[8], Type::index()), true)]
    #[case(ones(4, 16), Type::ranked(&[8], Type::integer(16)), false)]
    #[case(ones(8, 16), Type::integer(16), false)]
    #[case(
        DenseFloatElements::new(vec![2], FloatKind::F64, vec![0.0, 1.0]).unwrap().into(),
        Type::ranked(&[2], Type::float(FloatKind::F64)),
        true
    )]
    #[case(
        DenseFloatElements::new(vec![2], FloatKind::F64, vec![0.0, 1.0]).unwrap().into(),
        Type::ranked(&[2], Type::float(FloatKind::F32)),
        false
    )]
    fn constant_matches_type(#[case] value: Attribute, #[case] ty: Type, #[case] ok: bool) {
        let mut module = Module::new();
        let created = module.create(&Registry::with_dialects(), constant(value, ty));
        assert_eq!(created.is_ok(), ok, "{created:?}");
    }

    #[test]
    fn reads_constant_integers() {
        let registry = Registry::with_dialects();
        let mut module = Module::new();
        let id = module.create(&registry, index_constant(3)).unwrap();
        let op = module.op(id).unwrap();
        assert_eq!(constant_integer(&op).and_then(|v| v.to_i64()), Some(3));
        let id = module
            .create(&registry, integer_constant(ApInt::new(7u32, 8).unwrap()))
            .unwrap();
        assert_eq!(
            module.op(id).unwrap().result_type(0),
            Some(Type::integer(8))
        );
        let id = module
            .create(
                &registry,
                crate::dialect::mod_arith::constant(
                    ApInt::new(3u32, 32).unwrap(),
                    ModArithType::new(17u32, 32).unwrap().into(),
                ),
            )
            .unwrap();
        assert_eq!(constant_integer(&module.op(id).unwrap()), None);
    }
}
