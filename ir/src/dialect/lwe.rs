//! Scheme-agnostic RLWE operations.

use ciphir_core::{
    rlwe::{Encoding, PlaintextType, Ring},
    types::Type,
};

use crate::{
    attr::Attribute,
    diagnostics::OpDiagnostic,
    module::OpRef,
    ops::{OperationState, ValueId},
    registry::{OpInfo, Registry},
};

use super::{operand_type, result_type, verified};

/// Operations of the `lwe` dialect.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum LweOp {
    /// Encodes a cleartext into an RLWE plaintext.
    RlweEncode,
    /// Relabels the type of a ciphertext without touching its data.
    ReinterpretUnderlyingType,
}

impl LweOp {
    /// Name of the operation.
    pub fn name(self) -> &'static str {
        match self {
            Self::RlweEncode => "rlwe_encode",
            Self::ReinterpretUnderlyingType => "reinterpret_underlying_type",
        }
    }
}

pub(crate) fn register(registry: &mut Registry) {
    registry.register(
        LweOp::RlweEncode,
        OpInfo::new(1, 1).with_verifier(verify_rlwe_encode),
    );
    registry.register(
        LweOp::ReinterpretUnderlyingType,
        OpInfo::new(1, 1).with_verifier(verify_reinterpret),
    );
}

/// Builds an encoding of `input` into a plaintext of type `ty`.
pub fn rlwe_encode(input: ValueId, encoding: Encoding, ring: Ring, ty: PlaintextType) -> OperationState {
    OperationState::new(LweOp::RlweEncode)
        .with_operand(input)
        .with_attr("encoding", encoding)
        .with_attr("ring", ring)
        .with_result_type(ty.into())
}

/// Builds a reinterpretation of `input` as type `ty`.
pub fn reinterpret_underlying_type(input: ValueId, ty: Type) -> OperationState {
    OperationState::new(LweOp::ReinterpretUnderlyingType)
        .with_operand(input)
        .with_result_type(ty)
}

fn check_rlwe_encode(op: &OpRef<'_>) -> Result<(), OpDiagnostic> {
    let input = operand_type(op, 0)?;
    if !input.element_type_or_self().is_int_or_float() {
        return Err(op.emit_error(format!(
            "input must be an integer, float or a tensor of them, got {input}"
        )));
    }
    let output = result_type(op, 0)?;
    let plaintext = output
        .as_plaintext()
        .ok_or_else(|| op.emit_error(format!("result must be a plaintext, got {output}")))?;
    let space = plaintext.plaintext_space();
    let encoding = op
        .attr("encoding")
        .and_then(Attribute::as_encoding)
        .ok_or_else(|| op.emit_error("requires an `encoding` attribute"))?;
    let ring = op
        .attr("ring")
        .and_then(Attribute::as_ring)
        .ok_or_else(|| op.emit_error("requires a `ring` attribute"))?;
    if encoding != space.encoding() {
        return Err(op.emit_error(format!(
            "encoding {encoding} does not match the result encoding {}",
            space.encoding()
        )));
    }
    if ring != space.ring() {
        return Err(op.emit_error(format!(
            "ring {ring} does not match the result ring {}",
            space.ring()
        )));
    }
    Ok(())
}

fn verify_rlwe_encode(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    verified(check_rlwe_encode(op))
}

fn check_reinterpret(op: &OpRef<'_>) -> Result<(), OpDiagnostic> {
    let input = operand_type(op, 0)?;
    let output = result_type(op, 0)?;
    let (Some(from), Some(to)) = (input.as_ciphertext(), output.as_ciphertext()) else {
        return Err(op.emit_error(format!(
            "input and result must be ciphertexts, got {input} and {output}"
        )));
    };
    if from.ring() != to.ring() {
        return Err(op.emit_error(format!(
            "input ring {} does not match result ring {}",
            from.ring(),
            to.ring()
        )));
    }
    let (from_size, to_size) = (
        from.ciphertext_space().size(),
        to.ciphertext_space().size(),
    );
    if from_size != to_size {
        return Err(op.emit_error(format!(
            "input has {from_size} polynomials but the result has {to_size}"
        )));
    }
    Ok(())
}

fn verify_reinterpret(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    verified(check_reinterpret(op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;
    use ciphir_core::{
        mod_arith::ModArithType,
        rlwe::{
            ApplicationData, CiphertextSpace, CiphertextType, EncodingKind, PlaintextSpace,
            Polynomial,
        },
    };
    use rstest::{fixture, rstest};

    #[fixture]
    fn ring() -> Ring {
        Ring::new(
            ModArithType::new(65537u32, 32).unwrap(),
            Polynomial::cyclotomic(8),
        )
        .unwrap()
    }

    fn space(ring: Ring) -> PlaintextSpace {
        PlaintextSpace::new(ring, Encoding::new(EncodingKind::FullCrtPacking, 0))
    }

    fn ciphertext(ring: Ring, message: Type) -> Type {
        CiphertextType::new(
            ApplicationData::new(message),
            space(ring),
            CiphertextSpace::new(ring),
        )
        .unwrap()
        .into()
    }

    #[rstest]
    fn encode_checks_attributes(ring: Ring) {
        let registry = Registry::with_dialects();
        let mut module = Module::new();
        let cleartext = module.add_argument(Type::ranked(&[8], Type::integer(16)));
        let pt = PlaintextType::new(ApplicationData::new(Type::integer(16)), space(ring));
        let encoding = space(ring).encoding();
        assert!(
            module
                .create(&registry, rlwe_encode(cleartext, encoding, ring, pt))
                .is_ok()
        );

        let other = Encoding::new(EncodingKind::Coefficient, 0);
        assert!(
            module
                .create(&registry, rlwe_encode(cleartext, other, ring, pt))
                .is_err()
        );
        let other_ring = Ring::new(
            ModArithType::new(65537u32, 32).unwrap(),
            Polynomial::cyclotomic(16),
        )
        .unwrap();
        assert!(
            module
                .create(&registry, rlwe_encode(cleartext, encoding, other_ring, pt))
                .is_err()
        );
    }

    #[rstest]
    fn reinterpret_keeps_ring_and_size(ring: Ring) {
        let registry = Registry::with_dialects();
        let mut module = Module::new();
        let vector = ciphertext(ring, Type::ranked(&[8], Type::integer(16)));
        let ct = module.add_argument(vector);
        let scalar = ciphertext(ring, Type::integer(16));
        assert!(
            module
                .create(&registry, reinterpret_underlying_type(ct, scalar))
                .is_ok()
        );
        let grown = scalar.as_ciphertext().unwrap().with_size(3).unwrap();
        assert!(
            module
                .create(&registry, reinterpret_underlying_type(ct, grown.into()))
                .is_err()
        );
        assert!(
            module
                .create(&registry, reinterpret_underlying_type(ct, Type::integer(16)))
                .is_err()
        );
    }
}
