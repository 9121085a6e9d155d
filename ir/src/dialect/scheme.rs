//! Operations shared by the `bgv` and `ckks` scheme dialects.
//!
//! Both schemes expose the same ciphertext arithmetic, so the operations are defined once and
//! registered under each scheme's namespace.

use ciphir_core::{
    error::TypeError,
    rlwe::{CiphertextSpace, CiphertextType, Encoding, PlaintextSpace, PlaintextType, Ring},
};
use num_bigint::BigUint;
use num_traits::Zero;
use thiserror::Error;

use crate::{
    attr::Attribute,
    diagnostics::OpDiagnostic,
    module::OpRef,
    ops::{OpKind, OperationState, ValueId},
    registry::{OpInfo, Registry},
};

use super::{operand_type, result_type, verified};

/// RLWE schemes with a dialect of their own.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Scheme {
    /// Brakerski-Gentry-Vaikuntanathan, exact integer arithmetic.
    Bgv,
    /// Cheon-Kim-Kim-Song, approximate arithmetic.
    Ckks,
}

impl Scheme {
    /// Namespace of the scheme's dialect.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bgv => "bgv",
            Self::Ckks => "ckks",
        }
    }
}

/// Operations of a scheme dialect.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum SchemeOp {
    /// Ciphertext addition.
    Add,
    /// Ciphertext subtraction.
    Sub,
    /// Ciphertext multiplication.
    Mul,
    /// Multiplication of a ciphertext by a plaintext.
    MulPlain,
    /// Cyclic rotation of the slots by the `offset` attribute.
    Rotate,
    /// Brings a three-polynomial ciphertext back to two polynomials.
    Relinearize,
    /// Extracts the slot selected by the offset operand.
    Extract,
    /// Moves a `bgv` ciphertext to the smaller ring of the `to_ring` attribute.
    ModulusSwitch,
    /// Moves a `ckks` ciphertext to the smaller ring of the `to_ring` attribute, dividing the
    /// scale along the way.
    Rescale,
}

impl SchemeOp {
    /// Name of the operation.
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::MulPlain => "mul_plain",
            Self::Rotate => "rotate",
            Self::Relinearize => "relinearize",
            Self::Extract => "extract",
            Self::ModulusSwitch => "modulus_switch",
            Self::Rescale => "rescale",
        }
    }
}

pub(crate) fn register(registry: &mut Registry) {
    for scheme in [Scheme::Bgv, Scheme::Ckks] {
        let mut add = |op: SchemeOp, info: OpInfo| {
            registry.register(OpKind::Scheme(scheme, op), info);
        };
        add(SchemeOp::Add, OpInfo::new(2, 1).with_verifier(verify_add));
        add(SchemeOp::Sub, OpInfo::new(2, 1).with_verifier(verify_add));
        add(SchemeOp::Mul, OpInfo::new(2, 1).with_verifier(verify_mul));
        add(
            SchemeOp::MulPlain,
            OpInfo::new(2, 1).with_verifier(verify_mul_plain),
        );
        add(SchemeOp::Rotate, OpInfo::new(1, 1).with_verifier(verify_rotate));
        add(
            SchemeOp::Relinearize,
            OpInfo::new(1, 1).with_verifier(verify_relinearize),
        );
        add(
            SchemeOp::Extract,
            OpInfo::new(2, 1).with_verifier(verify_extract),
        );
        add(
            scheme.modulus_switch_op(),
            OpInfo::new(1, 1).with_verifier(verify_modulus_switch),
        );
    }
}

impl Scheme {
    /// The operation dropping a ciphertext to a smaller coefficient modulus.
    pub fn modulus_switch_op(self) -> SchemeOp {
        match self {
            Self::Bgv => SchemeOp::ModulusSwitch,
            Self::Ckks => SchemeOp::Rescale,
        }
    }
}

/// Builds the scheme's modulus switch of `input` to `to_ring`, with the inferred result type.
pub fn modulus_switch(
    scheme: Scheme,
    input: ValueId,
    input_type: &CiphertextType,
    to_ring: Ring,
) -> Result<OperationState, InferError> {
    let result = infer_modulus_switch_result(input_type, to_ring)?;
    Ok(OperationState::new(OpKind::Scheme(scheme, scheme.modulus_switch_op()))
        .with_operand(input)
        .with_attr("to_ring", to_ring)
        .with_result_type(result.into()))
}

/// Reasons a result type cannot be inferred from the operand types.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum InferError {
    /// Operands live in different rings.
    #[error("operands must share a ring, got {lhs} and {rhs}")]
    RingMismatch {
        /// Ring of the first operand.
        lhs: Ring,
        /// Ring of the second operand.
        rhs: Ring,
    },
    /// Operands use different plaintext encodings.
    #[error("operands must share an encoding, got {lhs} and {rhs}")]
    EncodingMismatch {
        /// Encoding of the first operand.
        lhs: Encoding,
        /// Encoding of the second operand.
        rhs: Encoding,
    },
    /// A modulus switch targets a ring over another polynomial modulus.
    #[error("input and output rings should have the same polynomial modulus, got {from} and {to}")]
    PolynomialMismatch {
        /// Ring of the input.
        from: Ring,
        /// Target ring.
        to: Ring,
    },
    /// A modulus switch does not drop to a proper divisor of the input modulus.
    #[error("target coefficient modulus {to} must be a proper divisor of {from}")]
    ModulusNotDropped {
        /// Coefficient modulus of the input.
        from: BigUint,
        /// Coefficient modulus of the target ring.
        to: BigUint,
    },
    /// The inferred ciphertext type is invalid.
    #[error(transparent)]
    Type(#[from] TypeError),
}

fn check_compatible(lhs: (Ring, Encoding), rhs: (Ring, Encoding)) -> Result<(), InferError> {
    if lhs.0 != rhs.0 {
        return Err(InferError::RingMismatch {
            lhs: lhs.0,
            rhs: rhs.0,
        });
    }
    if lhs.1 != rhs.1 {
        return Err(InferError::EncodingMismatch {
            lhs: lhs.1,
            rhs: rhs.1,
        });
    }
    Ok(())
}

fn ring_and_encoding(ty: &CiphertextType) -> (Ring, Encoding) {
    (ty.ring(), ty.plaintext_space().encoding())
}

fn size(ty: &CiphertextType) -> u32 {
    ty.ciphertext_space().size()
}

/// Result type of `add` and `sub`: the larger of the two ciphertexts.
pub fn infer_add_result(
    lhs: &CiphertextType,
    rhs: &CiphertextType,
) -> Result<CiphertextType, InferError> {
    check_compatible(ring_and_encoding(lhs), ring_and_encoding(rhs))?;
    Ok(lhs.with_size(size(lhs).max(size(rhs)))?)
}

/// Result type of `mul`: the sizes add up minus one.
pub fn infer_mul_result(
    lhs: &CiphertextType,
    rhs: &CiphertextType,
) -> Result<CiphertextType, InferError> {
    check_compatible(ring_and_encoding(lhs), ring_and_encoding(rhs))?;
    Ok(lhs.with_size(size(lhs) + size(rhs) - 1)?)
}

/// Result type of `mul_plain`: the ciphertext type is kept.
pub fn infer_mul_plain_result(
    ciphertext: &CiphertextType,
    plaintext: &PlaintextType,
) -> Result<CiphertextType, InferError> {
    let space = plaintext.plaintext_space();
    check_compatible(
        ring_and_encoding(ciphertext),
        (space.ring(), space.encoding()),
    )?;
    Ok(*ciphertext)
}

/// Result type of `modulus_switch` and `rescale`: the input moved to `to_ring`.
pub fn infer_modulus_switch_result(
    input: &CiphertextType,
    to_ring: Ring,
) -> Result<CiphertextType, InferError> {
    let from_ring = input.ring();
    if from_ring.polynomial_modulus() != to_ring.polynomial_modulus() {
        return Err(InferError::PolynomialMismatch {
            from: from_ring,
            to: to_ring,
        });
    }
    let from = from_ring.coefficient_type().modulus().value().clone();
    let to = to_ring.coefficient_type().modulus().value().clone();
    if to.is_zero() || to >= from || !(&from % &to).is_zero() {
        return Err(InferError::ModulusNotDropped { from, to });
    }
    let encoding = input.plaintext_space().encoding();
    Ok(CiphertextType::new(
        input.application_data(),
        PlaintextSpace::new(to_ring, encoding),
        CiphertextSpace::with_size(to_ring, size(input))?,
    )?)
}

fn ciphertext_operand(op: &OpRef<'_>, index: usize) -> Result<CiphertextType, OpDiagnostic> {
    let ty = operand_type(op, index)?;
    ty.as_ciphertext()
        .copied()
        .ok_or_else(|| op.emit_error(format!("operand #{index} must be a ciphertext, got {ty}")))
}

fn ciphertext_result(op: &OpRef<'_>) -> Result<CiphertextType, OpDiagnostic> {
    let ty = result_type(op, 0)?;
    ty.as_ciphertext()
        .copied()
        .ok_or_else(|| op.emit_error(format!("result must be a ciphertext, got {ty}")))
}

fn check_inferred(
    op: &OpRef<'_>,
    inferred: Result<CiphertextType, InferError>,
) -> Result<(), OpDiagnostic> {
    let inferred = inferred.map_err(|err| op.emit_error(err))?;
    let result = ciphertext_result(op)?;
    if result != inferred {
        return Err(op.emit_error(format!(
            "result type {result} does not match the inferred type {inferred}"
        )));
    }
    Ok(())
}

fn check_add(op: &OpRef<'_>) -> Result<(), OpDiagnostic> {
    let lhs = ciphertext_operand(op, 0)?;
    let rhs = ciphertext_operand(op, 1)?;
    check_inferred(op, infer_add_result(&lhs, &rhs))
}

fn verify_add(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    verified(check_add(op))
}

fn check_mul(op: &OpRef<'_>) -> Result<(), OpDiagnostic> {
    let lhs = ciphertext_operand(op, 0)?;
    let rhs = ciphertext_operand(op, 1)?;
    for (index, ty) in [(0, lhs), (1, rhs)] {
        if size(&ty) != 2 {
            return Err(op.emit_error(format!(
                "operand #{index} must have 2 polynomials, got {}",
                size(&ty)
            )));
        }
    }
    check_inferred(op, infer_mul_result(&lhs, &rhs))
}

fn verify_mul(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    verified(check_mul(op))
}

fn check_mul_plain(op: &OpRef<'_>) -> Result<(), OpDiagnostic> {
    let ciphertext = ciphertext_operand(op, 0)?;
    let ty = operand_type(op, 1)?;
    let plaintext = ty
        .as_plaintext()
        .ok_or_else(|| op.emit_error(format!("operand #1 must be a plaintext, got {ty}")))?;
    check_inferred(op, infer_mul_plain_result(&ciphertext, plaintext))
}

fn verify_mul_plain(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    verified(check_mul_plain(op))
}

fn check_rotate(op: &OpRef<'_>) -> Result<(), OpDiagnostic> {
    let input = ciphertext_operand(op, 0)?;
    if size(&input) != 2 {
        return Err(op.emit_error(format!(
            "input must have 2 polynomials, got {}",
            size(&input)
        )));
    }
    if op.attr("offset").and_then(Attribute::as_integer).is_none() {
        return Err(op.emit_error("requires an integer `offset` attribute"));
    }
    let result = ciphertext_result(op)?;
    if result != input {
        return Err(op.emit_error(format!(
            "result type {result} must match the input type {input}"
        )));
    }
    Ok(())
}

fn verify_rotate(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    verified(check_rotate(op))
}

fn check_relinearize(op: &OpRef<'_>) -> Result<(), OpDiagnostic> {
    let input = ciphertext_operand(op, 0)?;
    if size(&input) != 3 {
        return Err(op.emit_error(format!(
            "input must have 3 polynomials, got {}",
            size(&input)
        )));
    }
    let expected = input.with_size(2).map_err(|err| op.emit_error(err))?;
    let result = ciphertext_result(op)?;
    if result != expected {
        return Err(op.emit_error(format!(
            "result type {result} must be the input type with 2 polynomials"
        )));
    }
    Ok(())
}

fn verify_relinearize(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    verified(check_relinearize(op))
}

fn check_extract(op: &OpRef<'_>) -> Result<(), OpDiagnostic> {
    let input = ciphertext_operand(op, 0)?;
    let offset = operand_type(op, 1)?;
    if !offset.is_int_or_index() {
        return Err(op.emit_error(format!(
            "offset must be an integer or index, got {offset}"
        )));
    }
    let result = ciphertext_result(op)?;
    check_compatible(ring_and_encoding(&input), ring_and_encoding(&result))
        .map_err(|err| op.emit_error(err))
}

fn verify_extract(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    verified(check_extract(op))
}

fn check_modulus_switch(op: &OpRef<'_>) -> Result<(), OpDiagnostic> {
    let input = ciphertext_operand(op, 0)?;
    let to_ring = op
        .attr("to_ring")
        .and_then(Attribute::as_ring)
        .ok_or_else(|| op.emit_error("requires a `to_ring` attribute"))?;
    let result = ciphertext_result(op)?;
    if result.ring() != to_ring {
        return Err(op.emit_error(format!(
            "output ring {} should match to_ring {to_ring}",
            result.ring()
        )));
    }
    check_inferred(op, infer_modulus_switch_result(&input, to_ring))
}

fn verify_modulus_switch(op: &OpRef<'_>) -> Result<Vec<OpDiagnostic>, Vec<OpDiagnostic>> {
    verified(check_modulus_switch(op))
}
