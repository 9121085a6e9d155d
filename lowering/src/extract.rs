//! Lowering of slot extraction to plaintext masking and rotation.
//!
//! An extract of slot `k` from a ciphertext of `n` slots becomes
//!
//! 1. an `arith.constant` holding a `tensor<n x elem>` with a one in slot `k`,
//! 2. an `lwe.rlwe_encode` of that tensor in the ciphertext's plaintext space,
//! 3. a `mul_plain` of the ciphertext by the mask,
//! 4. a `rotate` by `k` so the selected slot moves to the front,
//! 5. an `lwe.reinterpret_underlying_type` to the extract's result type.

use std::{fmt, marker::PhantomData};

use ciphir_core::{
    apint::ApInt,
    rlwe::{CiphertextType, PlaintextType},
    types::{Type, TypeKind},
};
use ciphir_ir::{
    attr::{Attribute, DenseFloatElements, DenseIntElements},
    dialect::{arith, lwe, scheme::infer_mul_plain_result},
    module::{Module, OpRef},
    ops::{OpId, OpKind, OperationState, ValueId},
    rewrite::{RewriteError, RewritePattern, Rewriter},
};
use num_traits::ToPrimitive as _;

use crate::{Result, error::Error, scheme::RlweScheme};

/// Rewrites the extract operation of scheme `S`.
pub struct ConvertExtract<S> {
    _scheme: PhantomData<S>,
}

impl<S: RlweScheme> ConvertExtract<S> {
    /// Creates the pattern.
    pub fn new() -> Self {
        Self {
            _scheme: PhantomData,
        }
    }
}

impl<S: RlweScheme> Default for ConvertExtract<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RlweScheme> fmt::Debug for ConvertExtract<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConvertExtract({})", S::EXTRACT)
    }
}

/// Everything read from the extract before the module is touched.
#[derive(Debug)]
struct Extraction {
    input: ValueId,
    ciphertext: CiphertextType,
    result: Type,
    offset: ApInt,
    slot: u64,
    element: Type,
}

impl Extraction {
    fn degree(&self) -> u64 {
        self.ciphertext.ring().degree()
    }

    /// Mask selecting the extracted slot.
    fn one_hot(&self) -> Result<Attribute> {
        let degree = self.degree();
        let shape = vec![degree];
        if let TypeKind::Float(kind) = self.element.kind() {
            let values = (0..degree)
                .map(|i| if i == self.slot { 1.0 } else { 0.0 })
                .collect::<Vec<_>>();
            return Ok(DenseFloatElements::new(shape, *kind, values)?.into());
        }
        let width = self
            .element
            .int_or_float_width()
            .ok_or(Error::NonScalarElement {
                input: self.ciphertext.application_data().message_type(),
                output: self.element,
            })?;
        let (zero, one) = (ApInt::new(0u32, width)?, ApInt::new(1u32, width)?);
        let values = (0..degree)
            .map(|i| if i == self.slot { one } else { zero })
            .collect::<Vec<_>>();
        Ok(DenseIntElements::new(shape, width, values)?.into())
    }
}

fn ciphertext_of(module: &Module, value: ValueId, what: &'static str) -> Result<CiphertextType> {
    let ty = module
        .value_type(value)
        .ok_or(Error::Ir(ciphir_ir::error::Error::UnknownValue(value)))?;
    ty.as_ciphertext()
        .copied()
        .ok_or(Error::NotCiphertext { what, ty })
}

fn analyze(op: &OpRef<'_>) -> Result<Extraction> {
    let module = op.module();
    let input = op.operand(0).ok_or(Error::Malformed("input operand"))?;
    let offset_value = op.operand(1).ok_or(Error::Malformed("offset operand"))?;
    let result_value = op.result(0).ok_or(Error::Malformed("result"))?;
    let ciphertext = ciphertext_of(module, input, "input")?;
    let result = ciphertext_of(module, result_value, "result")?;

    let offset = module
        .defining_op(offset_value)
        .and_then(|def| arith::constant_integer(&def))
        .ok_or(Error::NonConstantOffset(offset_value))?;

    let element = result.application_data().message_type();
    if !element.is_int_or_float() {
        return Err(Error::NonScalarElement {
            input: ciphertext.application_data().message_type(),
            output: element,
        });
    }

    let degree = ciphertext.ring().degree();
    let signed = offset.to_signed();
    let slot = signed
        .to_u64()
        .filter(|slot| *slot < degree)
        .ok_or(Error::OffsetOutOfRange {
            offset: signed,
            degree,
        })?;

    Ok(Extraction {
        input,
        ciphertext,
        result: result.into(),
        offset,
        slot,
        element,
    })
}

fn lower<S: RlweScheme>(op: OpId, extraction: &Extraction, rewriter: &mut Rewriter<'_>) -> Result<()> {
    let ciphertext = extraction.ciphertext;
    let space = ciphertext.plaintext_space();

    let mask_type = Type::ranked(&[extraction.degree()], extraction.element);
    let mask = rewriter.create_value(arith::constant(extraction.one_hot()?, mask_type))?;

    let plaintext = PlaintextType::new(ciphertext.application_data(), space);
    let encoded = rewriter.create_value(lwe::rlwe_encode(
        mask,
        space.encoding(),
        space.ring(),
        plaintext,
    ))?;

    let product_type = infer_mul_plain_result(&ciphertext, &plaintext)?;
    let product = rewriter.create_value(
        OperationState::new(S::MUL_PLAIN)
            .with_operands([extraction.input, encoded])
            .with_result_type(product_type.into()),
    )?;

    let rotated = rewriter.create_value(
        OperationState::new(S::ROTATE)
            .with_operand(product)
            .with_attr("offset", extraction.offset)
            .with_result_type(product_type.into()),
    )?;

    let recast = rewriter.create_value(lwe::reinterpret_underlying_type(
        rotated,
        extraction.result,
    ))?;
    rewriter.replace_op(op, &[recast])?;
    Ok(())
}

impl<S: RlweScheme> RewritePattern for ConvertExtract<S> {
    fn name(&self) -> &str {
        "convert-extract"
    }

    fn root(&self) -> OpKind {
        S::EXTRACT
    }

    fn match_and_rewrite(
        &self,
        op: OpId,
        rewriter: &mut Rewriter<'_>,
    ) -> std::result::Result<(), RewriteError> {
        let extraction = {
            let target = rewriter.module().op(op).ok_or(RewriteError::NoMatch)?;
            if target.kind() != S::EXTRACT {
                return Err(RewriteError::NoMatch);
            }
            analyze(&target)?
        };
        log::debug!(
            "[ConvertExtract::match_and_rewrite] {op}: slot {} of {}",
            extraction.slot,
            extraction.degree()
        );
        lower::<S>(op, &extraction, rewriter)?;
        Ok(())
    }
}
