//! Schemes the extract lowering is instantiated for.

use ciphir_ir::{
    dialect::scheme::{Scheme, SchemeOp},
    ops::OpKind,
};

/// An RLWE scheme whose dialect provides slot extraction, plaintext multiplication and
/// rotation.
pub trait RlweScheme: 'static {
    /// The scheme's dialect.
    const SCHEME: Scheme;
    /// The extract operation being lowered.
    const EXTRACT: OpKind = OpKind::Scheme(Self::SCHEME, SchemeOp::Extract);
    /// Ciphertext-plaintext multiplication.
    const MUL_PLAIN: OpKind = OpKind::Scheme(Self::SCHEME, SchemeOp::MulPlain);
    /// Slot rotation.
    const ROTATE: OpKind = OpKind::Scheme(Self::SCHEME, SchemeOp::Rotate);
}

/// The `bgv` dialect.
#[derive(Copy, Clone, Debug, Default)]
pub struct Bgv;

impl RlweScheme for Bgv {
    const SCHEME: Scheme = Scheme::Bgv;
}

/// The `ckks` dialect.
#[derive(Copy, Clone, Debug, Default)]
pub struct Ckks;

impl RlweScheme for Ckks {
    const SCHEME: Scheme = Scheme::Ckks;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_live_in_the_scheme_dialect() {
        assert_eq!(Bgv::EXTRACT.to_string(), "bgv.extract");
        assert_eq!(Ckks::MUL_PLAIN.to_string(), "ckks.mul_plain");
        assert_eq!(Ckks::ROTATE.to_string(), "ckks.rotate");
    }
}
