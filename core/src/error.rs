//! Error type.

use crate::apint::IntError;
use num_bigint::BigUint;
use thiserror::Error;

/// Errors raised while constructing types whose invariants do not hold.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum TypeError {
    /// The integer backing a type could not be built.
    #[error(transparent)]
    Int(#[from] IntError),
    /// The modulus leaves no spare bit in the storage type.
    #[error(
        "underlying type's bitwidth must be 1 bit larger than the modulus bitwidth, but got {storage_width} while modulus {modulus} requires width {modulus_width}"
    )]
    ModulusTooWide {
        /// The modulus.
        modulus: BigUint,
        /// Bits needed by the modulus.
        modulus_width: u32,
        /// Width of the storage type.
        storage_width: u32,
    },
    /// The polynomial modulus of a ring is a constant.
    #[error("ring polynomial modulus {0} must have degree at least 1")]
    ConstantPolynomialModulus(String),
    /// A ciphertext must be made of at least two polynomials.
    #[error("ciphertext space must hold at least 2 polynomials, got {0}")]
    CiphertextSize(u32),
    /// Plaintext and ciphertext spaces of an RLWE type were built over different rings.
    #[error("plaintext ring {plaintext} does not match ciphertext ring {ciphertext}")]
    RingMismatch {
        /// Ring of the plaintext space.
        plaintext: String,
        /// Ring of the ciphertext space.
        ciphertext: String,
    },
}
