//! Modular integer type.

use crate::{
    apint::{ApInt, active_bits},
    error::TypeError,
};
use num_bigint::BigUint;
use std::fmt;

/// Integers reduced under a modulus and stored in a fixed-width integer.
///
/// The modulus is kept as an [`ApInt`] whose width is the storage width, so the type is
/// [`Copy`] and two instances with equal modulus and width are interchangeable.
///
/// A well-formed type keeps at least one spare bit above the modulus, i.e.
/// `active_bits(modulus) <= storage_width - 1`, which lowerings rely on to detect carries and
/// borrows without widening.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModArithType {
    modulus: ApInt,
}

impl ModArithType {
    /// Creates a modular type, rejecting moduli that leave no spare bit in the storage width.
    pub fn new(modulus: impl Into<BigUint>, storage_width: u32) -> Result<Self, TypeError> {
        let modulus = modulus.into();
        let modulus_width = active_bits(&modulus);
        if storage_width > 0 && modulus_width > storage_width - 1 {
            return Err(TypeError::ModulusTooWide {
                modulus,
                modulus_width,
                storage_width,
            });
        }
        Ok(Self {
            modulus: ApInt::new(modulus, storage_width)?,
        })
    }

    /// Creates a modular type from a modulus without checking for the spare bit.
    ///
    /// Types built this way are checked by the verifier of every operation that produces them.
    pub fn from_apint(modulus: ApInt) -> Self {
        Self { modulus }
    }

    /// Returns the modulus.
    pub fn modulus(&self) -> &ApInt {
        &self.modulus
    }

    /// Returns the width of the storage integer.
    pub fn storage_width(&self) -> u32 {
        self.modulus.width()
    }

    /// Returns the number of bits the modulus needs.
    pub fn modulus_width(&self) -> u32 {
        self.modulus.active_bits()
    }

    /// Returns true if there is at least one unused bit above the modulus.
    pub fn has_spare_bit(&self) -> bool {
        self.modulus_width() < self.storage_width()
    }

    /// Checks the spare bit invariant.
    pub fn check(&self) -> Result<(), TypeError> {
        if self.has_spare_bit() {
            return Ok(());
        }
        Err(TypeError::ModulusTooWide {
            modulus: self.modulus.value().clone(),
            modulus_width: self.modulus_width(),
            storage_width: self.storage_width(),
        })
    }
}

impl fmt::Debug for ModArithType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for ModArithType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "!mod_arith.int<{} : i{}>",
            self.modulus.value(),
            self.storage_width()
        )
    }
}
