//! Fixed-width arbitrary-precision integers.

use internment::Intern;
use num_bigint::{BigInt, BigUint};
use num_traits::{One, ToPrimitive, Zero};
use std::fmt;
use thiserror::Error;

/// Returns the minimal number of bits needed to represent the value.
///
/// Zero has no active bits.
pub fn active_bits(value: &BigUint) -> u32 {
    u32::try_from(value.bits()).unwrap_or(u32::MAX)
}

fn mask(width: u32) -> BigUint {
    (BigUint::one() << width) - 1u32
}

/// Lightweight representation of a bit pattern with an explicit width.
///
/// The bits are stored as an unsigned value interned with [`internment`], which keeps the type
/// [`Copy`] and shares common values such as zero and one. Whether the pattern is read as signed
/// or unsigned is up to the caller, as with LLVM's `APInt`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApInt {
    value: Intern<BigUint>,
    width: u32,
}

impl ApInt {
    /// Creates an integer of the given width.
    ///
    /// Fails if the width is zero or the value needs more bits than the width provides.
    pub fn new(value: impl Into<BigUint>, width: u32) -> Result<Self, IntError> {
        if width == 0 {
            return Err(IntError::ZeroWidth);
        }
        let value = value.into();
        let bits = active_bits(&value);
        if bits > width {
            return Err(IntError::ValueTooWide { value, bits, width });
        }
        Ok(Self::from_parts(value, width))
    }

    /// Creates an integer from a signed value, storing negative values in two's complement.
    ///
    /// Accepts anything in `[-2^(width-1), 2^width)` so that both the signed and the unsigned
    /// reading of a width are representable.
    pub fn from_signed(value: impl Into<BigInt>, width: u32) -> Result<Self, IntError> {
        if width == 0 {
            return Err(IntError::ZeroWidth);
        }
        let value = value.into();
        if let Some(unsigned) = value.to_biguint() {
            return Self::new(unsigned, width);
        }
        let magnitude = value.magnitude();
        if *magnitude > BigUint::one() << (width - 1) {
            return Err(IntError::SignedOutOfRange { value, width });
        }
        Ok(Self::from_parts((BigUint::one() << width) - magnitude, width))
    }

    /// Creates a 64-bit integer holding the two's complement of the value.
    pub fn from_i64(value: i64) -> Self {
        Self::from_parts(BigUint::from(value as u64), 64)
    }

    /// Creates a zero of the given width.
    pub fn zero(width: u32) -> Result<Self, IntError> {
        if width == 0 {
            return Err(IntError::ZeroWidth);
        }
        Ok(Self::from_parts(BigUint::zero(), width))
    }

    /// Creates an integer whose width is exactly the number of bits the value needs.
    ///
    /// Zero gets a width of one bit.
    pub fn natural(value: impl Into<BigUint>) -> Self {
        let value = value.into();
        let width = active_bits(&value).max(1);
        Self::from_parts(value, width)
    }

    fn from_parts(value: BigUint, width: u32) -> Self {
        Self {
            value: Intern::new(value),
            width,
        }
    }

    /// Returns the width in bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the bit pattern read as an unsigned value.
    pub fn value(&self) -> &BigUint {
        self.value.as_ref()
    }

    /// Returns the number of bits needed to represent the unsigned value.
    pub fn active_bits(&self) -> u32 {
        active_bits(self.value())
    }

    /// Returns true if every bit is zero.
    pub fn is_zero(&self) -> bool {
        self.value().is_zero()
    }

    /// Returns true if the sign bit is set.
    pub fn is_negative(&self) -> bool {
        self.value().bit(u64::from(self.width - 1))
    }

    /// Returns the bit pattern read as a two's complement value.
    pub fn to_signed(&self) -> BigInt {
        let value = BigInt::from(self.value().clone());
        if self.is_negative() {
            value - (BigInt::one() << self.width)
        } else {
            value
        }
    }

    /// Returns the signed reading of the value if it fits in an [`i64`].
    pub fn to_i64(&self) -> Option<i64> {
        self.to_signed().to_i64()
    }

    /// Keeps the lowest `width` bits. Fails if `width` is zero or wider than the integer.
    pub fn trunc(self, width: u32) -> Result<Self, IntError> {
        if width == 0 {
            return Err(IntError::ZeroWidth);
        }
        if width > self.width {
            return Err(IntError::InvalidResize {
                from: self.width,
                to: width,
            });
        }
        Ok(Self::from_parts(self.value() & &mask(width), width))
    }

    /// Widens the integer filling the new high bits with zeros. Fails if `width` is narrower
    /// than the integer.
    pub fn zext(self, width: u32) -> Result<Self, IntError> {
        if width < self.width {
            return Err(IntError::InvalidResize {
                from: self.width,
                to: width,
            });
        }
        Ok(Self::from_parts(self.value().clone(), width))
    }

    /// Zero-extends or truncates the integer to the given width.
    pub fn zext_or_trunc(self, width: u32) -> Result<Self, IntError> {
        if width >= self.width {
            self.zext(width)
        } else {
            self.trunc(width)
        }
    }

    /// Subtracts one, wrapping around at zero.
    pub fn wrapping_dec(self) -> Self {
        if self.is_zero() {
            Self::from_parts(mask(self.width), self.width)
        } else {
            Self::from_parts(self.value().clone() - 1u32, self.width)
        }
    }
}

impl fmt::Debug for ApInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:i{}", self.value(), self.width)
    }
}

impl fmt::Display for ApInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Errors related to the construction of [`ApInt`] values.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum IntError {
    /// Happens when creating an integer with no bits.
    #[error("integer width must be at least one bit")]
    ZeroWidth,
    /// Happens when the value does not fit in the requested width.
    #[error("value {value} needs {bits} bits but the width is {width}")]
    ValueTooWide {
        /// The offending value.
        value: BigUint,
        /// Bits needed by the value.
        bits: u32,
        /// Requested width.
        width: u32,
    },
    /// Happens when a negative value is below the smallest signed value of the width.
    #[error("value {value} is out of range for a {width}-bit integer")]
    SignedOutOfRange {
        /// The offending value.
        value: BigInt,
        /// Requested width.
        width: u32,
    },
    /// Happens when truncating to a larger width or extending to a smaller one.
    #[error("cannot resize a {from}-bit integer to {to} bits")]
    InvalidResize {
        /// Width of the integer.
        from: u32,
        /// Requested width.
        to: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;
    use rstest::rstest;

    #[quickcheck]
    fn natural_width_matches_active_bits(x: u64) -> bool {
        let i = ApInt::natural(x);
        i.width() == (64 - x.leading_zeros()).max(1) && i.value() == &BigUint::from(x)
    }

    #[quickcheck]
    fn zext_then_trunc_is_identity(x: u32, extra: u8) -> bool {
        let i = ApInt::natural(x);
        let w = i.width();
        i.zext(w + u32::from(extra)).and_then(|wide| wide.trunc(w)) == Ok(i)
    }

    #[quickcheck]
    fn signed_roundtrip(x: i32) -> bool {
        let i = ApInt::from_signed(x, 32).unwrap();
        i.to_i64() == Some(i64::from(x)) && i.is_negative() == (x < 0)
    }

    #[quickcheck]
    fn trunc_keeps_low_bits(x: u64) -> bool {
        let i = ApInt::new(x, 64).unwrap().trunc(16).unwrap();
        i.value() == &BigUint::from(x & 0xffff)
    }

    #[rstest]
    #[case(0u32, 1, true)]
    #[case(1, 1, true)]
    #[case(2, 1, false)]
    #[case(255, 8, true)]
    #[case(256, 8, false)]
    fn new_checks_width(#[case] value: u32, #[case] width: u32, #[case] ok: bool) {
        assert_eq!(ApInt::new(value, width).is_ok(), ok);
    }

    #[test]
    fn zero_width_is_rejected() {
        assert_eq!(ApInt::new(0u32, 0), Err(IntError::ZeroWidth));
        assert_eq!(ApInt::from_signed(-1, 0), Err(IntError::ZeroWidth));
    }

    #[quickcheck]
    fn from_i64_matches_from_signed(x: i64) -> bool {
        ApInt::from_i64(x) == ApInt::from_signed(x, 64).unwrap()
    }

    #[test]
    fn signed_range() {
        assert!(ApInt::from_signed(-128, 8).is_ok());
        assert!(ApInt::from_signed(-129, 8).is_err());
        assert_eq!(ApInt::from_signed(-1, 8).unwrap().value(), &BigUint::from(255u32));
    }

    #[test]
    fn wrapping_dec_wraps_at_zero() {
        assert_eq!(
            ApInt::zero(4).unwrap().wrapping_dec(),
            ApInt::new(15u32, 4).unwrap()
        );
        assert_eq!(
            ApInt::new(17u32, 8).unwrap().wrapping_dec(),
            ApInt::new(16u32, 8).unwrap()
        );
    }

    #[test]
    fn zext_or_trunc_picks_direction() {
        let i = ApInt::new(0b1011u32, 4).unwrap();
        assert_eq!(i.zext_or_trunc(8).unwrap().width(), 8);
        assert_eq!(i.zext_or_trunc(2).unwrap().value(), &BigUint::from(0b11u32));
    }

    #[test]
    fn resizing_in_the_wrong_direction_fails() {
        let i = ApInt::new(0b1011u32, 4).unwrap();
        assert_eq!(i.trunc(8), Err(IntError::InvalidResize { from: 4, to: 8 }));
        assert_eq!(i.zext(2), Err(IntError::InvalidResize { from: 4, to: 2 }));
        assert_eq!(i.trunc(0), Err(IntError::ZeroWidth));
        assert_eq!(i.zext_or_trunc(0), Err(IntError::ZeroWidth));
        assert_eq!(ApInt::zero(0), Err(IntError::ZeroWidth));
    }
}
