//! Types of the RLWE ciphertext and plaintext model.
//!
//! A [`Ring`] is shared by every plaintext and ciphertext type built over it. Plaintexts pair a
//! ring with an [`Encoding`] and ciphertexts add the number of polynomials they are made of.

use crate::{error::TypeError, mod_arith::ModArithType, types::Type};
use internment::Intern;
use num_bigint::BigInt;
use num_traits::{One, Zero};
use std::{collections::BTreeMap, fmt};

/// Polynomial with integer coefficients in sparse form.
///
/// Terms are sorted by exponent and never have a zero coefficient.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Polynomial {
    terms: Vec<(u64, BigInt)>,
}

impl Polynomial {
    /// Creates a polynomial from `(coefficient, exponent)` terms, combining like terms.
    pub fn new<C: Into<BigInt>>(terms: impl IntoIterator<Item = (C, u64)>) -> Self {
        let mut acc = BTreeMap::<u64, BigInt>::new();
        for (coefficient, exponent) in terms {
            let coefficient: BigInt = coefficient.into();
            *acc.entry(exponent).or_default() += coefficient;
        }
        Self {
            terms: acc.into_iter().filter(|(_, c)| !c.is_zero()).collect(),
        }
    }

    /// Creates `x^n + 1`.
    pub fn cyclotomic(n: u64) -> Self {
        Self::new([(BigInt::one(), 0), (BigInt::one(), n)])
    }

    /// Returns the largest exponent with a non-zero coefficient.
    pub fn degree(&self) -> u64 {
        self.terms.last().map(|(e, _)| *e).unwrap_or_default()
    }

    /// Returns the coefficient of the given exponent.
    pub fn coefficient(&self, exponent: u64) -> BigInt {
        self.terms
            .iter()
            .find(|(e, _)| *e == exponent)
            .map(|(_, c)| c.clone())
            .unwrap_or_default()
    }
}

impl fmt::Debug for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (n, (exponent, coefficient)) in self.terms.iter().enumerate() {
            if n > 0 {
                write!(f, " + ")?;
            }
            match (*exponent, coefficient.is_one()) {
                (0, _) => write!(f, "{coefficient}")?,
                (1, true) => write!(f, "x")?,
                (1, false) => write!(f, "{coefficient}x")?,
                (e, true) => write!(f, "x**{e}")?,
                (e, false) => write!(f, "{coefficient}x**{e}")?,
            }
        }
        Ok(())
    }
}

/// Polynomial ring `Z_q[x] / (f(x))`.
///
/// Interned; two rings with the same coefficient type and polynomial modulus are equal.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Ring(Intern<RingImpl>);

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct RingImpl {
    coefficient_type: ModArithType,
    polynomial_modulus: Polynomial,
}

impl Ring {
    /// Creates a ring.
    ///
    /// Fails if the coefficient type has no spare bit or the polynomial modulus is a constant.
    pub fn new(
        coefficient_type: ModArithType,
        polynomial_modulus: Polynomial,
    ) -> Result<Self, TypeError> {
        coefficient_type.check()?;
        if polynomial_modulus.degree() == 0 {
            return Err(TypeError::ConstantPolynomialModulus(
                polynomial_modulus.to_string(),
            ));
        }
        Ok(Self(Intern::new(RingImpl {
            coefficient_type,
            polynomial_modulus,
        })))
    }

    /// Returns the type of the coefficients.
    pub fn coefficient_type(&self) -> ModArithType {
        self.0.coefficient_type
    }

    /// Returns the polynomial modulus.
    pub fn polynomial_modulus(&self) -> &Polynomial {
        &self.0.as_ref().polynomial_modulus
    }

    /// Returns the degree of the polynomial modulus, i.e. the number of slots.
    pub fn degree(&self) -> u64 {
        self.polynomial_modulus().degree()
    }
}

impl fmt::Debug for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#ring<{}, {}>",
            self.coefficient_type(),
            self.polynomial_modulus()
        )
    }
}

/// How cleartext messages are mapped into plaintext polynomials.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum EncodingKind {
    /// Messages are packed into slots through the CRT (BGV/BFV batching).
    FullCrtPacking,
    /// Messages are packed through the inverse canonical embedding (CKKS).
    InverseCanonical,
    /// Messages are placed directly in the coefficients.
    Coefficient,
    /// A single message is placed in the constant coefficient.
    ConstantCoefficient,
}

/// A plaintext encoding with its scaling factor.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Encoding {
    kind: EncodingKind,
    scaling_factor: u32,
}

impl Encoding {
    /// Creates a new encoding.
    pub fn new(kind: EncodingKind, scaling_factor: u32) -> Self {
        Self {
            kind,
            scaling_factor,
        }
    }

    /// Returns the kind of encoding.
    pub fn kind(&self) -> EncodingKind {
        self.kind
    }

    /// Returns the scaling factor.
    pub fn scaling_factor(&self) -> u32 {
        self.scaling_factor
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.kind {
            EncodingKind::FullCrtPacking => "full_crt_packing_encoding",
            EncodingKind::InverseCanonical => "inverse_canonical_encoding",
            EncodingKind::Coefficient => "coefficient_encoding",
            EncodingKind::ConstantCoefficient => "constant_coefficient_encoding",
        };
        write!(f, "#{name}<scaling_factor = {}>", self.scaling_factor)
    }
}

/// Semantic description of the cleartext carried by a plaintext or ciphertext.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ApplicationData {
    message_type: Type,
}

impl ApplicationData {
    /// Creates application data for messages of the given type.
    pub fn new(message_type: Type) -> Self {
        Self { message_type }
    }

    /// Returns the type of the message.
    pub fn message_type(&self) -> Type {
        self.message_type
    }
}

/// Space of encoded plaintexts.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct PlaintextSpace {
    ring: Ring,
    encoding: Encoding,
}

impl PlaintextSpace {
    /// Creates a plaintext space.
    pub fn new(ring: Ring, encoding: Encoding) -> Self {
        Self { ring, encoding }
    }

    /// Returns the ring.
    pub fn ring(&self) -> Ring {
        self.ring
    }

    /// Returns the encoding.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

/// Space of ciphertexts.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CiphertextSpace {
    ring: Ring,
    size: u32,
}

impl CiphertextSpace {
    /// Creates a ciphertext space of fresh (two polynomial) ciphertexts.
    pub fn new(ring: Ring) -> Self {
        Self { ring, size: 2 }
    }

    /// Creates a ciphertext space with the given number of polynomials.
    pub fn with_size(ring: Ring, size: u32) -> Result<Self, TypeError> {
        if size < 2 {
            return Err(TypeError::CiphertextSize(size));
        }
        Ok(Self { ring, size })
    }

    /// Returns the ring.
    pub fn ring(&self) -> Ring {
        self.ring
    }

    /// Returns the number of polynomials of the ciphertext.
    pub fn size(&self) -> u32 {
        self.size
    }
}

/// Type of an RLWE plaintext.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct PlaintextType {
    application_data: ApplicationData,
    plaintext_space: PlaintextSpace,
}

impl PlaintextType {
    /// Creates a plaintext type.
    pub fn new(application_data: ApplicationData, plaintext_space: PlaintextSpace) -> Self {
        Self {
            application_data,
            plaintext_space,
        }
    }

    /// Returns the application data.
    pub fn application_data(&self) -> ApplicationData {
        self.application_data
    }

    /// Returns the plaintext space.
    pub fn plaintext_space(&self) -> PlaintextSpace {
        self.plaintext_space
    }
}

impl fmt::Display for PlaintextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "!lwe.pt<{}, {}, {}>",
            self.application_data.message_type,
            self.plaintext_space.encoding,
            self.plaintext_space.ring
        )
    }
}

/// Type of an RLWE ciphertext: application data, plaintext space and ciphertext space.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CiphertextType {
    application_data: ApplicationData,
    plaintext_space: PlaintextSpace,
    ciphertext_space: CiphertextSpace,
}

impl CiphertextType {
    /// Creates a ciphertext type.
    ///
    /// Fails if the plaintext and ciphertext spaces use different rings.
    pub fn new(
        application_data: ApplicationData,
        plaintext_space: PlaintextSpace,
        ciphertext_space: CiphertextSpace,
    ) -> Result<Self, TypeError> {
        if plaintext_space.ring != ciphertext_space.ring {
            return Err(TypeError::RingMismatch {
                plaintext: plaintext_space.ring.to_string(),
                ciphertext: ciphertext_space.ring.to_string(),
            });
        }
        Ok(Self {
            application_data,
            plaintext_space,
            ciphertext_space,
        })
    }

    /// Returns the application data.
    pub fn application_data(&self) -> ApplicationData {
        self.application_data
    }

    /// Returns the plaintext space.
    pub fn plaintext_space(&self) -> PlaintextSpace {
        self.plaintext_space
    }

    /// Returns the ciphertext space.
    pub fn ciphertext_space(&self) -> CiphertextSpace {
        self.ciphertext_space
    }

    /// Returns the ring shared by both spaces.
    pub fn ring(&self) -> Ring {
        self.ciphertext_space.ring
    }

    /// Returns the same type describing a different message.
    pub fn with_application_data(self, application_data: ApplicationData) -> Self {
        Self {
            application_data,
            ..self
        }
    }

    /// Returns the same type with a different number of polynomials.
    pub fn with_size(self, size: u32) -> Result<Self, TypeError> {
        Ok(Self {
            ciphertext_space: CiphertextSpace::with_size(self.ring(), size)?,
            ..self
        })
    }
}

impl fmt::Display for CiphertextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "!lwe.ct<{}, {}, {}, size = {}>",
            self.application_data.message_type,
            self.plaintext_space.encoding,
            self.ciphertext_space.ring,
            self.ciphertext_space.size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn ring() -> Ring {
        Ring::new(
            ModArithType::new(65537u32, 32).unwrap(),
            Polynomial::cyclotomic(8),
        )
        .unwrap()
    }

    #[test]
    fn polynomial_combines_like_terms() {
        let p = Polynomial::new([(1, 0), (2, 3), (-1, 0), (1, 8)]);
        assert_eq!(p.degree(), 8);
        assert_eq!(p.coefficient(0), BigInt::zero());
        assert_eq!(p.to_string(), "2x**3 + x**8");
        assert_eq!(Polynomial::cyclotomic(16).to_string(), "1 + x**16");
    }

    #[rstest]
    fn ring_degree(ring: Ring) {
        assert_eq!(ring.degree(), 8);
        assert_eq!(ring.coefficient_type().storage_width(), 32);
    }

    #[test]
    fn constant_polynomial_is_not_a_ring_modulus() {
        let err = Ring::new(
            ModArithType::new(17u32, 8).unwrap(),
            Polynomial::new([(5, 0)]),
        );
        assert!(matches!(err, Err(TypeError::ConstantPolynomialModulus(_))));
    }

    #[test]
    fn ring_coefficients_need_a_spare_bit() {
        let ty = ModArithType::from_apint(crate::apint::ApInt::new(255u32, 8).unwrap());
        assert!(matches!(
            Ring::new(ty, Polynomial::cyclotomic(4)),
            Err(TypeError::ModulusTooWide { .. })
        ));
    }

    #[rstest]
    fn mismatched_rings_are_rejected(ring: Ring) {
        let other = Ring::new(
            ModArithType::new(65537u32, 32).unwrap(),
            Polynomial::cyclotomic(16),
        )
        .unwrap();
        let encoding = Encoding::new(EncodingKind::FullCrtPacking, 0);
        let result = CiphertextType::new(
            ApplicationData::new(Type::ranked(&[8], Type::integer(16))),
            PlaintextSpace::new(ring, encoding),
            CiphertextSpace::new(other),
        );
        assert!(matches!(result, Err(TypeError::RingMismatch { .. })));
    }

    #[rstest]
    fn ciphertext_size(ring: Ring) {
        assert_eq!(
            CiphertextSpace::with_size(ring, 1),
            Err(TypeError::CiphertextSize(1))
        );
        let encoding = Encoding::new(EncodingKind::InverseCanonical, 45);
        let ct = CiphertextType::new(
            ApplicationData::new(Type::ranked(&[8], Type::integer(16))),
            PlaintextSpace::new(ring, encoding),
            CiphertextSpace::new(ring),
        )
        .unwrap();
        assert_eq!(ct.with_size(3).unwrap().ciphertext_space().size(), 3);
    }
}
