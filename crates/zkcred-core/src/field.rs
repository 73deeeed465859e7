//! # Field Elements — Canonical BN254 Scalars
//!
//! Defines [`FieldElement`], the canonical representation of a BN254 scalar
//! field value: a plain decimal string, no sign, no leading zeros, strictly
//! below the field prime.
//!
//! ## Security Invariant
//!
//! Proving primitives silently reduce out-of-range inputs modulo the prime,
//! which would let two different application values alias to the same
//! circuit signal. Rejecting non-canonical strings **at construction**
//! closes that class of defect: if a `FieldElement` exists, it is already
//! the value the circuit will see.
//!
//! ## Representation
//!
//! The canonical decimal string is the stored form; arithmetic goes through
//! `num_bigint::BigUint` on demand. Serde serializes the bare string.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::FieldError;

/// The BN254 scalar field prime, as a decimal string.
pub const FR_MODULUS_DEC: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

/// Maximum bytes of big-endian data that fit in one field element.
///
/// 31 bytes = 248 bits, always below the ~254-bit prime.
pub const FIELD_CAPACITY_BYTES: usize = 31;

/// The BN254 scalar field prime as a `BigUint`.
///
/// Parsed once on first use; the constant is a compile-time-checked decimal
/// literal so the parse cannot fail.
pub fn fr_modulus() -> &'static BigUint {
    static MODULUS: OnceLock<BigUint> = OnceLock::new();
    MODULUS.get_or_init(|| {
        BigUint::parse_bytes(FR_MODULUS_DEC.as_bytes(), 10)
            .unwrap_or_else(|| unreachable!("FR_MODULUS_DEC is a valid decimal literal"))
    })
}

/// A BN254 scalar field element in canonical decimal form.
///
/// # Construction
///
/// - [`FieldElement::parse()`] — from a decimal string, validating
///   canonicality and range.
/// - [`FieldElement::from_biguint()`] — from a `BigUint`, validating range.
/// - [`FieldElement::from_bytes_be()`] — from at most 31 big-endian bytes.
/// - [`FieldElement::zero()`] / [`From<u64>`] / [`From<u128>`] — infallible
///   small-value constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldElement(String);

impl FieldElement {
    /// Parse a canonical decimal string into a field element.
    ///
    /// # Errors
    ///
    /// - [`FieldError::NotDecimal`] — empty, signed, hex, or any non-digit.
    /// - [`FieldError::LeadingZero`] — `"007"` style strings (only `"0"`
    ///   itself may start with a zero).
    /// - [`FieldError::ExceedsModulus`] — numeric value `>=` the prime.
    pub fn parse(s: &str) -> Result<Self, FieldError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FieldError::NotDecimal(s.to_string()));
        }
        if s.len() > 1 && s.starts_with('0') {
            return Err(FieldError::LeadingZero(s.to_string()));
        }
        // Cheap length screen before the bigint comparison: the prime has
        // 77 decimal digits, so anything longer cannot fit.
        if s.len() > FR_MODULUS_DEC.len() {
            return Err(FieldError::ExceedsModulus(s.to_string()));
        }
        if s.len() == FR_MODULUS_DEC.len() {
            let value = BigUint::parse_bytes(s.as_bytes(), 10)
                .ok_or_else(|| FieldError::NotDecimal(s.to_string()))?;
            if &value >= fr_modulus() {
                return Err(FieldError::ExceedsModulus(s.to_string()));
            }
        }
        Ok(Self(s.to_string()))
    }

    /// Construct from a `BigUint`, rejecting values outside the field.
    pub fn from_biguint(value: BigUint) -> Result<Self, FieldError> {
        if &value >= fr_modulus() {
            return Err(FieldError::ExceedsModulus(value.to_string()));
        }
        Ok(Self(value.to_str_radix(10)))
    }

    /// Construct from at most [`FIELD_CAPACITY_BYTES`] big-endian bytes.
    ///
    /// An empty slice maps to zero. 31 bytes is 248 bits, so the result is
    /// always in range.
    pub fn from_bytes_be(bytes: &[u8]) -> Result<Self, FieldError> {
        if bytes.len() > FIELD_CAPACITY_BYTES {
            return Err(FieldError::BytesTooWide {
                got: bytes.len(),
                max: FIELD_CAPACITY_BYTES,
            });
        }
        Ok(Self(BigUint::from_bytes_be(bytes).to_str_radix(10)))
    }

    /// The additive identity.
    pub fn zero() -> Self {
        Self("0".to_string())
    }

    /// The multiplicative identity.
    pub fn one() -> Self {
        Self("1".to_string())
    }

    /// The canonical decimal string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric value as a `BigUint`.
    pub fn to_biguint(&self) -> BigUint {
        // Canonical by construction, so the parse cannot fail.
        BigUint::parse_bytes(self.0.as_bytes(), 10).unwrap_or_else(BigUint::zero)
    }

    /// True if this is the zero element.
    pub fn is_zero(&self) -> bool {
        self.0 == "0"
    }

    /// Check a bare string for canonicality without constructing.
    ///
    /// Returns the violated rule, phrased for inclusion in validation
    /// issue lists.
    pub fn check_canonical(s: &str) -> Result<(), FieldError> {
        Self::parse(s).map(|_| ())
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<u128> for FieldElement {
    fn from(value: u128) -> Self {
        Self(value.to_string())
    }
}

impl TryFrom<String> for FieldElement {
    type Error = FieldError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<FieldElement> for String {
    fn from(fe: FieldElement) -> String {
        fe.0
    }
}

impl std::fmt::Display for FieldElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
