//! Implementation of prime-field elements using modular arithmetic.

use crate::codec::parse_decimal;
use crate::errors::MpcError;

use std::fmt;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};

use rand::Rng;

use serde::{Deserialize, Serialize};

/// An integer held canonically in `[0, P)` for a fixed public prime `P`.
///
/// Every constructor reduces its input, so no value outside the canonical
/// range is ever stored.
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct Fp<const P: u64> {
    value: u64,
}

impl<const P: u64> Fp<P> {
    /// The public modulus.
    pub const MODULUS: u64 = P;

    /// Creates an element from `value`, reducing it mod `P`.
    ///
    /// # Example
    ///
    /// ```
    /// # use mpc_substrate::field::Fp;
    /// assert_eq!(Fp::<97>::new(102).value(), 5);
    /// assert_eq!(Fp::<97>::new(0).value(), 0);
    /// ```
    pub fn new(value: u64) -> Self {
        const { assert!(P > 1, "field modulus must be greater than 1") };
        Self { value: value % P }
    }

    /// Creates an element from a signed integer using floor modulo, so
    /// negative inputs land on their additive inverse.
    ///
    /// # Example
    ///
    /// ```
    /// # use mpc_substrate::field::Fp;
    /// assert_eq!(Fp::<97>::from_i64(-1).value(), 96);
    /// assert_eq!(Fp::<97>::from_i64(-195).value(), 96);
    /// ```
    pub fn from_i64(value: i64) -> Self {
        let reduced = (value as i128).mod_floor(&(P as i128));
        Self::new(reduced as u64)
    }

    /// Reduces an arbitrary-precision integer into the field.
    pub fn from_biguint(value: &BigUint) -> Self {
        let reduced = value % BigUint::from(P);
        // The remainder is below P, which always fits in u64.
        Self::new(reduced.to_u64().unwrap_or_default())
    }

    /// Parses decimal text of any length and reduces it into the field.
    pub fn from_decimal(text: &[u8]) -> Result<Self, MpcError> {
        Ok(Self::from_biguint(&parse_decimal(text)?))
    }

    /// Draws an element uniformly from `[0, P)`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(rng.random_range(0..P))
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Computes `(P - v) mod P`.
    pub fn negate(&self) -> Self {
        Self::new(P - self.value)
    }

    pub fn add(&self, other: &Self) -> Self {
        let sum = self.value as u128 + other.value as u128;
        Self::new((sum % P as u128) as u64)
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.negate())
    }

    /// Computes `(a * b) mod P`, using `u128` to avoid overflow before reduction.
    pub fn mul(&self, other: &Self) -> Self {
        let product = self.value as u128 * other.value as u128;
        Self::new((product % P as u128) as u64)
    }

    /// In-place `self += other`. Returns the receiver for chaining.
    pub fn add_assign(&mut self, other: &Self) -> &mut Self {
        *self = Fp::add(self, other);
        self
    }

    pub fn sub_assign(&mut self, other: &Self) -> &mut Self {
        *self = Fp::sub(self, other);
        self
    }

    pub fn mul_assign(&mut self, other: &Self) -> &mut Self {
        *self = Fp::mul(self, other);
        self
    }

    /// Exact comparison of canonical values.
    pub fn equals(&self, other: &Self) -> bool {
        self.value == other.value
    }

    /// Square-and-multiply exponentiation.
    pub fn pow(&self, mut exp: u64) -> Self {
        let mut base = *self;
        let mut acc = Self::new(1);
        while exp > 0 {
            if exp & 1 == 1 {
                acc = Fp::mul(&acc, &base);
            }
            base = Fp::mul(&base, &base);
            exp >>= 1;
        }
        acc
    }

    /// Multiplicative inverse via Fermat's little theorem (`P` is prime).
    ///
    /// # Errors
    ///
    /// Returns `MpcError::NoInverse` for zero.
    pub fn inv(&self) -> Result<Self, MpcError> {
        if self.value == 0 {
            return Err(MpcError::NoInverse(format!("Cannot invert 0 in mod {}", P)));
        }
        Ok(self.pow(P - 2))
    }

    /// Big-endian encoding of minimal length. Zero encodes as an empty buffer.
    ///
    /// # Example
    ///
    /// ```
    /// # use mpc_substrate::field::Fp;
    /// assert_eq!(Fp::<97>::new(42).to_bytes(), vec![42]);
    /// assert!(Fp::<97>::new(0).to_bytes().is_empty());
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let width = (u64::BITS - self.value.leading_zeros()).div_ceil(8) as usize;
        self.value.to_be_bytes()[8 - width..].to_vec()
    }

    /// Decodes a big-endian buffer of any length (empty is zero) and reduces it.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_biguint(&BigUint::from_bytes_be(bytes))
    }
}

impl<const P: u64> From<u64> for Fp<P> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<const P: u64> From<Fp<P>> for u64 {
    fn from(element: Fp<P>) -> Self {
        element.value
    }
}

impl<const P: u64> fmt::Display for Fp<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<const P: u64> std::ops::Neg for Fp<P> {
    type Output = Self;

    fn neg(self) -> Self {
        self.negate()
    }
}

impl<const P: u64> std::ops::Add for Fp<P> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Fp::add(&self, &other)
    }
}

impl<const P: u64> std::ops::Sub for Fp<P> {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Fp::sub(&self, &other)
    }
}

impl<const P: u64> std::ops::Mul for Fp<P> {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Fp::mul(&self, &other)
    }
}

impl<const P: u64> std::ops::AddAssign for Fp<P> {
    fn add_assign(&mut self, other: Self) {
        Fp::add_assign(self, &other);
    }
}

impl<const P: u64> std::ops::SubAssign for Fp<P> {
    fn sub_assign(&mut self, other: Self) {
        Fp::sub_assign(self, &other);
    }
}

impl<const P: u64> std::ops::MulAssign for Fp<P> {
    fn mul_assign(&mut self, other: Self) {
        Fp::mul_assign(self, &other);
    }
}

impl<const P: u64> Zero for Fp<P> {
    fn zero() -> Self {
        Self::new(0)
    }

    fn is_zero(&self) -> bool {
        self.value == 0
    }
}

impl<const P: u64> One for Fp<P> {
    fn one() -> Self {
        Self::new(1)
    }
}
