use crate::codec::{ELEMENT_SEPARATOR, join_display, split_parts};
use crate::errors::MpcError;
use crate::field::Fp;

use std::fmt;

use rand::Rng;

use serde::{Deserialize, Serialize};

/// Values a [`Vector`] can hold: closed under the field operations and
/// encodable as decimal text.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + fmt::Display {
    fn negate(&self) -> Self;
    fn add(&self, other: &Self) -> Self;
    fn sub(&self, other: &Self) -> Self;
    fn mul(&self, other: &Self) -> Self;
    /// Parses one decimal token produced by `Display`.
    fn parse_text(token: &[u8]) -> Result<Self, MpcError>;
}

impl<const P: u64> Element for Fp<P> {
    fn negate(&self) -> Self {
        Fp::negate(self)
    }

    fn add(&self, other: &Self) -> Self {
        Fp::add(self, other)
    }

    fn sub(&self, other: &Self) -> Self {
        Fp::sub(self, other)
    }

    fn mul(&self, other: &Self) -> Self {
        Fp::mul(self, other)
    }

    fn parse_text(token: &[u8]) -> Result<Self, MpcError> {
        Fp::from_decimal(token)
    }
}

/// An ordered sequence of one element type with index-aligned arithmetic.
///
/// Pairwise operations require equal lengths and fail with
/// `MpcError::DimensionMismatch` otherwise; nothing is silently truncated.
///
/// The derived `==` is structural: vectors of different lengths are simply
/// unequal. Protocol code compares with [`Vector::equals`], which reports a
/// length mismatch as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vector<T> {
    values: Vec<T>,
}

impl<T: Element> Vector<T> {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn from_values(values: Vec<T>) -> Self {
        Self { values }
    }

    /// A vector of `len` zero elements.
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![T::default(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns `MpcError::IndexOutOfBounds` if `index >= len`.
    pub fn get(&self, index: usize) -> Result<T, MpcError> {
        self.values
            .get(index)
            .copied()
            .ok_or(MpcError::IndexOutOfBounds {
                index,
                len: self.values.len(),
            })
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<(), MpcError> {
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or(MpcError::IndexOutOfBounds { index, len })?;
        *slot = value;
        Ok(())
    }

    pub fn append(&mut self, value: T) {
        self.values.push(value);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    fn check_len(&self, other: &Self, op: &str) -> Result<(), MpcError> {
        if self.len() != other.len() {
            return Err(MpcError::DimensionMismatch(format!(
                "Vector lengths must match for {} ({} vs {})",
                op,
                self.len(),
                other.len()
            )));
        }
        Ok(())
    }

    fn zip_with(&self, other: &Self, op: &str, f: impl Fn(&T, &T) -> T) -> Result<Self, MpcError> {
        self.check_len(other, op)?;
        Ok(Self {
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| f(a, b))
                .collect(),
        })
    }

    pub fn negate(&self) -> Self {
        Self {
            values: self.values.iter().map(T::negate).collect(),
        }
    }

    pub fn add(&self, other: &Self) -> Result<Self, MpcError> {
        self.zip_with(other, "addition", T::add)
    }

    pub fn sub(&self, other: &Self) -> Result<Self, MpcError> {
        self.zip_with(other, "subtraction", T::sub)
    }

    /// Elementwise (Hadamard) product.
    pub fn mul(&self, other: &Self) -> Result<Self, MpcError> {
        self.zip_with(other, "multiplication", T::mul)
    }

    pub fn add_assign(&mut self, other: &Self) -> Result<&mut Self, MpcError> {
        *self = Vector::add(self, other)?;
        Ok(self)
    }

    pub fn sub_assign(&mut self, other: &Self) -> Result<&mut Self, MpcError> {
        *self = Vector::sub(self, other)?;
        Ok(self)
    }

    pub fn mul_assign(&mut self, other: &Self) -> Result<&mut Self, MpcError> {
        *self = Vector::mul(self, other)?;
        Ok(self)
    }

    /// Elementwise comparison of equal-length vectors.
    ///
    /// # Errors
    ///
    /// Returns `MpcError::DimensionMismatch` rather than comparing a prefix.
    pub fn equals(&self, other: &Self) -> Result<bool, MpcError> {
        self.check_len(other, "comparison")?;
        Ok(self.values == other.values)
    }

    /// Inner product `sum(a_i * b_i)`.
    pub fn dot(&self, other: &Self) -> Result<T, MpcError> {
        let products = Vector::mul(self, other)?;
        Ok(products
            .values
            .iter()
            .fold(T::default(), |acc, x| acc.add(x)))
    }

    /// Multiplies every element by `scalar`.
    pub fn scale(&self, scalar: &T) -> Self {
        Self {
            values: self.values.iter().map(|x| x.mul(scalar)).collect(),
        }
    }

    /// Decimal text of each element joined by `.`.
    ///
    /// # Example
    ///
    /// ```
    /// # use mpc_substrate::field::{Fp, Vector};
    /// let v = Vector::from_values(vec![Fp::<97>::new(12), Fp::new(0), Fp::new(7)]);
    /// assert_eq!(v.to_bytes(), b"12.0.7".to_vec());
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        join_display(&self.values, ELEMENT_SEPARATOR)
    }

    /// Inverse of [`Vector::to_bytes`]. An empty buffer decodes to an empty vector.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MpcError> {
        let values = split_parts(bytes, ELEMENT_SEPARATOR)
            .into_iter()
            .map(T::parse_text)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { values })
    }
}

impl<const P: u64> Vector<Fp<P>> {
    /// `len` elements drawn independently and uniformly from the field.
    pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        Self {
            values: (0..len).map(|_| Fp::random(rng)).collect(),
        }
    }
}

impl<T> From<Vec<T>> for Vector<T> {
    fn from(values: Vec<T>) -> Self {
        Self { values }
    }
}

impl<T> FromIterator<T> for Vector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quickcheck_macros::quickcheck;

    type F97 = Fp<97>;

    fn vec97(values: &[u64]) -> Vector<F97> {
        values.iter().map(|&v| F97::new(v)).collect()
    }

    #[test]
    fn test_elementwise_ops() -> Result<(), MpcError> {
        let a = vec97(&[1, 50, 96]);
        let b = vec97(&[2, 50, 3]);
        assert_eq!(a.add(&b)?, vec97(&[3, 3, 2]));
        assert_eq!(a.sub(&b)?, vec97(&[96, 0, 93]));
        assert_eq!(a.mul(&b)?, vec97(&[2, 75, 94]));
        assert_eq!(a.negate(), vec97(&[96, 47, 1]));
        Ok(())
    }

    #[test]
    fn test_compound_ops_mutate_receiver() -> Result<(), MpcError> {
        let mut a = vec97(&[1, 2]);
        a.add_assign(&vec97(&[1, 1]))?.mul_assign(&vec97(&[10, 10]))?;
        assert_eq!(a, vec97(&[20, 30]));
        a.sub_assign(&vec97(&[20, 31]))?;
        assert_eq!(a, vec97(&[0, 96]));
        Ok(())
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let short = vec97(&[1, 2]);
        let long = vec97(&[1, 2, 3]);
        assert!(matches!(
            short.equals(&long),
            Err(MpcError::DimensionMismatch(_))
        ));
        assert!(short.add(&long).is_err());
        assert!(short.sub(&long).is_err());
        assert!(short.mul(&long).is_err());
        assert!(short.dot(&long).is_err());
    }

    #[test]
    fn test_structural_eq_is_not_checked_equals() {
        let short = vec97(&[1, 2]);
        let long = vec97(&[1, 2, 3]);
        assert_ne!(short, long);
        assert!(short.equals(&long).is_err());
    }

    #[test]
    fn test_equals() -> Result<(), MpcError> {
        assert!(vec97(&[1, 2]).equals(&vec97(&[1, 2]))?);
        assert!(!vec97(&[1, 2]).equals(&vec97(&[1, 3]))?);
        Ok(())
    }

    #[test]
    fn test_indexing_is_bounds_checked() -> Result<(), MpcError> {
        let mut v = vec97(&[4, 5]);
        assert_eq!(v.get(1)?, F97::new(5));
        v.set(0, F97::new(9))?;
        assert_eq!(v.get(0)?, F97::new(9));
        assert!(matches!(
            v.get(2),
            Err(MpcError::IndexOutOfBounds { index: 2, len: 2 })
        ));
        assert!(v.set(5, F97::new(1)).is_err());
        Ok(())
    }

    #[test]
    fn test_append_grows_empty_vector() {
        let mut v: Vector<F97> = Vector::new();
        assert!(v.is_empty());
        v.append(F97::new(3));
        v.append(F97::new(4));
        assert_eq!(v, vec97(&[3, 4]));
    }

    #[test]
    fn test_dot_and_scale() -> Result<(), MpcError> {
        let a = vec97(&[1, 2, 3]);
        let b = vec97(&[4, 5, 6]);
        assert_eq!(a.dot(&b)?, F97::new(32));
        assert_eq!(a.scale(&F97::new(40)), vec97(&[40, 80, 23]));
        Ok(())
    }

    #[test]
    fn test_text_encoding() -> Result<(), MpcError> {
        assert_eq!(vec97(&[1, 0, 96]).to_bytes(), b"1.0.96".to_vec());
        assert!(Vector::<F97>::new().to_bytes().is_empty());
        assert_eq!(Vector::<F97>::from_bytes(b"")?, Vector::new());
        assert_eq!(Vector::<F97>::from_bytes(b"0")?, vec97(&[0]));
        assert!(Vector::<F97>::from_bytes(b"1..2").is_err());
        assert!(Vector::<F97>::from_bytes(b"1;2").is_err());
        Ok(())
    }

    #[quickcheck]
    fn prop_text_encoding_recovers_values(values: Vec<u64>) -> bool {
        let v: Vector<crate::field::FieldElement> = values.iter().map(|&x| Fp::new(x)).collect();
        let decoded: Vec<u64> = std::str::from_utf8(&v.to_bytes())
            .map(|text| {
                text.split('.')
                    .filter(|t| !t.is_empty())
                    .filter_map(|t| t.parse().ok())
                    .collect()
            })
            .unwrap_or_default();
        let expected: Vec<u64> = v.iter().map(|x| x.value()).collect();
        decoded == expected && Vector::from_bytes(&v.to_bytes()).ok() == Some(v)
    }
}
