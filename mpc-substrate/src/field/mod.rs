//! # Field Module
//!
//! Provides [`Fp`] for prime-field arithmetic and the [`Vector`] and
//! [`Matrix`] containers built on it.

pub mod math;
pub mod matrix;
pub mod vector;

pub use math::Fp;
pub use matrix::Matrix;
pub use vector::{Element, Vector};

/// The public prime every party reduces by: the Mersenne prime 2^61 - 1.
pub const BASE_P: u64 = (1 << 61) - 1;

/// A field element of the deployment field.
pub type FieldElement = Fp<BASE_P>;
/// A vector over the deployment field.
pub type FieldVector = Vector<FieldElement>;
/// A matrix over the deployment field.
pub type FieldMatrix = Matrix<BASE_P>;
