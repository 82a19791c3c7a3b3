//! Mathematical functions and float helper macros.
//!
//! The float type `T` used throughout the crate implements both [`num_traits::Float`] and
//! [`nalgebra::RealField`], which share many method names. The macros in this module resolve
//! these calls explicitly through [`num_traits::Float`].

mod gamma;

pub use gamma::ln_gamma;

/// A shorthand for converting constants to type `T`.
macro_rules! T {
    ($value: expr) => {
        T::from_f64($value).unwrap()
    };
}

macro_rules! abs {
    ($value: expr) => {
        num_traits::Float::abs($value)
    };
}

macro_rules! exp {
    ($value: expr) => {
        num_traits::Float::exp($value)
    };
}

macro_rules! is_finite {
    ($value: expr) => {
        num_traits::Float::is_finite($value)
    };
}

macro_rules! ln {
    ($value: expr) => {
        num_traits::Float::ln($value)
    };
}

macro_rules! nan {
    () => {
        <T as num_traits::Float>::nan()
    };
}

macro_rules! neg_inf {
    () => {
        <T as num_traits::Float>::neg_infinity()
    };
}

macro_rules! powi {
    ($value: expr, $integer: expr) => {
        num_traits::Float::powi($value, $integer)
    };
}

macro_rules! sqrt {
    ($value: expr) => {
        num_traits::Float::sqrt($value)
    };
}

pub(crate) use T;
pub(crate) use abs;
pub(crate) use exp;
pub(crate) use is_finite;
pub(crate) use ln;
pub(crate) use nan;
pub(crate) use neg_inf;
pub(crate) use powi;
pub(crate) use sqrt;
