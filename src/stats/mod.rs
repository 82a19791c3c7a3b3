//! # Prior densities for the **spear** models.
//!
//! This module introduces the [`Density`] trait, which is the trait that is shared by all joint or univariate probability density functions.
//! Densities are evaluated in log-space, positions outside of the support of a density evaluate to `-∞`.
//!
//! All univariate density functions are summarized within the [`UnivariateDensity`] ADT, and these types should not be used by their own:
//! - [`ConstantDensity`] A fixed value.
//! - [`DoubleLobedDensity`] A density that falls off logarithmically on both sides of a pivot value.
//! - [`FlatDensity`] An improper flat density over the real line.
//! - [`GammaDensity`] A gamma density in the shape/rate parameterization.
//! - [`InverseGammaDensity`] An inverse gamma density in the shape/scale parameterization.
//! - [`JeffreysDensity`] An improper scale-invariant density `p(x) ∝ 1/x`.
//! - [`UniformDensity`] A uniform density over a closed interval.
//!
//! A [`MultivariateDensity`] joins `D` independent univariate densities, e.g.:
//! ```
//! # use spear::stats::{ConstantDensity, DoubleLobedDensity, MultivariateDensity, UniformDensity};
//! let prior = MultivariateDensity::<f64, 3>::new([
//!     ConstantDensity::new(1.0),
//!     DoubleLobedDensity::new(2.0, 1e4).unwrap(),
//!     UniformDensity::new((0.0, 1.999)).unwrap(),
//! ]);
//! ```

mod univariate;

pub use univariate::*;

use crate::fXX;
use itertools::zip_eq;
use nalgebra::{SVector, SVectorView};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors associated with the [`stats`](crate::stats) module.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum DensityError<T> {
    #[error("cannot draw samples from the improper density {name}")]
    Improper { name: &'static str },
    #[error("invalid parameter {name}::{param} = {value}")]
    InvalidParameter {
        name: &'static str,
        param: &'static str,
        value: T,
    },
    #[error("invalid range {name} [{minv} - {maxv}]")]
    InvalidRange {
        name: &'static str,
        maxv: T,
        minv: T,
    },
    #[error("failed to draw a valid sample from {name} after {attempts} attempts")]
    Sampling {
        name: &'static str,
        attempts: usize,
    },
}

/// A trait that is shared by all probability density functions.
pub trait Density<T, const D: usize>: Sync
where
    T: fXX,
{
    /// Draw a random sample (vector) from the underlying density.
    fn draw_sample(&self, rng: &mut impl Rng) -> Result<SVector<T, D>, DensityError<T>>;

    /// Returns the constant values for each dimension,
    /// returns NaN for each dimensions that is not fixed.
    fn get_constants(&self) -> SVector<T, D>;

    /// Returns the minimum and maximum valid values for each dimension.
    fn get_range(&self) -> SVector<DensityRange<T>, D>;

    /// Calculates the logarithm of the density at a specific position `x`.
    ///
    /// If the position `x` is outside the support, this function returns `-∞`.
    fn log_density(&self, x: &SVectorView<T, D>) -> T;

    /// Validate a random sample vector by checking the sample w.r.t. to the valid range.
    fn validate_sample(&self, sample: &SVectorView<T, D>) -> bool {
        zip_eq(
            zip_eq(sample.iter(), self.get_range().iter()),
            self.get_constants().iter(),
        )
        .fold(true, |acc, ((value, range), constant)| {
            if num_traits::Float::is_finite(*constant) {
                acc & (value == constant)
            } else {
                acc & ((&range.min() <= value) & (value <= &range.max()))
            }
        })
    }
}

/// Defines the valid parameter range for a probability density function.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DensityRange<T>((T, T));

impl<T> DensityRange<T>
where
    T: Copy + PartialOrd,
{
    /// The maximum value of the range.
    pub fn max(&self) -> T {
        self.0.1
    }

    /// The minimum value of the range.
    pub fn min(&self) -> T {
        self.0.0
    }

    /// Create a new [`DensityRange`].
    pub fn new(minamax: (T, T)) -> Self {
        assert!(
            minamax.0 <= minamax.1,
            "minimum value must be smaller or equal than the maximum value"
        );

        Self(minamax)
    }
}
