#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod base;
mod math;
pub mod models;
pub mod stats;

use base::{ModelError, SettingsError};
use nalgebra::{RealField, Scalar};
use num_traits::{AsPrimitive, Float, FromPrimitive, float::TotalOrder};
use rand_distr::uniform::SampleUniform;
use stats::DensityError;
use std::{
    fmt::{Debug, Display},
    iter::Sum,
};
use thiserror::Error;

/// Generic container type for errors.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SpearError<T> {
    #[error("density error")]
    Density(#[from] DensityError<T>),
    #[error("model error")]
    Model(#[from] ModelError<T>),
    #[error("settings error")]
    Settings(#[from] SettingsError),
}

/// A trait that describes a generic floating point numbers within the **spear** crate. In practical
/// terms this trait is only used for the f32/f64 types.
#[allow(non_camel_case_types)]
pub trait fXX:
    'static
    + AsPrimitive<f64>
    + AsPrimitive<usize>
    + Copy
    + Debug
    + Default
    + Display
    + Float
    + FromPrimitive
    + RealField
    + SampleUniform
    + Scalar
    + Send
    + Sum
    + for<'x> Sum<&'x Self>
    + Sync
    + TotalOrder
{
}

impl fXX for f32 {}
impl fXX for f64 {}
