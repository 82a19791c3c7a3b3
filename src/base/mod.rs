//! # Core building blocks of the **spear** crate.
//!
//! # Light Curves
//!
//! Individual light curve epochs are represented by the [`LcObs`] type.
//! One or more light curves are gathered into a [`LcSeries`], which is implemented as wrapper around `Vec<LcObs>`.
//! The first light curve within a series is the driving continuum.
//!
//! [`LcSeries`] has, among others, four important implementations:
//! - [`Add / +`](`std::ops::Add`) Allows the composition of two, or more, [`LcSeries`] objects.
//! - [`sort_by_time`](`LcSeries::sort_by_time`) Sorts the underlying vector of [`LcObs`] objects by their timestamps.
//! - [`split`](`LcSeries::split`) The reciprocal of one or multiple [`Add`][`std::ops::Add`] calls.
//! - [`stats`](`LcSeries::stats`) Computes the continuum cadence, time span and value range that set the scales of the model priors.
//!
//! # Models
//!
//! The [`BayesModel`] trait is shared by all models and provides the log-prior, log-likelihood and log-posterior of
//! a parameter vector, as well as parallel initialization and evaluation of a [`ParamEnsbl`].
//! The Gaussian process likelihood itself is supplied by a [`CovLikelihood`] engine.

mod ensbl;
mod lcurve;
mod model;
mod settings;

pub use ensbl::*;
pub use lcurve::*;
pub use model::*;
pub use settings::*;
