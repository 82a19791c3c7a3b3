//! Gaussian process models for light curves.
//!
//! A [`Cov3ParModel`] is assembled from a [`LcSeries`](`crate::base::LcSeries`), a set of
//! [`ModelSettings`](`crate::base::ModelSettings`) and a likelihood engine. The settings select the
//! [`CovFunc`] and one prior recipe per hyperparameter ([`SigmaPrior`], [`TauPrior`] and
//! [`NuPrior`]), each of which can be given as a string:
//!
//! ```
//! # use spear::models::{NuPrior, SigmaPrior, TauPrior};
//! assert!("None".parse::<SigmaPrior<f64>>().unwrap() == SigmaPrior::Uninformative);
//! assert!("IG".parse::<TauPrior<f64>>().unwrap() == TauPrior::InverseGamma);
//! assert!("0.5".parse::<NuPrior<f64>>().unwrap() == NuPrior::Fixed(0.5));
//! ```

mod cov3par;
mod covfunc;
mod priors;

pub use cov3par::*;
pub use covfunc::*;
pub use priors::*;
