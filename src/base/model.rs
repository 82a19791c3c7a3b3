use crate::{
    base::{LcSeries, ParamEnsbl},
    fXX,
    math::{is_finite, neg_inf},
    models::CovFunc,
    stats::{Density, DensityError, MultivariateDensity},
};
use log::debug;
use nalgebra::{SVector, SVectorView, SVectorViewMut};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

/// Error types associated with the [`BayesModel`] trait and the model builders.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ModelError<T> {
    #[error("density error")]
    Density(#[from] DensityError<T>),
    #[error("light curve series contains no epochs")]
    EmptySeries,
    #[error(
        "continuum light curve needs at least two distinct epochs to define a cadence (found {len})"
    )]
    InsufficientContinuum { len: usize },
    #[error("likelihood evaluation failed: {0}")]
    Likelihood(String),
    #[error("log-likelihood evaluated to NaN")]
    OutputNaN,
}

/// The covariance function hyperparameters that are passed to a [`CovLikelihood`].
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct CovParams<T> {
    /// Amplitude.
    pub sigma: T,

    /// Timescale.
    pub tau: T,

    /// Shape.
    pub nu: T,
}

/// The result of a single likelihood evaluation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LikelihoodOutput<T> {
    /// The log-likelihood of the light curve given the hyperparameters.
    pub log_likelihood: T,

    /// Any auxiliary terms reported by the likelihood engine (passed through untouched).
    pub components: Vec<T>,
}

impl<T> LikelihoodOutput<T> {
    /// Create a [`LikelihoodOutput`] without auxiliary terms.
    pub fn new(log_likelihood: T) -> Self {
        Self {
            log_likelihood,
            components: Vec::new(),
        }
    }
}

/// A Gaussian process likelihood engine.
///
/// The engine builds the covariance matrix of the light curve for the given covariance function
/// and hyperparameters and evaluates the log-likelihood. Models call it exactly once per
/// evaluation.
pub trait CovLikelihood<T>: Sync {
    /// Evaluate the log-likelihood.
    fn loglike(
        &self,
        series: &LcSeries<T>,
        covfunc: CovFunc,
        params: &CovParams<T>,
    ) -> Result<LikelihoodOutput<T>, ModelError<T>>;
}

impl<T, F> CovLikelihood<T> for F
where
    F: Fn(&LcSeries<T>, CovFunc, &CovParams<T>) -> Result<LikelihoodOutput<T>, ModelError<T>>
        + Sync,
{
    fn loglike(
        &self,
        series: &LcSeries<T>,
        covfunc: CovFunc,
        params: &CovParams<T>,
    ) -> Result<LikelihoodOutput<T>, ModelError<T>> {
        self(series, covfunc, params)
    }
}

/// A trait that is shared by all Bayesian models within the **spear** crate.
///
/// This is the face a sampler sees: a prior, a starting point, and the log-posterior.
pub trait BayesModel<T, const D: usize>: Sync
where
    T: fXX,
{
    /// The base rayon chunk size that is used for any parallel iterators.
    const RCS: usize;

    /// Returns the starting point of the model parameters.
    fn initial_values(&self) -> SVector<T, D>;

    /// Initialize the model parameters by drawing from the model prior.
    ///
    /// Dimensions with an improper prior are set to their initial value.
    fn initialize_params(
        &self,
        params: &mut SVectorViewMut<T, D>,
        rng: &mut impl Rng,
    ) -> Result<(), ModelError<T>> {
        let init = self.initial_values();

        self.model_prior()
            .iter()
            .enumerate()
            .try_for_each(|(idx, uvpdf)| {
                params[idx] = match uvpdf.draw_sample(rng) {
                    Ok(sample) => sample[0],
                    Err(DensityError::Improper { .. }) => init[idx],
                    Err(err) => return Err(err),
                };

                Ok(())
            })?;

        Ok(())
    }

    /// Initialize the model parameters for an ensemble.
    fn initialize_ensbl(
        &self,
        ensbl: &mut ParamEnsbl<T, D>,
        rseed: u64,
    ) -> Result<(), ModelError<T>> {
        let start = Instant::now();

        ensbl
            .params
            .par_column_iter_mut()
            .chunks(Self::RCS)
            .enumerate()
            .try_for_each(|(cdx, mut chunks)| {
                let mut rng =
                    Xoshiro256PlusPlus::seed_from_u64(rseed.wrapping_add((cdx * 17) as u64));

                chunks.iter_mut().try_for_each(|params| {
                    self.initialize_params(params, &mut rng)?;

                    Ok::<(), ModelError<T>>(())
                })?;

                Ok::<(), ModelError<T>>(())
            })?;

        ensbl.logp.iter_mut().for_each(|logp| *logp = neg_inf!());

        debug!(
            "initialize_ensbl: {} members in {:.2} sec",
            ensbl.len(),
            start.elapsed().as_millis() as f64 / 1e3
        );

        Ok(())
    }

    /// Evaluate the log-likelihood.
    fn log_likelihood(&self, params: &SVectorView<T, D>) -> Result<T, ModelError<T>>;

    /// Evaluate the log-posterior (up to a constant).
    ///
    /// The likelihood is not evaluated for parameters outside of the prior support.
    fn log_posterior(&self, params: &SVectorView<T, D>) -> Result<T, ModelError<T>> {
        let log_prior = self.log_prior(params);

        if !is_finite!(log_prior) {
            return Ok(neg_inf!());
        }

        Ok(log_prior + self.log_likelihood(params)?)
    }

    /// Evaluate the log-posterior for each ensemble member.
    fn log_posterior_ensbl(&self, ensbl: &mut ParamEnsbl<T, D>) -> Result<(), ModelError<T>> {
        let start = Instant::now();

        ensbl
            .params
            .par_column_iter()
            .zip(ensbl.logp.par_iter_mut())
            .chunks(Self::RCS)
            .try_for_each(|mut chunks| {
                chunks.iter_mut().try_for_each(|(params, logp)| {
                    **logp = self.log_posterior(params)?;

                    Ok::<(), ModelError<T>>(())
                })?;

                Ok::<(), ModelError<T>>(())
            })?;

        debug!(
            "log_posterior_ensbl: {} evaluations in {:.2} sec",
            ensbl.len(),
            start.elapsed().as_millis() as f64 / 1e3
        );

        Ok(())
    }

    /// Evaluate the log-prior.
    fn log_prior(&self, params: &SVectorView<T, D>) -> T {
        self.model_prior().log_density(params)
    }

    /// Returns a reference to the underlying model prior.
    fn model_prior(&self) -> &MultivariateDensity<T, D>;
}
