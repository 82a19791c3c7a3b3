use crate::{
    fXX,
    models::{CovFunc, NuPrior, SigmaPrior, TauPrior},
};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::{io::Write, path::Path};
use thiserror::Error;

/// Errors associated with model settings, prior choices and file input/output.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error")]
    Io(#[from] std::io::Error),
    #[error("json5 error")]
    Json5(#[from] serde_json5::Error),
    #[error("no such covariance function {0}")]
    UnknownCovFunc(String),
    #[error("no such prior for {param} {value}")]
    UnknownPrior { param: &'static str, value: String },
}

/// Settings for building a [`Cov3ParModel`](`crate::models::Cov3ParModel`).
///
/// ```
/// # use spear::base::ModelSettingsBuilder;
/// # use spear::models::{CovFunc, SigmaPrior, TauPrior};
/// let settings = ModelSettingsBuilder::<f64>::default()
///     .covfunc(CovFunc::Matern)
///     .sigma_prior("Vague".parse::<SigmaPrior<f64>>().unwrap())
///     .tau_prior(TauPrior::Fixed(120.0))
///     .build()
///     .unwrap();
/// ```
#[derive(Builder, Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
#[serde(bound(serialize = "T: fXX + Serialize"))]
#[serde(bound(deserialize = "T: fXX + Deserialize<'de>"))]
pub struct ModelSettings<T>
where
    T: fXX,
{
    /// Name of the covariance function.
    #[builder(default)]
    pub covfunc: CovFunc,

    /// Prior for the amplitude.
    #[builder(default)]
    pub sigma_prior: SigmaPrior<T>,

    /// Prior for the timescale.
    #[builder(default)]
    pub tau_prior: TauPrior<T>,

    /// Prior for the shape parameter.
    #[builder(default)]
    pub nu_prior: NuPrior<T>,

    /// Initial values `[sigma, tau, nu]`, defaults to values derived from the light curve.
    #[builder(default = None)]
    pub par_init: Option<[T; 3]>,

    /// Overrides the valid range of the shape parameter of the covariance function.
    #[builder(default = None)]
    pub nu_range: Option<(T, T)>,

    /// Log notices about fixed parameters at the `info` level.
    #[builder(default = false)]
    pub verbose: bool,
}

impl<T> ModelSettings<T>
where
    T: fXX,
{
    /// Load settings from a JSON5 file.
    ///
    /// Missing fields take their default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let content = std::fs::read_to_string(path)?;

        Ok(serde_json5::from_str(&content)?)
    }

    /// Settings of the legacy power exponential model, with a shape parameter in `[0, 2]`.
    pub fn powexp(sigma_prior: SigmaPrior<T>, tau_prior: TauPrior<T>, nu_prior: NuPrior<T>) -> Self {
        Self {
            covfunc: CovFunc::PowExp,
            sigma_prior,
            tau_prior,
            nu_prior,
            par_init: None,
            nu_range: Some((T::zero(), T::one() + T::one())),
            verbose: false,
        }
    }

    /// Serialize settings to a JSON5 file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError>
    where
        T: Serialize,
    {
        let mut file = std::fs::File::create(path)?;

        file.write_all(serde_json5::to_string(&self)?.as_bytes())?;

        Ok(())
    }
}
