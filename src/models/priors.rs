use crate::{
    base::{LcStats, SettingsError},
    fXX,
    math::{T, abs, is_finite, powi, sqrt},
    stats::{
        ConstantDensity, DensityError, DoubleLobedDensity, FlatDensity, GammaDensity,
        InverseGammaDensity, JeffreysDensity, UniformDensity, UnivariateDensity,
    },
};
use log::info;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// Upper bound of the "CSK" timescale prior.
const TAU_MAX: f64 = 10_000.0;

/// A single hyperparameter slot of a model: the stochastic variable, its prior and starting value.
#[derive(Clone, Debug, PartialEq)]
pub struct HyperParam<T> {
    init: T,
    name: &'static str,
    prior: UnivariateDensity<T>,
}

impl<T> HyperParam<T> {
    /// Returns the initial value of the stochastic variable.
    pub fn init(&self) -> &T {
        &self.init
    }

    /// Returns the name of the stochastic variable.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the prior of the stochastic variable.
    pub fn prior(&self) -> &UnivariateDensity<T> {
        &self.prior
    }

    /// Consumes the slot and returns its parts.
    pub fn into_parts(self) -> (&'static str, UnivariateDensity<T>, T) {
        (self.name, self.prior, self.init)
    }
}

/// The deterministic map from the sampled amplitude variable to `sigma`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum SigmaTransform {
    /// `sigma` is sampled directly.
    #[default]
    Identity,
    /// `sigma = 1 / sqrt(invsigsq)`.
    InverseSqrt,
    /// `sigma = 1 / sqrt(|invsigsq|)`, capped at `1e6` for `|invsigsq| < 1e-6`.
    InverseSqrtAbs,
}

impl SigmaTransform {
    /// Apply the transformation to the sampled variable.
    pub fn apply<T>(&self, value: T) -> T
    where
        T: fXX,
    {
        match self {
            SigmaTransform::Identity => value,
            SigmaTransform::InverseSqrt => T::one() / sqrt!(value),
            SigmaTransform::InverseSqrtAbs => {
                if abs!(value) < T!(1e-6) {
                    T!(1e6)
                } else {
                    T::one() / sqrt!(abs!(value))
                }
            }
        }
    }

    /// Map a value of `sigma` to the sampled variable.
    pub fn invert<T>(&self, sigma: T) -> T
    where
        T: fXX,
    {
        match self {
            SigmaTransform::Identity => sigma,
            _ => T::one() / powi!(sigma, 2),
        }
    }
}

fn parse_fixed<T>(param: &'static str, s: &str) -> Result<T, SettingsError>
where
    T: fXX,
{
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .and_then(T::from_f64)
        .ok_or_else(|| SettingsError::UnknownPrior {
            param,
            value: s.to_string(),
        })
}

fn fixed_param<T>(
    name: &'static str,
    value: T,
    verbose: bool,
) -> Result<HyperParam<T>, DensityError<T>>
where
    T: fXX,
{
    if !is_finite!(value) {
        return Err(DensityError::InvalidParameter {
            name: "ConstantDensity",
            param: name,
            value,
        });
    }

    if verbose {
        info!("{} is fixed to be {:.3}", name, value);
    }

    Ok(HyperParam {
        init: value,
        name,
        prior: ConstantDensity::new(value),
    })
}

/// Implements the string conversions shared by all prior choices.
macro_rules! impl_prior_strings {
    ($choice: ident, $param: literal, [$($variant: ident => $name: literal),*]) => {
        impl<T> Display for $choice<T>
        where
            T: fXX,
        {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $($choice::$variant => write!(f, $name),)*
                    $choice::Fixed(value) => write!(f, "{}", value),
                }
            }
        }

        impl<T> FromStr for $choice<T>
        where
            T: fXX,
        {
            type Err = SettingsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($choice::$variant),)*
                    _ => Ok($choice::Fixed(parse_fixed($param, s)?)),
                }
            }
        }

        impl<T> TryFrom<String> for $choice<T>
        where
            T: fXX,
        {
            type Error = SettingsError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl<T> From<$choice<T>> for String
        where
            T: fXX,
        {
            fn from(value: $choice<T>) -> Self {
                value.to_string()
            }
        }
    };
}

/// Prior choices for the amplitude `sigma`.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
#[serde(bound = "T: fXX")]
pub enum SigmaPrior<T> {
    /// Scale-invariant prior `p(sigma) ∝ 1 / sigma` ("CSK").
    #[default]
    Csk,
    /// Vague gamma prior on `1 / sigma²` ("Vague").
    Vague,
    /// Gamma prior on `1 / sigma²` scaled to the light curve variability ("Gamma").
    Gamma,
    /// Flat prior on `1 / sigma²` ("None").
    Uninformative,
    /// A fixed value.
    Fixed(T),
}

impl_prior_strings!(SigmaPrior, "sigma", [Csk => "CSK", Vague => "Vague", Gamma => "Gamma", Uninformative => "None"]);

impl<T> SigmaPrior<T>
where
    T: fXX,
{
    /// Build the amplitude slot and the transform that maps it to `sigma`.
    pub fn hyper_param(
        &self,
        stats: &LcStats<T>,
        sigma_init: T,
        verbose: bool,
    ) -> Result<(HyperParam<T>, SigmaTransform), DensityError<T>> {
        let invsigsq = |prior: UnivariateDensity<T>, transform: SigmaTransform| {
            (
                HyperParam {
                    init: transform.invert(sigma_init),
                    name: "invsigsq",
                    prior,
                },
                transform,
            )
        };

        Ok(match self {
            SigmaPrior::Csk => (
                HyperParam {
                    init: sigma_init,
                    name: "sigma",
                    prior: JeffreysDensity::new(),
                },
                SigmaTransform::Identity,
            ),
            SigmaPrior::Vague => invsigsq(
                GammaDensity::new(T!(0.001), T!(0.001))?,
                SigmaTransform::InverseSqrt,
            ),
            SigmaPrior::Gamma => invsigsq(
                GammaDensity::new(T!(2.0), T::one() / powi!(stats.value_range / T!(4.0), 2))?,
                SigmaTransform::InverseSqrt,
            ),
            SigmaPrior::Uninformative => {
                invsigsq(FlatDensity::new(), SigmaTransform::InverseSqrtAbs)
            }
            SigmaPrior::Fixed(value) => (
                fixed_param("sigma", *value, verbose)?,
                SigmaTransform::Identity,
            ),
        })
    }
}

/// Prior choices for the timescale `tau`.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
#[serde(bound = "T: fXX")]
pub enum TauPrior<T> {
    /// Logarithmic double-lobed prior around the continuum cadence ("CSK").
    #[default]
    Csk,
    /// Vague gamma prior ("Vague").
    Vague,
    /// Inverse gamma prior, penalizing very small and very large timescales ("IG").
    InverseGamma,
    /// Flat prior ("None").
    Uninformative,
    /// A fixed value.
    Fixed(T),
}

impl_prior_strings!(TauPrior, "tau", [Csk => "CSK", Vague => "Vague", InverseGamma => "IG", Uninformative => "None"]);

impl<T> TauPrior<T>
where
    T: fXX,
{
    /// Build the timescale slot.
    pub fn hyper_param(
        &self,
        stats: &LcStats<T>,
        tau_init: T,
        verbose: bool,
    ) -> Result<HyperParam<T>, DensityError<T>> {
        let prior = match self {
            TauPrior::Csk => DoubleLobedDensity::new(stats.cont_cadence, T!(TAU_MAX))?,
            TauPrior::Vague => GammaDensity::new(T!(0.001), T!(0.001))?,
            TauPrior::InverseGamma => {
                InverseGammaDensity::new(T!(2.0), sqrt!(stats.span * stats.cont_cadence))?
            }
            TauPrior::Uninformative => FlatDensity::new(),
            TauPrior::Fixed(value) => return fixed_param("tau", *value, verbose),
        };

        Ok(HyperParam {
            init: tau_init,
            name: "tau",
            prior,
        })
    }
}

/// Prior choices for the shape parameter `nu`.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
#[serde(bound = "T: fXX")]
pub enum NuPrior<T> {
    /// Uniform prior over the valid range of the covariance function ("Uniform").
    #[default]
    Uniform,
    /// A fixed value.
    Fixed(T),
}

impl_prior_strings!(NuPrior, "nu", [Uniform => "Uniform"]);

impl<T> NuPrior<T>
where
    T: fXX,
{
    /// Build the shape slot.
    pub fn hyper_param(
        &self,
        nu_range: (T, T),
        nu_init: T,
        verbose: bool,
    ) -> Result<HyperParam<T>, DensityError<T>> {
        match self {
            NuPrior::Uniform => Ok(HyperParam {
                init: nu_init,
                name: "nu",
                prior: UniformDensity::new(nu_range)?,
            }),
            NuPrior::Fixed(value) => fixed_param("nu", *value, verbose),
        }
    }
}
