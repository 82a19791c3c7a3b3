use crate::base::SettingsError;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// The covariance functions with three hyperparameters (amplitude, timescale and shape).
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CovFunc {
    /// Power exponential.
    #[default]
    PowExp,
    /// Matérn.
    Matern,
    /// Pareto exponential.
    ParetoExp,
    /// Kepler exponential.
    KeplerExp,
}

impl CovFunc {
    /// All available covariance functions.
    pub const ALL: [CovFunc; 4] = [
        CovFunc::PowExp,
        CovFunc::Matern,
        CovFunc::ParetoExp,
        CovFunc::KeplerExp,
    ];

    /// Returns the name of the covariance function.
    pub fn name(&self) -> &'static str {
        match self {
            CovFunc::PowExp => "pow_exp",
            CovFunc::Matern => "matern",
            CovFunc::ParetoExp => "pareto_exp",
            CovFunc::KeplerExp => "kepler_exp",
        }
    }

    /// Returns the default initial value of the shape parameter.
    pub fn nu_init(&self) -> f64 {
        match self {
            CovFunc::PowExp => 1.0,
            CovFunc::Matern => 0.5,
            CovFunc::ParetoExp => 1.5,
            CovFunc::KeplerExp => 0.1,
        }
    }

    /// Returns the valid range of the shape parameter.
    pub fn nu_range(&self) -> (f64, f64) {
        match self {
            CovFunc::PowExp => (0.0, 1.999),
            CovFunc::Matern => (0.001, 2.0),
            CovFunc::ParetoExp => (0.001, 2.0),
            CovFunc::KeplerExp => (0.001, 0.8),
        }
    }
}

impl Display for CovFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CovFunc {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CovFunc::ALL
            .into_iter()
            .find(|covfunc| covfunc.name() == s)
            .ok_or_else(|| SettingsError::UnknownCovFunc(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covfunc() {
        for covfunc in CovFunc::ALL {
            let (nu_min, nu_max) = covfunc.nu_range();

            assert!(covfunc.name().parse::<CovFunc>().unwrap() == covfunc);
            assert!((nu_min..=nu_max).contains(&covfunc.nu_init()));
            assert!(serde_json5::to_string(&covfunc).unwrap() == format!("\"{}\"", covfunc));
        }

        assert!(CovFunc::default() == CovFunc::PowExp);
        assert!(matches!(
            "drw".parse::<CovFunc>(),
            Err(SettingsError::UnknownCovFunc(name)) if name == "drw"
        ));
    }
}
