use crate::{
    base::{
        BayesModel, CovLikelihood, CovParams, LcSeries, LcStats, LikelihoodOutput, ModelError,
        ModelSettings,
    },
    fXX,
    math::{T, sqrt},
    models::{CovFunc, SigmaTransform},
    stats::{MultivariateDensity, UnivariateDensity},
};
use log::debug;
use nalgebra::{SVector, SVectorView};

/// A Gaussian process model of one or more light curves with a three-parameter covariance
/// function (amplitude `sigma`, timescale `tau` and shape `nu`).
///
/// The model parameters are `x = [s, tau, nu]`, where `s` is either `sigma` itself or
/// `invsigsq = 1 / sigma²` depending on the chosen amplitude prior. The likelihood is delegated to
/// a [`CovLikelihood`] engine.
#[derive(Clone, Debug)]
pub struct Cov3ParModel<T, L>
where
    T: fXX,
{
    covfunc: CovFunc,
    init: SVector<T, 3>,
    likelihood: L,
    names: [&'static str; 3],
    prior: MultivariateDensity<T, 3>,
    series: LcSeries<T>,
    sigma_transform: SigmaTransform,
    stats: LcStats<T>,
}

impl<T, L> Cov3ParModel<T, L>
where
    T: fXX,
    L: CovLikelihood<T>,
{
    /// Returns the covariance function.
    pub fn covfunc(&self) -> CovFunc {
        self.covfunc
    }

    /// Maps a model parameter vector to the covariance function hyperparameters.
    pub fn covariance_params(&self, params: &SVectorView<T, 3>) -> CovParams<T> {
        CovParams {
            sigma: self.sigma_transform.apply(params[0]),
            tau: params[1],
            nu: params[2],
        }
    }

    /// Returns the names of the parameters that are not fixed.
    pub fn free_names(&self) -> Vec<&'static str> {
        self.names
            .iter()
            .zip(self.prior.iter())
            .filter_map(|(name, uvpdf)| match uvpdf {
                UnivariateDensity::Constant(_) => None,
                _ => Some(*name),
            })
            .collect()
    }

    /// Evaluate the likelihood engine, returning its full output.
    pub fn likelihood_output(
        &self,
        params: &SVectorView<T, 3>,
    ) -> Result<LikelihoodOutput<T>, ModelError<T>> {
        self.likelihood
            .loglike(&self.series, self.covfunc, &self.covariance_params(params))
    }

    /// Returns the names of the model parameters.
    pub fn names(&self) -> &[&'static str; 3] {
        &self.names
    }

    /// Assemble a new [`Cov3ParModel`].
    ///
    /// Unless given by `par_init`, the initial values are `sigma = ry / 4`, `tau = sqrt(rx cad)`
    /// and the default shape of the covariance function, where `ry` is the value range, `rx` the
    /// time span and `cad` the continuum cadence of the series.
    pub fn new(
        series: LcSeries<T>,
        settings: &ModelSettings<T>,
        likelihood: L,
    ) -> Result<Self, ModelError<T>> {
        let stats = series.stats()?;
        let covfunc = settings.covfunc;

        let [sigma_init, tau_init, nu_init] = settings.par_init.unwrap_or([
            stats.value_range / T!(4.0),
            sqrt!(stats.span * stats.cont_cadence),
            T!(covfunc.nu_init()),
        ]);

        let nu_range = settings.nu_range.unwrap_or_else(|| {
            let (nu_min, nu_max) = covfunc.nu_range();

            (T!(nu_min), T!(nu_max))
        });

        let (sigma, sigma_transform) =
            settings
                .sigma_prior
                .hyper_param(&stats, sigma_init, settings.verbose)?;

        let tau = settings
            .tau_prior
            .hyper_param(&stats, tau_init, settings.verbose)?;

        let nu = settings
            .nu_prior
            .hyper_param(nu_range, nu_init, settings.verbose)?;

        let (sigma_name, sigma_prior, sigma_init) = sigma.into_parts();
        let (tau_name, tau_prior, tau_init) = tau.into_parts();
        let (nu_name, nu_prior, nu_init) = nu.into_parts();

        debug!(
            "{} model: sigma ~ {}, tau ~ {}, nu ~ {} ({} epochs)",
            covfunc,
            settings.sigma_prior,
            settings.tau_prior,
            settings.nu_prior,
            series.len()
        );

        Ok(Self {
            covfunc,
            init: SVector::from([sigma_init, tau_init, nu_init]),
            likelihood,
            names: [sigma_name, tau_name, nu_name],
            prior: MultivariateDensity::new([sigma_prior, tau_prior, nu_prior]),
            series,
            sigma_transform,
            stats,
        })
    }

    /// Returns the light curve series.
    pub fn series(&self) -> &LcSeries<T> {
        &self.series
    }

    /// Returns the transform that maps the first model parameter to `sigma`.
    pub fn sigma_transform(&self) -> SigmaTransform {
        self.sigma_transform
    }

    /// Returns the light curve statistics that set the prior scales.
    pub fn stats(&self) -> &LcStats<T> {
        &self.stats
    }
}

impl<T, L> BayesModel<T, 3> for Cov3ParModel<T, L>
where
    T: fXX,
    L: CovLikelihood<T>,
{
    const RCS: usize = 8;

    fn initial_values(&self) -> SVector<T, 3> {
        self.init
    }

    fn log_likelihood(&self, params: &SVectorView<T, 3>) -> Result<T, ModelError<T>> {
        let output = self.likelihood_output(params)?;

        if num_traits::Float::is_nan(output.log_likelihood) {
            return Err(ModelError::OutputNaN);
        }

        Ok(output.log_likelihood)
    }

    fn model_prior(&self) -> &MultivariateDensity<T, 3> {
        &self.prior
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        base::{LcObs, ModelSettingsBuilder, ParamEnsbl},
        models::{NuPrior, SigmaPrior, TauPrior},
        stats::{
            ConstantDensity, DensityError, DoubleLobedDensity, GammaDensity, InverseGammaDensity,
            JeffreysDensity, UniformDensity,
        },
    };
    use approx::ulps_eq;
    use std::{
        f64::consts::PI,
        sync::atomic::{AtomicUsize, Ordering},
    };

    /// Uncorrelated noise with variance `sigma² + error²`, counting its evaluations.
    #[derive(Default)]
    struct WhiteNoise {
        calls: AtomicUsize,
    }

    impl WhiteNoise {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    impl CovLikelihood<f64> for WhiteNoise {
        fn loglike(
            &self,
            series: &LcSeries<f64>,
            _covfunc: CovFunc,
            params: &CovParams<f64>,
        ) -> Result<LikelihoodOutput<f64>, ModelError<f64>> {
            self.calls.fetch_add(1, Ordering::Relaxed);

            let mean = series.into_iter().map(|obs| *obs.value()).sum::<f64>() / series.len() as f64;

            let (chi2, ln_det) = series.into_iter().fold((0.0, 0.0), |(chi2, ln_det), obs| {
                let var = params.sigma.powi(2) + obs.error().powi(2);

                (
                    chi2 + (obs.value() - mean).powi(2) / var,
                    ln_det + (2.0 * PI * var).ln(),
                )
            });

            Ok(LikelihoodOutput {
                log_likelihood: -0.5 * (chi2 + ln_det),
                components: vec![chi2, ln_det],
            })
        }
    }

    fn series() -> LcSeries<f64> {
        let cont = LcSeries::from_iterator(
            (0..20).map(|i| LcObs::new(2.0 * i as f64, 15.0 + (0.6 * i as f64).sin(), 0.05)),
        );

        let line = LcSeries::from_iterator(
            (0..10).map(|i| LcObs::new(4.0 * i as f64 + 1.0, 12.0 + (0.6 * i as f64).cos(), 0.1)),
        );

        cont + line
    }

    fn settings(
        covfunc: CovFunc,
        sigma_prior: SigmaPrior<f64>,
        tau_prior: TauPrior<f64>,
        nu_prior: NuPrior<f64>,
    ) -> ModelSettings<f64> {
        ModelSettingsBuilder::default()
            .covfunc(covfunc)
            .sigma_prior(sigma_prior)
            .tau_prior(tau_prior)
            .nu_prior(nu_prior)
            .build()
            .unwrap()
    }

    #[test]
    fn test_cov3par_defaults() {
        let model = Cov3ParModel::new(
            series(),
            &ModelSettings::default(),
            WhiteNoise::default(),
        )
        .unwrap();

        let stats = *model.stats();

        assert!(ulps_eq!(stats.cont_cadence, 2.0));
        assert!(ulps_eq!(stats.span, 38.0));

        assert!(model.covfunc() == CovFunc::PowExp);
        assert!(*model.names() == ["sigma", "tau", "nu"]);
        assert!(model.free_names() == vec!["sigma", "tau", "nu"]);
        assert!(model.sigma_transform() == SigmaTransform::Identity);
        assert!(model.series().count_series() == 2);

        let init = model.initial_values();

        assert!(ulps_eq!(init[0], stats.value_range / 4.0));
        assert!(ulps_eq!(init[1], (38.0f64 * 2.0).sqrt()));
        assert!(init[2] == 1.0);

        assert!(
            *model.model_prior()
                == MultivariateDensity::new([
                    JeffreysDensity::new(),
                    DoubleLobedDensity::new(2.0, 1e4).unwrap(),
                    UniformDensity::new((0.0, 1.999)).unwrap(),
                ])
        );

        let logp = model.log_posterior(&init.as_view()).unwrap();
        let expected = model.log_prior(&init.as_view())
            + model.likelihood_output(&init.as_view()).unwrap().log_likelihood;

        assert!(ulps_eq!(logp, expected));
        assert!(logp.is_finite());
    }

    #[test]
    fn test_cov3par_sigma_priors() {
        let vague = Cov3ParModel::new(
            series(),
            &settings(
                CovFunc::Matern,
                SigmaPrior::Vague,
                TauPrior::Csk,
                NuPrior::Uniform,
            ),
            WhiteNoise::default(),
        )
        .unwrap();

        let init = vague.initial_values();
        let sigma_init = vague.stats().value_range / 4.0;

        assert!(vague.names()[0] == "invsigsq");
        assert!(vague.sigma_transform() == SigmaTransform::InverseSqrt);
        assert!(ulps_eq!(init[0], 1.0 / sigma_init.powi(2)));
        assert!(init[2] == 0.5);
        assert!(ulps_eq!(
            vague.covariance_params(&init.as_view()).sigma,
            sigma_init,
            epsilon = 1e-12
        ));
        assert!(vague.model_prior()[0] == GammaDensity::new(0.001, 0.001).unwrap());

        let gamma = Cov3ParModel::new(
            series(),
            &settings(
                CovFunc::PowExp,
                SigmaPrior::Gamma,
                TauPrior::Csk,
                NuPrior::Uniform,
            ),
            WhiteNoise::default(),
        )
        .unwrap();

        assert!(
            gamma.model_prior()[0]
                == GammaDensity::new(2.0, 1.0 / (gamma.stats().value_range / 4.0).powi(2))
                    .unwrap()
        );

        let none = Cov3ParModel::new(
            series(),
            &settings(
                CovFunc::PowExp,
                SigmaPrior::Uninformative,
                TauPrior::Csk,
                NuPrior::Uniform,
            ),
            WhiteNoise::default(),
        )
        .unwrap();

        assert!(none.names()[0] == "invsigsq");

        let params = SVector::from([-1e-8, 10.0, 1.0]);

        assert!(none.covariance_params(&params.as_view()).sigma == 1e6);
        assert!(none.log_prior(&params.as_view()).is_finite());

        let params = SVector::from([-4.0, 10.0, 1.0]);

        assert!(ulps_eq!(none.covariance_params(&params.as_view()).sigma, 0.5));
    }

    #[test]
    fn test_cov3par_tau_priors() {
        let stats = series().stats().unwrap();

        for (tau_prior, expected) in [
            (
                TauPrior::Vague,
                GammaDensity::new(0.001, 0.001).unwrap(),
            ),
            (
                TauPrior::InverseGamma,
                InverseGammaDensity::new(2.0, (stats.span * stats.cont_cadence).sqrt()).unwrap(),
            ),
        ] {
            let model = Cov3ParModel::new(
                series(),
                &settings(
                    CovFunc::ParetoExp,
                    SigmaPrior::Csk,
                    tau_prior,
                    NuPrior::Uniform,
                ),
                WhiteNoise::default(),
            )
            .unwrap();

            assert!(model.model_prior()[1] == expected);
            assert!(model.model_prior()[2] == UniformDensity::new((0.001, 2.0)).unwrap());
            assert!(model.initial_values()[2] == 1.5);
        }
    }

    #[test]
    fn test_cov3par_fixed() {
        let model = Cov3ParModel::new(
            series(),
            &ModelSettingsBuilder::default()
                .covfunc(CovFunc::KeplerExp)
                .sigma_prior(SigmaPrior::Fixed(0.3))
                .tau_prior(TauPrior::Fixed(20.0))
                .nu_prior(NuPrior::Uniform)
                .verbose(true)
                .build()
                .unwrap(),
            WhiteNoise::default(),
        )
        .unwrap();

        assert!(*model.names() == ["sigma", "tau", "nu"]);
        assert!(model.free_names() == vec!["nu"]);
        assert!(model.initial_values() == SVector::from([0.3, 20.0, 0.1]));
        assert!(model.model_prior()[0] == ConstantDensity::new(0.3));

        let log_prior = model.log_prior(&model.initial_values().as_view());

        assert!(ulps_eq!(log_prior, -(0.799f64.ln()), epsilon = 1e-12));

        // Moving a fixed parameter leaves the prior support.
        let params = SVector::from([0.31, 20.0, 0.1]);

        assert!(model.log_posterior(&params.as_view()).unwrap() == f64::NEG_INFINITY);
        assert!(model.likelihood.calls() == 0);
    }

    #[test]
    fn test_cov3par_overrides() {
        let mut settings =
            ModelSettings::powexp(SigmaPrior::Csk, TauPrior::Uninformative, NuPrior::Uniform);

        settings.par_init = Some([0.2, 15.0, 1.2]);

        let model = Cov3ParModel::new(series(), &settings, WhiteNoise::default()).unwrap();

        assert!(model.initial_values() == SVector::from([0.2, 15.0, 1.2]));
        assert!(model.model_prior()[2] == UniformDensity::new((0.0, 2.0)).unwrap());

        let legacy = Cov3ParModel::new(
            series(),
            &ModelSettings::powexp(SigmaPrior::Csk, TauPrior::Csk, NuPrior::Uniform),
            WhiteNoise::default(),
        )
        .unwrap();

        assert!(legacy.initial_values()[2] == 1.0);
        assert!(
            legacy
                .log_prior(&SVector::from([0.2, 15.0, 1.9995]).as_view())
                .is_finite()
        );
    }

    #[test]
    fn test_cov3par_support() {
        let model = Cov3ParModel::new(
            series(),
            &ModelSettings::default(),
            WhiteNoise::default(),
        )
        .unwrap();

        for params in [
            SVector::from([-0.1, 10.0, 1.0]),
            SVector::from([0.0, 10.0, 1.0]),
            SVector::from([0.1, -10.0, 1.0]),
            SVector::from([0.1, 2e4, 1.0]),
            SVector::from([0.1, 10.0, 2.5]),
            SVector::from([f64::NAN, 10.0, 1.0]),
        ] {
            assert!(model.log_posterior(&params.as_view()).unwrap() == f64::NEG_INFINITY);
        }

        assert!(model.likelihood.calls() == 0);

        model
            .log_posterior(&SVector::from([0.1, 10.0, 1.0]).as_view())
            .unwrap();

        assert!(model.likelihood.calls() == 1);
    }

    #[test]
    fn test_cov3par_likelihood_errors() {
        let nan = |_: &LcSeries<f64>,
                   _: CovFunc,
                   _: &CovParams<f64>|
         -> Result<LikelihoodOutput<f64>, ModelError<f64>> {
            Ok(LikelihoodOutput::new(f64::NAN))
        };

        let model = Cov3ParModel::new(series(), &ModelSettings::default(), nan).unwrap();

        assert!(matches!(
            model.log_posterior(&model.initial_values().as_view()),
            Err(ModelError::OutputNaN)
        ));

        let failing = |_: &LcSeries<f64>,
                       covfunc: CovFunc,
                       _: &CovParams<f64>|
         -> Result<LikelihoodOutput<f64>, ModelError<f64>> {
            Err(ModelError::Likelihood(format!(
                "covariance matrix for {} is not positive definite",
                covfunc
            )))
        };

        let model = Cov3ParModel::new(series(), &ModelSettings::default(), failing).unwrap();

        assert!(matches!(
            model.log_likelihood(&model.initial_values().as_view()),
            Err(ModelError::Likelihood(_))
        ));
    }

    #[test]
    fn test_cov3par_invalid_input() {
        let single = LcSeries::from_iterator([LcObs::new(0.0, 1.0, 0.1)]);

        assert!(matches!(
            Cov3ParModel::new(single, &ModelSettings::default(), WhiteNoise::default()),
            Err(ModelError::InsufficientContinuum { len: 1 })
        ));

        let mut settings = ModelSettings::default();

        settings.nu_range = Some((1.0, 1.0));

        assert!(matches!(
            Cov3ParModel::new(series(), &settings, WhiteNoise::default()),
            Err(ModelError::Density(_))
        ));

        let settings = ModelSettingsBuilder::default()
            .sigma_prior(SigmaPrior::Fixed(f64::NAN))
            .build()
            .unwrap();

        assert!(matches!(
            Cov3ParModel::new(series(), &settings, WhiteNoise::default()),
            Err(ModelError::Density(DensityError::InvalidParameter { param: "sigma", .. }))
        ));
    }

    #[test]
    fn test_cov3par_ensbl() {
        let model = Cov3ParModel::new(
            series(),
            &settings(
                CovFunc::Matern,
                SigmaPrior::Csk,
                TauPrior::InverseGamma,
                NuPrior::Fixed(1.5),
            ),
            WhiteNoise::default(),
        )
        .unwrap();

        let mut ensbl = ParamEnsbl::<f64, 3>::new(64);

        model.initialize_ensbl(&mut ensbl, 42).unwrap();

        assert!(ensbl.logp.iter().all(|logp| *logp == f64::NEG_INFINITY));

        let init = model.initial_values();

        ensbl.params.column_iter().for_each(|params| {
            assert!(params[0] == init[0]);
            assert!(params[1] > 0.0);
            assert!(params[2] == 1.5);
            assert!(model.log_prior(&params).is_finite());
        });

        model.log_posterior_ensbl(&mut ensbl).unwrap();

        assert!(model.likelihood.calls() == 64);
        assert!(ensbl.logp.iter().all(|logp| logp.is_finite()));

        let (best, logp) = ensbl.best().unwrap();

        assert!(ulps_eq!(model.log_posterior(&best.as_view()).unwrap(), logp));

        // Identical seeds reproduce the ensemble.
        let mut other = ParamEnsbl::<f64, 3>::new(64);

        model.initialize_ensbl(&mut other, 42).unwrap();

        assert!(other.params == ensbl.params);
    }

    #[test]
    fn test_cov3par_ensbl_seeds() {
        let model = Cov3ParModel::new(
            series(),
            &ModelSettings::default(),
            WhiteNoise::default(),
        )
        .unwrap();

        let mut ensbl = ParamEnsbl::<f64, 3>::new(64);

        model.initialize_ensbl(&mut ensbl, u64::MAX).unwrap();

        assert!(
            ensbl
                .params
                .column_iter()
                .all(|params| model.log_prior(&params).is_finite())
        );
    }

    #[test]
    fn test_cov3par_ensbl_f32() {
        let series = LcSeries::from_iterator(
            (0..20).map(|i| LcObs::new(2.0 * i as f32, 15.0 + (0.6 * i as f32).sin(), 0.05)),
        );

        let constant = |_: &LcSeries<f32>,
                        _: CovFunc,
                        _: &CovParams<f32>|
         -> Result<LikelihoodOutput<f32>, ModelError<f32>> {
            Ok(LikelihoodOutput::new(-1.0))
        };

        let model = Cov3ParModel::new(
            series,
            &ModelSettingsBuilder::default()
                .sigma_prior(SigmaPrior::Vague)
                .tau_prior(TauPrior::Vague)
                .build()
                .unwrap(),
            constant,
        )
        .unwrap();

        let mut ensbl = ParamEnsbl::<f32, 3>::new(20000);

        for rseed in 0..5 {
            model.initialize_ensbl(&mut ensbl, rseed).unwrap();

            ensbl.params.column_iter().for_each(|params| {
                assert!(params[0] > 0.0 && params[1] > 0.0);
                assert!(model.log_prior(&params).is_finite());
            });
        }
    }
}
