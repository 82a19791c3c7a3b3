use chrono::Local;
use env_logger::Builder;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;
use spear::{
    base::{
        BayesModel, CovParams, LcObs, LcSeries, LikelihoodOutput, ModelError,
        ModelSettingsBuilder, ParamEnsbl,
    },
    models::{Cov3ParModel, CovFunc, NuPrior, SigmaPrior, TauPrior},
};
use std::{f64::consts::PI, fs::create_dir_all, io::prelude::*, path::Path};

/// Exact Gaussian process likelihood of the continuum light curve with a power exponential kernel.
fn powexp_loglike(
    series: &LcSeries<f64>,
    covfunc: CovFunc,
    params: &CovParams<f64>,
) -> Result<LikelihoodOutput<f64>, ModelError<f64>> {
    if covfunc != CovFunc::PowExp {
        return Err(ModelError::Likelihood(format!(
            "covariance function {} is not supported",
            covfunc
        )));
    }

    let cont = series.continuum().collect::<Vec<&LcObs<f64>>>();
    let mean = cont.iter().map(|obs| obs.value()).sum::<f64>() / cont.len() as f64;

    let covm = DMatrix::from_fn(cont.len(), cont.len(), |i, j| {
        let dt = (cont[i].time() - cont[j].time()).abs();
        let noise = if i == j { cont[i].error().powi(2) } else { 0.0 };

        params.sigma.powi(2) * (-(dt / params.tau).powf(params.nu)).exp() + noise
    });

    let residuals = DVector::from_iterator(cont.len(), cont.iter().map(|obs| obs.value() - mean));

    let cholesky = covm.cholesky().ok_or_else(|| {
        ModelError::Likelihood("covariance matrix is not positive definite".to_string())
    })?;

    let chi2 = residuals.dot(&cholesky.solve(&residuals));
    let ln_det = 2.0 * cholesky.l().diagonal().iter().map(|v| v.ln()).sum::<f64>();

    Ok(LikelihoodOutput {
        log_likelihood: -0.5 * (chi2 + ln_det + cont.len() as f64 * (2.0 * PI).ln()),
        components: vec![chi2, ln_det],
    })
}

fn main() {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S.%f"),
                record.level(),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .init();

    const ENSEMBLE_SIZE: usize = 4 * 256;

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.05).unwrap();

    // A smooth continuum and a lagged, scaled response.
    let cont = LcSeries::from_iterator((0..80).map(|i| {
        let time = 2.5 * i as f64;

        LcObs::new(
            time,
            17.0 + 0.4 * (time / 30.0).sin() + noise.sample(&mut rng),
            0.05,
        )
    }));

    let line = LcSeries::from_iterator((0..40).map(|i| {
        let time = 5.0 * i as f64 + 1.0;

        LcObs::new(
            time,
            15.0 + 0.6 * ((time - 12.0) / 30.0).sin() + noise.sample(&mut rng),
            0.08,
        )
    }));

    let settings = ModelSettingsBuilder::default()
        .covfunc(CovFunc::PowExp)
        .sigma_prior(SigmaPrior::Csk)
        .tau_prior(TauPrior::Csk)
        .nu_prior(NuPrior::Uniform)
        .verbose(true)
        .build()
        .unwrap();

    let model = Cov3ParModel::new(cont + line, &settings, powexp_loglike).unwrap();

    info!(
        "model parameters: {:?} (free: {:?})",
        model.names(),
        model.free_names()
    );

    let init = model.initial_values();

    info!(
        "initial values: sigma = {:.3}, tau = {:.3}, nu = {:.3}, log-posterior = {:.3}",
        init[0],
        init[1],
        init[2],
        model.log_posterior(&init.as_view()).unwrap()
    );

    let mut ensbl = ParamEnsbl::<f64, 3>::new(ENSEMBLE_SIZE);

    model.initialize_ensbl(&mut ensbl, 43).unwrap();
    model.log_posterior_ensbl(&mut ensbl).unwrap();

    if let Some((best, logp)) = ensbl.best() {
        let params = model.covariance_params(&best.as_view());

        info!(
            "best member: sigma = {:.3}, tau = {:.3}, nu = {:.3}, log-posterior = {:.3}",
            params.sigma, params.tau, params.nu, logp
        );
    }

    let path = Path::new("demos").join("output").join("fit_cov3par");

    let base_dir_opt = if path.exists() {
        Some(path)
    } else if path.parent().unwrap().parent().unwrap().exists() {
        create_dir_all(&path).expect("failed to create output directory");

        Some(path)
    } else {
        warn!("path {} not found, results will not be saved", path.display());

        None
    };

    if let Some(base_dir) = &base_dir_opt {
        settings.save(base_dir.join("settings.json5")).unwrap();
        ensbl.save(base_dir.join("initial.ensbl")).unwrap();
    }
}
