use crate::{
    fXX,
    math::{T, exp, ln, ln_gamma, nan, neg_inf, sqrt},
    stats::{Density, DensityError, DensityRange},
};
use derive_more::{Deref, DerefMut, IntoIterator};
use log::error;
use nalgebra::{SVector, SVectorView};
use num_traits::AsPrimitive;
use rand::Rng;
use rand_distr::{Gamma, Uniform};
use serde::{Deserialize, Serialize};

/// Number of attempts to draw a sample within the support of a density.
const SAMPLING_ATTEMPTS: usize = 100;

/// A joint probability density function composed of `D` independent univariate density functions.
#[derive(Clone, Debug, Deref, DerefMut, Deserialize, IntoIterator, PartialEq, Serialize)]
pub struct MultivariateDensity<T, const D: usize>(
    #[into_iterator(owned, ref, ref_mut)]
    #[serde(with = "serde_arrays")]
    #[serde(bound = "T: for<'x> Deserialize<'x> + Serialize")]
    [UnivariateDensity<T>; D],
);

impl<T, const D: usize> MultivariateDensity<T, D> {
    /// Create a new [`MultivariateDensity`].
    pub fn new(uvpdfs: [UnivariateDensity<T>; D]) -> Self {
        Self(uvpdfs)
    }
}

impl<T, const D: usize> Density<T, D> for MultivariateDensity<T, D>
where
    T: fXX,
{
    fn draw_sample(&self, rng: &mut impl Rng) -> Result<SVector<T, D>, DensityError<T>> {
        let mut sample = SVector::<T, D>::zeros();

        sample
            .iter_mut()
            .zip(self.0.iter())
            .try_for_each(|(value, uvpdf)| {
                *value = uvpdf.draw_sample(rng)?[0];

                Ok(())
            })?;

        Ok(sample)
    }

    fn get_constants(&self) -> SVector<T, D> {
        SVector::from_iterator(self.0.iter().map(|uvpdf| uvpdf.get_constants()[0]))
    }

    fn get_range(&self) -> SVector<DensityRange<T>, D> {
        SVector::from_iterator(self.0.iter().map(|uvpdf| uvpdf.get_range()[0]))
    }

    fn log_density(&self, x: &SVectorView<T, D>) -> T {
        self.0
            .iter()
            .zip(x.iter())
            .fold(T::zero(), |acc, (uvpdf, value)| {
                acc + uvpdf.log_density(&SVector::<T, 1>::from([*value]).as_view())
            })
    }
}

/// An algebraic data type for univariate probability density functions.
#[allow(missing_docs)]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", content = "content")]
pub enum UnivariateDensity<T> {
    Constant(ConstantDensity<T>),
    DoubleLobed(DoubleLobedDensity<T>),
    Flat(FlatDensity),
    Gamma(GammaDensity<T>),
    InverseGamma(InverseGammaDensity<T>),
    Jeffreys(JeffreysDensity),
    Uniform(UniformDensity<T>),
}

impl<T> UnivariateDensity<T> {
    /// Returns `true` if the density can be normalized (and therefore sampled).
    pub fn is_proper(&self) -> bool {
        !matches!(
            self,
            UnivariateDensity::Flat(_) | UnivariateDensity::Jeffreys(_)
        )
    }
}

impl<T> Density<T, 1> for UnivariateDensity<T>
where
    T: fXX,
{
    fn draw_sample(&self, rng: &mut impl Rng) -> Result<SVector<T, 1>, DensityError<T>> {
        match self {
            UnivariateDensity::Constant(pdf) => pdf.draw_sample(rng),
            UnivariateDensity::DoubleLobed(pdf) => pdf.draw_sample(rng),
            UnivariateDensity::Flat(pdf) => pdf.draw_sample(rng),
            UnivariateDensity::Gamma(pdf) => pdf.draw_sample(rng),
            UnivariateDensity::InverseGamma(pdf) => pdf.draw_sample(rng),
            UnivariateDensity::Jeffreys(pdf) => pdf.draw_sample(rng),
            UnivariateDensity::Uniform(pdf) => pdf.draw_sample(rng),
        }
    }

    fn get_constants(&self) -> SVector<T, 1> {
        match self {
            UnivariateDensity::Constant(pdf) => pdf.get_constants(),
            _ => SVector::from([nan!()]),
        }
    }

    fn get_range(&self) -> SVector<DensityRange<T>, 1> {
        match self {
            UnivariateDensity::Constant(pdf) => pdf.get_range(),
            UnivariateDensity::DoubleLobed(pdf) => pdf.get_range(),
            UnivariateDensity::Flat(pdf) => pdf.get_range(),
            UnivariateDensity::Gamma(pdf) => pdf.get_range(),
            UnivariateDensity::InverseGamma(pdf) => pdf.get_range(),
            UnivariateDensity::Jeffreys(pdf) => pdf.get_range(),
            UnivariateDensity::Uniform(pdf) => pdf.get_range(),
        }
    }

    fn log_density(&self, x: &SVectorView<T, 1>) -> T {
        match self {
            UnivariateDensity::Constant(pdf) => pdf.log_density(x),
            UnivariateDensity::DoubleLobed(pdf) => pdf.log_density(x),
            UnivariateDensity::Flat(pdf) => pdf.log_density(x),
            UnivariateDensity::Gamma(pdf) => pdf.log_density(x),
            UnivariateDensity::InverseGamma(pdf) => pdf.log_density(x),
            UnivariateDensity::Jeffreys(pdf) => pdf.log_density(x),
            UnivariateDensity::Uniform(pdf) => pdf.log_density(x),
        }
    }
}

/// Draws from `sampler` until `accept` holds, giving up after [`SAMPLING_ATTEMPTS`] tries.
fn draw_within<T, S, A>(
    name: &'static str,
    mut sampler: S,
    accept: A,
) -> Result<SVector<T, 1>, DensityError<T>>
where
    T: fXX,
    S: FnMut() -> T,
    A: Fn(T) -> bool,
{
    for _ in 0..SAMPLING_ATTEMPTS {
        let candidate = sampler();

        if accept(candidate) {
            return Ok(SVector::from([candidate]));
        }
    }

    error!(
        "{}::draw_sample has failed to draw a valid sample after {} tries",
        name, SAMPLING_ATTEMPTS
    );

    Err(DensityError::Sampling {
        name,
        attempts: SAMPLING_ATTEMPTS,
    })
}

/// A constant probability density function, used for fixed parameters.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ConstantDensity<T> {
    constant: T,
}

impl<T> ConstantDensity<T> {
    /// Create a new [`UnivariateDensity`].
    #[allow(clippy::new_ret_no_self)]
    pub fn new(constant: T) -> UnivariateDensity<T> {
        UnivariateDensity::Constant(Self { constant })
    }
}

impl<T> Density<T, 1> for ConstantDensity<T>
where
    T: fXX,
{
    fn draw_sample(&self, _rng: &mut impl Rng) -> Result<SVector<T, 1>, DensityError<T>> {
        Ok(SVector::from([self.constant]))
    }

    fn get_constants(&self) -> SVector<T, 1> {
        SVector::from([self.constant])
    }

    fn get_range(&self) -> SVector<DensityRange<T>, 1> {
        SVector::from([DensityRange::new((self.constant, self.constant))])
    }

    fn log_density(&self, x: &SVectorView<T, 1>) -> T {
        if x[0] == self.constant {
            T::zero()
        } else {
            neg_inf!()
        }
    }
}

/// A density that decreases logarithmically away from a pivot value `c` within `(0, max)`:
///
/// `ln p(x) = -ln(c / x)` for `0 < x <= c` and `ln p(x) = -ln(x / c)` for `c < x < max`.
///
/// Used as the "CSK" timescale prior, with the pivot set to the cadence of the driving light curve.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DoubleLobedDensity<T> {
    maximum: T,
    pivot: T,
}

impl<T> DoubleLobedDensity<T>
where
    T: fXX,
{
    /// Create a new [`UnivariateDensity`].
    #[allow(clippy::new_ret_no_self)]
    pub fn new(pivot: T, maximum: T) -> Result<UnivariateDensity<T>, DensityError<T>> {
        if !(T::zero() < pivot && pivot < maximum && num_traits::Float::is_finite(maximum)) {
            return Err(DensityError::InvalidRange {
                name: "DoubleLobedDensity",
                maxv: maximum,
                minv: pivot,
            });
        }

        Ok(UnivariateDensity::DoubleLobed(Self { maximum, pivot }))
    }
}

impl<T> Density<T, 1> for DoubleLobedDensity<T>
where
    T: fXX,
{
    fn draw_sample(&self, rng: &mut impl Rng) -> Result<SVector<T, 1>, DensityError<T>> {
        let c = self.pivot;

        // The lower lobe carries c / 2 of the (unnormalized) mass, the upper lobe c ln(max / c).
        let lower_mass = c / T!(2.0);
        let total_mass = lower_mass + c * ln!(self.maximum / c);

        let uniform = Uniform::new(T::zero(), total_mass).map_err(|_| DensityError::Sampling {
            name: "DoubleLobedDensity",
            attempts: 0,
        })?;

        draw_within(
            "DoubleLobedDensity",
            || {
                let u = rng.sample(&uniform);

                // Inverse transform sampling per lobe.
                if u < lower_mass {
                    sqrt!(T!(2.0) * u * c)
                } else {
                    c * exp!((u - lower_mass) / c)
                }
            },
            |value| (T::zero() < value) & (value < self.maximum),
        )
    }

    fn get_constants(&self) -> SVector<T, 1> {
        SVector::from([nan!()])
    }

    fn get_range(&self) -> SVector<DensityRange<T>, 1> {
        SVector::from([DensityRange::new((T::zero(), self.maximum))])
    }

    fn log_density(&self, x: &SVectorView<T, 1>) -> T {
        let value = x[0];

        if (self.pivot < value) && (value < self.maximum) {
            -ln!(value / self.pivot)
        } else if (T::zero() < value) && (value <= self.pivot) {
            -ln!(self.pivot / value)
        } else {
            neg_inf!()
        }
    }
}

/// An improper flat density over the entire real line.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FlatDensity;

impl FlatDensity {
    /// Create a new [`UnivariateDensity`].
    #[allow(clippy::new_ret_no_self)]
    pub fn new<T>() -> UnivariateDensity<T> {
        UnivariateDensity::Flat(Self)
    }
}

impl<T> Density<T, 1> for FlatDensity
where
    T: fXX,
{
    fn draw_sample(&self, _rng: &mut impl Rng) -> Result<SVector<T, 1>, DensityError<T>> {
        Err(DensityError::Improper {
            name: "FlatDensity",
        })
    }

    fn get_constants(&self) -> SVector<T, 1> {
        SVector::from([nan!()])
    }

    fn get_range(&self) -> SVector<DensityRange<T>, 1> {
        SVector::from([DensityRange::new((neg_inf!(), -neg_inf!()))])
    }

    fn log_density(&self, x: &SVectorView<T, 1>) -> T {
        if num_traits::Float::is_nan(x[0]) {
            neg_inf!()
        } else {
            T::zero()
        }
    }
}

/// A gamma density with shape `alpha` and rate `beta`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GammaDensity<T> {
    alpha: T,
    beta: T,
}

impl<T> GammaDensity<T>
where
    T: fXX,
{
    /// Create a new [`UnivariateDensity`].
    #[allow(clippy::new_ret_no_self)]
    pub fn new(alpha: T, beta: T) -> Result<UnivariateDensity<T>, DensityError<T>> {
        check_positive("GammaDensity", "alpha", alpha)?;
        check_positive("GammaDensity", "beta", beta)?;

        Ok(UnivariateDensity::Gamma(Self { alpha, beta }))
    }
}

impl<T> Density<T, 1> for GammaDensity<T>
where
    T: fXX,
{
    fn draw_sample(&self, rng: &mut impl Rng) -> Result<SVector<T, 1>, DensityError<T>> {
        let gamma = gamma_f64("GammaDensity", self.alpha, self.beta)?;

        draw_within(
            "GammaDensity",
            || positive_draw(rng.sample(&gamma)),
            |value| (T::zero() < value) & num_traits::Float::is_finite(value),
        )
    }

    fn get_constants(&self) -> SVector<T, 1> {
        SVector::from([nan!()])
    }

    fn get_range(&self) -> SVector<DensityRange<T>, 1> {
        SVector::from([DensityRange::new((T::zero(), -neg_inf!()))])
    }

    fn log_density(&self, x: &SVectorView<T, 1>) -> T {
        let value = x[0];

        if !(T::zero() < value && num_traits::Float::is_finite(value)) {
            return neg_inf!();
        }

        self.alpha * ln!(self.beta) - ln_gamma(self.alpha) + (self.alpha - T::one()) * ln!(value)
            - self.beta * value
    }
}

/// An inverse gamma density with shape `alpha` and scale `beta`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct InverseGammaDensity<T> {
    alpha: T,
    beta: T,
}

impl<T> InverseGammaDensity<T>
where
    T: fXX,
{
    /// Create a new [`UnivariateDensity`].
    #[allow(clippy::new_ret_no_self)]
    pub fn new(alpha: T, beta: T) -> Result<UnivariateDensity<T>, DensityError<T>> {
        check_positive("InverseGammaDensity", "alpha", alpha)?;
        check_positive("InverseGammaDensity", "beta", beta)?;

        Ok(UnivariateDensity::InverseGamma(Self { alpha, beta }))
    }
}

impl<T> Density<T, 1> for InverseGammaDensity<T>
where
    T: fXX,
{
    fn draw_sample(&self, rng: &mut impl Rng) -> Result<SVector<T, 1>, DensityError<T>> {
        // If X ~ Gamma(alpha, rate = beta) then 1 / X ~ InverseGamma(alpha, scale = beta).
        let gamma = gamma_f64("InverseGammaDensity", self.alpha, self.beta)?;

        draw_within(
            "InverseGammaDensity",
            || T::one() / positive_draw(rng.sample(&gamma)),
            |value| (T::zero() < value) & num_traits::Float::is_finite(value),
        )
    }

    fn get_constants(&self) -> SVector<T, 1> {
        SVector::from([nan!()])
    }

    fn get_range(&self) -> SVector<DensityRange<T>, 1> {
        SVector::from([DensityRange::new((T::zero(), -neg_inf!()))])
    }

    fn log_density(&self, x: &SVectorView<T, 1>) -> T {
        let value = x[0];

        if !(T::zero() < value && num_traits::Float::is_finite(value)) {
            return neg_inf!();
        }

        self.alpha * ln!(self.beta)
            - ln_gamma(self.alpha)
            - (self.alpha + T::one()) * ln!(value)
            - self.beta / value
    }
}

/// An improper scale-invariant density `p(x) ∝ 1 / x` for `x > 0`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct JeffreysDensity;

impl JeffreysDensity {
    /// Create a new [`UnivariateDensity`].
    #[allow(clippy::new_ret_no_self)]
    pub fn new<T>() -> UnivariateDensity<T> {
        UnivariateDensity::Jeffreys(Self)
    }
}

impl<T> Density<T, 1> for JeffreysDensity
where
    T: fXX,
{
    fn draw_sample(&self, _rng: &mut impl Rng) -> Result<SVector<T, 1>, DensityError<T>> {
        Err(DensityError::Improper {
            name: "JeffreysDensity",
        })
    }

    fn get_constants(&self) -> SVector<T, 1> {
        SVector::from([nan!()])
    }

    fn get_range(&self) -> SVector<DensityRange<T>, 1> {
        SVector::from([DensityRange::new((T::zero(), -neg_inf!()))])
    }

    fn log_density(&self, x: &SVectorView<T, 1>) -> T {
        if x[0] > T::zero() {
            -ln!(x[0])
        } else {
            neg_inf!()
        }
    }
}

/// A uniform probability density function over a closed interval.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct UniformDensity<T> {
    range: (T, T),
}

impl<T> UniformDensity<T>
where
    T: fXX,
{
    /// Create a new [`UnivariateDensity`].
    #[allow(clippy::new_ret_no_self)]
    pub fn new(minamax: (T, T)) -> Result<UnivariateDensity<T>, DensityError<T>> {
        let (minv, maxv) = minamax;

        if !(minv < maxv && num_traits::Float::is_finite(maxv - minv)) {
            return Err(DensityError::InvalidRange {
                name: "UniformDensity",
                maxv,
                minv,
            });
        }

        Ok(UnivariateDensity::Uniform(Self { range: minamax }))
    }
}

impl<T> Density<T, 1> for UniformDensity<T>
where
    T: fXX,
{
    fn draw_sample(&self, rng: &mut impl Rng) -> Result<SVector<T, 1>, DensityError<T>> {
        // The range is finite and non-empty, this invariant is guaranteed by the constructor.
        let uniform = Uniform::new_inclusive(self.range.0, self.range.1).map_err(|_| {
            DensityError::InvalidRange {
                name: "UniformDensity",
                maxv: self.range.1,
                minv: self.range.0,
            }
        })?;

        Ok(SVector::from([rng.sample(&uniform)]))
    }

    fn get_constants(&self) -> SVector<T, 1> {
        SVector::from([nan!()])
    }

    fn get_range(&self) -> SVector<DensityRange<T>, 1> {
        SVector::from([DensityRange::new(self.range)])
    }

    fn log_density(&self, x: &SVectorView<T, 1>) -> T {
        if (self.range.0 <= x[0]) && (x[0] <= self.range.1) {
            -ln!(self.range.1 - self.range.0)
        } else {
            neg_inf!()
        }
    }
}

fn check_positive<T>(name: &'static str, param: &'static str, value: T) -> Result<(), DensityError<T>>
where
    T: fXX,
{
    if T::zero() < value && num_traits::Float::is_finite(value) {
        Ok(())
    } else {
        Err(DensityError::InvalidParameter { name, param, value })
    }
}

/// Converts a positive double precision draw to `T`, draws below the smallest positive `T` are
/// clamped to it.
fn positive_draw<T>(value: f64) -> T
where
    T: fXX,
{
    let min_positive = <T as num_traits::Float>::min_positive_value();
    let value = T!(value);

    if value < min_positive {
        min_positive
    } else {
        value
    }
}

/// Gamma sampler with shape `alpha` and rate `beta`, sampling is done in double precision.
fn gamma_f64<T>(name: &'static str, alpha: T, beta: T) -> Result<Gamma<f64>, DensityError<T>>
where
    T: fXX,
{
    let shape: f64 = AsPrimitive::<f64>::as_(alpha);
    let scale: f64 = 1.0 / AsPrimitive::<f64>::as_(beta);

    Gamma::new(shape, scale).map_err(|_| DensityError::InvalidParameter {
        name,
        param: "alpha",
        value: alpha,
    })
}
