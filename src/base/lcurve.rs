use crate::{base::ModelError, fXX};
use derive_more::IntoIterator;
use itertools::{Itertools, MinMaxResult, zip_eq};
use log::debug;
use num_traits::float::TotalOrder;
use serde::{Deserialize, Serialize};
use std::{
    cmp::max,
    ops::{Add, AddAssign},
};

/// A single light curve epoch.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LcObs<T> {
    error: T,
    time: T,
    value: T,
}

impl<T> LcObs<T> {
    /// Returns the measurement uncertainty.
    pub fn error(&self) -> &T {
        &self.error
    }

    /// Create a new [`LcObs`].
    pub fn new(time: T, value: T, error: T) -> Self {
        Self { error, time, value }
    }

    /// Returns the epoch timestamp.
    pub fn time(&self) -> &T {
        &self.time
    }

    /// Returns the measured value (flux or magnitude).
    pub fn value(&self) -> &T {
        &self.value
    }
}

/// Summary statistics of a [`LcSeries`] that set the scales of the model priors.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct LcStats<T> {
    /// Median spacing between consecutive epochs of the continuum light curve.
    pub cont_cadence: T,

    /// Time span covered by all light curves.
    pub span: T,

    /// Difference between the largest and smallest value over all light curves.
    pub value_range: T,
}

/// Represents one or more light curves, combined into a single series.
///
/// The first light curve is the driving continuum, every epoch remembers the light curve it
/// originates from so that a composite can be split up again.
#[derive(Clone, Debug, Default, Deserialize, IntoIterator, Serialize)]
pub struct LcSeries<T> {
    /// Vector of light curve epochs.
    #[into_iterator(ref)]
    lcobs: Vec<LcObs<T>>,

    /// The light curve index of each epoch.
    sorti: Vec<usize>,
}

impl<T> LcSeries<T> {
    /// Returns an iterator over the epochs of the continuum light curve.
    pub fn continuum(&self) -> impl Iterator<Item = &LcObs<T>> {
        self.iter_indexed()
            .filter_map(|(obs, sdx)| if sdx == 0 { Some(obs) } else { None })
    }

    /// Returns the number of individual light curves contained within.
    pub fn count_series(&self) -> usize {
        self.sorti.iter().fold(0, |acc, next| max(acc, *next)) + 1
    }

    /// Returns the first [`LcObs`].
    pub fn first_lcobs(&self) -> Option<&LcObs<T>> {
        self.lcobs.first()
    }

    /// Create a [`LcSeries`] from an iterator over `LcObs`.
    pub fn from_iterator<I: IntoIterator<Item = LcObs<T>>>(iter: I) -> Self {
        let lcobs = iter.into_iter().collect::<Vec<LcObs<T>>>();
        let length = lcobs.len();

        Self {
            lcobs,
            sorti: vec![0; length],
        }
    }

    /// Returns `true` if the series contains no epochs.
    pub fn is_empty(&self) -> bool {
        self.lcobs.is_empty()
    }

    /// Returns an iterator over all epochs together with their light curve index.
    pub fn iter_indexed(&self) -> impl Iterator<Item = (&LcObs<T>, usize)> {
        zip_eq(&self.lcobs, self.sorti.iter().copied())
    }

    /// Returns the last [`LcObs`].
    pub fn last_lcobs(&self) -> Option<&LcObs<T>> {
        self.lcobs.last()
    }

    /// Returns the number of epochs in the series.
    pub fn len(&self) -> usize {
        self.lcobs.len()
    }

    /// Create an empty [`LcSeries`]
    pub fn new() -> Self {
        Self {
            lcobs: Vec::new(),
            sorti: Vec::new(),
        }
    }

    /// Sorts all epochs by their timestamp.
    ///
    /// The sort is stable, epochs with equal timestamps retain their relative order.
    pub fn sort_by_time(&mut self)
    where
        T: TotalOrder,
    {
        let mut pairs = std::mem::take(&mut self.lcobs)
            .into_iter()
            .zip(std::mem::take(&mut self.sorti))
            .collect::<Vec<(LcObs<T>, usize)>>();

        pairs.sort_by(|a, b| a.0.time.total_cmp(&b.0.time));

        (self.lcobs, self.sorti) = pairs.into_iter().unzip();
    }

    /// The reciprocal of one or multiple [`Add`] calls.
    /// Calling this function consumes the [`LcSeries`] object and returns the original
    /// [`LcSeries`] objects in a vector.
    pub fn split(self) -> Vec<LcSeries<T>> {
        let mut series = (0..self.count_series())
            .map(|_| LcSeries::new())
            .collect::<Vec<LcSeries<T>>>();

        zip_eq(self.lcobs, self.sorti).for_each(|(obs, sdx)| series[sdx] += obs);

        series
    }

    /// Computes the [`LcStats`] of the series.
    pub fn stats(&self) -> Result<LcStats<T>, ModelError<T>>
    where
        T: fXX,
    {
        let (tmin, tmax) = match self
            .lcobs
            .iter()
            .map(|obs| obs.time)
            .minmax_by(|a, b| a.total_cmp(b))
        {
            MinMaxResult::NoElements => return Err(ModelError::EmptySeries),
            MinMaxResult::OneElement(time) => (time, time),
            MinMaxResult::MinMax(tmin, tmax) => (tmin, tmax),
        };

        let (vmin, vmax) = self
            .lcobs
            .iter()
            .map(|obs| obs.value)
            .minmax_by(|a, b| a.total_cmp(b))
            .into_option()
            .ok_or(ModelError::EmptySeries)?;

        let cont_times = self
            .continuum()
            .map(|obs| obs.time)
            .sorted_by(|a, b| a.total_cmp(b))
            .collect::<Vec<T>>();

        let cadences = cont_times
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .sorted_by(|a, b| a.total_cmp(b))
            .collect::<Vec<T>>();

        let cont_cadence = match cadences.len() {
            0 => {
                return Err(ModelError::InsufficientContinuum {
                    len: cont_times.len(),
                });
            }
            len if len % 2 == 1 => cadences[len / 2],
            len => (cadences[len / 2 - 1] + cadences[len / 2]) / (T::one() + T::one()),
        };

        if cont_cadence <= T::zero() {
            return Err(ModelError::InsufficientContinuum {
                len: cont_times.len(),
            });
        }

        let stats = LcStats {
            cont_cadence,
            span: tmax - tmin,
            value_range: vmax - vmin,
        };

        debug!(
            "light curve statistics: cadence = {:.3}, span = {:.3}, range = {:.3}",
            stats.cont_cadence, stats.span, stats.value_range
        );

        Ok(stats)
    }
}

impl<T> Add<LcObs<T>> for LcSeries<T> {
    type Output = Self;

    fn add(self, rhs: LcObs<T>) -> Self::Output {
        let mut result = self;

        result += rhs;

        result
    }
}

impl<T> Add for LcSeries<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        let mut result = self;

        result += rhs;

        result
    }
}

impl<T> AddAssign<LcObs<T>> for LcSeries<T> {
    fn add_assign(&mut self, rhs: LcObs<T>) {
        // Epochs always join the last light curve, regardless of the current ordering.
        let sdx = if self.is_empty() {
            0
        } else {
            self.count_series() - 1
        };

        self.lcobs.push(rhs);
        self.sorti.push(sdx);
    }
}

impl<T> AddAssign for LcSeries<T> {
    fn add_assign(&mut self, rhs: Self) {
        debug!(
            "merging two LcSeries objects ({} + {})",
            self.lcobs.len(),
            rhs.lcobs.len()
        );

        // An empty series does not occupy a light curve index.
        let idx_offset = if self.is_empty() {
            0
        } else {
            self.count_series()
        };

        self.lcobs.extend(rhs.lcobs);
        self.sorti
            .extend(rhs.sorti.iter().map(|sdx| sdx + idx_offset));
    }
}

impl<T> From<&[LcObs<T>]> for LcSeries<T>
where
    T: Clone,
{
    fn from(value: &[LcObs<T>]) -> Self {
        Self {
            lcobs: Vec::from(value),
            sorti: vec![0; value.len()],
        }
    }
}
