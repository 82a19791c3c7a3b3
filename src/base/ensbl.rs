use crate::{base::SettingsError, fXX};
use nalgebra::{Const, Dyn, OMatrix, SVector};
use serde::{Deserialize, Serialize};
use std::{io::Write, path::Path};

/// An ensemble of model parameter vectors together with their log-posterior values.
///
/// Each column of `params` is one ensemble member, which is the layout ensemble samplers
/// (e.g. affine-invariant walkers) operate on.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(bound(serialize = "T: fXX + Serialize"))]
#[serde(bound(deserialize = "T: fXX + Deserialize<'de>"))]
pub struct ParamEnsbl<T, const D: usize>
where
    T: fXX,
{
    /// Ensemble model parameters.
    pub params: OMatrix<T, Const<D>, Dyn>,

    /// Log-posterior value of each ensemble member.
    pub logp: Vec<T>,
}

impl<T, const D: usize> ParamEnsbl<T, D>
where
    T: fXX,
{
    /// Returns the ensemble member with the highest finite log-posterior value.
    pub fn best(&self) -> Option<(SVector<T, D>, T)> {
        self.params
            .column_iter()
            .zip(self.logp.iter())
            .filter(|(_, logp)| num_traits::Float::is_finite(**logp))
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(column, logp)| (column.into_owned(), *logp))
    }

    /// Returns true if the ensemble contains no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of members in the ensemble, also referred to as its 'length'.
    pub fn len(&self) -> usize {
        self.params.ncols()
    }

    /// Create a new [`ParamEnsbl`] filled with zeros.
    pub fn new(size: usize) -> Self {
        Self {
            params: OMatrix::<T, Const<D>, Dyn>::zeros(size),
            logp: vec![T::zero(); size],
        }
    }

    /// Serialize the ensemble to a JSON5 file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError>
    where
        Self: Serialize,
    {
        let mut file = std::fs::File::create(path)?;

        file.write_all(serde_json5::to_string(&self)?.as_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_ensbl() {
        let mut ensbl = ParamEnsbl::<f64, 3>::new(4);

        assert!(ensbl.len() == 4);
        assert!(!ensbl.is_empty());

        ensbl.params.column_mut(2).fill(1.0);
        ensbl.logp = vec![-3.0, f64::NAN, -1.0, f64::NEG_INFINITY];

        let (best, logp) = ensbl.best().unwrap();

        assert!(logp == -1.0);
        assert!(best == SVector::from([1.0, 1.0, 1.0]));

        ensbl.logp = vec![f64::NEG_INFINITY; 4];

        assert!(ensbl.best().is_none());
        assert!(ParamEnsbl::<f64, 3>::new(0).is_empty());
    }
}
