use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::variance::{explained_variance, information_criterion, BicPenalty};
use crate::Float;

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// Statistics of one evaluated number of clusters.
///
/// A record is created once per K, either from a fresh fit or read back from a ledger, and never
/// changes afterwards. `k = 0` is the baseline without any clustering: all variance is left
/// unexplained.
pub struct ClusterFitRecord<F: Float> {
    k: usize,
    n: usize,
    p: usize,
    within_variance: F,
    explained_variance: F,
    total_variance: F,
    bic: F,
    path: Option<PathBuf>,
}

impl<F: Float> ClusterFitRecord<F> {
    /// Derives the explained variance and the information criterion of a fit with `k` clusters
    /// on `n` observations of `p` features.
    pub fn new(
        k: usize,
        n: usize,
        p: usize,
        within_variance: F,
        total_variance: F,
        penalty: BicPenalty,
    ) -> Result<Self> {
        if n == 0 || p == 0 {
            return Err(Error::DataShape(format!(
                "cannot summarize a fit on {} observations with {} features",
                n, p
            )));
        }
        if !(within_variance >= F::zero()) || !(total_variance >= F::zero()) {
            return Err(Error::DataShape(format!(
                "variances must be non-negative, got within={} total={}",
                within_variance, total_variance
            )));
        }

        Ok(ClusterFitRecord {
            k,
            n,
            p,
            within_variance,
            explained_variance: explained_variance(total_variance, within_variance),
            total_variance,
            bic: information_criterion(within_variance, n, p, k, penalty),
            path: None,
        })
    }

    /// The `k = 0` record: nothing is explained.
    pub fn baseline(n: usize, p: usize, total_variance: F) -> Result<Self> {
        Self::new(0, n, p, total_variance, total_variance, BicPenalty::default())
    }

    /// Rebuilds a record from persisted statistics without recomputing anything.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        k: usize,
        n: usize,
        p: usize,
        within_variance: F,
        explained_variance: F,
        total_variance: F,
        bic: F,
        path: Option<PathBuf>,
    ) -> Self {
        ClusterFitRecord {
            k,
            n,
            p,
            within_variance,
            explained_variance,
            total_variance,
            bic,
            path,
        }
    }

    /// Attaches the location of the persisted model artifacts
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Number of clusters
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of observations the fit was computed on
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of feature dimensions
    pub fn p(&self) -> usize {
        self.p
    }

    /// Sum of squared distances of the observations to their assigned cluster center
    pub fn within_variance(&self) -> F {
        self.within_variance
    }

    /// `total_variance - within_variance`
    pub fn explained_variance(&self) -> F {
        self.explained_variance
    }

    /// Sum of squared distances of the observations to the global centroid
    pub fn total_variance(&self) -> F {
        self.total_variance
    }

    pub fn bic(&self) -> F {
        self.bic
    }

    /// Base path of the persisted model artifacts, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn autotraits() {
        fn has_autotraits<T: Send + Sync + Sized + Unpin>() {}
        has_autotraits::<ClusterFitRecord<f64>>();
        has_autotraits::<ClusterFitRecord<f32>>();
    }

    #[test]
    fn explained_variance_is_derived() {
        let record = ClusterFitRecord::new(10, 1000, 5, 50., 500., BicPenalty::KTimesP).unwrap();
        assert_abs_diff_eq!(record.explained_variance(), 450.);
        assert_abs_diff_eq!(
            record.explained_variance(),
            record.total_variance() - record.within_variance()
        );
        assert!(record.path().is_none());
    }

    #[test]
    fn baseline_explains_nothing() {
        let record = ClusterFitRecord::baseline(1000, 5, 500.).unwrap();
        assert_eq!(record.k(), 0);
        assert_abs_diff_eq!(record.within_variance(), 500.);
        assert_abs_diff_eq!(record.explained_variance(), 0.);
    }

    #[test]
    fn negative_variances_are_rejected() {
        assert!(matches!(
            ClusterFitRecord::new(3, 10, 2, -1., 5., BicPenalty::K),
            Err(Error::DataShape(_))
        ));
        assert!(matches!(
            ClusterFitRecord::new(3, 10, 2, f64::NAN, 5., BicPenalty::K),
            Err(Error::DataShape(_))
        ));
        assert!(matches!(
            ClusterFitRecord::new(3, 0, 2, 1., 5., BicPenalty::K),
            Err(Error::DataShape(_))
        ));
    }

    #[test]
    fn path_is_attached() {
        let record = ClusterFitRecord::new(2, 10, 2, 1., 5., BicPenalty::K)
            .unwrap()
            .with_path("out/fit-K2");
        assert_eq!(record.path(), Some(Path::new("out/fit-K2")));
    }
}
