//! Variance accounting of a partitioning
//!
//! The total variance of a dataset is the sum over all observations of the squared euclidean
//! distance to the column-wise mean. A partitioning into `k` clusters leaves the within-cluster
//! variance, the sum of squared distances to the assigned cluster centers, unexplained; the
//! difference is the explained variance.
use ndarray::{ArrayBase, Axis, Data, Ix2};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::FittedModel;
use crate::Float;

/// Model complexity term of the information criterion
///
/// The complexity of a partitioning grows with the number of clusters and, since every center is
/// a point in feature space, possibly with the number of dimensions as well.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BicPenalty {
    /// `k` free parameters
    K,
    /// `k * p` free parameters, one coordinate per center and dimension
    #[default]
    KTimesP,
    /// `k * (p + 1)` free parameters, coordinates plus a mixing weight per center
    KTimesPPlusOne,
}

impl BicPenalty {
    /// Number of free parameters of a partitioning with `k` clusters in `p` dimensions
    pub fn n_parameters(&self, k: usize, p: usize) -> usize {
        match self {
            BicPenalty::K => k,
            BicPenalty::KTimesP => k * p,
            BicPenalty::KTimesPPlusOne => k * (p + 1),
        }
    }
}

pub(crate) fn check_shape<F: Float>(observations: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<()> {
    let (n, p) = observations.dim();
    if n == 0 {
        Err(Error::DataShape("the dataset has no observations".to_string()))
    } else if p == 0 {
        Err(Error::DataShape("the observations have no features".to_string()))
    } else {
        Ok(())
    }
}

/// Sum over all observations of the squared euclidean distance to the column-wise mean.
///
/// This is O(n·p): compute it once per dataset and keep the result.
pub fn total_variance<F: Float>(observations: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<F> {
    check_shape(observations)?;
    let mean = observations
        .mean_axis(Axis(0))
        .ok_or_else(|| Error::DataShape("cannot average an empty dataset".to_string()))?;
    let centered = observations - &mean;

    Ok(centered.iter().map(|&x| x * x).sum())
}

/// Sum over all observations of the squared distance to their assigned cluster center, as
/// reported by the fitting collaborator.
pub fn within_variance<F: Float, M: FittedModel<F>>(
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    model: &M,
) -> Result<F> {
    check_shape(observations)?;
    let n_features = model.centroids().ncols();
    if n_features != observations.ncols() {
        return Err(Error::DataShape(format!(
            "model was fitted on {} features but the dataset has {}",
            n_features,
            observations.ncols()
        )));
    }

    let cost = model.within_cluster_cost();
    if !cost.is_finite() || cost < F::zero() {
        return Err(Error::DataShape(format!(
            "within-cluster cost {} is not a non-negative number",
            cost
        )));
    }
    Ok(cost)
}

/// Portion of the total variance accounted for by a partitioning.
///
/// Rounding can leave `within` a hair above `total` for a near-degenerate fit, the result is
/// clamped at zero.
pub fn explained_variance<F: Float>(total: F, within: F) -> F {
    (total - within).max(F::zero())
}

/// `n * ln(within / n) + n_parameters(k, p) * ln(n)`
pub fn information_criterion<F: Float>(
    within: F,
    n: usize,
    p: usize,
    k: usize,
    penalty: BicPenalty,
) -> F {
    let n_f = F::cast(n);
    n_f * (within / n_f).ln() + F::cast(penalty.n_parameters(k, p)) * n_f.ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2, ArrayView2};

    struct Centers(Array2<f64>, f64);

    impl FittedModel<f64> for Centers {
        fn within_cluster_cost(&self) -> f64 {
            self.1
        }

        fn centroids(&self) -> ArrayView2<f64> {
            self.0.view()
        }
    }

    #[test]
    fn total_variance_of_known_points() {
        // mean is (1, 2)
        let observations = array![[0., 0.], [2., 4.], [1., 2.]];
        let total = total_variance(&observations).unwrap();
        assert_abs_diff_eq!(total, 1. + 4. + 1. + 4.);
    }

    #[test]
    fn constant_dataset_has_no_variance() {
        let observations = Array2::from_elem((10, 3), 4.2f32);
        assert_abs_diff_eq!(total_variance(&observations).unwrap(), 0.);
    }

    #[test]
    fn empty_dataset_is_a_shape_error() {
        let observations = Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            total_variance(&observations),
            Err(Error::DataShape(_))
        ));
        let observations = Array2::<f64>::zeros((5, 0));
        assert!(matches!(
            total_variance(&observations),
            Err(Error::DataShape(_))
        ));
    }

    #[test]
    fn within_variance_checks_dimensions() {
        let observations = array![[0., 0.], [2., 4.]];
        let model = Centers(array![[1., 2., 3.]], 1.0);
        assert!(matches!(
            within_variance(&observations, &model),
            Err(Error::DataShape(_))
        ));

        let model = Centers(array![[1., 2.]], 10.0);
        assert_abs_diff_eq!(within_variance(&observations, &model).unwrap(), 10.0);

        let model = Centers(array![[1., 2.]], f64::NAN);
        assert!(within_variance(&observations, &model).is_err());
    }

    #[test]
    fn explained_variance_is_clamped() {
        assert_abs_diff_eq!(explained_variance(500., 50.), 450.);
        assert_abs_diff_eq!(explained_variance(500., 500.0000001), 0.);
    }

    #[test]
    fn information_criterion_penalties() {
        let n = 1000;
        let base = 1000. * (50f64 / 1000.).ln();
        let ln_n = (1000f64).ln();
        assert_abs_diff_eq!(
            information_criterion(50., n, 5, 10, BicPenalty::KTimesP),
            base + 50. * ln_n,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            information_criterion(50., n, 5, 10, BicPenalty::K),
            base + 10. * ln_n,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            information_criterion(50., n, 5, 10, BicPenalty::KTimesPPlusOne),
            base + 60. * ln_n,
            epsilon = 1e-9
        );
        // the baseline carries no complexity
        assert_abs_diff_eq!(
            information_criterion(500., n, 5, 0, BicPenalty::KTimesP),
            1000. * (0.5f64).ln(),
            epsilon = 1e-9
        );
    }
}
