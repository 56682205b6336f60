use std::path::Path;

use ndarray::{Array1, Array2, ArrayBase, ArrayView2, Data, DataMut, Ix1, Ix2, Zip};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use tracing::debug;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::k_means::{KMeansError, KMeansParams, KMeansValidParams};
use crate::persistence::{with_suffix, write_cluster_centers, write_cluster_sizes, Persistable};
use crate::traits::{ClusterFitter, FittedModel, Transformable};
use crate::{Float, ParamGuard, Result};

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// K-means clustering aims to partition a set of unlabeled observations into clusters,
/// where each observation belongs to the cluster with the nearest mean.
///
/// The mean of the points within a cluster is called *centroid*.
///
/// This is the fitting collaborator shipped with the crate. It runs the standard algorithm
/// (also known as Lloyd's Algorithm) `n_runs` times from different initial centroids and keeps
/// the run with the lowest inertia:
/// - initialisation step: select initial centroids using one of the [`KMeansInit`](crate::KMeansInit) strategies;
/// - assignment step: assign each observation to the nearest cluster
///                    (minimum squared euclidean distance to the cluster's centroid);
/// - update step: recompute the centroid of each cluster. A cluster left without observations
///                keeps its previous centroid.
///
/// Assignment and update are repeated until the squared distance between the old and the new
/// centroids is below `tolerance` or `max_n_iterations` is reached.
///
/// ```
/// use linfa_kselect::traits::{ClusterFitter, FittedModel, Transformable};
/// use linfa_kselect::{generate_blobs, KMeans, ParamGuard};
/// use ndarray::array;
/// use rand::SeedableRng;
/// use rand_xoshiro::Xoshiro256Plus;
///
/// let mut rng = Xoshiro256Plus::seed_from_u64(42);
/// let expected_centroids = array![[0., 1.], [-10., 20.], [-1., 10.]];
/// let data = generate_blobs(100, &expected_centroids, &mut rng);
///
/// let fitter = KMeans::params().tolerance(1e-2).check().unwrap();
/// let model = fitter.fit(data.view(), 3, 23).expect("KMeans fitted");
///
/// assert_eq!(model.centroids().nrows(), 3);
/// assert_eq!(model.cluster_sizes().sum(), 300);
/// let labels = model.transform(&array![[-9., 20.5]]);
/// assert_eq!(labels.len(), 1);
/// ```
pub struct KMeans<F: Float> {
    centroids: Array2<F>,
    cluster_sizes: Array1<usize>,
    inertia: F,
}

impl<F: Float> KMeans<F> {
    pub fn params() -> KMeansParams<F> {
        KMeansParams::new()
    }

    /// A model known only by its centroids, e.g. read back from a cluster center artifact.
    /// Its cluster sizes and inertia are zero.
    pub fn from_centroids(centroids: Array2<F>) -> Self {
        let n_clusters = centroids.nrows();
        KMeans {
            centroids,
            cluster_sizes: Array1::zeros(n_clusters),
            inertia: F::zero(),
        }
    }

    /// Return the set of centroids as a 2-dimensional matrix with shape
    /// `(n_centroids, n_features)`.
    pub fn centroids(&self) -> &Array2<F> {
        &self.centroids
    }

    /// Return the number of training points belonging to each cluster
    pub fn cluster_sizes(&self) -> &Array1<usize> {
        &self.cluster_sizes
    }

    /// Return the sum of squared distances between each training point and its closest
    /// centroid.
    pub fn inertia(&self) -> F {
        self.inertia
    }
}

impl<F: Float> FittedModel<F> for KMeans<F> {
    fn within_cluster_cost(&self) -> F {
        self.inertia
    }

    fn centroids(&self) -> ArrayView2<F> {
        self.centroids.view()
    }
}

impl<F: Float> Transformable<F> for KMeans<F> {
    /// Given an input matrix `observations`, with shape `(n_observations, n_features)`,
    /// `transform` returns, for each observation, the index of the closest cluster/centroid.
    fn transform<D: Data<Elem = F>>(&self, observations: &ArrayBase<D, Ix2>) -> Array1<usize> {
        let mut memberships = Array1::zeros(observations.nrows());
        update_cluster_memberships(&self.centroids, observations, &mut memberships);
        memberships
    }
}

impl<F: Float> Persistable for KMeans<F> {
    /// Writes `<base>_cluster_centers.tsv` and `<base>_cluster_sizes.tsv`
    fn persist(&self, base: &Path) -> Result<()> {
        write_cluster_centers(&with_suffix(base, "_cluster_centers.tsv"), &self.centroids)?;
        write_cluster_sizes(
            &with_suffix(base, "_cluster_sizes.tsv"),
            self.cluster_sizes.iter().copied(),
        )
    }
}

impl<F: Float> ClusterFitter<F> for KMeansValidParams<F> {
    type Model = KMeans<F>;
    type Error = KMeansError;

    /// Given an input matrix `observations`, with shape `(n_observations, n_features)`,
    /// `fit` identifies `k` centroids based on the training data distribution.
    fn fit(
        &self,
        observations: ArrayView2<F>,
        k: usize,
        seed: u64,
    ) -> std::result::Result<KMeans<F>, KMeansError> {
        let (n_samples, n_features) = observations.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(KMeansError::EmptyData);
        }
        if k == 0 || k > n_samples {
            return Err(KMeansError::NClusters { k, n_samples });
        }

        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let mut memberships: Array1<usize> = Array1::zeros(n_samples);
        let mut dists: Array1<F> = Array1::zeros(n_samples);
        let mut best: Option<(F, Array2<F>)> = None;

        for run in 0..self.n_runs() {
            let mut centroids = self.init_method().run(k, &observations, &mut rng);
            let mut converged = false;
            for n_iter in 0..self.max_n_iterations() {
                update_cluster_memberships(&centroids, &observations, &mut memberships);
                let new_centroids = compute_centroids(&centroids, &observations, &memberships);
                let shift = squared_distance(&centroids, &new_centroids);
                centroids = new_centroids;
                if shift < self.tolerance() {
                    debug!(k, run, n_iter, "k-means run converged");
                    converged = true;
                    break;
                }
            }
            if !converged {
                debug!(k, run, "k-means run did not converge");
                continue;
            }

            // We keep the centroids which minimize the inertia (defined as the sum of
            // the squared distances of the closest centroid for all observations)
            // over the n runs of the KMeans algorithm.
            update_min_dists(&centroids, &observations, &mut dists);
            let inertia = dists.sum();
            if best.as_ref().map_or(true, |(min_inertia, _)| inertia < *min_inertia) {
                best = Some((inertia, centroids));
            }
        }

        let (inertia, centroids) = best.ok_or(KMeansError::NotConverged)?;
        update_cluster_memberships(&centroids, &observations, &mut memberships);
        let mut cluster_sizes: Array1<usize> = Array1::zeros(k);
        memberships.iter().for_each(|&c| cluster_sizes[c] += 1);

        Ok(KMeans {
            centroids,
            cluster_sizes,
            inertia,
        })
    }
}

impl<F: Float> ClusterFitter<F> for KMeansParams<F> {
    type Model = KMeans<F>;
    type Error = KMeansError;

    /// Checks the hyperparameters, then fits with the checked ones
    fn fit(
        &self,
        observations: ArrayView2<F>,
        k: usize,
        seed: u64,
    ) -> std::result::Result<KMeans<F>, KMeansError> {
        self.check_ref()?.fit(observations, k, seed)
    }
}

/// `compute_centroids` returns a 2-dimensional array,
/// where the i-th row corresponds to the mean of the observations of the i-th cluster.
fn compute_centroids<F: Float>(
    old_centroids: &Array2<F>,
    // (n_observations, n_features)
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    // (n_observations,)
    cluster_memberships: &ArrayBase<impl Data<Elem = usize>, Ix1>,
) -> Array2<F> {
    let n_clusters = old_centroids.nrows();
    let mut counts = vec![0usize; n_clusters];
    let mut centroids = Array2::zeros((n_clusters, observations.ncols()));

    Zip::from(observations.rows())
        .and(cluster_memberships)
        .for_each(|observation, &cluster_membership| {
            let mut centroid = centroids.row_mut(cluster_membership);
            centroid += &observation;
            counts[cluster_membership] += 1;
        });

    for ((mut centroid, old_centroid), &cnt) in centroids
        .rows_mut()
        .into_iter()
        .zip(old_centroids.rows())
        .zip(&counts)
    {
        if cnt == 0 {
            centroid.assign(&old_centroid);
        } else {
            centroid /= F::cast(cnt);
        }
    }
    centroids
}

fn squared_distance<F: Float>(
    a: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> F {
    Zip::from(a)
        .and(b)
        .fold(F::zero(), |acc, &x, &y| acc + (x - y) * (x - y))
}

// Update `cluster_memberships` with the index of the cluster each observation belongs to.
pub(crate) fn update_cluster_memberships<F: Float>(
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    cluster_memberships: &mut ArrayBase<impl DataMut<Elem = usize>, Ix1>,
) {
    Zip::from(observations.rows())
        .and(cluster_memberships)
        .for_each(|observation, cluster_membership| {
            *cluster_membership = closest_centroid(centroids, &observation).0
        });
}

// Updates `dists` with the squared distance of each observation from its closest centroid.
pub(crate) fn update_min_dists<F: Float>(
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    dists: &mut ArrayBase<impl DataMut<Elem = F>, Ix1>,
) {
    Zip::from(observations.rows())
        .and(dists)
        .for_each(|observation, dist| *dist = closest_centroid(centroids, &observation).1);
}

/// Given a matrix of centroids with shape (n_centroids, n_features) and an observation,
/// return the index of the closest centroid (the index of the corresponding row in `centroids`)
/// and the squared distance to it.
pub(crate) fn closest_centroid<F: Float>(
    // (n_centroids, n_features)
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    // (n_features)
    observation: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> (usize, F) {
    let mut closest_index = 0;
    let mut minimum_distance = F::infinity();

    for (centroid_index, centroid) in centroids.rows().into_iter().enumerate() {
        let distance = Zip::from(&centroid)
            .and(observation)
            .fold(F::zero(), |acc, &c, &x| acc + (c - x) * (c - x));
        if distance < minimum_distance {
            closest_index = centroid_index;
            minimum_distance = distance;
        }
    }
    (closest_index, minimum_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_blobs;
    use crate::k_means::KMeansInit;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, concatenate, Array, Axis};
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    macro_rules! calc_inertia {
        ($centroids:expr, $obs:expr, $memberships:expr) => {
            $obs.rows()
                .into_iter()
                .zip($memberships.iter())
                .map(|(row, &c)| {
                    let diff = &row - &$centroids.row(c);
                    diff.mapv(|x| x * x).sum()
                })
                .sum::<f64>()
        };
    }

    #[test]
    fn test_min_dists() {
        let centroids = array![[0.0, 1.0], [40.0, 10.0]];
        let observations = array![[3.0, 4.0], [1.0, 3.0], [25.0, 15.0]];
        let mut dists = Array1::zeros(observations.nrows());

        update_min_dists(&centroids, &observations, &mut dists);
        assert_abs_diff_eq!(dists, array![18.0, 5.0, 250.0]);
    }

    #[test]
    fn inertia_is_the_within_cluster_cost() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let expected_centroids = array![[0., 1.], [-10., 20.], [-1., 10.]];
        let data = generate_blobs(50, &expected_centroids, &mut rng);

        for init in &[KMeansInit::Random, KMeansInit::KMeansPlusPlus] {
            let model = KMeans::params()
                .init_method(*init)
                .check_unwrap()
                .fit(data.view(), 3, 11)
                .expect("KMeans fitted");
            let memberships = model.transform(&data);
            let inertia = calc_inertia!(model.centroids(), data, memberships);
            assert_abs_diff_eq!(inertia, model.within_cluster_cost(), epsilon = 1e-8);
            assert_eq!(model.cluster_sizes().sum(), 150);
        }
    }

    #[test]
    fn same_seed_same_partition() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let data: Array2<f64> = Array::random_using((60, 4), Uniform::new(-5., 5.), &mut rng);
        let fitter = KMeans::params().n_runs(3).check_unwrap();
        let a = fitter.fit(data.view(), 4, 23).unwrap();
        let b = fitter.fit(data.view(), 4, 23).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn more_clusters_never_increase_the_cost() {
        let mut rng = Xoshiro256Plus::seed_from_u64(5);
        let cluster_1: Array2<f64> = Array::random_using((40, 2), Uniform::new(0., 1.), &mut rng);
        let cluster_2: Array2<f64> =
            Array::random_using((40, 2), Uniform::new(20., 21.), &mut rng);
        let data = concatenate(Axis(0), &[cluster_1.view(), cluster_2.view()]).unwrap();

        let fitter = KMeans::params().check_unwrap();
        let one = fitter.fit(data.view(), 1, 23).unwrap();
        let two = fitter.fit(data.view(), 2, 23).unwrap();
        assert!(two.within_cluster_cost() < one.within_cluster_cost());
        assert_eq!(two.cluster_sizes().to_vec().iter().sum::<usize>(), 80);
    }

    #[test]
    fn compute_centroids_works() {
        let observations = array![[0., 0.], [2., 2.], [10., 10.]];
        let memberships = array![0, 0, 1];
        let old_centroids = array![[1., 1.], [9., 9.], [5., 5.]];
        let centroids = compute_centroids(&old_centroids, &observations, &memberships);
        // the empty third cluster keeps its centroid
        assert_abs_diff_eq!(centroids, array![[1., 1.], [10., 10.], [5., 5.]]);
    }

    #[test]
    // An observation is closest to itself.
    fn nothing_is_closer_than_self() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let centroids: Array2<f64> =
            Array::random_using((20, 5), Uniform::new(-100., 100.), &mut rng);
        let mut memberships = Array1::zeros(20);
        update_cluster_memberships(&centroids, &centroids, &mut memberships);
        assert_eq!(memberships, (0..20).collect::<Array1<usize>>());
    }

    #[test]
    fn invalid_number_of_clusters() {
        let data = array![[0., 0.], [1., 1.]];
        let fitter = KMeans::params();
        assert!(matches!(
            fitter.fit(data.view(), 3, 0),
            Err(KMeansError::NClusters { k: 3, n_samples: 2 })
        ));
        assert!(matches!(
            fitter.fit(data.view(), 0, 0),
            Err(KMeansError::NClusters { k: 0, .. })
        ));
        assert!(matches!(
            KMeans::params().n_runs(0).fit(data.view(), 1, 0),
            Err(KMeansError::InvalidParams(_))
        ));
    }

    #[test]
    fn persisted_centers_reload() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("fit-K2");
        let model = KMeans {
            centroids: array![[0., 0.5], [10., 10.5]],
            cluster_sizes: array![3, 4],
            inertia: 1.5,
        };
        model.persist(&base).unwrap();

        let centers_file = with_suffix(&base, "_cluster_centers.tsv");
        let centers = crate::persistence::read_cluster_centers::<f64>(&centers_file).unwrap();
        let reloaded = KMeans::from_centroids(centers);
        assert_eq!(reloaded.centroids(), model.centroids());
        assert_eq!(reloaded.transform(&array![[9., 9.], [1., 1.]]), array![1, 0]);
        let sizes = std::fs::read_to_string(with_suffix(&base, "_cluster_sizes.tsv")).unwrap();
        assert_eq!(sizes, "3\n4\n");
    }
}
