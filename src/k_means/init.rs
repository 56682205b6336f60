use ndarray::{s, Array2, ArrayView2, Axis};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::algorithm::closest_centroid;
use crate::Float;

/// Specifies centroid initialization algorithm for KMeans.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KMeansInit {
    /// Pick random points as centroids.
    Random,
    /// K-means++ algorithm. Using this over random initialization causes K-means to converge
    /// faster for almost all cases, since K-means++ produces better centroids.
    #[default]
    KMeansPlusPlus,
}

impl KMeansInit {
    /// Runs the chosen initialization routine
    pub(crate) fn run<F: Float>(
        &self,
        n_clusters: usize,
        observations: &ArrayView2<F>,
        rng: &mut impl Rng,
    ) -> Array2<F> {
        match self {
            Self::Random => random_init(n_clusters, observations, rng),
            Self::KMeansPlusPlus => k_means_plusplus(n_clusters, observations, rng),
        }
    }
}

/// Pick random points from the input matrix as centroids
fn random_init<F: Float>(
    n_clusters: usize,
    observations: &ArrayView2<F>,
    rng: &mut impl Rng,
) -> Array2<F> {
    let (n_samples, _) = observations.dim();
    let indices = rand::seq::index::sample(rng, n_samples, n_clusters).into_vec();
    observations.select(Axis(0), &indices)
}

/// Selects centroids using the KMeans++ initialization algorithm. The weights determine the
/// likeliness of an input point to be selected as a centroid relative to other points. The higher
/// the weight, the more likely the point will be selected as a centroid.
fn k_means_plusplus<F: Float>(
    n_clusters: usize,
    observations: &ArrayView2<F>,
    rng: &mut impl Rng,
) -> Array2<F> {
    let (n_samples, n_features) = observations.dim();
    let mut centroids = Array2::zeros((n_clusters, n_features));
    // Select 1st centroid from the input points uniformly
    let first = rng.gen_range(0..n_samples);
    centroids.row_mut(0).assign(&observations.row(first));

    for c_cnt in 1..n_clusters {
        let chosen = centroids.slice(s![0..c_cnt, ..]);
        let weights: Vec<f64> = observations
            .rows()
            .into_iter()
            .map(|observation| {
                closest_centroid(&chosen, &observation)
                    .1
                    .to_f64()
                    .unwrap_or(0.)
            })
            .collect();
        // all points coincide with a centroid already, any of them will do
        let centroid_idx = match WeightedIndex::new(&weights) {
            Ok(weighted) => weighted.sample(rng),
            Err(_) => rng.gen_range(0..n_samples),
        };
        centroids
            .row_mut(c_cnt)
            .assign(&observations.row(centroid_idx));
    }
    centroids
}
