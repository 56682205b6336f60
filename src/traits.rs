//! Interfaces of the collaborators consumed by the search
//!
//! The search never clusters anything itself. It hands a dataset and a number of clusters to a
//! [`ClusterFitter`] and only reads the statistics of the returned [`FittedModel`].

use ndarray::{Array1, ArrayBase, ArrayView2, Data, Ix2};

use crate::Float;

/// Fits a partitioning of a dataset into a given number of clusters.
///
/// Implementations may distribute a single fit over many workers, the search only performs
/// blocking calls to `fit` and never asks for two fits at once.
pub trait ClusterFitter<F: Float> {
    type Model: FittedModel<F>;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Partitions `observations`, with shape `(n_observations, n_features)`, into `k` clusters.
    ///
    /// `seed` is fixed for a whole search so that partitions are reproducible.
    fn fit(
        &self,
        observations: ArrayView2<F>,
        k: usize,
        seed: u64,
    ) -> Result<Self::Model, Self::Error>;
}

/// The result of a single fit
pub trait FittedModel<F: Float> {
    /// Sum of squared distances of the training observations to their assigned cluster center
    fn within_cluster_cost(&self) -> F;

    /// Cluster centers with shape `(n_clusters, n_features)`
    fn centroids(&self) -> ArrayView2<F>;
}

/// Assigns observations to the clusters of a fitted model
pub trait Transformable<F: Float> {
    /// Returns, for each row of `observations`, the index of its cluster
    fn transform<D: Data<Elem = F>>(&self, observations: &ArrayBase<D, Ix2>) -> Array1<usize>;
}
