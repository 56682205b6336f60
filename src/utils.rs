use ndarray::{s, Array, Array2, ArrayBase, Data, Ix2};
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;

use crate::Float;

/// Samples `blob_size` observations around each row of `blob_centroids`, with shape
/// `(n_blobs, n_features)`, from a normal distribution with unit variance.
///
/// Observations are laid out blob after blob: rows `i * blob_size..(i + 1) * blob_size` belong
/// to the `i`-th centroid. The result is a best-case dataset for a search over the number of
/// clusters, whose explained variance saturates at `n_blobs`.
pub fn generate_blobs<F: Float>(
    blob_size: usize,
    blob_centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    rng: &mut impl Rng,
) -> Array2<F> {
    let (n_blobs, n_features) = blob_centroids.dim();
    let noise: Array2<f64> =
        Array::random_using((n_blobs * blob_size, n_features), StandardNormal, rng);
    let mut blobs = noise.mapv(F::cast);

    for (blob_index, centroid) in blob_centroids.rows().into_iter().enumerate() {
        let mut blob = blobs.slice_mut(s![blob_index * blob_size..(blob_index + 1) * blob_size, ..]);
        blob += &centroid;
    }
    blobs
}
