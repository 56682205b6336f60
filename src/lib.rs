//! `linfa-kselect` answers a question that comes before fitting a partitioning: *how many
//! clusters explain the variance of a dataset well enough?*
//!
//! Every candidate number of clusters K costs a full fit, so the crate
//!
//! * evaluates candidates with a bisection over `[2, k_max]` instead of a scan
//!   ([`KSelect`], [`SearchWindow`]);
//! * memoizes the statistics of every evaluated K in a [`FitProfile`] of [`ClusterFitRecord`]s
//!   (within, explained and total variance, information criterion);
//! * persists every fit and the profile as tab-separated files through a [`FitStore`], so that
//!   an interrupted search resumes without fitting any K twice.
//!
//! The clustering itself is delegated to a [`ClusterFitter`](traits::ClusterFitter). A seeded
//! [`KMeans`] is bundled.
//!
//! ```
//! use linfa_kselect::{generate_blobs, KMeans, KSelect, ParamGuard, SearchStatus};
//! use ndarray::array;
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256Plus;
//!
//! let mut rng = Xoshiro256Plus::seed_from_u64(42);
//! let centroids = array![[0., 0.], [30., 30.], [-30., 30.], [30., -30.]];
//! let observations = generate_blobs(50, &centroids, &mut rng);
//!
//! let selection = KSelect::params(12)
//!     .threshold(0.05)
//!     .check()
//!     .unwrap()
//!     .search(&KMeans::params(), &observations, None)
//!     .unwrap();
//!
//! assert_ne!(selection.status(), SearchStatus::Enumerated);
//! assert!(selection.k().unwrap() >= 2);
//! ```

pub mod benchmarks;
pub mod error;
mod float;
pub mod k_means;
pub mod k_select;
mod param_guard;
pub mod persistence;
pub mod prelude;
mod profile;
mod record;
pub mod traits;
mod utils;
pub mod variance;

pub use error::{Error, Result};
pub use float::Float;
pub use k_means::*;
pub use k_select::*;
pub use param_guard::ParamGuard;
pub use persistence::{FitStore, Persistable};
pub use profile::{FitProfile, SearchStep};
pub use record::ClusterFitRecord;
pub use utils::generate_blobs;
pub use variance::BicPenalty;
