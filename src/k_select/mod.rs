//! Selection of the number of clusters
//!
//! A [`KSelect`] search probes candidate cluster counts with a bisection over `[2, k_max]`,
//! reusing every fit already in its [`FitProfile`](crate::FitProfile) or on disk, until the
//! gain in explained variance between consecutive probes settles around a threshold.
mod algorithm;
mod errors;
mod hyperparams;
mod window;

pub use algorithm::*;
pub use errors::*;
pub use hyperparams::*;
pub use window::*;
