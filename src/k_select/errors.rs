use thiserror::Error;

/// An error when searching with an invalid hyperparameter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KSelectParamsError {
    #[error("k_max must be at least 2")]
    KMax,
    #[error("threshold must be a positive finite number")]
    Threshold,
    #[error("max_iter cannot be 0")]
    MaxIter,
    #[error("the set of candidate cluster counts is empty")]
    EmptyClusterSet,
    #[error("candidate cluster counts must be greater than 0")]
    ZeroClusters,
}
