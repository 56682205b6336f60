use thiserror::Error;

/// An error when fitting with an invalid hyperparameter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KMeansParamsError {
    #[error("n_runs cannot be 0")]
    NRuns,
    #[error("tolerance must be greater than 0")]
    Tolerance,
    #[error("max_n_iterations cannot be 0")]
    MaxIterations,
}

/// An error when fitting a partitioning with K-means
#[derive(Error, Debug)]
pub enum KMeansError {
    /// When any of the hyperparameters are set the wrong value
    #[error("Invalid hyperparameter: {0}")]
    InvalidParams(#[from] KMeansParamsError),
    /// When the dataset has no observations or no features
    #[error("Fitting failed: the dataset is empty")]
    EmptyData,
    /// When there are not enough observations to seed every cluster
    #[error("Fitting failed: cannot find {k} clusters among {n_samples} observations")]
    NClusters { k: usize, n_samples: usize },
    /// When no run of the algorithm converges
    #[error("Fitting failed: Did not converge. Try different init parameters or check for degenerate data.")]
    NotConverged,
}
