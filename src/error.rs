//! Error types in linfa-kselect
//!

use std::path::PathBuf;

use thiserror::Error;

use crate::k_select::KSelectParamsError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Empty datasets, zero-dimensional features or observations that do not match a model
    #[error("invalid data shape: {0}")]
    DataShape(String),
    /// The fitting collaborator failed for one specific number of clusters
    #[error("fitting failed for K={k}: {source}")]
    FitFailure {
        k: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A ledger row that could not be parsed. Loaders skip such rows, it is never fatal.
    #[error("corrupt ledger row at line {line} of {path:?}: {reason}")]
    LedgerCorruption {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    #[error("no fit has been evaluated for K={0}")]
    NotFound(usize),
    #[error("ledger {0:?} has no rows")]
    EmptyLedger(PathBuf),
    #[error("invalid hyperparameter: {0}")]
    InvalidParams(#[from] KSelectParamsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// A pattern of precomputed statistics files that is not a valid glob
    #[error("invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}
