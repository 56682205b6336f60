//! linfa-kselect prelude.
//!
//! This module contains the most used types, type aliases, traits and
//! functions that you can import easily as a group.
//!

#[doc(no_inline)]
pub use crate::error::{Error, Result};

#[doc(no_inline)]
pub use crate::traits::*;

#[doc(no_inline)]
pub use crate::{ClusterFitRecord, FitProfile, FitStore, Float, ParamGuard, Persistable};

#[doc(no_inline)]
pub use crate::{KMeans, KSelect, KSelection, SearchStatus};
