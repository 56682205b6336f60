#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::{KSelectParamsError, Rounding};
use crate::variance::BicPenalty;
use crate::{Float, ParamGuard};

/// Which numbers of clusters a search evaluates
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Bisection over `[2, k_max]` driven by the loss threshold
    Adaptive { k_max: usize },
    /// Every K of the set, in order, without any stopping rule
    Fixed(Vec<usize>),
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// The set of checked hyperparameters of a [search over the number of clusters](KSelect).
pub struct KSelectValidParams<F: Float> {
    mode: SearchMode,
    /// Relative change in explained variance between two probes below which fewer clusters are
    /// tried.
    threshold: F,
    /// Budget on the number of probes of an adaptive search.
    max_iter: usize,
    /// Handed to every fit so that partitions are reproducible.
    seed: u64,
    rounding: Rounding,
    bic_penalty: BicPenalty,
}

#[derive(Clone, Debug, PartialEq)]
/// A helper struct used to construct a set of [valid hyperparameters](KSelectValidParams) for
/// a [search over the number of clusters](KSelect) (using the builder pattern).
pub struct KSelectParams<F: Float>(KSelectValidParams<F>);

/// Selection of the number of clusters of a dataset.
///
/// `KSelect` only hands out hyperparameters; the search itself is
/// [`KSelectValidParams::search`].
///
/// ```
/// use linfa_kselect::{KSelect, ParamGuard, SearchMode};
///
/// let params = KSelect::params::<f64>(20).threshold(0.05).check().unwrap();
/// assert_eq!(params.mode(), &SearchMode::Adaptive { k_max: 20 });
/// assert_eq!(params.max_iter(), 25);
///
/// assert!(KSelect::fixed::<f64>(vec![]).check().is_err());
/// ```
pub struct KSelect;

impl KSelect {
    /// Configures an adaptive search over `[2, k_max]`.
    ///
    /// Defaults are provided if the optional parameters are not specified:
    /// * `threshold = 0.01`
    /// * `max_iter = 25`
    /// * `seed = 23`
    /// * `rounding = Floor`
    /// * `bic_penalty = KTimesP`
    pub fn params<F: Float>(k_max: usize) -> KSelectParams<F> {
        KSelectParams::new(SearchMode::Adaptive { k_max })
    }

    /// Configures the evaluation of every K in `ks`, without bisection.
    pub fn fixed<F: Float>(ks: Vec<usize>) -> KSelectParams<F> {
        KSelectParams::new(SearchMode::Fixed(ks))
    }
}

impl<F: Float> KSelectParams<F> {
    pub fn new(mode: SearchMode) -> Self {
        Self(KSelectValidParams {
            mode,
            threshold: F::cast(0.01),
            max_iter: 25,
            seed: 23,
            rounding: Rounding::default(),
            bic_penalty: BicPenalty::default(),
        })
    }

    /// Change the value of `threshold`
    pub fn threshold(mut self, threshold: F) -> Self {
        self.0.threshold = threshold;
        self
    }

    /// Change the value of `max_iter`
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.0.max_iter = max_iter;
        self
    }

    /// Change the value of `seed`
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }

    /// Change the tie-break used when halving the search window
    pub fn rounding(mut self, rounding: Rounding) -> Self {
        self.0.rounding = rounding;
        self
    }

    /// Change the complexity penalty of the information criterion
    pub fn bic_penalty(mut self, bic_penalty: BicPenalty) -> Self {
        self.0.bic_penalty = bic_penalty;
        self
    }
}

impl<F: Float> ParamGuard for KSelectParams<F> {
    type Checked = KSelectValidParams<F>;
    type Error = KSelectParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        match &self.0.mode {
            SearchMode::Adaptive { k_max } if *k_max < 2 => return Err(KSelectParamsError::KMax),
            SearchMode::Fixed(ks) if ks.is_empty() => {
                return Err(KSelectParamsError::EmptyClusterSet)
            }
            SearchMode::Fixed(ks) if ks.contains(&0) => {
                return Err(KSelectParamsError::ZeroClusters)
            }
            _ => {}
        }

        if !(self.0.threshold > F::zero()) || !self.0.threshold.is_finite() {
            Err(KSelectParamsError::Threshold)
        } else if self.0.max_iter == 0 {
            Err(KSelectParamsError::MaxIter)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float> KSelectValidParams<F> {
    pub fn mode(&self) -> &SearchMode {
        &self.mode
    }

    /// The largest K a search may evaluate
    pub fn k_max(&self) -> usize {
        match &self.mode {
            SearchMode::Adaptive { k_max } => *k_max,
            SearchMode::Fixed(ks) => ks.iter().copied().max().unwrap_or(0),
        }
    }

    pub fn threshold(&self) -> F {
        self.threshold
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rounding(&self) -> Rounding {
        self.rounding
    }

    pub fn bic_penalty(&self) -> BicPenalty {
        self.bic_penalty
    }
}
