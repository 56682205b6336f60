#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::Float;

/// Direction in which the midpoint of two bounds is rounded when their sum is odd.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Rounding {
    /// Prefer fewer clusters
    #[default]
    Floor,
    /// Prefer more clusters
    Ceil,
}

impl Rounding {
    pub(crate) fn midpoint(&self, a: usize, b: usize) -> usize {
        match self {
            Rounding::Floor => (a + b) / 2,
            Rounding::Ceil => (a + b + 1) / 2,
        }
    }
}

/// The bisection state `(left, mid, right)` of a search.
///
/// `mid` is the number of clusters probed next. `left` is the largest K known to need more
/// clusters, `right` is an exclusive upper bound and may exceed the largest K by one. The window
/// is plain data: it is copied from one step to the next and never persisted, a resumed search
/// starts from [`SearchWindow::new`] and replays its steps from the cache of evaluated K's.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SearchWindow {
    pub left: usize,
    pub mid: usize,
    pub right: usize,
}

impl SearchWindow {
    /// The initial window `(2, k_max, k_max)`: the first probe is the largest partitioning.
    pub fn new(k_max: usize) -> Self {
        SearchWindow {
            left: 2.min(k_max),
            mid: k_max,
            right: k_max,
        }
    }

    /// A degenerate window around a single K, used when the candidate set is enumerated.
    pub fn fixed(k: usize) -> Self {
        SearchWindow {
            left: k,
            mid: k,
            right: k,
        }
    }

    /// The pair compared to detect a fixed point of the search.
    pub fn bounds(&self) -> (usize, usize) {
        (self.left, self.right)
    }

    /// Applies the stopping rule to the loss observed at `mid`.
    ///
    /// A loss below `threshold` means the clusters in play add too little explained variance,
    /// so the search checks whether fewer clusters suffice. A loss above it moves towards more
    /// clusters. A loss equal to the threshold, or NaN, leaves the window as it is.
    pub fn narrow<F: Float>(&self, loss: F, threshold: F, k_max: usize, rounding: Rounding) -> Self {
        if loss < threshold {
            SearchWindow {
                left: self.left,
                mid: rounding.midpoint(self.left, self.mid).min(k_max),
                right: self.mid + 1,
            }
        } else if loss > threshold {
            SearchWindow {
                left: self.mid,
                mid: rounding.midpoint(self.right, self.mid).min(k_max),
                right: self.right,
            }
        } else {
            *self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_window_probes_k_max() {
        assert_eq!(
            SearchWindow::new(10),
            SearchWindow {
                left: 2,
                mid: 10,
                right: 10
            }
        );
    }

    #[test]
    fn small_loss_moves_towards_fewer_clusters() {
        let window = SearchWindow::new(10).narrow(0.0, 0.01, 10, Rounding::Floor);
        assert_eq!(
            window,
            SearchWindow {
                left: 2,
                mid: 6,
                right: 11
            }
        );
    }

    #[test]
    fn large_loss_moves_towards_more_clusters() {
        let window = SearchWindow {
            left: 2,
            mid: 4,
            right: 7,
        };
        let next = window.narrow(0.5, 0.01, 10, Rounding::Floor);
        assert_eq!(
            next,
            SearchWindow {
                left: 4,
                mid: 5,
                right: 7
            }
        );
    }

    #[test]
    fn midpoint_never_exceeds_k_max() {
        let window = SearchWindow {
            left: 9,
            mid: 10,
            right: 11,
        };
        let next = window.narrow(1.0, 0.01, 10, Rounding::Ceil);
        assert_eq!(next.mid, 10);
        assert_eq!(next.left, 10);
    }

    #[test]
    fn rounding_is_a_tie_break() {
        let window = SearchWindow {
            left: 4,
            mid: 4,
            right: 7,
        };
        assert_eq!(window.narrow(1.0, 0.01, 10, Rounding::Floor).mid, 5);
        assert_eq!(window.narrow(1.0, 0.01, 10, Rounding::Ceil).mid, 6);
        assert_eq!(window.narrow(0.0, 0.01, 10, Rounding::Floor).mid, 4);
    }

    #[test]
    fn loss_at_threshold_is_a_fixed_point() {
        let window = SearchWindow {
            left: 3,
            mid: 5,
            right: 8,
        };
        assert_eq!(window.narrow(0.01, 0.01, 10, Rounding::Floor), window);
        assert_eq!(window.narrow(f64::NAN, 0.01, 10, Rounding::Floor), window);
    }
}
