use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::k_select::SearchWindow;
use crate::persistence::load_ledger;
use crate::record::ClusterFitRecord;
use crate::Float;

/// One probe of a search: the window it was taken in and the loss it produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchStep<F: Float> {
    pub window: SearchWindow,
    pub k: usize,
    pub loss: F,
}

/// The memoized history of every number of clusters evaluated for one dataset.
///
/// Records are keyed by K; the baseline `K = 0` is inserted on construction, before any search
/// step. Every record of a profile shares the same total variance. Besides the cache, the
/// profile keeps the ordered steps of the current search: the loss after an insertion is the
/// change in explained variance between the probed K and the previously probed K, relative to
/// the total variance.
#[derive(Clone, Debug, PartialEq)]
pub struct FitProfile<F: Float> {
    k_max: usize,
    total_variance: F,
    records: BTreeMap<usize, ClusterFitRecord<F>>,
    steps: Vec<SearchStep<F>>,
    loss: F,
}

impl<F: Float> FitProfile<F> {
    /// Creates a profile seeded with the `K = 0` baseline record.
    pub fn new(k_max: usize, baseline: ClusterFitRecord<F>) -> Result<Self> {
        if baseline.k() != 0 {
            return Err(Error::DataShape(format!(
                "a profile must be seeded with the K=0 baseline, got K={}",
                baseline.k()
            )));
        }
        let mut profile = FitProfile {
            k_max,
            total_variance: baseline.total_variance(),
            records: BTreeMap::new(),
            steps: Vec::new(),
            loss: F::infinity(),
        };
        profile.add(baseline, SearchWindow::fixed(0))?;
        Ok(profile)
    }

    /// Rebuilds the cache of a profile from a ledger.
    ///
    /// Later rows win over earlier rows of the same K. The search steps are not restored, a
    /// resumed search replays them from the cache.
    pub fn from_ledger(ledger: impl AsRef<Path>, k_max: usize) -> Result<Self> {
        let ledger = ledger.as_ref();
        let mut records: BTreeMap<usize, ClusterFitRecord<F>> = load_ledger(ledger)?
            .into_iter()
            .map(|record| (record.k(), record))
            .collect();

        let baseline = match records.remove(&0) {
            Some(baseline) => baseline,
            None => {
                let first = records
                    .values()
                    .next()
                    .ok_or_else(|| Error::EmptyLedger(ledger.to_path_buf()))?;
                ClusterFitRecord::baseline(first.n(), first.p(), first.total_variance())?
            }
        };

        let mut profile = FitProfile::new(k_max, baseline)?;
        profile.hydrate(records.into_values());
        Ok(profile)
    }

    /// Returns the record of the last K accepted by the search persisted in `ledger`.
    pub fn find_best_fit(ledger: impl AsRef<Path>) -> Result<ClusterFitRecord<F>> {
        let ledger = ledger.as_ref();
        load_ledger(ledger)?
            .into_iter()
            .rev()
            .find(|record| record.k() > 0)
            .ok_or_else(|| Error::EmptyLedger(ledger.to_path_buf()))
    }

    /// Inserts `record`, the fit of `window.mid`, and recomputes the loss for that probe.
    ///
    /// Inserting the baseline resets the loss to +inf. The first probe of a search has no
    /// predecessor and compares with itself.
    pub fn add(&mut self, record: ClusterFitRecord<F>, window: SearchWindow) -> Result<&mut Self> {
        self.check_total_variance(&record)?;
        let k = record.k();
        if k != 0 && k != window.mid {
            return Err(Error::DataShape(format!(
                "record for K={} cannot be the probe of K={}",
                k, window.mid
            )));
        }
        self.records.insert(k, record);

        if k == 0 {
            self.loss = F::infinity();
            return Ok(self);
        }

        let previous = self.steps.last().map_or(window.mid, |step| step.window.mid);
        let current = self.get(window.mid)?.explained_variance();
        let reference = self.get(previous)?.explained_variance();
        self.loss = if self.total_variance > F::zero() {
            (current - reference).abs() / self.total_variance
        } else {
            F::zero()
        };
        self.steps.push(SearchStep {
            window,
            k,
            loss: self.loss,
        });
        debug!(k, previous, loss = %self.loss, "profile updated");

        Ok(self)
    }

    /// Adds already evaluated records to the cache without touching the search steps.
    ///
    /// Records from another dataset, recognised by their total variance or shape, are skipped.
    /// Returns the number of records accepted.
    pub fn hydrate(&mut self, records: impl IntoIterator<Item = ClusterFitRecord<F>>) -> usize {
        let mut accepted = 0;
        for record in records.into_iter().filter(|record| record.k() > 0) {
            let baseline = &self.records[&0];
            if record.n() != baseline.n() || record.p() != baseline.p() {
                warn!(
                    k = record.k(),
                    n = record.n(),
                    p = record.p(),
                    "skipping cached fit computed on a dataset of another shape"
                );
                continue;
            }
            match self.check_total_variance(&record) {
                Ok(()) => {
                    self.records.insert(record.k(), record);
                    accepted += 1;
                }
                Err(err) => warn!(k = record.k(), error = %err, "skipping cached fit"),
            }
        }
        accepted
    }

    fn check_total_variance(&self, record: &ClusterFitRecord<F>) -> Result<()> {
        let expected = self.total_variance;
        let found = record.total_variance();
        let tolerance = F::cast(1e-9) * expected.abs().max(F::one());
        if (expected - found).abs() > tolerance {
            Err(Error::DataShape(format!(
                "record for K={} has total variance {} but the profile has {}",
                record.k(),
                found,
                expected
            )))
        } else {
            Ok(())
        }
    }

    /// All K already evaluated, the baseline included
    pub fn keys(&self) -> BTreeSet<usize> {
        self.records.keys().copied().collect()
    }

    pub fn contains(&self, k: usize) -> bool {
        self.records.contains_key(&k)
    }

    /// Looks up the record of an evaluated K. Querying an unevaluated K is an error, check with
    /// [`contains`](Self::contains) first.
    pub fn get(&self, k: usize) -> Result<&ClusterFitRecord<F>> {
        self.records.get(&k).ok_or(Error::NotFound(k))
    }

    /// Records ordered by K
    pub fn records(&self) -> impl Iterator<Item = &ClusterFitRecord<F>> {
        self.records.values()
    }

    /// The current value of the stopping criterion
    pub fn loss(&self) -> F {
        self.loss
    }

    pub fn k_max(&self) -> usize {
        self.k_max
    }

    pub fn total_variance(&self) -> F {
        self.total_variance
    }

    /// The probes of the current search, in order
    pub fn steps(&self) -> &[SearchStep<F>] {
        &self.steps
    }

    /// The record of the last probe, i.e. the K the search currently accepts
    pub fn best_fit(&self) -> Option<&ClusterFitRecord<F>> {
        self.steps
            .last()
            .and_then(|step| self.records.get(&step.k))
    }

    /// Rows of the ledger: the baseline, then one row per probe in search order.
    pub fn ledger_rows(&self) -> impl Iterator<Item = &ClusterFitRecord<F>> {
        self.records.get(&0).into_iter().chain(
            self.steps
                .iter()
                .filter_map(move |step| self.records.get(&step.k)),
        )
    }
}
