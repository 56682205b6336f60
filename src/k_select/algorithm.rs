use ndarray::{ArrayBase, Data, Ix2};
use tracing::{debug, error, info, warn};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::{KSelectValidParams, SearchMode, SearchWindow};
use crate::error::{Error, Result};
use crate::persistence::{write_cluster_centers, FitStore, Persistable};
use crate::profile::FitProfile;
use crate::record::ClusterFitRecord;
use crate::traits::{ClusterFitter, FittedModel};
use crate::variance::{check_shape, total_variance, within_variance};
use crate::Float;

/// How a search ended
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStatus {
    /// The window reached a fixed point
    Converged,
    /// `max_iter` probes were spent before the window settled
    MaxIterExceeded,
    /// A fixed set of cluster counts was evaluated
    Enumerated,
}

/// The outcome of a search: the profile with every evaluated K and how the search ended.
#[derive(Clone, Debug, PartialEq)]
pub struct KSelection<F: Float> {
    profile: FitProfile<F>,
    status: SearchStatus,
    iterations: usize,
    n_fits: usize,
}

impl<F: Float> KSelection<F> {
    pub fn profile(&self) -> &FitProfile<F> {
        &self.profile
    }

    pub fn into_profile(self) -> FitProfile<F> {
        self.profile
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    /// Number of probes, cached ones included
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of calls to the fitting collaborator
    pub fn n_fits(&self) -> usize {
        self.n_fits
    }

    /// The record of the accepted number of clusters
    pub fn best_fit(&self) -> Option<&ClusterFitRecord<F>> {
        self.profile.best_fit()
    }

    pub fn k(&self) -> Option<usize> {
        self.best_fit().map(|record| record.k())
    }
}

/// State shared by the probes of one search
struct Probe<'a, F: Float, C, D: Data<Elem = F>> {
    params: &'a KSelectValidParams<F>,
    fitter: &'a C,
    observations: &'a ArrayBase<D, Ix2>,
    store: Option<&'a FitStore>,
    n_fits: usize,
}

impl<'a, F, C, D> Probe<'a, F, C, D>
where
    F: Float,
    C: ClusterFitter<F>,
    C::Model: Persistable,
    D: Data<Elem = F>,
{
    /// Returns the cached record of `k`, fitting and persisting it first if needed.
    fn find_or_fit(&mut self, profile: &FitProfile<F>, k: usize) -> Result<ClusterFitRecord<F>> {
        if profile.contains(k) {
            debug!(k, "reusing cached fit");
            return Ok(profile.get(k)?.clone());
        }

        info!(k, "fitting");
        let model = self
            .fitter
            .fit(self.observations.view(), k, self.params.seed())
            .map_err(|err| {
                error!(k, seed = self.params.seed(), error = %err, "fit failed");
                Error::FitFailure {
                    k,
                    source: Box::new(err),
                }
            })?;
        self.n_fits += 1;

        let within = within_variance(self.observations, &model)?;
        let (n, p) = self.observations.dim();
        let record = ClusterFitRecord::new(
            k,
            n,
            p,
            within,
            profile.total_variance(),
            self.params.bic_penalty(),
        )?;
        info!(
            k,
            within_variance = %within,
            explained_variance = %record.explained_variance(),
            "fitted"
        );

        match self.store {
            Some(store) => store.write_fit(record, &model),
            None => Ok(record),
        }
    }

    /// Probes `window.mid` and records the step
    fn step(&mut self, profile: &mut FitProfile<F>, window: SearchWindow) -> Result<F> {
        let record = self.find_or_fit(profile, window.mid)?;
        let loss = profile.add(record, window)?.loss();
        if let Some(store) = self.store {
            store.write_profile(profile)?;
        }
        Ok(loss)
    }
}

impl<F: Float> KSelectValidParams<F> {
    /// Searches the number of clusters of `observations`, with shape
    /// `(n_observations, n_features)`, fitting candidates with `fitter`.
    ///
    /// With a `store`, the total variance, every fit and the profile are persisted as the search
    /// goes, and fits found in the store are reused instead of being computed again.
    ///
    /// A failing fit ends the search with [`Error::FitFailure`]: results persisted up to that
    /// point are kept and a new search resumes from them.
    pub fn search<C, D>(
        &self,
        fitter: &C,
        observations: &ArrayBase<D, Ix2>,
        store: Option<&FitStore>,
    ) -> Result<KSelection<F>>
    where
        C: ClusterFitter<F>,
        C::Model: Persistable,
        D: Data<Elem = F>,
    {
        check_shape(observations)?;
        let (n, p) = observations.dim();
        let total = match store {
            Some(store) => store.total_variance(|| total_variance(observations))?,
            None => total_variance(observations)?,
        };

        let baseline = ClusterFitRecord::baseline(n, p, total)?;
        let mut profile = FitProfile::new(self.k_max(), baseline)?;
        if let Some(store) = store {
            let precomputed = store.discover_precomputed::<F>()?;
            let n_found = precomputed.len();
            let accepted = profile.hydrate(precomputed.into_values());
            info!(
                found = n_found,
                accepted,
                dir = %store.dir().display(),
                "hydrated cached fits"
            );
        }

        let mut probe = Probe {
            params: self,
            fitter,
            observations,
            store,
            n_fits: 0,
        };
        let (status, iterations) = match self.mode() {
            SearchMode::Adaptive { k_max } => self.bisect(&mut probe, &mut profile, *k_max)?,
            SearchMode::Fixed(ks) => {
                for &k in ks {
                    probe.step(&mut profile, SearchWindow::fixed(k))?;
                }
                (SearchStatus::Enumerated, ks.len())
            }
        };

        if let Some(best) = profile.best_fit() {
            info!(k = best.k(), ?status, iterations, fits = probe.n_fits, "search finished");
        }
        Ok(KSelection {
            profile,
            status,
            iterations,
            n_fits: probe.n_fits,
        })
    }

    fn bisect<C, D>(
        &self,
        probe: &mut Probe<F, C, D>,
        profile: &mut FitProfile<F>,
        k_max: usize,
    ) -> Result<(SearchStatus, usize)>
    where
        C: ClusterFitter<F>,
        C::Model: Persistable,
        D: Data<Elem = F>,
    {
        let mut window = SearchWindow::new(k_max);
        for iteration in 1..=self.max_iter() {
            let loss = probe.step(profile, window)?;
            let next = window.narrow(loss, self.threshold(), k_max, self.rounding());
            debug!(
                iteration,
                k = window.mid,
                loss = %loss,
                left = next.left,
                mid = next.mid,
                right = next.right,
                "narrowed search window"
            );
            if next.bounds() == window.bounds() {
                return Ok((SearchStatus::Converged, iteration));
            }
            window = next;
        }

        warn!(max_iter = self.max_iter(), "search window did not settle");
        Ok((SearchStatus::MaxIterExceeded, self.max_iter()))
    }

    /// Refits `k` clusters once per seed of `seeds` to check how much the partitioning depends
    /// on its initialization.
    ///
    /// The records are not added to any profile. With a `store`, the centers of every refit are
    /// persisted next to the search artifacts.
    pub fn stability<C, D>(
        &self,
        fitter: &C,
        observations: &ArrayBase<D, Ix2>,
        k: usize,
        seeds: &[u64],
        store: Option<&FitStore>,
    ) -> Result<Vec<ClusterFitRecord<F>>>
    where
        C: ClusterFitter<F>,
        D: Data<Elem = F>,
    {
        check_shape(observations)?;
        let (n, p) = observations.dim();
        let total = match store {
            Some(store) => store.total_variance(|| total_variance(observations))?,
            None => total_variance(observations)?,
        };

        seeds
            .iter()
            .map(|&seed| -> Result<ClusterFitRecord<F>> {
                let model = fitter
                    .fit(observations.view(), k, seed)
                    .map_err(|err| {
                        error!(k, seed, error = %err, "stability refit failed");
                        Error::FitFailure {
                            k,
                            source: Box::new(err),
                        }
                    })?;
                let within = within_variance(observations, &model)?;
                debug!(k, seed, within_variance = %within, "stability refit");
                let record = ClusterFitRecord::new(k, n, p, within, total, self.bic_penalty())?;
                match store {
                    Some(store) => {
                        let path = store.seed_centers_file(seed);
                        write_cluster_centers(&path, &model.centroids())?;
                        Ok(record.with_path(path))
                    }
                    None => Ok(record),
                }
            })
            .collect()
    }
}
