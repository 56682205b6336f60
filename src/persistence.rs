//! Reading and writing fit statistics and model artifacts
//!
//! Every file is tab-separated. A fit with `k` clusters stored under `<dir>/<name>` leaves
//!
//! * `<name>-K<k>_statistics.tsv`: a single-row ledger fragment,
//! * `<name>-K<k>_cluster_centers.tsv`: a `#Clustercenters` line, then one row per cluster,
//! * `<name>-K<k>_cluster_sizes.tsv`: one observation count per line,
//!
//! while the search itself maintains `<name>-profile.tsv` (the ledger), `<name>-search_path.tsv`
//! and `<name>-total_variance.tsv`. Files are written to a temporary file in the same directory
//! and renamed into place, so a concurrent reader never sees half a record.
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use glob::Pattern;
use ndarray::{Array2, ArrayBase, Data, Ix2};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::k_means::KMeans;
use crate::profile::FitProfile;
use crate::record::ClusterFitRecord;
use crate::variance::explained_variance;
use crate::Float;

/// Columns of a ledger, in order
pub const LEDGER_HEADER: [&str; 8] = [
    "K",
    "WITHIN_VAR",
    "EXPL_VAR",
    "TOTAL_VAR",
    "BIC",
    "N",
    "P",
    "PATH",
];

const STATISTICS_SUFFIX: &str = "_statistics.tsv";
const CENTERS_SUFFIX: &str = "_cluster_centers.tsv";
const SIZES_SUFFIX: &str = "_cluster_sizes.tsv";
const TOTAL_VAR_HEADER: &str = "TOTAL_VAR";

/// Something that can write itself next to a base path.
///
/// `base` has no extension; implementations append their own suffix and must overwrite
/// atomically.
pub trait Persistable {
    fn persist(&self, base: &Path) -> Result<()>;
}

impl<F: Float> Persistable for ClusterFitRecord<F> {
    /// Writes the statistics of the record as a single-row ledger
    fn persist(&self, base: &Path) -> Result<()> {
        write_record(self, base)
    }
}

/// Appends `suffix` to the file name of `base`
pub fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_atomic<T>(path: &Path, write: impl FnOnce(&mut NamedTempFile) -> Result<T>) -> Result<T> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    let written = write(&mut file)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| Error::Io(err.error))?;
    Ok(written)
}

fn ledger_row<F: Float>(record: &ClusterFitRecord<F>) -> [String; 8] {
    [
        record.k().to_string(),
        record.within_variance().to_string(),
        record.explained_variance().to_string(),
        record.total_variance().to_string(),
        record.bic().to_string(),
        record.n().to_string(),
        record.p().to_string(),
        record
            .path()
            .map(|path| path.display().to_string())
            .unwrap_or_default(),
    ]
}

/// Overwrites `path` with a ledger holding `records` in the given order.
pub fn write_ledger<'a, F: Float>(
    path: impl AsRef<Path>,
    records: impl IntoIterator<Item = &'a ClusterFitRecord<F>>,
) -> Result<()> {
    write_atomic(path.as_ref(), |file| {
        let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(file);
        writer.write_record(LEDGER_HEADER)?;
        for record in records {
            writer.write_record(&ledger_row(record))?;
        }
        writer.flush()?;
        Ok(())
    })
}

/// Writes the statistics row of `record` to `<base>_statistics.tsv`, replacing an earlier
/// version of the same fit.
pub fn write_record<F: Float>(record: &ClusterFitRecord<F>, base: &Path) -> Result<()> {
    let path = with_suffix(base, STATISTICS_SUFFIX);
    info!(k = record.k(), path = %path.display(), "writing fit statistics");
    write_ledger(path, std::iter::once(record))
}

fn parse_field<T: std::str::FromStr>(
    row: &StringRecord,
    index: usize,
) -> std::result::Result<T, String> {
    let field = row.get(index).unwrap_or_default().trim();
    field
        .parse()
        .map_err(|_| format!("cannot parse {} from {:?}", LEDGER_HEADER[index], field))
}

fn parse_row<F: Float>(row: &StringRecord) -> std::result::Result<ClusterFitRecord<F>, String> {
    if row.len() != LEDGER_HEADER.len() {
        return Err(format!(
            "expected {} columns, found {}",
            LEDGER_HEADER.len(),
            row.len()
        ));
    }
    let within: F = parse_field(row, 1)?;
    let total: F = parse_field(row, 3)?;
    if !(within >= F::zero()) || !(total >= F::zero()) {
        return Err(format!(
            "variances must be non-negative, got within={} total={}",
            within, total
        ));
    }
    let explained: F = parse_field(row, 2)?;
    let tolerance = F::cast(1e-9) * total.max(F::one());
    if !((explained - explained_variance(total, within)).abs() <= tolerance) {
        return Err(format!(
            "explained variance {} is not total {} minus within {}",
            explained, total, within
        ));
    }
    let n: usize = parse_field(row, 5)?;
    let p: usize = parse_field(row, 6)?;
    if n == 0 || p == 0 {
        return Err(format!("a fit needs observations and features, got N={} P={}", n, p));
    }
    let path = match row.get(7).map(str::trim) {
        None | Some("") => None,
        Some(path) => Some(PathBuf::from(path)),
    };

    Ok(ClusterFitRecord::from_parts(
        parse_field(row, 0)?,
        n,
        p,
        within,
        explained,
        total,
        parse_field(row, 4)?,
        path,
    ))
}

/// The parsed content of a ledger
#[derive(Debug)]
pub struct LedgerRows<F: Float> {
    /// Valid rows in file order
    pub records: Vec<ClusterFitRecord<F>>,
    /// One [`Error::LedgerCorruption`] per skipped row
    pub corrupt: Vec<Error>,
}

/// Parses every row of a ledger. Malformed rows are logged and skipped; only a ledger that
/// cannot be opened is an error.
pub fn read_ledger<F: Float>(path: impl AsRef<Path>) -> Result<LedgerRows<F>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(File::open(path)?);

    let headers = reader.headers()?.clone();
    if headers.iter().map(str::trim).ne(LEDGER_HEADER.iter().copied()) {
        warn!(path = %path.display(), headers = ?headers, "unexpected ledger header");
    }

    let mut rows = LedgerRows {
        records: Vec::new(),
        corrupt: Vec::new(),
    };
    for (index, row) in reader.records().enumerate() {
        let fallback_line = index as u64 + 2;
        let parsed = match row {
            Ok(row) => {
                let line = row.position().map_or(fallback_line, |pos| pos.line());
                parse_row(&row).map_err(|reason| (line, reason))
            }
            Err(err) => {
                let line = err.position().map_or(fallback_line, |pos| pos.line());
                Err((line, err.to_string()))
            }
        };
        match parsed {
            Ok(record) => rows.records.push(record),
            Err((line, reason)) => {
                let err = Error::LedgerCorruption {
                    path: path.to_path_buf(),
                    line,
                    reason,
                };
                warn!(error = %err, "skipping ledger row");
                rows.corrupt.push(err);
            }
        }
    }

    Ok(rows)
}

/// All valid records of a ledger, in file order
pub fn load_ledger<F: Float>(path: impl AsRef<Path>) -> Result<Vec<ClusterFitRecord<F>>> {
    read_ledger(path).map(|rows| rows.records)
}

/// Collects the records of every statistics file matching the glob `pattern`, such as
/// `out/fit-K*_statistics.tsv`.
///
/// A missing directory or an unreadable file only means there is less to reuse. A pattern that
/// is not a valid glob is an error.
pub fn discover_precomputed<F: Float>(
    pattern: impl AsRef<Path>,
) -> Result<BTreeMap<usize, ClusterFitRecord<F>>> {
    let pattern = pattern.as_ref().to_string_lossy();
    let mut found = BTreeMap::new();

    for entry in glob::glob(&pattern)? {
        let file = match entry {
            Ok(file) => file,
            Err(err) => {
                warn!(path = %err.path().display(), error = %err, "ignoring precomputed fit");
                continue;
            }
        };
        match load_ledger::<F>(&file) {
            Ok(records) => {
                for record in records {
                    info!(k = record.k(), file = %file.display(), "found precomputed fit");
                    found.insert(record.k(), record);
                }
            }
            Err(err) => warn!(file = %file.display(), error = %err, "ignoring precomputed fit"),
        }
    }
    if found.is_empty() {
        info!(%pattern, "no precomputed fits, starting from scratch");
    }
    Ok(found)
}

/// Writes `centroids` as one tab-separated row per cluster
pub fn write_cluster_centers<F: Float>(
    path: &Path,
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<()> {
    info!(path = %path.display(), "writing cluster centers");
    write_atomic(path, |file| {
        writeln!(file, "#Clustercenters")?;
        let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(file);
        for center in centroids.rows() {
            writer.write_record(center.iter().map(|x| x.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    })
}

/// Reads a cluster center artifact back into a `(n_clusters, n_features)` matrix
pub fn read_cluster_centers<F: Float>(path: &Path) -> Result<Array2<F>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .from_reader(File::open(path)?);

    let mut values = Vec::new();
    let mut n_clusters = 0;
    for row in reader.records() {
        let row = row?;
        if n_clusters > 0 && row.len() * n_clusters != values.len() {
            return Err(Error::DataShape(format!("ragged cluster centers in {:?}", path)));
        }
        for field in row.iter() {
            let value = field.trim().parse::<F>().map_err(|_| {
                Error::DataShape(format!("invalid center coordinate {:?} in {:?}", field, path))
            })?;
            values.push(value);
        }
        n_clusters += 1;
    }
    if n_clusters == 0 {
        return Err(Error::DataShape(format!("{:?} holds no cluster centers", path)));
    }

    let n_features = values.len() / n_clusters;
    Array2::from_shape_vec((n_clusters, n_features), values)
        .map_err(|err| Error::DataShape(format!("ragged cluster centers in {:?}: {}", path, err)))
}

/// Writes the number of observations of every cluster, one per line
pub fn write_cluster_sizes(path: &Path, sizes: impl IntoIterator<Item = usize>) -> Result<()> {
    info!(path = %path.display(), "writing cluster sizes");
    write_atomic(path, |file| {
        for size in sizes {
            writeln!(file, "{}", size)?;
        }
        Ok(())
    })
}

/// The on-disk home of one search: a directory and a file name prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FitStore {
    dir: PathBuf,
    name: String,
}

impl FitStore {
    /// Uses the files `<dir>/<name>*`, creating `dir` if needed.
    pub fn create(dir: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FitStore {
            dir,
            name: name.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.name, suffix))
    }

    /// Base path of the artifacts of the fit with `k` clusters
    pub fn fit_base(&self, k: usize) -> PathBuf {
        self.file(&format!("-K{}", k))
    }

    pub fn statistics_file(&self, k: usize) -> PathBuf {
        with_suffix(&self.fit_base(k), STATISTICS_SUFFIX)
    }

    pub fn centers_file(&self, k: usize) -> PathBuf {
        with_suffix(&self.fit_base(k), CENTERS_SUFFIX)
    }

    pub fn sizes_file(&self, k: usize) -> PathBuf {
        with_suffix(&self.fit_base(k), SIZES_SUFFIX)
    }

    /// The ledger of the whole search
    pub fn ledger_file(&self) -> PathBuf {
        self.file("-profile.tsv")
    }

    pub fn search_path_file(&self) -> PathBuf {
        self.file("-search_path.tsv")
    }

    pub fn total_variance_file(&self) -> PathBuf {
        self.file("-total_variance.tsv")
    }

    /// Centers of the stability refit with `seed`
    pub fn seed_centers_file(&self, seed: u64) -> PathBuf {
        self.file(&format!("-seed_{}{}", seed, CENTERS_SUFFIX))
    }

    /// Persists the artifacts of `model` and the statistics of `record`, returning the record
    /// with its artifact path attached.
    pub fn write_fit<F: Float, M: Persistable>(
        &self,
        record: ClusterFitRecord<F>,
        model: &M,
    ) -> Result<ClusterFitRecord<F>> {
        let base = self.fit_base(record.k());
        model.persist(&base)?;
        let record = record.with_path(&base);
        record.persist(&base)?;
        Ok(record)
    }

    /// Fits found from earlier runs into this store
    pub fn discover_precomputed<F: Float>(&self) -> Result<BTreeMap<usize, ClusterFitRecord<F>>> {
        let prefix = Pattern::escape(&self.file("").to_string_lossy());
        discover_precomputed(format!("{}-K*{}", prefix, STATISTICS_SUFFIX))
    }

    /// Rewrites the ledger and the search path of `profile`
    pub fn write_profile<F: Float>(&self, profile: &FitProfile<F>) -> Result<()> {
        write_ledger(self.ledger_file(), profile.ledger_rows())?;
        write_atomic(&self.search_path_file(), |file| {
            let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(file);
            writer.write_record(["LEFT", "MID", "RIGHT", "K", "LOSS"])?;
            for step in profile.steps() {
                writer.write_record([
                    step.window.left.to_string(),
                    step.window.mid.to_string(),
                    step.window.right.to_string(),
                    step.k.to_string(),
                    step.loss.to_string(),
                ])?;
            }
            writer.flush()?;
            Ok(())
        })
    }

    pub fn load_ledger<F: Float>(&self) -> Result<Vec<ClusterFitRecord<F>>> {
        load_ledger(self.ledger_file())
    }

    fn read_total_variance<F: Float>(&self, path: &Path) -> Result<Option<F>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(File::open(path)?);
        let value = match reader.records().next() {
            Some(row) => row?
                .get(0)
                .and_then(|field| field.trim().parse::<F>().ok())
                .filter(|value| *value >= F::zero()),
            None => None,
        };
        Ok(value)
    }

    /// Returns the cached total variance of the dataset, computing and caching it if missing.
    pub fn total_variance<F: Float>(&self, compute: impl FnOnce() -> Result<F>) -> Result<F> {
        let path = self.total_variance_file();
        if path.exists() {
            match self.read_total_variance(&path) {
                Ok(Some(total)) => {
                    info!(path = %path.display(), total_variance = %total, "loaded total variance");
                    return Ok(total);
                }
                Ok(None) => warn!(path = %path.display(), "corrupt total variance file, recomputing"),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "unreadable total variance file, recomputing")
                }
            }
        }

        let total = compute()?;
        write_atomic(&path, |file| {
            writeln!(file, "{}\n{}", TOTAL_VAR_HEADER, total)?;
            Ok(())
        })?;
        Ok(total)
    }

    /// Loads the model persisted for `record` so that new observations can be assigned.
    pub fn load_model<F: Float>(&self, record: &ClusterFitRecord<F>) -> Result<KMeans<F>> {
        let centers = match record.path() {
            Some(base) => with_suffix(base, CENTERS_SUFFIX),
            None => self.centers_file(record.k()),
        };
        Ok(KMeans::from_centroids(read_cluster_centers(&centers)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variance::BicPenalty;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::fs;

    fn record(k: usize, within: f64) -> ClusterFitRecord<f64> {
        ClusterFitRecord::new(k, 1000, 5, within, 500., BicPenalty::KTimesP).unwrap()
    }

    #[test]
    fn ledger_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("fit-profile.tsv");
        let records = vec![
            ClusterFitRecord::baseline(1000, 5, 500.).unwrap(),
            record(10, 50.123456789).with_path(dir.path().join("fit-K10")),
            record(4, 0.1 + 0.2),
        ];
        write_ledger(&ledger, records.iter()).unwrap();

        let loaded = load_ledger::<f64>(&ledger).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("fit-profile.tsv");
        fs::write(
            &ledger,
            "K\tWITHIN_VAR\tEXPL_VAR\tTOTAL_VAR\tBIC\tN\tP\tPATH\n\
             4\t60\t440\t500\t-2800\t1000\t5\t\n\
             5\t58\t442\t500\n\
             6\t52\t448\t500\t-2900\t1000\t5\tout/fit-K6\n",
        )
        .unwrap();

        let rows = read_ledger::<f64>(&ledger).unwrap();
        assert_eq!(rows.records.len(), 2);
        assert_eq!(rows.corrupt.len(), 1);
        assert!(matches!(
            rows.corrupt[0],
            Error::LedgerCorruption { line: 3, .. }
        ));
        assert_eq!(rows.records[1].path(), Some(Path::new("out/fit-K6")));
        assert!(rows.records[0].path().is_none());
    }

    #[test]
    fn unparsable_values_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("fit-profile.tsv");
        fs::write(
            &ledger,
            "K\tWITHIN_VAR\tEXPL_VAR\tTOTAL_VAR\tBIC\tN\tP\tPATH\n\
             four\t60\t440\t500\t-2800\t1000\t5\t\n\
             4\t-60\t440\t500\t-2800\t1000\t5\t\n\
             4\t60\t440\t500\t-2800\t1000\t5\t\n",
        )
        .unwrap();

        let rows = read_ledger::<f64>(&ledger).unwrap();
        assert_eq!(rows.records.len(), 1);
        assert_eq!(rows.corrupt.len(), 2);
    }

    #[test]
    fn missing_ledger_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_ledger::<f64>(dir.path().join("nope.tsv")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn write_record_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("fit-K3");
        write_record(&record(3, 70.), &base).unwrap();
        write_record(&record(3, 65.), &base).unwrap();

        let loaded = load_ledger::<f64>(with_suffix(&base, "_statistics.tsv")).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_abs_diff_eq!(loaded[0].within_variance(), 65.);
        // no temporary files are left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn glob_patterns_find_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let store = FitStore::create(dir.path(), "fit").unwrap();
        write_record(&record(6, 52.), &store.fit_base(6)).unwrap();
        write_record(&record(12, 50.), &store.fit_base(12)).unwrap();
        let dir = dir.path().display();

        let found = discover_precomputed::<f64>(format!("{}/fit-K*_stat*.tsv", dir)).unwrap();
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![6, 12]);
        let found = discover_precomputed::<f64>(format!("{}/fit-K?_statistics.tsv", dir)).unwrap();
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![6]);
        let found = discover_precomputed::<f64>(format!("{}/other-K*_statistics.tsv", dir)).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn invalid_glob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("fit-K[_statistics.tsv");
        assert!(matches!(
            discover_precomputed::<f64>(pattern),
            Err(Error::Pattern(_))
        ));
    }

    #[test]
    fn store_names_are_not_globs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FitStore::create(dir.path(), "fit[a]").unwrap();
        write_record(&record(6, 52.), &store.fit_base(6)).unwrap();
        let found = store.discover_precomputed::<f64>().unwrap();
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![6]);
    }

    #[test]
    fn inconsistent_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("fit-profile.tsv");
        fs::write(
            &ledger,
            "K\tWITHIN_VAR\tEXPL_VAR\tTOTAL_VAR\tBIC\tN\tP\tPATH\n\
             4\t60\t9999\t500\t-2800\t1000\t5\t\n\
             5\t56\t444\t500\t-2850\t0\t5\t\n\
             6\t52\t448\t500\t-2900\t1000\t0\t\n\
             10\t50\t450\t500\t-2957\t1000\t5\t\n",
        )
        .unwrap();

        let rows = read_ledger::<f64>(&ledger).unwrap();
        assert_eq!(rows.records.len(), 1);
        assert_eq!(rows.records[0].k(), 10);
        assert_eq!(rows.corrupt.len(), 3);
        assert!(matches!(
            rows.corrupt[0],
            Error::LedgerCorruption { line: 2, .. }
        ));

        let profile = FitProfile::<f64>::from_ledger(&ledger, 10).unwrap();
        assert!(!profile.contains(4));
        for record in profile.records() {
            assert_abs_diff_eq!(
                record.explained_variance(),
                record.total_variance() - record.within_variance()
            );
        }
    }

    #[test]
    fn discovers_precomputed_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let store = FitStore::create(dir.path(), "fit").unwrap();
        write_record(&record(6, 52.), &store.fit_base(6)).unwrap();
        write_record(&record(8, 51.), &store.fit_base(8)).unwrap();
        fs::write(store.statistics_file(9), "garbage").unwrap();
        write_cluster_sizes(&store.sizes_file(6), vec![1, 2, 3]).unwrap();

        let found = store.discover_precomputed::<f64>().unwrap();
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![6, 8]);
        assert_abs_diff_eq!(found[&6].within_variance(), 52.);
    }

    #[test]
    fn missing_precomputed_directory_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let found =
            discover_precomputed::<f64>(dir.path().join("missing/fit-K*_statistics.tsv")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn cluster_centers_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit-K2_cluster_centers.tsv");
        let centers = array![[0.5, -1.25, 3.], [10., 20., 30.]];
        write_cluster_centers(&path, &centers).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("#Clustercenters\n0.5\t-1.25\t3\n"));
        assert_eq!(read_cluster_centers::<f64>(&path).unwrap(), centers);
    }

    #[test]
    fn total_variance_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let store = FitStore::create(dir.path(), "fit").unwrap();
        let total = store.total_variance(|| Ok(500.25f64)).unwrap();
        assert_abs_diff_eq!(total, 500.25);

        let cached: f64 = store
            .total_variance(|| panic!("total variance must not be recomputed"))
            .unwrap();
        assert_abs_diff_eq!(cached, 500.25);

        fs::write(store.total_variance_file(), "TOTAL_VAR\nnot-a-number\n").unwrap();
        let recomputed = store.total_variance(|| Ok(42f64)).unwrap();
        assert_abs_diff_eq!(recomputed, 42.);
    }
}
