//! Shared setup of the criterion benchmarks
#[cfg(feature = "benchmarks")]
pub mod config {
    use criterion::{measurement::WallTime, BenchmarkGroup, Criterion};
    #[cfg(not(target_os = "windows"))]
    use pprof::criterion::{Output, PProfProfiler};
    use std::time::Duration;

    #[cfg(not(target_os = "windows"))]
    pub fn get_default_profiling_configs() -> Criterion {
        Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
    }

    #[cfg(target_os = "windows")]
    pub fn get_default_profiling_configs() -> Criterion {
        Criterion::default()
    }

    /// A whole search runs many fits, so fewer and longer samples than for a single fit
    pub fn set_default_benchmark_configs(benchmark: &mut BenchmarkGroup<WallTime>) {
        benchmark
            .sample_size(20)
            .measurement_time(Duration::new(30, 0))
            .confidence_level(0.95)
            .warm_up_time(Duration::new(5, 0))
            .noise_threshold(0.05);
    }
}
