//! Global constants used throughout the resolver.
//!
//! This module contains the on-disk layout contract, retry parameters, and
//! parallelism defaults. Keeping the directory and file names in one place
//! makes the scanner's expectations discoverable.

use std::time::Duration;

/// Directory under the repository root holding one subdirectory per template.
pub const TEMPLATES_DIR: &str = "templates";

/// Directory under the repository root that holds every constellation.
pub const ENVIRONMENTS_DIR: &str = "environments";

/// Directory under [`ENVIRONMENTS_DIR`] that holds every constellation.
pub const CONSTELLATIONS_DIR: &str = "constellations";

/// Reserved directory under `constellations/` for clusters without a constellation.
pub const STANDALONE_CLUSTERS_DIR: &str = "standalone-clusters";

/// Directory under a constellation that holds its member clusters.
pub const CLUSTERS_DIR: &str = "clusters";

/// Directory under a constellation or cluster that holds application documents.
pub const APPLICATIONS_DIR: &str = "applications";

/// Required document at the root of every constellation directory.
pub const CONSTELLATION_FILE: &str = "constellation.yaml";

/// Required document at the root of every cluster directory.
pub const CLUSTER_FILE: &str = "cluster.yaml";

/// File extensions recognised as application documents.
pub const APPLICATION_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Environment variable naming the resolver configuration file.
pub const CONFIG_ENV_VAR: &str = "CONSTELLATION_CONFIG";

/// Default number of attempts for transient read failures.
pub const DEFAULT_READ_RETRIES: usize = 3;

/// Starting delay for exponential backoff (10ms).
///
/// Also the growth base: `ExponentialBackoff::from_millis` raises it to
/// successive powers, so delays run 10ms, 100ms, then hit
/// [`MAX_BACKOFF_DELAY_MS`].
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Maximum backoff delay for exponential backoff (200ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 200;

/// Minimum number of parallel operations regardless of CPU count.
///
/// Scanning is dominated by small file reads, so even single-core machines
/// benefit from several in-flight jobs.
pub const MIN_PARALLELISM: usize = 10;

/// Multiplier applied to CPU core count for default parallelism.
pub const PARALLELISM_CORE_MULTIPLIER: usize = 2;

/// Default CPU core count when detection fails.
///
/// Used as a fallback when `std::thread::available_parallelism()` returns an error.
pub const FALLBACK_CORE_COUNT: usize = 4;

/// Default worker-pool bound: `max(MIN_PARALLELISM, cores * PARALLELISM_CORE_MULTIPLIER)`.
pub fn default_max_parallel() -> usize {
    let cores = std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(FALLBACK_CORE_COUNT);
    (cores * PARALLELISM_CORE_MULTIPLIER).max(MIN_PARALLELISM)
}

/// Backoff cap as a [`Duration`].
pub fn max_backoff_delay() -> Duration {
    Duration::from_millis(MAX_BACKOFF_DELAY_MS)
}
