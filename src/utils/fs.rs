//! Filesystem reads used by the scanner.
//!
//! All reads are asynchronous, raced against the run's [`RunSignal`], and
//! retried with exponential backoff when the failure looks transient. Missing
//! files and permission problems are deterministic and fail immediately.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;

use crate::constants::{STARTING_BACKOFF_DELAY_MS, max_backoff_delay};
use crate::core::{ResolverError, RunSignal};

/// Whether an I/O error is worth another attempt.
#[must_use]
pub fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Reads a text file with retry for transient I/O errors.
///
/// # Retry Strategy
/// - Delays: 10ms, 100ms, then 200ms (capped)
/// - Attempts: `attempts` in total
/// - Only `Interrupted`, `WouldBlock` and `TimedOut` are retried
///
/// # Errors
///
/// [`ResolverError::Cancelled`] when `signal` trips first, otherwise
/// [`ResolverError::IoError`] with the last I/O error.
pub async fn read_to_string_with_retry(
    path: &Path,
    attempts: usize,
    signal: &RunSignal,
) -> Result<String, ResolverError> {
    let path_buf = path.to_path_buf();
    let read = with_retry(path, attempts, || {
        let path = path_buf.clone();
        async move { tokio::fs::read_to_string(&path).await }
    });

    signal.guard(read).await?.map_err(|e| {
        tracing::debug!(target: "fs::retry", "Giving up on {}: {}", path.display(), e);
        ResolverError::IoError(e)
    })
}

/// Run `operation` until it succeeds, fails with a non-transient error, or has
/// been tried `attempts` times.
async fn with_retry<T, F, Fut>(path: &Path, attempts: usize, operation: F) -> io::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    let strategy = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
        .max_delay(max_backoff_delay())
        .take(attempts.saturating_sub(1));

    RetryIf::spawn(strategy, operation, |e: &io::Error| {
        let retry = is_transient(e);
        if retry {
            tracing::debug!(
                target: "fs::retry",
                "Transient error reading {}: {} (kind: {:?}), will retry",
                path.display(),
                e,
                e.kind()
            );
        }
        retry
    })
    .await
}

/// Whether `path` exists, honouring the run signal.
///
/// # Errors
///
/// Cancellation, or the I/O error from the existence check.
pub async fn exists(path: &Path, signal: &RunSignal) -> Result<bool, ResolverError> {
    Ok(signal.guard(tokio::fs::try_exists(path)).await??)
}

/// Immediate subdirectories of `dir` as `(name, path)`, sorted by name.
///
/// Entries whose names are not valid UTF-8 are skipped with a warning.
///
/// # Errors
///
/// Cancellation, or the I/O error from listing the directory.
pub async fn list_subdirectories(
    dir: &Path,
    signal: &RunSignal,
) -> Result<Vec<(String, PathBuf)>, ResolverError> {
    list_entries(dir, signal, EntryFilter::Directories).await
}

/// Regular files directly inside `dir` whose extension is in `extensions`, sorted by name.
///
/// # Errors
///
/// Cancellation, or the I/O error from listing the directory.
pub async fn list_files_with_extensions(
    dir: &Path,
    extensions: &[&str],
    signal: &RunSignal,
) -> Result<Vec<PathBuf>, ResolverError> {
    let files = list_entries(dir, signal, EntryFilter::Files).await?;
    Ok(files
        .into_iter()
        .filter_map(|(_, path)| {
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.contains(&ext));
            if !matches {
                tracing::debug!("Ignoring non-document file {}", path.display());
            }
            matches.then_some(path)
        })
        .collect())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryFilter {
    Directories,
    Files,
}

async fn list_entries(
    dir: &Path,
    signal: &RunSignal,
    filter: EntryFilter,
) -> Result<Vec<(String, PathBuf)>, ResolverError> {
    let listing = async {
        let mut entries = Vec::new();
        let mut reader = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = reader.next_entry().await? {
            let file_type = entry.file_type().await?;
            let wanted = match filter {
                EntryFilter::Directories => file_type.is_dir(),
                EntryFilter::Files => file_type.is_file(),
            };
            if !wanted {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => entries.push((name, entry.path())),
                Err(raw) => {
                    tracing::warn!(
                        "Skipping entry with non UTF-8 name {:?} in {}",
                        raw,
                        dir.display()
                    );
                }
            }
        }
        entries.sort();
        Ok::<_, io::Error>(entries)
    };

    Ok(signal.guard(listing).await??)
}
