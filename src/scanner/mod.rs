//! Repository scanner.
//!
//! Walks the on-disk layout and parses every document into its typed model
//! without interpreting cross-references:
//!
//! ```text
//! templates/<template>/...
//! environments/constellations/<constellation>/constellation.yaml
//! environments/constellations/<constellation>/applications/<app>.yaml
//! environments/constellations/<constellation>/clusters/<cluster>/cluster.yaml
//! environments/constellations/<constellation>/clusters/<cluster>/applications/<app>.yaml
//! environments/constellations/standalone-clusters/<cluster>/cluster.yaml
//! environments/constellations/standalone-clusters/<cluster>/applications/<app>.yaml
//! ```
//!
//! Each constellation subtree and each standalone cluster is an independent
//! job. Jobs run concurrently, at most `max_parallel` at a time, and each job
//! collects its own diagnostics which are merged after all jobs finish.
//!
//! A problem in one subtree never stops the others. Within a cluster, a missing
//! or unparsable `cluster.yaml` stops the scan of that cluster's applications.
//! The scanner only reads; it never writes to the repository.

use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ResolverConfig;
use crate::constants::{
    APPLICATION_EXTENSIONS, APPLICATIONS_DIR, CLUSTER_FILE, CLUSTERS_DIR, CONSTELLATION_FILE,
    CONSTELLATIONS_DIR, ENVIRONMENTS_DIR, STANDALONE_CLUSTERS_DIR, TEMPLATES_DIR,
};
use crate::core::{Diagnostic, Diagnostics, ResolverError, RunSignal};
use crate::models::{ApplicationDocument, ClusterDocument, ConstellationDocument, parse_document};
use crate::utils::fs::{
    exists, list_files_with_extensions, list_subdirectories, read_to_string_with_retry,
};
use crate::utils::normalize_path_for_storage;

/// Scanner knobs, usually derived from [`ResolverConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub max_parallel: usize,
    pub read_retries: usize,
}

impl From<&ResolverConfig> for ScanOptions {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            max_parallel: config.max_parallel.max(1),
            read_retries: config.read_retries.max(1),
        }
    }
}

/// Where a cluster directory physically lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Under `<constellation>/clusters/`
    Constellation(String),
    /// Under `standalone-clusters/`
    Standalone,
}

/// An application document and the file it came from.
#[derive(Debug, Clone)]
pub struct RawApplication {
    pub file: PathBuf,
    pub document: ApplicationDocument,
}

/// A cluster directory as found on disk.
#[derive(Debug, Clone)]
pub struct RawCluster {
    pub name: String,
    /// Path of `cluster.yaml`
    pub file: PathBuf,
    pub placement: Placement,
    /// `None` when `cluster.yaml` is missing or unparsable
    pub document: Option<ClusterDocument>,
    pub applications: Vec<RawApplication>,
    /// Set when any diagnostic was reported for this cluster's files
    pub failed: bool,
}

/// A constellation directory as found on disk.
#[derive(Debug, Clone)]
pub struct RawConstellation {
    pub name: String,
    /// Path of `constellation.yaml`
    pub file: PathBuf,
    /// `None` when `constellation.yaml` is missing or unparsable
    pub document: Option<ConstellationDocument>,
    pub applications: Vec<RawApplication>,
    pub clusters: Vec<RawCluster>,
    /// Set when any diagnostic was reported for the constellation's own files
    pub failed: bool,
}

/// Everything the scanner found, sorted by identifier.
#[derive(Debug, Clone, Default)]
pub struct ScannedRepository {
    pub root: PathBuf,
    /// Template identifiers: directory paths relative to `templates/`, `/`-separated
    pub templates: BTreeSet<String>,
    pub constellations: Vec<RawConstellation>,
    pub standalone: Vec<RawCluster>,
    pub diagnostics: Diagnostics,
}

enum ScanJob {
    Constellation { name: String, dir: PathBuf },
    Standalone { name: String, dir: PathBuf },
}

enum JobResult {
    Constellation(RawConstellation),
    Standalone(RawCluster),
}

/// Scan the repository rooted at `root`.
///
/// # Errors
///
/// Only run-level failures: the root does not exist, or the run was cancelled.
/// Everything else is reported through [`ScannedRepository::diagnostics`].
pub async fn scan(
    root: &Path,
    options: &ScanOptions,
    signal: &RunSignal,
) -> Result<ScannedRepository, ResolverError> {
    let is_dir =
        signal.guard(tokio::fs::metadata(root)).await?.map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir {
        return Err(ResolverError::RepositoryNotFound {
            path: root.display().to_string(),
        });
    }

    let mut repository = ScannedRepository {
        root: root.to_path_buf(),
        ..ScannedRepository::default()
    };

    repository.templates = scan_templates(root, signal, &mut repository.diagnostics).await?;

    let constellations_dir = root.join(ENVIRONMENTS_DIR).join(CONSTELLATIONS_DIR);
    if !exists(&constellations_dir, signal).await? {
        tracing::warn!(
            target: "scanner",
            "No {} directory in {}; nothing to resolve",
            Path::new(ENVIRONMENTS_DIR).join(CONSTELLATIONS_DIR).display(),
            root.display()
        );
        return Ok(repository);
    }

    let jobs = plan_jobs(&constellations_dir, signal, &mut repository.diagnostics).await?;
    tracing::debug!(
        target: "scanner",
        "Scanning {} subtrees with up to {} workers",
        jobs.len(),
        options.max_parallel
    );

    let results: Vec<Result<(JobResult, Diagnostics), ResolverError>> = stream::iter(jobs)
        .map(|job| run_job(job, options, signal))
        .buffer_unordered(options.max_parallel)
        .collect()
        .await;

    for result in results {
        let (output, diagnostics) = result?;
        repository.diagnostics.merge(diagnostics);
        match output {
            JobResult::Constellation(constellation) => {
                repository.constellations.push(constellation);
            }
            JobResult::Standalone(cluster) => repository.standalone.push(cluster),
        }
    }

    repository.constellations.sort_by(|a, b| a.name.cmp(&b.name));
    repository.standalone.sort_by(|a, b| a.name.cmp(&b.name));

    tracing::info!(
        target: "scanner",
        "Scanned {} templates, {} constellations, {} standalone clusters",
        repository.templates.len(),
        repository.constellations.len(),
        repository.standalone.len()
    );

    Ok(repository)
}

async fn scan_templates(
    root: &Path,
    signal: &RunSignal,
    diagnostics: &mut Diagnostics,
) -> Result<BTreeSet<String>, ResolverError> {
    let templates_dir = root.join(TEMPLATES_DIR);
    if !exists(&templates_dir, signal).await? {
        tracing::warn!(target: "scanner", "No {} directory in {}", TEMPLATES_DIR, root.display());
        return Ok(BTreeSet::new());
    }

    let walk_root = templates_dir.clone();
    let walk = tokio::task::spawn_blocking(move || {
        let mut templates = BTreeSet::new();
        let mut problems = Vec::new();

        let walker = WalkDir::new(&walk_root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !entry.file_name().to_string_lossy().starts_with('.'));

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {
                    if let Ok(relative) = entry.path().strip_prefix(&walk_root) {
                        templates.insert(normalize_path_for_storage(relative));
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().map_or_else(|| walk_root.clone(), Path::to_path_buf);
                    problems.push(Diagnostic::structure(
                        path,
                        TEMPLATES_DIR,
                        format!("cannot read template directory: {e}"),
                    ));
                }
            }
        }
        (templates, problems)
    });

    let (templates, problems) = signal
        .guard(walk)
        .await?
        .map_err(|e| ResolverError::TaskFailed {
            reason: e.to_string(),
        })?;
    diagnostics.extend(problems);

    tracing::debug!(target: "scanner", "Found {} template directories", templates.len());
    Ok(templates)
}

async fn plan_jobs(
    constellations_dir: &Path,
    signal: &RunSignal,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<ScanJob>, ResolverError> {
    let mut jobs = Vec::new();
    let Some(entries) = recover(
        list_subdirectories(constellations_dir, signal).await,
        constellations_dir,
        CONSTELLATIONS_DIR,
        diagnostics,
    )?
    else {
        return Ok(jobs);
    };

    for (name, dir) in entries {
        if name == STANDALONE_CLUSTERS_DIR {
            let clusters = recover(
                list_subdirectories(&dir, signal).await,
                &dir,
                STANDALONE_CLUSTERS_DIR,
                diagnostics,
            )?
            .unwrap_or_default();
            jobs.extend(clusters.into_iter().map(|(name, dir)| ScanJob::Standalone {
                name,
                dir,
            }));
        } else {
            jobs.push(ScanJob::Constellation {
                name,
                dir,
            });
        }
    }
    Ok(jobs)
}

async fn run_job(
    job: ScanJob,
    options: &ScanOptions,
    signal: &RunSignal,
) -> Result<(JobResult, Diagnostics), ResolverError> {
    let mut diagnostics = Diagnostics::new();
    let result = match job {
        ScanJob::Constellation {
            name,
            dir,
        } => JobResult::Constellation(
            scan_constellation(name, &dir, options, signal, &mut diagnostics).await?,
        ),
        ScanJob::Standalone {
            name,
            dir,
        } => JobResult::Standalone(
            scan_cluster(name, &dir, Placement::Standalone, options, signal, &mut diagnostics)
                .await?,
        ),
    };
    Ok((result, diagnostics))
}

async fn scan_constellation(
    name: String,
    dir: &Path,
    options: &ScanOptions,
    signal: &RunSignal,
    diagnostics: &mut Diagnostics,
) -> Result<RawConstellation, ResolverError> {
    tracing::debug!(target: "scanner", "Scanning constellation '{}'", name);
    let before = diagnostics.len();

    let file = dir.join(CONSTELLATION_FILE);
    let document =
        load_document::<ConstellationDocument>(&file, &name, options, signal, diagnostics).await?;

    let applications =
        scan_applications(&dir.join(APPLICATIONS_DIR), &name, options, signal, diagnostics).await?;
    let failed = diagnostics.len() > before;

    let mut clusters = Vec::new();
    let clusters_dir = dir.join(CLUSTERS_DIR);
    if exists(&clusters_dir, signal).await? {
        let listing = list_subdirectories(&clusters_dir, signal).await;
        let entries = recover(listing, &clusters_dir, &name, diagnostics)?.unwrap_or_default();
        for (cluster_name, cluster_dir) in entries {
            let placement = Placement::Constellation(name.clone());
            clusters.push(
                scan_cluster(cluster_name, &cluster_dir, placement, options, signal, diagnostics)
                    .await?,
            );
        }
    }

    Ok(RawConstellation {
        name,
        file,
        document,
        applications,
        clusters,
        failed,
    })
}

async fn scan_cluster(
    name: String,
    dir: &Path,
    placement: Placement,
    options: &ScanOptions,
    signal: &RunSignal,
    diagnostics: &mut Diagnostics,
) -> Result<RawCluster, ResolverError> {
    tracing::debug!(target: "scanner", "Scanning cluster '{}'", name);
    let before = diagnostics.len();

    let file = dir.join(CLUSTER_FILE);
    let document =
        load_document::<ClusterDocument>(&file, &name, options, signal, diagnostics).await?;

    let applications = if document.is_some() {
        scan_applications(&dir.join(APPLICATIONS_DIR), &name, options, signal, diagnostics).await?
    } else {
        tracing::debug!(target: "scanner", "Skipping applications of cluster '{}'", name);
        Vec::new()
    };

    Ok(RawCluster {
        name,
        file,
        placement,
        document,
        applications,
        failed: diagnostics.len() > before,
    })
}

async fn scan_applications(
    dir: &Path,
    owner: &str,
    options: &ScanOptions,
    signal: &RunSignal,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<RawApplication>, ResolverError> {
    if !exists(dir, signal).await? {
        return Ok(Vec::new());
    }

    let files = recover(
        list_files_with_extensions(dir, APPLICATION_EXTENSIONS, signal).await,
        dir,
        owner,
        diagnostics,
    )?
    .unwrap_or_default();

    let mut applications = Vec::with_capacity(files.len());
    for file in files {
        let subject =
            file.file_stem().map_or_else(String::new, |s| s.to_string_lossy().into_owned());
        let Some(document) =
            load_document::<ApplicationDocument>(&file, &subject, options, signal, diagnostics)
                .await?
        else {
            continue;
        };

        if let Err(reason) = document.validate() {
            diagnostics.push(Diagnostic::structure(&file, subject, reason));
            continue;
        }
        applications.push(RawApplication {
            file,
            document,
        });
    }
    Ok(applications)
}

/// Read and parse one required document. Problems become diagnostics.
async fn load_document<T>(
    file: &Path,
    subject: &str,
    options: &ScanOptions,
    signal: &RunSignal,
    diagnostics: &mut Diagnostics,
) -> Result<Option<T>, ResolverError>
where
    T: DeserializeOwned,
{
    if !exists(file, signal).await? {
        diagnostics.push(Diagnostic::structure(file, subject, "required file is missing"));
        return Ok(None);
    }

    let Some(content) = recover(
        read_to_string_with_retry(file, options.read_retries, signal).await,
        file,
        subject,
        diagnostics,
    )?
    else {
        return Ok(None);
    };

    match parse_document::<T>(&content) {
        Ok(document) => Ok(Some(document)),
        Err(e) => {
            diagnostics.push(Diagnostic::structure(
                file,
                subject,
                format!("invalid document: {e}"),
            ));
            Ok(None)
        }
    }
}

/// Turn an I/O failure into a diagnostic; pass cancellation through.
fn recover<T>(
    result: Result<T, ResolverError>,
    path: &Path,
    subject: &str,
    diagnostics: &mut Diagnostics,
) -> Result<Option<T>, ResolverError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ResolverError::IoError(e)) => {
            diagnostics.push(Diagnostic::structure(path, subject, format!("cannot read: {e}")));
            Ok(None)
        }
        Err(other) => Err(other),
    }
}
