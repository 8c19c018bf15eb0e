//! Constellation resolver
//!
//! Turns a hierarchical GitOps repository (templates, constellations, clusters
//! and applications) into a flat, sorted list of [`ResolvedApplication`]s, each
//! bound to one cluster, one template and fully-interpolated parameters.
//!
//! # Repository Layout
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
//! # Pipeline
//!
//! 1. [`scanner`] reads every document concurrently into typed models
//! 2. [`hierarchy`] checks constellation membership and identifiers and builds
//!    an immutable arena
//! 3. [`variables`] merges each cluster's scope chain, innermost level wins
//! 4. [`interpolation`] expands `{{ variables.<name> }}` tokens
//! 5. [`materializer`] attaches shared then local applications to every
//!    cluster and interpolates their parameters
//! 6. [`validator`] supplies the structural and referential checks used by the
//!    stages above
//!
//! [`resolver::Resolver`] runs the whole pipeline. Problems with individual
//! files are collected as [`core::Diagnostic`]s and reported together. A
//! cluster with any problem, or one left out of the hierarchy, contributes no
//! resolved applications; healthy clusters are unaffected. The `resolve`
//! command only writes records when the whole repository is clean.
//!
//! # Supporting Modules
//!
//! - [`cli`] - `resolve`, `validate` and `vars` commands
//! - [`config`] - optional TOML configuration
//! - [`constants`] - layout names and tuning defaults
//! - [`core`] - errors, diagnostics and cancellation
//! - [`models`] - document schemas and output records
//! - [`utils`] - retrying, cancellable filesystem reads
//!
//! [`ResolvedApplication`]: models::ResolvedApplication

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod hierarchy;
pub mod interpolation;
pub mod materializer;
pub mod models;
pub mod resolver;
pub mod scanner;
pub mod utils;
pub mod validator;
pub mod variables;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
