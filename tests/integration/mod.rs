//! Integration test suite for the constellation resolver
//!
//! End-to-end tests that build repositories in temporary directories and run
//! either the library pipeline or the `constellation` binary against them.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **pipeline**: library-level resolution, scope merging and failure isolation
//! - **resolve**: `constellation resolve` output, formats and exit codes
//! - **validate**: `constellation validate` text and JSON reports
//! - **vars**: `constellation vars` scope provenance
//! - **config**: configuration file and flag overrides

#[path = "../common/mod.rs"]
mod common;

mod config;
mod pipeline;
mod resolve;
mod validate;
mod vars;
