//! Core types shared by every stage of the resolver
//!
//! # Modules
//!
//! - `error` - [`ResolverError`] for run-level failures, [`ErrorKind`] taxonomy,
//!   [`ErrorContext`] and [`user_friendly_error`] for CLI output
//! - `diagnostic` - [`Diagnostic`] / [`Diagnostics`] for accumulated entity-level problems
//! - `signal` - [`RunSignal`] / [`CancelHandle`] for cancellation and deadlines
//!
//! # Error Handling Pattern
//!
//! Stages return `Result<_, ResolverError>` only for failures that invalidate the
//! whole run (cancellation, missing repository root). Everything tied to a single
//! entity becomes a [`Diagnostic`] and the stage keeps going.
//!
//! ```rust,no_run
//! use constellation_resolver::core::{Diagnostic, Diagnostics, ErrorKind};
//!
//! let mut diagnostics = Diagnostics::new();
//! let file = "environments/constellations/c1/constellation.yaml";
//! diagnostics.push(Diagnostic::structure(file, "c1", "missing file"));
//! assert!(diagnostics.has_kind(ErrorKind::Structure));
//! ```

pub mod diagnostic;
pub mod error;
pub mod signal;

pub use diagnostic::{Diagnostic, Diagnostics};
pub use error::{
    EXIT_FAILURE, EXIT_VALIDATION, ErrorContext, ErrorKind, ResolverError, exit_code_for,
    user_friendly_error,
};
pub use signal::{CancelHandle, RunSignal};
