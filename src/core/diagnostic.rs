//! Accumulated entity-level problems.
//!
//! A resolver run never stops at the first bad file. Every stage pushes
//! [`Diagnostic`]s into its own [`Diagnostics`] collection; collections from
//! parallel workers are merged once the workers finish and sorted so that two
//! runs over the same repository print identical reports.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::ErrorKind;

/// One problem tied to a file and an identifier inside the repository.
///
/// Field order is the sort order: file, then identifier, then kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Diagnostic {
    /// Offending file, relative to the repository root
    pub file: PathBuf,
    /// Offending identifier (constellation, cluster, application or variable)
    pub subject: String,
    /// Taxonomy category
    pub kind: ErrorKind,
    /// Human-readable explanation
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: ErrorKind,
        file: impl Into<PathBuf>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            subject: subject.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn structure(
        file: impl Into<PathBuf>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Structure, file, subject, message)
    }

    pub fn reference(
        file: impl Into<PathBuf>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Reference, file, subject, message)
    }

    pub fn duplicate(
        file: impl Into<PathBuf>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Duplicate, file, subject, message)
    }

    pub fn unresolved(
        file: impl Into<PathBuf>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::UnresolvedVariable, file, subject, message)
    }

    /// Rewrite `file` relative to `root` when it lies beneath it.
    #[must_use]
    pub fn relative_to(mut self, root: &Path) -> Self {
        if let Ok(relative) = self.file.strip_prefix(root) {
            self.file = relative.to_path_buf();
        }
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}: {}", self.kind, self.file.display(), self.subject, self.message)
    }
}

/// An append-only collection of [`Diagnostic`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Merge another collection into this one.
    pub fn merge(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    /// Whether any entry has the given kind.
    #[must_use]
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.entries.iter().any(|d| d.kind == kind)
    }

    /// Sort entries and drop exact repeats.
    pub fn normalize(&mut self) {
        self.entries.sort();
        self.entries.dedup();
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}
