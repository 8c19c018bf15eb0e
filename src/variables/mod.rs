//! Variable scopes and the inheritance chain.
//!
//! Every cluster sees an ordered list of scope levels, outermost first:
//!
//! 1. repository defaults (only when configured)
//! 2. its constellation's `variables` (only for constellation members)
//! 3. its own `variables`
//!
//! [`ScopeChain::merge`] folds the list left to right, so a key defined in a
//! later level replaces the same key from an earlier one. Values are replaced
//! whole; nested mappings are not merged key by key. The merged result
//! remembers which level supplied each value, which `constellation vars`
//! prints.
//!
//! ```rust,no_run
//! use constellation_resolver::variables::{ScopeChain, ScopeOrigin, VariableScope};
//!
//! let constellation: VariableScope =
//!     [("env".to_string(), "production".into())].into_iter().collect();
//! let cluster: VariableScope = [("env".to_string(), "staging".into())].into_iter().collect();
//!
//! let mut chain = ScopeChain::new();
//! chain.push(ScopeOrigin::Constellation("c1".into()), &constellation);
//! chain.push(ScopeOrigin::Cluster("cluster1".into()), &cluster);
//!
//! let merged = chain.merge();
//! assert_eq!(merged.get("env").and_then(|v| v.as_str()), Some("staging"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use crate::hierarchy::{ClusterId, Hierarchy};
use crate::models::Value;

/// Mapping from variable name to value, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableScope {
    values: BTreeMap<String, Value>,
}

impl VariableScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.values.iter()
    }

    #[must_use]
    pub const fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

impl From<BTreeMap<String, Value>> for VariableScope {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self {
            values,
        }
    }
}

impl FromIterator<(String, Value)> for VariableScope {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a VariableScope {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// The level of the chain a scope belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "name", rename_all = "lowercase")]
pub enum ScopeOrigin {
    /// Repository-wide defaults from the resolver configuration
    Defaults,
    /// A constellation's `variables`
    Constellation(String),
    /// A cluster's own `variables`
    Cluster(String),
}

impl fmt::Display for ScopeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defaults => f.write_str("defaults"),
            Self::Constellation(name) => write!(f, "constellation {name}"),
            Self::Cluster(name) => write!(f, "cluster {name}"),
        }
    }
}

/// One level of a [`ScopeChain`].
#[derive(Debug, Clone)]
pub struct ScopeLevel<'a> {
    pub origin: ScopeOrigin,
    pub scope: &'a VariableScope,
}

/// Ordered scope levels, outermost first.
#[derive(Debug, Clone, Default)]
pub struct ScopeChain<'a> {
    levels: Vec<ScopeLevel<'a>>,
}

impl<'a> ScopeChain<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a level that overrides every level pushed before it.
    pub fn push(&mut self, origin: ScopeOrigin, scope: &'a VariableScope) {
        self.levels.push(ScopeLevel {
            origin,
            scope,
        });
    }

    #[must_use]
    pub fn levels(&self) -> &[ScopeLevel<'a>] {
        &self.levels
    }

    /// Fold the chain into one scope; the innermost definition of a key wins.
    #[must_use]
    pub fn merge(&self) -> MergedScope {
        let mut merged = MergedScope::default();
        for level in &self.levels {
            for (name, value) in level.scope {
                merged.entries.insert(
                    name.clone(),
                    ResolvedVariable {
                        value: value.clone(),
                        origin: level.origin.clone(),
                    },
                );
            }
        }
        merged
    }
}

/// A merged variable together with the level that supplied it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedVariable {
    pub value: Value,
    pub origin: ScopeOrigin,
}

/// The flattened result of a [`ScopeChain`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MergedScope {
    entries: BTreeMap<String, ResolvedVariable>,
}

impl MergedScope {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).map(|entry| &entry.value)
    }

    #[must_use]
    pub fn origin(&self, name: &str) -> Option<&ScopeOrigin> {
        self.entries.get(name).map(|entry| &entry.origin)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ResolvedVariable> {
        self.entries.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Values without provenance.
    #[must_use]
    pub fn values(&self) -> BTreeMap<String, Value> {
        self.entries.iter().map(|(name, entry)| (name.clone(), entry.value.clone())).collect()
    }
}

/// Build the scope chain of a cluster from the hierarchy.
#[must_use]
pub fn scope_chain(hierarchy: &Hierarchy, id: ClusterId) -> ScopeChain<'_> {
    let cluster = hierarchy.cluster(id);
    let mut chain = ScopeChain::new();

    if let Some(defaults) = hierarchy.defaults() {
        chain.push(ScopeOrigin::Defaults, defaults);
    }
    if let Some(parent) = cluster.constellation {
        let constellation = hierarchy.constellation(parent);
        chain.push(
            ScopeOrigin::Constellation(constellation.name.clone()),
            &constellation.variables,
        );
    }
    chain.push(ScopeOrigin::Cluster(cluster.name.clone()), &cluster.variables);
    chain
}

/// Merged variables of a cluster.
#[must_use]
pub fn resolve_scope(hierarchy: &Hierarchy, id: ClusterId) -> MergedScope {
    scope_chain(hierarchy, id).merge()
}
