//! Variable interpolation for application parameters.
//!
//! The only recognised expression is
//!
//! ```text
//! {{ variables.<identifier> }}
//! ```
//!
//! where `<identifier>` matches `[A-Za-z0-9_]+` and whitespace is allowed
//! between the braces and the path. Anything else between `{{` and `}}` is
//! rejected, as is a `{{` without a closing `}}`. There are no filters,
//! functions or control flow: substitution cannot execute anything.
//!
//! Tokens are substituted left to right and never overlap. Substituted text is
//! not scanned again. A variable whose value contains `{{` is rejected instead
//! of being inserted, so interpolated output never holds a token.
//!
//! # Textual form of values
//!
//! | Value | Inserted text |
//! |---|---|
//! | string | as is |
//! | number, boolean | YAML scalar form (`3`, `1.5`, `true`) |
//! | null | `null` |
//! | sequence, mapping | compact JSON |
//!
//! ```rust,no_run
//! use constellation_resolver::interpolation::interpolate_str;
//! use constellation_resolver::variables::{ScopeChain, ScopeOrigin, VariableScope};
//!
//! let vars: VariableScope =
//!     [("clusterName".to_string(), "cluster1".into())].into_iter().collect();
//! let mut chain = ScopeChain::new();
//! chain.push(ScopeOrigin::Cluster("cluster1".into()), &vars);
//!
//! let text = interpolate_str("db-{{ variables.clusterName }}", &chain.merge()).unwrap();
//! assert_eq!(text, "db-cluster1");
//! ```

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use strsim::levenshtein;
use thiserror::Error;

use crate::models::Value;
use crate::variables::MergedScope;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Maximum allowed Levenshtein distance as a percentage of the name length for suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

static TOKEN_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*variables\.([A-Za-z0-9_]+)\s*$").expect("token grammar is a valid regex")
});

/// A piece of a parsed string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Variable(&'a str),
}

/// Why a string could not be interpolated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("variable '{name}' is not defined in the cluster's scope{}", format_suggestions(.suggestions))]
    Unresolved {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("unsupported expression '{{{{{expression}}}}}'; only '{{{{ variables.<identifier> }}}}' is allowed")]
    Malformed {
        expression: String,
    },

    #[error("unterminated '{{{{' at byte {offset}")]
    Unterminated {
        offset: usize,
    },

    #[error("variable '{name}' expands to text containing '{{{{'; values are not interpolated again")]
    NestedToken {
        name: String,
    },
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean '{}'?)", suggestions.join("', '"))
    }
}

/// Whether `name` can be referenced from a token.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Whether `input` contains anything that looks like a token opener.
#[must_use]
pub fn contains_tokens(input: &str) -> bool {
    input.contains(OPEN)
}

/// Split `input` into literal text and variable references.
///
/// # Errors
///
/// Returns every malformed or unterminated token in the string.
pub fn parse(input: &str) -> Result<Vec<Segment<'_>>, Vec<TokenError>> {
    let mut segments = Vec::new();
    let mut errors = Vec::new();
    let mut pos = 0;

    while let Some(found) = input[pos..].find(OPEN) {
        let open = pos + found;
        if open > pos {
            segments.push(Segment::Literal(&input[pos..open]));
        }

        let body_start = open + OPEN.len();
        let Some(body_len) = input[body_start..].find(CLOSE) else {
            errors.push(TokenError::Unterminated {
                offset: open,
            });
            pos = input.len();
            break;
        };

        let body = &input[body_start..body_start + body_len];
        match TOKEN_BODY.captures(body).and_then(|c| c.get(1)) {
            Some(name) => segments.push(Segment::Variable(name.as_str())),
            None => errors.push(TokenError::Malformed {
                expression: body.trim().to_string(),
            }),
        }
        pos = body_start + body_len + CLOSE.len();
    }

    if pos < input.len() {
        segments.push(Segment::Literal(&input[pos..]));
    }

    if errors.is_empty() { Ok(segments) } else { Err(errors) }
}

/// Replace every token in `input` with its value from `scope`.
///
/// # Errors
///
/// Returns all syntax errors, or, for a well-formed string, every variable
/// missing from `scope` and every variable whose value holds `{{` (each name
/// reported once).
pub fn interpolate_str(input: &str, scope: &MergedScope) -> Result<String, Vec<TokenError>> {
    if !contains_tokens(input) {
        return Ok(input.to_string());
    }

    let segments = parse(input)?;
    let mut output = String::with_capacity(input.len());
    let mut missing = BTreeSet::new();
    let mut nested = BTreeSet::new();

    for segment in segments {
        match segment {
            Segment::Literal(text) => output.push_str(text),
            Segment::Variable(name) => match scope.get(name).map(render_value) {
                Some(rendered) if contains_tokens(&rendered) => {
                    nested.insert(name);
                }
                Some(rendered) => output.push_str(&rendered),
                None => {
                    missing.insert(name);
                }
            },
        }
    }

    if missing.is_empty() && nested.is_empty() {
        return Ok(output);
    }

    let available: Vec<&str> = scope.names().collect();
    let unresolved = missing.into_iter().map(|name| TokenError::Unresolved {
        name: name.to_string(),
        suggestions: find_similar_names(name, &available),
    });
    let nested = nested.into_iter().map(|name| TokenError::NestedToken {
        name: name.to_string(),
    });
    Err(unresolved.chain(nested).collect())
}

/// Interpolate every string leaf of `value`.
///
/// Mapping keys are left untouched. Non-string scalars pass through.
///
/// # Errors
///
/// Returns the errors of all leaves, not only the first failing one.
pub fn interpolate_value(value: &Value, scope: &MergedScope) -> Result<Value, Vec<TokenError>> {
    let mut errors = Vec::new();
    let result = interpolate_inner(value, scope, &mut errors);
    if errors.is_empty() { Ok(result) } else { Err(errors) }
}

fn interpolate_inner(value: &Value, scope: &MergedScope, errors: &mut Vec<TokenError>) -> Value {
    match value {
        Value::String(text) => match interpolate_str(text, scope) {
            Ok(rendered) => Value::String(rendered),
            Err(mut e) => {
                errors.append(&mut e);
                value.clone()
            }
        },
        Value::Sequence(items) => Value::Sequence(
            items.iter().map(|item| interpolate_inner(item, scope, errors)).collect(),
        ),
        Value::Mapping(mapping) => Value::Mapping(
            mapping
                .iter()
                .map(|(key, item)| (key.clone(), interpolate_inner(item, scope, errors)))
                .collect(),
        ),
        Value::Tagged(tagged) => {
            let mut tagged = tagged.as_ref().clone();
            tagged.value = interpolate_inner(&tagged.value, scope, errors);
            Value::Tagged(Box::new(tagged))
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
    }
}

/// Syntax errors in any string leaf of `value`, without resolving variables.
#[must_use]
pub fn check_syntax(value: &Value) -> Vec<TokenError> {
    let mut errors = Vec::new();
    visit_strings(value, &mut |text: &str| {
        if let Err(mut e) = parse(text) {
            errors.append(&mut e);
        }
    });
    errors
}

fn visit_strings(value: &Value, visit: &mut dyn FnMut(&str)) {
    match value {
        Value::String(text) => visit(text),
        Value::Sequence(items) => {
            for item in items {
                visit_strings(item, visit);
            }
        }
        Value::Mapping(mapping) => {
            for item in mapping.values() {
                visit_strings(item, visit);
            }
        }
        Value::Tagged(tagged) => visit_strings(&tagged.value, visit),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Natural textual form of a variable value.
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Null => "null".to_string(),
        Value::Tagged(tagged) => render_value(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => serde_json::to_string(value).unwrap_or_else(|_| {
            // non-string mapping keys have no JSON form
            serde_yaml::to_string(value).map(|s| s.trim_end().to_string()).unwrap_or_default()
        }),
    }
}

/// Closest candidates to `target` by edit distance, best first.
#[must_use]
pub fn find_similar_names(target: &str, available: &[&str]) -> Vec<String> {
    let mut scored: Vec<_> =
        available.iter().map(|name| (*name, levenshtein(target, name))).collect();
    scored.sort_by_key(|(_, distance)| *distance);

    scored
        .into_iter()
        .filter(|(_, distance)| *distance <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .take(3)
        .map(|(name, _)| name.to_string())
        .collect()
}
