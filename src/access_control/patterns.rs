//! Path pattern matching for access control
//!
//! Patterns follow servlet mapping conventions:
//!
//! - `/reports/summary` matches exactly that path
//! - `/api/*/admin` matches one arbitrary segment where `*` stands
//! - `/admin/*` matches `/admin` and everything below it
//! - `*.jsf` matches any path ending in that extension
//! - `/*` matches every path
//!
//! When several patterns match, the most specific one governs the request:
//! exact, then segment wildcard, then prefix, then extension, then default.
//! Within a class, longer literal text wins.

use crate::error::ConfigError;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

/// A compiled path pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    kind: PatternKind,
}

#[derive(Debug, Clone)]
enum PatternKind {
    Exact,
    Wildcard {
        regex: Regex,
        literal_len: usize,
        /// Segments before any trailing `/*`
        segments: Vec<String>,
        /// Whether the pattern ends in `/*`
        trailing: bool,
    },
    Prefix { prefix: String },
    Extension { suffix: String },
    Default,
}

/// Ranking used to pick the governing rule among several matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    class: u8,
    literal_len: usize,
}

impl PathPattern {
    /// Parse and compile a pattern
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let source = pattern.trim();

        if source.is_empty() {
            return Err(ConfigError::invalid_pattern(pattern, "pattern is empty"));
        }

        if source == "/*" || source == "*" {
            return Ok(Self {
                source: "/*".to_string(),
                kind: PatternKind::Default,
            });
        }

        if let Some(ext) = source.strip_prefix("*.") {
            if ext.is_empty() || ext.contains('/') || ext.contains('*') {
                return Err(ConfigError::invalid_pattern(
                    pattern,
                    "extension patterns take the form '*.ext'",
                ));
            }
            return Ok(Self {
                source: source.to_string(),
                kind: PatternKind::Extension {
                    suffix: format!(".{}", ext),
                },
            });
        }

        if !source.starts_with('/') {
            return Err(ConfigError::invalid_pattern(pattern, "must start with '/'"));
        }

        let segments: Vec<&str> = source[1..].split('/').collect();
        for segment in &segments {
            if segment.contains('*') && *segment != "*" {
                return Err(ConfigError::invalid_pattern(
                    pattern,
                    "'*' must occupy a whole path segment",
                ));
            }
        }

        let wildcards = segments.iter().filter(|s| **s == "*").count();
        let trailing_wildcard = segments.last() == Some(&"*");

        let kind = match (wildcards, trailing_wildcard) {
            (0, _) => PatternKind::Exact,
            (1, true) => PatternKind::Prefix {
                prefix: source[..source.len() - 2].to_string(),
            },
            _ => Self::compile_wildcard(pattern, &segments, trailing_wildcard)?,
        };

        Ok(Self {
            source: source.to_string(),
            kind,
        })
    }

    fn compile_wildcard(
        pattern: &str,
        segments: &[&str],
        trailing_wildcard: bool,
    ) -> Result<PatternKind, ConfigError> {
        let body = if trailing_wildcard {
            &segments[..segments.len() - 1]
        } else {
            segments
        };

        let mut expr = String::from("^");
        let mut literal_len = 0;
        for segment in body {
            expr.push('/');
            if *segment == "*" {
                expr.push_str("[^/]+");
            } else {
                expr.push_str(&regex::escape(segment));
                literal_len += segment.len() + 1;
            }
        }
        if trailing_wildcard {
            expr.push_str("(?:/.*)?");
        }
        expr.push('$');

        let regex = Regex::new(&expr)
            .map_err(|e| ConfigError::invalid_pattern(pattern, e.to_string()))?;

        Ok(PatternKind::Wildcard {
            regex,
            literal_len,
            segments: body.iter().map(|s| s.to_string()).collect(),
            trailing: trailing_wildcard,
        })
    }

    /// Check if a servlet path matches this pattern
    pub fn matches(&self, path: &str) -> bool {
        match &self.kind {
            PatternKind::Exact => path == self.source,
            PatternKind::Wildcard { regex, .. } => regex.is_match(path),
            PatternKind::Prefix { prefix } => {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            PatternKind::Extension { suffix } => {
                let last = path.rsplit('/').next().unwrap_or(path);
                last.len() > suffix.len() && last.ends_with(suffix.as_str())
            }
            PatternKind::Default => true,
        }
    }

    pub fn specificity(&self) -> Specificity {
        match &self.kind {
            PatternKind::Exact => Specificity {
                class: 4,
                literal_len: self.source.len(),
            },
            PatternKind::Wildcard { literal_len, .. } => Specificity {
                class: 3,
                literal_len: *literal_len,
            },
            PatternKind::Prefix { prefix } => Specificity {
                class: 2,
                literal_len: prefix.len(),
            },
            PatternKind::Extension { suffix } => Specificity {
                class: 1,
                literal_len: suffix.len(),
            },
            PatternKind::Default => Specificity {
                class: 0,
                literal_len: 0,
            },
        }
    }

    /// Whether both patterns rank equally and some path matches both.
    ///
    /// Only segment wildcards can do this with different sources: two
    /// prefixes, extensions or exact paths of equal rank never share a path.
    pub fn is_ambiguous_with(&self, other: &PathPattern) -> bool {
        if self.specificity() != other.specificity() {
            return false;
        }

        match (&self.kind, &other.kind) {
            (
                PatternKind::Wildcard {
                    segments: a,
                    trailing: a_trailing,
                    ..
                },
                PatternKind::Wildcard {
                    segments: b,
                    trailing: b_trailing,
                    ..
                },
            ) => {
                let compatible = a
                    .iter()
                    .zip(b)
                    .all(|(x, y)| x == y || x == "*" || y == "*");
                compatible
                    && match a.len().cmp(&b.len()) {
                        Ordering::Equal => true,
                        Ordering::Less => *a_trailing,
                        Ordering::Greater => *b_trailing,
                    }
            }
            _ => self.source == other.source,
        }
    }

    /// Whether this is the catch-all `/*` pattern
    pub fn is_default(&self) -> bool {
        matches!(self.kind, PatternKind::Default)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Order patterns from most to least specific
    pub fn cmp_specificity(&self, other: &PathPattern) -> Ordering {
        other.specificity().cmp(&self.specificity())
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for PathPattern {}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
