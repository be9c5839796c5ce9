//! Directory operation types
//!
//! Search filters, scopes and raw entries exchanged with a directory reader.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How deep below the search base a directory search descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Only the base entry itself.
    Base,
    /// Direct children of the base.
    OneLevel,
    /// The base and everything below it.
    Subtree,
}

/// A directory entry as returned by a search.
///
/// Attribute names are compared case-insensitively, the way LDAP does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute name to all of its values.
    pub attributes: HashMap<String, Vec<String>>,
}

impl RawEntry {
    /// Create an entry with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    /// Add values for an attribute using builder pattern.
    #[must_use]
    pub fn with<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// All values of an attribute, or `None` if the attribute is absent.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// First value of an attribute.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// First non-empty value among several candidate attributes.
    pub fn first_of<'a>(&'a self, names: &[String]) -> Option<&'a str> {
        names
            .iter()
            .filter_map(|name| self.first(name))
            .find(|value| !value.trim().is_empty())
    }

    /// Check if an attribute exists.
    pub fn has(&self, name: &str) -> bool {
        self.values(name).is_some()
    }
}

/// Search filter, rendered to the directory's native syntax by the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    /// All filters must match.
    And { filters: Vec<Filter> },
    /// Any filter must match.
    Or { filters: Vec<Filter> },
    /// Filter must not match.
    Not { filter: Box<Filter> },
    /// Attribute equals value exactly (value is escaped).
    Equals { attribute: String, value: String },
    /// Attribute matches a wildcard pattern; `*` is kept, everything else is escaped.
    Matches { attribute: String, pattern: String },
    /// Attribute is present.
    Present { attribute: String },
    /// Pre-rendered native filter fragment supplied by the operator.
    Raw { expression: String },
}

impl Filter {
    /// Create an equality filter.
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a wildcard pattern filter.
    pub fn matches(attribute: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::Matches {
            attribute: attribute.into(),
            pattern: pattern.into(),
        }
    }

    /// Create a presence filter.
    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// Create a raw filter fragment.
    pub fn raw(expression: impl Into<String>) -> Self {
        Filter::Raw {
            expression: expression.into(),
        }
    }

    /// Create an AND filter.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    /// Create an OR filter.
    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    /// Create a NOT filter.
    pub fn negate(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// `(|(objectClass=a)(objectClass=b)...)`, collapsed when there is only one class.
    pub fn any_object_class<S: AsRef<str>>(classes: &[S]) -> Self {
        let mut filters: Vec<Filter> = classes
            .iter()
            .map(|class| Filter::eq("objectClass", class.as_ref()))
            .collect();
        if filters.len() == 1 {
            filters.remove(0)
        } else {
            Filter::or(filters)
        }
    }

    /// Combine with another filter using AND, flattening nested ANDs.
    #[must_use]
    pub fn and_with(self, other: Filter) -> Self {
        match self {
            Filter::And { mut filters } => {
                filters.push(other);
                Filter::And { filters }
            }
            _ => Filter::And {
                filters: vec![self, other],
            },
        }
    }
}
