//! Roles and ordered property whitelists.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse permission bucket describing how a requester relates to a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// An ordered whitelist of property names.
///
/// Duplicates are dropped on construction; the first occurrence keeps its
/// position. Serialized output follows this order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct PropertySet {
    names: Vec<String>,
}

impl PropertySet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for name in names {
            let name = name.into();
            if !set.contains(&name) {
                set.names.push(name);
            }
        }
        set
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Names present in both sets, in `self`'s order.
    ///
    /// The result is always a subset of `self`; nothing outside `self` can be
    /// introduced by `other`.
    pub fn intersect(&self, other: &PropertySet) -> PropertySet {
        Self {
            names: self
                .names
                .iter()
                .filter(|n| other.contains(n))
                .cloned()
                .collect(),
        }
    }
}

impl From<Vec<String>> for PropertySet {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl From<PropertySet> for Vec<String> {
    fn from(set: PropertySet) -> Self {
        set.names
    }
}

impl<S: Into<String>> FromIterator<S> for PropertySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
