//! Path parameters captured by a route match.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ContextError;

/// A single captured parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    key: Arc<str>,
    value: String,
}

impl Param {
    /// Parameter name as declared in the route pattern.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Captured value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Ordered path parameters, in declaration order of the route pattern.
///
/// Routes carry a handful of parameters at most, so lookups scan linearly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    params: Vec<Param>,
}

impl Params {
    /// Creates new empty params.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    pub fn push(&mut self, key: impl Into<Arc<str>>, value: impl Into<String>) {
        self.params.push(Param {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Gets a parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| &*p.key == key)
            .map(|p| p.value.as_str())
    }

    /// Gets a parameter value or returns an error.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::MissingParam`] if the route has no such parameter.
    pub fn require(&self, key: &str) -> Result<&str, ContextError> {
        self.get(key)
            .ok_or_else(|| ContextError::MissingParam(key.to_string()))
    }

    /// Parses a parameter as a specific type.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::MissingParam`] when absent and
    /// [`ContextError::InvalidParam`] when the value does not parse.
    pub fn parse<T: FromStr>(&self, key: &str) -> Result<T, ContextError> {
        let value = self.require(key)?;
        value.parse().map_err(|_| ContextError::InvalidParam {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Returns an iterator over `(key, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|p| (p.key(), p.value()))
    }

    /// Number of captured parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true when nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Removes all parameters, keeping the allocation.
    pub fn clear(&mut self) {
        self.params.clear();
    }

    /// Copies the parameters into a map, e.g. for [`PathPattern::reverse`].
    ///
    /// [`PathPattern::reverse`]: crate::PathPattern::reverse
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.params.truncate(len);
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}
