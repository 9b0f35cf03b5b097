//! Path pattern parsing.

use std::collections::HashMap;

use crate::error::{Result, RouteError};

/// A segment in a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Literal text, matched verbatim. May span several `/`-separated parts.
    Literal(String),
    /// A parameter segment (e.g., `:id`), matching up to the next `/`.
    Param(String),
    /// A wildcard segment (e.g., `*filepath`), matching the rest of the path.
    Wildcard(String),
}

/// A validated route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    /// The original pattern string.
    pattern: String,
    /// Parsed segments, in declaration order.
    segments: Vec<PathSegment>,
    /// Parameter and wildcard names in order.
    param_names: Vec<String>,
}

impl PathPattern {
    /// Parses a path pattern string.
    ///
    /// Pattern syntax:
    /// - `/users` - Literal path
    /// - `/users/:id` - Path with parameter
    /// - `/files/*path` - Wildcard (matches rest of path, must be last)
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPath`] when the pattern is empty or does
    /// not start with `/`, and [`RouteError::InvalidPattern`] for misplaced
    /// markers, empty or duplicate names, and wildcards that are not final.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_web::PathPattern;
    ///
    /// let pattern = PathPattern::parse("/posts/:id/comments/:comment_id").unwrap();
    /// assert_eq!(pattern.param_names(), ["id", "comment_id"]);
    /// ```
    pub fn parse(pattern: &str) -> Result<Self> {
        if !pattern.starts_with('/') {
            return Err(RouteError::InvalidPath(pattern.to_string()));
        }

        let invalid = |reason: &str| RouteError::InvalidPattern {
            path: pattern.to_string(),
            reason: reason.to_string(),
        };

        let bytes = pattern.as_bytes();
        let mut segments = Vec::new();
        let mut param_names: Vec<String> = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            let marker = bytes[i];
            if marker != b':' && marker != b'*' {
                i += 1;
                continue;
            }
            // bytes[0] is '/', so i > 0 here
            if bytes[i - 1] != b'/' {
                return Err(invalid("':' and '*' must directly follow '/'"));
            }
            if literal_start < i {
                segments.push(PathSegment::Literal(pattern[literal_start..i].to_string()));
            }

            let name_start = i + 1;
            let name_end = pattern[name_start..]
                .find('/')
                .map_or(bytes.len(), |n| name_start + n);
            let name = &pattern[name_start..name_end];

            if name.is_empty() {
                return Err(invalid("empty parameter name"));
            }
            if name.contains([':', '*']) {
                return Err(invalid("parameter name may not contain ':' or '*'"));
            }
            if marker == b'*' && name_end != bytes.len() {
                return Err(invalid("wildcard must be the final segment"));
            }
            if param_names.iter().any(|n| n == name) {
                return Err(invalid("duplicate parameter name"));
            }

            param_names.push(name.to_string());
            segments.push(if marker == b'*' {
                PathSegment::Wildcard(name.to_string())
            } else {
                PathSegment::Param(name.to_string())
            });

            i = name_end;
            literal_start = name_end;
        }

        if literal_start < bytes.len() {
            segments.push(PathSegment::Literal(pattern[literal_start..].to_string()));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
            param_names,
        })
    }

    /// Returns the original pattern string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the parameter names.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Generates a path from parameters.
    ///
    /// Returns `None` when a parameter is missing.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use oxide_web::PathPattern;
    ///
    /// let pattern = PathPattern::parse("/posts/:id").unwrap();
    /// let params: HashMap<String, String> =
    ///     [("id".to_string(), "123".to_string())]
    ///     .into_iter()
    ///     .collect();
    /// assert_eq!(pattern.reverse(&params).as_deref(), Some("/posts/123"));
    /// ```
    #[must_use]
    pub fn reverse(&self, params: &HashMap<String, String>) -> Option<String> {
        let mut path = String::with_capacity(self.pattern.len());

        for segment in &self.segments {
            match segment {
                PathSegment::Literal(s) => path.push_str(s),
                PathSegment::Param(name) | PathSegment::Wildcard(name) => {
                    path.push_str(params.get(name)?);
                }
            }
        }

        Some(path)
    }
}
