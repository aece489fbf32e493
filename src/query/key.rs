// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Resource keys used for cache lookup and request deduplication.

use std::fmt;

/// Logical server resource, expressed as its request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Join key segments into a path.
    ///
    /// The first segment is taken verbatim (it is normally a route such as
    /// `/api/groups`); every later segment is percent-encoded so ids cannot
    /// inject extra path components.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        let mut path = String::new();
        for (i, segment) in segments.iter().enumerate() {
            let segment = segment.as_ref();
            if i == 0 {
                path.push_str(segment.trim_end_matches('/'));
            } else {
                path.push('/');
                path.push_str(&urlencoding::encode(segment));
            }
        }
        Self(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryKey {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
