//! Dotted key paths, as used by substitution expressions and object lookup.
//!
//! A `Path` is a non-empty, immutable sequence of string segments. Equality
//! is structural. This module deliberately does not implement HOCON's
//! quoted-key rendering rules (`"a.b".c`) — that belongs to the parser and
//! to text serialization, both out of scope here (spec.md §4.2).

use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Build a path from segments. Fails if `segments` is empty: a `Path`
    /// is never allowed to be empty per spec.md §3.
    pub fn new(segments: Vec<String>) -> Result<Self> {
        if segments.is_empty() {
            return Err(Error::parse("path must have at least one segment"));
        }
        Ok(Self { segments })
    }

    /// Convenience constructor splitting on `.`. Does not handle quoted
    /// keys containing literal dots — that is a parser concern.
    pub fn parse(s: &str) -> Result<Self> {
        let segments: Vec<String> = s.split('.').map(String::from).collect();
        Self::new(segments)
    }

    pub fn single(segment: impl Into<String>) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    pub fn first(&self) -> &str {
        &self.segments[0]
    }

    pub fn length(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Everything after the first segment, or `None` if this path has only one.
    pub fn remainder(&self) -> Option<Path> {
        if self.segments.len() <= 1 {
            None
        } else {
            Some(Path {
                segments: self.segments[1..].to_vec(),
            })
        }
    }

    /// Drops the first `n` segments. `None` if that would leave it empty.
    pub fn sub_path(&self, n: usize) -> Option<Path> {
        if n >= self.segments.len() {
            None
        } else if n == 0 {
            Some(self.clone())
        } else {
            Some(Path {
                segments: self.segments[n..].to_vec(),
            })
        }
    }

    pub fn prepend(&self, other: &Path) -> Path {
        let mut segments = other.segments.clone();
        segments.extend(self.segments.iter().cloned());
        Path { segments }
    }

    pub fn starts_with(&self, other: &Path) -> bool {
        other.segments.len() <= self.segments.len()
            && self.segments[..other.segments.len()] == other.segments[..]
    }

    /// Dotted rendering, used for error messages and as the environment
    /// variable fallback key (joined with `_`, see resolver.rs).
    pub fn render(&self) -> String {
        self.segments.join(".")
    }

    pub fn env_key(&self) -> String {
        self.segments.join("_")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
