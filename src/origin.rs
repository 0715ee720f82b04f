//! Diagnostic origin handles attached to every configuration value.
//!
//! An `Origin` is opaque to the resolver: it never influences resolution,
//! only what gets printed when something goes wrong. The parser (out of
//! scope here) is expected to stamp one onto every value it produces.

use std::fmt;

/// Where a value came from, for error messages and traces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    /// File path, or a description like "memory" / "string" for in-process trees.
    pub description: String,
    pub line: Option<usize>,
}

impl Origin {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            line: None,
        }
    }

    pub fn at_line(description: impl Into<String>, line: usize) -> Self {
        Self {
            description: description.into(),
            line: Some(line),
        }
    }

    /// An origin for values that were never read from anything on disk.
    pub fn unknown() -> Self {
        Self::new("<unknown>")
    }

    pub fn with_line(&self, line: usize) -> Self {
        Self {
            description: self.description.clone(),
            line: Some(line),
        }
    }
}

impl Default for Origin {
    fn default() -> Self {
        Origin::unknown()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        Ok(())
    }
}
