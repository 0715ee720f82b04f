//! Error types for the resolver and ambient configuration facade.
//!
//! Structured errors with path/origin context and, where useful, an
//! actionable help message.

use std::fmt;

use crate::origin::Origin;

/// Result type alias for this crate's operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for this crate's operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Path in the config where the error occurred (e.g., "database.port")
    pub path: Option<String>,
    /// Origin of the value involved, if known
    pub origin: Option<Origin>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Error parsing YAML/JSON
    Parse,
    /// Error accessing a path that doesn't exist
    PathNotFound,
    /// A required `${...}` could not be resolved: missing key, or a cycle
    /// involving only required references.
    UnresolvedSubstitution,
    /// Concatenation pieces mixed across scalar/list/object categories.
    WrongType,
    /// I/O error (file not found, etc.)
    Io,
    /// Internal error: depth bound exceeded, a cycle marker pushed twice,
    /// or an unresolved value escaped with `allow_unresolved` off.
    BugOrBroken,
}

impl Error {
    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            path: None,
            origin: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create a path not found error
    pub fn path_not_found(path: impl Into<String>) -> Self {
        let path_str = path.into();
        Self {
            kind: ErrorKind::PathNotFound,
            path: Some(path_str.clone()),
            origin: None,
            help: Some(format!(
                "Check that '{}' exists in the configuration",
                path_str
            )),
            cause: None,
        }
    }

    /// Create an unresolved-substitution error, with the reference chain
    /// that led to it (empty if it's a plain missing-key case, not a cycle).
    pub fn unresolved_substitution(
        path: impl Into<String>,
        origin: Origin,
        trace: Vec<String>,
    ) -> Self {
        let path_str = path.into();
        let cause = if trace.is_empty() {
            None
        } else {
            Some(format!("Trace: {}", trace.join(" -> ")))
        };
        Self {
            kind: ErrorKind::UnresolvedSubstitution,
            path: Some(path_str.clone()),
            origin: Some(origin),
            help: Some(format!(
                "Define '{}' somewhere in the configuration, mark it optional with \
                 '${{?{}}}', or enable allow_unresolved",
                path_str, path_str
            )),
            cause,
        }
    }

    /// Create a wrong-type error for a mismatched concatenation.
    pub fn wrong_type(
        origin: Origin,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::WrongType,
            path: None,
            origin: Some(origin),
            help: Some(
                "Concatenation pieces must all resolve to the same category \
                 (object, list, or scalar)"
                    .to_string(),
            ),
            cause: Some(format!("expected {}, got {}", expected.into(), got.into())),
        }
    }

    /// Create an I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Io,
            path: None,
            origin: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an internal/invariant-violation error.
    pub fn bug(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::BugOrBroken,
            path: None,
            origin: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add origin context to the error
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Parse => write!(f, "Parse error")?,
            ErrorKind::PathNotFound => write!(f, "Path not found")?,
            ErrorKind::UnresolvedSubstitution => write!(f, "Unresolved substitution")?,
            ErrorKind::WrongType => write!(f, "Wrong type in concatenation")?,
            ErrorKind::Io => write!(f, "I/O error")?,
            ErrorKind::BugOrBroken => write!(f, "Internal error")?,
        }

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(origin) = &self.origin {
            write!(f, "\n  At: {}", origin)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::parse(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::parse(e.to_string())
    }
}
