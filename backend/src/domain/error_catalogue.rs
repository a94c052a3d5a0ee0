//! Read-only catalogue mapping database error codes to client-facing text.
//!
//! The catalogue is keyed by SQLSTATE and loaded once at startup, either from
//! the definitions bundled into the binary or from a file supplied by the
//! operator. It is immutable afterwards and shared behind an `Arc`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

/// Definitions compiled into the binary.
pub const EMBEDDED_CATALOGUE: &str = include_str!("../../resources/errors.json");

/// Key of the entry returned when no SQLSTATE matches.
pub const FALLBACK_KEY: &str = "500";

const SQLSTATE_PATTERN: &str = r"^(.*)\(SQLSTATE (.*)\).*$";

/// Description and HTTP status associated with one database error code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogueEntry {
    /// Client-facing description.
    pub description: String,
    /// Suggested HTTP status.
    pub status_code: u16,
}

impl CatalogueEntry {
    fn internal() -> Self {
        Self {
            description: "Internal Server Error".to_owned(),
            status_code: 500,
        }
    }
}

/// Failures while loading catalogue definitions.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    /// The definitions file could not be read.
    #[error("failed to read error catalogue at {path}: {source}")]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The definitions are not a JSON object of catalogue entries.
    #[error("failed to parse error catalogue: {0}")]
    Parse(#[from] serde_json::Error),
    /// The SQLSTATE matcher failed to compile.
    #[error("invalid SQLSTATE pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// SQLSTATE → [`CatalogueEntry`] lookup table.
///
/// # Examples
/// ```
/// use template_api::domain::ErrorCatalogue;
///
/// let catalogue = ErrorCatalogue::embedded().expect("bundled catalogue parses");
/// let entry = catalogue.resolve("duplicate key (SQLSTATE 23505)");
/// assert_eq!(entry.status_code, 409);
/// ```
#[derive(Debug, Clone)]
pub struct ErrorCatalogue {
    entries: HashMap<String, CatalogueEntry>,
    fallback: CatalogueEntry,
    sqlstate: Regex,
}

impl ErrorCatalogue {
    /// Parse catalogue definitions from JSON text.
    ///
    /// # Errors
    /// Returns [`CatalogueError::Parse`] when the text is not a JSON object of
    /// entries.
    pub fn from_json_str(text: &str) -> Result<Self, CatalogueError> {
        let entries: HashMap<String, CatalogueEntry> = serde_json::from_str(text)?;
        let fallback = entries
            .get(FALLBACK_KEY)
            .cloned()
            .unwrap_or_else(CatalogueEntry::internal);
        let sqlstate = Regex::new(SQLSTATE_PATTERN)?;
        Ok(Self {
            entries,
            fallback,
            sqlstate,
        })
    }

    /// Load the definitions bundled into the binary.
    ///
    /// # Errors
    /// Returns [`CatalogueError::Parse`] if the bundled file is malformed.
    pub fn embedded() -> Result<Self, CatalogueError> {
        Self::from_json_str(EMBEDDED_CATALOGUE)
    }

    /// Load definitions from `path`.
    ///
    /// # Errors
    /// Returns [`CatalogueError::Io`] when the file cannot be read and
    /// [`CatalogueError::Parse`] when its contents are malformed.
    pub fn from_path(path: &Path) -> Result<Self, CatalogueError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogueError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Load from `path` when given, otherwise from the bundled definitions.
    ///
    /// # Errors
    /// Propagates [`ErrorCatalogue::from_path`] and
    /// [`ErrorCatalogue::embedded`] failures.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogueError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::embedded(),
        }
    }

    /// Extract the SQLSTATE from a driver message such as
    /// `"... (SQLSTATE 23505)"`.
    #[must_use]
    pub fn sqlstate<'m>(&self, message: &'m str) -> Option<&'m str> {
        self.sqlstate
            .captures(message)
            .and_then(|captures| captures.get(2))
            .map(|code| code.as_str())
    }

    /// Entry for the SQLSTATE carried by `message`, or the fallback entry.
    #[must_use]
    pub fn resolve(&self, message: &str) -> &CatalogueEntry {
        self.sqlstate(message)
            .and_then(|code| self.entries.get(code))
            .unwrap_or(&self.fallback)
    }

    /// Entry for an exact SQLSTATE.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&CatalogueEntry> {
        self.entries.get(code)
    }

    /// Number of codes defined.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no codes are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
