//! Error types for the local library.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from history and playlist persistence.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Reading or writing a library file failed.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A library file could not be serialized.
    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No playlist or video matches the given id.
    #[error("no {kind} matches id '{id}'")]
    NotFound { kind: &'static str, id: String },

    /// An id prefix matches more than one entry.
    #[error("id prefix '{prefix}' matches {count} entries")]
    AmbiguousId { prefix: String, count: usize },

    /// Playlist names must contain something other than whitespace.
    #[error("playlist name must not be empty")]
    EmptyName,
}

impl LibraryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Resolves a full id or a unique id prefix against `ids`.
pub(crate) fn resolve_id<'a, I>(
    kind: &'static str,
    ids: I,
    prefix: &str,
) -> Result<String, LibraryError>
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Err(LibraryError::not_found(kind, prefix));
    }
    let matches: Vec<&str> = ids.into_iter().filter(|id| id.starts_with(prefix)).collect();
    if let Some(exact) = matches.iter().find(|id| **id == prefix) {
        return Ok((*exact).to_string());
    }
    match matches.as_slice() {
        [] => Err(LibraryError::not_found(kind, prefix)),
        [only] => Ok((*only).to_string()),
        many => Err(LibraryError::AmbiguousId {
            prefix: prefix.to_string(),
            count: many.len(),
        }),
    }
}
