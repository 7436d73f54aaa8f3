//! Per-unit extraction errors.
//!
//! A malformed source file or manifest is reported and skipped; the rest of
//! the run continues and nothing already recorded in the graph is touched.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// An input unit that could not be turned into facts.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{}: {message} ({kind})", path.display())]
pub struct ExtractionError {
    pub path: PathBuf,
    pub kind: ExtractionErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionErrorKind {
    // ── Input problems ──────────────────────────────────────
    /// Source has syntax errors the parser could not recover from.
    Parse,
    /// Content is not valid UTF-8.
    Utf8,
    /// Build manifest could not be read as TOML or JSON.
    Manifest,

    // ── Internal problems ───────────────────────────────────
    /// Could not read the file, or the parser pool failed.
    Read,
}

impl std::fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse => write!(f, "parse failed"),
            Self::Utf8 => write!(f, "encoding error"),
            Self::Manifest => write!(f, "invalid manifest"),
            Self::Read => write!(f, "read error"),
        }
    }
}

impl ExtractionErrorKind {
    /// Problems with the analyzed sources that their owner can fix.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Parse | Self::Utf8 | Self::Manifest)
    }
}

impl ExtractionError {
    #[must_use]
    pub fn new(path: PathBuf, kind: ExtractionErrorKind, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn parse_failed(path: PathBuf, message: impl Into<String>) -> Self {
        Self::new(path, ExtractionErrorKind::Parse, message)
    }

    #[must_use]
    pub fn encoding_error(path: PathBuf) -> Self {
        Self::new(path, ExtractionErrorKind::Utf8, "file is not valid UTF-8")
    }

    #[must_use]
    pub fn manifest(path: PathBuf, message: impl Into<String>) -> Self {
        Self::new(path, ExtractionErrorKind::Manifest, message)
    }

    #[must_use]
    pub fn read_failed(path: PathBuf, message: impl Into<String>) -> Self {
        Self::new(path, ExtractionErrorKind::Read, message)
    }
}
