//! Error taxonomy for stats directory loading
//!
//! Three tiers, from most to least severe:
//! - [`LoadError`]: the whole operation cannot proceed (missing root, bad selector)
//! - [`EntryError`]: one directory entry was skipped; the scan continues
//! - [`LineWarning`]: one line inside an otherwise usable file was dropped

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors: no partial result is possible
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Stats directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot read stats directory {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid stat selector '{pattern}': {source}")]
    InvalidSelector {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Per-entry failures, collected alongside successful records
#[derive(Error, Debug)]
pub enum EntryError {
    #[error("Unrecognized filename: {}", .0.display())]
    UnrecognizedFilename(PathBuf),

    #[error("Malformed stats file {}: {reason}", .path.display())]
    MalformedStatsFile { path: PathBuf, reason: String },

    #[error("Malformed profile file {}: {reason}", .path.display())]
    MalformedProfileFile { path: PathBuf, reason: String },

    #[error("Cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EntryError {
    /// Path of the entry this error refers to
    pub fn path(&self) -> &std::path::Path {
        match self {
            EntryError::UnrecognizedFilename(path)
            | EntryError::MalformedStatsFile { path, .. }
            | EntryError::MalformedProfileFile { path, .. }
            | EntryError::Unreadable { path, .. } => path,
        }
    }
}

/// Why a single line was dropped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("expected `name value`")]
    MissingValue,

    #[error("empty stat name")]
    EmptyName,

    #[error("invalid counter value '{0}'")]
    InvalidCounter(String),

    #[error("invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("invalid sample value '{0}'")]
    InvalidSample(String),

    #[error("total time {total} is less than self time {self_time}")]
    TotalBelowSelf { self_time: String, total: String },
}

/// A dropped line, with enough context to report it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineWarning {
    /// 1-based line number in the artifact (counted across all streams of a
    /// profile directory); 0 for entries of a whole-document JSON file
    pub line_no: usize,
    /// The offending line, trimmed
    pub text: String,
    pub reason: LineError,
}

impl std::fmt::Display for LineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {} ({})", self.line_no, self.reason, self.text)
    }
}

/// Combining aggregates that were built with different merge modes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot combine aggregates merged by {left:?} and {right:?}")]
pub struct MergeError {
    pub left: crate::merge::MergeBy,
    pub right: crate::merge::MergeBy,
}
