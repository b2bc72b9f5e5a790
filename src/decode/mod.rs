//! Best-effort artifact decoders
//!
//! Stats files are often written by jobs that crashed or are still running,
//! so decoding never gives up on a whole file because of one bad line.
//! Dropped lines come back as [`LineWarning`]s inside [`Decoded`] next to
//! whatever could be read.
//!
//! Both decoders are pure: they take the artifact path (for its filename)
//! and the raw bytes, and do no I/O of their own.

mod line;
pub mod profile;
pub mod record;

pub use profile::{decode_profile, decode_profile_streams};
pub use record::decode_stats;

use crate::error::LineWarning;
use crate::naming::NamingScheme;
use serde::{Deserialize, Serialize};

/// A decoded value plus the lines that had to be dropped to get it
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    pub warnings: Vec<LineWarning>,
}

impl<T> Decoded<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// True when no line was dropped
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Decoded<U> {
        Decoded {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    pub fn into_parts(self) -> (T, Vec<LineWarning>) {
        (self.value, self.warnings)
    }
}

/// Knobs shared by both decoders
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Filename grammar
    pub scheme: NamingScheme,

    /// Accept job-kind tags this crate does not know about
    pub allow_unknown_kinds: bool,

    /// Stat names with this prefix are timers
    #[serde(default = "default_timer_prefix")]
    pub timer_prefix: String,

    /// The largest timer with this suffix is the job's elapsed time
    #[serde(default = "default_wall_suffix")]
    pub wall_suffix: String,
}

fn default_timer_prefix() -> String {
    "time.".to_string()
}

fn default_wall_suffix() -> String {
    ".wall".to_string()
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            scheme: NamingScheme::default(),
            allow_unknown_kinds: true,
            timer_prefix: default_timer_prefix(),
            wall_suffix: default_wall_suffix(),
        }
    }
}
