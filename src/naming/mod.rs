// Artifact filename grammars
//
// A stats directory mixes artifacts from many jobs; the filename is the only
// place a job's identity (kind, module, pid, start time) is recorded. The
// grammar differs between instrumentation versions, so it is a configurable,
// versioned schema rather than a single hardcoded pattern.

mod dotted;
mod swift;

use crate::job::{JobInfo, JobKind};
use serde::{Deserialize, Serialize};

/// What an artifact contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Stats,
    Profile,
}

/// A successfully classified artifact filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub artifact: ArtifactKind,
    pub job: JobInfo,
}

/// Versioned filename grammar
///
/// # Example
/// ```
/// use jobstats::naming::{ArtifactKind, NamingScheme};
///
/// let name = NamingScheme::DottedV1
///     .classify("t0.pid1.typecheck.Foo.swift", true)
///     .unwrap();
/// assert_eq!(name.artifact, ArtifactKind::Stats);
/// assert_eq!(name.job.module, "Foo.swift");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NamingScheme {
    /// `t<start>.pid<pid>.<kind>.<module>`, profiles prefixed with `profile.`
    #[serde(rename = "dotted-v1")]
    DottedV1,

    /// `stats-<start>-swift-<kind>-...-<pid>.json` and `profile-...-<pid>.dir`
    #[serde(rename = "swift-v1")]
    SwiftV1,

    /// Try `swift-v1`, then `dotted-v1`
    #[default]
    #[serde(rename = "auto")]
    Auto,
}

impl NamingScheme {
    /// Classify a bare filename (no directory components)
    ///
    /// Returns `None` when the name does not follow the grammar, or when it
    /// carries an unknown job-kind tag and `allow_unknown_kinds` is false.
    pub fn classify(&self, file_name: &str, allow_unknown_kinds: bool) -> Option<ArtifactName> {
        let name = match self {
            NamingScheme::DottedV1 => dotted::parse(file_name),
            NamingScheme::SwiftV1 => swift::parse(file_name),
            NamingScheme::Auto => swift::parse(file_name).or_else(|| dotted::parse(file_name)),
        }?;

        if !allow_unknown_kinds && !name.job.kind.is_known() {
            return None;
        }
        Some(name)
    }
}

/// Job-kind tags must look like identifiers, whatever their value
fn is_kind_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn kind_from_tag(tag: &str) -> Option<JobKind> {
    is_kind_tag(tag).then(|| JobKind::from(tag.to_string()))
}
