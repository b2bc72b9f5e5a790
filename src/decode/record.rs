//! Stats artifact decoder
//!
//! Turns one stats file into a [`JobStats`]. Job identity comes from the
//! filename; the payload comes from the contents, one `name value` entry per
//! line. Upstream writes a JSON object with one entry per line, which the
//! line reader handles directly; single-line JSON documents go through
//! `serde_json` instead.

use super::line::{self, StatLine};
use super::{DecodeOptions, Decoded};
use crate::error::{EntryError, LineError, LineWarning};
use crate::job::{JobStats, StatValue};
use crate::naming::{ArtifactKind, ArtifactName};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Decode one stats artifact
///
/// # Errors
/// - [`EntryError::UnrecognizedFilename`] if the filename does not follow
///   the configured grammar or names a profile artifact
/// - [`EntryError::MalformedStatsFile`] if the file has content but not a
///   single decodable entry
///
/// # Example
/// ```
/// use jobstats::decode::{decode_stats, DecodeOptions};
/// use std::path::Path;
///
/// let decoded = decode_stats(
///     Path::new("t0.pid1.typecheck.Foo.swift"),
///     b"AST.NumDecls 12\nAST.NumDecls 15\n",
///     &DecodeOptions::default(),
/// )
/// .unwrap();
/// assert_eq!(decoded.value.counter("AST.NumDecls"), 15);
/// ```
pub fn decode_stats(
    path: &Path,
    bytes: &[u8],
    opts: &DecodeOptions,
) -> Result<Decoded<JobStats>, EntryError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| opts.scheme.classify(n, opts.allow_unknown_kinds))
        .filter(|n| n.artifact == ArtifactKind::Stats)
        .ok_or_else(|| EntryError::UnrecognizedFilename(path.to_path_buf()))?;

    decode_classified(name, path, bytes, opts)
}

/// Decode a stats artifact whose filename was already classified
pub(crate) fn decode_classified(
    name: ArtifactName,
    path: &Path,
    bytes: &[u8],
    opts: &DecodeOptions,
) -> Result<Decoded<JobStats>, EntryError> {
    let body = decode_json(bytes, opts).unwrap_or_else(|| decode_lines(bytes, opts));

    if body.value.stats.is_empty() && body.value.content_lines > 0 {
        return Err(EntryError::MalformedStatsFile {
            path: path.to_path_buf(),
            reason: format!(
                "no decodable entries ({} lines dropped)",
                body.warnings.len()
            ),
        });
    }

    if !body.is_clean() {
        tracing::debug!(
            "{}: dropped {} unparseable lines",
            path.display(),
            body.warnings.len()
        );
    }

    Ok(body.map(|body| {
        let duration = wall_time(&body.stats, &opts.wall_suffix);
        JobStats::new(name.job, duration, body.stats)
    }))
}

struct Body {
    stats: BTreeMap<String, StatValue>,
    /// Lines that were neither blank nor punctuation
    content_lines: usize,
}

fn decode_lines(bytes: &[u8], opts: &DecodeOptions) -> Decoded<Body> {
    let text = String::from_utf8_lossy(bytes);
    let mut stats = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut content_lines = 0;

    for (idx, raw) in text.lines().enumerate() {
        let parsed = line::split_stat_line(raw).and_then(|shape| match shape {
            StatLine::Structural => Ok(None),
            StatLine::Pair { name, value } => {
                classify_value(name, value, opts).map(|v| Some((name, v)))
            }
        });

        match parsed {
            Ok(None) => {}
            Ok(Some((name, value))) => {
                content_lines += 1;
                // Last write wins
                stats.insert(name.to_string(), value);
            }
            Err(reason) => {
                content_lines += 1;
                warnings.push(LineWarning {
                    line_no: idx + 1,
                    text: raw.trim().to_string(),
                    reason,
                });
            }
        }
    }

    Decoded {
        value: Body {
            stats,
            content_lines,
        },
        warnings,
    }
}

/// Whole-document JSON path; `None` means "not a JSON object, read lines"
fn decode_json(bytes: &[u8], opts: &DecodeOptions) -> Option<Decoded<Body>> {
    let doc: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(bytes).ok()?;
    let mut stats = BTreeMap::new();
    let mut warnings = Vec::new();

    for (name, value) in &doc {
        let raw = match value {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match classify_value(name, &raw, opts) {
            Ok(v) => {
                stats.insert(name.clone(), v);
            }
            Err(reason) => warnings.push(LineWarning {
                line_no: 0,
                text: format!("{}: {}", name, raw),
                reason,
            }),
        }
    }

    Some(Decoded {
        value: Body {
            stats,
            content_lines: doc.len(),
        },
        warnings,
    })
}

fn classify_value(name: &str, value: &str, opts: &DecodeOptions) -> Result<StatValue, LineError> {
    if name.starts_with(&opts.timer_prefix) || line::has_duration_unit(value) {
        line::parse_duration(value).map(StatValue::Timer)
    } else {
        line::parse_counter(value).map(StatValue::Counter)
    }
}

fn wall_time(stats: &BTreeMap<String, StatValue>, wall_suffix: &str) -> Duration {
    stats
        .iter()
        .filter(|(name, _)| name.ends_with(wall_suffix))
        .filter_map(|(_, value)| value.as_timer())
        .max()
        .unwrap_or(Duration::ZERO)
}
