//! Sampling-profile decoder
//!
//! Profile lines are `symbol self total`, or the collapsed-stack form
//! `symbol samples` where self and total are the same. Symbols may contain
//! spaces; the numbers are always the trailing fields. Entry order is file
//! order.

use super::line;
use super::{DecodeOptions, Decoded};
use crate::error::{EntryError, LineError, LineWarning};
use crate::job::{JobProfs, ProfileEntry};
use crate::naming::{ArtifactKind, ArtifactName};
use std::path::Path;

/// Decode a single-file profile artifact
///
/// # Errors
/// - [`EntryError::UnrecognizedFilename`] if the filename is not a profile
///   artifact under the configured grammar
/// - [`EntryError::MalformedProfileFile`] if the file has content but no
///   decodable entry
pub fn decode_profile(
    path: &Path,
    bytes: &[u8],
    opts: &DecodeOptions,
) -> Result<Decoded<JobProfs>, EntryError> {
    let name = classify(path, opts)?;
    decode_profile_streams(name, path, &[bytes])
}

/// Decode a profile made of several streams, concatenated in the given order
///
/// Used for profile directories, where every file is one stream. Warning
/// line numbers count through the concatenation, so a line is identified
/// uniquely even when several streams have bad lines.
pub fn decode_profile_streams(
    name: ArtifactName,
    path: &Path,
    streams: &[&[u8]],
) -> Result<Decoded<JobProfs>, EntryError> {
    let mut entries = Vec::new();
    let mut warnings = Vec::new();
    let mut content_lines = 0;
    let mut line_no = 0;

    for bytes in streams {
        let text = String::from_utf8_lossy(bytes);
        for raw in text.lines() {
            line_no += 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            content_lines += 1;
            match parse_entry(trimmed) {
                Ok(entry) => entries.push(entry),
                Err(reason) => warnings.push(LineWarning {
                    line_no,
                    text: trimmed.to_string(),
                    reason,
                }),
            }
        }
    }

    if entries.is_empty() && content_lines > 0 {
        return Err(EntryError::MalformedProfileFile {
            path: path.to_path_buf(),
            reason: format!("no decodable entries ({} lines dropped)", warnings.len()),
        });
    }

    Ok(Decoded {
        value: JobProfs::new(name.job, entries),
        warnings,
    })
}

pub(crate) fn classify(path: &Path, opts: &DecodeOptions) -> Result<ArtifactName, EntryError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| opts.scheme.classify(n, opts.allow_unknown_kinds))
        .filter(|n| n.artifact == ArtifactKind::Profile)
        .ok_or_else(|| EntryError::UnrecognizedFilename(path.to_path_buf()))
}

fn parse_entry(line: &str) -> Result<ProfileEntry, LineError> {
    let (head, last) = line::split_last_field(line).ok_or(LineError::MissingValue)?;

    // Three-field form when the second-to-last token is numeric at all;
    // a negative or non-finite number there is a bad line, not part of the symbol.
    let (symbol, self_raw, total_raw) = match line::split_last_field(head) {
        Some((symbol, middle)) if middle.parse::<f64>().is_ok() => (symbol, middle, last),
        _ => (head, last, last),
    };

    if symbol.is_empty() {
        return Err(LineError::EmptyName);
    }
    let self_time = line::parse_sample(self_raw)?;
    let total_time = line::parse_sample(total_raw)?;
    if total_time < self_time {
        return Err(LineError::TotalBelowSelf {
            self_time: self_raw.to_string(),
            total: total_raw.to_string(),
        });
    }

    Ok(ProfileEntry {
        symbol: symbol.to_string(),
        self_time,
        total_time,
    })
}
