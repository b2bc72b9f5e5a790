use super::{kind_from_tag, ArtifactKind, ArtifactName};
use crate::job::JobInfo;

const PROFILE_PREFIX: &str = "profile.";

/// Parse `[profile.]t<start>.pid<pid>.<kind>.<module>`
///
/// The module part keeps any further dots (`Foo.swift`).
pub(super) fn parse(file_name: &str) -> Option<ArtifactName> {
    let (artifact, rest) = match file_name.strip_prefix(PROFILE_PREFIX) {
        Some(rest) => (ArtifactKind::Profile, rest),
        None => (ArtifactKind::Stats, file_name),
    };

    let mut parts = rest.splitn(4, '.');
    let start_usec = digits_after(parts.next()?, "t")?;
    let pid = digits_after(parts.next()?, "pid")?;
    let kind = kind_from_tag(parts.next()?)?;
    let module = parts.next().filter(|m| !m.is_empty())?;

    Some(ArtifactName {
        artifact,
        job: JobInfo {
            kind,
            module: module.to_string(),
            input: None,
            target: None,
            opt: None,
            pid,
            start_usec,
        },
    })
}

fn digits_after(field: &str, prefix: &str) -> Option<u64> {
    let digits = field.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
