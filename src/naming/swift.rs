use super::{kind_from_tag, ArtifactKind, ArtifactName};
use crate::job::{JobInfo, JobKind};
use regex::{Captures, Regex};
use std::sync::OnceLock;

const FRONTEND_PATTERN: &str = r"^stats-(?P<start>\d+)-swift-frontend-(?P<module>[^-]+)-(?P<input>[^-]*)-(?P<triple>[^-]+)-(?P<out>[^-]*)-(?P<opt>[^-]+)-(?P<pid>\d+)(-.*)?\.json$";

const DRIVER_PATTERN: &str = r"^stats-(?P<start>\d+)-swift-driver-(?P<module>[^-]+)-(?P<triple>[^-]+)-(?P<opt>[^-]+)-(?P<pid>\d+)(-.*)?\.json$";

const PROFILE_PATTERN: &str = r"^profile-(?P<start>\d+)-swift-(?P<kind>\w+)-(?P<module>[^-]+)(-(?P<input>[^-]*))?-(?P<triple>[^-]+)(-(?P<out>[^-]*))?-(?P<opt>[^-]+)-(?P<pid>\d+)(-.*)?\.dir$";

struct Grammar {
    frontend: Regex,
    driver: Regex,
    profile: Regex,
}

fn grammar() -> &'static Grammar {
    static GRAMMAR: OnceLock<Grammar> = OnceLock::new();
    GRAMMAR.get_or_init(|| Grammar {
        frontend: Regex::new(FRONTEND_PATTERN).expect("frontend pattern is valid"),
        driver: Regex::new(DRIVER_PATTERN).expect("driver pattern is valid"),
        profile: Regex::new(PROFILE_PATTERN).expect("profile pattern is valid"),
    })
}

pub(super) fn parse(file_name: &str) -> Option<ArtifactName> {
    let grammar = grammar();

    if let Some(caps) = grammar.frontend.captures(file_name) {
        return build(ArtifactKind::Stats, JobKind::Frontend, &caps);
    }
    if let Some(caps) = grammar.driver.captures(file_name) {
        return build(ArtifactKind::Stats, JobKind::Driver, &caps);
    }
    let caps = grammar.profile.captures(file_name)?;
    let kind = kind_from_tag(caps.name("kind")?.as_str())?;
    build(ArtifactKind::Profile, kind, &caps)
}

fn build(artifact: ArtifactKind, kind: JobKind, caps: &Captures<'_>) -> Option<ArtifactName> {
    let field = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Some(ArtifactName {
        artifact,
        job: JobInfo {
            kind,
            module: field("module")?,
            input: field("input"),
            target: field("triple"),
            opt: field("opt"),
            pid: caps.name("pid")?.as_str().parse().ok()?,
            start_usec: caps.name("start")?.as_str().parse().ok()?,
        },
    })
}
