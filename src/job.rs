//! Typed job-statistics records
//!
//! A [`JobStats`] is one compilation job's snapshot: identity taken from the
//! artifact's filename plus a name → [`StatValue`] payload taken from its
//! contents. A [`JobProfs`] is the same job's sampling profile. Both are
//! immutable once decoded; transformations return new records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Driver counter: jobs the driver actually ran
pub const DRIVER_JOBS_RUN: &str = "Driver.NumDriverJobsRun";
/// Driver counter: jobs the driver skipped as up to date
pub const DRIVER_JOBS_SKIPPED: &str = "Driver.NumDriverJobsSkipped";

/// Kind of compiler job that produced an artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobKind {
    Driver,
    Frontend,
    Parse,
    Typecheck,
    SilGen,
    IrGen,
    Optimize,
    Link,
    /// Tag emitted by instrumentation newer than this crate
    Other(String),
}

impl JobKind {
    /// Lowercase tag as it appears in artifact names
    pub fn tag(&self) -> &str {
        match self {
            JobKind::Driver => "driver",
            JobKind::Frontend => "frontend",
            JobKind::Parse => "parse",
            JobKind::Typecheck => "typecheck",
            JobKind::SilGen => "silgen",
            JobKind::IrGen => "irgen",
            JobKind::Optimize => "optimize",
            JobKind::Link => "link",
            JobKind::Other(tag) => tag,
        }
    }

    /// Whether the tag is one of the built-in kinds
    pub fn is_known(&self) -> bool {
        !matches!(self, JobKind::Other(_))
    }
}

impl FromStr for JobKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.to_ascii_lowercase();
        Ok(match tag.as_str() {
            "driver" => JobKind::Driver,
            "frontend" => JobKind::Frontend,
            "parse" => JobKind::Parse,
            "typecheck" => JobKind::Typecheck,
            "silgen" => JobKind::SilGen,
            "irgen" => JobKind::IrGen,
            "optimize" => JobKind::Optimize,
            "link" => JobKind::Link,
            _ => JobKind::Other(tag),
        })
    }
}

impl From<String> for JobKind {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<JobKind> for String {
    fn from(kind: JobKind) -> Self {
        kind.tag().to_string()
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Job identity shared by a job's stats and profile artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobId {
    /// Start timestamp, microseconds since the epoch
    pub start_usec: u64,
    pub pid: u64,
}

/// Everything the artifact's filename says about its job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobInfo {
    pub kind: JobKind,
    pub module: String,
    pub input: Option<String>,
    /// Target triple (swift-v1 names only)
    pub target: Option<String>,
    /// Optimization level (swift-v1 names only)
    pub opt: Option<String>,
    pub pid: u64,
    pub start_usec: u64,
}

impl JobInfo {
    pub fn id(&self) -> JobId {
        JobId {
            start_usec: self.start_usec,
            pid: self.pid,
        }
    }
}

/// Discriminant of [`StatValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    Counter,
    Timer,
}

/// One measured value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatValue {
    Counter(u64),
    Timer(Duration),
}

impl StatValue {
    pub fn kind(&self) -> StatKind {
        match self {
            StatValue::Counter(_) => StatKind::Counter,
            StatValue::Timer(_) => StatKind::Timer,
        }
    }

    pub fn as_counter(&self) -> Option<u64> {
        match self {
            StatValue::Counter(v) => Some(*v),
            StatValue::Timer(_) => None,
        }
    }

    pub fn as_timer(&self) -> Option<Duration> {
        match self {
            StatValue::Timer(d) => Some(*d),
            StatValue::Counter(_) => None,
        }
    }

    /// Counter value, or timer value in microseconds
    pub fn as_f64(&self) -> f64 {
        match self {
            StatValue::Counter(v) => *v as f64,
            StatValue::Timer(d) => d.as_nanos() as f64 / 1_000.0,
        }
    }
}

/// One job's statistics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStats {
    info: JobInfo,
    duration: Duration,
    stats: BTreeMap<String, StatValue>,
}

impl JobStats {
    pub fn new(info: JobInfo, duration: Duration, stats: BTreeMap<String, StatValue>) -> Self {
        Self {
            info,
            duration,
            stats,
        }
    }

    pub fn info(&self) -> &JobInfo {
        &self.info
    }

    pub fn id(&self) -> JobId {
        self.info.id()
    }

    pub fn kind(&self) -> &JobKind {
        &self.info.kind
    }

    pub fn module(&self) -> &str {
        &self.info.module
    }

    pub fn input(&self) -> Option<&str> {
        self.info.input.as_deref()
    }

    pub fn pid(&self) -> u64 {
        self.info.pid
    }

    pub fn start_usec(&self) -> u64 {
        self.info.start_usec
    }

    /// Elapsed wall-clock time of the whole job
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn end_usec(&self) -> u64 {
        let dur = u64::try_from(self.duration.as_micros()).unwrap_or(u64::MAX);
        self.info.start_usec.saturating_add(dur)
    }

    pub fn stats(&self) -> &BTreeMap<String, StatValue> {
        &self.stats
    }

    pub fn get(&self, name: &str) -> Option<StatValue> {
        self.stats.get(name).copied()
    }

    /// Counter value; absent or non-counter names read as zero
    pub fn counter(&self, name: &str) -> u64 {
        self.get(name).and_then(|v| v.as_counter()).unwrap_or(0)
    }

    /// Timer value; absent or non-timer names read as zero
    pub fn timer(&self, name: &str) -> Duration {
        self.get(name)
            .and_then(|v| v.as_timer())
            .unwrap_or(Duration::ZERO)
    }

    pub fn counters(&self) -> impl Iterator<Item = (&str, u64)> {
        self.stats
            .iter()
            .filter_map(|(k, v)| v.as_counter().map(|c| (k.as_str(), c)))
    }

    pub fn timers(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.stats
            .iter()
            .filter_map(|(k, v)| v.as_timer().map(|d| (k.as_str(), d)))
    }

    pub fn is_driver_job(&self) -> bool {
        self.info.kind == JobKind::Driver
    }

    pub fn driver_jobs_ran(&self) -> u64 {
        self.counter(DRIVER_JOBS_RUN)
    }

    pub fn driver_jobs_skipped(&self) -> u64 {
        self.counter(DRIVER_JOBS_SKIPPED)
    }

    pub fn driver_jobs_total(&self) -> u64 {
        self.driver_jobs_ran()
            .saturating_add(self.driver_jobs_skipped())
    }

    /// Percentage of driver jobs that had to run (lower is more incremental)
    ///
    /// `None` for non-driver jobs and for drivers that scheduled nothing.
    pub fn incrementality_pct(&self) -> Option<f64> {
        if !self.is_driver_job() {
            return None;
        }
        let total = self.driver_jobs_total();
        if total == 0 {
            return None;
        }
        Some(100.0 * self.driver_jobs_ran() as f64 / total as f64)
    }

    /// Copy of this record with every stat name prefixed by `prefix.`
    pub fn prefixed_by(&self, prefix: &str) -> JobStats {
        let stats = self
            .stats
            .iter()
            .map(|(k, v)| (format!("{}.{}", prefix, k), *v))
            .collect();
        JobStats::new(self.info.clone(), self.duration, stats)
    }

    /// Copy of this record keeping only the stats `keep` accepts
    pub fn retain_stats<F>(&self, mut keep: F) -> JobStats
    where
        F: FnMut(&str, &StatValue) -> bool,
    {
        let stats = self
            .stats
            .iter()
            .filter(|(k, v)| keep(k, v))
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        JobStats::new(self.info.clone(), self.duration, stats)
    }
}

/// One symbol's sample attribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileEntry {
    pub symbol: String,
    pub self_time: f64,
    /// Inclusive time; never below `self_time`
    pub total_time: f64,
}

/// One job's sampling profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobProfs {
    info: JobInfo,
    entries: Vec<ProfileEntry>,
}

impl JobProfs {
    pub fn new(info: JobInfo, entries: Vec<ProfileEntry>) -> Self {
        Self { info, entries }
    }

    pub fn info(&self) -> &JobInfo {
        &self.info
    }

    pub fn id(&self) -> JobId {
        self.info.id()
    }

    pub fn kind(&self) -> &JobKind {
        &self.info.kind
    }

    pub fn module(&self) -> &str {
        &self.info.module
    }

    /// Entries in file order
    pub fn entries(&self) -> &[ProfileEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_info(kind: JobKind, module: &str, pid: u64, start_usec: u64) -> JobInfo {
    JobInfo {
        kind,
        module: module.to_string(),
        input: None,
        target: None,
        opt: None,
        pid,
        start_usec,
    }
}
