//! Merge engine: many jobs → one aggregate
//!
//! Combines [`JobStats`] records into a [`MergedStats`]. Every combination
//! rule is associative and commutative on each stat independently, so any
//! grouping or ordering of the inputs produces the same aggregate, bit for
//! bit. That is what makes incremental merging ([`MergedStats::absorb`]) and
//! parallel reduction ([`MergedStats::combine`], [`merge_parallel`]) safe.
//!
//! Counters and timers live in separate maps: a name measured as a counter
//! by one compiler version and as a timer by another never collides.
//!
//! # Example
//! ```
//! use jobstats::merge::merge;
//! # use jobstats::job::{JobInfo, JobKind, JobStats, StatValue};
//! # use std::collections::BTreeMap;
//! # use std::time::Duration;
//! # fn job(pid: u64, stats: &[(&str, u64)]) -> JobStats {
//! #     let info = JobInfo { kind: JobKind::Parse, module: "M".into(), input: None,
//! #         target: None, opt: None, pid, start_usec: 0 };
//! #     let stats: BTreeMap<_, _> = stats.iter()
//! #         .map(|(k, v)| (k.to_string(), StatValue::Counter(*v))).collect();
//! #     JobStats::new(info, Duration::ZERO, stats)
//! # }
//! let a = job(1, &[("A", 3)]);
//! let b = job(2, &[("A", 4), ("B", 2)]);
//!
//! let merged = merge([&a, &b]);
//! assert_eq!(merged.jobs(), 2);
//! assert_eq!(merged.counter("A"), 7);
//! assert_eq!(merged.counter_presence("A"), 2);
//! assert_eq!(merged.counter_presence("B"), 1);
//! ```

use crate::error::MergeError;
use crate::job::{JobProfs, JobStats, ProfileEntry, StatValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// How two values of the same stat are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeBy {
    #[default]
    Sum,
    Min,
    Max,
}

trait Combine: Copy {
    fn combine(self, other: Self, by: MergeBy) -> Self;
}

impl Combine for u64 {
    fn combine(self, other: Self, by: MergeBy) -> Self {
        match by {
            MergeBy::Sum => self.saturating_add(other),
            MergeBy::Min => self.min(other),
            MergeBy::Max => self.max(other),
        }
    }
}

impl Combine for Duration {
    fn combine(self, other: Self, by: MergeBy) -> Self {
        match by {
            MergeBy::Sum => self.saturating_add(other),
            MergeBy::Min => self.min(other),
            MergeBy::Max => self.max(other),
        }
    }
}

/// An aggregated value and how many jobs reported it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Merged<T> {
    pub value: T,
    /// Number of contributing jobs that reported this stat
    pub presence: u64,
}

/// Aggregate of N jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedStats {
    merge_by: MergeBy,
    jobs: u64,
    counters: BTreeMap<String, Merged<u64>>,
    timers: BTreeMap<String, Merged<Duration>>,
}

impl Default for MergedStats {
    fn default() -> Self {
        Self::empty(MergeBy::Sum)
    }
}

impl MergedStats {
    /// Aggregate of zero jobs
    pub fn empty(merge_by: MergeBy) -> Self {
        Self {
            merge_by,
            jobs: 0,
            counters: BTreeMap::new(),
            timers: BTreeMap::new(),
        }
    }

    pub fn merge_by(&self) -> MergeBy {
        self.merge_by
    }

    /// Total number of contributing jobs (N)
    pub fn jobs(&self) -> u64 {
        self.jobs
    }

    /// True when no stat was reported by any job
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.timers.is_empty()
    }

    pub fn counters(&self) -> &BTreeMap<String, Merged<u64>> {
        &self.counters
    }

    pub fn timers(&self) -> &BTreeMap<String, Merged<Duration>> {
        &self.timers
    }

    /// Aggregated counter; zero when no job reported it
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).map_or(0, |m| m.value)
    }

    /// Aggregated timer; zero when no job reported it
    pub fn timer(&self, name: &str) -> Duration {
        self.timers.get(name).map_or(Duration::ZERO, |m| m.value)
    }

    pub fn counter_presence(&self, name: &str) -> u64 {
        self.counters.get(name).map_or(0, |m| m.presence)
    }

    pub fn timer_presence(&self, name: &str) -> u64 {
        self.timers.get(name).map_or(0, |m| m.presence)
    }

    /// Aggregated value averaged over all N jobs (absent counts as zero)
    ///
    /// Timers are reported in microseconds. `None` when N is zero.
    pub fn mean_per_job(&self, name: &str) -> Option<f64> {
        if self.jobs == 0 {
            return None;
        }
        Some(self.value_f64(name) / self.jobs as f64)
    }

    /// Aggregated value averaged over the jobs that reported it
    ///
    /// Counters take precedence when a name is both. `None` when nobody
    /// reported the name.
    pub fn mean_per_reporting_job(&self, name: &str) -> Option<f64> {
        let presence = match self.counters.get(name) {
            Some(m) => m.presence,
            None => self.timer_presence(name),
        };
        if presence == 0 {
            return None;
        }
        Some(self.value_f64(name) / presence as f64)
    }

    fn value_f64(&self, name: &str) -> f64 {
        match self.counters.get(name) {
            Some(m) => StatValue::Counter(m.value).as_f64(),
            None => StatValue::Timer(self.timer(name)).as_f64(),
        }
    }

    /// Fold one job into the aggregate
    pub fn absorb(&mut self, job: &JobStats) {
        self.jobs = self.jobs.saturating_add(1);
        for (name, value) in job.stats() {
            match *value {
                StatValue::Counter(v) => fold(&mut self.counters, name, v, 1, self.merge_by),
                StatValue::Timer(d) => fold(&mut self.timers, name, d, 1, self.merge_by),
            }
        }
    }

    /// Merge two partial aggregates into a new one
    ///
    /// # Errors
    /// [`MergeError`] when the two sides were built with different
    /// [`MergeBy`] modes.
    pub fn combine(&self, other: &MergedStats) -> Result<MergedStats, MergeError> {
        if self.merge_by != other.merge_by {
            return Err(MergeError {
                left: self.merge_by,
                right: other.merge_by,
            });
        }
        let mut out = self.clone();
        out.fold_from(other);
        Ok(out)
    }

    fn fold_from(&mut self, other: &MergedStats) {
        self.jobs = self.jobs.saturating_add(other.jobs);
        for (name, m) in &other.counters {
            fold(&mut self.counters, name, m.value, m.presence, self.merge_by);
        }
        for (name, m) in &other.timers {
            fold(&mut self.timers, name, m.value, m.presence, self.merge_by);
        }
    }
}

fn fold<T: Combine>(
    map: &mut BTreeMap<String, Merged<T>>,
    name: &str,
    value: T,
    presence: u64,
    by: MergeBy,
) {
    match map.get_mut(name) {
        Some(existing) => {
            existing.value = existing.value.combine(value, by);
            existing.presence = existing.presence.saturating_add(presence);
        }
        None => {
            map.insert(name.to_string(), Merged { value, presence });
        }
    }
}

impl<'a> Extend<&'a JobStats> for MergedStats {
    fn extend<I: IntoIterator<Item = &'a JobStats>>(&mut self, iter: I) {
        for job in iter {
            self.absorb(job);
        }
    }
}

impl<'a> FromIterator<&'a JobStats> for MergedStats {
    fn from_iter<I: IntoIterator<Item = &'a JobStats>>(iter: I) -> Self {
        merge(iter)
    }
}

/// Sum-merge a sequence of jobs
pub fn merge<'a, I>(records: I) -> MergedStats
where
    I: IntoIterator<Item = &'a JobStats>,
{
    merge_with(records, MergeBy::Sum)
}

/// Merge a sequence of jobs with the given combination rule
pub fn merge_with<'a, I>(records: I, merge_by: MergeBy) -> MergedStats
where
    I: IntoIterator<Item = &'a JobStats>,
{
    let mut merged = MergedStats::empty(merge_by);
    merged.extend(records);
    merged
}

/// Merge on `workers` threads as a reduction over chunks
///
/// Produces exactly the same aggregate as [`merge_with`].
pub fn merge_parallel(records: &[JobStats], merge_by: MergeBy, workers: usize) -> MergedStats {
    let workers = workers.max(1);
    if workers == 1 || records.len() < 2 * workers {
        return merge_with(records, merge_by);
    }

    let chunk_size = records.len().div_ceil(workers);
    let partials: Vec<MergedStats> = std::thread::scope(|scope| {
        let handles: Vec<_> = records
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || merge_with(chunk, merge_by)))
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(partial) => partial,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let mut total = MergedStats::empty(merge_by);
    for partial in &partials {
        total.fold_from(partial);
    }
    total
}

/// Merge jobs separately per module
pub fn merge_by_module<'a, I>(records: I, merge_by: MergeBy) -> BTreeMap<String, MergedStats>
where
    I: IntoIterator<Item = &'a JobStats>,
{
    let mut groups: BTreeMap<String, MergedStats> = BTreeMap::new();
    for job in records {
        groups
            .entry(job.module().to_string())
            .or_insert_with(|| MergedStats::empty(merge_by))
            .absorb(job);
    }
    groups
}

/// Concatenate profile entries across jobs
///
/// Symbol-level summation is left to report code: profiles from different
/// jobs may come from different sampling epochs.
pub fn merge_profiles<'a, I>(profiles: I) -> Vec<ProfileEntry>
where
    I: IntoIterator<Item = &'a JobProfs>,
{
    profiles
        .into_iter()
        .flat_map(|p| p.entries().iter().cloned())
        .collect()
}
