//! Loading facade
//!
//! The entry points most callers want: scan a stats directory, narrow the
//! result with [`Selectors`], merge. Selectors apply after the scan, so a
//! selector never changes which entries are reported as errors.

use crate::error::LoadError;
use crate::job::{JobInfo, JobKind, JobProfs, JobStats, StatKind};
use crate::merge::{self, MergedStats};
use crate::scan::{self, ArtifactRef, ScanOptions, ScanReport};
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Which jobs and stats to keep
///
/// Empty lists select everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// Keep jobs of these kinds
    pub kinds: Vec<JobKind>,

    /// Keep jobs of these modules (exact match)
    pub modules: Vec<String>,

    /// Keep stats whose name matches any of these regexes
    pub stats: Vec<String>,

    /// Drop every timer
    pub exclude_timers: bool,
}

impl Selectors {
    /// Compile the stat-name patterns
    ///
    /// # Errors
    /// [`LoadError::InvalidSelector`] naming the first pattern that does not compile.
    pub fn compile(&self) -> Result<SelectorFilter<'_>, LoadError> {
        for pattern in &self.stats {
            Regex::new(pattern).map_err(|source| LoadError::InvalidSelector {
                pattern: pattern.clone(),
                source,
            })?;
        }
        let stats = if self.stats.is_empty() {
            None
        } else {
            let set = RegexSet::new(&self.stats).map_err(|source| LoadError::InvalidSelector {
                pattern: self.stats.join("|"),
                source,
            })?;
            Some(set)
        };
        Ok(SelectorFilter {
            selectors: self,
            stats,
        })
    }
}

/// [`Selectors`] with their patterns compiled
#[derive(Debug)]
pub struct SelectorFilter<'a> {
    selectors: &'a Selectors,
    stats: Option<RegexSet>,
}

impl SelectorFilter<'_> {
    /// Whether a job passes the kind and module selectors
    pub fn accepts(&self, info: &JobInfo) -> bool {
        let sel = self.selectors;
        (sel.kinds.is_empty() || sel.kinds.contains(&info.kind))
            && (sel.modules.is_empty() || sel.modules.iter().any(|m| *m == info.module))
    }

    /// The job narrowed to the selected stats, or `None` if the job is not selected
    pub fn apply(&self, job: &JobStats) -> Option<JobStats> {
        if !self.accepts(job.info()) {
            return None;
        }
        if self.stats.is_none() && !self.selectors.exclude_timers {
            return Some(job.clone());
        }
        Some(job.retain_stats(|name, value| {
            if self.selectors.exclude_timers && value.kind() == StatKind::Timer {
                return false;
            }
            self.stats.as_ref().map_or(true, |set| set.is_match(name))
        }))
    }
}

/// Options for the loading entry points
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub scan: ScanOptions,
    pub select: Selectors,
}

/// Load every selected job record from a stats directory
///
/// Entries that fail to decode are logged and skipped; use
/// [`load_stats_dir_report`] to get them back.
///
/// # Errors
/// Only for the root directory itself, or for a selector that does not compile.
pub fn load_stats_dir(path: &Path, opts: &LoadOptions) -> Result<Vec<JobStats>, LoadError> {
    let filter = opts.select.compile()?;
    let report = scan::scan(path, &stats_only(&opts.scan))?;
    log_skipped(&report);
    Ok(report.stats.iter().filter_map(|j| filter.apply(j)).collect())
}

/// Like [`load_stats_dir`], but keeps profiles, errors and dropped lines
///
/// Profiles are decoded here when `scan.decode_profiles` is set; the other
/// loaders never decode them.
pub fn load_stats_dir_report(path: &Path, opts: &LoadOptions) -> Result<ScanReport, LoadError> {
    let filter = opts.select.compile()?;
    let report = scan::scan(path, &opts.scan)?;
    Ok(select_report(&filter, report))
}

/// Selected profile artifacts, not yet decoded
pub fn list_stats_dir_profiles(
    path: &Path,
    opts: &LoadOptions,
) -> Result<Vec<ArtifactRef>, LoadError> {
    let filter = opts.select.compile()?;
    let mut profiles = scan::list_profiles(path, &opts.scan)?;
    profiles.retain(|p| filter.accepts(p.job()));
    Ok(profiles)
}

/// Sum-merge every record into one aggregate
pub fn merge_all_jobstats<'a, I>(records: I) -> MergedStats
where
    I: IntoIterator<Item = &'a JobStats>,
{
    merge::merge(records)
}

/// The profile recorded by the same job as `job`, if any
pub fn find_profile<'a>(profiles: &'a [JobProfs], job: &JobStats) -> Option<&'a JobProfs> {
    let id = job.id();
    profiles.iter().find(|p| p.id() == id)
}

/// Scan options for callers that only want stats records
fn stats_only(opts: &ScanOptions) -> ScanOptions {
    ScanOptions {
        decode_profiles: false,
        ..opts.clone()
    }
}

fn select_report(filter: &SelectorFilter<'_>, report: ScanReport) -> ScanReport {
    let ScanReport {
        stats,
        profiles,
        errors,
        warnings,
    } = report;
    ScanReport {
        stats: stats.iter().filter_map(|j| filter.apply(j)).collect(),
        profiles: profiles
            .into_iter()
            .filter(|p| filter.accepts(p.info()))
            .collect(),
        errors,
        warnings,
    }
}

fn log_skipped(report: &ScanReport) {
    for err in &report.errors {
        tracing::warn!("Skipping {}", err);
    }
    if !report.warnings.is_empty() {
        tracing::warn!(
            "Dropped {} undecodable lines across {} stats/profile files",
            report.warnings.len(),
            report.stats.len() + report.profiles.len()
        );
    }
}

#[derive(Debug)]
struct CachedScan {
    modified: Option<SystemTime>,
    options: ScanOptions,
    report: ScanReport,
}

impl CachedScan {
    fn new(root: &Path, modified: Option<SystemTime>, opts: &ScanOptions) -> Result<Self, LoadError> {
        Ok(Self {
            modified,
            options: opts.clone(),
            report: scan::scan(root, opts)?,
        })
    }

    fn is_fresh(&self, modified: Option<SystemTime>, opts: &ScanOptions) -> bool {
        modified.is_some() && self.modified == modified && self.options == *opts
    }
}

/// Caller-owned scan cache
///
/// Keyed by directory path, the directory's modification time and the scan
/// options. Adding, removing or renaming an entry bumps the directory mtime
/// and forces a rescan. Rewriting an existing file in place does not; call
/// [`StatsDirCache::invalidate`] for that. With `recursive` scanning only
/// the root's own mtime is checked.
#[derive(Debug, Default)]
pub struct StatsDirCache {
    entries: HashMap<PathBuf, CachedScan>,
}

impl StatsDirCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget one directory
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Scan `root`, reusing the previous report when nothing changed
    pub fn scan(&mut self, root: &Path, opts: &ScanOptions) -> Result<&ScanReport, LoadError> {
        // No mtime means nothing to validate against: always rescan
        let modified = scan::check_root(root)?.modified().ok();

        let cached = match self.entries.entry(root.to_path_buf()) {
            Entry::Occupied(entry) if entry.get().is_fresh(modified, opts) => {
                tracing::debug!("Stats cache hit: {}", root.display());
                entry.into_mut()
            }
            Entry::Occupied(mut entry) => {
                entry.insert(CachedScan::new(root, modified, opts)?);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(CachedScan::new(root, modified, opts)?),
        };
        Ok(&cached.report)
    }
}

/// [`load_stats_dir`] through a [`StatsDirCache`]
pub fn load_stats_dir_cached(
    cache: &mut StatsDirCache,
    path: &Path,
    opts: &LoadOptions,
) -> Result<Vec<JobStats>, LoadError> {
    let filter = opts.select.compile()?;
    let report = cache.scan(path, &stats_only(&opts.scan))?;
    Ok(report.stats.iter().filter_map(|j| filter.apply(j)).collect())
}
