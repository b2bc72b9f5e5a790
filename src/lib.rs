//! Jobstats - loader and merge engine for compiler per-job statistics
//!
//! A compiler invoked with a stats output directory writes one small file per
//! job: named counters and timers, and optionally a sampling profile. This
//! library turns such a directory into typed [`JobStats`] / [`JobProfs`]
//! records and merges any set of them into a [`MergedStats`] aggregate.
//!
//! ```no_run
//! use jobstats::{load_stats_dir, merge_all_jobstats, LoadOptions};
//! use std::path::Path;
//!
//! let jobs = load_stats_dir(Path::new("build/stats"), &LoadOptions::default())?;
//! let merged = merge_all_jobstats(&jobs);
//! println!("{} jobs, {} functions", merged.jobs(), merged.counter("IRGen.Functions"));
//! # Ok::<(), jobstats::LoadError>(())
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod job;
pub mod merge;
pub mod naming;
pub mod query;
pub mod scan;

pub use config::LoaderConfig;
pub use decode::{decode_profile, decode_stats, DecodeOptions, Decoded};
pub use error::{EntryError, LineError, LineWarning, LoadError, MergeError};
pub use job::{JobId, JobInfo, JobKind, JobProfs, JobStats, ProfileEntry, StatKind, StatValue};
pub use merge::{merge, merge_parallel, merge_with, MergeBy, Merged, MergedStats};
pub use naming::NamingScheme;
pub use query::{
    find_profile, list_stats_dir_profiles, load_stats_dir, load_stats_dir_cached,
    load_stats_dir_report, merge_all_jobstats, LoadOptions, Selectors, StatsDirCache,
};
pub use scan::{scan, ArtifactRef, ScanOptions, ScanReport};
