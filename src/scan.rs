//! Stats directory scanner
//!
//! Enumerates a stats output directory, classifies each entry by filename,
//! and decodes the recognized artifacts. A bad entry never stops the scan:
//! it becomes an [`EntryError`] in the returned [`ScanReport`] next to
//! everything that did decode. Only a missing or unreadable root is fatal.
//! Entries that are not regular files are reported without being opened.
//!
//! Decoding is independent per file, so it runs on a bounded pool of scoped
//! worker threads fed through a `crossbeam` channel. Results are sorted
//! afterwards, so the report does not depend on worker scheduling.

use crate::decode::{self, DecodeOptions, Decoded};
use crate::error::{EntryError, LineWarning, LoadError};
use crate::job::{JobId, JobInfo, JobProfs, JobStats};
use crate::naming::{ArtifactKind, ArtifactName};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Scanner knobs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Descend into subdirectories (profile directories are never descended into)
    pub recursive: bool,

    /// Decode worker threads; 0 means one per available CPU
    pub workers: usize,

    /// Larger files are reported as malformed without being read
    pub max_file_bytes: u64,

    /// Decode profile artifacts during the scan (they can always be listed)
    pub decode_profiles: bool,

    pub decode: DecodeOptions,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            workers: 0,
            max_file_bytes: 64 * 1024 * 1024,
            decode_profiles: true,
            decode: DecodeOptions::default(),
        }
    }
}

impl ScanOptions {
    /// Worker count with 0 resolved to the available parallelism
    pub fn effective_workers(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }
}

/// A recognized artifact that has not been decoded yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub path: PathBuf,
    pub name: ArtifactName,
    /// Profile directories hold one stream per file
    pub is_dir: bool,
}

impl ArtifactRef {
    pub fn job(&self) -> &JobInfo {
        &self.name.job
    }

    pub fn id(&self) -> JobId {
        self.name.job.id()
    }

    pub fn artifact(&self) -> ArtifactKind {
        self.name.artifact
    }

    /// Read and decode this profile artifact
    ///
    /// # Errors
    /// [`EntryError::UnrecognizedFilename`] when called on a stats artifact,
    /// otherwise whatever reading or decoding the profile reports.
    pub fn load_profile(&self, opts: &ScanOptions) -> Result<Decoded<JobProfs>, EntryError> {
        if self.name.artifact != ArtifactKind::Profile {
            return Err(EntryError::UnrecognizedFilename(self.path.clone()));
        }
        let streams = if self.is_dir {
            read_profile_dir(&self.path, opts.max_file_bytes)?
        } else {
            vec![read_bounded(&self.path, opts.max_file_bytes, ArtifactKind::Profile)?]
        };
        let streams: Vec<&[u8]> = streams.iter().map(Vec::as_slice).collect();
        decode::decode_profile_streams(self.name.clone(), &self.path, &streams)
    }

    /// Read and decode this stats artifact
    ///
    /// # Errors
    /// [`EntryError::UnrecognizedFilename`] when called on a profile artifact,
    /// otherwise whatever reading or decoding the file reports.
    pub fn load_stats(&self, opts: &ScanOptions) -> Result<Decoded<JobStats>, EntryError> {
        if self.name.artifact != ArtifactKind::Stats || self.is_dir {
            return Err(EntryError::UnrecognizedFilename(self.path.clone()));
        }
        let bytes = read_bounded(&self.path, opts.max_file_bytes, ArtifactKind::Stats)?;
        decode::record::decode_classified(self.name.clone(), &self.path, &bytes, &opts.decode)
    }
}

/// Everything one scan produced
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Sorted by start time, pid, module
    pub stats: Vec<JobStats>,
    /// Sorted by start time, pid, module
    pub profiles: Vec<JobProfs>,
    /// Skipped entries, sorted by path
    pub errors: Vec<EntryError>,
    /// Dropped lines inside files that still decoded, sorted by path and line
    pub warnings: Vec<(PathBuf, LineWarning)>,
}

impl ScanReport {
    /// True when every entry decoded without dropping anything
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Scan a stats directory
///
/// # Errors
/// Only for the root itself: [`LoadError::NotFound`],
/// [`LoadError::NotADirectory`] or [`LoadError::Unreadable`].
pub fn scan(root: &Path, opts: &ScanOptions) -> Result<ScanReport, LoadError> {
    let (candidates, mut errors) = collect_artifacts(root, opts)?;
    let candidates: Vec<ArtifactRef> = candidates
        .into_iter()
        .filter(|c| opts.decode_profiles || c.name.artifact == ArtifactKind::Stats)
        .collect();

    let mut stats = Vec::new();
    let mut profiles = Vec::new();
    let mut warnings = Vec::new();
    for (path, outcome) in decode_all(candidates, opts) {
        match outcome {
            Ok(Decoded {
                value: Artifact::Stats(job),
                warnings: dropped,
            }) => {
                warnings.extend(dropped.into_iter().map(|w| (path.clone(), w)));
                stats.push((path, job));
            }
            Ok(Decoded {
                value: Artifact::Profile(profs),
                warnings: dropped,
            }) => {
                warnings.extend(dropped.into_iter().map(|w| (path.clone(), w)));
                profiles.push((path, profs));
            }
            Err(err) => errors.push(err),
        }
    }

    // Path breaks ties between jobs with the same identity in different subdirectories
    stats.sort_by(|(pa, a), (pb, b)| (sort_key(a.info()), pa).cmp(&(sort_key(b.info()), pb)));
    profiles.sort_by(|(pa, a), (pb, b)| (sort_key(a.info()), pa).cmp(&(sort_key(b.info()), pb)));
    warnings.sort_by(|(pa, a), (pb, b)| (pa, a.line_no).cmp(&(pb, b.line_no)));
    errors.sort_by(|a, b| a.path().cmp(b.path()));

    let report = ScanReport {
        stats: stats.into_iter().map(|(_, job)| job).collect(),
        profiles: profiles.into_iter().map(|(_, profs)| profs).collect(),
        errors,
        warnings,
    };

    tracing::info!(
        "Scanned {}: {} stats, {} profiles, {} errors, {} dropped lines",
        root.display(),
        report.stats.len(),
        report.profiles.len(),
        report.errors.len(),
        report.warnings.len()
    );
    Ok(report)
}

/// List recognized profile artifacts without decoding them
///
/// Unrecognized entries are ignored here; [`scan`] reports them.
pub fn list_profiles(root: &Path, opts: &ScanOptions) -> Result<Vec<ArtifactRef>, LoadError> {
    let (candidates, _) = collect_artifacts(root, opts)?;
    Ok(candidates
        .into_iter()
        .filter(|c| c.name.artifact == ArtifactKind::Profile)
        .collect())
}

fn sort_key(info: &JobInfo) -> (u64, u64, &str) {
    (info.start_usec, info.pid, info.module.as_str())
}

/// Validate the root; fatal errors come from here only
pub(crate) fn check_root(root: &Path) -> Result<fs::Metadata, LoadError> {
    let meta = fs::metadata(root).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => LoadError::NotFound(root.to_path_buf()),
        _ => LoadError::Unreadable {
            path: root.to_path_buf(),
            source,
        },
    })?;
    if !meta.is_dir() {
        return Err(LoadError::NotADirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|source| LoadError::Unreadable {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(meta)
}

/// Walk the directory once and classify every entry
fn collect_artifacts(
    root: &Path,
    opts: &ScanOptions,
) -> Result<(Vec<ArtifactRef>, Vec<EntryError>), LoadError> {
    check_root(root)?;

    let max_depth = if opts.recursive { usize::MAX } else { 1 };
    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter();

    let mut artifacts = Vec::new();
    let mut errors = Vec::new();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                tracing::warn!("Skipping unreadable entry {}: {}", path.display(), err);
                errors.push(EntryError::Unreadable {
                    path,
                    source: err.into(),
                });
                continue;
            }
        };

        let is_dir = entry.file_type().is_dir();
        let name = entry
            .file_name()
            .to_str()
            .and_then(|n| {
                opts.decode
                    .scheme
                    .classify(n, opts.decode.allow_unknown_kinds)
            });

        match name {
            Some(name) if is_dir && name.artifact == ArtifactKind::Profile => {
                walker.skip_current_dir();
                artifacts.push(ArtifactRef {
                    path: entry.into_path(),
                    name,
                    is_dir: true,
                });
            }
            // Plain subdirectory: walkdir descends when recursive
            _ if is_dir => {}
            Some(name) => match is_regular_file(&entry) {
                Ok(true) => artifacts.push(ArtifactRef {
                    path: entry.into_path(),
                    name,
                    is_dir: false,
                }),
                // FIFOs, sockets and devices can block on open
                Ok(false) => {
                    tracing::warn!("Skipping non-regular file {}", entry.path().display());
                    errors.push(malformed(
                        entry.path(),
                        name.artifact,
                        "not a regular file".to_string(),
                    ));
                }
                Err(source) => errors.push(EntryError::Unreadable {
                    path: entry.into_path(),
                    source,
                }),
            },
            None => {
                tracing::debug!("Unrecognized filename: {}", entry.path().display());
                errors.push(EntryError::UnrecognizedFilename(entry.into_path()));
            }
        }
    }

    Ok((artifacts, errors))
}

enum Artifact {
    Stats(JobStats),
    Profile(JobProfs),
}

type Outcome = (PathBuf, Result<Decoded<Artifact>, EntryError>);

fn decode_one(candidate: ArtifactRef, opts: &ScanOptions) -> Outcome {
    let outcome = match candidate.name.artifact {
        ArtifactKind::Stats => candidate
            .load_stats(opts)
            .map(|d| d.map(Artifact::Stats)),
        ArtifactKind::Profile => candidate
            .load_profile(opts)
            .map(|d| d.map(Artifact::Profile)),
    };
    if let Err(err) = &outcome {
        tracing::debug!("{}", err);
    }
    (candidate.path, outcome)
}

/// Decode every candidate on a bounded worker pool
fn decode_all(candidates: Vec<ArtifactRef>, opts: &ScanOptions) -> Vec<Outcome> {
    let workers = opts.effective_workers().min(candidates.len());
    if workers <= 1 {
        return candidates.into_iter().map(|c| decode_one(c, opts)).collect();
    }

    let (task_tx, task_rx) = crossbeam::channel::bounded::<ArtifactRef>(workers * 4);
    let (done_tx, done_rx) = crossbeam::channel::unbounded::<Outcome>();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let task_rx = task_rx.clone();
            let done_tx = done_tx.clone();
            scope.spawn(move || {
                for candidate in task_rx {
                    if done_tx.send(decode_one(candidate, opts)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(task_rx);
        drop(done_tx);

        for candidate in candidates {
            if task_tx.send(candidate).is_err() {
                break;
            }
        }
        drop(task_tx);

        done_rx.iter().collect()
    })
}

/// Symlinks count as regular files when their target is one
fn is_regular_file(entry: &walkdir::DirEntry) -> std::io::Result<bool> {
    let file_type = entry.file_type();
    if file_type.is_symlink() {
        return fs::metadata(entry.path()).map(|m| m.is_file());
    }
    Ok(file_type.is_file())
}

fn malformed(path: &Path, artifact: ArtifactKind, reason: String) -> EntryError {
    match artifact {
        ArtifactKind::Stats => EntryError::MalformedStatsFile {
            path: path.to_path_buf(),
            reason,
        },
        ArtifactKind::Profile => EntryError::MalformedProfileFile {
            path: path.to_path_buf(),
            reason,
        },
    }
}

fn read_bounded(path: &Path, limit: u64, artifact: ArtifactKind) -> Result<Vec<u8>, EntryError> {
    let unreadable = |source| EntryError::Unreadable {
        path: path.to_path_buf(),
        source,
    };
    // Checked before open: opening a FIFO blocks until a writer shows up
    if !fs::metadata(path).map_err(unreadable)?.is_file() {
        return Err(malformed(path, artifact, "not a regular file".to_string()));
    }
    let file = fs::File::open(path).map_err(unreadable)?;
    let len = file.metadata().map_err(unreadable)?.len();
    if len > limit {
        let reason = format!("{} bytes exceeds the {} byte limit", len, limit);
        return Err(malformed(path, artifact, reason));
    }

    // The file may still be growing; never read past the limit
    let mut bytes = Vec::with_capacity(len as usize);
    file.take(limit)
        .read_to_end(&mut bytes)
        .map_err(unreadable)?;
    Ok(bytes)
}

/// Read every regular file of a profile directory, in file-name order
fn read_profile_dir(dir: &Path, limit: u64) -> Result<Vec<Vec<u8>>, EntryError> {
    let mut streams = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| EntryError::Unreadable {
            path: dir.to_path_buf(),
            source: err.into(),
        })?;
        if entry.file_type().is_file() {
            streams.push(read_bounded(entry.path(), limit, ArtifactKind::Profile)?);
        }
    }
    Ok(streams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobKind;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_one_good_file_and_one_unrecognized() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "t0.pid1.typecheck.Foo.swift", "AST.NumDecls 12\n");
        write(tmp.path(), "README.txt", "not stats\n");

        let report = scan(tmp.path(), &ScanOptions::default()).unwrap();
        assert_eq!(report.stats.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            report.errors[0],
            EntryError::UnrecognizedFilename(_)
        ));
    }

    #[test]
    fn test_malformed_file_does_not_abort_scan() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "t0.pid1.parse.A", "A 1\n");
        write(tmp.path(), "t1.pid2.parse.B", "complete garbage\n");
        write(tmp.path(), "t2.pid3.parse.C", "C 3\nbroken\n");

        let report = scan(tmp.path(), &ScanOptions::default()).unwrap();
        assert_eq!(report.stats.len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            report.errors[0],
            EntryError::MalformedStatsFile { .. }
        ));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].0.ends_with("t2.pid3.parse.C"));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_results_are_sorted_by_start_time() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "t30.pid1.parse.A", "A 1\n");
        write(tmp.path(), "t10.pid2.parse.B", "A 1\n");
        write(tmp.path(), "t20.pid3.parse.C", "A 1\n");

        let opts = ScanOptions {
            workers: 3,
            ..ScanOptions::default()
        };
        let report = scan(tmp.path(), &opts).unwrap();
        let starts: Vec<_> = report.stats.iter().map(|j| j.start_usec()).collect();
        assert_eq!(starts, [10, 20, 30]);
    }

    #[test]
    fn test_root_errors_are_fatal() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(matches!(
            scan(&missing, &ScanOptions::default()),
            Err(LoadError::NotFound(_))
        ));

        let file = tmp.path().join("t0.pid1.parse.A");
        fs::write(&file, "A 1\n").unwrap();
        assert!(matches!(
            scan(&file, &ScanOptions::default()),
            Err(LoadError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_non_recursive_ignores_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("build-2");
        fs::create_dir(&nested).unwrap();
        write(tmp.path(), "t0.pid1.parse.A", "A 1\n");
        write(&nested, "t1.pid2.parse.B", "A 2\n");

        let report = scan(tmp.path(), &ScanOptions::default()).unwrap();
        assert_eq!(report.stats.len(), 1);
        assert!(report.errors.is_empty());

        let recursive = ScanOptions {
            recursive: true,
            ..ScanOptions::default()
        };
        let report = scan(tmp.path(), &recursive).unwrap();
        assert_eq!(report.stats.len(), 2);
    }

    #[test]
    fn test_oversized_file_is_reported() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "t0.pid1.parse.A", "A 1\nB 2\nC 3\n");
        let opts = ScanOptions {
            max_file_bytes: 4,
            ..ScanOptions::default()
        };
        let report = scan(tmp.path(), &opts).unwrap();
        assert!(report.stats.is_empty());
        assert!(matches!(
            report.errors[0],
            EntryError::MalformedStatsFile { .. }
        ));
    }

    #[test]
    fn test_profiles_are_decoded_and_listed() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "t0.pid1.irgen.A", "A 1\n");
        write(tmp.path(), "profile.t0.pid1.irgen.A", "main 1 4\nhelper 3 3\n");

        let report = scan(tmp.path(), &ScanOptions::default()).unwrap();
        assert_eq!(report.profiles.len(), 1);
        assert_eq!(report.profiles[0].entries().len(), 2);
        assert_eq!(report.profiles[0].id(), report.stats[0].id());

        let listed = list_profiles(tmp.path(), &ScanOptions::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].job().kind, JobKind::IrGen);
        assert!(!listed[0].is_dir);

        let skip = ScanOptions {
            decode_profiles: false,
            ..ScanOptions::default()
        };
        assert!(scan(tmp.path(), &skip).unwrap().profiles.is_empty());
    }

    #[test]
    fn test_profile_directory_streams() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp
            .path()
            .join("profile-100-swift-frontend-Foo-main.swift-x86_64_apple_macosx10.9-o-Onone-7.dir");
        fs::create_dir(&dir).unwrap();
        write(&dir, "b.events", "second 1 1\n");
        write(&dir, "a.events", "first 2 2\n");

        let listed = list_profiles(tmp.path(), &ScanOptions::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_dir);

        let profs = listed[0].load_profile(&ScanOptions::default()).unwrap().value;
        let symbols: Vec<_> = profs.entries().iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, ["first", "second"]);

        // Stream files inside the profile directory are not separate entries
        let recursive = ScanOptions {
            recursive: true,
            ..ScanOptions::default()
        };
        let report = scan(tmp.path(), &recursive).unwrap();
        assert!(report.errors.is_empty());
        assert_eq!(report.profiles.len(), 1);
    }

    #[test]
    fn test_load_stats_on_profile_ref_is_rejected() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "profile.t0.pid1.irgen.A", "main 1 4\n");
        let listed = list_profiles(tmp.path(), &ScanOptions::default()).unwrap();
        assert!(listed[0].load_stats(&ScanOptions::default()).is_err());
    }

    /// Run a scan on a helper thread so a blocking entry fails the test instead of hanging it
    #[cfg(unix)]
    fn scan_with_deadline(root: &Path, opts: &ScanOptions) -> ScanReport {
        let (tx, rx) = crossbeam::channel::bounded(1);
        let root = root.to_path_buf();
        let opts = opts.clone();
        std::thread::spawn(move || {
            let _ = tx.send(scan(&root, &opts));
        });
        rx.recv_timeout(std::time::Duration::from_secs(10))
            .expect("scan blocked on a directory entry")
            .unwrap()
    }

    #[test]
    #[cfg(unix)]
    fn test_fifo_entry_is_an_error_not_a_hang() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "t0.pid1.parse.A", "A 1\n");
        let fifo = tmp.path().join("t1.pid2.parse.B");
        let status = std::process::Command::new("mkfifo")
            .arg(&fifo)
            .status()
            .unwrap();
        assert!(status.success());

        let report = scan_with_deadline(tmp.path(), &ScanOptions::default());
        assert_eq!(report.stats.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path(), fifo.as_path());
        assert!(matches!(
            &report.errors[0],
            EntryError::MalformedStatsFile { reason, .. } if reason == "not a regular file"
        ));

        // Lazy loading refuses it too
        let fifo_ref = ArtifactRef {
            path: fifo.clone(),
            name: crate::naming::NamingScheme::DottedV1
                .classify("t1.pid2.parse.B", true)
                .unwrap(),
            is_dir: false,
        };
        assert!(matches!(
            fifo_ref.load_stats(&ScanOptions::default()),
            Err(EntryError::MalformedStatsFile { .. })
        ));
    }

    #[test]
    #[cfg(unix)]
    fn test_socket_entry_is_an_error() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "t0.pid1.parse.A", "A 1\n");
        let _listener =
            std::os::unix::net::UnixListener::bind(tmp.path().join("t1.pid2.parse.B")).unwrap();

        let report = scan_with_deadline(tmp.path(), &ScanOptions::default());
        assert_eq!(report.stats.len(), 1);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    #[cfg(unix)]
    fn test_symlinks() {
        let tmp = TempDir::new().unwrap();
        let target_dir = tmp.path().join("elsewhere");
        fs::create_dir(&target_dir).unwrap();
        write(&target_dir, "real", "A 5\n");

        let root = tmp.path().join("stats");
        fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(target_dir.join("real"), root.join("t0.pid1.parse.A")).unwrap();
        std::os::unix::fs::symlink(&target_dir, root.join("t1.pid2.parse.B")).unwrap();
        std::os::unix::fs::symlink(root.join("missing"), root.join("t2.pid3.parse.C")).unwrap();

        let report = scan_with_deadline(&root, &ScanOptions::default());
        assert_eq!(report.stats.len(), 1);
        assert_eq!(report.stats[0].counter("A"), 5);
        assert_eq!(report.errors.len(), 2);
        assert!(matches!(
            report.errors[0],
            EntryError::MalformedStatsFile { .. }
        ));
        assert!(report.errors[0].path().ends_with("t1.pid2.parse.B"));
        assert!(matches!(report.errors[1], EntryError::Unreadable { .. }));
        assert!(report.errors[1].path().ends_with("t2.pid3.parse.C"));
    }

    #[test]
    fn test_report_order_does_not_depend_on_workers() {
        let tmp = TempDir::new().unwrap();
        for i in 0..48 {
            write(
                tmp.path(),
                &format!("t{}.pid{}.parse.M", i % 4, i),
                "A 1\nbroken\nB two\n",
            );
        }
        let opts = ScanOptions {
            workers: 8,
            ..ScanOptions::default()
        };

        let expected = scan(
            tmp.path(),
            &ScanOptions {
                workers: 1,
                ..ScanOptions::default()
            },
        )
        .unwrap();
        let mut paths: Vec<_> = expected.warnings.iter().map(|(p, w)| (p.clone(), w.line_no)).collect();
        assert_eq!(paths.len(), 96);
        let unsorted = paths.clone();
        paths.sort();
        assert_eq!(paths, unsorted);

        for _ in 0..20 {
            let report = scan(tmp.path(), &opts).unwrap();
            assert_eq!(report.stats, expected.stats);
            assert_eq!(report.warnings, expected.warnings);
        }
    }

    #[test]
    fn test_identical_jobs_in_subdirectories_sort_by_path() {
        let tmp = TempDir::new().unwrap();
        for (dir, value) in [("b", "2"), ("a", "1"), ("c", "3")] {
            let nested = tmp.path().join(dir);
            fs::create_dir(&nested).unwrap();
            write(&nested, "t0.pid1.parse.M", &format!("A {}\n", value));
        }
        let opts = ScanOptions {
            recursive: true,
            workers: 3,
            ..ScanOptions::default()
        };
        for _ in 0..10 {
            let report = scan(tmp.path(), &opts).unwrap();
            let values: Vec<_> = report.stats.iter().map(|j| j.counter("A")).collect();
            assert_eq!(values, [1, 2, 3]);
        }
    }

    #[test]
    fn test_effective_workers() {
        let opts = ScanOptions {
            workers: 3,
            ..ScanOptions::default()
        };
        assert_eq!(opts.effective_workers(), 3);
        assert!(ScanOptions::default().effective_workers() >= 1);
    }
}
