// Loader configuration
//
// One TOML file describes how a stats directory is read: filename grammar,
// decoding tolerances, scanner limits, selectors, and the merge rule.

use crate::merge::MergeBy;
use crate::naming::NamingScheme;
use crate::query::{LoadOptions, Selectors};
use crate::scan::ScanOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Loader configuration
///
/// Every section is optional; missing keys take their defaults.
///
/// # Example
/// ```
/// use jobstats::config::LoaderConfig;
/// use jobstats::naming::NamingScheme;
///
/// let config = LoaderConfig::from_toml_str(r#"
///     [scan]
///     recursive = true
///
///     [scan.decode]
///     scheme = "dotted-v1"
///
///     [select]
///     kinds = ["typecheck"]
/// "#)?;
/// assert!(config.scan.recursive);
/// assert_eq!(config.scan.decode.scheme, NamingScheme::DottedV1);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    pub scan: ScanOptions,
    pub select: Selectors,
    /// Combination rule for merged reports
    pub merge_by: MergeBy,
}

impl LoaderConfig {
    /// Load and validate a configuration file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read loader config: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid loader config: {}", path.as_ref().display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LoaderConfig =
            toml::from_str(content).context("Failed to parse TOML loader config")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Strict configuration for CI: only known job kinds, small files, no guessing
    /// the filename grammar.
    pub fn strict() -> Self {
        let mut scan = ScanOptions {
            max_file_bytes: 8 * 1024 * 1024,
            ..ScanOptions::default()
        };
        scan.decode.scheme = NamingScheme::SwiftV1;
        scan.decode.allow_unknown_kinds = false;
        Self {
            scan,
            ..Self::default()
        }
    }

    /// Whole build tree: recurse, counters only
    pub fn build_tree() -> Self {
        Self {
            scan: ScanOptions {
                recursive: true,
                decode_profiles: false,
                ..ScanOptions::default()
            },
            select: Selectors {
                exclude_timers: true,
                ..Selectors::default()
            },
            merge_by: MergeBy::Sum,
        }
    }

    /// Options for the loading entry points
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            scan: self.scan.clone(),
            select: self.select.clone(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.scan.max_file_bytes == 0 {
            return Err("scan.max_file_bytes must be > 0".to_string());
        }

        if self.scan.decode.timer_prefix.is_empty() {
            return Err("scan.decode.timer_prefix must not be empty".to_string());
        }

        if self.scan.decode.wall_suffix.is_empty() {
            return Err("scan.decode.wall_suffix must not be empty".to_string());
        }

        if let Some(kind) = self.select.kinds.iter().find(|k| k.tag().is_empty()) {
            return Err(format!("select.kinds contains an empty tag: {:?}", kind));
        }

        self.select.compile().map_err(|e| e.to_string())?;

        Ok(())
    }
}
