//! # Data Configuration Module
//!
//! This module describes where CFSR data lives on disk and how its files are
//! named. It handles JSON and YAML configuration files; every field has a
//! default matching the production layout, so an empty file is a valid
//! configuration.
//!
//! ## Layout
//!
//! - **data_dir**: Root of all data (`/data`)
//! - **daily_dir** / **monthly_dir**: Directories holding one file per day or
//!   month, relative to `data_dir` unless absolute
//! - **daily_climatology** / **monthly_climatology**: The two pre-computed
//!   climatology files
//! - **file_prefix** / **file_extension**: File names are
//!   `<prefix>.<YYYYMMDD>.<ext>` (daily) and `<prefix>.<YYYYMM>.<ext>` (monthly)
//! - **epoch_start**: First day of the reanalysis record
//! - **variables**: The variable descriptor table
//!
//! ## Example Usage
//!
//! ```rust
//! use reanalysis_plots::input::DataConfig;
//!
//! let json = r#"
//! {
//!   "data_dir": "/srv/cfsr",
//!   "file_prefix": "cfsr"
//! }"#;
//! let config = DataConfig::from_json(json)?;
//! assert_eq!(config.daily_path(chrono::NaiveDate::from_ymd_opt(2000, 1, 3).unwrap()),
//!            std::path::PathBuf::from("/srv/cfsr/daily/cfsr.20000103.nc"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::calendar::{Cadence, CalendarKey, YearMonth};
use crate::error::{PlotError, PlotResult};
use crate::variables::VariableTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding [`DataConfig::data_dir`]
pub const DATA_DIR_ENV: &str = "REANALYSIS_PLOTS_DATA_DIR";

/// On-disk layout of the CFSR data and the static variable table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root of all data files
    pub data_dir: PathBuf,
    /// Directory of daily files
    pub daily_dir: PathBuf,
    /// Directory of monthly files
    pub monthly_dir: PathBuf,
    /// Climatology keyed by day of year (`MM-DD`)
    pub daily_climatology: PathBuf,
    /// Climatology keyed by month of year (1-12)
    pub monthly_climatology: PathBuf,
    /// File name prefix shared by daily and monthly files
    pub file_prefix: String,
    /// File name extension, without the dot
    pub file_extension: String,
    /// First day of the reanalysis record
    pub epoch_start: NaiveDate,
    /// Plottable variables
    pub variables: VariableTable,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            data_dir: PathBuf::from("/data"),
            daily_dir: PathBuf::from("daily"),
            monthly_dir: PathBuf::from("monthly"),
            daily_climatology: PathBuf::from("climatology/cfsr.daily_climatology.1981-2010.nc"),
            monthly_climatology: PathBuf::from(
                "climatology/cfsr.monthly_climatology.1981-2010.nc",
            ),
            file_prefix: "cfsr".to_string(),
            file_extension: "nc".to_string(),
            epoch_start: NaiveDate::from_ymd_opt(1979, 1, 1).unwrap_or_default(),
            variables: VariableTable::cfsr(),
        }
    }
}

impl DataConfig {
    /// Default layout rooted at `data_dir`.
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        DataConfig {
            data_dir: data_dir.into(),
            ..DataConfig::default()
        }
    }

    /// Loads a configuration from a JSON or YAML file.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML, anything else as JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlotResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content)?,
            _ => Self::from_json(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json_str: &str) -> PlotResult<Self> {
        let config: DataConfig = serde_json::from_str(json_str)?;
        Ok(config)
    }

    pub fn from_yaml(yaml_str: &str) -> PlotResult<Self> {
        let config: DataConfig = serde_yaml::from_str(yaml_str)?;
        Ok(config)
    }

    /// Applies environment variable overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| env::var(name).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Blank values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_ENV)
            && !dir.trim().is_empty()
        {
            self.data_dir = PathBuf::from(dir.trim());
        }
        self
    }

    /// Checks the configuration for values that would make every request fail.
    pub fn validate(&self) -> PlotResult<()> {
        if self.file_prefix.is_empty() {
            return Err(PlotError::Config("file_prefix must not be empty".to_string()));
        }
        if self.file_extension.is_empty() {
            return Err(PlotError::Config("file_extension must not be empty".to_string()));
        }
        if self.variables.is_empty() {
            return Err(PlotError::Config("variables table must not be empty".to_string()));
        }
        if let Some(bad) = self.variables.iter().find(|v| v.levels.is_empty()) {
            return Err(PlotError::Config(format!(
                "variable '{}' has no levels",
                bad.code
            )));
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        // `join` keeps absolute paths as they are
        self.data_dir.join(path)
    }

    /// Directory holding the files of the given cadence.
    pub fn dir_for(&self, cadence: Cadence) -> PathBuf {
        match cadence {
            Cadence::Daily => self.resolve(&self.daily_dir),
            Cadence::Monthly => self.resolve(&self.monthly_dir),
        }
    }

    /// Climatology file matching the given cadence.
    pub fn climatology_path(&self, cadence: Cadence) -> PathBuf {
        match cadence {
            Cadence::Daily => self.resolve(&self.daily_climatology),
            Cadence::Monthly => self.resolve(&self.monthly_climatology),
        }
    }

    /// File name for a calendar key, e.g. `cfsr.20000103.nc`.
    pub fn file_name<K: CalendarKey>(&self, key: K) -> String {
        format!(
            "{}.{}.{}",
            self.file_prefix,
            key.file_stamp(),
            self.file_extension
        )
    }

    /// Canonical path of the file holding `key`.
    pub fn path_for<K: CalendarKey>(&self, key: K) -> PathBuf {
        self.dir_for(K::CADENCE).join(self.file_name(key))
    }

    pub fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.path_for(date)
    }

    pub fn monthly_path(&self, month: YearMonth) -> PathBuf {
        self.path_for(month)
    }

    /// Path relative to the data root, for display to users.
    ///
    /// Paths outside the data root are reduced to their file name.
    pub fn relative_to_root(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.data_dir) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| path.to_path_buf()),
        }
    }

    /// Error for a file that should exist but does not.
    pub fn file_not_found(&self, path: &Path) -> PlotError {
        PlotError::FileNotFound {
            path: path.to_path_buf(),
            relative: self.relative_to_root(path),
        }
    }
}
