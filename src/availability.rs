//! # Data Availability Index
//!
//! Lists the daily and monthly files on disk and turns their names into
//! calendar keys. The first and last keys bound what a user may request.
//!
//! Listing is done fresh on every call. Files whose names do not match the
//! expected pattern are logged and skipped, so stray files in a data
//! directory never break the index.

use crate::calendar::{Cadence, CalendarKey, YearMonth};
use crate::error::{PlotError, PlotResult};
use crate::input::DataConfig;
use chrono::NaiveDate;
use log::{debug, warn};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A data file and the calendar key parsed from its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableFile<K> {
    pub key: K,
    pub path: PathBuf,
}

/// First and last calendar keys with data on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability<K> {
    pub first: K,
    pub last: K,
    pub count: usize,
}

impl<K: CalendarKey> Availability<K> {
    pub fn contains(&self, key: K) -> bool {
        self.first <= key && key <= self.last
    }
}

/// Lists every regular file in `dir`, sorted by name.
///
/// The fixed zero-padded naming makes lexicographic order chronological.
pub fn list_paths(dir: &Path) -> PlotResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PlotError::NoDataFound {
                dir: dir.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }

    if paths.is_empty() {
        return Err(PlotError::NoDataFound {
            dir: dir.to_path_buf(),
        });
    }

    paths.sort();
    debug!("Found {} files in {}", paths.len(), dir.display());
    Ok(paths)
}

pub fn list_daily_paths(config: &DataConfig) -> PlotResult<Vec<PathBuf>> {
    list_paths(&config.dir_for(Cadence::Daily))
}

pub fn list_monthly_paths(config: &DataConfig) -> PlotResult<Vec<PathBuf>> {
    list_paths(&config.dir_for(Cadence::Monthly))
}

/// Pattern matching file names of the given key type, e.g. `^cfsr\.(\d{4})(\d{2})(\d{2})\.nc$`.
pub fn filename_pattern<K: CalendarKey>(config: &DataConfig) -> PlotResult<Regex> {
    let pattern = format!(
        r"^{}\.{}\.{}$",
        regex::escape(&config.file_prefix),
        K::STAMP_PATTERN,
        regex::escape(&config.file_extension)
    );
    Regex::new(&pattern)
        .map_err(|e| PlotError::Config(format!("Invalid file name pattern '{}': {}", pattern, e)))
}

/// Parses the calendar key from a file name, or `None` if it does not match.
pub fn parse_filename<K: CalendarKey>(pattern: &Regex, file_name: &str) -> Option<K> {
    pattern
        .captures(file_name)
        .and_then(|caps| K::from_stamp_captures(&caps))
}

/// Lists the files of cadence `K` with their parsed keys, in ascending order.
pub fn list_available<K: CalendarKey>(config: &DataConfig) -> PlotResult<Vec<AvailableFile<K>>> {
    let pattern = filename_pattern::<K>(config)?;
    let paths = list_paths(&config.dir_for(K::CADENCE))?;

    let mut files: Vec<AvailableFile<K>> = paths
        .into_iter()
        .filter_map(|path| {
            let key = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|name| parse_filename::<K>(&pattern, name));
            match key {
                Some(key) => Some(AvailableFile { key, path }),
                None => {
                    warn!("A file with invalid format was found: {}", path.display());
                    None
                }
            }
        })
        .collect();

    files.sort_by_key(|f| f.key);
    Ok(files)
}

pub fn list_daily_data_dates(config: &DataConfig) -> PlotResult<Vec<NaiveDate>> {
    Ok(list_available::<NaiveDate>(config)?
        .into_iter()
        .map(|f| f.key)
        .collect())
}

pub fn list_monthly_data_yearmonths(config: &DataConfig) -> PlotResult<Vec<YearMonth>> {
    Ok(list_available::<YearMonth>(config)?
        .into_iter()
        .map(|f| f.key)
        .collect())
}

/// First and last available keys of cadence `K`.
pub fn available_bounds<K: CalendarKey>(config: &DataConfig) -> PlotResult<Availability<K>> {
    let files = list_available::<K>(config)?;
    match (files.first(), files.last()) {
        (Some(first), Some(last)) => Ok(Availability {
            first: first.key,
            last: last.key,
            count: files.len(),
        }),
        _ => Err(PlotError::NoDataFound {
            dir: config.dir_for(K::CADENCE),
        }),
    }
}

pub fn min_daily_date(config: &DataConfig) -> PlotResult<NaiveDate> {
    Ok(available_bounds::<NaiveDate>(config)?.first)
}

pub fn max_daily_date(config: &DataConfig) -> PlotResult<NaiveDate> {
    Ok(available_bounds::<NaiveDate>(config)?.last)
}

pub fn min_monthly_yearmonth(config: &DataConfig) -> PlotResult<YearMonth> {
    Ok(available_bounds::<YearMonth>(config)?.first)
}

pub fn max_monthly_yearmonth(config: &DataConfig) -> PlotResult<YearMonth> {
    Ok(available_bounds::<YearMonth>(config)?.last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_daily_filename() {
        let config = DataConfig::default();
        let pattern = filename_pattern::<NaiveDate>(&config).unwrap();

        assert_eq!(
            parse_filename::<NaiveDate>(&pattern, "cfsr.20000103.nc"),
            NaiveDate::from_ymd_opt(2000, 1, 3)
        );
        assert_eq!(parse_filename::<NaiveDate>(&pattern, "cfsr.200001.nc"), None);
        assert_eq!(parse_filename::<NaiveDate>(&pattern, "cfsr.20000231.nc"), None);
        assert_eq!(parse_filename::<NaiveDate>(&pattern, "cfsr.20000103.nc.tmp"), None);
        assert_eq!(parse_filename::<NaiveDate>(&pattern, "cfsrX20000103.nc"), None);
        assert_eq!(parse_filename::<NaiveDate>(&pattern, "README"), None);
    }

    #[test]
    fn test_parse_monthly_filename() {
        let config = DataConfig::default();
        let pattern = filename_pattern::<YearMonth>(&config).unwrap();

        assert_eq!(
            parse_filename::<YearMonth>(&pattern, "cfsr.198203.nc"),
            Some(YearMonth::new(1982, 3).unwrap())
        );
        assert_eq!(parse_filename::<YearMonth>(&pattern, "cfsr.198213.nc"), None);
        assert_eq!(parse_filename::<YearMonth>(&pattern, "cfsr.19820301.nc"), None);
    }

    #[test]
    fn test_availability_contains() {
        let bounds = Availability {
            first: YearMonth::new(1979, 1).unwrap(),
            last: YearMonth::new(2020, 12).unwrap(),
            count: 504,
        };
        assert!(bounds.contains(YearMonth::new(1979, 1).unwrap()));
        assert!(bounds.contains(YearMonth::new(2020, 12).unwrap()));
        assert!(!bounds.contains(YearMonth::new(2021, 1).unwrap()));
    }
}
