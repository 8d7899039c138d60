//! # reanalysis-plots
//!
//! Data selection and reduction back-end for CFSR reanalysis map plots.
//!
//! Given a variable, an analysis level and a day or month range, the crate
//! finds the matching daily or monthly NetCDF files, reads them, averages
//! them into one 2D latitude/longitude grid and, on request, subtracts the
//! 1981-2010 climatology to produce an anomaly grid.
//!
//! ## Features
//!
//! - **Calendar ranges**: inclusive day and month ranges, generic over [`calendar::CalendarKey`]
//! - **Availability index**: first/last day or month on disk, from file names
//! - **Eager loading**: files are read into memory and closed before reduction
//! - **Reduction**: level selection by label, then a NaN-skipping time mean
//! - **Anomalies**: grid minus the climatology of the same calendar positions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reanalysis_plots::{process_plot_request, input::DataConfig, request::DailyPlotRequest};
//! use chrono::NaiveDate;
//!
//! let config = DataConfig::with_data_dir("/data");
//! let request = DailyPlotRequest::new(
//!     "T",
//!     "500mb",
//!     NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2000, 1, 5),
//! );
//!
//! let plot = process_plot_request(&config, &request)?;
//! println!("{} {:?}", plot.title, plot.grid.shape());
//! # Ok::<(), reanalysis_plots::error::PlotError>(())
//! ```

pub mod availability;
pub mod calendar;
pub mod cli;
pub mod climatology;
pub mod dataset;
pub mod error;
pub mod info;
pub mod input;
pub mod log;
pub mod output;
pub mod read;
pub mod reduce;
pub mod request;
pub mod variables;

#[cfg(test)]
mod cli_tests;

use crate::availability::available_bounds;
use crate::calendar::CalendarKey;
use crate::climatology::diff_from_climatology;
use crate::dataset::DataArray;
use crate::error::PlotResult;
use crate::input::DataConfig;
use crate::log::{dataset_echo, request_echo};
use crate::read::DatasetLoader;
use crate::reduce::reduce_dataset;
use crate::request::PlotRequest;
use std::path::PathBuf;

/// A reduced grid ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct PlotData {
    /// 2D latitude/longitude grid, or its anomaly
    pub grid: DataArray,
    pub title: String,
    pub contour: bool,
    pub anomaly: bool,
    /// Data files the grid was computed from, in calendar order
    pub sources: Vec<PathBuf>,
}

/// Runs one plot request through the whole pipeline.
///
/// 1. Validates the request against the variable table and the record start
/// 2. Checks the range against the files on disk
/// 3. Loads every file in the range and reduces it to a 2D grid
/// 4. Subtracts the climatology when an anomaly is requested
/// 5. Builds the title
///
/// # Errors
///
/// Request problems are reported as [`error::PlotError::InvalidRequest`]
/// before any file is opened. A day or month inside the available bounds
/// whose file is missing is [`error::PlotError::FileNotFound`].
pub fn process_plot_request<K: CalendarKey>(
    config: &DataConfig,
    request: &PlotRequest<K>,
) -> PlotResult<PlotData> {
    process_plot_request_with_progress(config, request, false)
}

/// Same as [`process_plot_request`], optionally showing a progress bar while
/// files are read.
pub fn process_plot_request_with_progress<K: CalendarKey>(
    config: &DataConfig,
    request: &PlotRequest<K>,
    show_progress: bool,
) -> PlotResult<PlotData> {
    request_echo(request);
    request.validate(&config.variables, config.epoch_start)?;

    let bounds = available_bounds::<K>(config)?;
    request.check_available(&bounds)?;

    let loader = DatasetLoader::new(config)
        .with_variables([request.variable.as_str()])
        .with_progress(show_progress);

    // The dataset is dropped as soon as the grid is extracted
    let (grid, sources) = {
        let dataset = loader.open_calendar_range(&request.range)?;
        dataset_echo(&dataset);
        let grid = reduce_dataset(&dataset, &request.variable, &request.level)?;
        (grid, dataset.sources)
    };

    let grid = if request.anomaly {
        let climatology = loader.open_climatology(K::CADENCE)?;
        diff_from_climatology(&grid, &climatology, &request.variable, &request.level, &request.range)?
    } else {
        grid
    };

    let title = request.title(&grid);

    Ok(PlotData {
        grid,
        title,
        contour: request.contour,
        anomaly: request.anomaly,
        sources,
    })
}
