//! # Grid Output Module
//!
//! Writes a reduced grid to a NetCDF file for the rendering front-end, and
//! prints short summaries of grids, availability and the variable table in
//! human, JSON or YAML form.
//!
//! The NetCDF file holds the 2D grid under the variable's code, one
//! coordinate variable per dimension that has coordinates, the variable
//! attributes (`long_name`, `units`, `analysis_level`, ...) and the global
//! attributes `title`, `anomaly`, `contour` and `sources`.

use crate::PlotData;
use crate::availability::Availability;
use crate::calendar::CalendarKey;
use crate::cli::OutputFormat;
use crate::dataset::{Coordinate, FILL_VALUE_ATTR};
use crate::error::PlotResult;
use crate::input::DataConfig;
use crate::variables::VariableTable;
use log::debug;
use serde::Serialize;
use std::path::Path;

/// Writes `plot` to a new NetCDF file at `output_path`, replacing any existing file.
pub fn write_grid_netcdf(plot: &PlotData, output_path: &Path) -> PlotResult<()> {
    let grid = &plot.grid;
    debug!(
        "Writing grid '{}' {:?} to {}",
        grid.name,
        grid.shape(),
        output_path.display()
    );

    let mut file = netcdf::create(output_path)?;

    for dim in &grid.dims {
        file.add_dimension(&dim.name, dim.len)?;
    }

    for dim in &grid.dims {
        match grid.coords.get(&dim.name) {
            Some(Coordinate::Values(values)) => {
                let mut var = file.add_variable::<f64>(&dim.name, &[dim.name.as_str()])?;
                var.put_values(values, ..)?;
            }
            Some(Coordinate::Labels(labels)) => {
                let mut var = file.add_string_variable(&dim.name, &[dim.name.as_str()])?;
                for (i, label) in labels.iter().enumerate() {
                    var.put_string(label, i)?;
                }
            }
            None => {}
        }
    }

    {
        let dim_names = grid.dim_names();
        let mut var = file.add_variable::<f32>(&grid.name, &dim_names)?;
        for (name, value) in &grid.attrs {
            // Fill values were turned into NaN on load
            if name == FILL_VALUE_ATTR {
                continue;
            }
            var.put_attribute(name, value.as_str())?;
        }
        let values: Vec<f32> = grid.data.iter().copied().collect();
        var.put_values(&values, ..)?;
    }

    let sources: Vec<String> = plot
        .sources
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();

    file.add_attribute("title", plot.title.as_str())?;
    file.add_attribute("anomaly", if plot.anomaly { "true" } else { "false" })?;
    file.add_attribute("contour", if plot.contour { "true" } else { "false" })?;
    file.add_attribute("sources", sources.join(" ").as_str())?;

    debug!("Successfully wrote grid file: {}", output_path.display());
    Ok(())
}

/// Shape and value range of a reduced grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSummary {
    pub variable: String,
    pub title: String,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub mean: Option<f64>,
    pub anomaly: bool,
    pub contour: bool,
    pub source_count: usize,
}

impl GridSummary {
    pub fn from_plot(plot: &PlotData) -> Self {
        let stats = plot.grid.stats();
        GridSummary {
            variable: plot.grid.name.clone(),
            title: plot.title.clone(),
            dimensions: plot.grid.dim_names().iter().map(|d| d.to_string()).collect(),
            shape: plot.grid.shape(),
            min: stats.map(|s| s.0),
            max: stats.map(|s| s.1),
            mean: stats.map(|s| s.2),
            anomaly: plot.anomaly,
            contour: plot.contour,
            source_count: plot.sources.len(),
        }
    }
}

/// Range of days or months with data on disk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityReport {
    pub cadence: String,
    pub directory: String,
    pub first: String,
    pub last: String,
    pub file_count: usize,
}

impl AvailabilityReport {
    pub fn new<K: CalendarKey>(config: &DataConfig, bounds: &Availability<K>) -> Self {
        AvailabilityReport {
            cadence: K::CADENCE.to_string(),
            directory: config.dir_for(K::CADENCE).display().to_string(),
            first: bounds.first.title_text(),
            last: bounds.last.title_text(),
            file_count: bounds.count,
        }
    }
}

/// Prints `value` as JSON or YAML. Human output is up to the caller.
fn print_structured<T: Serialize>(value: &T, format: &OutputFormat) -> PlotResult<bool> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Human => return Ok(false),
    }
    Ok(true)
}

pub fn print_grid_summary(summary: &GridSummary, format: &OutputFormat) -> PlotResult<()> {
    if print_structured(summary, format)? {
        return Ok(());
    }
    println!("{}", summary.title);
    println!(
        "  Grid: {} [{}]",
        summary.variable,
        summary
            .dimensions
            .iter()
            .zip(&summary.shape)
            .map(|(d, n)| format!("{}={}", d, n))
            .collect::<Vec<_>>()
            .join(", ")
    );
    match (summary.min, summary.max, summary.mean) {
        (Some(min), Some(max), Some(mean)) => {
            println!("  Min: {:.3}  Max: {:.3}  Mean: {:.3}", min, max, mean)
        }
        _ => println!("  No valid values"),
    }
    println!("  Files read: {}", summary.source_count);
    Ok(())
}

pub fn print_availability(report: &AvailabilityReport, format: &OutputFormat) -> PlotResult<()> {
    if print_structured(report, format)? {
        return Ok(());
    }
    println!("{} data in {}:", report.cadence, report.directory);
    println!("  First: {}", report.first);
    println!("  Last:  {}", report.last);
    println!("  Files: {}", report.file_count);
    Ok(())
}

pub fn print_variables(table: &VariableTable, format: &OutputFormat) -> PlotResult<()> {
    if print_structured(table, format)? {
        return Ok(());
    }
    println!("Variables: {} total", table.len());
    for var in table.iter() {
        println!("  {:<6} {} [{}]", var.code, var.long_name, var.levels.join(", "));
    }
    Ok(())
}
