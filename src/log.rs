use crate::calendar::CalendarKey;
use crate::dataset::Dataset;
use crate::request::PlotRequest;
use crate::PlotData;
use log::{debug, info};
use std::time::Duration;

pub fn show_greeting(command: &str) {
    info!("=== CFSR reanalysis plots: {} ===", command);
}

pub fn request_echo<K: CalendarKey>(request: &PlotRequest<K>) {
    info!(
        "{} request: {} at {}, {}{}{}",
        K::CADENCE,
        request.variable,
        request.level,
        request.range,
        if request.anomaly { ", anomaly" } else { "" },
        if request.contour { ", contour" } else { "" }
    );
}

pub fn dataset_echo(dataset: &Dataset) {
    debug!("Dataset from {} files:", dataset.sources.len());
    for array in dataset.variables.values() {
        let dims: Vec<String> = array
            .dims
            .iter()
            .map(|d| format!("{}={} ({:?})", d.name, d.len, d.role))
            .collect();
        debug!("  {}: [{}]", array.name, dims.join(", "));
    }
}

pub fn show_plot_summary(plot: &PlotData) {
    info!("Title: {}", plot.title);
    info!("Grid: {:?} {:?}", plot.grid.dim_names(), plot.grid.shape());
    if let Some((min, max, mean)) = plot.grid.stats() {
        debug!("  min {:.3}, max {:.3}, mean {:.3}", min, max, mean);
    }
}

pub fn show_farewell_with_timing(elapsed: Duration) {
    info!("=== Done in {:.2?} ===", elapsed);
}
