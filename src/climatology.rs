//! # Climatology Anomalies
//!
//! Turns a reduced grid into an anomaly: the grid minus the 1981-2010
//! climatology averaged over the same calendar positions.
//!
//! Daily climatology files carry a `day` dimension labelled `MM-DD`; monthly
//! ones carry a `month` dimension numbered 1 to 12. The positions covered by
//! the requested range are selected, the selection is reduced exactly like
//! the data (level, then mean over the calendar axis) and subtracted.

use crate::calendar::{CalendarKey, CalendarRange, YearMonth};
use crate::dataset::{DataArray, Dataset};
use crate::error::PlotResult;
use crate::read::DatasetLoader;
use crate::reduce::reduce_dataset;
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeSet;

/// Climatology labels covered by `range`, sorted and without duplicates.
///
/// A range without an end covers its start only.
///
/// ```rust
/// use reanalysis_plots::calendar::{CalendarRange, YearMonth};
/// use reanalysis_plots::climatology::climatology_labels;
///
/// let range = CalendarRange::new(YearMonth::new(2000, 11)?, Some(YearMonth::new(2001, 2)?));
/// assert_eq!(climatology_labels(&range), vec!["1", "11", "12", "2"]);
/// # Ok::<(), reanalysis_plots::error::PlotError>(())
/// ```
pub fn climatology_labels<K: CalendarKey>(range: &CalendarRange<K>) -> Vec<String> {
    range
        .keys()
        .iter()
        .map(CalendarKey::climatology_label)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Subtracts the climatology of `variable` at `level` over `range` from `grid`.
///
/// The result keeps the dimensions, coordinates and attributes of `grid`.
pub fn diff_from_climatology<K: CalendarKey>(
    grid: &DataArray,
    climatology: &Dataset,
    variable: &str,
    level: &str,
    range: &CalendarRange<K>,
) -> PlotResult<DataArray> {
    let labels = climatology_labels(range);
    let dim = K::CADENCE.climatology_dim();
    debug!(
        "Selecting {} climatology entries along '{}': {:?}",
        labels.len(),
        dim,
        labels
    );

    let subset = climatology.select_labels(dim, &labels)?;
    let climatology_grid = reduce_dataset(&subset, variable, level)?;

    grid.subtract(&climatology_grid)
}

/// Anomaly of a daily grid against the daily climatology file.
pub fn diff_from_daily_climatology(
    loader: &DatasetLoader<'_>,
    grid: &DataArray,
    variable: &str,
    level: &str,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
) -> PlotResult<DataArray> {
    let climatology = loader.open_climatology(NaiveDate::CADENCE)?;
    diff_from_climatology(
        grid,
        &climatology,
        variable,
        level,
        &CalendarRange::new(start_date, end_date),
    )
}

/// Anomaly of a monthly grid against the monthly climatology file.
///
/// Without an end month, only the start month's climatology is used.
pub fn diff_from_monthly_climatology(
    loader: &DatasetLoader<'_>,
    grid: &DataArray,
    variable: &str,
    level: &str,
    start_month: YearMonth,
    end_month: Option<YearMonth>,
) -> PlotResult<DataArray> {
    let climatology = loader.open_climatology(YearMonth::CADENCE)?;
    diff_from_climatology(
        grid,
        &climatology,
        variable,
        level,
        &CalendarRange::new(start_month, end_month),
    )
}
