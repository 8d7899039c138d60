//! # Plot Requests
//!
//! A validated description of one plot: variable, analysis level, calendar
//! range and display flags. Validation is pure and runs before any file is
//! touched; the availability check needs only the bounds from
//! [`crate::availability::available_bounds`].

use crate::availability::Availability;
use crate::calendar::{CalendarKey, CalendarRange, YearMonth};
use crate::dataset::DataArray;
use crate::error::{PlotError, PlotResult};
use crate::variables::{ONLY_LEVEL, VariableTable};
use chrono::NaiveDate;
use serde::Serialize;

/// One plot request, generic over the calendar cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlotRequest<K> {
    pub variable: String,
    pub level: String,
    pub range: CalendarRange<K>,
    /// Draw filled contours instead of a continuous colour mesh
    pub contour: bool,
    /// Plot the difference from the 1981-2010 climatology
    pub anomaly: bool,
}

pub type DailyPlotRequest = PlotRequest<NaiveDate>;
pub type MonthlyPlotRequest = PlotRequest<YearMonth>;

fn invalid(message: impl Into<String>) -> PlotError {
    PlotError::InvalidRequest(message.into())
}

impl<K: CalendarKey> PlotRequest<K> {
    pub fn new(variable: &str, level: &str, start: K, end: Option<K>) -> Self {
        PlotRequest {
            variable: variable.to_string(),
            level: level.to_string(),
            range: CalendarRange::new(start, end),
            contour: false,
            anomaly: false,
        }
    }

    pub fn with_contour(mut self, contour: bool) -> Self {
        self.contour = contour;
        self
    }

    pub fn with_anomaly(mut self, anomaly: bool) -> Self {
        self.anomaly = anomaly;
        self
    }

    /// Checks the request against the variable table and the record start.
    pub fn validate(&self, variables: &VariableTable, epoch_start: NaiveDate) -> PlotResult<()> {
        let descriptor = variables
            .get(&self.variable)
            .ok_or_else(|| invalid(format!("Not a valid variable: '{}'", self.variable)))?;

        if !descriptor.has_level(&self.level) {
            return Err(invalid(format!(
                "Not a valid analysis level for {}: '{}' (choose from {})",
                self.variable,
                self.level,
                descriptor.levels.join(", ")
            )));
        }

        let CalendarRange { start, end } = self.range;
        let epoch = K::from_date(epoch_start);
        if start < epoch || end.is_some_and(|end| end < epoch) {
            return Err(invalid(format!("Date must be later than {}", epoch_start)));
        }

        if let Some(end) = end {
            if start >= end {
                return Err(invalid("End date must be after start date."));
            }
            if end >= start.one_year_later() {
                return Err(invalid(format!(
                    "Difference between start and end {} must be less than 1 year.",
                    K::UNIT_NAME
                )));
            }
        }

        Ok(())
    }

    /// Checks that every requested key lies within the data on disk.
    pub fn check_available(&self, bounds: &Availability<K>) -> PlotResult<()> {
        for key in [Some(self.range.start), self.range.end].into_iter().flatten() {
            if !bounds.contains(key) {
                return Err(invalid(format!(
                    "No data for {}: available data covers {} to {}",
                    key.title_text(),
                    bounds.first.title_text(),
                    bounds.last.title_text()
                )));
            }
        }
        Ok(())
    }

    /// Plot title, e.g. `Air temperature (K) at 500mb, 2000-01-01 to 2000-01-05`.
    pub fn title(&self, grid: &DataArray) -> String {
        let long_name = grid.long_name().unwrap_or(&self.variable);
        let mut title = match grid.units() {
            Some(units) => format!("{} ({})", long_name, units),
            None => long_name.to_string(),
        };
        if self.level != ONLY_LEVEL {
            title.push_str(&format!(" at {}", self.level));
        }
        title.push_str(&format!(", {}", self.range));
        if self.anomaly {
            title.push_str(" anomalies");
        }
        title
    }
}
