//! # Grid Reducer
//!
//! Collapses a loaded dataset to the 2D latitude/longitude grid of one
//! variable at one analysis level.
//!
//! The level is selected first, by label, on the original dimensions. Every
//! time-like axis (`t`, `time`, and the climatology `day`/`month`) is then
//! averaged away, skipping NaN. Doing it in this order means the level axis
//! is found the same way no matter where it sits among the dimensions.

use crate::dataset::{ANALYSIS_LEVEL_ATTR, DataArray, Dataset, DimRole};
use crate::error::{PlotError, PlotResult};
use crate::variables::ONLY_LEVEL;
use log::debug;

/// Reduces `variable` in `dataset` to a single 2D grid at `level`.
///
/// `level` is a label from the variable table (`"500mb"`, `"2m"`, ...). The
/// `"only"` sentinel is accepted for variables stored without a level axis,
/// or with a level axis of length one.
///
/// # Errors
///
/// - [`PlotError::UnknownVariable`] if the dataset has no such variable
/// - [`PlotError::MalformedData`] if the variable has more than one level
///   axis, no level axis for a level other than `"only"`, an unknown level
///   label, or does not end up two-dimensional
pub fn reduce_dataset(dataset: &Dataset, variable: &str, level: &str) -> PlotResult<DataArray> {
    let array = dataset
        .variable(variable)
        .ok_or_else(|| PlotError::UnknownVariable(variable.to_string()))?;

    debug!(
        "Reducing '{}' at level '{}' from dimensions {:?} {:?}",
        variable,
        level,
        array.dim_names(),
        array.shape()
    );

    let mut grid = select_level(array, level)?;
    grid.attrs
        .insert(ANALYSIS_LEVEL_ATTR.to_string(), level.to_string());

    let grid = grid.mean_over_role(DimRole::Time)?;

    if grid.ndim() != 2 {
        return Err(PlotError::MalformedData(format!(
            "expected a 2D grid for '{}' at '{}', got dimensions {:?}",
            variable,
            level,
            grid.dim_names()
        )));
    }

    debug!("Reduced '{}' to {:?} {:?}", variable, grid.dim_names(), grid.shape());
    Ok(grid)
}

fn select_level(array: &DataArray, level: &str) -> PlotResult<DataArray> {
    let level_axes = array.axes_with_role(DimRole::Level);

    match level_axes.as_slice() {
        [] if level == ONLY_LEVEL => Ok(array.clone()),
        [] => Err(PlotError::MalformedData(format!(
            "'{}' has no level dimension in {:?}, cannot select '{}'",
            array.name,
            array.dim_names(),
            level
        ))),
        [axis] => {
            let axis = *axis;
            if level == ONLY_LEVEL && array.dims[axis].len == 1 {
                array.select_index(axis, 0)
            } else {
                array.select_label(axis, level)
            }
        }
        many => Err(PlotError::MalformedData(format!(
            "expected 1 level dimension for '{}', found {}: {:?}",
            array.name,
            many.len(),
            many.iter().map(|&a| array.dims[a].name.as_str()).collect::<Vec<_>>()
        ))),
    }
}
