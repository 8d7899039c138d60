//! # Gridded Dataset Model
//!
//! In-memory representation of one or more CFSR NetCDF files: named
//! [`DataArray`]s with labelled dimensions, coordinates and string
//! attributes.
//!
//! Each dimension gets a [`DimRole`] once, when the array is built, so later
//! steps ask for "the level axis" or "the time axes" instead of matching
//! dimension names again.

use crate::error::{PlotError, PlotResult};
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Name prefix of vertical level dimensions (`lev`, `lev_2m`, `level`, ...)
pub const LEVEL_DIM_PREFIX: &str = "lev";
/// Dimension along which per-file datasets are concatenated
pub const CONCAT_DIM: &str = "t";

pub const LONG_NAME_ATTR: &str = "long_name";
pub const UNITS_ATTR: &str = "units";
pub const ANALYSIS_LEVEL_ATTR: &str = "analysis_level";
pub const FILL_VALUE_ATTR: &str = "_FillValue";

/// What a dimension represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DimRole {
    Latitude,
    Longitude,
    Level,
    /// Any axis that is averaged away: `t`, `time`, and the climatology `day`/`month`
    Time,
    Other,
}

impl DimRole {
    pub fn classify(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with(LEVEL_DIM_PREFIX) {
            DimRole::Level
        } else if matches!(lower.as_str(), "t" | "time" | "day" | "month") {
            DimRole::Time
        } else if lower.starts_with("lat") || lower == "y" {
            DimRole::Latitude
        } else if lower.starts_with("lon") || lower == "x" {
            DimRole::Longitude
        } else {
            DimRole::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
    pub role: DimRole,
}

impl Dimension {
    pub fn new(name: &str, len: usize) -> Self {
        Dimension {
            name: name.to_string(),
            len,
            role: DimRole::classify(name),
        }
    }
}

/// Coordinate values along one dimension
#[derive(Debug, Clone, PartialEq)]
pub enum Coordinate {
    Values(Vec<f64>),
    Labels(Vec<String>),
}

impl Coordinate {
    pub fn len(&self) -> usize {
        match self {
            Coordinate::Values(v) => v.len(),
            Coordinate::Labels(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label of entry `index`; numeric values render without a trailing `.0`.
    pub fn label(&self, index: usize) -> Option<String> {
        match self {
            Coordinate::Values(v) => v.get(index).map(|x| x.to_string()),
            Coordinate::Labels(l) => l.get(index).cloned(),
        }
    }

    pub fn labels(&self) -> Vec<String> {
        (0..self.len()).filter_map(|i| self.label(i)).collect()
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        (0..self.len()).find(|&i| self.label(i).as_deref() == Some(label))
    }

    fn select(&self, positions: &[usize]) -> Coordinate {
        match self {
            Coordinate::Values(v) => Coordinate::Values(positions.iter().map(|&i| v[i]).collect()),
            Coordinate::Labels(l) => {
                Coordinate::Labels(positions.iter().map(|&i| l[i].clone()).collect())
            }
        }
    }

    fn concat(parts: &[Option<&Coordinate>]) -> Option<Coordinate> {
        match parts.first()? {
            Some(Coordinate::Values(_)) => {
                let mut out = Vec::new();
                for part in parts {
                    match part {
                        Some(Coordinate::Values(v)) => out.extend_from_slice(v),
                        _ => return None,
                    }
                }
                Some(Coordinate::Values(out))
            }
            Some(Coordinate::Labels(_)) => {
                let mut out = Vec::new();
                for part in parts {
                    match part {
                        Some(Coordinate::Labels(l)) => out.extend(l.iter().cloned()),
                        _ => return None,
                    }
                }
                Some(Coordinate::Labels(out))
            }
            None => None,
        }
    }
}

/// A named multi-dimensional array with labelled dimensions
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    pub name: String,
    pub dims: Vec<Dimension>,
    pub data: ArrayD<f32>,
    pub coords: BTreeMap<String, Coordinate>,
    pub attrs: BTreeMap<String, String>,
}

impl DataArray {
    pub fn new(name: &str, dims: Vec<Dimension>, data: ArrayD<f32>) -> PlotResult<Self> {
        let dim_shape: Vec<usize> = dims.iter().map(|d| d.len).collect();
        if dim_shape != data.shape() {
            return Err(PlotError::MalformedData(format!(
                "variable '{}' has dimensions {:?} but data shape {:?}",
                name,
                dim_shape,
                data.shape()
            )));
        }
        Ok(DataArray {
            name: name.to_string(),
            dims,
            data,
            coords: BTreeMap::new(),
            attrs: BTreeMap::new(),
        })
    }

    /// Builds an array from dimension names and a flat row-major vector.
    pub fn from_vec(name: &str, dims: &[(&str, usize)], values: Vec<f32>) -> PlotResult<Self> {
        let shape: Vec<usize> = dims.iter().map(|(_, len)| *len).collect();
        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
        let dims = dims.iter().map(|(n, len)| Dimension::new(n, *len)).collect();
        DataArray::new(name, dims, data)
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_coord(mut self, dim: &str, coord: Coordinate) -> Self {
        self.coords.insert(dim.to_string(), coord);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn long_name(&self) -> Option<&str> {
        self.attr(LONG_NAME_ATTR)
    }

    pub fn units(&self) -> Option<&str> {
        self.attr(UNITS_ATTR)
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.len).collect()
    }

    pub fn dim_names(&self) -> Vec<&str> {
        self.dims.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn axis(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d.name == dim)
    }

    pub fn axes_with_role(&self, role: DimRole) -> Vec<usize> {
        self.dims
            .iter()
            .enumerate()
            .filter(|(_, d)| d.role == role)
            .map(|(i, _)| i)
            .collect()
    }

    fn check_axis(&self, axis: usize) -> PlotResult<()> {
        if axis >= self.ndim() {
            return Err(PlotError::MalformedData(format!(
                "axis {} out of bounds for '{}' with {} dimensions",
                axis,
                self.name,
                self.ndim()
            )));
        }
        Ok(())
    }

    /// Drops `axis` by taking entry `index` along it.
    pub fn select_index(&self, axis: usize, index: usize) -> PlotResult<DataArray> {
        self.check_axis(axis)?;
        let dim = &self.dims[axis];
        if index >= dim.len {
            return Err(PlotError::MalformedData(format!(
                "index {} out of bounds for dimension '{}' of length {}",
                index, dim.name, dim.len
            )));
        }

        let mut out = self.clone();
        out.data = self.data.index_axis(Axis(axis), index).to_owned();
        let removed = out.dims.remove(axis);
        out.coords.remove(&removed.name);
        Ok(out)
    }

    /// Drops `axis` by taking the entry whose coordinate label is `label`.
    pub fn select_label(&self, axis: usize, label: &str) -> PlotResult<DataArray> {
        self.check_axis(axis)?;
        let dim = &self.dims[axis];
        let coord = self.coords.get(&dim.name).ok_or_else(|| {
            PlotError::MalformedData(format!(
                "dimension '{}' of '{}' has no coordinate labels",
                dim.name, self.name
            ))
        })?;
        let index = coord.position(label).ok_or_else(|| {
            PlotError::MalformedData(format!(
                "label '{}' not found in dimension '{}' of '{}' (available: {})",
                label,
                dim.name,
                self.name,
                coord.labels().join(", ")
            ))
        })?;
        self.select_index(axis, index)
    }

    /// Keeps only `positions` along `axis`, in the given order.
    pub fn select_positions(&self, axis: usize, positions: &[usize]) -> PlotResult<DataArray> {
        self.check_axis(axis)?;
        let dim_name = self.dims[axis].name.clone();
        if let Some(&bad) = positions.iter().find(|&&p| p >= self.dims[axis].len) {
            return Err(PlotError::MalformedData(format!(
                "position {} out of bounds for dimension '{}'",
                bad, dim_name
            )));
        }

        let mut out = self.clone();
        out.data = self.data.select(Axis(axis), positions);
        out.dims[axis].len = positions.len();
        if let Some(coord) = self.coords.get(&dim_name) {
            out.coords.insert(dim_name, coord.select(positions));
        }
        Ok(out)
    }

    /// Arithmetic mean along `axis`, skipping NaN. Attributes are kept.
    pub fn mean_over(&self, axis: usize) -> PlotResult<DataArray> {
        self.check_axis(axis)?;
        let mut out = self.clone();
        out.data = self.data.map_axis(Axis(axis), |lane| {
            let (sum, count) = lane
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0f64, 0usize), |(sum, count), &v| (sum + f64::from(v), count + 1));
            if count == 0 {
                f32::NAN
            } else {
                (sum / count as f64) as f32
            }
        });
        let removed = out.dims.remove(axis);
        out.coords.remove(&removed.name);
        Ok(out)
    }

    /// Averages away every axis with the given role.
    pub fn mean_over_role(&self, role: DimRole) -> PlotResult<DataArray> {
        let mut out = self.clone();
        // Highest axis first so the remaining indices stay valid
        for axis in self.axes_with_role(role).into_iter().rev() {
            out = out.mean_over(axis)?;
        }
        Ok(out)
    }

    /// Element-wise `self - other`, keeping the dimensions, coordinates and
    /// attributes of `self`.
    pub fn subtract(&self, other: &DataArray) -> PlotResult<DataArray> {
        if self.data.shape() != other.data.shape() {
            return Err(PlotError::MalformedData(format!(
                "cannot subtract '{}' with shape {:?} from '{}' with shape {:?}",
                other.name,
                other.data.shape(),
                self.name,
                self.data.shape()
            )));
        }
        let mut out = self.clone();
        out.data = &self.data - &other.data;
        Ok(out)
    }

    /// Copy with a new leading axis `dim` of length one, unless `dim` already exists.
    fn with_axis(self, dim: &str) -> DataArray {
        if self.axis(dim).is_some() {
            return self;
        }
        let mut out = self;
        out.data = out.data.insert_axis(Axis(0));
        out.dims.insert(0, Dimension::new(dim, 1));
        out
    }

    /// Concatenates arrays along `dim`. Arrays lacking `dim` get it as a new
    /// leading axis. All other dimensions must agree.
    pub fn concat(parts: Vec<DataArray>, dim: &str) -> PlotResult<DataArray> {
        let parts: Vec<DataArray> = parts.into_iter().map(|p| p.with_axis(dim)).collect();
        let first = parts
            .first()
            .ok_or_else(|| PlotError::MalformedData("nothing to concatenate".to_string()))?;
        let axis = first.axis(dim).unwrap_or(0);

        for part in &parts[1..] {
            let same_dims = part.dim_names() == first.dim_names()
                && part
                    .dims
                    .iter()
                    .zip(&first.dims)
                    .all(|(a, b)| a.name == dim || a.len == b.len);
            if !same_dims {
                return Err(PlotError::MalformedData(format!(
                    "cannot concatenate '{}': dimensions {:?} {:?} do not match {:?} {:?}",
                    first.name,
                    part.dim_names(),
                    part.shape(),
                    first.dim_names(),
                    first.shape()
                )));
            }
        }

        let views: Vec<ArrayViewD<'_, f32>> = parts.iter().map(|p| p.data.view()).collect();
        let data = ndarray::concatenate(Axis(axis), &views)?;
        let concat_coord =
            Coordinate::concat(&parts.iter().map(|p| p.coords.get(dim)).collect::<Vec<_>>());

        let mut out = first.clone();
        out.dims[axis].len = data.shape()[axis];
        out.data = data;
        match concat_coord {
            Some(coord) => out.coords.insert(dim.to_string(), coord),
            None => out.coords.remove(dim),
        };
        Ok(out)
    }

    /// Minimum, maximum and mean of the non-NaN values.
    pub fn stats(&self) -> Option<(f32, f32, f64)> {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for &v in self.data.iter().filter(|v| !v.is_nan()) {
            min = min.min(v);
            max = max.max(v);
            sum += f64::from(v);
            count += 1;
        }
        (count > 0).then(|| (min, max, sum / count as f64))
    }
}

/// A collection of arrays read from one or more files
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub variables: BTreeMap<String, DataArray>,
    pub attrs: BTreeMap<String, String>,
    /// Files the data was read from, in load order
    pub sources: Vec<PathBuf>,
}

impl Dataset {
    pub fn new() -> Self {
        Dataset::default()
    }

    pub fn insert(&mut self, array: DataArray) {
        self.variables.insert(array.name.clone(), array);
    }

    pub fn with_variable(mut self, array: DataArray) -> Self {
        self.insert(array);
        self
    }

    pub fn variable(&self, name: &str) -> Option<&DataArray> {
        self.variables.get(name)
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    /// Keeps the entries of dimension `dim` whose labels are in `labels`.
    ///
    /// Variables without `dim` are kept unchanged. Selecting nothing is an
    /// error: it means the file does not cover the requested positions.
    pub fn select_labels(&self, dim: &str, labels: &[String]) -> PlotResult<Dataset> {
        let mut out = Dataset {
            variables: BTreeMap::new(),
            attrs: self.attrs.clone(),
            sources: self.sources.clone(),
        };

        for array in self.variables.values() {
            let Some(axis) = array.axis(dim) else {
                out.insert(array.clone());
                continue;
            };
            let coord = array.coords.get(dim).ok_or_else(|| {
                PlotError::MalformedData(format!(
                    "dimension '{}' of '{}' has no coordinate labels",
                    dim, array.name
                ))
            })?;
            let positions: Vec<usize> = (0..coord.len())
                .filter(|&i| {
                    coord
                        .label(i)
                        .is_some_and(|label| labels.iter().any(|l| *l == label))
                })
                .collect();
            if positions.is_empty() {
                return Err(PlotError::MalformedData(format!(
                    "none of [{}] found in dimension '{}' of '{}'",
                    labels.join(", "),
                    dim,
                    array.name
                )));
            }
            out.insert(array.select_positions(axis, &positions)?);
        }
        Ok(out)
    }

    /// Concatenates per-file datasets along `dim`, in the given order.
    ///
    /// Variables are taken from the first dataset; each must be present in
    /// every other one.
    pub fn concat(parts: Vec<Dataset>, dim: &str) -> PlotResult<Dataset> {
        let mut parts = parts;
        if parts.len() == 1 {
            return Ok(parts.remove(0));
        }
        if parts.is_empty() {
            return Err(PlotError::MalformedData("no datasets to concatenate".to_string()));
        }

        let names: Vec<String> = parts[0].variables.keys().cloned().collect();
        let mut out = Dataset {
            variables: BTreeMap::new(),
            attrs: parts[0].attrs.clone(),
            sources: parts.iter().flat_map(|p| p.sources.iter().cloned()).collect(),
        };

        for name in names {
            let mut pieces = Vec::with_capacity(parts.len());
            for part in parts.iter_mut() {
                let piece = part.variables.remove(&name).ok_or_else(|| {
                    PlotError::MalformedData(format!(
                        "variable '{}' missing from {}",
                        name,
                        part.sources
                            .first()
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| "dataset".to_string())
                    ))
                })?;
                pieces.push(piece);
            }
            out.insert(DataArray::concat(pieces, dim)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataArray {
        // t=2, lev=2, y=1, x=2
        DataArray::from_vec(
            "T",
            &[("t", 2), ("lev", 2), ("y", 1), ("x", 2)],
            vec![1.0, 2.0, 10.0, 20.0, 3.0, 4.0, 30.0, 40.0],
        )
        .unwrap()
        .with_attr(LONG_NAME_ATTR, "Air temperature")
        .with_coord("lev", Coordinate::Labels(vec!["2m".into(), "500mb".into()]))
    }

    #[test]
    fn test_dim_roles() {
        assert_eq!(DimRole::classify("lev"), DimRole::Level);
        assert_eq!(DimRole::classify("lev_2m"), DimRole::Level);
        assert_eq!(DimRole::classify("t"), DimRole::Time);
        assert_eq!(DimRole::classify("day"), DimRole::Time);
        assert_eq!(DimRole::classify("month"), DimRole::Time);
        assert_eq!(DimRole::classify("lat"), DimRole::Latitude);
        assert_eq!(DimRole::classify("x"), DimRole::Longitude);
        assert_eq!(DimRole::classify("bounds"), DimRole::Other);
    }

    #[test]
    fn test_new_rejects_mismatched_shape() {
        let data = ArrayD::<f32>::zeros(IxDyn(&[2, 3]));
        let result = DataArray::new("T", vec![Dimension::new("y", 3), Dimension::new("x", 2)], data);
        assert!(matches!(result, Err(PlotError::MalformedData(_))));
    }

    #[test]
    fn test_select_label() {
        let arr = sample();
        let selected = arr.select_label(1, "500mb").unwrap();
        assert_eq!(selected.dim_names(), vec!["t", "y", "x"]);
        assert_eq!(selected.data.iter().cloned().collect::<Vec<_>>(), vec![10.0, 20.0, 30.0, 40.0]);
        assert!(!selected.coords.contains_key("lev"));
        assert_eq!(selected.long_name(), Some("Air temperature"));

        assert!(arr.select_label(1, "850mb").is_err());
        assert!(arr.select_label(0, "0").is_err());
    }

    #[test]
    fn test_mean_skips_nan() {
        let arr = DataArray::from_vec("T", &[("t", 3), ("x", 2)], vec![1.0, f32::NAN, 3.0, f32::NAN, 5.0, 8.0])
            .unwrap();
        let mean = arr.mean_over(0).unwrap();
        assert_eq!(mean.shape(), vec![2]);
        assert_eq!(mean.data[[0]], 3.0);
        assert_eq!(mean.data[[1]], 8.0);

        let all_nan = DataArray::from_vec("T", &[("t", 2)], vec![f32::NAN, f32::NAN]).unwrap();
        assert!(all_nan.mean_over(0).unwrap().data.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_select_positions_keeps_coordinate() {
        let arr = DataArray::from_vec("T", &[("day", 3), ("x", 1)], vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_coord(
                "day",
                Coordinate::Labels(vec!["01-01".into(), "01-02".into(), "01-03".into()]),
            );
        let selected = arr.select_positions(0, &[0, 2]).unwrap();
        assert_eq!(selected.shape(), vec![2, 1]);
        assert_eq!(
            selected.coords["day"],
            Coordinate::Labels(vec!["01-01".into(), "01-03".into()])
        );
        assert!(arr.select_positions(0, &[3]).is_err());
    }

    #[test]
    fn test_subtract_keeps_attributes() {
        let a = DataArray::from_vec("T", &[("y", 1), ("x", 2)], vec![5.0, 7.0])
            .unwrap()
            .with_attr(UNITS_ATTR, "K");
        let b = DataArray::from_vec("T", &[("y", 1), ("x", 2)], vec![1.0, 2.0]).unwrap();
        let diff = a.subtract(&b).unwrap();
        assert_eq!(diff.data.iter().cloned().collect::<Vec<_>>(), vec![4.0, 5.0]);
        assert_eq!(diff.units(), Some("K"));

        let c = DataArray::from_vec("T", &[("x", 2)], vec![1.0, 2.0]).unwrap();
        assert!(a.subtract(&c).is_err());
    }

    #[test]
    fn test_concat_adds_missing_axis() {
        let a = DataArray::from_vec("T", &[("y", 1), ("x", 2)], vec![1.0, 2.0]).unwrap();
        let b = DataArray::from_vec("T", &[("y", 1), ("x", 2)], vec![3.0, 4.0]).unwrap();
        let joined = DataArray::concat(vec![a, b], CONCAT_DIM).unwrap();
        assert_eq!(joined.dim_names(), vec!["t", "y", "x"]);
        assert_eq!(joined.shape(), vec![2, 1, 2]);
        assert_eq!(joined.data[[1, 0, 0]], 3.0);
        assert_eq!(joined.dims[0].role, DimRole::Time);
    }

    #[test]
    fn test_concat_existing_axis_and_coordinate() {
        let a = DataArray::from_vec("T", &[("t", 1), ("x", 2)], vec![1.0, 2.0])
            .unwrap()
            .with_coord("t", Coordinate::Values(vec![0.0]));
        let b = DataArray::from_vec("T", &[("t", 2), ("x", 2)], vec![3.0, 4.0, 5.0, 6.0])
            .unwrap()
            .with_coord("t", Coordinate::Values(vec![1.0, 2.0]));
        let joined = DataArray::concat(vec![a, b], "t").unwrap();
        assert_eq!(joined.shape(), vec![3, 2]);
        assert_eq!(joined.coords["t"], Coordinate::Values(vec![0.0, 1.0, 2.0]));
    }

    #[test]
    fn test_concat_rejects_mismatched_grids() {
        let a = DataArray::from_vec("T", &[("y", 1), ("x", 2)], vec![1.0, 2.0]).unwrap();
        let b = DataArray::from_vec("T", &[("y", 2), ("x", 1)], vec![3.0, 4.0]).unwrap();
        assert!(matches!(
            DataArray::concat(vec![a, b], CONCAT_DIM),
            Err(PlotError::MalformedData(_))
        ));
    }

    #[test]
    fn test_dataset_select_labels() {
        let clim = DataArray::from_vec("T", &[("month", 3), ("x", 1)], vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_coord("month", Coordinate::Values(vec![1.0, 2.0, 3.0]));
        let static_field = DataArray::from_vec("mask", &[("x", 1)], vec![1.0]).unwrap();
        let ds = Dataset::new().with_variable(clim).with_variable(static_field);

        let selected = ds.select_labels("month", &["2".to_string(), "3".to_string()]).unwrap();
        assert_eq!(selected.variable("T").unwrap().shape(), vec![2, 1]);
        assert_eq!(selected.variable("mask").unwrap().shape(), vec![1]);

        assert!(ds.select_labels("month", &["12".to_string()]).is_err());
    }

    #[test]
    fn test_stats() {
        let arr = DataArray::from_vec("T", &[("x", 4)], vec![1.0, f32::NAN, 3.0, -1.0]).unwrap();
        let (min, max, mean) = arr.stats().unwrap();
        assert_eq!(min, -1.0);
        assert_eq!(max, 3.0);
        assert!((mean - 1.0).abs() < 1e-9);
    }
}
