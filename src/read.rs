//! # Dataset Loader
//!
//! Resolves calendar keys to CFSR files and reads them into a [`Dataset`].
//! Several files are concatenated along the `t` axis, in ascending calendar
//! order.
//!
//! Every NetCDF handle lives inside [`read_dataset`]: it is closed explicitly
//! after reading, and dropped (which closes it) on any early error return.
//! Callers only ever hold plain in-memory arrays.
//!
//! Values are decoded following the CF conventions: `_FillValue` and
//! `missing_value` entries become NaN, then packed data is unpacked as
//! `raw * scale_factor + add_offset`. The encoding attributes are dropped
//! from the decoded arrays.

use crate::calendar::{Cadence, CalendarKey, CalendarRange};
use crate::dataset::{
    Coordinate, DataArray, Dataset, DimRole, Dimension, CONCAT_DIM, FILL_VALUE_ATTR, UNITS_ATTR,
};
use crate::error::PlotResult;
use crate::input::DataConfig;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use ndarray::{ArrayD, IxDyn};
use netcdf::AttributeValue;
use netcdf::types::NcVariableType;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const MISSING_VALUE_ATTR: &str = "missing_value";
const SCALE_FACTOR_ATTR: &str = "scale_factor";
const ADD_OFFSET_ATTR: &str = "add_offset";

/// One byte of a classic `NC_CHAR` array
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct NcChar(pub(crate) u8);

unsafe impl netcdf::NcTypeDescriptor for NcChar {
    fn type_descriptor() -> NcVariableType {
        NcVariableType::Char
    }
}

/// Opens CFSR files described by a [`DataConfig`].
///
/// # Examples
///
/// ```rust,no_run
/// use reanalysis_plots::input::DataConfig;
/// use reanalysis_plots::read::DatasetLoader;
/// use chrono::NaiveDate;
///
/// let config = DataConfig::default();
/// let loader = DatasetLoader::new(&config).with_variables(["T"]);
/// let dataset = loader.open_range(
///     NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2000, 1, 5).unwrap(),
/// )?;
/// assert_eq!(dataset.sources.len(), 5);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct DatasetLoader<'a> {
    config: &'a DataConfig,
    variables: Option<Vec<String>>,
    show_progress: bool,
}

impl<'a> DatasetLoader<'a> {
    pub fn new(config: &'a DataConfig) -> Self {
        DatasetLoader {
            config,
            variables: None,
            show_progress: false,
        }
    }

    /// Only read these data variables (coordinates are always read).
    pub fn with_variables<I, S>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = Some(variables.into_iter().map(Into::into).collect());
        self
    }

    /// Show a progress bar while reading multiple files.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn config(&self) -> &DataConfig {
        self.config
    }

    /// Opens the file holding a single day or month.
    pub fn open_single<K: CalendarKey>(&self, key: K) -> PlotResult<Dataset> {
        self.open_path(&self.config.path_for(key))
    }

    /// Opens every file from `start` to `end` inclusive as one dataset.
    pub fn open_range<K: CalendarKey>(&self, start: K, end: K) -> PlotResult<Dataset> {
        let mut paths: Vec<PathBuf> = K::range_inclusive(start, end)
            .into_iter()
            .map(|key| self.config.path_for(key))
            .collect();
        paths.sort();
        self.open_paths(&paths)
    }

    /// Opens a single file or a range, depending on whether the range has an end.
    pub fn open_calendar_range<K: CalendarKey>(&self, range: &CalendarRange<K>) -> PlotResult<Dataset> {
        match range.end {
            None => self.open_single(range.start),
            Some(end) => self.open_range(range.start, end),
        }
    }

    /// Opens the climatology file for the given cadence.
    pub fn open_climatology(&self, cadence: Cadence) -> PlotResult<Dataset> {
        self.open_path(&self.config.climatology_path(cadence))
    }

    pub fn open_path(&self, path: &Path) -> PlotResult<Dataset> {
        if !path.exists() {
            return Err(self.config.file_not_found(path));
        }
        read_dataset(path, self.variables.as_deref())
    }

    /// Reads `paths` in order and concatenates them along `t`.
    ///
    /// All paths are checked before the first one is opened.
    pub fn open_paths(&self, paths: &[PathBuf]) -> PlotResult<Dataset> {
        if let Some(missing) = paths.iter().find(|p| !p.exists()) {
            return Err(self.config.file_not_found(missing));
        }

        info!("Reading {} files", paths.len());
        let progress = if self.show_progress && paths.len() > 1 {
            let pb = ProgressBar::new(paths.len() as u64);
            if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}") {
                pb.set_style(style);
            }
            pb.set_message("Reading");
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut parts = Vec::with_capacity(paths.len());
        for path in paths {
            parts.push(read_dataset(path, self.variables.as_deref())?);
            progress.inc(1);
        }
        progress.finish_and_clear();

        Dataset::concat(parts, CONCAT_DIM)
    }
}

/// Reads one NetCDF file into memory.
///
/// Variables named after a dimension are read as coordinates; every other
/// numeric variable (or only those in `variables`, when given) becomes a
/// [`DataArray`] with its attributes and `_FillValue` entries replaced by NaN.
pub fn read_dataset(path: &Path, variables: Option<&[String]>) -> PlotResult<Dataset> {
    debug!("Opening NetCDF file: {}", path.display());
    let file = netcdf::open(path)?;

    let coords = read_coordinates(&file)?;
    let mut dataset = Dataset::new();
    dataset.sources.push(path.to_path_buf());

    for attr in file.attributes() {
        if let Some(value) = attribute_string(&attr) {
            dataset.attrs.insert(attr.name().to_string(), value);
        }
    }

    for var in file.variables() {
        let name = var.name();
        if coords.contains_key(&name) {
            continue;
        }
        if let Some(wanted) = variables
            && !wanted.iter().any(|w| *w == name)
        {
            continue;
        }
        if !matches!(var.vartype(), NcVariableType::Int(_) | NcVariableType::Float(_)) {
            debug!("Skipping non-numeric variable '{}'", name);
            continue;
        }
        dataset.insert(read_variable(&var, &coords)?);
    }

    debug!(
        "Read {} variables from {}: {:?}",
        dataset.variables.len(),
        path.display(),
        dataset.variable_names()
    );

    file.close()?;
    Ok(dataset)
}

fn read_coordinates(file: &netcdf::File) -> PlotResult<BTreeMap<String, Coordinate>> {
    let mut coords = BTreeMap::new();

    for dim in file.dimensions() {
        let name = dim.name();
        let Some(var) = file.variable(&name) else {
            continue;
        };
        let var_dims = var.dimensions();

        let coord = match (var.vartype(), var_dims.len()) {
            (NcVariableType::String, 1) => {
                let labels = (0..dim.len())
                    .map(|i| var.get_string(i))
                    .collect::<Result<Vec<_>, _>>()?;
                Coordinate::Labels(labels)
            }
            // Classic files store labels as (n, strlen) character arrays
            (NcVariableType::Char, 2) if var_dims[0].name() == name => {
                Coordinate::Labels(char_labels(&var, dim.len(), var_dims[1].len())?)
            }
            (NcVariableType::Int(_) | NcVariableType::Float(_), 1) => {
                let encoding = CfEncoding::of(&var);
                let values: Vec<f64> = var
                    .get_values::<f64, _>(..)?
                    .into_iter()
                    .map(|v| encoding.decode(v))
                    .collect();
                let units = string_attribute(&var, UNITS_ATTR);
                match units {
                    // Numeric level coordinates are labelled like the variable
                    // table, e.g. 500 + "mb" -> "500mb"
                    Some(units) if DimRole::classify(&name) == DimRole::Level => {
                        Coordinate::Labels(values.iter().map(|v| format!("{}{}", v, units)).collect())
                    }
                    _ => Coordinate::Values(values),
                }
            }
            (vartype, ndim) => {
                debug!(
                    "Skipping coordinate '{}' of unsupported type {:?} with {} dimensions",
                    name, vartype, ndim
                );
                continue;
            }
        };
        coords.insert(name, coord);
    }

    Ok(coords)
}

/// Decodes an `(n, width)` character array into `n` labels, without NUL padding.
pub(crate) fn char_labels(var: &netcdf::Variable<'_>, n: usize, width: usize) -> PlotResult<Vec<String>> {
    if width == 0 {
        return Ok(vec![String::new(); n]);
    }
    let chars = var.get_values::<NcChar, _>(..)?;
    Ok(chars
        .chunks(width)
        .map(|row| {
            let bytes: Vec<u8> = row.iter().map(|c| c.0).take_while(|&b| b != 0).collect();
            String::from_utf8_lossy(&bytes).trim_end().to_string()
        })
        .collect())
}

fn read_variable(
    var: &netcdf::Variable<'_>,
    coords: &BTreeMap<String, Coordinate>,
) -> PlotResult<DataArray> {
    let dims: Vec<Dimension> = var
        .dimensions()
        .iter()
        .map(|d| Dimension::new(&d.name(), d.len()))
        .collect();
    let shape: Vec<usize> = dims.iter().map(|d| d.len).collect();

    let encoding = CfEncoding::of(var);
    let values: Vec<f32> = var
        .get_values::<f64, _>(..)?
        .into_iter()
        .map(|raw| encoding.decode(raw) as f32)
        .collect();

    let data = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
    let mut array = DataArray::new(&var.name(), dims, data)?;

    for attr in var.attributes() {
        if CfEncoding::is_encoding_attribute(&attr.name()) {
            continue;
        }
        if let Some(value) = attribute_string(&attr) {
            array.attrs.insert(attr.name().to_string(), value);
        }
    }
    for dim in &array.dims {
        if let Some(coord) = coords.get(&dim.name) {
            array.coords.insert(dim.name.clone(), coord.clone());
        }
    }

    Ok(array)
}

/// Renders an attribute as a string; lists are comma separated.
pub(crate) fn attribute_string(attr: &netcdf::Attribute<'_>) -> Option<String> {
    let value = attr.value().ok()?;
    Some(match value {
        AttributeValue::Str(s) => s,
        AttributeValue::Strs(s) => s.join(", "),
        AttributeValue::Float(f) => f.to_string(),
        AttributeValue::Double(d) => d.to_string(),
        AttributeValue::Int(i) => i.to_string(),
        AttributeValue::Short(s) => s.to_string(),
        other => format!("{:?}", other),
    })
}

fn has_attribute(var: &netcdf::Variable<'_>, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn string_attribute(var: &netcdf::Variable<'_>, name: &str) -> Option<String> {
    if !has_attribute(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// First element of a numeric attribute, widened to `f64`.
fn numeric_attribute(var: &netcdf::Variable<'_>, name: &str) -> Option<f64> {
    if !has_attribute(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Schar(v) => Some(f64::from(v)),
        AttributeValue::Uchar(v) => Some(f64::from(v)),
        AttributeValue::Ushort(v) => Some(f64::from(v)),
        AttributeValue::Uint(v) => Some(f64::from(v)),
        AttributeValue::Longlong(v) => Some(v as f64),
        AttributeValue::Ulonglong(v) => Some(v as f64),
        AttributeValue::Doubles(v) => v.first().copied(),
        AttributeValue::Floats(v) => v.first().map(|&x| f64::from(x)),
        AttributeValue::Ints(v) => v.first().map(|&x| f64::from(x)),
        AttributeValue::Shorts(v) => v.first().map(|&x| f64::from(x)),
        _ => None,
    }
}

/// CF missing-data and packing attributes of one variable
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CfEncoding {
    fill_value: Option<f64>,
    missing_value: Option<f64>,
    scale_factor: Option<f64>,
    add_offset: Option<f64>,
}

impl CfEncoding {
    fn of(var: &netcdf::Variable<'_>) -> Self {
        CfEncoding {
            fill_value: numeric_attribute(var, FILL_VALUE_ATTR),
            missing_value: numeric_attribute(var, MISSING_VALUE_ATTR),
            scale_factor: numeric_attribute(var, SCALE_FACTOR_ATTR),
            add_offset: numeric_attribute(var, ADD_OFFSET_ATTR),
        }
    }

    fn is_encoding_attribute(name: &str) -> bool {
        [FILL_VALUE_ATTR, MISSING_VALUE_ATTR, SCALE_FACTOR_ATTR, ADD_OFFSET_ATTR].contains(&name)
    }

    /// Sentinels are compared on the raw value, before unpacking. A double
    /// sentinel on single-precision data matches after rounding to `f32`.
    fn is_missing(&self, raw: f64) -> bool {
        [self.fill_value, self.missing_value]
            .into_iter()
            .flatten()
            .any(|m| raw == m || (raw as f32) == (m as f32) || (raw.is_nan() && m.is_nan()))
    }

    fn decode(&self, raw: f64) -> f64 {
        if self.is_missing(raw) {
            return f64::NAN;
        }
        raw * self.scale_factor.unwrap_or(1.0) + self.add_offset.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_without_encoding_is_identity() {
        let encoding = CfEncoding::default();
        assert_eq!(encoding.decode(273.5), 273.5);
        assert!(encoding.decode(f64::NAN).is_nan());
    }

    #[test]
    fn test_decode_masks_before_unpacking() {
        let encoding = CfEncoding {
            fill_value: Some(-32767.0),
            missing_value: Some(32767.0),
            scale_factor: Some(0.01),
            add_offset: Some(250.0),
        };
        assert!((encoding.decode(100.0) - 251.0).abs() < 1e-9);
        assert!((encoding.decode(200.0) - 252.0).abs() < 1e-9);
        assert!(encoding.decode(-32767.0).is_nan());
        assert!(encoding.decode(32767.0).is_nan());
    }

    #[test]
    fn test_double_sentinel_matches_single_precision_data() {
        let encoding = CfEncoding {
            missing_value: Some(1e20),
            ..CfEncoding::default()
        };
        assert!(encoding.decode(f64::from(1e20f32)).is_nan());
        assert_eq!(encoding.decode(5.0), 5.0);
    }

    #[test]
    fn test_encoding_attributes() {
        assert!(CfEncoding::is_encoding_attribute("_FillValue"));
        assert!(CfEncoding::is_encoding_attribute("scale_factor"));
        assert!(!CfEncoding::is_encoding_attribute("units"));
    }
}
