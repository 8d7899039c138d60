//! # Variable Descriptors
//!
//! The table of plottable CFSR variables: a short code, a human-readable long
//! name and the ordered analysis levels available for it. Variables without
//! vertical levels carry the single sentinel level [`ONLY_LEVEL`].
//!
//! The table is built once (from [`VariableTable::cfsr`] or from a
//! configuration file) and passed by reference to whatever needs it.

use serde::{Deserialize, Serialize};

/// Level label for variables that have no vertical levels.
pub const ONLY_LEVEL: &str = "only";

/// Description of one plottable variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    /// Short code, also the NetCDF variable name (e.g. `T`)
    pub code: String,
    /// Human-readable name (e.g. `Air temperature`)
    pub long_name: String,
    /// Ordered level labels (e.g. `["2m", "925mb", "850mb", "500mb"]`)
    pub levels: Vec<String>,
}

impl VariableDescriptor {
    pub fn new(code: &str, long_name: &str, levels: &[&str]) -> Self {
        VariableDescriptor {
            code: code.to_string(),
            long_name: long_name.to_string(),
            levels: levels.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn has_level(&self, level: &str) -> bool {
        self.levels.iter().any(|l| l == level)
    }

    /// True for variables with the single `only` level.
    pub fn is_single_level(&self) -> bool {
        self.levels.len() == 1 && self.levels[0] == ONLY_LEVEL
    }

    /// Level to use when the request does not name one.
    pub fn default_level(&self) -> Option<&str> {
        if self.levels.len() == 1 {
            self.levels.first().map(String::as_str)
        } else {
            None
        }
    }
}

/// Immutable lookup table of variable descriptors, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableTable {
    variables: Vec<VariableDescriptor>,
}

impl VariableTable {
    pub fn new(variables: Vec<VariableDescriptor>) -> Self {
        VariableTable { variables }
    }

    /// The CFSR variables served by the plotting application.
    pub fn cfsr() -> Self {
        let wind_levels = ["10m", "925mb", "850mb", "500mb"];
        let near_surface_levels = ["2m", "925mb", "850mb", "500mb"];

        VariableTable::new(vec![
            VariableDescriptor::new("U", "U-component of wind", &wind_levels),
            VariableDescriptor::new("V", "V-component of wind", &wind_levels),
            VariableDescriptor::new("WSPD", "Wind speed", &wind_levels),
            VariableDescriptor::new("T", "Air temperature", &near_surface_levels),
            VariableDescriptor::new("SH", "Specific humidity", &near_surface_levels),
            VariableDescriptor::new("RH", "Relative humidity", &near_surface_levels),
            VariableDescriptor::new("HGT", "Geopotential height", &["925mb", "850mb", "500mb"]),
            VariableDescriptor::new("PWAT", "Precipitable water", &[ONLY_LEVEL]),
            VariableDescriptor::new("MSLP", "Pressure reduced to sea level", &[ONLY_LEVEL]),
        ])
    }

    pub fn get(&self, code: &str) -> Option<&VariableDescriptor> {
        self.variables.iter().find(|v| v.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableDescriptor> {
        self.variables.iter()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.code.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl Default for VariableTable {
    fn default() -> Self {
        VariableTable::cfsr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cfsr_table() {
        let table = VariableTable::cfsr();
        assert_eq!(table.len(), 9);
        assert_eq!(table.codes()[0], "U");

        let t = table.get("T").unwrap();
        assert_eq!(t.long_name, "Air temperature");
        assert_eq!(t.levels, vec!["2m", "925mb", "850mb", "500mb"]);
        assert!(t.has_level("500mb"));
        assert!(!t.has_level("10m"));
        assert_eq!(t.default_level(), None);

        assert!(table.get("HGT").unwrap().has_level("925mb"));
        assert!(table.get("SST").is_none());
    }

    #[test]
    fn test_single_level_variables() {
        let table = VariableTable::cfsr();
        let pwat = table.get("PWAT").unwrap();
        assert!(pwat.is_single_level());
        assert_eq!(pwat.default_level(), Some(ONLY_LEVEL));
        assert!(!table.get("WSPD").unwrap().is_single_level());
    }

    #[test]
    fn test_table_from_json() {
        let json = r#"[
            {"code": "T", "long_name": "Air temperature", "levels": ["500mb"]}
        ]"#;
        let table: VariableTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains("T"));
        assert!(!table.contains("U"));
    }
}
