//! # NetCDF File Information Module
//!
//! Inspects a NetCDF file and reports its dimensions (with the role the
//! reducer would assign them), variables, attributes and metadata. Useful
//! for checking a freshly ingested daily, monthly or climatology file.

use crate::dataset::DimRole;
use crate::read::{attribute_string, char_labels};
use anyhow::{Context, Result};
use log::debug;
use netcdf::types::NcVariableType;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Information about a NetCDF dimension
#[derive(Debug, Clone, Serialize)]
pub struct NetCdfDimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
    pub role: DimRole,
}

/// Information about a NetCDF variable
#[derive(Debug, Clone, Serialize)]
pub struct NetCdfVariableInfo {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub shape: Vec<usize>,
    /// Labels of a string coordinate (e.g. level names or `MM-DD` days), when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

/// Complete information about a NetCDF file
#[derive(Debug, Clone, Serialize)]
pub struct NetCdfInfo {
    pub path: String,
    pub dimensions: Vec<NetCdfDimensionInfo>,
    pub variables: Vec<NetCdfVariableInfo>,
    pub global_attributes: BTreeMap<String, String>,
    pub file_size: Option<u64>,
    pub total_variables: usize,
    pub total_dimensions: usize,
}

/// Extract information from a NetCDF file.
///
/// With `detailed`, global attributes and the labels of string coordinates
/// are included as well.
pub fn get_netcdf_info(file_path: &Path, variable: Option<&str>, detailed: bool) -> Result<NetCdfInfo> {
    debug!("Opening NetCDF file: {}", file_path.display());
    let file = netcdf::open(file_path)
        .with_context(|| format!("Failed to open NetCDF file: {}", file_path.display()))?;

    let file_size = fs::metadata(file_path).ok().map(|metadata| metadata.len());

    let dimensions: Vec<NetCdfDimensionInfo> = file
        .dimensions()
        .map(|dim| NetCdfDimensionInfo {
            role: DimRole::classify(&dim.name()),
            name: dim.name().to_string(),
            length: dim.len(),
            is_unlimited: dim.is_unlimited(),
        })
        .collect();

    let mut variables = Vec::new();
    for var in file.variables() {
        if let Some(var_name) = variable
            && var.name() != var_name
        {
            continue;
        }

        let attributes = var
            .attributes()
            .filter_map(|attr| attribute_string(&attr).map(|v| (attr.name().to_string(), v)))
            .collect();

        let var_dims = var.dimensions();
        let labels = match (detailed, var.vartype(), var_dims.len()) {
            (true, NcVariableType::String, 1) => Some(
                (0..var_dims[0].len())
                    .map(|i| var.get_string(i))
                    .collect::<Result<Vec<_>, _>>()
                    .with_context(|| format!("Failed to read labels of '{}'", var.name()))?,
            ),
            (true, NcVariableType::Char, 2) => Some(
                char_labels(&var, var_dims[0].len(), var_dims[1].len())
                    .with_context(|| format!("Failed to read labels of '{}'", var.name()))?,
            ),
            _ => None,
        };

        variables.push(NetCdfVariableInfo {
            name: var.name().to_string(),
            data_type: format!("{:?}", var.vartype()),
            dimensions: var.dimensions().iter().map(|d| d.name().to_string()).collect(),
            attributes,
            shape: var.dimensions().iter().map(|d| d.len()).collect(),
            labels,
        });
    }

    if let Some(var_name) = variable
        && variables.is_empty()
    {
        anyhow::bail!("Variable '{}' not found in {}", var_name, file_path.display());
    }

    let global_attributes = if detailed {
        file.attributes()
            .filter_map(|attr| attribute_string(&attr).map(|v| (attr.name().to_string(), v)))
            .collect()
    } else {
        BTreeMap::new()
    };

    file.close().context("Failed to close NetCDF file")?;

    Ok(NetCdfInfo {
        path: file_path.display().to_string(),
        total_dimensions: dimensions.len(),
        total_variables: variables.len(),
        dimensions,
        variables,
        global_attributes,
        file_size,
    })
}

/// Print NetCDF info in human-readable format
pub fn print_file_info_human(info: &NetCdfInfo) {
    println!("NetCDF File Information:");
    println!("  Path: {}", info.path);
    if let Some(size) = info.file_size {
        println!("  File Size: {:.2} MB", size as f64 / 1_048_576.0);
    }
    println!("  Dimensions: {} total", info.total_dimensions);
    for dim in &info.dimensions {
        println!(
            "    {} ({}{}) - {:?}",
            dim.name,
            dim.length,
            if dim.is_unlimited { ", unlimited" } else { "" },
            dim.role
        );
    }
    println!("  Variables: {} total", info.total_variables);
    for var in &info.variables {
        println!(
            "    {} ({}) - dimensions: [{}]",
            var.name,
            var.data_type,
            var.dimensions.join(", ")
        );
        for (name, value) in &var.attributes {
            println!("      @{}: {}", name, value);
        }
        if let Some(labels) = &var.labels {
            println!("      labels: {}", labels.join(", "));
        }
    }
    if !info.global_attributes.is_empty() {
        println!("  Global Attributes:");
        for (name, value) in &info.global_attributes {
            println!("    @{}: {}", name, value);
        }
    }
}

/// Print NetCDF info in JSON format
pub fn print_file_info_json(info: &NetCdfInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}

/// Print NetCDF info in YAML format
pub fn print_file_info_yaml(info: &NetCdfInfo) -> Result<()> {
    let yaml = serde_yaml::to_string(info).context("Failed to serialize NetCDF info to YAML")?;
    println!("{}", yaml);
    Ok(())
}
