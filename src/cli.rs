//! # CLI Module
//!
//! This module provides the command-line interface for reanalysis-plots, including:
//! - Argument parsing with clap
//! - Configuration file loading (JSON/YAML)
//! - Multi-source configuration merging (defaults, file, environment, flags)
//! - Subcommands for plotting, availability, inspection and templates

use crate::calendar::{Cadence, YearMonth};
use crate::error::{PlotError, PlotResult};
use crate::input::DataConfig;
use crate::variables::VariableTable;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Data selection and reduction for CFSR reanalysis map plots
#[derive(Parser, Debug)]
#[command(name = "reanalysis-plots")]
#[command(about = "Reduce CFSR reanalysis data to 2D grids for map plots")]
#[command(version)]
#[command(long_about = "
reanalysis-plots selects daily or monthly CFSR reanalysis files for a date range,
averages one variable at one analysis level into a single latitude/longitude
grid and, optionally, subtracts the 1981-2010 climatology.

FEATURES:
  • Daily and monthly products, ranges of up to one year
  • Anomalies against the daily (MM-DD) or monthly climatology
  • NetCDF output of the reduced grid with title and metadata
  • Availability report of ingested files
  • Configuration files: JSON and YAML format support with templates
  • Shell completions: Auto-completion for bash, zsh, fish, and PowerShell

EXAMPLES:
  # Mean 500mb temperature over five days
  reanalysis-plots daily -n T -l 500mb -s 2000-01-01 -e 2000-01-05 -o t500.nc

  # Monthly precipitable water anomaly
  reanalysis-plots monthly -n PWAT -s 2010-07 --anomaly

  # What has been ingested?
  reanalysis-plots available daily

  # Inspect a climatology file
  reanalysis-plots info /data/climatology/cfsr.daily_climatology.1981-2010.nc --detailed
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for structured data
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Configuration file path (JSON or YAML)
    #[arg(short, long, global = true, env = "REANALYSIS_PLOTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root of the CFSR data directory (overrides config and environment)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reduce daily files to a single grid
    #[command(long_about = "
Average one variable at one analysis level over a range of days.

Without --end only the start day is used. The range must be shorter than one
year and lie within the days available on disk.

EXAMPLES:
  # Single day
  reanalysis-plots daily -n MSLP -s 2015-03-01

  # Five-day mean anomaly, written to a file
  reanalysis-plots daily -n T -l 2m -s 2000-01-01 -e 2000-01-05 --anomaly -o out.nc
")]
    Daily {
        /// Variable code (e.g. T, U, PWAT)
        #[arg(short = 'n', long, env = "REANALYSIS_PLOTS_VARIABLE")]
        variable: String,

        /// Analysis level (e.g. 500mb, 2m); optional for single-level variables
        #[arg(short, long, env = "REANALYSIS_PLOTS_LEVEL")]
        level: Option<String>,

        /// First day, YYYY-MM-DD
        #[arg(short, long, value_parser = parse_date)]
        start: NaiveDate,

        /// Last day, YYYY-MM-DD (default: start day only)
        #[arg(short, long, value_parser = parse_date)]
        end: Option<NaiveDate>,

        /// Subtract the 1981-2010 climatology
        #[arg(long)]
        anomaly: bool,

        /// Mark the plot for filled contours
        #[arg(long)]
        contour: bool,

        /// Write the reduced grid to this NetCDF file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reduce monthly files to a single grid
    #[command(long_about = "
Average one variable at one analysis level over a range of months.

Without --end only the start month is used. The range must be shorter than
one year and lie within the months available on disk.

EXAMPLES:
  reanalysis-plots monthly -n HGT -l 500mb -s 1990-01 -e 1990-03
  reanalysis-plots monthly -n PWAT -s 2010-07 --anomaly -o pwat.nc
")]
    Monthly {
        /// Variable code (e.g. T, U, PWAT)
        #[arg(short = 'n', long, env = "REANALYSIS_PLOTS_VARIABLE")]
        variable: String,

        /// Analysis level (e.g. 500mb, 2m); optional for single-level variables
        #[arg(short, long, env = "REANALYSIS_PLOTS_LEVEL")]
        level: Option<String>,

        /// First month, YYYY-MM
        #[arg(short, long, value_parser = parse_yearmonth)]
        start: YearMonth,

        /// Last month, YYYY-MM (default: start month only)
        #[arg(short, long, value_parser = parse_yearmonth)]
        end: Option<YearMonth>,

        /// Subtract the 1981-2010 climatology
        #[arg(long)]
        anomaly: bool,

        /// Mark the plot for filled contours
        #[arg(long)]
        contour: bool,

        /// Write the reduced grid to this NetCDF file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the first and last day or month available on disk
    Available {
        #[arg(value_enum)]
        cadence: Cadence,
    },

    /// List the plottable variables and their analysis levels
    Variables,

    /// Show information about NetCDF file
    #[command(long_about = "
Inspect NetCDF files and display structure information.

This command displays:
• File dimensions, their sizes and the role assigned to them
• Available variables and their attributes
• String coordinate labels and global attributes (with --detailed)

EXAMPLES:
  reanalysis-plots info /data/daily/cfsr.20000101.nc
  reanalysis-plots info cfsr.monthly_climatology.1981-2010.nc -n T --detailed
  reanalysis-plots info data.nc --format json
")]
    Info {
        /// NetCDF file path
        file: PathBuf,

        /// Show detailed information
        #[arg(long)]
        detailed: bool,

        /// Show only specific variable info
        #[arg(short = 'n', long)]
        variable: Option<String>,

        /// Output format for file information
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Generate a configuration template
    #[command(long_about = "
Generate a configuration file with every option set to its default.

EXAMPLES:
  reanalysis-plots template > config.json
  reanalysis-plots template --format yaml -o config.yaml
  reanalysis-plots --config config.yaml available daily
")]
    Template {
        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },

    /// Generate shell completions
    #[command(long_about = "
Generate shell completion scripts for various shells.

INSTALLATION:
  # Bash
  reanalysis-plots completions bash > ~/.bash_completion.d/reanalysis-plots

  # Zsh
  reanalysis-plots completions zsh > ~/.zsh/completions/_reanalysis-plots

  # Fish
  reanalysis-plots completions fish > ~/.config/fish/completions/reanalysis-plots.fish
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON configuration format
    Json,
    /// YAML configuration format
    Yaml,
}

/// Extended configuration that includes CLI-specific options
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CliConfig {
    #[serde(flatten)]
    pub data: DataConfig,

    /// CLI-specific options
    #[serde(default)]
    pub cli_options: CliOptions,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct CliOptions {
    /// Default log level
    pub log_level: Option<String>,

    /// Output formatting preferences
    pub output_format: Option<OutputFormat>,

    /// Show progress bars while reading files
    pub progress: Option<bool>,
}

impl CliConfig {
    /// Loads a configuration file; YAML for `.yaml`/`.yml`, JSON otherwise.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML config: {}", path.display()))?,
            _ => serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON config: {}", path.display()))?,
        };
        Ok(config)
    }

    /// A configuration with every option spelled out.
    pub fn template() -> Self {
        CliConfig {
            data: DataConfig::default(),
            cli_options: CliOptions {
                log_level: Some("info".to_string()),
                output_format: Some(OutputFormat::Human),
                progress: Some(true),
            },
        }
    }

    pub fn to_string_as(&self, format: &ConfigFormat) -> Result<String> {
        Ok(match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
        })
    }
}

/// Builds the effective configuration.
///
/// Priority, lowest first: defaults, config file, `REANALYSIS_PLOTS_DATA_DIR`,
/// `--data-dir`.
pub fn load_config(cli: &Cli) -> Result<CliConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            debug!("Loading configuration from: {}", path.display());
            CliConfig::from_file(path)?
        }
        None => CliConfig::default(),
    };

    config.data = config.data.with_env_overrides();
    if let Some(dir) = &cli.data_dir {
        config.data.data_dir = dir.clone();
    }

    config.data.validate()?;
    Ok(config)
}

/// Output format from the flag, unless it was left at its default and the
/// config file names one.
pub fn effective_output_format(cli: &Cli, options: &CliOptions) -> OutputFormat {
    match (&cli.output_format, &options.output_format) {
        (OutputFormat::Human, Some(configured)) => configured.clone(),
        (flag, _) => flag.clone(),
    }
}

/// Log filter for `env_logger`: `-v` and `-q` win over the configured level,
/// which wins over `info`.
///
/// Called with default options when the configuration itself failed to load.
pub fn log_filter(cli: &Cli, options: &CliOptions) -> String {
    if cli.verbose {
        "debug".to_string()
    } else if cli.quiet {
        "error".to_string()
    } else {
        options.log_level.clone().unwrap_or_else(|| "info".to_string())
    }
}

/// Level to use for `variable`: the given one, or the only level the
/// variable has.
pub fn resolve_level(
    variables: &VariableTable,
    variable: &str,
    level: Option<&str>,
) -> PlotResult<String> {
    if let Some(level) = level {
        return Ok(level.to_string());
    }
    let descriptor = variables
        .get(variable)
        .ok_or_else(|| PlotError::InvalidRequest(format!("Not a valid variable: '{}'", variable)))?;
    descriptor.default_level().map(str::to_string).ok_or_else(|| {
        PlotError::InvalidRequest(format!(
            "An analysis level is required for {} (choose from {})",
            variable,
            descriptor.levels.join(", ")
        ))
    })
}

/// Parse a day from the command line
/// Format: YYYY-MM-DD
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| "This field requires format 'YYYY-MM-DD'".to_string())
}

/// Parse a month from the command line
/// Format: YYYY-MM (YYYYMM is accepted too)
pub fn parse_yearmonth(s: &str) -> Result<YearMonth, String> {
    s.parse::<YearMonth>()
        .map_err(|_| "This field requires format 'YYYY-MM'".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2000-01-05"), Ok(NaiveDate::from_ymd_opt(2000, 1, 5).unwrap()));
        assert_eq!(
            parse_date("2000/01/05"),
            Err("This field requires format 'YYYY-MM-DD'".to_string())
        );
        assert!(parse_date("2001-02-29").is_err());
    }

    #[test]
    fn test_parse_yearmonth() {
        assert_eq!(parse_yearmonth("2010-07"), Ok(YearMonth::new(2010, 7).unwrap()));
        assert_eq!(parse_yearmonth("201007"), Ok(YearMonth::new(2010, 7).unwrap()));
        assert_eq!(
            parse_yearmonth("2010-13"),
            Err("This field requires format 'YYYY-MM'".to_string())
        );
    }

    #[test]
    fn test_resolve_level() {
        let table = VariableTable::cfsr();
        assert_eq!(resolve_level(&table, "T", Some("2m")).unwrap(), "2m");
        assert_eq!(resolve_level(&table, "PWAT", None).unwrap(), "only");
        assert!(matches!(
            resolve_level(&table, "T", None),
            Err(PlotError::InvalidRequest(_))
        ));
        assert!(resolve_level(&table, "SST", None).is_err());
    }

    #[test]
    fn test_config_template_round_trip() {
        let template = CliConfig::template();
        let json = template.to_string_as(&ConfigFormat::Json).unwrap();
        let parsed: CliConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.data, template.data);
        assert_eq!(parsed.cli_options, template.cli_options);

        let yaml = template.to_string_as(&ConfigFormat::Yaml).unwrap();
        assert!(yaml.contains("data_dir: /data"));
        assert!(yaml.contains("log_level: info"));
    }

    #[test]
    fn test_cli_options_section() {
        let yaml = r#"
data_dir: /srv/cfsr
cli_options:
  log_level: debug
  output_format: json
"#;
        let config: CliConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.data.data_dir, PathBuf::from("/srv/cfsr"));
        assert_eq!(config.data.file_prefix, "cfsr");
        assert_eq!(config.cli_options.log_level.as_deref(), Some("debug"));
        assert_eq!(config.cli_options.output_format, Some(OutputFormat::Json));
    }
}
