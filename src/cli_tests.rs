//! # CLI Integration Tests
//!
//! Argument parsing, global flags and configuration merging for the
//! command-line interface.

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use clap::Parser;
    use std::path::PathBuf;

    use crate::calendar::{Cadence, YearMonth};
    use crate::cli::{
        Cli, CliConfig, CliOptions, Commands, ConfigFormat, OutputFormat, effective_output_format,
        load_config, log_filter,
    };

    /// Test basic CLI argument parsing
    #[test]
    fn test_cli_help() {
        let result = Cli::try_parse_from(["reanalysis-plots", "--help"]);
        assert!(result.is_err()); // --help causes early exit with "error"

        let error = result.unwrap_err();
        assert!(error.to_string().contains("Reduce CFSR reanalysis data"));
    }

    #[test]
    fn test_cli_version() {
        let result = Cli::try_parse_from(["reanalysis-plots", "--version"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "reanalysis-plots",
            "--verbose",
            "--output-format",
            "json",
            "--config",
            "/path/to/config.json",
            "--data-dir",
            "/srv/cfsr",
            "variables",
        ]);

        assert!(cli.verbose);
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.json")));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/srv/cfsr")));
        assert!(matches!(cli.command, Commands::Variables));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        let result = Cli::try_parse_from(["reanalysis-plots", "-v", "-q", "variables"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_daily_command() {
        let cli = Cli::parse_from([
            "reanalysis-plots",
            "daily",
            "-n",
            "T",
            "-l",
            "500mb",
            "--start",
            "2000-01-01",
            "--end",
            "2000-01-05",
            "--anomaly",
            "-o",
            "t500.nc",
        ]);

        if let Commands::Daily {
            variable,
            level,
            start,
            end,
            anomaly,
            contour,
            output,
        } = &cli.command
        {
            assert_eq!(variable, "T");
            assert_eq!(level.as_deref(), Some("500mb"));
            assert_eq!(*start, NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
            assert_eq!(*end, NaiveDate::from_ymd_opt(2000, 1, 5));
            assert!(anomaly);
            assert!(!contour);
            assert_eq!(output, &Some(PathBuf::from("t500.nc")));
        } else {
            panic!("Expected Daily command");
        }
    }

    #[test]
    fn test_daily_command_rejects_bad_date() {
        let result = Cli::try_parse_from([
            "reanalysis-plots",
            "daily",
            "-n",
            "T",
            "--start",
            "01/01/2000",
        ]);
        let error = result.unwrap_err();
        assert!(error.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_monthly_command() {
        let cli = Cli::parse_from([
            "reanalysis-plots",
            "monthly",
            "-n",
            "PWAT",
            "-s",
            "2010-07",
            "--contour",
        ]);

        if let Commands::Monthly {
            variable,
            level,
            start,
            end,
            contour,
            ..
        } = &cli.command
        {
            assert_eq!(variable, "PWAT");
            assert_eq!(level, &None);
            assert_eq!(*start, YearMonth::new(2010, 7).unwrap());
            assert_eq!(end, &None);
            assert!(contour);
        } else {
            panic!("Expected Monthly command");
        }
    }

    #[test]
    fn test_monthly_command_rejects_bad_month() {
        let result = Cli::try_parse_from([
            "reanalysis-plots",
            "monthly",
            "-n",
            "T",
            "-s",
            "2010-13",
        ]);
        assert!(result.unwrap_err().to_string().contains("YYYY-MM"));
    }

    #[test]
    fn test_available_command() {
        let cli = Cli::parse_from(["reanalysis-plots", "available", "monthly"]);
        if let Commands::Available { cadence } = cli.command {
            assert_eq!(cadence, Cadence::Monthly);
        } else {
            panic!("Expected Available command");
        }

        assert!(Cli::try_parse_from(["reanalysis-plots", "available", "hourly"]).is_err());
    }

    #[test]
    fn test_info_command() {
        let cli = Cli::parse_from([
            "reanalysis-plots",
            "info",
            "test.nc",
            "--detailed",
            "-n",
            "T",
            "--format",
            "yaml",
        ]);

        if let Commands::Info {
            file,
            detailed,
            variable,
            format,
        } = &cli.command
        {
            assert_eq!(file, &PathBuf::from("test.nc"));
            assert!(detailed);
            assert_eq!(variable, &Some("T".to_string()));
            assert_eq!(format, &Some(OutputFormat::Yaml));
        } else {
            panic!("Expected Info command");
        }
    }

    #[test]
    fn test_template_command() {
        let cli = Cli::parse_from(["reanalysis-plots", "template", "--format", "yaml", "-o", "config.yaml"]);

        if let Commands::Template { output, format } = &cli.command {
            assert_eq!(output, &Some(PathBuf::from("config.yaml")));
            assert_eq!(format, &ConfigFormat::Yaml);
        } else {
            panic!("Expected Template command");
        }
    }

    #[test]
    fn test_completions_command() {
        let cli = Cli::parse_from(["reanalysis-plots", "completions", "bash"]);
        assert!(matches!(cli.command, Commands::Completions { .. }));
    }

    #[test]
    fn test_missing_subcommand() {
        assert!(Cli::try_parse_from(["reanalysis-plots"]).is_err());
    }

    #[test]
    fn test_load_config_from_file_with_data_dir_flag() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &config_path,
            "data_dir: /from/file\nfile_prefix: reanalysis\ncli_options:\n  output_format: yaml\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "reanalysis-plots",
            "--config",
            config_path.to_str().unwrap(),
            "--data-dir",
            "/from/flag",
            "variables",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.data.data_dir, PathBuf::from("/from/flag"));
        assert_eq!(config.data.file_prefix, "reanalysis");
        assert_eq!(
            effective_output_format(&cli, &config.cli_options),
            OutputFormat::Yaml
        );
    }

    #[test]
    fn test_load_config_rejects_invalid_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.json");
        std::fs::write(&config_path, r#"{"file_prefix": ""}"#).unwrap();

        let cli = Cli::parse_from([
            "reanalysis-plots",
            "--config",
            config_path.to_str().unwrap(),
            "variables",
        ]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_output_format_flag_wins_over_config() {
        let cli = Cli::parse_from(["reanalysis-plots", "--output-format", "json", "variables"]);
        let options = CliOptions {
            output_format: Some(OutputFormat::Yaml),
            ..CliOptions::default()
        };
        assert_eq!(effective_output_format(&cli, &options), OutputFormat::Json);

        let cli = Cli::parse_from(["reanalysis-plots", "variables"]);
        assert_eq!(effective_output_format(&cli, &CliOptions::default()), OutputFormat::Human);
    }

    #[test]
    fn test_log_filter_priority() {
        let options = CliOptions {
            log_level: Some("warn".to_string()),
            ..CliOptions::default()
        };

        let cli = Cli::parse_from(["reanalysis-plots", "variables"]);
        assert_eq!(log_filter(&cli, &options), "warn");
        assert_eq!(log_filter(&cli, &CliOptions::default()), "info");

        let cli = Cli::parse_from(["reanalysis-plots", "-v", "variables"]);
        assert_eq!(log_filter(&cli, &options), "debug");

        let cli = Cli::parse_from(["reanalysis-plots", "-q", "variables"]);
        assert_eq!(log_filter(&cli, &options), "error");
    }

    #[test]
    fn test_log_filter_when_config_fails_to_load() {
        let cli = Cli::parse_from([
            "reanalysis-plots",
            "-v",
            "--config",
            "/nonexistent/reanalysis-plots.yaml",
            "variables",
        ]);
        assert!(load_config(&cli).is_err());
        // The error path still gets a logger, built from default options
        assert_eq!(log_filter(&cli, &CliOptions::default()), "debug");
    }

    #[test]
    fn test_default_config_validates() {
        let config = CliConfig::default();
        assert!(config.data.validate().is_ok());
        assert_eq!(config.cli_options, CliOptions::default());
    }
}
