use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use log::error;
use reanalysis_plots::availability::available_bounds;
use reanalysis_plots::calendar::{Cadence, CalendarKey, YearMonth};
use reanalysis_plots::cli::{
    Cli, CliConfig, CliOptions, Commands, OutputFormat, effective_output_format, load_config,
    log_filter, resolve_level,
};
use reanalysis_plots::error::PlotError;
use reanalysis_plots::info::{
    get_netcdf_info, print_file_info_human, print_file_info_json, print_file_info_yaml,
};
use reanalysis_plots::log::{show_farewell_with_timing, show_greeting, show_plot_summary};
use reanalysis_plots::output::{
    AvailabilityReport, GridSummary, print_availability, print_grid_summary, print_variables,
    write_grid_netcdf,
};
use reanalysis_plots::process_plot_request_with_progress;
use reanalysis_plots::request::PlotRequest;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<PlotError>() {
                Some(plot_error) if plot_error.is_user_facing() => {
                    eprintln!("{}", plot_error.user_message());
                }
                Some(plot_error) => {
                    error!("{:#}", err);
                    eprintln!("Error: {}", plot_error.user_message());
                }
                None => {
                    error!("{:#}", err);
                    eprintln!("Error: {:#}", err);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli, options: &CliOptions) {
    let filter = log_filter(cli, options);
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&filter));
    if cli.verbose || cli.quiet {
        builder.parse_filters(&filter);
    }
    builder.init();
}

fn run(cli: Cli) -> Result<()> {
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            init_logging(&cli, &CliOptions::default());
            return Err(err);
        }
    };
    init_logging(&cli, &config.cli_options);
    let format = effective_output_format(&cli, &config.cli_options);

    match &cli.command {
        Commands::Daily {
            variable,
            level,
            start,
            end,
            anomaly,
            contour,
            output,
        } => {
            let level = resolve_level(&config.data.variables, variable, level.as_deref())?;
            let request = PlotRequest::<NaiveDate>::new(variable, &level, *start, *end)
                .with_anomaly(*anomaly)
                .with_contour(*contour);
            run_plot(&cli, &config, &request, output.as_deref(), &format)
        }
        Commands::Monthly {
            variable,
            level,
            start,
            end,
            anomaly,
            contour,
            output,
        } => {
            let level = resolve_level(&config.data.variables, variable, level.as_deref())?;
            let request = PlotRequest::<YearMonth>::new(variable, &level, *start, *end)
                .with_anomaly(*anomaly)
                .with_contour(*contour);
            run_plot(&cli, &config, &request, output.as_deref(), &format)
        }
        Commands::Available { cadence } => {
            let report = match cadence {
                Cadence::Daily => {
                    AvailabilityReport::new(&config.data, &available_bounds::<NaiveDate>(&config.data)?)
                }
                Cadence::Monthly => {
                    AvailabilityReport::new(&config.data, &available_bounds::<YearMonth>(&config.data)?)
                }
            };
            print_availability(&report, &format)?;
            Ok(())
        }
        Commands::Variables => {
            print_variables(&config.data.variables, &format)?;
            Ok(())
        }
        Commands::Info {
            file,
            detailed,
            variable,
            format: info_format,
        } => {
            let info = get_netcdf_info(file, variable.as_deref(), *detailed)?;
            match info_format.as_ref().unwrap_or(&format) {
                OutputFormat::Human => print_file_info_human(&info),
                OutputFormat::Json => print_file_info_json(&info)?,
                OutputFormat::Yaml => print_file_info_yaml(&info)?,
            }
            Ok(())
        }
        Commands::Template {
            output,
            format: config_format,
        } => {
            let content = CliConfig::template().to_string_as(config_format)?;
            write_or_print(output.as_deref(), content.as_bytes())
        }
        Commands::Completions { shell, output } => {
            let mut buffer = Vec::new();
            clap_complete::generate(*shell, &mut Cli::command(), "reanalysis-plots", &mut buffer);
            write_or_print(output.as_deref(), &buffer)
        }
    }
}

fn run_plot<K: CalendarKey>(
    cli: &Cli,
    config: &CliConfig,
    request: &PlotRequest<K>,
    output: Option<&Path>,
    format: &OutputFormat,
) -> Result<()> {
    let start_time = Instant::now();
    show_greeting(&K::CADENCE.to_string());

    let show_progress = !cli.quiet && config.cli_options.progress.unwrap_or(true);
    let plot = process_plot_request_with_progress(&config.data, request, show_progress)?;
    show_plot_summary(&plot);

    if let Some(path) = output {
        write_grid_netcdf(&plot, path)
            .with_context(|| format!("Failed to write grid to {}", path.display()))?;
    }
    print_grid_summary(&GridSummary::from_plot(&plot), format)?;

    show_farewell_with_timing(start_time.elapsed());
    Ok(())
}

fn write_or_print(output: Option<&Path>, content: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            file.write_all(content)?;
        }
        None => io::stdout().write_all(content)?,
    }
    Ok(())
}
