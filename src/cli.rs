//! The command line interface for the simulation.
use crate::input::load_model;
use crate::log;
use crate::model::HorizonSelection;
use crate::output::{create_output_directory, get_output_dir, get_run_dir, write_run_output};
use crate::settings::Settings;
use crate::simulation::batch::{plan_runs, run_batch};
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the simulation.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Clone, Debug, PartialEq)]
pub struct RunOpts {
    /// The scenario to run, or "all"
    #[arg(long, default_value = "all")]
    pub scenario: String,
    /// How many times to run each scenario, with consecutive random seeds
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repetitions: u32,
    /// Which part of the model horizon to simulate
    #[arg(long, value_enum, default_value_t)]
    pub horizon: HorizonSelection,
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write every appraised candidate to decision_candidates.csv
    #[arg(long)]
    pub debug_model: bool,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            scenario: "all".into(),
            repetitions: 1,
            horizon: HorizonSelection::Full,
            output_dir: None,
            overwrite: false,
            debug_model: false,
        }
    }
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a simulation model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Manage the program settings file.
    Settings {
        /// The available subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and execute the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ steel-transition --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Initialise the program logger, unless it has been already
fn init_logger(settings: &Settings, log_file_path: Option<&Path>) -> Result<()> {
    if log::is_logger_initialised() {
        return Ok(());
    }

    log::init(Some(&settings.log_level), log_file_path).context("Failed to initialise logging.")
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = load_settings(settings)?;

    // These settings can be overridden by command-line arguments
    settings.debug_model |= opts.debug_model;
    settings.overwrite |= opts.overwrite;

    let output_path = match &opts.output_dir {
        Some(path) => path.clone(),
        None => get_output_dir(model_path)?,
    };
    let overwrite =
        create_output_directory(&output_path, settings.overwrite).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    init_logger(&settings, Some(&output_path))?;

    let model = load_model(model_path).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let scenarios = model.select_scenarios(&opts.scenario)?;
    let years = model.select_horizon(opts.horizon);
    info!("Simulating years {} to {}", years.start(), years.end());

    let runs = plan_runs(&scenarios, opts.repetitions);
    let results = run_batch(&model, &runs, years)?;

    for (batch_run, result) in runs.iter().zip(&results) {
        let run_dir = get_run_dir(
            &output_path,
            &batch_run.scenario.name,
            batch_run.repetition,
            scenarios.len() > 1,
            opts.repetitions > 1,
        );
        write_run_output(&run_dir, model_path, result, settings.debug_model).with_context(
            || format!("Failed to write output to {}", run_dir.display()),
        )?;

        if !result.unresolved.is_empty() {
            warn!(
                "Scenario {} (seed {}) had {} unresolved decisions",
                result.scenario_name,
                result.random_seed,
                result.unresolved.len()
            );
        }
    }
    info!("Simulation complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;

    // We don't save log files when running the validate command
    init_logger(&settings, None)?;

    load_model(model_path).context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}
