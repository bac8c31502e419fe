//! Config command implementation.
//!
//! Writes, shows and checks run configurations.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use gpxva_exposure::config::{RunConfig, Validate};

use crate::cli::OutputFormat;
use crate::commands::{check_overwrite, load_config};
use crate::error::CliError;
use crate::output::{print_error, print_header, print_output, print_success, KeyValue};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print a configuration (the demo by default) as TOML
    Show(ShowArgs),

    /// Write the demo configuration to a file
    Init(InitArgs),

    /// Check a configuration file and list every problem
    Validate(ValidateArgs),
}

/// Arguments for show subcommand.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Configuration to show, with defaults filled in
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for init subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// File to write
    #[arg(short, long, default_value = "gpxva.toml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration file
    pub path: PathBuf,
}

/// Execute the config command.
pub fn execute(args: ConfigArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        ConfigCommand::Show(show) => execute_show(show, format),
        ConfigCommand::Init(init) => execute_init(init),
        ConfigCommand::Validate(validate) => execute_validate(validate, format),
    }
}

fn execute_show(args: ShowArgs, format: OutputFormat) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Csv => {
            return Err(CliError::UnsupportedFormat("csv".into()).into());
        }
        OutputFormat::Table | OutputFormat::Minimal => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

fn execute_init(args: InitArgs) -> Result<()> {
    check_overwrite(&args.output, args.force)?;
    std::fs::write(&args.output, RunConfig::default().to_toml_string()?)?;
    print_success(&format!("Wrote demo configuration to {}", args.output.display()));
    Ok(())
}

fn execute_validate(args: ValidateArgs, format: OutputFormat) -> Result<()> {
    let content = std::fs::read_to_string(&args.path)?;
    // Parse without validating so every problem can be listed
    let config: RunConfig = toml::from_str(&content).map_err(|e| CliError::Config {
        path: args.path.clone(),
        message: e.to_string(),
    })?;
    let errors = config.validate();

    if errors.is_empty() {
        if format == OutputFormat::Minimal {
            println!("ok");
        } else {
            print_success(&format!("{} is valid", args.path.display()));
        }
        return Ok(());
    }

    let rows: Vec<KeyValue> = errors
        .iter()
        .map(|e| KeyValue::new(e.field.clone(), e.message.clone()))
        .collect();
    match format {
        OutputFormat::Table => {
            print_header(&format!("{} problem(s) in {}", rows.len(), args.path.display()));
            print_output(&rows, format)?;
        }
        OutputFormat::Minimal => {
            for e in &errors {
                println!("{e}");
            }
        }
        _ => print_output(&rows, format)?,
    }
    print_error("Configuration is invalid");
    Err(CliError::Config {
        path: args.path,
        message: format!("{} validation error(s)", errors.len()),
    }
    .into())
}
