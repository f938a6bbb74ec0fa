//! Credence CLI binary.
//!
//! Builds the bank credit panel from the three source tables, validates it
//! and runs the regression battery.

mod logging;

use clap::{Args, Parser, Subcommand};
use credence::{Mode, Pipeline, PipelineConfig, PipelineOutput};
use credence_data::SourceKind;
use credence_model::SpecificationRegistry;
use credence_output::{ExportFormat, Exporter};
use std::path::PathBuf;
use std::process;
use tracing::debug;

#[derive(Parser)]
#[command(name = "credence")]
#[command(about = "Credence: bank credit growth, capital and risk-weight econometrics", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Args)]
struct RunArgs {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Macro (business cycle) source table
    #[arg(long = "macro", value_name = "PATH")]
    macro_path: Option<PathBuf>,

    /// Capital adequacy (balance sheet) source table
    #[arg(long, value_name = "PATH")]
    capital: Option<PathBuf>,

    /// Leverage source table
    #[arg(long, value_name = "PATH")]
    leverage: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

impl RunArgs {
    /// Config file values, then command-line overrides.
    fn resolve(self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        for (kind, path) in [
            (SourceKind::Macro, self.macro_path),
            (SourceKind::Capital, self.capital),
            (SourceKind::Leverage, self.leverage),
        ] {
            if let Some(path) = path {
                config.sources.set(kind, path);
            }
        }
        if let Some(out_dir) = self.out_dir {
            config.out_dir = out_dir;
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load, build and validate the panel; export panel, dictionary and quality report
    Build(RunArgs),

    /// Build, then fit the baseline specification
    Fit(RunArgs),

    /// Build, then run the robustness battery
    Robustness(RunArgs),

    /// Build, fit the baseline and run the robustness battery
    Run(RunArgs),

    /// List the registered specifications
    Specs,

    /// Print the default configuration as JSON
    Config,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let (mode, args) = match command {
        Commands::Build(args) => (Mode::Build, args),
        Commands::Fit(args) => (Mode::Fit, args),
        Commands::Robustness(args) => (Mode::Robustness, args),
        Commands::Run(args) => (Mode::Full, args),
        Commands::Specs => {
            list_specs(&SpecificationRegistry::standard());
            return Ok(());
        }
        Commands::Config => {
            println!("{}", PipelineConfig::default().to_json()?);
            return Ok(());
        }
    };

    let config = args.resolve()?;
    debug!(?config, "resolved configuration");
    let out_dir = config.out_dir.clone();
    let output = Pipeline::new(config).run(mode)?;
    print_summary(&output)?;
    println!("\nOutputs written to {}", out_dir.display());
    for file in &output.manifest.files {
        println!("  - {file}");
    }
    Ok(())
}

fn list_specs(registry: &SpecificationRegistry) {
    println!("{:<36} {:<20} REGRESSORS", "SPECIFICATION", "FAMILY");
    for spec in registry {
        println!(
            "{:<36} {:<20} {}",
            spec.name,
            spec.family.to_string(),
            spec.regressors.join(", ")
        );
    }
}

fn print_summary(output: &PipelineOutput) -> Result<(), Box<dyn std::error::Error>> {
    let report = &output.report;
    println!(
        "Panel: {} rows, {}-{}, {} plausibility warning(s)",
        report.rows,
        report.first_year.map(|y| y.to_string()).unwrap_or_default(),
        report.last_year.map(|y| y.to_string()).unwrap_or_default(),
        report.warnings.len()
    );
    for warning in &report.warnings {
        println!("  ! {warning}");
    }

    if let Some(baseline) = &output.baseline {
        println!();
        print!("{}", baseline.export_to_string(ExportFormat::Markdown)?);
    }
    if let Some(battery) = &output.robustness {
        println!();
        print!("{}", battery.export_to_string(ExportFormat::Markdown)?);
    }
    Ok(())
}
