use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use plankton_toolbox::{
    analysis::{Analyzer, TaxonRank},
    config::ToolboxConfig,
    error::ImportError,
    import::{ImportManager, ImportOutcome},
    report::{generate, ReportMode},
    table::write_table,
    visualization::{
        print_aggregation_warnings, print_dataset_summary, print_report_preview,
        print_screening_warnings,
    },
    Dataset,
};

#[derive(Parser)]
#[command(
    name = "plankton-report",
    about = "Plankton Toolbox - import monitoring data and build species reports",
    version,
    author
)]
struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a file and show what it contains
    Summary {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Source data file (text or spreadsheet)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Import a file and write the flat export table
    Export {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Source data file (text or spreadsheet)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (.xlsx, .csv or tab separated text)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import one or more files and write a species report
    Report {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Source data files, one dataset each
        #[arg(short, long, num_args = 1.., required = true)]
        input: Vec<PathBuf>,

        /// Output file (.xlsx, .csv or tab separated text)
        #[arg(short, long)]
        output: PathBuf,

        /// Report mode: counted or net
        #[arg(short, long)]
        mode: Option<ReportMode>,

        /// Merge rows of the same species and trophic type
        #[arg(long)]
        aggregate_rows: bool,

        /// Aggregate at this rank first, e.g. "Genus" or "Class (from dataset)"
        #[arg(long)]
        rank: Option<TaxonRank>,

        /// Trophic types kept by aggregation
        #[arg(long, num_args = 1..)]
        trophy: Vec<String>,

        /// Life stages combined by aggregation
        #[arg(long, num_args = 1..)]
        lifestage: Vec<String>,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn import_file(manager: &ImportManager, config: &ToolboxConfig, path: &Path) -> Result<ImportOutcome> {
    match manager.import_file(path, config.text_options()?) {
        Ok(outcome) => Ok(outcome),
        Err(ImportError::EmptyResult { .. }) => {
            anyhow::bail!("No variables found in {}. Check the parser definition.", path.display())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to import {}", path.display())),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Summary { config, input } => {
            let config = ToolboxConfig::load(&config)?;
            let manager = ImportManager::new(config.load_definition()?);
            let outcome = import_file(&manager, &config, &input)?;

            println!(
                "\n{}",
                format!("Imported: {}", input.display()).bold().cyan()
            );
            print_dataset_summary(&outcome.dataset);
            print_screening_warnings(&outcome.warnings);
        }

        Commands::Export {
            config,
            input,
            output,
        } => {
            let config = ToolboxConfig::load(&config)?;
            let manager = ImportManager::new(config.load_definition()?);
            let outcome = import_file(&manager, &config, &input)?;
            if !outcome.warnings.is_empty() {
                eprintln!(
                    "{}: {} screening warnings",
                    "Warning".yellow(),
                    outcome.warnings.len()
                );
            }

            let table = outcome.dataset.export_table();
            write_table(&table, &output)?;
            println!(
                "{} Exported {} rows {} -> {}",
                "Success:".green().bold(),
                table.num_rows(),
                input.display(),
                output.display()
            );
        }

        Commands::Report {
            config,
            input,
            output,
            mode,
            aggregate_rows,
            rank,
            trophy,
            lifestage,
        } => {
            let config = ToolboxConfig::load(&config)?;
            let manager = ImportManager::new(config.load_definition()?);
            let taxa = config.load_taxa()?;

            let mut datasets: Vec<Dataset> = Vec::with_capacity(input.len());
            for path in &input {
                let outcome = import_file(&manager, &config, path)?;
                print_screening_warnings(&outcome.warnings);
                datasets.push(outcome.dataset);
            }

            let aggregation = match (rank, &config.aggregation) {
                (Some(rank), _) => Some((
                    rank,
                    trophy.into_iter().collect::<BTreeSet<_>>(),
                    lifestage.into_iter().collect::<BTreeSet<_>>(),
                )),
                (None, Some(section)) => Some((
                    section.rank()?,
                    section.trophy_filter(),
                    section.lifestage_filter(),
                )),
                (None, None) => None,
            };
            if let Some((rank, trophy, lifestage)) = aggregation {
                let mut analyzer = Analyzer::new(&datasets, &taxa)?;
                let warnings = analyzer.aggregate(rank, &trophy, &lifestage);
                print_aggregation_warnings(&warnings);
                datasets = vec![analyzer.into_dataset()];
            }

            let mode = mode.unwrap_or(config.report.mode);
            let report = generate(
                &datasets,
                mode,
                aggregate_rows || config.report.aggregate_rows,
                &taxa,
            );
            print_report_preview(&report, 20);
            write_table(&report.to_table(), &output)?;
            println!(
                "{} Report ({mode}) written to {}",
                "Success:".green().bold(),
                output.display()
            );
        }
    }

    Ok(())
}
