use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use rrna_norm::app::{App, ProgressEvent, ProgressSink, RunOptions, RunResult};
use rrna_norm::config::{ConfigLoader, DEFAULT_TAXONOMY_COLUMN};
use rrna_norm::error::NormError;
use rrna_norm::output::{JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "rrna-norm")]
#[command(about = "Normalise 16S count tables by rRNA gene copy number against an external reference db")]
#[command(version, author)]
struct Cli {
    /// Path to the input count table: tab delimited, samples in columns,
    /// OTUs in rows, last column excluded from normalisation. Row order is
    /// maintained.
    #[arg(long)]
    input_path: Option<Utf8PathBuf>,

    /// Path to the tab delimited file mapping taxa annotations to rRNA copy
    /// numbers (`.gz` accepted). Additional columns are ignored.
    #[arg(long)]
    db_path: Option<Utf8PathBuf>,

    /// Path for the output table; defaults to counts_out.tsv next to the
    /// input.
    #[arg(long)]
    output_path: Option<Utf8PathBuf>,

    /// Name of the taxonomy annotation column used as the row index.
    #[arg(long)]
    taxonomy_column: Option<String>,

    /// Explicit config file instead of rrna-norm.json in the current
    /// directory.
    #[arg(long)]
    config: Option<String>,

    /// Run the whole pipeline but write no output file.
    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(norm) = report.downcast_ref::<NormError>() {
            return ExitCode::from(map_exit_code(norm));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &NormError) -> u8 {
    match error {
        NormError::MissingConfig | NormError::ConfigRead(_) | NormError::ConfigParse(_) => 2,
        NormError::DataCorruption { .. }
        | NormError::EmptyReference
        | NormError::UnparseableTaxon(_)
        | NormError::MissingColumn(_)
        | NormError::TableParse { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let options = build_options(&cli)?;
    let app = App::new();

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.run(&options, &JsonOutput).into_diagnostic()?;
            JsonOutput::print_run(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.run(&options, &ConsoleSink).into_diagnostic()?;
            print_run_summary(&result);
        }
    }
    Ok(())
}

fn build_options(cli: &Cli) -> miette::Result<RunOptions> {
    // the config file is consulted only when asked for explicitly or when a
    // required path is missing from the command line
    let resolved = if cli.config.is_some() || cli.input_path.is_none() || cli.db_path.is_none() {
        Some(ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?)
    } else {
        None
    };

    let input_path = cli
        .input_path
        .clone()
        .or_else(|| resolved.as_ref().and_then(|config| config.input_path.clone()))
        .ok_or_else(|| {
            miette::Report::msg("input table path required (--input-path or input_path in config)")
        })?;
    let db_path = cli
        .db_path
        .clone()
        .or_else(|| resolved.as_ref().and_then(|config| config.db_path.clone()))
        .ok_or_else(|| {
            miette::Report::msg("reference db path required (--db-path or db_path in config)")
        })?;
    let output_path = cli
        .output_path
        .clone()
        .or_else(|| resolved.as_ref().and_then(|config| config.output_path.clone()));
    let taxonomy_column = cli
        .taxonomy_column
        .clone()
        .or_else(|| resolved.as_ref().map(|config| config.taxonomy_column.clone()))
        .unwrap_or_else(|| DEFAULT_TAXONOMY_COLUMN.to_string());

    Ok(RunOptions {
        db_path,
        input_path,
        output_path,
        taxonomy_column,
        dry_run: cli.dry_run,
    })
}

struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => eprintln!("{}", event.message),
        }
    }
}

fn print_run_summary(result: &RunResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}rrna-norm summary{reset}");
    println!(
        "{green}Curated reference keys: {} (grand average copy number {:.4}){reset}",
        result.reference.keys_added, result.reference.grand_average
    );
    if result.reference.duplicated_keys > 0 {
        println!(
            "{yellow}Duplicated reference keys: {} ({} discarded instances, first value kept){reset}",
            result.reference.duplicated_keys, result.reference.duplicate_instances
        );
        for (key, count) in &result.reference.duplicates {
            println!("{yellow}   {key}: {count}{reset}");
        }
    }

    println!(
        "{green}Normalised {} rows across {} samples ({} distinct taxa, {} exact matches){reset}",
        result.rows,
        result.samples,
        result.taxa.distinct,
        result.taxa.exact
    );
    for entry in &result.taxa.shortened {
        println!(
            "{yellow}   {} shortened to {} ({} ranks dropped){reset}",
            entry.taxon, entry.key, entry.dropped
        );
    }
    for taxon in &result.taxa.unresolved {
        println!(
            "{yellow}   no reference match for {taxon}; corrected by the grand average{reset}"
        );
    }
    for column in &result.zero_sum_columns {
        println!(
            "{yellow}   sample {column} sums to zero; relative abundances are undefined{reset}"
        );
    }

    match &result.output_path {
        Some(path) => println!("{green}Written to {path}{reset}"),
        None => println!("{yellow}Dry run, no output written{reset}"),
    }
}
