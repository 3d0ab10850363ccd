// statgrid CLI - import datasets, run analyses, inspect the audit trail

mod exit_codes;
mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use statgrid_analysis::analyses::{Crosstabs, Descriptives, Frequencies};
use statgrid_analysis::{Analysis, AnalysisReport, Pipeline, ResultTable};
use statgrid_compute::PoolConfig;
use statgrid_config::Settings;
use statgrid_engine::{Dataset, DatasetEvent};
use statgrid_io::{native, AuditStore, IoError, StatisticId};

use exit_codes::{analysis_exit_code, EXIT_ERROR, EXIT_IO, EXIT_RECORD, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "sgrid")]
#[command(about = "Statistical workbench (CLI mode, headless)")]
#[command(version)]
struct Cli {
    /// Settings file (default: the per-user statgrid settings.json)
    #[arg(long, global = true, env = "STATGRID_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV/TSV file into a native .sgrid dataset
    #[command(after_help = "\
Examples:
  sgrid import survey.csv -o survey.sgrid
  sgrid import survey.tsv -o survey.sgrid --delimiter tab")]
    Import {
        /// CSV or TSV file; the first record holds variable names
        input: PathBuf,

        /// Output .sgrid file
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Field delimiter (sniffed from the first lines when omitted)
        #[arg(long)]
        delimiter: Option<Delimiter>,
    },

    /// Export a .sgrid dataset to CSV or TSV
    Export {
        input: PathBuf,

        #[arg(long, short = 'o')]
        output: PathBuf,

        #[arg(long, default_value = "comma")]
        delimiter: Delimiter,
    },

    /// List the variables of a dataset
    Variables {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Frequency tables for one or more variables
    #[command(after_help = "\
Examples:
  sgrid frequencies survey.sgrid group sex
  sgrid frequencies survey.sgrid group --json")]
    Frequencies {
        file: PathBuf,

        #[arg(required = true)]
        variables: Vec<String>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Descriptive statistics for numeric variables
    Descriptives {
        file: PathBuf,

        #[arg(required = true)]
        variables: Vec<String>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Cross-tabulate two variables
    #[command(after_help = "\
Examples:
  sgrid crosstabs survey.sgrid --row sex --col group")]
    Crosstabs {
        file: PathBuf,

        #[arg(long)]
        row: String,

        #[arg(long)]
        col: String,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Show the audit trail recorded in a file
    Audit {
        file: PathBuf,

        /// Print one stored statistic as a table
        #[arg(long, value_name = "ID")]
        show: Option<i64>,

        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Audit database (default: settings, else the dataset file itself)
    #[arg(long)]
    audit: Option<PathBuf>,

    /// Print result tables as JSON
    #[arg(long)]
    json: bool,

    /// Suppress stderr notes (e.g. omitted variables)
    #[arg(long, short = 'q')]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Delimiter {
    Comma,
    Tab,
    Semicolon,
    Pipe,
}

impl Delimiter {
    fn byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
            Delimiter::Semicolon => b';',
            Delimiter::Pipe => b'|',
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings.log_level.as_str()))
        .format_timestamp(None)
        .init();
    log::debug!("Settings: {:?}", settings);

    let result = match cli.command {
        None => {
            eprintln!("Usage: sgrid <command> [options]");
            eprintln!("       sgrid --help for more information");
            Ok(())
        }
        Some(Commands::Import { input, output, delimiter }) => cmd_import(&input, &output, delimiter),
        Some(Commands::Export { input, output, delimiter }) => cmd_export(&input, &output, delimiter),
        Some(Commands::Variables { file, json }) => cmd_variables(&file, json),
        Some(Commands::Frequencies { file, variables, run }) => {
            cmd_analyze(&settings, &file, Box::new(Frequencies::new(variables)), &run)
        }
        Some(Commands::Descriptives { file, variables, run }) => {
            cmd_analyze(&settings, &file, Box::new(Descriptives::new(variables)), &run)
        }
        Some(Commands::Crosstabs { file, row, col, run }) => {
            cmd_analyze(&settings, &file, Box::new(Crosstabs::new(row, col)), &run)
        }
        Some(Commands::Audit { file, show, json }) => cmd_audit(&file, show, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn record(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RECORD, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn io_error(path: &Path, err: IoError) -> CliError {
    CliError::io(format!("{}: {}", path.display(), err))
}

fn load_dataset(path: &Path) -> Result<Dataset, CliError> {
    if !path.exists() {
        return Err(CliError::io(format!("{}: no such file", path.display()))
            .with_hint("create one with `sgrid import <csv> -o <file.sgrid>`"));
    }
    native::load(path).map_err(|e| io_error(path, e))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: e.to_string(),
        hint: None,
    })?;
    println!("{}", text);
    Ok(())
}

fn cmd_import(input: &Path, output: &Path, delimiter: Option<Delimiter>) -> Result<(), CliError> {
    let dataset = match delimiter {
        Some(d) => statgrid_io::csv::import_with_delimiter(input, d.byte()),
        None => statgrid_io::csv::import(input),
    }
    .map_err(|e| io_error(input, e))?;

    native::save(&dataset, output).map_err(|e| io_error(output, e))?;
    eprintln!(
        "Imported {} case(s), {} variable(s) into {}",
        dataset.rows().len(),
        dataset.variables().len(),
        output.display()
    );
    Ok(())
}

fn cmd_export(input: &Path, output: &Path, delimiter: Delimiter) -> Result<(), CliError> {
    let dataset = load_dataset(input)?;
    statgrid_io::csv::export_with_delimiter(&dataset, output, delimiter.byte()).map_err(|e| io_error(output, e))
}

fn cmd_variables(file: &Path, json: bool) -> Result<(), CliError> {
    let dataset = load_dataset(file)?;
    let variables = dataset.variables();

    if json {
        return print_json(&variables);
    }

    let width = variables.iter().map(|v| v.name.chars().count()).max().unwrap_or(0);
    for v in variables {
        let labels = dataset.registry().value_labels().for_variable(&v.name).count();
        let mut line = format!("{:>3}  {:<width$}  {:<10}", v.column_index, v.name, v.var_type.to_string());
        if !v.label.is_empty() {
            line.push_str(&format!("  \"{}\"", v.label));
        }
        if labels > 0 {
            line.push_str(&format!("  ({} value label(s))", labels));
        }
        println!("{}", line.trim_end());
    }
    Ok(())
}

/// Where an analysis run is recorded: `--audit`, then the settings, then
/// the dataset file.
fn audit_path(settings: &Settings, file: &Path, run: &RunArgs) -> PathBuf {
    run.audit
        .clone()
        .or_else(|| settings.audit_database.clone())
        .unwrap_or_else(|| file.to_path_buf())
}

fn cmd_analyze(settings: &Settings, file: &Path, analysis: Box<dyn Analysis>, run: &RunArgs) -> Result<(), CliError> {
    let mut dataset = load_dataset(file)?;

    let audit_file = audit_path(settings, file, run);
    let mut audit = AuditStore::open(&audit_file)
        .map_err(|e| CliError::record(format!("{}: {}", audit_file.display(), e)))?;

    let workers = settings.compute_workers.unwrap_or_else(|| PoolConfig::default().workers).max(1);
    let pipeline = Pipeline::start(PoolConfig { workers }, settings.compute_timeout())
        .map_err(|e| CliError { code: EXIT_ERROR, message: format!("cannot start compute pool: {}", e), hint: None })?;

    let result = pipeline.run(&mut dataset, analysis, &mut audit);

    if !run.quiet {
        for event in dataset.take_events() {
            if let DatasetEvent::SelectionOmitted { name } = event {
                eprintln!("note: no variable named '{}'; omitted", name);
            }
        }
    }

    let report = result.map_err(|e| CliError {
        code: analysis_exit_code(&e),
        message: e.to_string(),
        hint: None,
    })?;
    print_report(&report, run.json)
}

fn print_report(report: &AnalysisReport, json: bool) -> Result<(), CliError> {
    if json {
        let tables: Vec<&ResultTable> = report.output.tables().collect();
        return print_json(&json!({
            "title": report.title,
            "log": report.chain.log,
            "analytic": report.chain.analytic,
            "statistics": report.chain.statistics,
            "tables": tables,
        }));
    }

    println!("{}", report.title);
    println!();
    for table in report.output.tables() {
        println!("{}", render::render_table(table));
    }
    Ok(())
}

fn cmd_audit(file: &Path, show: Option<i64>, json: bool) -> Result<(), CliError> {
    if !file.exists() {
        return Err(CliError::io(format!("{}: no such file", file.display())));
    }
    let audit = AuditStore::open(file).map_err(|e| CliError::record(format!("{}: {}", file.display(), e)))?;
    let fail = |e: statgrid_io::AuditError| CliError::record(e.to_string());

    if let Some(id) = show {
        let statistic = audit
            .statistic(StatisticId(id))
            .map_err(fail)?
            .ok_or_else(|| CliError::usage(format!("no statistic with id {}", id)))?;
        if json {
            return print_json(&statistic);
        }
        let table: ResultTable = serde_json::from_str(&statistic.output_data)
            .map_err(|e| CliError::record(format!("statistic {} is not a result table: {}", id, e)))?;
        print!("{}", render::render_table(&table));
        return Ok(());
    }

    let mut entries = Vec::new();
    for log in audit.logs().map_err(fail)? {
        let mut analytics = Vec::new();
        for analytic in audit.analytics_for(log.id).map_err(fail)? {
            let statistics = audit.statistics_for(analytic.id).map_err(fail)?;
            analytics.push((analytic, statistics));
        }
        entries.push((log, analytics));
    }

    if json {
        let value: Vec<_> = entries
            .iter()
            .map(|(log, analytics)| {
                json!({
                    "id": log.id,
                    "text": log.text,
                    "createdAt": log.created_at.to_rfc3339(),
                    "analytics": analytics.iter().map(|(a, stats)| json!({
                        "id": a.id,
                        "title": a.title,
                        "note": a.note,
                        "statistics": stats.iter().map(|s| json!({
                            "id": s.id,
                            "title": s.title,
                            "components": s.components,
                        })).collect::<Vec<_>>(),
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();
        return print_json(&value);
    }

    if entries.is_empty() {
        eprintln!("No analyses recorded in {}", file.display());
        return Ok(());
    }
    for (log, analytics) in &entries {
        println!("[{}] {}  {}", log.id, log.created_at.format("%Y-%m-%d %H:%M:%S"), log.text);
        for (analytic, statistics) in analytics {
            println!("  {}", analytic.title);
            for s in statistics {
                println!("    #{} {}", s.id, s.title);
            }
        }
    }
    Ok(())
}
