use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use kira_crispr_screens::app::App;
use kira_crispr_screens::config::{ConfigLoader, ConfigOverrides};
use kira_crispr_screens::domain::{ScreenId, VocabularyKind};
use kira_crispr_screens::error::KiraError;
use kira_crispr_screens::output::{JsonOutput, MarkdownOutput, OutputFormat};
use kira_crispr_screens::screen::{ScreenFilter, ScreenRead};
use kira_crispr_screens::source::HttpSource;
use kira_crispr_screens::summary;
use kira_crispr_screens::tools::ToolRegistry;

#[derive(Parser)]
#[command(name = "kira-cs")]
#[command(about = "Query CRISPR screen datasets by gene, screen or condition")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    /// Index file location (path, http(s) URL or s3:// URI)
    #[arg(long, global = true)]
    index: Option<String>,

    /// Directory or prefix holding the per-screen files
    #[arg(long, global = true)]
    screens: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Rows for gene symbols across every screen")]
    Genes(GenesArgs),
    #[command(about = "All rows of the given screens")]
    Screens(ScreensArgs),
    #[command(about = "All rows of screens matching a condition or virus name")]
    Condition(ConditionArgs),
    #[command(about = "Resolve a condition name without reading screens")]
    Match(ConditionArgs),
    #[command(about = "List a controlled vocabulary")]
    Vocab(VocabArgs),
    #[command(about = "Rows of one screen, optionally filtered")]
    Read(ReadArgs),
    #[command(about = "Hit rows of one screen")]
    Hits(ScreenArg),
    #[command(about = "Hit count, top hits and significance criteria of one screen")]
    Summary(ScreenArg),
    #[command(about = "Explain how hits are defined for one screen")]
    Explain(ScreenArg),
    #[command(about = "Summaries of screens matching COLUMN=VALUE metadata filters")]
    Filter(FilterArgs),
    #[command(about = "List agent tools with their descriptions")]
    Tools,
    #[command(about = "Invoke an agent tool with a JSON input")]
    Tool(ToolArgs),
}

#[derive(Args)]
struct GenesArgs {
    #[arg(required = true)]
    symbols: Vec<String>,
}

#[derive(Args)]
struct ScreensArgs {
    #[arg(required = true)]
    ids: Vec<ScreenId>,
}

#[derive(Args)]
struct ConditionArgs {
    query: String,

    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(Args)]
struct VocabArgs {
    #[arg(value_enum)]
    kind: VocabularyKind,
}

#[derive(Args)]
struct ScreenArg {
    id: ScreenId,
}

#[derive(Args)]
struct ReadArgs {
    id: ScreenId,

    #[arg(long = "gene")]
    genes: Vec<String>,

    #[arg(long)]
    hit: Option<String>,

    /// Keep rows whose configured score column is at most this value
    #[arg(long)]
    score_max: Option<f64>,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(value_parser = parse_filter_pair, required = true)]
    filters: Vec<(String, String)>,
}

#[derive(Args)]
struct ToolArgs {
    name: String,

    /// JSON input; defaults to null
    input: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::DataUnavailable { .. }
        | KiraError::MissingConfig
        | KiraError::ConfigRead(_) => 2,
        KiraError::RemoteHttp(_) | KiraError::RemoteStatus { .. } => 3,
        KiraError::MalformedInput(_)
        | KiraError::InvalidScreenId(_)
        | KiraError::MissingColumn { .. }
        | KiraError::InvalidLocation(_)
        | KiraError::UnknownTool(_) => 64,
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
    let overrides = ConfigOverrides {
        index: cli.index.clone(),
        screens: cli.screens.clone(),
    };
    let config = ConfigLoader::resolve(cli.config.as_deref(), &overrides)?;
    let source = HttpSource::new()?;
    let app = App::load(config, source)?;

    run_command(&app, cli.command, cli.format)
}

fn run_command(app: &App<HttpSource>, command: Command, format: OutputFormat) -> miette::Result<()> {
    match command {
        Command::Genes(args) => {
            let rows = app.results_by_genes(&args.symbols)?;
            print_table("genes", &rows, format)
        }
        Command::Screens(args) => {
            let rows = app.results_by_screens(&args.ids)?;
            print_table("screens", &rows, format)
        }
        Command::Condition(args) => {
            let threshold = args.threshold.unwrap_or(app.config().condition_threshold);
            let results = app.results_by_condition_with(&args.query, threshold)?;
            match format {
                OutputFormat::Json => JsonOutput::print_report("condition", &results).into_diagnostic(),
                OutputFormat::Markdown => print_table("condition", &results.rows, format),
            }
        }
        Command::Match(args) => {
            let threshold = args.threshold.unwrap_or(app.config().condition_threshold);
            let matched = app.resolve_condition_with(&args.query, threshold)?;
            match format {
                OutputFormat::Json => JsonOutput::print_report("match", &matched).into_diagnostic(),
                OutputFormat::Markdown => {
                    MarkdownOutput::print_lines(matched.screens().iter().map(ScreenId::as_str))
                        .into_diagnostic()
                }
            }
        }
        Command::Vocab(args) => {
            let values = app.vocabulary(args.kind);
            match format {
                OutputFormat::Json => JsonOutput::print_report("vocab", &values).into_diagnostic(),
                OutputFormat::Markdown => MarkdownOutput::print_lines(values).into_diagnostic(),
            }
        }
        Command::Read(args) => {
            let filter = ScreenFilter {
                gene_symbols: (!args.genes.is_empty()).then(|| args.genes.into_iter().collect()),
                hit_value: args.hit,
                score_max: args.score_max.map(|max| app.score_threshold(max)),
            };
            let read = app.read_screen(&args.id, &filter)?;
            print_screen_read("read", &args.id, read, format)
        }
        Command::Hits(args) => {
            let read = app.hits(&args.id)?;
            print_screen_read("hits", &args.id, read, format)
        }
        Command::Summary(args) => {
            let summary = app
                .summarize_screen(&args.id)?
                .ok_or_else(|| not_found(app, &args.id))?;
            match format {
                OutputFormat::Json => JsonOutput::print_report("summary", &summary).into_diagnostic(),
                OutputFormat::Markdown => {
                    MarkdownOutput::print_text(&summary.to_markdown()).into_diagnostic()
                }
            }
        }
        Command::Explain(args) => {
            let text = app.explain_significance(&args.id);
            match format {
                OutputFormat::Json => JsonOutput::print_report("explain", &text).into_diagnostic(),
                OutputFormat::Markdown => MarkdownOutput::print_text(&text).into_diagnostic(),
            }
        }
        Command::Filter(args) => {
            let summaries = app.screens_by_metadata(&args.filters)?;
            match format {
                OutputFormat::Json => JsonOutput::print_report("filter", &summaries).into_diagnostic(),
                OutputFormat::Markdown => {
                    MarkdownOutput::print_text(&summary::to_markdown(&summaries)).into_diagnostic()
                }
            }
        }
        Command::Tools => {
            let registry = ToolRegistry::new(app);
            JsonOutput::print_report("tools", &registry.specs()).into_diagnostic()
        }
        Command::Tool(args) => {
            let input = match args.input.as_deref() {
                // bare words such as `TP53` are taken as JSON strings
                Some(raw) => serde_json::from_str(raw)
                    .unwrap_or_else(|_| Value::String(raw.to_string())),
                None => Value::Null,
            };
            let output = ToolRegistry::new(app).invoke(&args.name, &input)?;
            match (format, &output) {
                (OutputFormat::Markdown, Value::String(text)) => {
                    MarkdownOutput::print_text(text).into_diagnostic()
                }
                _ => JsonOutput::print_report(&args.name, &output).into_diagnostic(),
            }
        }
    }
}

fn print_table(
    command: &str,
    table: &kira_crispr_screens::table::Table,
    format: OutputFormat,
) -> miette::Result<()> {
    match format {
        OutputFormat::Json => JsonOutput::print_report(command, table).into_diagnostic(),
        OutputFormat::Markdown => MarkdownOutput::print_table(table).into_diagnostic(),
    }
}

fn print_screen_read(
    command: &str,
    id: &ScreenId,
    read: ScreenRead,
    format: OutputFormat,
) -> miette::Result<()> {
    if read.is_missing() {
        tracing::warn!(screen = %id, "screen file not found; no rows");
    }
    print_table(command, &read.into_table(), format)
}

fn not_found(app: &App<HttpSource>, id: &ScreenId) -> KiraError {
    KiraError::unavailable(app.store().screen_location(id), "screen file not found")
}

fn parse_filter_pair(value: &str) -> Result<(String, String), String> {
    let (column, wanted) = value
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got `{value}`"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("empty column in `{value}`"));
    }
    Ok((column.to_string(), wanted.trim().to_string()))
}
