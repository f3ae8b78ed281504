//! CLI entry point for the sales cleaning and analysis pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use sales_processing::{DatetimeFill, NumericFill, Pipeline, PipelineConfig, SourceKind};
use std::path::PathBuf;
use tracing::{debug, info};

/// CLI-compatible source selector
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSource {
    /// Delimited text with a header row
    Csv,
    /// Record array or column-oriented JSON
    Json,
    /// SQLite database queried with --query
    Sql,
    /// Pick from the file extension
    Auto,
}

impl CliSource {
    fn kind(self) -> Option<SourceKind> {
        match self {
            CliSource::Csv => Some(SourceKind::Csv),
            CliSource::Json => Some(SourceKind::Json),
            CliSource::Sql => Some(SourceKind::Sql),
            CliSource::Auto => None,
        }
    }
}

/// CLI-compatible numeric fill policy
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNumericFill {
    /// Fill with the column mean
    Mean,
    /// Fill with the column median
    Median,
}

impl From<CliNumericFill> for NumericFill {
    fn from(cli: CliNumericFill) -> Self {
        match cli {
            CliNumericFill::Mean => NumericFill::Mean,
            CliNumericFill::Median => NumericFill::Median,
        }
    }
}

/// CLI-compatible date fill policy
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliDatetimeFill {
    /// Fill with the earliest date in the column
    Earliest,
    /// Fill with the latest date in the column
    Latest,
}

impl From<CliDatetimeFill> for DatetimeFill {
    fn from(cli: CliDatetimeFill) -> Self {
        match cli {
            CliDatetimeFill::Earliest => DatetimeFill::Earliest,
            CliDatetimeFill::Latest => DatetimeFill::Latest,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Sales dataset cleaning and analysis pipeline",
    long_about = "Cleans a raw sales dataset, coerces its numeric and date columns, \
                  computes descriptive statistics and renders charts.\n\n\
                  ENVIRONMENT VARIABLES (a .env file is honoured):\n  \
                  SALES_INPUT            Input path\n  \
                  SALES_PROCESSED_DIR    Directory for cleaned data, report and run log\n  \
                  SALES_PLOTS_DIR        Directory for charts\n  \
                  RUST_LOG               Overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Default cafe sales run\n  \
                  sales-processing -i data/raw/dirty_cafe_sales.csv\n\n  \
                  # Query a SQLite database\n  \
                  sales-processing -i sales.db --source sql --query \"SELECT * FROM sales\"\n\n  \
                  # Median fill, no charts, nothing echoed\n  \
                  sales-processing -i sales.json --numeric-fill median --no-charts --quiet"
)]
struct Args {
    /// Path to the input dataset
    #[arg(short, long, env = "SALES_INPUT")]
    input: Option<PathBuf>,

    /// Source type; defaults to the configured one or the file extension
    #[arg(short, long, value_enum)]
    source: Option<CliSource>,

    /// SQL query for SQLite sources
    #[arg(long)]
    query: Option<String>,

    /// Directory for the cleaned data, analysis report and run log
    #[arg(long, env = "SALES_PROCESSED_DIR")]
    processed_dir: Option<PathBuf>,

    /// Directory for charts
    #[arg(long, env = "SALES_PLOTS_DIR")]
    plots_dir: Option<PathBuf>,

    /// Base name of the cleaned data files (without extension)
    #[arg(short, long)]
    output_name: Option<String>,

    /// File name of the persisted run log
    #[arg(long)]
    log_file: Option<String>,

    /// Fill policy for numeric columns
    #[arg(long, value_enum)]
    numeric_fill: Option<CliNumericFill>,

    /// Fill policy for date columns
    #[arg(long, value_enum)]
    datetime_fill: Option<CliDatetimeFill>,

    /// JSON configuration file; command line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip chart rendering
    #[arg(long)]
    no_charts: bool,

    /// Do not echo the run log to stdout
    #[arg(short, long)]
    quiet: bool,

    /// Log level for internal diagnostics (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

/// Initialize the tracing subscriber for internal diagnostics.
///
/// Diagnostics go to stderr so stdout only carries run log lines.
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Merge the optional config file with command line overrides.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            debug!("Reading configuration from {}", path.display());
            PipelineConfig::from_json_file(path)?
        }
        None => PipelineConfig::default(),
    };

    if let Some(input) = &args.input {
        config.input_path = input.clone();
    }
    if let Some(source) = args.source {
        config.source_kind = source.kind();
    }
    if let Some(query) = &args.query {
        config.sql_query = Some(query.clone());
    }
    if let Some(dir) = &args.processed_dir {
        config.processed_dir = dir.clone();
    }
    if let Some(dir) = &args.plots_dir {
        config.plots_dir = dir.clone();
    }
    if let Some(name) = &args.output_name {
        config.output_name = name.clone();
    }
    if let Some(name) = &args.log_file {
        config.log_file_name = name.clone();
    }
    if let Some(fill) = args.numeric_fill {
        config.numeric_fill = fill.into();
    }
    if let Some(fill) = args.datetime_fill {
        config.datetime_fill = fill.into();
    }
    if args.no_charts {
        config.charts.clear();
    }
    if args.quiet {
        config.echo_console = false;
    }

    Ok(config)
}

fn main() -> Result<()> {
    // Load .env before parsing so clap sees its variables
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level);

    let config = build_config(&args)?;
    info!("Input: {}", config.input_path.display());

    let pipeline = Pipeline::builder().config(config).build()?;
    let result = pipeline.run();

    if !result.has_data() {
        return Err(anyhow!(
            "no data loaded from {}",
            pipeline.config().input_path.display()
        ));
    }

    if !pipeline.config().echo_console {
        println!(
            "Processed {} rows x {} columns with {} errors; wrote {} files",
            result.rows,
            result.columns,
            result.error_count(),
            result.written.len()
        );
    }

    Ok(())
}
