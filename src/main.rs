// perfdaily CLI - ingest benchmark results and inspect regressions between builds
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

use perfdaily::{
    create_record_store, init_logging_with_level, record_metric, start_server, with_trace_id,
    BuildService, ComparisonService, HistoryService, IngestService, MeasurementRecord,
    MetricType, ReportService, SeriesQuery, ServerConfig, StorageBackend,
};

// Macro for conditional printing based on quiet flag
macro_rules! qprintln {
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            println!($($arg)*);
        }
    };
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "perfdaily - daily benchmark regression tracking",
    long_about = None,
    after_help = "EXAMPLES:
  perfdaily ingest results.json
  perfdaily compare build-041 build-042
  perfdaily report build-042
  perfdaily history kv get_latency p99
  perfdaily serve --port 8080"
)]
struct Cli {
    /// Enable verbose logging (DEBUG level). Default is WARN level.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print results, no progress lines
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "PERFDAILY_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory of the file store
    #[arg(short, long, global = true)]
    data_dir: Option<String>,

    /// Storage backend: memory, file or postgres
    #[arg(long, global = true)]
    store: Option<StorageBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
    },

    /// Ingest a JSON file holding one measurement or an array of them
    Ingest {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// List every build with data, oldest first
    Builds,

    /// Compare two builds metric by metric
    Compare { build1: String, build2: String },

    /// Trend report of one build against its moving averages
    Report {
        build: String,
        /// Output format
        #[arg(short = 'f', long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Values of one series, most recent first
    History {
        component: String,
        test_case: String,
        metric: String,
    },

    /// Values and annotations of one series, oldest first, as JSON rows
    Timeline {
        component: String,
        test_case: String,
        metric: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IngestPayload {
    Many(Vec<MeasurementRecord>),
    One(Box<MeasurementRecord>),
}

fn load_config(cli: &Cli) -> Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Invalid config path: {:?}", path))?;
            let mut config = ServerConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {path}"))?;
            config.apply_env()?;
            config
        }
        None => ServerConfig::load()?,
    };

    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if let Some(backend) = cli.store {
        config.storage.backend = backend;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI args first to get verbose flag
    let cli = Cli::parse();

    let quiet = cli.quiet;
    let mut config = load_config(&cli)?;

    // Configured level, adjusted by the verbose/quiet flags
    let _ = init_logging_with_level(cli.verbose, quiet, &config.logging.level); // Ignore error if already initialized

    with_trace_id("perfdaily-cli", async move {
        let store = create_record_store(&config.storage).await?;

        match cli.command {
            Commands::Serve { port, host } => {
                if let Some(port) = port {
                    config.server.port = port;
                }
                if let Some(host) = host {
                    config.server.host = host;
                }

                qprintln!(
                    quiet,
                    "Starting perfdaily HTTP server on {}:{}",
                    config.server.host,
                    config.server.port
                );
                qprintln!(quiet, "API endpoints:");
                qprintln!(quiet, "   POST   /api/v1/benchmarks                  - Ingest a measurement");
                qprintln!(quiet, "   GET    /api/v1/builds                      - List builds");
                qprintln!(quiet, "   GET    /api/v1/comparison/:build1/:build2  - Compare builds");
                qprintln!(quiet, "   GET    /api/v1/report/:build               - Build report");
                qprintln!(quiet, "   GET    /api/v1/history                     - Series history");
                qprintln!(quiet, "   GET    /api/v1/timeline                    - Series timeline");
                qprintln!(quiet, "   GET    /health                             - Health check");

                start_server(store, &config).await?;
            }

            Commands::Ingest { file } => {
                let content = tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let records = match serde_json::from_str::<IngestPayload>(&content)
                    .with_context(|| format!("{} is not a measurement or list of measurements", file.display()))?
                {
                    IngestPayload::Many(records) => records,
                    IngestPayload::One(record) => vec![*record],
                };

                let stored = IngestService::new(store).ingest_all(records).await?;
                record_metric(MetricType::Counter {
                    name: "cli.ingested",
                    value: stored as u64,
                });
                qprintln!(quiet, "Ingested {stored} measurement(s) from {}", file.display());
            }

            Commands::Builds => {
                for build in BuildService::new(store).builds().await? {
                    println!("{build}");
                }
            }

            Commands::Compare { build1, build2 } => {
                let results = ComparisonService::new(store, config.report.snapshot_base_url())
                    .compare(&build1, &build2)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&results)?);
            }

            Commands::Report { build, format } => {
                let service = ReportService::new(store);
                if format == "json" {
                    let report = service.report(&build).await?;
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print!("{}", service.render(&build).await?);
                }
            }

            Commands::History {
                component,
                test_case,
                metric,
            } => {
                let query = SeriesQuery::new(component, test_case, metric);
                let history = HistoryService::new(store).history(&query).await?;
                if history.is_empty() {
                    qprintln!(quiet, "No measurements for this series");
                }
                for entry in history {
                    match entry.build_url {
                        Some(url) => println!("{}\t{}\t{}", entry.build, entry.value, url),
                        None => println!("{}\t{}", entry.build, entry.value),
                    }
                }
            }

            Commands::Timeline {
                component,
                test_case,
                metric,
            } => {
                let query = SeriesQuery::new(component, test_case, metric);
                let timeline = HistoryService::new(store).timeline(&query).await?;
                println!("{}", serde_json::to_string_pretty(&timeline)?);
            }
        }

        Ok::<(), anyhow::Error>(())
    })
    .await
}
