use clap::{Parser, builder::styling};
use es_dump::cli::{ExportOptions, export_collection, load_elasticsearch_client};
use es_dump::dump::{DEFAULT_CONCURRENCY, DEFAULT_LEASE, DEFAULT_PAGE_SIZE, DumpRequest};
use eyre::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::time::Duration;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// esdump: dump every document of an Elasticsearch index to NDJSON, one scroll per shard
#[derive(Parser)]
#[command(name = "esdump", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source credentials from
    #[arg(short, long, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long)]
    debug: bool,

    /// Elasticsearch URL [default: $ELASTICSEARCH_URL or http://localhost:9200]
    #[arg(short, long)]
    url: Option<String>,

    /// Index to dump
    #[arg(short, long)]
    index: String,

    /// Document type to dump
    #[arg(short = 't', long = "type")]
    doc_type: String,

    /// Max documents per scroll page
    #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
    batch_size: u32,

    /// Output file [default: <index>.json, or <index>.gz with --compress]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the dump with gzip compression
    #[arg(long)]
    compress: bool,

    /// Max concurrent requests to Elasticsearch
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY)]
    max_concurrent_requests: usize,

    /// Give up on a shard when a single request takes longer than this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// How long Elasticsearch keeps each scroll alive between pages, in seconds
    #[arg(long, default_value_t = DEFAULT_LEASE.as_secs())]
    scroll_lease: u64,

    /// Don't draw a progress bar
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dotenv = dotenvy::from_filename(&cli.env);

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    if let Err(e) = dotenv {
        log::debug!("Not loading {}: {}", cli.env, e);
    }

    let client = load_elasticsearch_client(cli.url.as_deref())?;
    log::info!(
        "Dumping {} from {}",
        cli.index.cyan(),
        client.url().bright_black()
    );

    let request = DumpRequest::new(cli.index, cli.doc_type)
        .with_page_size(cli.batch_size)
        .with_concurrency(cli.max_concurrent_requests)
        .with_lease(Duration::from_secs(cli.scroll_lease));
    let options = ExportOptions {
        request,
        output: cli.output,
        compress: cli.compress,
        job_timeout: cli.timeout.map(Duration::from_secs),
        progress: !cli.no_progress,
    };

    let summary = export_collection(client, &options).await?;
    if !summary.report.is_complete() {
        log::warn!(
            "Dump of {} is incomplete, see errors above",
            options.request.collection.yellow()
        );
    }
    log::info!("{}", "DONE!".green());

    Ok(())
}
