//! CLI helper functions

use crate::{
    client::{Auth, ElasticsearchClient, SearchStore},
    dump::{DumpReport, DumpRequest, DumpResult, Dumper, PoolConfig, WorkerPool},
    progress::ProgressTracker,
    storage::{DEFAULT_WRITER_BUFFER, DumpWriter, WriteStats, open_sink, output_path},
};
use eyre::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const URL_VAR: &str = "ELASTICSEARCH_URL";
pub const DEFAULT_URL: &str = "http://localhost:9200";

/// Pick the cluster URL: explicit flag, then `ELASTICSEARCH_URL`, then
/// localhost.
pub fn resolve_url(explicit: Option<&str>, lookup: impl Fn(&str) -> Option<String>) -> Result<Url> {
    let url_str = match explicit {
        Some(url) => url.to_string(),
        None => lookup(URL_VAR).unwrap_or_else(|| DEFAULT_URL.to_string()),
    };
    Url::parse(&url_str).with_context(|| format!("Invalid Elasticsearch URL: {}", url_str))
}

/// Load an Elasticsearch client from the flag and environment variables
///
/// Expected environment variables:
/// - ELASTICSEARCH_URL: base URL, used when `--url` is not given
/// - ELASTICSEARCH_USERNAME / ELASTICSEARCH_PASSWORD: basic auth (optional)
/// - ELASTICSEARCH_APIKEY: API key (optional, wins over username/password)
pub fn load_elasticsearch_client(explicit_url: Option<&str>) -> Result<ElasticsearchClient> {
    let url = resolve_url(explicit_url, |key| std::env::var(key).ok())?;
    let auth = Auth::from_env();
    log::debug!("Using {} authentication", auth);
    ElasticsearchClient::try_new(url, auth).context("Failed to create Elasticsearch client")
}

/// Everything needed for one dump besides the store itself.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub request: DumpRequest,
    /// Defaults to `<collection>.json` / `<collection>.gz`
    pub output: Option<PathBuf>,
    pub compress: bool,
    /// Deadline for every single store request
    pub job_timeout: Option<Duration>,
    pub progress: bool,
}

impl ExportOptions {
    pub fn new(request: DumpRequest) -> Self {
        Self {
            request,
            output: None,
            compress: false,
            job_timeout: None,
            progress: false,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| output_path(&self.request.collection, self.compress))
    }
}

#[derive(Clone, Debug)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub report: DumpReport,
    pub stats: WriteStats,
}

/// Dump a whole collection to a local NDJSON file
///
/// Pipeline: Dumper (per-partition walkers via WorkerPool) → DumpWriter
///
/// The output file is only created after discovery succeeds.
pub async fn export_collection<S: SearchStore>(
    store: S,
    options: &ExportOptions,
) -> Result<ExportSummary> {
    let collection = &options.request.collection;
    let pool_config =
        PoolConfig::new(options.request.concurrency).with_job_timeout(options.job_timeout);
    let pool = Arc::new(WorkerPool::new(&pool_config)?);
    log::debug!("Querying with up to {} concurrent request(s)", pool.worker_count());
    let dumper = Dumper::new(Arc::new(store), Arc::clone(&pool));

    log::info!("Discovering {}...", collection.cyan());
    let DumpResult {
        expected,
        mut docs,
        completion,
    } = dumper
        .dump(options.request.clone())
        .await
        .with_context(|| format!("Failed to dump {}", collection))?;

    let path = options.output_path();
    log::info!(
        "Dumping {} record(s) to {}",
        expected,
        path.display().bright_black()
    );
    let writer = DumpWriter::new(open_sink(&path, options.compress)?, DEFAULT_WRITER_BUFFER);
    let mut progress = ProgressTracker::new(expected, options.progress);

    while let Some(doc) = docs.recv().await {
        writer
            .append(doc)
            .await
            .context("Output writer stopped unexpectedly")?;
        progress.inc();
    }
    progress.finish();

    let stats = writer
        .close()
        .await
        .with_context(|| format!("Failed to finish {}", path.display()))?;
    let report = completion.wait().await;
    pool.close().await;

    if !report.is_complete() {
        log::warn!(
            "Delivered {} of {} expected record(s); {} partition(s) failed: {:?}",
            report.delivered,
            report.expected,
            report.failed_partitions.len() + report.panicked,
            report.failed_partitions
        );
    }
    if stats.failed > 0 {
        log::warn!("{} record(s) could not be written", stats.failed);
    }
    log::info!(
        "✓ Dumped {} record(s) to {}",
        stats.written,
        path.display()
    );

    Ok(ExportSummary {
        path,
        report,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url_prefers_flag() {
        let url = resolve_url(Some("http://es:9200"), |_| {
            Some("http://other:9200".to_string())
        })
        .unwrap();
        assert_eq!(url.as_str(), "http://es:9200/");
    }

    #[test]
    fn test_resolve_url_from_env_then_default() {
        let url = resolve_url(None, |key| {
            (key == URL_VAR).then(|| "http://env:9200".to_string())
        })
        .unwrap();
        assert_eq!(url.host_str(), Some("env"));

        let url = resolve_url(None, |_| None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/");
    }

    #[test]
    fn test_resolve_url_rejects_garbage() {
        let result = resolve_url(Some("not a url"), |_| None);
        assert!(result.unwrap_err().to_string().contains("Invalid Elasticsearch URL"));
    }

    #[test]
    fn test_export_options_output_path() {
        let mut options = ExportOptions::new(DumpRequest::new("logs", "event"));
        assert_eq!(options.output_path(), PathBuf::from("logs.json"));

        options.compress = true;
        assert_eq!(options.output_path(), PathBuf::from("logs.gz"));

        options.output = Some(PathBuf::from("/tmp/out.ndjson"));
        assert_eq!(options.output_path(), PathBuf::from("/tmp/out.ndjson"));
    }
}
