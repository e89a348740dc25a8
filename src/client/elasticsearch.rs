//! Elasticsearch client module
//!
//! Provides `ElasticsearchClient`, the HTTP implementation of [`SearchStore`].
//! Responses are decoded into typed envelopes here so the dump core only ever
//! sees [`Page`] values.

use super::Auth;
use super::store::{CursorQuery, Page, SearchStore};
use crate::error::StoreError;
use eyre::Result;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

/// Elasticsearch client for the scroll, count and shard APIs.
///
/// # Example
/// ```no_run
/// use es_dump::client::{Auth, ElasticsearchClient, SearchStore};
/// use url::Url;
///
/// # async fn example() -> eyre::Result<()> {
/// let url = Url::parse("http://localhost:9200")?;
/// let client = ElasticsearchClient::try_new(url, Auth::None)?;
/// let shards = client.partition_count("logs").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ElasticsearchClient {
    client: Client,
    url: Url,
}

#[derive(Deserialize)]
struct SearchShardsResponse {
    shards: Vec<Value>,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
struct ScrollResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: HitsEnvelope,
}

#[derive(Deserialize)]
struct HitsEnvelope {
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: Value,
}

impl ElasticsearchClient {
    /// Create a new client from a base URL and credentials.
    ///
    /// # Errors
    /// Returns an error if the auth headers are malformed or the HTTP client
    /// cannot be built.
    pub fn try_new(url: Url, auth: Auth) -> Result<Self> {
        let client = Client::builder().default_headers(auth.headers()?).build()?;
        Ok(Self { client, url })
    }

    /// Get the base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, StoreError> {
        // Strip leading slash from path if present, to avoid double slashes
        let path = path.strip_prefix('/').unwrap_or(path);
        let url = self.url.join(&format!("/{}", path))?;
        log::trace!("{} {}", method, url);
        Ok(self.client.request(method, url))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Format a lease as an Elasticsearch time value, e.g. `60s`.
fn lease_param(lease: Duration) -> String {
    format!("{}s", lease.as_secs().max(1))
}

fn search_path(query: &CursorQuery) -> String {
    if query.record_type.is_empty() {
        format!("{}/_search", query.collection)
    } else {
        format!("{}/{}/_search", query.collection, query.record_type)
    }
}

fn decode_page(body: ScrollResponse) -> Result<Page, StoreError> {
    let records = body
        .hits
        .hits
        .into_iter()
        .map(|hit| serde_json::to_string(&hit.source))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page {
        records,
        cursor: body.scroll_id,
    })
}

impl SearchStore for ElasticsearchClient {
    async fn partition_count(&self, collection: &str) -> Result<u32, StoreError> {
        let request = self.request(Method::GET, &format!("{}/_search_shards", collection))?;
        let body: SearchShardsResponse = self.send(request).await?;
        u32::try_from(body.shards.len())
            .map_err(|_| StoreError::Other(format!("too many shards: {}", body.shards.len())))
    }

    async fn record_count(&self, collection: &str) -> Result<u64, StoreError> {
        let request = self.request(Method::GET, &format!("{}/_count", collection))?;
        let body: CountResponse = self.send(request).await?;
        Ok(body.count)
    }

    async fn open_cursor(&self, query: &CursorQuery) -> Result<Page, StoreError> {
        let request = self.request(Method::GET, &search_path(query))?.query(&[
            ("sort", query.sort.to_string()),
            ("size", query.page_size.to_string()),
            ("preference", format!("_shards:{}", query.partition)),
            ("scroll", lease_param(query.lease)),
        ]);
        decode_page(self.send(request).await?)
    }

    async fn continue_cursor(&self, cursor: &str, lease: Duration) -> Result<Page, StoreError> {
        let request = self
            .request(Method::POST, "_search/scroll")?
            .json(&json!({ "scroll": lease_param(lease), "scroll_id": cursor }));
        decode_page(self.send(request).await?)
    }

    async fn release_cursor(&self, cursor: &str) -> Result<(), StoreError> {
        let request = self
            .request(Method::DELETE, "_search/scroll")?
            .json(&json!({ "scroll_id": [cursor] }));
        let _: Value = self.send(request).await?;
        Ok(())
    }
}

impl std::fmt::Display for ElasticsearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
