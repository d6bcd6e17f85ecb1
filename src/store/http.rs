//! Elasticsearch client over the REST API.
//!
//! Thin reqwest wrapper: every call is one HTTP request, JSON in and
//! out. When sniffing is enabled the client asks the cluster for its
//! HTTP nodes once at connect time and spreads requests over them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{DocumentStore, Method, ScrollPage, StoreResponse};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// REST client for an Elasticsearch cluster.
///
/// # Example
/// ```ignore
/// use esmigrate::config::StoreConfig;
/// use esmigrate::store::EsClient;
///
/// let client = EsClient::connect(&StoreConfig::default()).await?;
/// let exists = client.index_exists(".es-migrate").await?;
/// ```
pub struct EsClient {
    http: Client,
    /// Base URLs, without trailing slash.
    nodes: Vec<String>,
    next: AtomicUsize,
    keep_alive: String,
}

impl EsClient {
    /// Build a client for the configured cluster, sniffing nodes if asked to.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let base = Url::parse(&config.url)
            .map_err(|e| StoreError::InvalidUrl(format!("{}: {}", config.url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(StoreError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                config.url
            )));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let mut client = Self {
            http,
            nodes: vec![config.url.trim_end_matches('/').to_string()],
            next: AtomicUsize::new(0),
            keep_alive: config.scroll_keep_alive.clone(),
        };

        if config.sniff {
            let response = client
                .send(reqwest::Method::GET, "_nodes/http", None)
                .await?;
            let sniffed = sniffed_nodes(&response.body, base.scheme());
            if sniffed.is_empty() {
                warn!(url = %config.url, "sniffing found no HTTP nodes, using configured url");
            } else {
                info!(nodes = sniffed.len(), "sniffed cluster nodes");
                client.nodes = sniffed;
            }
        }

        Ok(client)
    }

    fn url(&self, endpoint: &str) -> String {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.nodes.len();
        join_url(&self.nodes[i], endpoint)
    }

    async fn send(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        body: Option<String>,
    ) -> StoreResult<StoreResponse> {
        let url = self.url(endpoint);
        debug!(%method, %url, "store request");

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(StoreResponse {
            status: status.as_u16(),
            body: response_body(text),
        })
    }
}

impl DocumentStore for EsClient {
    async fn index_exists(&self, index: &str) -> StoreResult<bool> {
        let url = self.url(index);
        debug!(%url, "index exists");
        let response = self.http.head(&url).send().await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(StoreError::Status {
                status: status.as_u16(),
                body: String::new(),
            }),
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> StoreResult<()> {
        self.send(reqwest::Method::PUT, index, Some(body.to_string()))
            .await?;
        Ok(())
    }

    async fn perform_request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&str>,
    ) -> StoreResult<StoreResponse> {
        self.send(method.into(), endpoint, body.map(str::to_string))
            .await
    }

    async fn create_document(&self, index: &str, id: &str, doc: &Value) -> StoreResult<()> {
        let endpoint = format!("{}/_create/{}?refresh=wait_for", index, id);
        self.send(reqwest::Method::PUT, &endpoint, Some(doc.to_string()))
            .await?;
        Ok(())
    }

    async fn scroll(&self, index: &str, query: &Value, page_size: usize) -> StoreResult<ScrollPage> {
        let endpoint = format!("{}/_search?scroll={}", index, self.keep_alive);
        let body = json!({
            "size": page_size,
            "query": query,
            "sort": ["_doc"],
        });
        let response = self
            .send(reqwest::Method::POST, &endpoint, Some(body.to_string()))
            .await?;
        parse_scroll_page(&response.body)
    }

    async fn scroll_next(&self, scroll_id: &str) -> StoreResult<ScrollPage> {
        let body = json!({ "scroll": self.keep_alive, "scroll_id": scroll_id });
        let response = self
            .send(reqwest::Method::POST, "_search/scroll", Some(body.to_string()))
            .await?;
        parse_scroll_page(&response.body)
    }

    async fn clear_scroll(&self, scroll_id: &str) -> StoreResult<()> {
        let body = json!({ "scroll_id": scroll_id });
        self.send(reqwest::Method::DELETE, "_search/scroll", Some(body.to_string()))
            .await?;
        Ok(())
    }
}

/// Body of a successful response. The request already took effect, so a
/// body that is not JSON (`_cat` APIs, plugins) is kept as a string.
fn response_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

/// Join a base URL and an endpoint with exactly one slash.
fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Extract `<scheme>://<publish_address>` for every node in a `_nodes/http` response.
fn sniffed_nodes(body: &Value, scheme: &str) -> Vec<String> {
    let Some(nodes) = body.get("nodes").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut urls: Vec<String> = nodes
        .values()
        .filter_map(|node| node.pointer("/http/publish_address")?.as_str())
        // "hostname/10.0.0.1:9200" -> "10.0.0.1:9200"
        .filter_map(|addr| addr.rsplit('/').next())
        .filter(|addr| !addr.is_empty())
        .map(|addr| format!("{}://{}", scheme, addr))
        .collect();
    urls.sort();
    urls.dedup();
    urls
}

fn parse_scroll_page(body: &Value) -> StoreResult<ScrollPage> {
    let hits = body
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::Decode("scroll response has no hits.hits array".into()))?;

    let hits = hits
        .iter()
        .map(|hit| {
            hit.get("_source")
                .cloned()
                .ok_or_else(|| StoreError::Decode("hit without _source".into()))
        })
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(ScrollPage {
        scroll_id: body
            .get("_scroll_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        hits,
    })
}
