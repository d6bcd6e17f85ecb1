//! Document store collaborator.
//!
//! The engine only needs a handful of operations from the store:
//! index existence/creation, a generic request, create-only document
//! writes and a scroll cursor. [`DocumentStore`] is that contract;
//! [`http::EsClient`] is the Elasticsearch implementation.

pub mod http;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::error::StoreResult;

pub use http::EsClient;

/// HTTP verb of a migration operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(format!(
                "unsupported method \"{}\", expected one of GET, POST, PUT, DELETE",
                s
            )),
        }
    }
}

impl TryFrom<String> for Method {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Successful response to a generic request.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreResponse {
    pub status: u16,
    /// Parsed JSON body, `Null` when the body was empty.
    pub body: Value,
}

/// One page of a scroll.
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    /// Cursor for the next page; `None` once the store closed the scroll.
    pub scroll_id: Option<String>,
    /// `_source` of each hit on this page.
    pub hits: Vec<Value>,
}

/// Operations the migration engine needs from the target store.
///
/// Calls are awaited one at a time; implementations need not be `Sync`.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// Whether the named index exists.
    async fn index_exists(&self, index: &str) -> StoreResult<bool>;

    /// Create an index with the given settings/mappings body.
    async fn create_index(&self, index: &str, body: &Value) -> StoreResult<()>;

    /// Send an arbitrary request. Non-success statuses are errors.
    async fn perform_request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&str>,
    ) -> StoreResult<StoreResponse>;

    /// Write a document that must not exist yet (create-only).
    async fn create_document(&self, index: &str, id: &str, doc: &Value) -> StoreResult<()>;

    /// Open a scroll over documents matching `query`.
    async fn scroll(&self, index: &str, query: &Value, page_size: usize) -> StoreResult<ScrollPage>;

    /// Fetch the next page of an open scroll.
    async fn scroll_next(&self, scroll_id: &str) -> StoreResult<ScrollPage>;

    /// Release a scroll context.
    async fn clear_scroll(&self, scroll_id: &str) -> StoreResult<()>;
}
