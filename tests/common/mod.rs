//! In-memory document store and migration-file helpers for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use esmigrate::error::{StoreError, StoreResult};
use esmigrate::store::{DocumentStore, Method, ScrollPage, StoreResponse};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<String>,
}

#[derive(Default)]
struct Inner {
    indices: BTreeMap<String, Vec<(String, Value)>>,
    requests: Vec<Request>,
    failing_endpoints: HashSet<String>,
    fail_records: bool,
    fail_reads: bool,
    fail_scroll_next: bool,
    fail_create_index: bool,
    scrolls: HashMap<String, (VecDeque<Value>, usize)>,
    next_scroll: usize,
    scroll_pages: usize,
    cleared: Vec<String>,
}

/// Store double that keeps indices in memory and logs generic requests.
#[derive(Default)]
pub struct FakeStore {
    inner: Mutex<Inner>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `perform_request` reject this endpoint.
    pub fn fail_endpoint(&self, endpoint: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_endpoints
            .insert(endpoint.to_string());
    }

    /// Make `create_document` fail while set.
    pub fn set_fail_records(&self, fail: bool) {
        self.inner.lock().unwrap().fail_records = fail;
    }

    /// Make index existence checks fail while set.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.lock().unwrap().fail_reads = fail;
    }

    /// Make every follow-up scroll page fail while set.
    pub fn set_fail_scroll_next(&self, fail: bool) {
        self.inner.lock().unwrap().fail_scroll_next = fail;
    }

    /// Make index creation fail with a mapping error while set.
    pub fn set_fail_create_index(&self, fail: bool) {
        self.inner.lock().unwrap().fail_create_index = fail;
    }

    pub fn requests(&self) -> Vec<Request> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.endpoint).collect()
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.inner.lock().unwrap().indices.contains_key(index)
    }

    /// Documents of an index, in insertion order.
    pub fn documents(&self, index: &str) -> Vec<Value> {
        self.inner
            .lock()
            .unwrap()
            .indices
            .get(index)
            .map(|docs| docs.iter().map(|(_, d)| d.clone()).collect())
            .unwrap_or_default()
    }

    /// Insert a document directly, creating the index if needed.
    pub fn seed(&self, index: &str, id: &str, doc: Value) {
        self.inner
            .lock()
            .unwrap()
            .indices
            .entry(index.to_string())
            .or_default()
            .push((id.to_string(), doc));
    }

    /// Number of scroll pages served (first page included).
    pub fn scroll_pages(&self) -> usize {
        self.inner.lock().unwrap().scroll_pages
    }

    pub fn cleared_scrolls(&self) -> Vec<String> {
        self.inner.lock().unwrap().cleared.clone()
    }
}

fn matches_query(doc: &Value, query: &Value) -> bool {
    match query.get("term").and_then(Value::as_object) {
        Some(term) => term.iter().all(|(field, value)| doc.get(field) == Some(value)),
        None => true,
    }
}

impl DocumentStore for FakeStore {
    async fn index_exists(&self, index: &str) -> StoreResult<bool> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            return Err(StoreError::Status {
                status: 503,
                body: "cluster unavailable".into(),
            });
        }
        Ok(inner.indices.contains_key(index))
    }

    async fn create_index(&self, index: &str, _body: &Value) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_create_index {
            return Err(StoreError::Status {
                status: 400,
                body: json!({"error": {"type": "mapper_parsing_exception"}}).to_string(),
            });
        }
        if inner.indices.contains_key(index) {
            return Err(StoreError::Status {
                status: 400,
                body: json!({"error": {"type": "resource_already_exists_exception"}}).to_string(),
            });
        }
        inner.indices.insert(index.to_string(), Vec::new());
        Ok(())
    }

    async fn perform_request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&str>,
    ) -> StoreResult<StoreResponse> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(Request {
            method,
            endpoint: endpoint.to_string(),
            body: body.map(str::to_string),
        });
        if inner.failing_endpoints.contains(endpoint) {
            return Err(StoreError::Status {
                status: 400,
                body: "rejected".into(),
            });
        }
        Ok(StoreResponse {
            status: 200,
            body: json!({ "acknowledged": true }),
        })
    }

    async fn create_document(&self, index: &str, id: &str, doc: &Value) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_records {
            return Err(StoreError::Status {
                status: 503,
                body: "write rejected".into(),
            });
        }
        let docs = inner.indices.entry(index.to_string()).or_default();
        if docs.iter().any(|(existing, _)| existing == id) {
            return Err(StoreError::Status {
                status: 409,
                body: "version_conflict_engine_exception".into(),
            });
        }
        docs.push((id.to_string(), doc.clone()));
        Ok(())
    }

    async fn scroll(&self, index: &str, query: &Value, page_size: usize) -> StoreResult<ScrollPage> {
        let mut inner = self.inner.lock().unwrap();
        let mut matching: VecDeque<Value> = inner
            .indices
            .get(index)
            .map(|docs| {
                docs.iter()
                    .map(|(_, d)| d.clone())
                    .filter(|d| matches_query(d, query))
                    .collect()
            })
            .unwrap_or_default();

        let first: Vec<Value> = (0..page_size).filter_map(|_| matching.pop_front()).collect();
        inner.next_scroll += 1;
        inner.scroll_pages += 1;
        let id = format!("scroll-{}", inner.next_scroll);
        inner.scrolls.insert(id.clone(), (matching, page_size));

        Ok(ScrollPage {
            scroll_id: Some(id),
            hits: first,
        })
    }

    async fn scroll_next(&self, scroll_id: &str) -> StoreResult<ScrollPage> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_scroll_next {
            return Err(StoreError::Status {
                status: 404,
                body: "search_context_missing_exception".into(),
            });
        }
        inner.scroll_pages += 1;
        let (remaining, page_size) = inner.scrolls.get_mut(scroll_id).ok_or(StoreError::Status {
            status: 404,
            body: "search_context_missing_exception".into(),
        })?;
        let page_size = *page_size;
        let hits: Vec<Value> = (0..page_size).filter_map(|_| remaining.pop_front()).collect();
        Ok(ScrollPage {
            scroll_id: Some(scroll_id.to_string()),
            hits,
        })
    }

    async fn clear_scroll(&self, scroll_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.scrolls.remove(scroll_id);
        inner.cleared.push(scroll_id.to_string());
        Ok(())
    }
}

/// Write a migration that PUTs to `/<env>/<name>`.
pub fn write_migration(dir: &Path, version: i64, name: &str) -> PathBuf {
    let path = dir.join(format!("{}_{}.json", version, name));
    let body = format!(
        r#"{{
  "up": {{
    "endpoint": "/{{{{.Env}}}}/{}",
    "method": "PUT",
    "payload": {{"version": {}}}
  }}
}}
"#,
        name, version
    );
    fs::write(&path, body).unwrap();
    path
}

/// Write a migration whose template does not parse.
pub fn write_broken_migration(dir: &Path, version: i64, name: &str) -> PathBuf {
    let path = dir.join(format!("{}_{}.json", version, name));
    fs::write(&path, r#"{"up": {"endpoint": "/{{.Env", "method": "PUT"}}"#).unwrap();
    path
}
