//! Index-level pass-through requests (`count`, `flush`, `refresh`, ...).

use crate::store::Method;

/// A read or maintenance request on one index, or on all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRequest {
    Count(String),
    Flush(Option<String>),
    Refresh(Option<String>),
    Settings(Option<String>),
    Stats(Option<String>),
    Mapping(String),
}

impl IndexRequest {
    /// Verb and endpoint for this request.
    pub fn to_request(&self) -> (Method, String) {
        match self {
            IndexRequest::Count(index) => (Method::Get, scoped(Some(index), "_count")),
            IndexRequest::Flush(index) => (Method::Post, scoped(index.as_ref(), "_flush")),
            IndexRequest::Refresh(index) => (Method::Post, scoped(index.as_ref(), "_refresh")),
            IndexRequest::Settings(index) => (Method::Get, scoped(index.as_ref(), "_settings")),
            IndexRequest::Stats(index) => (Method::Get, scoped(index.as_ref(), "_stats")),
            IndexRequest::Mapping(index) => (Method::Get, scoped(Some(index), "_mapping")),
        }
    }
}

fn scoped(index: Option<&String>, api: &str) -> String {
    match index.map(|i| i.trim_matches('/')).filter(|i| !i.is_empty()) {
        Some(index) => format!("/{}/{}", index, api),
        None => format!("/{}", api),
    }
}
