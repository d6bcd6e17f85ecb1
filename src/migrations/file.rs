//! Migration file format.
//!
//! ```json
//! {
//!   "up": {
//!     "endpoint": "/{{.Env}}_catalog/_settings",
//!     "method": "PUT",
//!     "payload": { "index": { "number_of_replicas": 1 } }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::value::RawValue;

use super::template::Template;
use crate::error::RenderError;
use crate::store::Method;

/// Parsed (rendered) migration file.
#[derive(Debug, Deserialize)]
pub struct MigrationFile {
    pub up: Operation,
}

/// The request a migration performs.
#[derive(Debug, Deserialize)]
pub struct Operation {
    pub endpoint: String,
    pub method: Method,
    /// Request body, forwarded verbatim.
    #[serde(default)]
    pub payload: Option<Box<RawValue>>,
}

impl Operation {
    /// Body to send, if any.
    pub fn body(&self) -> Option<&str> {
        self.payload.as_deref().map(RawValue::get)
    }
}

/// Read, render and parse a migration file, returning its `up` operation.
pub fn render_migration(
    path: &Path,
    vars: &BTreeMap<String, String>,
) -> Result<Operation, RenderError> {
    let src = fs::read_to_string(path).map_err(|source| RenderError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    render_source(path, &src, vars)
}

/// Render migration text already in memory. `path` is used for errors only.
pub fn render_source(
    path: &Path,
    src: &str,
    vars: &BTreeMap<String, String>,
) -> Result<Operation, RenderError> {
    let template_err = |source| RenderError::Template {
        path: path.to_path_buf(),
        source,
    };

    let rendered = Template::parse(src)
        .map_err(template_err)?
        .render(vars)
        .map_err(template_err)?;

    let file: MigrationFile = serde_json::from_str(&rendered).map_err(|source| RenderError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(file.up)
}
