//! Index pass-through commands

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::indices::IndexRequest;
use crate::store::{DocumentStore, EsClient};

/// Send the request and pretty-print the JSON response.
pub async fn run_index_request(config: &Config, request: IndexRequest) -> Result<()> {
    let client = EsClient::connect(&config.store)
        .await
        .context("Failed to create store client")?;

    let (method, endpoint) = request.to_request();
    let response = client
        .perform_request(method, &endpoint, None)
        .await
        .with_context(|| format!("{} {} failed", method, endpoint))?;

    debug!(status = response.status, %endpoint, "index request done");
    match &response.body {
        // Plain-text answers (`_cat` style) are printed as they came.
        Value::String(text) => print!("{}", text),
        body => println!("{}", serde_json::to_string_pretty(body)?),
    }
    Ok(())
}
