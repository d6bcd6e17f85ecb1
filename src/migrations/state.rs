//! Applied-migration state, kept in an index of the target store.
//!
//! One document per (environment, version). Reads go through the scroll
//! API and are exposed as a lazy stream so the number of records is not
//! bounded by a single search page.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use futures_util::{Stream, TryStreamExt, stream};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::MigrationRecord;
use crate::error::{MigrateError, StoreError};
use crate::store::DocumentStore;

/// Mapping of the state index: exact-match `version` and `env`, no norms.
pub fn state_index_body() -> Value {
    json!({
        "mappings": {
            "properties": {
                "when":    { "type": "date" },
                "version": { "type": "long" },
                "env":     { "type": "keyword", "norms": false }
            }
        }
    })
}

/// Reads and writes migration records.
pub struct StateStore<'a, S> {
    store: &'a S,
    index: String,
    page_size: usize,
}

impl<'a, S: DocumentStore> StateStore<'a, S> {
    pub fn new(store: &'a S, index: impl Into<String>, page_size: usize) -> Self {
        Self {
            store,
            index: index.into(),
            page_size: page_size.max(1),
        }
    }

    /// Create the state index if it does not exist yet.
    pub async fn ensure_initialized(&self) -> Result<(), MigrateError> {
        let exists = self
            .store
            .index_exists(&self.index)
            .await
            .map_err(MigrateError::StateInit)?;
        if exists {
            return Ok(());
        }

        info!(index = %self.index, "creating migration state index");
        match self.store.create_index(&self.index, &state_index_body()).await {
            Ok(()) => Ok(()),
            // Created by someone else between the check and the create.
            Err(e) if is_already_exists(&e) => {
                debug!(index = %self.index, "state index already exists");
                Ok(())
            }
            Err(e) => Err(MigrateError::StateInit(e)),
        }
    }

    /// Persist one record. Fails if the same (env, version) is already recorded.
    pub async fn record_applied(&self, record: &MigrationRecord) -> Result<(), StoreError> {
        let doc = serde_json::to_value(record).map_err(|e| StoreError::Decode(e.to_string()))?;
        self.store
            .create_document(&self.index, &record.document_id(), &doc)
            .await
    }

    /// Lazily stream the records of one environment, page by page.
    ///
    /// A missing state index yields nothing. Any failure ends the stream
    /// with that error.
    pub fn applied_records(
        &self,
        environment: &str,
    ) -> impl Stream<Item = Result<MigrationRecord, MigrateError>> {
        let cursor = Cursor {
            store: self.store,
            index: self.index.clone(),
            query: json!({ "term": { "env": environment } }),
            page_size: self.page_size,
            phase: Phase::Start,
            buffer: VecDeque::new(),
        };
        stream::try_unfold(cursor, next_record)
    }

    /// Drain [`applied_records`](Self::applied_records) into version -> applied-at.
    ///
    /// If a version was recorded more than once the earliest time wins.
    pub async fn load_applied(
        &self,
        environment: &str,
    ) -> Result<HashMap<i64, DateTime<Utc>>, MigrateError> {
        let mut applied: HashMap<i64, DateTime<Utc>> = HashMap::new();
        let mut records = std::pin::pin!(self.applied_records(environment));

        while let Some(record) = records.try_next().await? {
            applied
                .entry(record.version)
                .and_modify(|when| *when = (*when).min(record.when))
                .or_insert(record.when);
        }

        debug!(env = environment, applied = applied.len(), "loaded migration state");
        Ok(applied)
    }
}

enum Phase {
    Start,
    Scrolling(String),
    Done,
}

struct Cursor<'a, S> {
    store: &'a S,
    index: String,
    query: Value,
    page_size: usize,
    phase: Phase,
    buffer: VecDeque<MigrationRecord>,
}

async fn next_record<'a, S: DocumentStore>(
    mut cursor: Cursor<'a, S>,
) -> Result<Option<(MigrationRecord, Cursor<'a, S>)>, MigrateError> {
    loop {
        if let Some(record) = cursor.buffer.pop_front() {
            return Ok(Some((record, cursor)));
        }

        let page = match std::mem::replace(&mut cursor.phase, Phase::Done) {
            Phase::Done => return Ok(None),
            Phase::Start => {
                let exists = cursor
                    .store
                    .index_exists(&cursor.index)
                    .await
                    .map_err(MigrateError::StateRead)?;
                if !exists {
                    return Ok(None);
                }
                cursor
                    .store
                    .scroll(&cursor.index, &cursor.query, cursor.page_size)
                    .await
                    .map_err(MigrateError::StateRead)?
            }
            Phase::Scrolling(id) => cursor
                .store
                .scroll_next(&id)
                .await
                .map_err(MigrateError::StateRead)?,
        };

        if page.hits.is_empty() {
            if let Some(id) = page.scroll_id {
                if let Err(e) = cursor.store.clear_scroll(&id).await {
                    warn!(error = %e, "failed to clear scroll");
                }
            }
            return Ok(None);
        }

        for hit in page.hits {
            let record: MigrationRecord = serde_json::from_value(hit).map_err(|e| {
                MigrateError::StateRead(StoreError::Decode(format!("invalid migration record: {}", e)))
            })?;
            cursor.buffer.push_back(record);
        }

        if let Some(id) = page.scroll_id {
            cursor.phase = Phase::Scrolling(id);
        }
    }
}

fn is_already_exists(e: &StoreError) -> bool {
    match e {
        StoreError::Status { status: 400, body } => {
            body.contains("resource_already_exists_exception")
        }
        _ => false,
    }
}
