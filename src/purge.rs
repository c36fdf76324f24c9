// Copyright 2024 The sfdc-logs Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Batched deletion of every record of one object type.
//!
//! The ids returned by a single query are split into chunks of at most
//! [`MAX_CHUNK_SIZE`], and each chunk is deleted with one call, strictly
//! in order. Per-record outcomes are folded into a [`RunSummary`].

use serde::Serialize;
use thiserror::Error as ThisError;
use tracing::{info, warn};

use crate::client::{self, Client};
use crate::query::Record;
use crate::sobjects::{BatchResponse, SaveResult, MAX_IDS_PER_REQUEST};

pub const MAX_CHUNK_SIZE: usize = MAX_IDS_PER_REQUEST;
pub const DEFAULT_OBJECT_TYPE: &str = "ApexLog";

/// Source of the ids to delete.
pub trait RecordQuery {
    fn query_ids(&self, soql: &str) -> Result<Vec<String>, client::Error>;
}

/// Sink for one chunk of deletes.
pub trait RecordDelete {
    fn delete_batch(&self, object_type: &str, ids: &[String]) -> Result<BatchResponse, client::Error>;
}

impl RecordQuery for Client {
    fn query_ids(&self, soql: &str) -> Result<Vec<String>, client::Error> {
        self.query_all::<Record>(soql).map(|r| r.map(|r| r.id)).collect()
    }
}

impl RecordDelete for Client {
    fn delete_batch(&self, object_type: &str, ids: &[String]) -> Result<BatchResponse, client::Error> {
        self.delete_records(object_type, ids)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub id: String,
    pub succeeded: bool,
    pub error_detail: Option<String>,
}

/// A chunk whose response did not account for every id it carried.
/// Chunks are numbered from 1.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnaccountedRecordsWarning {
    pub chunk: usize,
    pub count: usize,
    pub reason: String,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_requested: usize,
    pub total_succeeded: usize,
    pub failures: Vec<DeleteOutcome>,
    pub unaccounted: Vec<String>,
    pub warnings: Vec<UnaccountedRecordsWarning>,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.unaccounted.is_empty()
    }
}

#[derive(ThisError, Debug)]
pub enum PurgeError {
    #[error("no {object_type} records found")]
    NoRecords { object_type: String },

    #[error("chunk size {size} is outside 1..=200")]
    InvalidChunkSize { size: usize },

    #[error("query failed: {source}")]
    Query {
        #[source]
        source: client::Error,
    },

    #[error("delete of chunk {chunk} of {total_chunks} failed: {source}")]
    DeleteBatch {
        chunk: usize,
        total_chunks: usize,
        summary: RunSummary,
        #[source]
        source: client::Error,
    },
}

impl PurgeError {
    /// What was accomplished before the run aborted, if anything was attempted.
    pub fn partial_summary(&self) -> Option<&RunSummary> {
        match self {
            PurgeError::DeleteBatch { summary, .. } => Some(summary),
            _ => None,
        }
    }
}

/// Splits `ids` into consecutive chunks of at most `chunk_size`, keeping order.
///
/// # Panics
///
/// Panics if `chunk_size` is 0.
pub fn partition(ids: &[String], chunk_size: usize) -> Vec<&[String]> {
    ids.chunks(chunk_size).collect()
}

pub fn select_ids_query(object_type: &str) -> String {
    format!("SELECT Id FROM {}", object_type)
}

pub struct Purger<'a, Q, D> {
    query: &'a Q,
    delete: &'a D,
    chunk_size: usize,
}

impl<'a, Q: RecordQuery, D: RecordDelete> Purger<'a, Q, D> {
    pub fn new(query: &'a Q, delete: &'a D) -> Self {
        Self {
            query,
            delete,
            chunk_size: MAX_CHUNK_SIZE,
        }
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn run(&self, object_type: &str) -> Result<RunSummary, PurgeError> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(PurgeError::InvalidChunkSize {
                size: self.chunk_size,
            });
        }

        let ids = self
            .query
            .query_ids(&select_ids_query(object_type))
            .map_err(|source| PurgeError::Query { source })?;

        if ids.is_empty() {
            return Err(PurgeError::NoRecords {
                object_type: object_type.to_string(),
            });
        }

        let chunks = partition(&ids, self.chunk_size);
        let total_chunks = chunks.len();
        info!(object_type, records = ids.len(), chunks = total_chunks, "starting delete");

        let mut summary = RunSummary::default();

        for (i, chunk) in chunks.into_iter().enumerate() {
            let chunk_no = i + 1;
            info!(chunk = chunk_no, total_chunks, size = chunk.len(), "deleting chunk");

            let response = match self.delete.delete_batch(object_type, chunk) {
                Ok(r) => r,
                Err(source) => {
                    return Err(PurgeError::DeleteBatch {
                        chunk: chunk_no,
                        total_chunks,
                        summary,
                        source,
                    })
                }
            };

            tally(&mut summary, chunk_no, chunk, response);
        }

        info!(
            requested = summary.total_requested,
            succeeded = summary.total_succeeded,
            failed = summary.failures.len(),
            unaccounted = summary.unaccounted.len(),
            "delete finished"
        );

        Ok(summary)
    }
}

/// Folds one chunk's response into `summary`.
///
/// Outcomes are matched to the chunk by id, never by position. An outcome
/// without an id takes the first id still unmatched once every named
/// outcome has been placed; ids left over are unaccounted.
pub fn tally(summary: &mut RunSummary, chunk_no: usize, chunk: &[String], response: BatchResponse) {
    summary.total_requested += chunk.len();

    let results = match response {
        BatchResponse::WellFormed(v) => v,
        BatchResponse::Malformed(raw) => {
            let mut reason = format!("malformed response: {}", raw);
            if reason.len() > 200 {
                let mut end = 200;
                while !reason.is_char_boundary(end) {
                    end -= 1;
                }
                reason.truncate(end);
            }
            mark_unaccounted(summary, chunk_no, chunk.iter().collect(), reason);
            return;
        }
    };

    let mut pending: Vec<&String> = chunk.iter().collect();
    let (named, anonymous): (Vec<SaveResult>, Vec<SaveResult>) =
        results.into_iter().partition(|r| r.id.is_some());

    for result in named {
        let id = result.id.clone().unwrap_or_default();
        match pending.iter().position(|p| **p == id) {
            Some(pos) => {
                pending.remove(pos);
                record(summary, id, &result);
            }
            None => warn!(chunk = chunk_no, id = %id, "ignoring outcome for an id not in this chunk"),
        }
    }

    for result in anonymous {
        if pending.is_empty() {
            warn!(chunk = chunk_no, "ignoring outcome without an id");
            continue;
        }
        let id = pending.remove(0).clone();
        record(summary, id, &result);
    }

    if !pending.is_empty() {
        let reason = format!("response omitted {} of {} records", pending.len(), chunk.len());
        mark_unaccounted(summary, chunk_no, pending, reason);
    }
}

fn record(summary: &mut RunSummary, id: String, result: &SaveResult) {
    if result.success {
        summary.total_succeeded += 1;
    } else {
        summary.failures.push(DeleteOutcome {
            id,
            succeeded: false,
            error_detail: result.error_detail(),
        });
    }
}

fn mark_unaccounted(summary: &mut RunSummary, chunk_no: usize, ids: Vec<&String>, reason: String) {
    warn!(chunk = chunk_no, count = ids.len(), reason = %reason, "unaccounted records");

    summary.warnings.push(UnaccountedRecordsWarning {
        chunk: chunk_no,
        count: ids.len(),
        reason,
    });
    summary.unaccounted.extend(ids.into_iter().cloned());
}
