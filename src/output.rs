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

use serde::Serialize;

use crate::messages::Messages;
use crate::purge::{PurgeError, RunSummary};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub org_id: String,
    pub output_string: String,
    pub summary: RunSummary,
}

#[derive(Serialize, Debug)]
pub struct Success<'a> {
    pub status: u8,
    pub result: &'a CommandResult,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Failure<'a> {
    pub status: u8,
    pub name: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_summary: Option<&'a RunSummary>,
}

impl<'a> Success<'a> {
    pub fn new(result: &'a CommandResult) -> Self {
        Self { status: 0, result }
    }
}

impl<'a> Failure<'a> {
    pub fn from_purge_error(err: &'a PurgeError, messages: &Messages) -> Self {
        let (name, message) = match err {
            PurgeError::NoRecords { .. } => ("NoRecordsError", messages.error_no_logs.clone()),
            PurgeError::DeleteBatch { .. } => ("DeleteBatchError", err.to_string()),
            PurgeError::Query { .. } => ("QueryError", err.to_string()),
            PurgeError::InvalidChunkSize { .. } => ("InvalidChunkSizeError", err.to_string()),
        };

        Self {
            status: 1,
            name,
            message,
            partial_summary: err.partial_summary(),
        }
    }

    pub fn other(err: &dyn std::error::Error) -> Self {
        Self {
            status: 1,
            name: "Error",
            message: err.to_string(),
            partial_summary: None,
        }
    }
}
