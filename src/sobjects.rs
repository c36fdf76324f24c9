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

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use urlencoding::encode;

use crate::client::{Client, Error};

/// The composite sobjects endpoint accepts at most this many ids per call.
pub const MAX_IDS_PER_REQUEST: usize = 200;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub status_code: String,
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SaveResult {
    #[serde(default)]
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

impl SaveResult {
    /// Flattens `errors` into one line, `None` when there are none.
    pub fn error_detail(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }

        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.status_code, e.message))
            .collect();

        Some(parts.join("; "))
    }
}

/// Body of a batch delete call. Anything that is not a list of save
/// results (a lone error object, a list of error objects, ...) is kept
/// verbatim as `Malformed`, as is a body that is not JSON at all.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum BatchResponse {
    WellFormed(Vec<SaveResult>),
    Malformed(Value),
}

impl BatchResponse {
    pub fn parse(text: &str) -> Self {
        if text.trim().is_empty() {
            return BatchResponse::Malformed(Value::Null);
        }

        match serde_json::from_str(text) {
            Ok(r) => r,
            Err(e) => {
                debug!("delete response is not json: {}", e);
                BatchResponse::Malformed(Value::String(text.to_string()))
            }
        }
    }
}

impl Client {
    /// Deletes up to `MAX_IDS_PER_REQUEST` records in one round trip with
    /// `allOrNone=false`, so each id succeeds or fails on its own.
    pub fn delete_records(&self, object_type: &str, ids: &[String]) -> Result<BatchResponse, Error> {
        if ids.len() > MAX_IDS_PER_REQUEST {
            return Err(Error::TooManyIds {
                count: ids.len(),
                max: MAX_IDS_PER_REQUEST,
            });
        }

        debug!(object_type, count = ids.len(), "deleting records");

        let text = self.delete_text(&self.delete_url(ids))?;
        Ok(BatchResponse::parse(&text))
    }

    pub fn delete_url(&self, ids: &[String]) -> String {
        let joined: Vec<String> = ids.iter().map(|id| encode(id).into_owned()).collect();

        format!(
            "{}/composite/sobjects?ids={}&allOrNone=false",
            self.data_url(),
            joined.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Session;
    use std::sync::Arc;

    #[test]
    fn test_well_formed_response() {
        let body = r#"[
            {"id": "07L1", "success": true, "errors": []},
            {"id": "07L2", "success": false, "errors": [
                {"statusCode": "ENTITY_IS_DELETED", "message": "entity is deleted", "fields": []}
            ]}
        ]"#;

        let res = BatchResponse::parse(body);
        let results = match res {
            BatchResponse::WellFormed(v) => v,
            other => panic!("unexpected {:?}", other),
        };

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert_eq!(results[0].error_detail(), None);
        assert_eq!(
            results[1].error_detail(),
            Some("ENTITY_IS_DELETED: entity is deleted".to_string())
        );
    }

    #[test]
    fn test_single_error_object_is_malformed() {
        let body = r#"{"message": "Session expired or invalid", "errorCode": "INVALID_SESSION_ID"}"#;

        assert!(matches!(
            BatchResponse::parse(body),
            BatchResponse::Malformed(Value::Object(_))
        ));
    }

    #[test]
    fn test_error_list_is_malformed() {
        let body = r#"[{"message": "Too many ids", "errorCode": "INVALID_QUERY_FILTER_OPERATOR"}]"#;

        assert!(matches!(
            BatchResponse::parse(body),
            BatchResponse::Malformed(Value::Array(_))
        ));
    }

    #[test]
    fn test_empty_body_is_malformed() {
        assert_eq!(
            BatchResponse::parse("  "),
            BatchResponse::Malformed(Value::Null)
        );
    }

    #[test]
    fn test_missing_id_is_accepted() {
        let body = r#"[{"success": false, "errors": [{"statusCode": "MALFORMED_ID", "message": "bad id"}]}]"#;

        match BatchResponse::parse(body) {
            BatchResponse::WellFormed(v) => {
                assert_eq!(v[0].id, None);
                assert_eq!(v[0].errors[0].fields, Vec::<String>::new());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_not_json_is_malformed() {
        assert_eq!(
            BatchResponse::parse("<html>Service Unavailable</html>"),
            BatchResponse::Malformed(Value::String("<html>Service Unavailable</html>".to_string()))
        );
    }

    fn test_client() -> Client {
        let session = Arc::new(Session::new("https://example.my.salesforce.com", "tok"));
        Client::new(session, "59.0")
    }

    #[test]
    fn test_delete_url() {
        let ids = vec!["07L1".to_string(), "07L 2".to_string(), "07L&3".to_string()];

        assert_eq!(
            test_client().delete_url(&ids),
            "https://example.my.salesforce.com/services/data/v59.0/composite/sobjects?ids=07L1,07L%202,07L%263&allOrNone=false"
        );
    }

    #[test]
    fn test_too_many_ids_rejected() {
        let ids: Vec<String> = (0..MAX_IDS_PER_REQUEST + 1).map(|i| format!("07L{:05}", i)).collect();

        match test_client().delete_records("ApexLog", &ids) {
            Err(Error::TooManyIds { count, max }) => {
                assert_eq!(count, 201);
                assert_eq!(max, 200);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
