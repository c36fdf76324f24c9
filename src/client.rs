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

use std::sync::Arc;

use thiserror::Error as ThisError;
use tracing::debug;

pub const DEFAULT_API_VERSION: &str = "59.0";

pub const INSTANCE_URL_VAR: &str = "SF_INSTANCE_URL";
pub const ACCESS_TOKEN_VAR: &str = "SF_ACCESS_TOKEN";

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed: code='{status}' body='{body}'")]
    Status { status: u16, body: String },

    #[error("unable to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{count} ids exceeds the limit of {max} per delete request")]
    TooManyIds { count: usize, max: usize },

    #[error("missing session setting: {0} is not set")]
    MissingSession(&'static str),

    #[error("query returned no rows: {0}")]
    EmptyResult(String),
}

/// An already-issued API session. Obtaining or refreshing the token is
/// left to whatever produced it.
#[derive(Clone)]
pub struct Session {
    pub instance_url: String,
    pub access_token: String,
}

impl Session {
    pub fn new(instance_url: &str, access_token: &str) -> Self {
        Self {
            instance_url: instance_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    pub fn from_env() -> Result<Self, Error> {
        let url = std::env::var(INSTANCE_URL_VAR).map_err(|_| Error::MissingSession(INSTANCE_URL_VAR))?;
        let token = std::env::var(ACCESS_TOKEN_VAR).map_err(|_| Error::MissingSession(ACCESS_TOKEN_VAR))?;

        Ok(Self::new(&url, &token))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

pub struct Client {
    pub(crate) session: Arc<Session>,
    pub(crate) api_version: String,
    pub(crate) client: reqwest::blocking::Client,
}

impl Client {
    pub fn new(session: Arc<Session>, api_version: &str) -> Self {
        Self {
            session,
            api_version: api_version.trim_start_matches('v').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Base of the versioned data API, e.g. `https://na1.my.salesforce.com/services/data/v59.0`.
    pub fn data_url(&self) -> String {
        format!("{}/services/data/v{}", self.session.instance_url, self.api_version)
    }

    /// Resolves a server-relative path such as a `nextRecordsUrl`.
    pub(crate) fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.session.instance_url, path)
    }

    pub(crate) fn get_text(&self, url: &str) -> Result<String, Error> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("Authorization", self.bearer())
            .header("Accept", "application/json")
            .send()?;

        Ok(check_response(response)?.text()?)
    }

    pub(crate) fn delete_text(&self, url: &str) -> Result<String, Error> {
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(url)
            .header("Authorization", self.bearer())
            .header("Accept", "application/json")
            .send()?;

        Ok(check_response(response)?.text()?)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.session.access_token)
    }
}

pub(crate) fn check_response(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, Error> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        return Err(Error::Status { status, body });
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url() {
        let session = Arc::new(Session::new("https://example.my.salesforce.com/", "tok"));
        let c = Client::new(session, "v58.0");

        assert_eq!(
            c.data_url(),
            "https://example.my.salesforce.com/services/data/v58.0"
        );
        assert_eq!(
            c.absolute_url("/services/data/v58.0/query/01g-2000"),
            "https://example.my.salesforce.com/services/data/v58.0/query/01g-2000"
        );
    }

    #[test]
    fn test_session_debug_hides_token() {
        let session = Session::new("https://example.my.salesforce.com", "00Dxx!secret");
        let out = format!("{:?}", session);

        assert!(out.contains("example.my.salesforce.com"));
        assert!(!out.contains("secret"));
    }

    #[test]
    fn test_status_error_message() {
        let e = Error::Status {
            status: 401,
            body: "[{\"errorCode\":\"INVALID_SESSION_ID\"}]".to_string(),
        };

        assert_eq!(
            e.to_string(),
            "request failed: code='401' body='[{\"errorCode\":\"INVALID_SESSION_ID\"}]'"
        );
    }
}
