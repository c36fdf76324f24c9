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

use std::collections::VecDeque;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::from_str;
use tracing::{debug, error};
use urlencoding::encode;

use crate::client::{Client, Error};

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<T> {
    pub total_size: u64,
    pub done: bool,
    #[serde(default)]
    pub next_records_url: Option<String>,
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Record {
    #[serde(rename = "Id")]
    pub id: String,
}

/// Fetches raw pages of a query. `Client` is the real source; the
/// indirection lets paging be driven without a server.
pub trait PageSource {
    fn first_page(&self, soql: &str) -> Result<String, Error>;
    fn next_page(&self, next_records_url: &str) -> Result<String, Error>;
}

impl PageSource for Client {
    fn first_page(&self, soql: &str) -> Result<String, Error> {
        let url = format!("{}/queryAll?q={}", self.data_url(), encode(soql));
        self.get_text(&url)
    }

    fn next_page(&self, next_records_url: &str) -> Result<String, Error> {
        self.get_text(&self.absolute_url(next_records_url))
    }
}

impl Client {
    /// Runs `soql` through the queryAll endpoint, which also returns
    /// deleted and archived rows, following `nextRecordsUrl` as needed.
    pub fn query_all<T: DeserializeOwned>(&self, soql: &str) -> RecordIterator<'_, Self, T> {
        RecordIterator::new(self, soql)
    }

    pub fn org_id(&self) -> Result<String, Error> {
        let soql = "SELECT Id FROM Organization";

        match self.query_all::<Record>(soql).next() {
            Some(r) => Ok(r?.id),
            None => Err(Error::EmptyResult(soql.to_string())),
        }
    }
}

pub struct RecordIterator<'a, P: PageSource, T> {
    source: &'a P,
    soql: String,
    next_records_url: Option<String>,
    results: VecDeque<T>,
    started: bool,
    complete: bool,
}

impl<'a, P: PageSource, T: DeserializeOwned> RecordIterator<'a, P, T> {
    pub fn new(source: &'a P, soql: &str) -> Self {
        Self {
            source,
            soql: soql.to_string(),
            next_records_url: None,
            results: VecDeque::new(),
            started: false,
            complete: false,
        }
    }

    fn fetch(&mut self) -> Result<(), Error> {
        let text = match (&self.next_records_url, self.started) {
            (None, false) => self.source.first_page(&self.soql)?,
            (Some(url), _) => self.source.next_page(url)?,
            (None, true) => {
                self.complete = true;
                return Ok(());
            }
        };
        self.started = true;

        let mut page: QueryResult<T> = from_str(&text)?;
        debug!(
            total_size = page.total_size,
            page_size = page.records.len(),
            done = page.done,
            "query page"
        );

        self.results.extend(page.records.drain(..));

        if page.done || page.next_records_url.is_none() {
            self.next_records_url = None;
            self.complete = true;
        } else {
            self.next_records_url = page.next_records_url;
        }

        Ok(())
    }
}

impl<P: PageSource, T: DeserializeOwned> Iterator for RecordIterator<'_, P, T> {
    type Item = Result<T, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.results.is_empty() {
            if self.complete {
                return None;
            }

            if let Err(e) = self.fetch() {
                error!("query failed: {}", e);
                self.complete = true;
                return Some(Err(e));
            }
        }

        self.results.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Pages {
        pages: Vec<&'static str>,
        requested: RefCell<Vec<String>>,
    }

    impl PageSource for Pages {
        fn first_page(&self, soql: &str) -> Result<String, Error> {
            self.requested.borrow_mut().push(soql.to_string());
            Ok(self.pages[0].to_string())
        }

        fn next_page(&self, url: &str) -> Result<String, Error> {
            let n = self.requested.borrow().len();
            self.requested.borrow_mut().push(url.to_string());
            match self.pages.get(n) {
                Some(p) => Ok(p.to_string()),
                None => Err(Error::Status {
                    status: 500,
                    body: "gone".to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_query_result_response() {
        let body = r#"{
            "totalSize": 2,
            "done": true,
            "records": [
                {"attributes": {"type": "ApexLog", "url": "/services/data/v59.0/sobjects/ApexLog/07L1"}, "Id": "07L1"},
                {"attributes": {"type": "ApexLog", "url": "/services/data/v59.0/sobjects/ApexLog/07L2"}, "Id": "07L2"}
            ]
        }"#;

        let res: QueryResult<Record> = from_str(body).unwrap();
        assert_eq!(res.total_size, 2);
        assert!(res.done);
        assert!(res.next_records_url.is_none());
        assert_eq!(
            res.records,
            vec![
                Record { id: "07L1".to_string() },
                Record { id: "07L2".to_string() }
            ]
        );
    }

    #[test]
    fn test_empty_query_result_has_no_records() {
        let res: QueryResult<Record> = from_str(r#"{"totalSize": 0, "done": true}"#).unwrap();
        assert!(res.records.is_empty());
    }

    #[test]
    fn test_iterator_follows_next_records_url() {
        let src = Pages {
            pages: vec![
                r#"{"totalSize": 3, "done": false, "nextRecordsUrl": "/services/data/v59.0/query/01gA-2", "records": [{"Id": "a"}, {"Id": "b"}]}"#,
                r#"{"totalSize": 3, "done": true, "records": [{"Id": "c"}]}"#,
            ],
            requested: RefCell::new(Vec::new()),
        };

        let ids: Vec<String> = RecordIterator::<_, Record>::new(&src, "SELECT Id FROM ApexLog")
            .map(|r| r.unwrap().id)
            .collect();

        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(
            *src.requested.borrow(),
            vec!["SELECT Id FROM ApexLog", "/services/data/v59.0/query/01gA-2"]
        );
    }

    #[test]
    fn test_iterator_surfaces_page_failure() {
        let src = Pages {
            pages: vec![
                r#"{"totalSize": 4, "done": false, "nextRecordsUrl": "/next", "records": [{"Id": "a"}]}"#,
            ],
            requested: RefCell::new(Vec::new()),
        };

        let items: Vec<Result<Record, Error>> =
            RecordIterator::new(&src, "SELECT Id FROM ApexLog").collect();

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(Error::Status { status: 500, .. })));
    }
}
