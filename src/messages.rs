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

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// User-facing strings of the delete command. Templates use `{count}`,
/// `{object}` and `{file}` placeholders.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Messages {
    pub command_description: String,
    pub examples: String,
    pub name_flag_description: String,
    pub force_flag_description: String,
    pub error_no_logs: String,
    pub deleted: String,
    pub spinner: String,
    pub force_and_file: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            command_description: "delete all debug logs in the target org".to_string(),
            examples: [
                "$ logs-delete",
                "$ logs-delete --json",
                "$ logs-delete --object-type ApexLog --chunk-size 100",
            ]
            .join("\n"),
            name_flag_description: "name to print".to_string(),
            force_flag_description: "example boolean flag".to_string(),
            error_no_logs: "No logs found in the org.".to_string(),
            deleted: "Deleted {count} {object} records.".to_string(),
            spinner: "Deleting Logs".to_string(),
            force_and_file: "You input --force and a file: {file}".to_string(),
        }
    }
}

impl Messages {
    /// Loads overrides from a JSON object; keys left out keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_json(&text)?)
    }

    /// Finds `--messages PATH` or `--messages=PATH` in a raw argv, so the
    /// overrides can shape help text before the command line is parsed.
    pub fn path_from_args(args: &[OsString]) -> Option<PathBuf> {
        let mut iter = args.iter().skip(1);

        while let Some(arg) = iter.next() {
            let arg = arg.to_string_lossy();
            if arg == "--" {
                return None;
            }
            if arg == "--messages" {
                return iter.next().map(PathBuf::from);
            }
            if let Some(path) = arg.strip_prefix("--messages=") {
                return Some(PathBuf::from(path));
            }
        }

        None
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn examples(&self) -> Vec<&str> {
        self.examples.lines().collect()
    }

    pub fn deleted(&self, count: usize, object_type: &str) -> String {
        self.deleted
            .replace("{count}", &count.to_string())
            .replace("{object}", object_type)
    }

    pub fn force_and_file(&self, file: &str) -> String {
        self.force_and_file.replace("{file}", file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deleted_line() {
        let m = Messages::default();
        assert_eq!(m.deleted(250, "ApexLog"), "Deleted 250 ApexLog records.");
    }

    #[test]
    fn test_partial_override() {
        let m = Messages::from_json(r#"{"deleted": "Deleted {count} apex logs.", "errorNoLogs": "nothing to do"}"#)
            .unwrap();

        assert_eq!(m.deleted(3, "ApexLog"), "Deleted 3 apex logs.");
        assert_eq!(m.error_no_logs, "nothing to do");
        assert_eq!(m.spinner, Messages::default().spinner);
    }

    #[test]
    fn test_examples_split_per_line() {
        let m = Messages::default();
        assert_eq!(m.examples().len(), 3);
        assert_eq!(m.examples()[0], "$ logs-delete");
    }

    fn argv(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_path_from_args() {
        assert_eq!(
            Messages::path_from_args(&argv(&["logs-delete", "--json", "--messages", "m.json"])),
            Some(PathBuf::from("m.json"))
        );
        assert_eq!(
            Messages::path_from_args(&argv(&["logs-delete", "--messages=m.json", "log.txt"])),
            Some(PathBuf::from("m.json"))
        );
        assert_eq!(Messages::path_from_args(&argv(&["logs-delete", "--messages"])), None);
        assert_eq!(Messages::path_from_args(&argv(&["logs-delete", "--", "--messages", "x"])), None);
        assert_eq!(Messages::path_from_args(&argv(&["--messages", "x"])), None);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Messages::from_json_file("/nonexistent/messages.json").is_err());
    }

    #[test]
    fn test_force_and_file() {
        let m = Messages::default();
        assert_eq!(m.force_and_file("a.txt"), "You input --force and a file: a.txt");
    }
}
