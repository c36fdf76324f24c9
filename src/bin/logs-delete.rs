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
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches, Parser};
use tracing_subscriber::EnvFilter;

use sfdc_logs::client::{Client, Session, DEFAULT_API_VERSION};
use sfdc_logs::messages::Messages;
use sfdc_logs::output::{CommandResult, Failure, Success};
use sfdc_logs::purge::{PurgeError, Purger, RunSummary, DEFAULT_OBJECT_TYPE, MAX_CHUNK_SIZE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    file: Option<String>,

    #[arg(short, long)]
    name: Option<String>,

    #[arg(short, long)]
    force: bool,

    /// Print a machine readable JSON envelope on stdout
    #[arg(long)]
    json: bool,

    #[arg(long, default_value = DEFAULT_OBJECT_TYPE)]
    object_type: String,

    #[arg(long, default_value_t = MAX_CHUNK_SIZE)]
    chunk_size: usize,

    #[arg(long, default_value = DEFAULT_API_VERSION)]
    api_version: String,

    #[arg(long, env = "SF_INSTANCE_URL")]
    instance_url: String,

    #[arg(long, env = "SF_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    /// JSON file overriding the built-in messages, help text included
    #[arg(long)]
    messages: Option<PathBuf>,
}

fn parse_args(messages: &Messages, argv: Vec<OsString>) -> Args {
    let cmd = Args::command()
        .about(messages.command_description.clone())
        .after_help(format!("Examples:\n  {}", messages.examples().join("\n  ")))
        .mut_arg("name", |a| a.help(messages.name_flag_description.clone()))
        .mut_arg("force", |a| a.help(messages.force_flag_description.clone()));

    Args::from_arg_matches(&cmd.get_matches_from(argv)).unwrap_or_else(|e| e.exit())
}

fn print_summary_details(summary: &RunSummary) {
    for f in &summary.failures {
        eprintln!(
            "failed {}: {}",
            f.id,
            f.error_detail.as_deref().unwrap_or("no detail")
        );
    }

    for w in &summary.warnings {
        eprintln!(
            "warning: chunk {}: {} records unaccounted ({})",
            w.chunk, w.count, w.reason
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<OsString> = std::env::args_os().collect();
    let loaded = Messages::path_from_args(&argv).map(Messages::from_json_file);

    let help = match &loaded {
        Some(Ok(m)) => m.clone(),
        _ => Messages::default(),
    };
    let args = parse_args(&help, argv);

    let messages = match loaded {
        None => Messages::default(),
        Some(Ok(m)) => m,
        Some(Err(e)) if args.json => {
            println!("{}", serde_json::to_string_pretty(&Failure::other(e.as_ref()))?);
            std::process::exit(1);
        }
        Some(Err(e)) => return Err(e),
    };

    let session = Arc::new(Session::new(&args.instance_url, &args.access_token));
    let c = Client::new(session, &args.api_version);

    let org_id = match c.org_id() {
        Ok(id) => id,
        Err(e) if args.json => {
            println!("{}", serde_json::to_string_pretty(&Failure::other(&e))?);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    if !args.json {
        match &args.name {
            Some(name) => eprintln!("{} ({})...", messages.spinner, name),
            None => eprintln!("{}...", messages.spinner),
        }
    }

    let result = Purger::new(&c, &c)
        .chunk_size(args.chunk_size)
        .run(&args.object_type);

    let summary = match result {
        Ok(s) => s,
        Err(e) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&Failure::from_purge_error(&e, &messages))?
                );
            } else {
                let message = match &e {
                    PurgeError::NoRecords { .. } => messages.error_no_logs.clone(),
                    _ => e.to_string(),
                };
                eprintln!("Error: {}", message);

                if let Some(partial) = e.partial_summary() {
                    eprintln!("{}", messages.deleted(partial.total_succeeded, &args.object_type));
                    print_summary_details(partial);
                }
            }
            std::process::exit(1);
        }
    };

    let output_string = messages.deleted(summary.total_succeeded, &args.object_type);

    if args.json {
        let res = CommandResult {
            org_id,
            output_string,
            summary,
        };
        println!("{}", serde_json::to_string_pretty(&Success::new(&res))?);
        return Ok(());
    }

    println!("{}", output_string);
    print_summary_details(&summary);

    if let (true, Some(file)) = (args.force, &args.file) {
        println!("{}", messages.force_and_file(file));
    }

    Ok(())
}
