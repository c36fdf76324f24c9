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

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sfdc_logs::client::{Client, Session, DEFAULT_API_VERSION};
use sfdc_logs::purge::{select_ids_query, DEFAULT_OBJECT_TYPE};
use sfdc_logs::query::Record;

/// Print the id of every record logs-delete would remove
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(default_value = DEFAULT_OBJECT_TYPE)]
    object_type: String,

    #[arg(long, default_value = DEFAULT_API_VERSION)]
    api_version: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let session = Arc::new(Session::from_env()?);
    eprintln!("Listing {} on {}", args.object_type, session.instance_url);

    let c = Client::new(session, &args.api_version);

    let mut count = 0;
    for r in c.query_all::<Record>(&select_ids_query(&args.object_type)) {
        println!("{}", r?.id);
        count += 1;
    }

    eprintln!("{} records", count);

    Ok(())
}
