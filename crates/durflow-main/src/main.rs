// Copyright 2025 DataStax Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

mod cli;
mod error;

use clap::Parser as _;

use cli::Cli;
use error::{MainError, Result};

fn init_tracing() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| error_stack::report!(MainError::TracingInit))
}

async fn run(cli: Cli) -> Result<()> {
    init_tracing()?;
    cli.execute().await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let omit_stack_trace = cli.omit_stack_trace;

    if let Err(e) = run(cli).await {
        #[allow(clippy::print_stderr)]
        if !omit_stack_trace {
            eprintln!("{e:?}");
        } else {
            eprintln!("{e}");
        }
        std::process::exit(1);
    }
}
