use std::process::ExitCode;

use clap::Parser;
use metrics_agent::cli::{execute, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    execute(Cli::parse()).await
}
