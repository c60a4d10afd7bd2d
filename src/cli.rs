use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{error, info};
use tokio_util::sync::CancellationToken;

use crate::agent::Agent;
use crate::client::MetricsClient;
use crate::config::{resolve_config_path, AgentConfig};
use crate::error::{AgentError, QueryError, Result};
use crate::logging;
use crate::query::{QueryParams, QueryResult};
use crate::render::render_snapshots;

#[derive(Debug, Parser)]
#[command(name = "metrics-agent")]
#[command(about = "Collects host metrics and serves the snapshot history", long_about = None)]
pub struct Cli {
    /// Path to the JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the agent: periodic collection plus the HTTP endpoint
    Run,

    /// Retrieve stored snapshots from a running agent
    Metrics(MetricsArgs),

    /// Sample every enabled collector once and print the result
    Collect {
        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Manage the config file
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print the agent version
    Version,
}

#[derive(Debug, Args)]
pub struct MetricsArgs {
    /// Number of latest snapshots to retrieve
    #[arg(long)]
    pub limit: Option<String>,

    /// Unix timestamp start for the snapshot query (exclusive)
    #[arg(long)]
    pub from: Option<String>,

    /// Unix timestamp end for the snapshot query (exclusive)
    #[arg(long)]
    pub to: Option<String>,

    /// Print the raw JSON response
    #[arg(long)]
    pub json: bool,

    /// Agent base URL, defaults to the configured server address
    #[arg(long)]
    pub endpoint: Option<String>,
}

impl MetricsArgs {
    pub fn params(&self) -> QueryParams {
        QueryParams {
            from: self.from.clone(),
            to: self.to.clone(),
            limit: self.limit.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a default config file with a fresh API key
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

/// Process exit status for a failed command: 2 for a rejected request,
/// 1 for everything else.
pub fn exit_status(err: &AgentError) -> u8 {
    match err {
        AgentError::Query(query) if query.is_validation() => 2,
        _ => 1,
    }
}

pub async fn execute(cli: Cli) -> ExitCode {
    let result = match resolve_config_path(cli.config.as_deref()) {
        Ok(path) => dispatch(cli.command, path).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match &err {
                AgentError::Query(QueryError::NoDataAvailable) => {
                    eprintln!("no snapshots collected yet")
                }
                other => eprintln!("error: {}", other),
            }
            ExitCode::from(exit_status(&err))
        }
    }
}

async fn dispatch(command: Command, config_path: PathBuf) -> Result<()> {
    match command {
        Command::Version => {
            println!("metrics-agent {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Config(ConfigCommand::Init { force }) => {
            AgentConfig::init(&config_path, force)?;
            println!("wrote {}", config_path.display());
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let config = AgentConfig::load(&config_path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Run => {
            let config = AgentConfig::load(&config_path)?;
            logging::init(&config.effective_log_level());
            run_agent(config).await
        }
        Command::Collect { compact } => {
            let config = AgentConfig::load(&config_path)?;
            logging::init(&config.effective_log_level());
            let mut agent = Agent::new(config)?;
            let metrics = agent.collect_once().await?;
            let output = if compact {
                serde_json::to_string(&metrics)?
            } else {
                serde_json::to_string_pretty(&metrics)?
            };
            println!("{}", output);
            Ok(())
        }
        Command::Metrics(args) => {
            let config = AgentConfig::load(&config_path)?;
            let client = match &args.endpoint {
                Some(endpoint) => MetricsClient::new(endpoint)?,
                None => MetricsClient::for_address(&config.server_address)?,
            };
            let result = client.fetch(&args.params()).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render_result(result));
            }
            Ok(())
        }
    }
}

fn render_result(result: QueryResult) -> String {
    render_snapshots(&result.into_snapshots())
}

async fn run_agent(config: AgentConfig) -> Result<()> {
    let agent = Agent::new(config)?;
    let cancel = CancellationToken::new();

    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received interrupt, shutting down"),
            Err(e) => error!("failed to listen for interrupt, {}", e),
        }
        signal_token.cancel();
    });

    agent.run(cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_flags_map_to_params() {
        let cli = Cli::try_parse_from([
            "metrics-agent",
            "metrics",
            "--from",
            "100",
            "--to",
            "300",
            "--limit",
            "2",
        ])
        .unwrap();
        match cli.command {
            Command::Metrics(args) => {
                let params = args.params();
                assert_eq!(params.from.as_deref(), Some("100"));
                assert_eq!(params.to.as_deref(), Some("300"));
                assert_eq!(params.limit.as_deref(), Some("2"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["metrics-agent", "run", "--config", "/tmp/a.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/a.json")));
    }

    #[test]
    fn validation_errors_exit_with_two() {
        let err = AgentError::Query(QueryError::InvalidLimit("0".to_string()));
        assert_eq!(exit_status(&err), 2);

        let err = AgentError::Query(QueryError::NoDataAvailable);
        assert_eq!(exit_status(&err), 1);
    }

    #[tokio::test]
    async fn invalid_range_fails_before_any_request() {
        let args = MetricsArgs {
            limit: None,
            from: Some("soon".to_string()),
            to: Some("later".to_string()),
            json: false,
            // nothing listens here; parsing must fail first
            endpoint: Some("http://127.0.0.1:1".to_string()),
        };
        let client = MetricsClient::new(args.endpoint.as_deref().unwrap()).unwrap();
        let err = client.fetch(&args.params()).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Query(QueryError::InvalidTime { .. })
        ));
    }
}
