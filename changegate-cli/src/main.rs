//! changegate CLI - run and operate the approval gate service.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use changegate_executor::observability::{TracingConfig, TracingGuard, init_tracing};

/// changegate - suspend pipeline executions until a change is approved.
#[derive(Parser)]
#[command(name = "changegate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gate: callback API plus timeout processor
    Serve {
        /// Path to the YAML configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Host to bind to (overrides the configuration)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on (overrides the configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the YAML configuration file
        #[arg(short, long)]
        config: String,
    },

    /// List pending waits on a running server
    Waits {
        /// Server base URL
        #[arg(short, long, default_value = "http://localhost:8080")]
        server: String,
    },

    /// Deliver a decision for a token, as the change-control system would
    Deliver {
        /// Correlation token
        token: String,

        /// Decision (approved, rejected, canceled, comm_failure, pending)
        #[arg(short, long)]
        result: String,

        /// Optional comments
        #[arg(short, long)]
        comments: Option<String>,

        /// Server base URL
        #[arg(short, long, default_value = "http://localhost:8080")]
        server: String,
    },

    /// Cancel an execution's pending waits
    Cancel {
        /// Execution ID
        execution_id: String,

        /// Server base URL
        #[arg(short, long, default_value = "http://localhost:8080")]
        server: String,
    },

    /// Show version information
    Version,
}

fn setup_logging(verbosity: u8) -> Result<TracingGuard> {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Format and location come from CHANGEGATE_LOG_*; -v only sets the level
    let env_config = TracingConfig::from_env();
    let log_filter = std::env::var("CHANGEGATE_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| filter.to_string());

    let config = TracingConfig::builder()
        .log_format(env_config.log_format())
        .log_filter(log_filter)
        .include_location(env_config.include_location())
        .include_thread_ids(env_config.include_thread_ids())
        .build();

    init_tracing(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing_guard = setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Serve { config, host, port } => {
            commands::serve::run(config.as_deref(), host, port).await
        }
        Commands::Validate { config } => commands::validate::run(&config),
        Commands::Waits { server } => commands::waits::list(&server).await,
        Commands::Deliver {
            token,
            result,
            comments,
            server,
        } => commands::waits::deliver(&server, &token, &result, comments.as_deref()).await,
        Commands::Cancel {
            execution_id,
            server,
        } => commands::waits::cancel(&server, &execution_id).await,
        Commands::Version => commands::version::run(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_deliver() {
        let cli = Cli::parse_from([
            "changegate",
            "-vv",
            "deliver",
            "T1_deploy_abc",
            "--result",
            "approved",
            "-c",
            "CAB ok",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Deliver {
                token,
                result,
                comments,
                server,
            } => {
                assert_eq!(token, "T1_deploy_abc");
                assert_eq!(result, "approved");
                assert_eq!(comments.as_deref(), Some("CAB ok"));
                assert_eq!(server, "http://localhost:8080");
            }
            _ => panic!("expected deliver"),
        }
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from(["changegate", "serve", "-H", "127.0.0.1", "-p", "9000"]);
        match cli.command {
            Commands::Serve { config, host, port } => {
                assert!(config.is_none());
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_validate() {
        let cli = Cli::parse_from(["changegate", "validate", "--config", "gate.yaml"]);
        assert!(matches!(cli.command, Commands::Validate { config } if config == "gate.yaml"));
    }
}
