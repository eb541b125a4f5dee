//! `mcp-logctl`: operate the proxy's log channels from the command line.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use mcp_proxy_logging::config::load_config;
use mcp_proxy_logging::lifecycle::signals::wait_for_ctrl_c;
use mcp_proxy_logging::observability;
use mcp_proxy_logging::{ChannelRegistry, Level, SubdomainValidator};

#[derive(Parser)]
#[command(name = "mcp-logctl")]
#[command(about = "Manage per-server log channels for the MCP proxy", long_about = None)]
struct Cli {
    /// Serve Prometheus metrics on this address while the command runs.
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the server a Host header routes to
    CheckHost {
        host: String,
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
    /// Write one line to a server's log
    Write {
        /// Server identifier, optionally with a session suffix (memory-abc123)
        id: String,
        #[arg(short, long, default_value = "INFO")]
        level: String,
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Copy stdin into a server's log until EOF or Ctrl-C
    Pipe {
        id: String,
        #[arg(short, long, default_value = "INFO")]
        level: String,
    },
    /// Run one retention sweep for a server's log now
    Prune { id: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    observability::logging::init("mcp_proxy_logging=info");

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr {
        observability::metrics::init_metrics(addr);
    }

    match cli.command {
        Commands::CheckHost { host, config } => {
            let config = load_config(&config)?;
            let validator = SubdomainValidator::from_config(&config);
            match validator.validate(&host) {
                Some(server) => {
                    println!("{}", server);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("{} does not match {{server}}{}", host, validator.suffix());
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Write { id, level, message } => {
            let registry = ChannelRegistry::from_env()?;
            let channel = registry.resolve(&id)?;
            channel.log(Level::parse(&level), message.join(" "));
            registry.shutdown().await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Pipe { id, level } => {
            let registry = ChannelRegistry::from_env()?;
            let channel = registry.resolve(&id)?;
            let level = Level::parse(&level);
            if let Some(system) = registry.system() {
                system.info(format_args!("Piping stdin into {}", channel.path().display()));
            }

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let interrupted = wait_for_ctrl_c();
            tokio::pin!(interrupted);

            loop {
                tokio::select! {
                    _ = &mut interrupted => break,
                    line = lines.next_line() => match line? {
                        Some(line) => channel.log(level, line),
                        None => break,
                    },
                }
            }

            registry.shutdown().await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Prune { id } => {
            let registry = ChannelRegistry::from_env()?;
            let channel = registry.resolve(&id)?;
            let removed = channel.prune_now();
            println!("removed {} file(s) older than {}", removed, channel.retention());
            registry.shutdown().await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
