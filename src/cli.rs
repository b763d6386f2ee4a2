use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{self, Config};
use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(name = "batteries-api")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve Kubernetes cluster status snapshots to the Batteries dashboard")]
#[command(long_about = "Polls the Kubernetes API for nodes, namespaces, pods and services, composes them into a dashboard snapshot and serves it over HTTP and a WebSocket push stream.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Kubeconfig to use when not running inside the cluster
    #[arg(long, global = true, value_name = "FILE")]
    pub kubeconfig: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP and WebSocket server (default)
    Serve {
        /// Address to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Seconds between WebSocket pushes
        #[arg(long, value_name = "SECS")]
        push_interval: Option<u64>,
    },

    /// Compose one snapshot against the cluster and print it as JSON
    Snapshot {
        /// Print compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
}

impl Commands {
    fn serve_defaults() -> Self {
        Commands::Serve {
            host: None,
            port: None,
            push_interval: None,
        }
    }
}

impl Cli {
    /// The subcommand to run; `serve` when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or_else(Commands::serve_defaults)
    }

    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        let level = if self.quiet {
            log::LevelFilter::Error
        } else {
            match self.verbose {
                0 => log::LevelFilter::Info,
                1 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            }
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }

    /// Defaults, then config file, then environment, then command-line flags.
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        let mut config = config::load_config(self.config.as_deref())?;
        config::apply_env(&mut config, |key| std::env::var(key).ok())?;
        self.apply_flags(&mut config);
        config::validate(&config)?;
        Ok(config)
    }

    fn apply_flags(&self, config: &mut Config) {
        if let Some(path) = &self.kubeconfig {
            config.cluster.kubeconfig = Some(path.clone());
        }

        if let Commands::Serve {
            host,
            port,
            push_interval,
        } = self.command()
        {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(secs) = push_interval {
                config.push.interval_secs = secs;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::parse_from(["batteries-api"]);
        assert_eq!(cli.command(), Commands::serve_defaults());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_serve_flags_override_config() {
        let cli = Cli::parse_from([
            "batteries-api",
            "serve",
            "--port",
            "9090",
            "--host",
            "127.0.0.1",
            "--push-interval",
            "2",
            "--kubeconfig",
            "/tmp/kc",
        ]);
        let mut config = Config::default();
        cli.apply_flags(&mut config);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.push.interval_secs, 2);
        assert_eq!(config.cluster.kubeconfig, Some(PathBuf::from("/tmp/kc")));
    }

    #[test]
    fn test_snapshot_subcommand() {
        let cli = Cli::parse_from(["batteries-api", "-vv", "snapshot", "--compact"]);
        assert_eq!(cli.command(), Commands::Snapshot { compact: true });
        assert_eq!(cli.verbose, 2);
    }
}
