//! autocut-relay
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!                 │                 AUTOCUT RELAY                │
//!  Print client   │  ┌──────────┐   ┌─────────┐   ┌──────────┐   │   Printer
//!  ──────────────────▶│ listener │──▶│ session │──▶│ payload  │──────────▶ :9100
//!                 │  └──────────┘   │  loop   │   │ rewrite  │   │
//!  ◀──────────────────────────────────│         │◀──────────────────────────
//!                 │                 └─────────┘                  │
//!                 │  lifecycle: SIGINT/SIGTERM → drain → exit 0  │
//!                 └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use autocut_relay::config::{load_config, validate_config, ConfigError, RelayConfig};
use autocut_relay::error::Result as RelayResult;
use autocut_relay::lifecycle::startup;
use autocut_relay::observability;

#[derive(Parser)]
#[command(name = "autocut-relay")]
#[command(about = "TCP relay that forces a full paper cut on every print job", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Printer host, overrides `upstream.host`.
    #[arg(long)]
    printer_host: Option<String>,

    /// Printer port, overrides `upstream.port`.
    #[arg(long)]
    printer_port: Option<u16>,

    /// Local bind address, overrides `listener.bind_address`.
    #[arg(long)]
    listen_address: Option<String>,

    /// Local port, overrides `listener.port`.
    #[arg(long)]
    listen_port: Option<u16>,
}

impl Cli {
    fn load(&self) -> RelayResult<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => RelayConfig::default(),
        };

        if let Some(host) = &self.printer_host {
            config.upstream.host = host.clone();
        }
        if let Some(port) = self.printer_port {
            config.upstream.port = port;
        }
        if let Some(address) = &self.listen_address {
            config.listener.bind_address = address.clone();
        }
        if let Some(port) = self.listen_port {
            config.listener.port = port;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    observability::logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %format!("{}:{}", config.listener.bind_address, config.listener.port),
        printer = %format!("{}:{}", config.upstream.host, config.upstream.port),
        max_descriptor_size = config.limits.max_descriptor_size,
        max_image_chunk = config.limits.max_image_chunk,
        "autocut-relay starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = observability::metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    startup::run(config).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocut_relay::RelayError;

    #[test]
    fn overrides_apply_to_defaults() {
        let cli = Cli::parse_from([
            "autocut-relay",
            "--printer-host",
            "printer.lan",
            "--printer-port",
            "9101",
            "--listen-port",
            "19100",
        ]);
        let config = cli.load().unwrap();
        assert_eq!(config.upstream.host, "printer.lan");
        assert_eq!(config.upstream.port, 9101);
        assert_eq!(config.listener.port, 19100);
        assert_eq!(config.listener.bind_address, "127.0.0.1");
    }

    #[test]
    fn invalid_override_is_a_config_error() {
        let cli = Cli::parse_from(["autocut-relay", "--printer-port", "0"]);
        let err = cli.load().unwrap_err();
        assert!(matches!(err, RelayError::Config(ConfigError::Validation(_))));
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let cli = Cli::parse_from(["autocut-relay", "--config", "/nonexistent/relay.toml"]);
        assert!(matches!(cli.load(), Err(RelayError::Config(ConfigError::Io(_)))));
    }
}
