//! datahub-publish - command line front end for the telemetry publisher
//!
//! - Publish a single reading (by device id or numeric sensor id)
//! - Check the data hub health endpoint
//! - Inspect / initialise the config file

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use datahub_publisher::{derive_device_id, PublisherConfig, TelemetryPublisher};

#[derive(Parser, Debug)]
#[command(
    name = "datahub-publish",
    version,
    about = "Send telemetry readings to the smart home data hub"
)]
struct Cli {
    /// Config file (defaults to the OS config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data hub base URL, overrides config and DATA_HUB_URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish one reading
    Publish {
        #[arg(long, conflicts_with = "sensor_id", required_unless_present = "sensor_id")]
        device_id: Option<String>,
        #[arg(long)]
        sensor_id: Option<u64>,
        #[arg(long)]
        metric: String,
        #[arg(long, allow_negative_numbers = true)]
        value: f64,
        #[arg(long)]
        unit: String,
        /// RFC3339 timestamp, defaults to now
        #[arg(long, value_parser = parse_rfc3339)]
        recorded_at: Option<DateTime<Utc>>,
    },
    /// Check that the data hub answers on /health
    Health,
    /// Print the device id derived from a sensor id
    DeviceId { sensor_id: u64 },
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to the config file
    Init {
        #[arg(long)]
        force: bool,
    },
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC3339 timestamp {:?}: {}", raw, e))
}

impl Cli {
    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => PublisherConfig::config_file_path(),
        }
    }

    /// File, then environment, then command line flags
    async fn effective_config(&self) -> Result<PublisherConfig> {
        dotenvy::dotenv().ok();
        let path = self.config_path()?;
        let mut config = PublisherConfig::load_from(&path)
            .await?
            .apply_overrides(|key| std::env::var(key).ok())?;

        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("datahub_publisher=info,datahub_publish=info")
        }))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Publish {
            device_id,
            sensor_id,
            metric,
            value,
            unit,
            recorded_at,
        } => {
            let config = cli.effective_config().await?;
            let publisher = TelemetryPublisher::try_from_config(config)?;
            if !publisher.is_enabled() {
                warn!("No data hub endpoint configured, telemetry disabled - nothing sent");
            }

            let device_id = match (device_id, sensor_id) {
                (Some(device_id), _) => device_id.clone(),
                (None, Some(sensor_id)) => derive_device_id(*sensor_id)?,
                (None, None) => anyhow::bail!("either --device-id or --sensor-id is required"),
            };

            publisher
                .publish(&device_id, metric, *value, unit, *recorded_at)
                .await
                .context("Failed to publish telemetry")?;

            if publisher.is_enabled() {
                info!("Published {}={} {} for {}", metric, value, unit, device_id);
            }
        }
        Commands::Health => {
            let config = cli.effective_config().await?;
            let publisher = TelemetryPublisher::try_from_config(config)?;
            match publisher.endpoint() {
                Some(endpoint) => {
                    publisher
                        .health()
                        .await
                        .with_context(|| format!("Data hub at {} is not healthy", endpoint))?;
                    println!("ok {}", endpoint);
                }
                None => println!("disabled (no endpoint configured)"),
            }
        }
        Commands::DeviceId { sensor_id } => {
            println!("{}", derive_device_id(*sensor_id)?);
        }
        Commands::Config { action } => match action {
            ConfigCommand::Path => {
                println!("{}", cli.config_path()?.display());
            }
            ConfigCommand::Show => {
                let config = cli.effective_config().await?;
                print!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigCommand::Init { force } => {
                let path = cli.config_path()?;
                if path.exists() && !force {
                    anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
                }
                let config = cli.effective_config().await?;
                config.save_to(&path).await?;
                info!("Wrote config to {}", path.display());
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_publish_by_sensor() {
        let cli = Cli::try_parse_from([
            "datahub-publish",
            "--endpoint",
            "http://hub:8000",
            "publish",
            "--sensor-id",
            "2",
            "--metric",
            "temperature",
            "--value",
            "-3.5",
            "--unit",
            "C",
            "--recorded-at",
            "2025-01-02T03:04:05Z",
        ])
        .unwrap();

        assert_eq!(cli.endpoint.as_deref(), Some("http://hub:8000"));
        match cli.command {
            Commands::Publish {
                sensor_id,
                value,
                recorded_at,
                device_id,
                ..
            } => {
                assert_eq!(sensor_id, Some(2));
                assert_eq!(device_id, None);
                assert_eq!(value, -3.5);
                assert_eq!(
                    recorded_at,
                    Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap())
                );
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_publish_requires_a_device() {
        let result = Cli::try_parse_from([
            "datahub-publish",
            "publish",
            "--metric",
            "temperature",
            "--value",
            "20",
            "--unit",
            "C",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_bad_timestamp() {
        assert!(parse_rfc3339("yesterday").is_err());
        assert!(parse_rfc3339("2025-01-02T03:04:05+02:00").is_ok());
    }
}
