mod commands;
mod terminal_output;

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use pantry_config::PantryConfig;
use pantry_logging::{init_logger, LoggerOptions};
use pantry_pipeline::{PipelineOptions, ReceiptPipeline};

#[derive(Parser)]
#[command(name = "pantry")]
#[command(about = "Pantry: receipt scanning and meal suggestions")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $PANTRY_CONFIG or ./pantry.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one receipt image through OCR and parsing
    Scan {
        /// Path to the receipt image
        image: PathBuf,
        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },
    /// Suggest meals from a list of ingredients
    Suggest {
        #[arg(required = true)]
        ingredients: Vec<String>,
    },
    /// Print the effective configuration with secrets masked
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(pantry_config::config_file_path);

    match cli.command {
        Commands::Serve { port } => {
            let (config, pipeline) = startup(&config_path, false).await?;
            let port = port.unwrap_or(config.server.port);
            let addr = bind_addr(&config.server.bind_address, port)?;
            info!(
                addr = %addr,
                ocr = pipeline.extractor_name(),
                llm = pipeline.completer_name(),
                "Starting Pantry gateway"
            );
            let state = pantry_gateway::GatewayState::new(pipeline, &config.server);
            pantry_gateway::start_server(addr, state, config.server.cors_permissive).await?;
        }
        Commands::Scan { image, pretty } => {
            let (_, pipeline) = startup(&config_path, true).await?;
            commands::scan::run(&pipeline, &image, pretty).await?;
        }
        Commands::Suggest { ingredients } => {
            let (_, pipeline) = startup(&config_path, true).await?;
            commands::suggest::run(&pipeline, &ingredients).await?;
        }
        Commands::Config => commands::config::run(&config_path).await?,
    }

    Ok(())
}

/// Accepts IPv4 and IPv6 literals, e.g. `0.0.0.0` or `::`.
fn bind_addr(bind_address: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = bind_address
        .trim()
        .parse()
        .with_context(|| format!("Invalid bind address {bind_address}"))?;
    Ok(SocketAddr::new(ip, port))
}

/// Load the config, install logging, validate, and wire the pipeline.
///
/// Validation findings are logged only once the subscriber is installed.
/// One-shot commands log to stderr so their stdout stays machine-readable.
async fn startup(path: &Path, log_to_stderr: bool) -> Result<(PantryConfig, Arc<ReceiptPipeline>)> {
    let (config, report) = pantry_config::load_with_report(path)
        .await
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    init_logger(LoggerOptions {
        level: &config.logging.level,
        json: config.logging.json,
        log_dir: config.logging.dir.as_deref(),
        stderr: log_to_stderr,
    });
    info!(path = %path.display(), from_file = path.exists(), "Configuration loaded");
    pantry_config::log_report(&report);
    pantry_config::ensure_valid(&report)?;

    let extractor = pantry_providers::build_extractor(&config.ocr)?;
    let completer = pantry_providers::build_completer(&config.llm)?;
    let pipeline = Arc::new(ReceiptPipeline::new(
        extractor,
        completer,
        PipelineOptions::from_config(&config),
    ));
    Ok((config, pipeline))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_config(name: &str, yaml: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("pantry-{}-{name}.yaml", std::process::id()));
        tokio::fs::write(&path, yaml).await.unwrap();
        path
    }

    #[test]
    fn bind_addr_accepts_ipv4_and_ipv6() {
        assert_eq!(bind_addr("0.0.0.0", 8000).unwrap().to_string(), "0.0.0.0:8000");
        assert_eq!(bind_addr("::", 8000).unwrap().to_string(), "[::]:8000");
        assert_eq!(bind_addr("::1", 9000).unwrap().port(), 9000);
        assert!(bind_addr("localhost:80", 8000).is_err());
    }

    #[tokio::test]
    async fn startup_wires_mock_providers() {
        let path = write_config(
            "mock",
            "ocr:\n  provider: mock\nllm:\n  provider: mock\n",
        )
        .await;

        let (config, pipeline) = startup(&path, true).await.unwrap();
        assert_eq!(pipeline.extractor_name(), "mock");
        assert_eq!(pipeline.completer_name(), "mock");
        assert!(config.pipeline.max_in_flight >= 1);
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn startup_rejects_invalid_config_after_logging() {
        let path = write_config(
            "invalid",
            "ocr:\n  provider: mock\nllm:\n  provider: mock\npipeline:\n  maxInFlight: 0\n",
        )
        .await;

        let err = startup(&path, true).await.err().expect("startup should fail").to_string();
        assert!(err.contains("invalid configuration"), "{err}");
        let _ = tokio::fs::remove_file(&path).await;
    }
}
