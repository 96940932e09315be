//! Main application entry point for the omok server.
//!
//! Parses the command line, loads and validates the TOML configuration,
//! sets up logging, then runs the server until a termination signal arrives.

mod cli;
mod config;
mod logging;
mod signals;

use anyhow::Context;
use cli::CliArgs;
use config::AppConfig;
use omok_server::{GameServer, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long the accept loop gets to wind down after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// The configured server plus the settings it was built from.
pub struct Application {
    config: AppConfig,
    server: Arc<GameServer>,
}

impl Application {
    /// Loads configuration, applies CLI overrides, validates, and builds the
    /// server. Logging is initialised here, once the final level is known.
    pub async fn new(args: CliArgs) -> anyhow::Result<Self> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_overrides(&args);

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

        logging::setup_logging(&config.logging)?;

        let server_config: ServerConfig = config.to_server_config()?;
        let server = Arc::new(GameServer::new(server_config));

        info!(
            "🚀 Omok Server v{} | Config: {}",
            env!("CARGO_PKG_VERSION"),
            args.config_path.display()
        );
        Ok(Self { config, server })
    }

    /// Runs until a shutdown signal, or until the server stops on its own.
    pub async fn run(self) -> anyhow::Result<()> {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!(
            "  ⚫ Board: {}x{}",
            self.config.server.board_size, self.config.server.board_size
        );
        info!("  🕒 UTC offset: {} minutes", self.config.server.utc_offset_minutes);
        info!("  👥 Max connections: {}", self.config.server.max_connections);

        let listener = self.server.bind().context("Failed to bind listener")?;
        let mut server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move { server.serve(listener).await })
        };

        info!("✅ Omok Server is now running!");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        tokio::select! {
            result = signals::wait_for_shutdown_signal() => {
                result?;
                info!("🛑 Shutdown signal received, initiating graceful shutdown...");
            }
            result = &mut server_handle => {
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.into()),
                    Err(e) => Err(anyhow::anyhow!("Server task failed: {}", e)),
                };
            }
        }

        self.server.shutdown().await?;
        match tokio::time::timeout(SHUTDOWN_GRACE, server_handle).await {
            Ok(Ok(Ok(()))) => info!("✅ Omok Server shutdown complete"),
            Ok(Ok(Err(e))) => error!("❌ Server error during shutdown: {}", e),
            Ok(Err(e)) => error!("❌ Server task failed: {}", e),
            Err(_) => warn!("⏳ Server did not stop within {:?}", SHUTDOWN_GRACE),
        }
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let app = match Application::new(args).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("❌ Failed to start application: {:?}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run().await {
        error!("❌ Application error: {:?}", e);
        std::process::exit(1);
    }
    Ok(())
}
