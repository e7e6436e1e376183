use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use robogate::assets::DirAssets;
use robogate::cli::Cli;
use robogate::config;
use robogate::logging::{init_logging, LogConfig, LogFormat};
use robogate::server::ApiServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut cfg = config::load_config(cli.config.as_deref())?;
    cli.apply(&mut cfg);

    let format = match cfg.log_format.as_deref() {
        Some(f) => f.parse::<LogFormat>()?,
        None => LogFormat::default(),
    };
    init_logging(LogConfig {
        format,
        ..Default::default()
    })?;

    let fleet = cfg.build_fleet();
    let mut server = ApiServer::with_config(fleet, cfg.api_config());
    if let Some(dir) = &cfg.assets_dir {
        server.set_assets(Arc::new(DirAssets::new(dir)));
    }
    if let Some((user, pass)) = cfg.credentials() {
        server.set_basic_auth(user, pass);
    } else if cfg.credentials_incomplete() {
        tracing::warn!("username and password must both be non-empty; Basic-Auth is disabled");
    }
    if cfg.debug {
        server.set_debug();
    }

    let running = server.start();
    let shutdown = running.shutdown_handle();
    let listener = running.join();
    tokio::pin!(listener);

    tokio::select! {
        result = &mut listener => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("shutting down");
            shutdown.graceful_shutdown(Some(Duration::from_secs(5)));
            listener.await?;
        }
    }
    Ok(())
}
