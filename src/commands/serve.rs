use anyhow::{Context, Result};

use ez_redirect::config::Config;
use ez_redirect::server::AppServer;

use super::open_service;

/// Run the HTTP server and scheduler until Ctrl+C
pub async fn serve(config: Config) -> Result<()> {
    let service = open_service(&config)?;
    let server = AppServer::new(config, service).context("Failed to create redirect server")?;

    println!("{}", server.info().display());
    println!();
    println!("NFC tags should point at http://<host>:<port>/redirect");
    println!("Press Ctrl+C to stop");
    println!();

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    println!("Redirect server stopped.");
    Ok(())
}
