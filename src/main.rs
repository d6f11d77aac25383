use anyhow::Result;
use reviews_gateway::{app::Application, config::Config, upstream::ItunesRssClient};
use std::sync::Arc;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting Reviews Gateway");

    let config = Config::load()?;
    let upstream = Arc::new(ItunesRssClient::new(&config.upstream)?);

    let mut app = Application::start(config, upstream).await?;
    let api_server = app.api_server();

    tokio::select! {
        result = api_server.run() => {
            if let Err(e) = result {
                tracing::error!("API server failed: {}", e);
                app.shutdown().await;
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    app.shutdown().await;
    Ok(())
}
