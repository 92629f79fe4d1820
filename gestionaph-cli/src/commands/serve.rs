use anyhow::Result;
use gestionaph_core::config::PortalConfig;
use gestionaph_core::http::PortalServer;
use gestionaph_core::logging::init_logging;
use std::path::Path;

pub async fn run(config_path: &Path, port: Option<u16>, host: Option<String>) -> Result<()> {
    let config = PortalConfig::load_from(config_path)?;
    init_logging(&config.logging.to_logging_config()?)?;

    let mut server = PortalServer::new(config);
    if let Some(port) = port {
        server = server.with_port(port);
    }
    if let Some(host) = host {
        server = server.with_host(host);
    }

    log::info!("Starting Gestionaph on {}", server.config().server.bind_address());
    server.serve().await
}
