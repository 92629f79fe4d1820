pub mod check;
pub mod notify;
pub mod serve;
pub mod tally;

use anyhow::Result;
use gestionaph_core::backend::Portal;
use gestionaph_core::config::PortalConfig;
use std::path::Path;

/// Load the config and connect a portal for a one-shot command
pub(crate) fn connect(config_path: &Path) -> Result<Portal> {
    let config = PortalConfig::load_from(config_path)?;
    config.validate()?;
    gestionaph_core::logging::init_env_logger();
    Ok(Portal::connect(&config))
}
