use anyhow::{bail, Result};
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    let portal = super::connect(config_path)?;
    let diagnostics = portal.diagnostics().await;
    println!("{}", serde_json::to_string_pretty(&diagnostics)?);

    if !diagnostics.is_ok() {
        bail!("backend check failed");
    }
    Ok(())
}
