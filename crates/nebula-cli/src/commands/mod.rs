//! CLI command implementations

pub mod dev;
pub mod events;
pub mod extract;
pub mod files;
pub mod init;
pub mod preview;
pub mod render;
pub mod validate;

use anyhow::{Context, Result};
use nebula_core::{project, ConfigManager, NebulaConfig, ProjectFileTable};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Read a whole file, or stdin when no path is given
pub async fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Load the directory's config (or defaults) and its files
pub async fn load_project(dir: &Path) -> Result<(NebulaConfig, ProjectFileTable)> {
    let mut config_manager = ConfigManager::new();
    let config = config_manager
        .load_or_default(dir)
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    let files = project::load_directory(dir, &config)
        .await
        .with_context(|| format!("Failed to read project {}", dir.display()))?;
    Ok((config, files))
}
