//! Init command - Write a default project configuration

use anyhow::Result;
use colored::Colorize;
use nebula_core::ConfigManager;
use std::path::Path;

pub async fn run(dir: &Path, overwrite: bool) -> Result<()> {
    println!("{}", "🚀 Initializing Nebula project...".cyan().bold());

    tokio::fs::create_dir_all(dir).await?;
    let project_dir = tokio::fs::canonicalize(dir).await?;

    let project_name = project_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("nebula-project")
        .to_lowercase()
        .replace(' ', "-");

    if let Some(existing) = ConfigManager::find_config_file(&project_dir) {
        if !overwrite {
            println!(
                "{} Configuration already exists: {}",
                "⚠️".yellow(),
                existing.display()
            );
            return Ok(());
        }
    }

    let config = ConfigManager::create_default(&project_name);
    let config_path = project_dir.join("nebula.config.yaml");
    ConfigManager::new().save(&config, &config_path)?;

    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!("  📁 {}", config_path.display().to_string().dimmed());
    println!();
    println!("Next steps:");
    println!("  {} Pipe an assistant response into {}", "1.".cyan(), "nebula extract".green());
    println!("  {} Run {} to compose the preview", "2.".cyan(), "nebula preview".green());
    println!("  {} Run {} to recompose on every change", "3.".cyan(), "nebula dev".green());

    Ok(())
}
