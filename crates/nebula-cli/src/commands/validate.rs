//! Validate command - Validate configuration

use anyhow::Result;
use colored::Colorize;
use nebula_core::ConfigManager;
use std::path::Path;

pub async fn run(dir: &Path) -> Result<()> {
    println!("{}", "🔍 Validating Nebula configuration...".cyan().bold());

    let mut config_manager = ConfigManager::new();
    let (config, config_path) = config_manager
        .load_from_directory(dir)
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    println!("  📁 Config file: {}", config_path.display().to_string().dimmed());
    println!();

    let result = config_manager.validate(&config);

    if result.valid {
        println!("  {} Schema is valid", "✅".green());
    } else {
        println!("  {} Schema validation failed", "❌".red());
        for error in &result.errors {
            println!("      {} {}: {}", "•".red(), error.field.red(), error.message);
        }
    }

    for warning in &result.warnings {
        println!("  {} {}: {}", "⚠️".yellow(), warning.field.yellow(), warning.message);
        if let Some(ref suggestion) = warning.suggestion {
            println!("      💡 {}", suggestion.dimmed());
        }
    }

    println!();

    if !result.valid {
        println!("{}", "❌ Validation failed - please fix the errors above".red().bold());
        return Err(anyhow::anyhow!("Validation failed"));
    }
    println!("{}", "✅ Configuration is valid!".green().bold());

    Ok(())
}
