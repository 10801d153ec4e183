//! Dev command - Recompose the preview on every project change

use super::preview::{report, write_document};
use anyhow::Result;
use colored::Colorize;
use nebula_core::{
    project,
    watcher::{is_project_change, WatchEvent, Watcher},
    ConfigManager, PreviewSession,
};
use std::path::Path;

pub async fn run(dir: &Path) -> Result<()> {
    println!("{}", "🔧 Starting development mode...".cyan().bold());

    let project_dir = tokio::fs::canonicalize(dir).await?;
    let mut config_manager = ConfigManager::new();
    let mut config = config_manager
        .load_or_default(&project_dir)
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    let files = project::load_directory(&project_dir, &config).await?;
    let mut session = PreviewSession::with_files(&config, files);

    let document = session.compose();
    let output = write_document(&project_dir, None, &config, &document).await?;
    report(&document, &output);

    println!();
    println!("{}", "👀 Watching for changes... (Ctrl+C to stop)".cyan().bold());

    let mut watcher = Watcher::new().with_debounce(300);
    watcher
        .watch(&project_dir)
        .map_err(|e| anyhow::anyhow!("Failed to start watcher: {}", e))?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("{}", "👋 Stopping development mode...".yellow());
                break;
            }
            event = watcher.next_event() => {
                match event {
                    Some(WatchEvent::Changed(path)) => {
                        if !is_project_change(&project_dir, &path, &config) {
                            continue;
                        }
                        println!();
                        println!("{} {}", "📝 Changed:".yellow(), path.display());

                        if ConfigManager::is_config_file(&path) {
                            config_manager.clear_cache();
                            match config_manager.load_or_default(&project_dir) {
                                Ok(new_config) => {
                                    session.reconfigure(&new_config);
                                    config = new_config;
                                }
                                Err(e) => {
                                    println!("{} {}", "❌ Config error:".red(), e);
                                    continue;
                                }
                            }
                        }

                        match project::load_directory(&project_dir, &config).await {
                            Ok(files) => {
                                *session.files_mut() = files;
                                let document = session.compose();
                                match write_document(&project_dir, None, &config, &document).await {
                                    Ok(output) => report(&document, &output),
                                    Err(e) => println!("{} {}", "❌ Recompose failed:".red(), e),
                                }
                            }
                            Err(e) => {
                                println!("{} {}", "❌ Reload failed:".red(), e);
                            }
                        }
                    }
                    Some(WatchEvent::Error(msg)) => {
                        println!("{} {}", "⚠️ Watch error:".yellow(), msg);
                    }
                    None => break,
                }
            }
        }
    }

    Ok(())
}
