//! Files command - List project files

use super::load_project;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub async fn run(dir: &Path) -> Result<()> {
    let (_, files) = load_project(dir).await?;

    if files.is_empty() {
        println!("{}", "No project files yet".dimmed());
        return Ok(());
    }

    for file in files.iter() {
        println!(
            "  {} {} {}",
            file.icon(),
            file.path,
            format!("({} bytes)", file.size()).dimmed()
        );
    }
    println!();
    println!("{} file(s)", files.len().to_string().cyan());

    Ok(())
}
