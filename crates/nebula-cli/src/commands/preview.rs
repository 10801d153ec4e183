//! Preview command - Compose the sandboxed preview document

use super::load_project;
use anyhow::{Context, Result};
use colored::Colorize;
use nebula_core::{NebulaConfig, PreviewDocument, PreviewSession};
use std::path::{Path, PathBuf};

pub async fn run(dir: &Path, out: Option<&Path>) -> Result<()> {
    let (config, files) = load_project(dir).await?;
    let mut session = PreviewSession::with_files(&config, files);

    let document = session.compose();
    let output = write_document(dir, out, &config, &document).await?;
    report(&document, &output);

    Ok(())
}

/// Write a composed document to `out`, or to the configured output under `dir`
pub async fn write_document(
    dir: &Path,
    out: Option<&Path>,
    config: &NebulaConfig,
    document: &PreviewDocument,
) -> Result<PathBuf> {
    let output = match out {
        Some(path) => path.to_path_buf(),
        None => dir.join(&config.preview.output),
    };
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&output, document.as_str())
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(output)
}

pub fn report(document: &PreviewDocument, output: &Path) {
    if document.is_blank() {
        println!(
            "{} Nothing to preview yet: no html, css or js files",
            "⚠️".yellow()
        );
    } else {
        println!(
            "{} Composed generation {} from {}",
            "✅".green(),
            document.generation(),
            document.sources().join(", ").cyan()
        );
    }
    println!("  📄 {}", output.display().to_string().dimmed());
}
