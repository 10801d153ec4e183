//! Extract command - Merge an assistant response into the project

use super::{load_project, read_input};
use anyhow::{bail, Result};
use colored::Colorize;
use nebula_core::{project, AppliedWrite, PreviewSession, ProjectFile, WriteOrigin, WriteOutcome};
use std::path::Path;

pub async fn run(
    input: Option<&Path>,
    dir: &Path,
    dry_run: bool,
    stream_chunk: Option<usize>,
) -> Result<()> {
    let text = read_input(input).await?;
    let (config, files) = load_project(dir).await?;
    let before = files.clone();
    let mut session = PreviewSession::with_files(&config, files);

    println!("{}", "🧩 Extracting code blocks...".cyan().bold());

    let mut skipped = 0;
    match stream_chunk {
        Some(0) => bail!("--stream-chunk must be at least 1"),
        Some(size) => {
            for delta in split_deltas(&text, size) {
                let summary = session.push_delta(delta);
                for write in summary.writes.iter().filter(|w| w.outcome != WriteOutcome::Unchanged) {
                    print_write(write);
                }
                skipped = summary.skipped;
            }
            session.finish_stream();
        }
        None => {
            let summary = session.apply_response(&text);
            for write in &summary.writes {
                print_write(write);
            }
            skipped = summary.skipped;
        }
    }

    if skipped > 0 {
        println!("  {} {} fragment(s) skipped", "⚠️".yellow(), skipped);
    }

    let changed: Vec<&ProjectFile> = session
        .files()
        .iter()
        .filter(|f| before.content(&f.path) != Some(f.content.as_str()))
        .collect();

    println!();
    if changed.is_empty() {
        println!("{}", "No files changed".dimmed());
    } else if dry_run {
        println!(
            "{} {} file(s) would change (dry run)",
            "📝".yellow(),
            changed.len()
        );
    } else {
        let written = project::write_files(dir, changed).await?;
        println!("{} {} file(s) written", "✅".green(), written);
    }

    Ok(())
}

fn print_write(write: &AppliedWrite) {
    let origin = match write.origin {
        WriteOrigin::Explicit => "named".to_string(),
        WriteOrigin::Inferred(language) => format!("from {}", language),
    };
    let outcome = match write.outcome {
        WriteOutcome::Created => write.outcome.as_str().green(),
        WriteOutcome::Updated => write.outcome.as_str().yellow(),
        WriteOutcome::Unchanged => write.outcome.as_str().dimmed(),
    };
    println!("  {:>9} {} {}", outcome, write.path, format!("({})", origin).dimmed());
}

/// Split `text` into deltas of at most `size` bytes, on char boundaries
fn split_deltas(text: &str, size: usize) -> Vec<&str> {
    let mut deltas = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + size).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        deltas.push(&text[start..end]);
        start = end;
    }
    deltas
}
