//! Events command - Feed sandbox messages through the runtime-event bridge

use super::load_project;
use anyhow::{Context, Result};
use colored::Colorize;
use nebula_core::{message_channel, Delivery, PreviewSession, RuntimeBridge};
use nebula_types::RuntimeEvent;
use std::path::Path;
use std::sync::mpsc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    generation: u64,
    repair: bool,
    instruction: Option<&str>,
    dir: &Path,
) -> Result<()> {
    let (config, files) = load_project(dir).await?;
    let mut session = PreviewSession::with_files(&config, files);

    let mut bridge = RuntimeBridge::from_config(&config);
    bridge.set_generation(generation);

    let (delivered_tx, delivered_rx) = mpsc::channel::<Delivery>();
    bridge.register(move |delivery| {
        print_event(&delivery);
        let _ = delivered_tx.send(delivery);
    })?;

    let (port, rx) = message_channel();
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if port.post(line).is_err() {
                break;
            }
        }
        Ok::<(), std::io::Error>(())
    });

    let delivered = bridge.pump(rx).await;
    reader
        .await
        .context("stdin reader task failed")?
        .context("Failed to read stdin")?;

    for delivery in delivered_rx.try_iter() {
        session.record(delivery);
    }

    eprintln!();
    eprintln!("{} {} event(s) delivered", "📨".cyan(), delivered);

    if repair {
        match session.repair_request(instruction) {
            Some(request) => println!("{}", serde_json::to_string_pretty(&request)?),
            None => eprintln!("{} No error to repair", "ℹ️".cyan()),
        }
    }

    Ok(())
}

fn print_event(delivery: &Delivery) {
    let label = format!("[{}]", delivery.generation).dimmed();
    match &delivery.event {
        RuntimeEvent::Log { payload } => println!("{} {}", label, payload),
        RuntimeEvent::Warn { payload } => println!("{} {} {}", label, "warn".yellow(), payload),
        error @ RuntimeEvent::Error { source, .. } => println!(
            "{} {} {}",
            label,
            format!("error ({:?})", source).to_lowercase().red(),
            error.describe()
        ),
    }
}
