//! Render command - Print an assistant message as chat HTML

use super::read_input;
use anyhow::Result;
use nebula_core::render_message;
use std::path::Path;

pub async fn run(input: Option<&Path>) -> Result<()> {
    let text = read_input(input).await?;
    println!("{}", render_message(&text));
    Ok(())
}
