//! Project directory watcher for the dev loop

use crate::config::{ConfigManager, NebulaConfig};
use crate::error::{NebulaError, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind, Debouncer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// Events emitted by the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Changed(PathBuf),
    Error(String),
}

/// Debounced recursive watcher over one directory
pub struct Watcher {
    rx: Option<UnboundedReceiver<WatchEvent>>,
    debouncer: Option<Debouncer<RecommendedWatcher>>,
    debounce_ms: u64,
}

impl Default for Watcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Watcher {
    pub fn new() -> Self {
        Self {
            rx: None,
            debouncer: None,
            debounce_ms: 300,
        }
    }

    /// Set debounce duration in milliseconds
    pub fn with_debounce(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Start watching `path`. Watching again replaces the previous watch.
    pub fn watch(&mut self, path: &Path) -> Result<()> {
        let (tx, rx) = unbounded_channel();

        let mut debouncer = new_debouncer(
            Duration::from_millis(self.debounce_ms),
            move |res: std::result::Result<
                Vec<notify_debouncer_mini::DebouncedEvent>,
                notify::Error,
            >| match res {
                Ok(events) => {
                    for event in events {
                        if event.kind == DebouncedEventKind::Any {
                            let _ = tx.send(WatchEvent::Changed(event.path));
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(WatchEvent::Error(e.to_string()));
                }
            },
        )
        .map_err(|e| NebulaError::Watch(e.to_string()))?;

        debouncer
            .watcher()
            .watch(path, RecursiveMode::Recursive)
            .map_err(|e| NebulaError::Watch(e.to_string()))?;

        self.debouncer = Some(debouncer);
        self.rx = Some(rx);
        Ok(())
    }

    pub fn is_watching(&self) -> bool {
        self.debouncer.is_some()
    }

    /// Wait for the next event. `None` when not watching.
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }
}

/// Whether a change under `root` should trigger a recompose.
///
/// Hidden paths and the preview output itself are ignored; config changes
/// count.
pub fn is_project_change(root: &Path, path: &Path, config: &NebulaConfig) -> bool {
    let relative = match path.strip_prefix(root) {
        Ok(relative) => relative,
        Err(_) => return false,
    };
    if relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
    {
        return false;
    }
    if ConfigManager::is_config_file(path) {
        return true;
    }
    relative != Path::new(&config.preview.output)
}
