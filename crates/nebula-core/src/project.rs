//! Project directory I/O

use crate::config::{ConfigManager, NebulaConfig};
use crate::error::Result;
use crate::types::{normalize_path, ProjectFile, ProjectFileTable};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directories never loaded into the table
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "dist"];

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    normalize_path(&joined).ok()
}

/// Load the text files under `root` into a table, in sorted path order.
///
/// Hidden entries, config files and the configured preview output are
/// skipped, as are files that are not valid UTF-8.
pub async fn load_directory(root: &Path, config: &NebulaConfig) -> Result<ProjectFileTable> {
    let output = normalize_path(&config.preview.output).ok();
    let mut files: Vec<ProjectFile> = Vec::new();
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_hidden(&path) {
                continue;
            }

            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                let skipped = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|name| SKIPPED_DIRS.contains(&name))
                    .unwrap_or(false);
                if !skipped {
                    pending.push(path);
                }
                continue;
            }
            if !file_type.is_file() || ConfigManager::is_config_file(&path) {
                continue;
            }

            let Some(relative) = relative_path(root, &path) else {
                continue;
            };
            if output.as_deref() == Some(relative.as_str()) {
                continue;
            }

            match tokio::fs::read_to_string(&path).await {
                Ok(content) => files.push(ProjectFile::new(relative, content)),
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    debug!("Skipping non-text file {}", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files.into())
}

/// Write files under `root`, creating parent directories as needed.
///
/// Returns the number of files written.
pub async fn write_files<'a, I>(root: &Path, files: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a ProjectFile>,
{
    let mut written = 0;
    for file in files {
        let target = root.join(normalize_path(&file.path)?);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &file.content).await?;
        debug!("Wrote {}", target.display());
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NebulaError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_skips_hidden_config_and_output() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        std::fs::write(root.join("index.html"), "<p>hi</p>")?;
        std::fs::write(root.join("preview.html"), "<!DOCTYPE html>")?;
        std::fs::write(root.join("nebula.config.yaml"), "name: x\n")?;
        std::fs::write(root.join(".env"), "SECRET=1")?;
        std::fs::create_dir_all(root.join("css"))?;
        std::fs::write(root.join("css/theme.css"), "p{}")?;
        std::fs::create_dir_all(root.join(".git"))?;
        std::fs::write(root.join(".git/HEAD"), "ref")?;
        std::fs::create_dir_all(root.join("node_modules/lib"))?;
        std::fs::write(root.join("node_modules/lib/index.js"), "x")?;
        std::fs::write(root.join("logo.png"), [0x89u8, 0x50, 0xff, 0xfe])?;

        let table = load_directory(root, &NebulaConfig::new("x")).await?;
        assert_eq!(table.paths(), vec!["css/theme.css", "index.html"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_write_files_creates_directories() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let files = vec![
            ProjectFile::new("js/app.js", "run()"),
            ProjectFile::new("index.html", "<p></p>"),
        ];

        assert_eq!(write_files(temp_dir.path(), &files).await?, 2);
        assert_eq!(std::fs::read_to_string(temp_dir.path().join("js/app.js"))?, "run()");

        let reloaded = load_directory(temp_dir.path(), &NebulaConfig::new("x")).await?;
        assert_eq!(reloaded.content("js/app.js"), Some("run()"));
        Ok(())
    }

    #[tokio::test]
    async fn test_write_rejects_escaping_path() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![ProjectFile::new("../outside.txt", "x")];
        assert!(matches!(
            write_files(temp_dir.path(), &files).await,
            Err(NebulaError::InvalidPath(_))
        ));
    }
}
