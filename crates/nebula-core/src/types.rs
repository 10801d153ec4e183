//! Core type definitions for Nebula

use crate::error::{NebulaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTML entry points, most preferred first
pub const HTML_FILE_NAMES: &[&str] = &["index.html", "index.htm", "main.html"];

/// Stylesheet names, most preferred first
pub const CSS_FILE_NAMES: &[&str] = &["style.css", "styles.css", "main.css"];

/// Script names, most preferred first
pub const SCRIPT_FILE_NAMES: &[&str] = &["script.js", "app.js", "main.js"];

/// Data file names
pub const JSON_FILE_NAMES: &[&str] = &["data.json"];

/// Languages whose fences are turned into files without an explicit name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Html,
    Css,
    JavaScript,
    Json,
}

impl Language {
    /// Map a fence tag to a language (case-insensitive)
    pub fn from_tag(tag: &str) -> Option<Language> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(Language::Html),
            "css" => Some(Language::Css),
            "javascript" | "js" => Some(Language::JavaScript),
            "json" => Some(Language::Json),
            _ => None,
        }
    }

    /// Language a file extension belongs to (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(Language::Html),
            "css" => Some(Language::Css),
            "js" | "mjs" | "cjs" => Some(Language::JavaScript),
            "json" => Some(Language::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Html => "html",
            Language::Css => "css",
            Language::JavaScript => "javascript",
            Language::Json => "json",
        }
    }

    /// Conventional names for this language, most preferred first
    pub fn alternates(&self) -> &'static [&'static str] {
        match self {
            Language::Html => HTML_FILE_NAMES,
            Language::Css => CSS_FILE_NAMES,
            Language::JavaScript => SCRIPT_FILE_NAMES,
            Language::Json => JSON_FILE_NAMES,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalize a relative project path.
///
/// Strips leading `./` and `/`, converts backslashes, and rejects empty
/// paths and parent-directory segments.
pub fn normalize_path(raw: &str) -> Result<String> {
    let unified = raw.trim().replace('\\', "/");
    let segments: Vec<&str> = unified
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    if segments.is_empty() {
        return Err(NebulaError::InvalidPath(format!("'{}' is empty", raw)));
    }
    if segments.iter().any(|s| *s == "..") {
        return Err(NebulaError::InvalidPath(format!(
            "'{}' escapes the project root",
            raw
        )));
    }

    Ok(segments.join("/"))
}

/// One named artifact in the in-memory project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub path: String,
    pub content: String,
}

impl ProjectFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Lower-cased extension, if any
    pub fn extension(&self) -> Option<String> {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        name.rsplit_once('.')
            .filter(|(stem, _)| !stem.is_empty())
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// File-tree icon for this file
    pub fn icon(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("js") => "📜",
            Some("ts") => "📘",
            Some("jsx") | Some("tsx") => "⚛️",
            Some("html") => "🌐",
            Some("css") | Some("scss") => "🎨",
            Some("json") => "📋",
            Some("md") => "📝",
            Some("py") => "🐍",
            Some("rb") => "💎",
            Some("go") => "🔷",
            Some("jpg") | Some("png") => "🖼️",
            Some("svg") => "🎭",
            _ => "📄",
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Result of writing one path into the table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOutcome {
    Created,
    Updated,
    Unchanged,
}

impl WriteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOutcome::Created => "created",
            WriteOutcome::Updated => "updated",
            WriteOutcome::Unchanged => "unchanged",
        }
    }
}

/// Path → file mapping owned by the host session.
///
/// Listing order is insertion order; writing an existing path replaces its
/// content in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ProjectFile>", into = "Vec<ProjectFile>")]
pub struct ProjectFileTable {
    files: Vec<ProjectFile>,
    index: HashMap<String, usize>,
}

impl From<Vec<ProjectFile>> for ProjectFileTable {
    fn from(files: Vec<ProjectFile>) -> Self {
        let mut table = Self::new();
        for file in files {
            table.insert_unchecked(file.path, file.content);
        }
        table
    }
}

impl From<ProjectFileTable> for Vec<ProjectFile> {
    fn from(table: ProjectFileTable) -> Self {
        table.files
    }
}

impl ProjectFileTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&ProjectFile> {
        self.index.get(path).map(|&i| &self.files[i])
    }

    pub fn content(&self, path: &str) -> Option<&str> {
        self.get(path).map(|f| f.content.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Write a file, replacing the content of an existing path
    pub fn write(&mut self, path: &str, content: impl Into<String>) -> Result<WriteOutcome> {
        let path = normalize_path(path)?;
        Ok(self.insert_unchecked(path, content.into()))
    }

    fn insert_unchecked(&mut self, path: String, content: String) -> WriteOutcome {
        match self.index.get(&path) {
            Some(&i) => {
                let file = &mut self.files[i];
                if file.content == content {
                    WriteOutcome::Unchanged
                } else {
                    file.content = content;
                    WriteOutcome::Updated
                }
            }
            None => {
                self.index.insert(path.clone(), self.files.len());
                self.files.push(ProjectFile { path, content });
                WriteOutcome::Created
            }
        }
    }

    /// Remove a file. Extraction never calls this.
    pub fn remove(&mut self, path: &str) -> Option<ProjectFile> {
        let i = self.index.remove(path)?;
        let removed = self.files.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectFile> {
        self.files.iter()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }

    /// First file present among `candidates`, in candidate order
    pub fn first_present(&self, candidates: &[&str]) -> Option<&ProjectFile> {
        candidates.iter().find_map(|c| self.get(c))
    }
}

/// How a write's target path was decided
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "language", rename_all = "lowercase")]
pub enum WriteOrigin {
    Explicit,
    Inferred(Language),
}

/// A planned write of one fragment into the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWrite {
    pub path: String,
    pub content: String,
    pub origin: WriteOrigin,
}

/// A write after it was applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedWrite {
    pub path: String,
    pub origin: WriteOrigin,
    pub outcome: WriteOutcome,
}

/// Outcome of one extraction pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub writes: Vec<AppliedWrite>,
    /// Fragments found but not written (unresolved or duplicate language)
    pub skipped: usize,
}

impl ExtractionSummary {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Number of writes that changed the table
    pub fn changed(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| w.outcome != WriteOutcome::Unchanged)
            .count()
    }

    pub fn touches(&self, path: &str) -> bool {
        self.writes.iter().any(|w| w.path == path)
    }
}

/// Validation result
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: ValidationError) -> Self {
        self.valid = false;
        self.errors.push(error);
        self
    }

    pub fn with_warning(mut self, warning: ValidationWarning) -> Self {
        self.warnings.push(warning);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./src/app.js").unwrap(), "src/app.js");
        assert_eq!(normalize_path("/index.html").unwrap(), "index.html");
        assert_eq!(normalize_path("css\\Main.css").unwrap(), "css/Main.css");
        assert!(normalize_path("  ").is_err());
        assert!(normalize_path("../secret.txt").is_err());
    }

    #[test]
    fn test_write_replaces_and_keeps_order() {
        let mut table = ProjectFileTable::new();
        assert_eq!(table.write("index.html", "<p>a</p>").unwrap(), WriteOutcome::Created);
        assert_eq!(table.write("style.css", "p{}").unwrap(), WriteOutcome::Created);
        assert_eq!(table.write("index.html", "<p>b</p>").unwrap(), WriteOutcome::Updated);
        assert_eq!(table.write("./index.html", "<p>b</p>").unwrap(), WriteOutcome::Unchanged);

        assert_eq!(table.len(), 2);
        assert_eq!(table.paths(), vec!["index.html", "style.css"]);
        assert_eq!(table.content("index.html"), Some("<p>b</p>"));
    }

    #[test]
    fn test_remove_reindexes() {
        let mut table = ProjectFileTable::new();
        table.write("a.js", "1").unwrap();
        table.write("b.js", "2").unwrap();
        table.write("c.js", "3").unwrap();

        assert_eq!(table.remove("a.js").map(|f| f.content), Some("1".to_string()));
        assert!(table.remove("a.js").is_none());
        assert_eq!(table.content("c.js"), Some("3"));
        assert_eq!(table.paths(), vec!["b.js", "c.js"]);
    }

    #[test]
    fn test_first_present_follows_candidate_order() {
        let mut table = ProjectFileTable::new();
        table.write("main.js", "m").unwrap();
        table.write("app.js", "a").unwrap();

        let found = table.first_present(SCRIPT_FILE_NAMES).unwrap();
        assert_eq!(found.path, "app.js");
        assert!(table.first_present(CSS_FILE_NAMES).is_none());
    }

    #[test]
    fn test_table_serializes_as_list() {
        let mut table = ProjectFileTable::new();
        table.write("index.html", "<p>hi</p>").unwrap();

        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"[{"path":"index.html","content":"<p>hi</p>"}]"#);

        let back: ProjectFileTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.content("index.html"), Some("<p>hi</p>"));
    }

    #[test]
    fn test_language_tags_and_icons() {
        assert_eq!(Language::from_tag("HTML"), Some(Language::Html));
        assert_eq!(Language::from_tag("js"), Some(Language::JavaScript));
        assert_eq!(Language::from_tag("python"), None);
        assert_eq!(Language::from_tag(""), None);
        assert_eq!(Language::from_extension("HTM"), Some(Language::Html));
        assert_eq!(Language::from_extension("md"), None);

        assert_eq!(ProjectFile::new("src/app.JS", "").icon(), "📜");
        assert_eq!(ProjectFile::new("README", "").icon(), "📄");
        assert_eq!(ProjectFile::new(".env", "").extension(), None);
    }
}
