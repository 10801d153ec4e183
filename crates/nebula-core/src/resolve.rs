//! Path-resolution policy for extracted fragments
//!
//! Resolution order, highest priority first:
//! 1. an explicit filename marker in the text before the fence
//!    (`**index.html**` or a `style.css:` line prefix), unless its extension
//!    belongs to a different [`Language`] than the fence's tag
//! 2. the fence's language tag, mapped through [`Language`]
//! 3. otherwise the fragment is unresolved and not written

use crate::config::ExtractorConfig;
use crate::types::{normalize_path, Language};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Extensions a filename marker must end with to count
pub const MARKER_EXTENSIONS: &[&str] = &[
    "html", "htm", "css", "scss", "sass", "less", "js", "mjs", "cjs", "jsx", "ts", "tsx", "json",
    "md", "txt", "svg", "xml", "csv", "py", "rb", "go", "rs", "java", "php", "sh", "yml", "yaml",
    "toml", "vue", "svelte", "sql",
];

/// `**name.ext**`, `__name.ext__`, optionally with backticks or a trailing colon inside
static BOLD_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\*\*|__)[ \t]*`?([A-Za-z0-9_][\w./-]*\.[A-Za-z0-9]+)`?[ \t]*:?[ \t]*(?:\*\*|__)")
        .expect("bold marker pattern is valid")
});

/// `name.ext:` at the start of a line, after optional list or heading markup
static PREFIX_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[-*+][ \t]+|#{1,6}[ \t]+)?`?([A-Za-z0-9_][\w./-]*\.[A-Za-z0-9]+)`?:")
        .expect("prefix marker pattern is valid")
});

/// Where a fragment should be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentTarget {
    ExplicitPath(String),
    LanguageInferred(Language),
    Unresolved,
}

/// Naming policy applied to every fragment of an extraction pass
#[derive(Debug, Clone)]
pub struct PathPolicy {
    lowercase_paths: bool,
    default_script: String,
    extensions: Vec<String>,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self::new(&ExtractorConfig::default())
    }
}

impl PathPolicy {
    pub fn new(config: &ExtractorConfig) -> Self {
        let mut extensions: Vec<String> = MARKER_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        for ext in &config.extra_extensions {
            let ext = ext.trim_start_matches('.').to_ascii_lowercase();
            if !ext.is_empty() && !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }

        Self {
            lowercase_paths: config.lowercase_paths,
            default_script: config.default_script.clone(),
            extensions,
        }
    }

    fn has_known_extension(&self, name: &str) -> bool {
        name.rsplit_once('.')
            .map(|(_, ext)| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// The last filename marker in `preceding`, normalized.
    ///
    /// `preceding` is the text between the previous fence and this one.
    pub fn find_marker(&self, preceding: &str) -> Option<String> {
        let candidate = BOLD_MARKER
            .captures_iter(preceding)
            .chain(PREFIX_MARKER.captures_iter(preceding))
            .filter_map(|caps| caps.get(1))
            .filter(|m| self.has_known_extension(m.as_str()))
            .max_by_key(|m| m.end())?;

        let raw = if self.lowercase_paths {
            candidate.as_str().to_lowercase()
        } else {
            candidate.as_str().to_string()
        };

        match normalize_path(&raw) {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("Ignoring filename marker: {}", e);
                None
            }
        }
    }

    /// Decide the target for one fragment
    pub fn resolve(&self, explicit_path: Option<&str>, language: Option<&str>) -> FragmentTarget {
        let tagged = language.and_then(Language::from_tag);

        if let Some(path) = explicit_path {
            let marked = path
                .rsplit_once('.')
                .and_then(|(_, ext)| Language::from_extension(ext));
            match (marked, tagged) {
                (Some(marked), Some(tagged)) if marked != tagged => {
                    debug!("Ignoring marker '{}' on a {} fragment", path, tagged);
                }
                _ => return FragmentTarget::ExplicitPath(path.to_string()),
            }
        }

        match tagged {
            Some(lang) => FragmentTarget::LanguageInferred(lang),
            None => FragmentTarget::Unresolved,
        }
    }

    /// Name a new file of this language gets when the table has none
    pub fn canonical_path(&self, language: Language) -> String {
        match language {
            Language::JavaScript => self.default_script.clone(),
            other => other.alternates()[0].to_string(),
        }
    }

    /// First alternate for `language` that `exists`, else its canonical name
    pub fn inferred_path<F>(&self, language: Language, exists: F) -> String
    where
        F: Fn(&str) -> bool,
    {
        language
            .alternates()
            .iter()
            .find(|name| exists(name))
            .map(|name| name.to_string())
            .unwrap_or_else(|| self.canonical_path(language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProjectFileTable;

    #[test]
    fn test_bold_marker() {
        let policy = PathPolicy::default();
        assert_eq!(
            policy.find_marker("Here is the page, **index.html**:\n"),
            Some("index.html".to_string())
        );
        assert_eq!(
            policy.find_marker("**`css/Theme.css`**\n"),
            Some("css/Theme.css".to_string())
        );
    }

    #[test]
    fn test_prefix_marker() {
        let policy = PathPolicy::default();
        assert_eq!(policy.find_marker("app.js:\n"), Some("app.js".to_string()));
        assert_eq!(
            policy.find_marker("Files:\n- `utils/format.js`: helpers\n"),
            Some("utils/format.js".to_string())
        );
        assert_eq!(policy.find_marker("### styles.css:\n"), Some("styles.css".to_string()));
    }

    #[test]
    fn test_last_marker_wins() {
        let policy = PathPolicy::default();
        let text = "First **a.js** then, on reflection:\nb.js:\n";
        assert_eq!(policy.find_marker(text), Some("b.js".to_string()));
    }

    #[test]
    fn test_unknown_extension_is_not_a_marker() {
        let policy = PathPolicy::default();
        assert_eq!(policy.find_marker("**Note.bogus**"), None);
        assert_eq!(policy.find_marker("Note: remember this, e.g. this"), None);
        assert_eq!(policy.find_marker("**Important**"), None);
    }

    #[test]
    fn test_extra_extensions_and_lowercase() {
        let policy = PathPolicy::new(&ExtractorConfig {
            lowercase_paths: true,
            default_script: "app.js".to_string(),
            extra_extensions: vec![".astro".to_string()],
        });
        assert_eq!(policy.find_marker("**Page.ASTRO**"), Some("page.astro".to_string()));
        assert_eq!(policy.canonical_path(Language::JavaScript), "app.js");
    }

    #[test]
    fn test_case_preserved_by_default() {
        let policy = PathPolicy::default();
        assert_eq!(policy.find_marker("**About.HTML**"), Some("About.HTML".to_string()));
    }

    #[test]
    fn test_escaping_marker_is_ignored() {
        let policy = PathPolicy::default();
        assert_eq!(policy.find_marker("**assets/../../secret.txt**"), None);
    }

    #[test]
    fn test_resolve_priority() {
        let policy = PathPolicy::default();
        assert_eq!(
            policy.resolve(Some("x.css"), Some("css")),
            FragmentTarget::ExplicitPath("x.css".to_string())
        );
        assert_eq!(
            policy.resolve(Some("README.md"), Some("html")),
            FragmentTarget::ExplicitPath("README.md".to_string())
        );
        assert_eq!(
            policy.resolve(Some("notes.txt"), None),
            FragmentTarget::ExplicitPath("notes.txt".to_string())
        );
        assert_eq!(
            policy.resolve(None, Some("HTM")),
            FragmentTarget::LanguageInferred(Language::Html)
        );
        assert_eq!(policy.resolve(None, Some("python")), FragmentTarget::Unresolved);
        assert_eq!(policy.resolve(None, None), FragmentTarget::Unresolved);
    }

    #[test]
    fn test_marker_of_another_language_is_ignored() {
        let policy = PathPolicy::default();
        assert_eq!(
            policy.resolve(Some("index.html"), Some("css")),
            FragmentTarget::LanguageInferred(Language::Css)
        );
        assert_eq!(
            policy.resolve(Some("lib/util.mjs"), Some("JavaScript")),
            FragmentTarget::ExplicitPath("lib/util.mjs".to_string())
        );
    }

    #[test]
    fn test_inferred_path_prefers_existing_alternate() {
        let policy = PathPolicy::default();
        let mut table = ProjectFileTable::new();
        let in_table = |table: &ProjectFileTable, lang: Language| {
            policy.inferred_path(lang, |p| table.contains(p))
        };
        assert_eq!(in_table(&table, Language::JavaScript), "script.js");

        table.write("main.js", "").unwrap();
        table.write("app.js", "").unwrap();
        assert_eq!(in_table(&table, Language::JavaScript), "app.js");

        table.write("styles.css", "").unwrap();
        assert_eq!(in_table(&table, Language::Css), "styles.css");
        assert_eq!(in_table(&table, Language::Html), "index.html");
        assert_eq!(in_table(&table, Language::Json), "data.json");
    }
}
