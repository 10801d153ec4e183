//! Preview document composition
//!
//! Builds one self-contained HTML document from the project's html, css and
//! js files. Stylesheet and script are inlined, and an instrumentation script
//! forwards console output and errors to the host with `postMessage`.
//! Every composition is meant to replace the sandbox content wholesale.

use crate::config::PreviewConfig;
use crate::types::{Language, ProjectFile, ProjectFileTable};
use once_cell::sync::Lazy;
use regex::Regex;

static DOCTYPE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<!doctype[^>]*>").expect("doctype pattern is valid"));
static HTML_OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<html\b([^>]*)>").expect("html pattern is valid"));
static HTML_CLOSE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</html\s*>").expect("html close pattern is valid"));
static HEAD_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<head\b[^>]*>.*?</head\s*>").expect("head pattern is valid")
});
static TITLE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("title pattern is valid")
});
static BODY_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<body\b([^>]*)>(.*?)(?:</body\s*>|\z)").expect("body pattern is valid")
});
static CLOSING_SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</(script)").expect("script close pattern is valid"));
static CLOSING_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</(style)").expect("style close pattern is valid"));

/// Body used when only css or js exists
const APP_MOUNT: &str = r#"<div id="app"></div>"#;

/// The html, css and js files chosen for a preview
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewSources<'a> {
    pub html: Option<&'a ProjectFile>,
    pub css: Option<&'a ProjectFile>,
    pub js: Option<&'a ProjectFile>,
}

impl<'a> PreviewSources<'a> {
    pub fn select(table: &'a ProjectFileTable) -> Self {
        Self {
            html: table.first_present(Language::Html.alternates()),
            css: table.first_present(Language::Css.alternates()),
            js: table.first_present(Language::JavaScript.alternates()),
        }
    }

    /// True when all three sources are missing or blank
    pub fn is_blank(&self) -> bool {
        [self.html, self.css, self.js]
            .iter()
            .all(|f| f.map(|f| f.content.trim().is_empty()).unwrap_or(true))
    }

    pub fn paths(&self) -> Vec<String> {
        [self.html, self.css, self.js]
            .iter()
            .flatten()
            .map(|f| f.path.clone())
            .collect()
    }
}

/// A complete HTML document ready to hand to the sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewDocument {
    html: String,
    generation: u64,
    blank: bool,
    sources: Vec<String>,
}

impl PreviewDocument {
    pub fn as_str(&self) -> &str {
        &self.html
    }

    pub fn into_string(self) -> String {
        self.html
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Nothing to preview: the host should show its empty state
    pub fn is_blank(&self) -> bool {
        self.blank
    }

    /// Project paths that went into the document
    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

impl std::fmt::Display for PreviewDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.html)
    }
}

/// Pieces of a document before assembly
#[derive(Default)]
struct DocumentParts {
    html_attrs: String,
    body_attrs: String,
    title: Option<String>,
    body: String,
    css: Option<(String, String)>,
    pre_script: Option<String>,
    js: Option<(String, String)>,
}

/// Synthesizes sandbox documents from a project file table
#[derive(Debug, Clone)]
pub struct PreviewComposer {
    title: String,
    channel: String,
}

impl Default for PreviewComposer {
    fn default() -> Self {
        Self::new(&PreviewConfig::default())
    }
}

impl PreviewComposer {
    pub fn new(config: &PreviewConfig) -> Self {
        Self {
            title: config.title.clone(),
            channel: config.channel.clone(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Compose the preview for the table's current html, css and js
    pub fn compose(&self, table: &ProjectFileTable, generation: u64) -> PreviewDocument {
        let sources = PreviewSources::select(table);
        let html_source = sources.html.map(|f| f.content.as_str()).unwrap_or("");
        let css = sources.css.filter(|f| !f.content.trim().is_empty());
        let js = sources.js.filter(|f| !f.content.trim().is_empty());

        let mut parts = DocumentParts::default();
        let mut markup = html_source.to_string();

        for file in [sources.css, sources.js].into_iter().flatten() {
            markup = strip_file_references(&markup, &file.path);
        }

        if is_full_document(&markup) {
            if let Some(caps) = HTML_OPEN_TAG.captures(&markup) {
                parts.html_attrs = caps[1].to_string();
            }
        }
        let (title, body_attrs, body) = split_markup(&markup);
        parts.title = title;
        parts.body_attrs = body_attrs;
        parts.body = body;

        if parts.body.trim().is_empty() && (css.is_some() || js.is_some()) {
            parts.body = APP_MOUNT.to_string();
        }

        parts.css = css.map(|f| (f.path.clone(), f.content.clone()));
        parts.js = js.map(|f| (f.path.clone(), f.content.clone()));

        PreviewDocument {
            html: self.assemble(parts, generation),
            generation,
            blank: sources.is_blank(),
            sources: sources.paths(),
        }
    }

    /// Preview a single fragment on its own
    pub fn compose_snippet(&self, language: Language, code: &str, generation: u64) -> PreviewDocument {
        let mut parts = DocumentParts::default();
        let name = language.alternates()[0].to_string();

        match language {
            Language::Html => {
                let table: ProjectFileTable = vec![ProjectFile::new(name, code)].into();
                return self.compose(&table, generation);
            }
            Language::Css => {
                parts.body = r#"<div class="preview-demo">CSS Preview</div>"#.to_string();
                parts.css = Some((name.clone(), code.to_string()));
            }
            Language::JavaScript => {
                parts.body = r#"<div id="output"></div>"#.to_string();
                parts.pre_script = Some(OUTPUT_MIRROR_SCRIPT.to_string());
                parts.js = Some((name.clone(), code.to_string()));
            }
            Language::Json => {
                parts.body = format!("<pre>{}</pre>", escape_html(code));
            }
        }

        PreviewDocument {
            html: self.assemble(parts, generation),
            generation,
            blank: code.trim().is_empty(),
            sources: vec![name],
        }
    }

    fn assemble(&self, parts: DocumentParts, generation: u64) -> String {
        let title = parts.title.unwrap_or_else(|| escape_html(&self.title));
        let mut doc = String::new();

        doc.push_str("<!DOCTYPE html>\n");
        doc.push_str(&format!("<html{}>\n", parts.html_attrs));
        doc.push_str("<head>\n");
        doc.push_str("<meta charset=\"UTF-8\">\n");
        doc.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        doc.push_str(&format!("<title>{}</title>\n", title));
        doc.push_str("<script data-nebula=\"instrumentation\">\n");
        doc.push_str(&self.instrumentation_script(generation));
        doc.push_str("</script>\n");
        if let Some((path, css)) = parts.css {
            doc.push_str(&format!(
                "<style data-nebula-source=\"{}\">\n{}\n</style>\n",
                escape_html(&path),
                CLOSING_STYLE.replace_all(&css, "<\\/$1")
            ));
        }
        doc.push_str("</head>\n");
        doc.push_str(&format!("<body{}>\n", parts.body_attrs));
        doc.push_str(&parts.body);
        doc.push('\n');
        if let Some(script) = parts.pre_script {
            doc.push_str(&format!("<script>\n{}</script>\n", script));
        }
        if let Some((path, js)) = parts.js {
            doc.push_str(&format!(
                "<script data-nebula-source=\"{}\">\ntry {{\n{}\n}} catch (__nebulaError) {{\n  window.__nebulaPreview.fail(__nebulaError);\n}}\n</script>\n",
                escape_html(&path),
                CLOSING_SCRIPT.replace_all(&js, "<\\/$1")
            ));
        }
        doc.push_str("</body>\n</html>\n");
        doc
    }

    /// Script that forwards console calls and errors to the host frame
    pub fn instrumentation_script(&self, generation: u64) -> String {
        let channel = serde_json::Value::String(self.channel.clone()).to_string();
        INSTRUMENTATION_TEMPLATE
            .replace("__CHANNEL__", &channel)
            .replace("__GENERATION__", &generation.to_string())
    }
}

const INSTRUMENTATION_TEMPLATE: &str = r#"(function () {
  var channel = __CHANNEL__;
  var generation = __GENERATION__;
  function post(message) {
    message.channel = channel;
    message.generation = generation;
    try { window.parent.postMessage(message, '*'); } catch (e) {}
  }
  function text(args) {
    return Array.prototype.map.call(args, function (arg) {
      try { return String(arg); } catch (e) { return Object.prototype.toString.call(arg); }
    }).join(' ');
  }
  function report(error, source, line, column) {
    var message = error && error.message !== undefined ? String(error.message) : String(error);
    post({
      kind: 'error',
      source: source,
      payload: message,
      line: typeof line === 'number' ? line : null,
      column: typeof column === 'number' ? column : null,
      stack: error && error.stack ? String(error.stack) : null
    });
  }
  ['log', 'warn', 'error'].forEach(function (kind) {
    var original = console[kind];
    console[kind] = function () {
      var message = { kind: kind, payload: text(arguments) };
      if (kind === 'error') { message.source = 'console'; }
      post(message);
      if (original) { original.apply(console, arguments); }
    };
  });
  window.onerror = function (message, url, line, column, error) {
    report(error || message, 'uncaught', line, column);
    return true;
  };
  window.addEventListener('unhandledrejection', function (event) {
    report(event.reason, 'uncaught', null, null);
    event.preventDefault();
  });
  window.__nebulaPreview = {
    fail: function (error) { report(error, 'startup', null, null); }
  };
})();
"#;

const OUTPUT_MIRROR_SCRIPT: &str = r#"(function () {
  var output = document.getElementById('output');
  var log = console.log;
  console.log = function () {
    var line = document.createElement('div');
    line.textContent = Array.prototype.map.call(arguments, String).join(' ');
    output.appendChild(line);
    return log.apply(console, arguments);
  };
})();
"#;

/// Whether `markup` is a full document rather than a body fragment
pub fn is_full_document(markup: &str) -> bool {
    DOCTYPE_TAG.is_match(markup) || HTML_OPEN_TAG.is_match(markup)
}

/// Split markup into (title, body attributes, body content).
///
/// Drops the doctype, `<html>` wrapper and the whole `<head>` block.
fn split_markup(markup: &str) -> (Option<String>, String, String) {
    let title = HEAD_BLOCK
        .find(markup)
        .and_then(|head| TITLE_TAG.captures(head.as_str()))
        .map(|caps| caps[1].trim().to_string())
        .filter(|t| !t.is_empty());

    let without_head = HEAD_BLOCK.replace_all(markup, "");

    if let Some(caps) = BODY_BLOCK.captures(&without_head) {
        return (title, caps[1].to_string(), caps[2].trim().to_string());
    }

    let stripped = DOCTYPE_TAG.replace_all(&without_head, "");
    let stripped = HTML_OPEN_TAG.replace_all(&stripped, "");
    let stripped = HTML_CLOSE_TAG.replace_all(&stripped, "");
    (title, String::new(), stripped.trim().to_string())
}

/// Remove `<script src>` and `<link href>` tags pointing at an inlined file
fn strip_file_references(markup: &str, path: &str) -> String {
    let name = regex::escape(path);
    let script = format!(
        r#"(?is)<script\b[^>]*\bsrc\s*=\s*["']?(?:\./|/)?{}["']?[^>]*>\s*</script\s*>"#,
        name
    );
    let link = format!(
        r#"(?i)<link\b[^>]*\bhref\s*=\s*["']?(?:\./|/)?{}["']?[^>]*>"#,
        name
    );

    let mut result = markup.to_string();
    for pattern in [script, link] {
        if let Ok(re) = Regex::new(&pattern) {
            result = re.replace_all(&result, "").into_owned();
        }
    }
    result
}

pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
