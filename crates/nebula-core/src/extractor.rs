//! Response-to-file extraction
//!
//! Splits an assistant response into fenced fragments, resolves each one to a
//! project path, and merges the result into a [`ProjectFileTable`].

use crate::config::ExtractorConfig;
use crate::fence::{tokenize, trim_blank_lines};
use crate::resolve::{FragmentTarget, PathPolicy};
use crate::types::{
    AppliedWrite, ExtractionSummary, FileWrite, Language, ProjectFileTable, WriteOrigin,
};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// A single fenced block found in response text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFragment {
    /// Fence language tag as written, `None` when the fence had none
    pub language: Option<String>,
    /// Path named by a filename marker before the fence
    pub explicit_path: Option<String>,
    /// Body with leading and trailing blank lines removed
    pub content: String,
}

/// Writes planned for one pass, plus how many fragments were dropped
#[derive(Debug, Clone, Default)]
pub struct ExtractionPlan {
    pub writes: Vec<FileWrite>,
    pub skipped: usize,
}

/// Turns assistant responses into file writes
#[derive(Debug, Clone, Default)]
pub struct CodeBlockExtractor {
    policy: PathPolicy,
}

impl CodeBlockExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            policy: PathPolicy::new(config),
        }
    }

    /// Tokenize `text` and attach filename markers to each fence
    pub fn fragments(&self, text: &str) -> Vec<CodeFragment> {
        let mut fragments = Vec::new();
        let mut previous_end = 0;

        for fence in tokenize(text) {
            let preceding = &text[previous_end..fence.range.start];
            previous_end = fence.range.end;

            fragments.push(CodeFragment {
                language: Some(fence.language.to_string()).filter(|l| !l.is_empty()),
                explicit_path: self.policy.find_marker(preceding),
                content: trim_blank_lines(fence.body).to_string(),
            });
        }

        fragments
    }

    /// Plan the writes for `text` against the current table.
    ///
    /// Earlier writes in the same pass count as existing files when later
    /// fragments look for a language's alternate names.
    pub fn plan(&self, text: &str, table: &ProjectFileTable) -> ExtractionPlan {
        let mut plan = ExtractionPlan::default();
        let mut seen_languages: HashSet<Language> = HashSet::new();
        let mut pending: Vec<String> = Vec::new();

        for fragment in self.fragments(text) {
            let target = self
                .policy
                .resolve(fragment.explicit_path.as_deref(), fragment.language.as_deref());

            let (path, origin) = match target {
                FragmentTarget::ExplicitPath(path) => (path, WriteOrigin::Explicit),
                FragmentTarget::LanguageInferred(language) => {
                    if !seen_languages.insert(language) {
                        debug!("Skipping additional {} fragment", language);
                        plan.skipped += 1;
                        continue;
                    }
                    let path = self.policy.inferred_path(language, |name| {
                        table.contains(name) || pending.iter().any(|p| p == name)
                    });
                    (path, WriteOrigin::Inferred(language))
                }
                FragmentTarget::Unresolved => {
                    debug!(
                        "Skipping fragment with no filename and language {:?}",
                        fragment.language
                    );
                    plan.skipped += 1;
                    continue;
                }
            };

            pending.push(path.clone());
            plan.writes.push(FileWrite {
                path,
                content: fragment.content,
                origin,
            });
        }

        plan
    }

    /// Ordered `(path, content)` writes for `text`, without applying them
    pub fn extract(&self, text: &str, table: &ProjectFileTable) -> Vec<FileWrite> {
        self.plan(text, table).writes
    }

    /// Extract `text` and apply every write to `table` in document order
    pub fn merge(&self, text: &str, table: &mut ProjectFileTable) -> ExtractionSummary {
        let plan = self.plan(text, table);
        let mut summary = ExtractionSummary {
            writes: Vec::with_capacity(plan.writes.len()),
            skipped: plan.skipped,
        };

        for write in plan.writes {
            match table.write(&write.path, write.content) {
                Ok(outcome) => summary.writes.push(AppliedWrite {
                    path: write.path,
                    origin: write.origin,
                    outcome,
                }),
                Err(e) => {
                    warn!("Dropping write: {}", e);
                    summary.skipped += 1;
                }
            }
        }

        if !summary.is_empty() {
            info!(
                "Applied {} write(s), {} changed, {} skipped",
                summary.writes.len(),
                summary.changed(),
                summary.skipped
            );
        }

        summary
    }
}
