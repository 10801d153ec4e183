//! Host-side preview session
//!
//! Owns the project file table, the document generation counter and the
//! console log fed by the runtime-event bridge.

use crate::bridge::Delivery;
use crate::config::NebulaConfig;
use crate::extractor::CodeBlockExtractor;
use crate::preview::{PreviewComposer, PreviewDocument};
use crate::types::{ExtractionSummary, ProjectFileTable};
use nebula_types::{ConsoleEntry, RepairFile, RepairRequest};
use tracing::{debug, info};
use uuid::Uuid;

pub struct PreviewSession {
    id: Uuid,
    files: ProjectFileTable,
    extractor: CodeBlockExtractor,
    composer: PreviewComposer,
    generation: u64,
    console: Vec<ConsoleEntry>,
    stream: String,
}

impl PreviewSession {
    pub fn new(config: &NebulaConfig) -> Self {
        Self::with_files(config, ProjectFileTable::new())
    }

    /// Start a session over files loaded elsewhere
    pub fn with_files(config: &NebulaConfig, files: ProjectFileTable) -> Self {
        Self {
            id: Uuid::new_v4(),
            files,
            extractor: CodeBlockExtractor::new(&config.extractor),
            composer: PreviewComposer::new(&config.preview),
            generation: 0,
            console: Vec::new(),
            stream: String::new(),
        }
    }

    /// Swap in new extractor and composer settings, keeping files, console
    /// and the generation counter
    pub fn reconfigure(&mut self, config: &NebulaConfig) {
        self.extractor = CodeBlockExtractor::new(&config.extractor);
        self.composer = PreviewComposer::new(&config.preview);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn files(&self) -> &ProjectFileTable {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut ProjectFileTable {
        &mut self.files
    }

    pub fn composer(&self) -> &PreviewComposer {
        &self.composer
    }

    /// Generation of the most recently composed document, 0 before the first
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Merge a complete assistant response into the file table
    pub fn apply_response(&mut self, text: &str) -> ExtractionSummary {
        self.extractor.merge(text, &mut self.files)
    }

    /// Append a streamed delta and re-extract everything received so far.
    ///
    /// A fence left open by earlier deltas is written on the delta that
    /// closes it.
    pub fn push_delta(&mut self, delta: &str) -> ExtractionSummary {
        self.stream.push_str(delta);
        self.extractor.merge(&self.stream, &mut self.files)
    }

    /// End the current stream and return its full text
    pub fn finish_stream(&mut self) -> String {
        debug!("Stream finished after {} bytes", self.stream.len());
        std::mem::take(&mut self.stream)
    }

    pub fn streaming_text(&self) -> &str {
        &self.stream
    }

    /// Compose a fresh document under the next generation number
    pub fn compose(&mut self) -> PreviewDocument {
        self.generation += 1;
        let document = self.composer.compose(&self.files, self.generation);
        info!(
            "Session {} composed generation {} from {:?}",
            self.id,
            self.generation,
            document.sources()
        );
        document
    }

    /// Append one bridge delivery to the console
    pub fn record(&mut self, delivery: Delivery) {
        self.console
            .push(ConsoleEntry::new(delivery.generation, delivery.event));
    }

    pub fn console(&self) -> &[ConsoleEntry] {
        &self.console
    }

    pub fn last_error(&self) -> Option<&ConsoleEntry> {
        self.console.iter().rev().find(|entry| entry.event.is_error())
    }

    pub fn clear_console(&mut self) {
        self.console.clear();
    }

    /// Repair body for the last recorded error, if there is one
    pub fn repair_request(&self, instruction: Option<&str>) -> Option<RepairRequest> {
        let entry = self.last_error()?;
        let files = self
            .files
            .iter()
            .map(|f| RepairFile {
                path: f.path.clone(),
                content: f.content.clone(),
            })
            .collect();

        let request = RepairRequest::new(entry.event.clone(), entry.generation, files);
        Some(match instruction {
            Some(text) => request.with_instruction(text),
            None => request,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_types::{ErrorSource, RuntimeEvent};

    fn session() -> PreviewSession {
        PreviewSession::new(&NebulaConfig::new("test"))
    }

    #[test]
    fn test_apply_response_then_compose() {
        let mut session = session();
        session.apply_response("```html\n<h1>Hi</h1>\n```\n```css\nh1{color:red}\n```");

        let first = session.compose();
        let second = session.compose();
        assert_eq!(first.generation(), 1);
        assert_eq!(second.generation(), 2);
        assert!(first.as_str().contains("<h1>Hi</h1>"));
        assert!(first.as_str().contains("h1{color:red}"));
    }

    #[test]
    fn test_streamed_fence_written_when_closed() {
        let mut session = session();

        assert!(session.push_delta("Here you go:\n```js\nconsole.").is_empty());
        assert!(session.files().is_empty());

        assert!(session.push_delta("log(1)\n").is_empty());

        let summary = session.push_delta("```\nDone.");
        assert!(summary.touches("script.js"));
        assert_eq!(session.files().content("script.js"), Some("console.log(1)"));

        let text = session.finish_stream();
        assert!(text.ends_with("Done."));
        assert!(session.streaming_text().is_empty());
    }

    #[test]
    fn test_streaming_matches_single_pass() {
        let text = "**index.html**\n```html\n<p>x</p>\n```\n```css\np{}\n```";

        let mut streamed = session();
        for chunk in text.as_bytes().chunks(7) {
            streamed.push_delta(std::str::from_utf8(chunk).unwrap());
        }

        let mut whole = session();
        whole.apply_response(text);
        assert_eq!(streamed.files(), whole.files());
    }

    #[test]
    fn test_reconfigure_keeps_generation() {
        let mut session = session();
        session.compose();

        let mut config = NebulaConfig::new("test");
        config.preview.channel = "other-channel".to_string();
        session.reconfigure(&config);

        let document = session.compose();
        assert_eq!(document.generation(), 2);
        assert_eq!(session.composer().channel(), "other-channel");
        assert!(document.as_str().contains("\"other-channel\""));
    }

    #[test]
    fn test_console_and_last_error() {
        let mut session = session();
        assert!(session.last_error().is_none());
        assert!(session.repair_request(None).is_none());

        session.record(Delivery {
            generation: 1,
            event: RuntimeEvent::error("first", ErrorSource::Console),
        });
        session.record(Delivery {
            generation: 1,
            event: RuntimeEvent::log("ok"),
        });
        session.record(Delivery {
            generation: 2,
            event: RuntimeEvent::error("boom", ErrorSource::Startup),
        });

        assert_eq!(session.console().len(), 3);
        let last = session.last_error().unwrap();
        assert_eq!(last.event.payload(), "boom");
        assert_eq!(last.generation, 2);

        session.clear_console();
        assert!(session.console().is_empty());
    }

    #[test]
    fn test_repair_request_carries_files() {
        let mut session = session();
        session.apply_response("```js\nthrow new Error('boom')\n```");
        session.record(Delivery {
            generation: 1,
            event: RuntimeEvent::error("boom", ErrorSource::Startup),
        });

        let request = session.repair_request(Some("keep the layout")).unwrap();
        assert_eq!(request.error, "boom");
        assert_eq!(request.files.len(), 1);
        assert_eq!(request.files[0].path, "script.js");
        assert_eq!(request.instruction.as_deref(), Some("keep the layout"));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["files"][0]["content"], "throw new Error('boom')");
    }
}
