//! Runtime events posted by the preview sandbox

use crate::WireError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event kind as seen by the host console
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEventKind {
    Log,
    Warn,
    Error,
}

impl RuntimeEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeEventKind::Log => "log",
            RuntimeEventKind::Warn => "warn",
            RuntimeEventKind::Error => "error",
        }
    }
}

impl std::fmt::Display for RuntimeEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an error event was raised inside the sandbox
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    /// `console.error(...)`
    #[default]
    Console,
    /// Global uncaught-error handler
    Uncaught,
    /// try/catch around the injected script's initial run
    Startup,
}

/// A single console call or error observed in the sandbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RuntimeEvent {
    Log {
        payload: String,
    },
    Warn {
        payload: String,
    },
    Error {
        payload: String,
        #[serde(default)]
        source: ErrorSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
}

impl RuntimeEvent {
    pub fn log(payload: impl Into<String>) -> Self {
        RuntimeEvent::Log {
            payload: payload.into(),
        }
    }

    pub fn warn(payload: impl Into<String>) -> Self {
        RuntimeEvent::Warn {
            payload: payload.into(),
        }
    }

    /// Error event without location information
    pub fn error(payload: impl Into<String>, source: ErrorSource) -> Self {
        RuntimeEvent::Error {
            payload: payload.into(),
            source,
            line: None,
            column: None,
            stack: None,
        }
    }

    pub fn kind(&self) -> RuntimeEventKind {
        match self {
            RuntimeEvent::Log { .. } => RuntimeEventKind::Log,
            RuntimeEvent::Warn { .. } => RuntimeEventKind::Warn,
            RuntimeEvent::Error { .. } => RuntimeEventKind::Error,
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            RuntimeEvent::Log { payload }
            | RuntimeEvent::Warn { payload }
            | RuntimeEvent::Error { payload, .. } => payload,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RuntimeEvent::Error { .. })
    }

    /// Human-readable form: the payload, plus location and stack for errors
    pub fn describe(&self) -> String {
        match self {
            RuntimeEvent::Error {
                payload,
                line,
                column,
                stack,
                ..
            } => {
                let mut text = payload.clone();
                match (line, column) {
                    (Some(l), Some(c)) => text.push_str(&format!(" (line {}, column {})", l, c)),
                    (Some(l), None) => text.push_str(&format!(" (line {})", l)),
                    _ => {}
                }
                if let Some(stack) = stack.as_deref().filter(|s| !s.trim().is_empty()) {
                    text.push('\n');
                    text.push_str(stack.trim_end());
                }
                text
            }
            other => other.payload().to_string(),
        }
    }
}

/// Message shape posted by the instrumentation script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxEnvelope {
    /// Tag identifying preview traffic on a shared message channel
    pub channel: String,
    /// Document generation the sender was composed as
    #[serde(default)]
    pub generation: u64,
    #[serde(flatten)]
    pub event: RuntimeEvent,
}

impl SandboxEnvelope {
    pub fn new(channel: impl Into<String>, generation: u64, event: RuntimeEvent) -> Self {
        Self {
            channel: channel.into(),
            generation,
            event,
        }
    }

    /// Decode one posted message
    pub fn from_json(raw: &str) -> Result<Self, WireError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(WireError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// An event as recorded by the host console
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub generation: u64,
    pub event: RuntimeEvent,
    pub received_at: DateTime<Utc>,
}

impl ConsoleEntry {
    pub fn new(generation: u64, event: RuntimeEvent) -> Self {
        Self {
            generation,
            event,
            received_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_log_message() {
        let raw = r#"{"channel":"nebula-preview","generation":2,"kind":"log","payload":"1 a true"}"#;
        let envelope = SandboxEnvelope::from_json(raw).unwrap();

        assert_eq!(envelope.channel, "nebula-preview");
        assert_eq!(envelope.generation, 2);
        assert_eq!(envelope.event, RuntimeEvent::log("1 a true"));
        assert_eq!(envelope.event.kind(), RuntimeEventKind::Log);
    }

    #[test]
    fn test_decode_error_with_nulls() {
        let raw = r#"{"channel":"nebula-preview","generation":1,"kind":"error","payload":"boom","source":"startup","line":null,"column":null,"stack":"Error: boom\n    at about:srcdoc:20:7"}"#;
        let envelope = SandboxEnvelope::from_json(raw).unwrap();

        match &envelope.event {
            RuntimeEvent::Error {
                payload,
                source,
                line,
                stack,
                ..
            } => {
                assert_eq!(payload, "boom");
                assert_eq!(*source, ErrorSource::Startup);
                assert_eq!(*line, None);
                assert!(stack.as_deref().unwrap().contains("about:srcdoc"));
            }
            other => panic!("expected error event, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_generation_defaults_to_zero() {
        let raw = r#"{"channel":"c","kind":"warn","payload":"careful"}"#;
        let envelope = SandboxEnvelope::from_json(raw).unwrap();
        assert_eq!(envelope.generation, 0);
        assert_eq!(envelope.event.payload(), "careful");
    }

    #[test]
    fn test_rejects_foreign_shapes() {
        assert!(matches!(
            SandboxEnvelope::from_json("[1,2]"),
            Err(WireError::NotAnObject)
        ));
        assert!(SandboxEnvelope::from_json(r#"{"channel":"c","kind":"info","payload":"x"}"#).is_err());
        assert!(SandboxEnvelope::from_json("not json").is_err());
    }

    #[test]
    fn test_describe_error_location() {
        let event = RuntimeEvent::Error {
            payload: "x is not defined".to_string(),
            source: ErrorSource::Uncaught,
            line: Some(12),
            column: Some(5),
            stack: None,
        };
        assert_eq!(event.describe(), "x is not defined (line 12, column 5)");
        assert!(event.is_error());
        assert_eq!(RuntimeEvent::log("hi").describe(), "hi");
    }

    #[test]
    fn test_encode_skips_empty_location() {
        let envelope = SandboxEnvelope::new("c", 4, RuntimeEvent::error("boom", ErrorSource::Startup));
        let json = envelope.to_json().unwrap();
        assert!(json.contains(r#""kind":"error""#));
        assert!(json.contains(r#""source":"startup""#));
        assert!(!json.contains("line"));
    }
}
