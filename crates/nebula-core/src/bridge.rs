//! Runtime-event bridge between the sandbox and the host
//!
//! The sandbox posts JSON envelopes one way to the host. The bridge decodes
//! them into [`RuntimeEvent`]s and hands each one, in arrival order, to a
//! single consumer registered once by the host.

use crate::config::NebulaConfig;
use crate::error::{NebulaError, Result};
use nebula_types::{RuntimeEvent, SandboxEnvelope};
use tokio::sync::mpsc;
use tracing::debug;

/// What to do with events from a document generation other than the current one
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GenerationPolicy {
    /// Accept and display late events from earlier documents
    #[default]
    AcceptAll,
    /// Drop them
    DiscardStale,
}

/// An event handed to the host consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub generation: u64,
    pub event: RuntimeEvent,
}

/// What happened to one incoming message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Delivered,
    /// Not a preview message, or malformed
    Ignored,
    /// From an earlier document and the policy discards those
    Stale,
    /// No consumer registered yet
    NoConsumer,
}

type Consumer = Box<dyn FnMut(Delivery) + Send>;

/// Host end of the sandbox message channel
pub struct RuntimeBridge {
    channel: String,
    policy: GenerationPolicy,
    current_generation: u64,
    consumer: Option<Consumer>,
}

impl std::fmt::Debug for RuntimeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeBridge")
            .field("channel", &self.channel)
            .field("policy", &self.policy)
            .field("current_generation", &self.current_generation)
            .field("has_consumer", &self.consumer.is_some())
            .finish()
    }
}

impl RuntimeBridge {
    pub fn new(channel: impl Into<String>, policy: GenerationPolicy) -> Self {
        Self {
            channel: channel.into(),
            policy,
            current_generation: 0,
            consumer: None,
        }
    }

    pub fn from_config(config: &NebulaConfig) -> Self {
        let policy = if config.bridge.discard_stale {
            GenerationPolicy::DiscardStale
        } else {
            GenerationPolicy::AcceptAll
        };
        Self::new(config.preview.channel.clone(), policy)
    }

    /// Register the consumer. Only one may be registered per bridge.
    pub fn register<F>(&mut self, consumer: F) -> Result<()>
    where
        F: FnMut(Delivery) + Send + 'static,
    {
        if self.consumer.is_some() {
            return Err(NebulaError::Bridge(
                "a runtime event consumer is already registered".to_string(),
            ));
        }
        self.consumer = Some(Box::new(consumer));
        Ok(())
    }

    /// Record the generation of the document just handed to the sandbox
    pub fn set_generation(&mut self, generation: u64) {
        self.current_generation = generation;
    }

    pub fn generation(&self) -> u64 {
        self.current_generation
    }

    /// Decode and dispatch one raw posted message
    pub fn receive(&mut self, raw: &str) -> Dispatch {
        match SandboxEnvelope::from_json(raw) {
            Ok(envelope) => self.deliver(envelope),
            Err(e) => {
                debug!("Ignoring non-preview message: {}", e);
                Dispatch::Ignored
            }
        }
    }

    /// Dispatch an already decoded envelope
    pub fn deliver(&mut self, envelope: SandboxEnvelope) -> Dispatch {
        if envelope.channel != self.channel {
            debug!("Ignoring message on channel '{}'", envelope.channel);
            return Dispatch::Ignored;
        }
        if self.policy == GenerationPolicy::DiscardStale
            && envelope.generation != self.current_generation
        {
            debug!(
                "Discarding event from generation {} (current {})",
                envelope.generation, self.current_generation
            );
            return Dispatch::Stale;
        }

        match self.consumer.as_mut() {
            Some(consumer) => {
                consumer(Delivery {
                    generation: envelope.generation,
                    event: envelope.event,
                });
                Dispatch::Delivered
            }
            None => {
                debug!("No consumer registered, dropping {} event", envelope.event.kind());
                Dispatch::NoConsumer
            }
        }
    }

    /// Drain raw messages from a sandbox port until every sender is gone.
    ///
    /// Returns the number of delivered events.
    pub async fn pump(&mut self, mut rx: mpsc::UnboundedReceiver<String>) -> usize {
        let mut delivered = 0;
        while let Some(raw) = rx.recv().await {
            if self.receive(&raw) == Dispatch::Delivered {
                delivered += 1;
            }
        }
        delivered
    }
}

/// Sending half handed to whatever relays sandbox messages
#[derive(Debug, Clone)]
pub struct SandboxPort {
    tx: mpsc::UnboundedSender<String>,
}

impl SandboxPort {
    pub fn post(&self, raw: impl Into<String>) -> Result<()> {
        self.tx
            .send(raw.into())
            .map_err(|_| NebulaError::Bridge("the host side of the bridge is closed".to_string()))
    }
}

/// Create a one-way, order-preserving message channel for [`RuntimeBridge::pump`]
pub fn message_channel() -> (SandboxPort, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SandboxPort { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_types::ErrorSource;
    use std::sync::{Arc, Mutex};

    fn collecting_bridge(policy: GenerationPolicy) -> (RuntimeBridge, Arc<Mutex<Vec<Delivery>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut bridge = RuntimeBridge::new("nebula-preview", policy);
        bridge
            .register(move |delivery| sink.lock().unwrap().push(delivery))
            .unwrap();
        (bridge, seen)
    }

    #[test]
    fn test_console_log_scenario() {
        let (mut bridge, seen) = collecting_bridge(GenerationPolicy::AcceptAll);
        let raw = r#"{"kind":"log","payload":"1 a true","channel":"nebula-preview","generation":0}"#;

        assert_eq!(bridge.receive(raw), Dispatch::Delivered);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].event, RuntimeEvent::log("1 a true"));
    }

    #[test]
    fn test_top_level_throw_scenario() {
        let (mut bridge, seen) = collecting_bridge(GenerationPolicy::AcceptAll);
        let raw = r#"{"kind":"error","source":"startup","payload":"boom","line":null,"column":null,"stack":"Error: boom","channel":"nebula-preview","generation":1}"#;

        assert_eq!(bridge.receive(raw), Dispatch::Delivered);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].event.is_error());
        assert!(seen[0].event.payload().contains("boom"));
        match &seen[0].event {
            RuntimeEvent::Error { source, .. } => assert_eq!(*source, ErrorSource::Startup),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_foreign_and_malformed_messages_ignored() {
        let (mut bridge, seen) = collecting_bridge(GenerationPolicy::AcceptAll);

        assert_eq!(
            bridge.receive(r#"{"kind":"log","payload":"x","channel":"devtools"}"#),
            Dispatch::Ignored
        );
        assert_eq!(bridge.receive(r#"{"type":"ntml-action"}"#), Dispatch::Ignored);
        assert_eq!(bridge.receive("garbage"), Dispatch::Ignored);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stale_generation_accepted_by_default() {
        let (mut bridge, seen) = collecting_bridge(GenerationPolicy::AcceptAll);
        bridge.set_generation(5);

        let late = SandboxEnvelope::new("nebula-preview", 4, RuntimeEvent::warn("late"));
        assert_eq!(bridge.deliver(late), Dispatch::Delivered);
        assert_eq!(seen.lock().unwrap()[0].generation, 4);
    }

    #[test]
    fn test_stale_generation_discarded_when_configured() {
        let (mut bridge, seen) = collecting_bridge(GenerationPolicy::DiscardStale);
        bridge.set_generation(5);

        let late = SandboxEnvelope::new("nebula-preview", 4, RuntimeEvent::warn("late"));
        let current = SandboxEnvelope::new("nebula-preview", 5, RuntimeEvent::log("now"));
        assert_eq!(bridge.deliver(late), Dispatch::Stale);
        assert_eq!(bridge.deliver(current), Dispatch::Delivered);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_single_consumer_only() {
        let mut bridge = RuntimeBridge::new("nebula-preview", GenerationPolicy::AcceptAll);
        let envelope = SandboxEnvelope::new("nebula-preview", 0, RuntimeEvent::log("x"));
        assert_eq!(bridge.deliver(envelope), Dispatch::NoConsumer);

        bridge.register(|_| {}).unwrap();
        assert!(matches!(bridge.register(|_| {}), Err(NebulaError::Bridge(_))));
    }

    #[test]
    fn test_from_config() {
        let mut config = NebulaConfig::new("demo");
        config.bridge.discard_stale = true;
        config.preview.channel = "custom".to_string();

        let bridge = RuntimeBridge::from_config(&config);
        assert_eq!(bridge.policy, GenerationPolicy::DiscardStale);
        assert_eq!(bridge.channel, "custom");
    }

    #[tokio::test]
    async fn test_pump_preserves_order() {
        let (mut bridge, seen) = collecting_bridge(GenerationPolicy::AcceptAll);
        let (port, rx) = message_channel();

        for i in 0..5 {
            let envelope = SandboxEnvelope::new("nebula-preview", 0, RuntimeEvent::log(i.to_string()));
            port.post(envelope.to_json().unwrap()).unwrap();
        }
        port.post("not a preview message").unwrap();
        drop(port);

        assert_eq!(bridge.pump(rx).await, 5);
        let payloads: Vec<_> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.event.payload().to_string())
            .collect();
        assert_eq!(payloads, vec!["0", "1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_post_after_host_closed() {
        let (port, rx) = message_channel();
        drop(rx);
        assert!(port.post("{}").is_err());
    }
}
