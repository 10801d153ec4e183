//! Auto-repair request body

use crate::event::RuntimeEvent;
use serde::{Deserialize, Serialize};

/// One file sent along with a repair request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairFile {
    pub path: String,
    pub content: String,
}

/// Body for the external fix endpoint, built from the last runtime error
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairRequest {
    /// Error text including location and stack when known
    pub error: String,
    pub event: RuntimeEvent,
    pub generation: u64,
    pub files: Vec<RepairFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

impl RepairRequest {
    pub fn new(event: RuntimeEvent, generation: u64, files: Vec<RepairFile>) -> Self {
        Self {
            error: event.describe(),
            event,
            generation,
            files,
            instruction: None,
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }
}
