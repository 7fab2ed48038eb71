//! Conversation persistence - one JSON file per conversation plus the
//! last-completed-id pointer.
//!
//! The record is rewritten in full on every turn: at-least-once durability,
//! no partial-write protection beyond what the filesystem gives us. Save
//! failures are logged, never escalated - losing a history file must not
//! lose the answer.

use crate::llm::ChatMessage;
use crate::state::FormState;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Full history and metadata for one multi-turn exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation_id: String,
    pub created_at: f64,
    pub initial_system_prompt: String,
    pub original_form_inputs: FormState,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub last_updated_at: f64,
}

impl ConversationRecord {
    pub fn new(conversation_id: String, system_prompt: String, inputs: FormState) -> Self {
        Self {
            conversation_id,
            created_at: epoch_seconds(),
            initial_system_prompt: system_prompt.clone(),
            original_form_inputs: inputs,
            messages: vec![ChatMessage::system(system_prompt)],
            last_updated_at: 0.0,
        }
    }
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Timestamp-derived conversation identifier, e.g. `1718822378.201331`.
pub fn new_conversation_id() -> String {
    format!("{:.6}", epoch_seconds())
}

/// Handle on the context directory and the last-id pointer. Paths are
/// injectable so tests can run against a temp directory.
pub struct ContextStore {
    dir: PathBuf,
    last_id_path: PathBuf,
}

impl ContextStore {
    pub fn at(dir: PathBuf, last_id_path: PathBuf) -> Self {
        Self { dir, last_id_path }
    }

    pub fn default_location() -> Self {
        Self::at(
            crate::paths::context_dir(),
            crate::paths::last_conversation_id_file(),
        )
    }

    fn record_path(&self, conversation_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", conversation_id))
    }

    /// Rewrite the record's file, stamping `last_updated_at`.
    pub fn save(&self, record: &mut ConversationRecord) {
        record.last_updated_at = epoch_seconds();
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            log::error!("[CONTEXT] Could not create {}: {}", self.dir.display(), e);
            return;
        }
        let path = self.record_path(&record.conversation_id);
        match serde_json::to_string_pretty(record) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::error!("[CONTEXT] Could not save {}: {}", path.display(), e);
                }
            }
            Err(e) => log::error!("[CONTEXT] Could not serialize conversation: {}", e),
        }
    }

    /// Load a conversation by id; `None` when missing or unreadable.
    pub fn load(&self, conversation_id: &str) -> Option<ConversationRecord> {
        let path = self.record_path(conversation_id);
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                log::error!("[CONTEXT] Could not parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// The most recently completed conversation id, if any.
    pub fn last_conversation_id(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.last_id_path).ok()?;
        let id = raw.trim().to_string();
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    /// Overwrite the pointer. Only called on the direct-answer terminal path.
    pub fn set_last_conversation_id(&self, conversation_id: &str) {
        if let Some(parent) = self.last_id_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&self.last_id_path, conversation_id) {
            log::error!(
                "[CONTEXT] Could not update {}: {}",
                self.last_id_path.display(),
                e
            );
        }
    }
}
