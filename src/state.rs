//! Inter-step form state - a single JSON mailbox between espanso invocations.
//!
//! Step 1 creates the file, step 2 amends it, the final `chat` step consumes
//! and deletes it. The host runs one pipeline at a time, so there is exactly
//! one writer and one reader; no locking is needed.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Form field values carried between pipeline steps.
///
/// Every field defaults to empty so a partially written file still loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    #[serde(default)]
    pub conversation_mode: String,
    #[serde(default)]
    pub active_conversation_id: String,
    #[serde(default)]
    pub task_objective: String,
    #[serde(default)]
    pub output_language: String,
    #[serde(default)]
    pub initial_prompt: String,
    #[serde(default)]
    pub desired_answer_sketch: String,
    #[serde(default)]
    pub include_screenshot: String,
    // Step 2 additions (customer support flow).
    #[serde(default)]
    pub sentiment: String,
    #[serde(default)]
    pub relation: String,
    #[serde(default)]
    pub selected_faq: String,
}

impl FormState {
    pub fn is_empty(&self) -> bool {
        *self == FormState::default()
    }

    pub fn wants_screenshot(&self) -> bool {
        self.include_screenshot.eq_ignore_ascii_case("true")
    }
}

/// State I/O failures are the one fatal error class: the handlers exit
/// non-zero when the mailbox cannot be written.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to delete state file {path}: {source}")]
    Delete {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Handle on the state file. The path is injectable so tests can point it at
/// a temp directory instead of the real config dir.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// The production location under the espanso config dir.
    pub fn default_location() -> Self {
        Self::at(crate::paths::state_file())
    }

    /// Serialize and overwrite. Creates the parent directory if needed.
    pub fn save(&self, state: &FormState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StateError::Write {
                path: self.path.clone(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json).map_err(|e| StateError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        log::info!("[STATE] Saved form state to {}", self.path.display());
        Ok(())
    }

    /// Load the state, or the empty default when the file is absent or
    /// unreadable. A corrupt file is logged but never fails the caller.
    pub fn load(&self) -> FormState {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    log::error!("[STATE] Unparseable state file {}: {}", self.path.display(), e);
                    FormState::default()
                }
            },
            Err(_) => FormState::default(),
        }
    }

    /// Remove the file if present.
    pub fn delete(&self) -> Result<(), StateError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| StateError::Delete {
                path: self.path.clone(),
                source: e,
            })?;
            log::info!("[STATE] Deleted state file {}", self.path.display());
        }
        Ok(())
    }
}
