//! Path resolution for everything stored under the espanso config directory.
//!
//! Espanso exports `ESPANSO_CONFIG_DIR` when it runs a script; outside of
//! espanso (direct testing) we fall back to the platform config dir.
//! All tool data lives under `<config>/gpt_tools/`.

use std::path::PathBuf;

/// Resolve the espanso config directory.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ESPANSO_CONFIG_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("espanso")
}

/// Root of all tool data: `<config>/gpt_tools/`.
pub fn tools_dir() -> PathBuf {
    config_dir().join("gpt_tools")
}

pub fn actions_dir() -> PathBuf {
    tools_dir().join("actions")
}

pub fn tasks_dir() -> PathBuf {
    tools_dir().join("tasks")
}

pub fn tone_dir() -> PathBuf {
    tools_dir().join("tone")
}

/// FAQ reference files. The selection dropdown and the prompt builders both
/// read from here.
pub fn faq_dir() -> PathBuf {
    tools_dir().join("faq")
}

/// Per-conversation history files, one JSON file per conversation id.
pub fn context_dir() -> PathBuf {
    tools_dir().join("context")
}

/// The inter-step form state mailbox.
pub fn state_file() -> PathBuf {
    tools_dir().join("gpt_form_state.json")
}

/// Pointer to the most recently completed conversation.
pub fn last_conversation_id_file() -> PathBuf {
    tools_dir().join("last_conversation_id.txt")
}
