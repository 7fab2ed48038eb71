//! Action and task catalog - JSON definition files merged over defaults.
//!
//! Actions are one-shot text transformations (rephrase, fix grammar, …);
//! tasks are conversational configurations (customer support). Both live as
//! `<name>.json` under the gpt_tools dir. A missing or malformed file never
//! fails the caller: it logs a warning and yields the default schema, so the
//! pipeline always has something to work with.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_ACTION_PROMPT_TEMPLATE: &str =
    "Process the following text in {target_language}: \n\n\"{input_text}\"";

/// A named text-transformation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    #[serde(default = "default_action_name")]
    pub name: String,
    #[serde(default)]
    pub requires_second_form: bool,
    #[serde(default = "default_action_prompt_template")]
    pub prompt_template: String,
    #[serde(default = "default_action_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            name: default_action_name(),
            requires_second_form: false,
            prompt_template: default_action_prompt_template(),
            temperature: default_action_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// A named conversational configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_task_name")]
    pub name: String,
    #[serde(default)]
    pub requires_second_form: bool,
    #[serde(default)]
    pub second_form_fields: Vec<String>,
    #[serde(default = "default_system_message_template")]
    pub system_message_template: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_task_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-choice instruction fragments, looked up by the user's selection.
    #[serde(default)]
    pub sentiment_instructions: HashMap<String, String>,
    #[serde(default)]
    pub relation_instructions: HashMap<String, String>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            name: default_task_name(),
            requires_second_form: false,
            second_form_fields: Vec::new(),
            system_message_template: default_system_message_template(),
            description: default_description(),
            temperature: default_task_temperature(),
            max_tokens: default_max_tokens(),
            sentiment_instructions: HashMap::new(),
            relation_instructions: HashMap::new(),
        }
    }
}

fn default_action_name() -> String {
    "Unknown Action".to_string()
}
fn default_action_prompt_template() -> String {
    DEFAULT_ACTION_PROMPT_TEMPLATE.to_string()
}
fn default_action_temperature() -> f32 {
    0.6
}
fn default_task_name() -> String {
    "Unknown Task".to_string()
}
fn default_system_message_template() -> String {
    "You are a helpful AI assistant.".to_string()
}
fn default_description() -> String {
    "No description provided.".to_string()
}
fn default_task_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    2000
}

/// Load an action definition, defaults applied for absent keys.
pub fn get_action(name: &str) -> ActionConfig {
    load_merged(&crate::paths::actions_dir(), name, "action")
}

/// Load a task definition, defaults applied for absent keys.
pub fn get_task(name: &str) -> TaskConfig {
    load_merged(&crate::paths::tasks_dir(), name, "task")
}

/// Shared loader: read `<dir>/<name>.json` and deserialize with per-field
/// defaults. Any failure falls back to the default schema.
fn load_merged<T: Default + serde::de::DeserializeOwned>(dir: &Path, name: &str, kind: &str) -> T {
    if name.is_empty() || name == "NoActionsFound" || name == "NoTasksFound" {
        return T::default();
    }
    let path = dir.join(format!("{}.json", name));
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => {
            log::warn!("[CATALOG] {} file not found: {}", kind, path.display());
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("[CATALOG] invalid {} file {}: {}", kind, path.display(), e);
            T::default()
        }
    }
}

/// Names of all `*.json` definitions in a directory, sorted, extensions
/// stripped. The `empty_marker` keeps the espanso dropdown from breaking
/// when the directory has no entries yet.
fn list_definitions(dir: &Path, empty_marker: &str) -> Vec<String> {
    let _ = std::fs::create_dir_all(dir);
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
                .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    if names.is_empty() {
        return vec![empty_marker.to_string()];
    }
    names
}

pub fn list_actions() -> Vec<String> {
    list_definitions(&crate::paths::actions_dir(), "NoActionsFound")
}

pub fn list_tasks() -> Vec<String> {
    list_definitions(&crate::paths::tasks_dir(), "NoTasksFound")
}

/// Tone names from `gpt_tools/tone/*.txt`, sorted, extensions stripped.
pub fn list_tones() -> Vec<String> {
    let dir = crate::paths::tone_dir();
    let mut names: Vec<String> = match std::fs::read_dir(&dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "txt").unwrap_or(false))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect(),
        Err(e) => return vec![format!("ErrorListingTones: {}", e)],
    };
    names.sort();
    if names.is_empty() {
        return vec!["NoTonesFound".to_string()];
    }
    names
}

/// FAQ filenames (with extension) from the FAQ dir, with "None" always first
/// so the dropdown has an opt-out.
pub fn list_faqs() -> Vec<String> {
    let mut names = vec!["None".to_string()];
    if let Ok(entries) = std::fs::read_dir(crate::paths::faq_dir()) {
        let mut files: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "md").unwrap_or(false))
            .filter_map(|p| p.file_name().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        files.sort();
        names.extend(files);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_action_returns_default_schema() {
        let dir = temp_dir("gpt-tools-catalog-missing");
        let config: ActionConfig = load_merged(&dir, "does-not-exist", "action");
        assert_eq!(config, ActionConfig::default());
        assert_eq!(config.name, "Unknown Action");
        assert_eq!(config.max_tokens, 2000);
        assert!((config.temperature - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_action_merges_over_defaults() {
        let dir = temp_dir("gpt-tools-catalog-partial");
        fs::write(
            dir.join("Fix grammar.json"),
            r#"{"name": "Fix grammar", "temperature": 0.2}"#,
        )
        .unwrap();
        let config: ActionConfig = load_merged(&dir, "Fix grammar", "action");
        assert_eq!(config.name, "Fix grammar");
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        // Unspecified fields come from the default schema.
        assert_eq!(config.prompt_template, DEFAULT_ACTION_PROMPT_TEMPLATE);
        assert_eq!(config.max_tokens, 2000);
    }

    #[test]
    fn malformed_task_returns_default_schema() {
        let dir = temp_dir("gpt-tools-catalog-malformed");
        fs::write(dir.join("Broken.json"), "{oops").unwrap();
        let config: TaskConfig = load_merged(&dir, "Broken", "task");
        assert_eq!(config, TaskConfig::default());
        assert_eq!(config.system_message_template, "You are a helpful AI assistant.");
    }

    #[test]
    fn task_instruction_tables_deserialize() {
        let dir = temp_dir("gpt-tools-catalog-tables");
        fs::write(
            dir.join("Support.json"),
            r#"{
                "name": "Customer Support Task",
                "requires_second_form": true,
                "sentiment_instructions": {"positif": "Be upbeat."},
                "relation_instructions": {"client": "Address a customer."}
            }"#,
        )
        .unwrap();
        let config: TaskConfig = load_merged(&dir, "Support", "task");
        assert!(config.requires_second_form);
        assert_eq!(config.sentiment_instructions["positif"], "Be upbeat.");
        assert_eq!(config.relation_instructions["client"], "Address a customer.");
    }

    #[test]
    fn listing_sorts_and_strips_extensions() {
        let dir = temp_dir("gpt-tools-catalog-list");
        fs::write(dir.join("b.json"), "{}").unwrap();
        fs::write(dir.join("a.json"), "{}").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();
        assert_eq!(list_definitions(&dir, "NoActionsFound"), vec!["a", "b"]);
    }

    #[test]
    fn default_matches_empty_json_deserialization() {
        // The explicit Default impls must stay in sync with the serde
        // per-field defaults; "{}" exercises every default fn.
        let action: ActionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(action, ActionConfig::default());
        let task: TaskConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(task, TaskConfig::default());
    }

    #[test]
    fn empty_listing_yields_marker() {
        let dir = temp_dir("gpt-tools-catalog-empty");
        assert_eq!(list_definitions(&dir, "NoTasksFound"), vec!["NoTasksFound"]);
    }
}
