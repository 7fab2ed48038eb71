//! Form-step handlers - the glue between the host's form windows and the
//! final processing step.
//!
//! The host exports each submitted form field as an environment variable
//! and runs this binary; the handler folds the fields into the state
//! mailbox and fires the trigger for the next step in the chain.

use crate::catalog;
use crate::conversation::{new_conversation_id, ContextStore};
use crate::state::{FormState, StateStore};
use std::time::Duration;

const STEP1_ENV_PREFIX: &str = "ESPANSO_GPT_STEP1_FORM_DATA_";
const STEP2_ENV_PREFIX: &str = "ESPANSO_GPT_STEP2_FORM_DATA_";

const STEP2_TRIGGER: &str = ":gpt_form_step2";
const FINAL_TRIGGER: &str = ":gpt_final_processing";

const MODE_CONTINUE_LAST: &str = "Continue Last";
const MODE_START_NEW: &str = "Start New";

// The form window needs a moment to close before a screenshot is taken,
// or the capture shows the form instead of the user's screen.
const SCREENSHOT_SETTLE: Duration = Duration::from_millis(500);

fn env_field(prefix: &str, name: &str) -> String {
    std::env::var(format!("{}{}", prefix, name))
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// First form submitted: seed the state mailbox and chain to either the
/// second form or final processing.
pub fn run_step1() -> i32 {
    let store = StateStore::default_location();
    // A stale mailbox from an aborted run must not leak into this one.
    if let Err(e) = store.delete() {
        log::warn!("[STEP1] {}", e);
    }

    let task_objective = env_field(STEP1_ENV_PREFIX, "TASK_OBJECTIVE_CHOICE");
    if task_objective.is_empty() {
        log::error!("[STEP1] No task objective in form data");
        println!("ERROR: Missing task objective from form.");
        return 1;
    }

    let requested_mode = env_field(STEP1_ENV_PREFIX, "CONVERSATION_MODE_CHOICE");
    let context = ContextStore::default_location();
    let (conversation_mode, active_conversation_id) =
        resolve_conversation(&requested_mode, context.last_conversation_id());
    if requested_mode == MODE_CONTINUE_LAST && conversation_mode == MODE_START_NEW {
        log::warn!("[STEP1] No previous conversation to continue, starting new");
    }

    let mut initial_prompt = env_field(STEP1_ENV_PREFIX, "INITIAL_USER_PROMPT");
    if initial_prompt.is_empty() {
        initial_prompt = clipboard_text();
        if !initial_prompt.is_empty() {
            log::info!("[STEP1] Empty prompt field, using clipboard contents");
        }
    }

    let state = FormState {
        conversation_mode,
        active_conversation_id,
        task_objective: task_objective.clone(),
        output_language: env_field(STEP1_ENV_PREFIX, "OUTPUT_LANGUAGE_CHOICE"),
        initial_prompt,
        desired_answer_sketch: env_field(STEP1_ENV_PREFIX, "DESIRED_ANSWER_SKETCH"),
        include_screenshot: env_field(STEP1_ENV_PREFIX, "INCLUDE_SCREENSHOT_CHOICE"),
        ..FormState::default()
    };

    if let Err(e) = store.save(&state) {
        log::error!("[STEP1] {}", e);
        println!("ERROR: Could not save form data.");
        return 1;
    }

    if state.wants_screenshot() {
        std::thread::sleep(SCREENSHOT_SETTLE);
    }

    let next = if catalog::get_task(&task_objective).requires_second_form {
        STEP2_TRIGGER
    } else {
        FINAL_TRIGGER
    };
    trigger_match(next)
}

/// Second form submitted: fold the extra fields into the existing mailbox
/// and chain to final processing.
pub fn run_step2() -> i32 {
    let store = StateStore::default_location();
    let mut state = store.load();
    if state.is_empty() {
        log::error!("[STEP2] State file missing or empty, step 1 did not run");
        println!("ERROR: Step 1 data not found.");
        return 1;
    }

    state.sentiment = env_field(STEP2_ENV_PREFIX, "SENTIMENT_CHOICE");
    state.relation = env_field(STEP2_ENV_PREFIX, "RELATION_CHOICE");
    state.selected_faq = env_field(STEP2_ENV_PREFIX, "FAQ_SELECTION");

    if let Err(e) = store.save(&state) {
        log::error!("[STEP2] {}", e);
        println!("ERROR: Could not save form data.");
        return 1;
    }

    trigger_match(FINAL_TRIGGER)
}

/// Decide the effective mode and conversation id. An absent mode field means
/// a new conversation; continuing requires a recorded last id, otherwise the
/// run silently becomes a new conversation.
fn resolve_conversation(requested_mode: &str, last_id: Option<String>) -> (String, String) {
    if requested_mode == MODE_CONTINUE_LAST {
        if let Some(id) = last_id {
            return (MODE_CONTINUE_LAST.to_string(), id);
        }
        return (MODE_START_NEW.to_string(), new_conversation_id());
    }
    if requested_mode.is_empty() {
        return (MODE_START_NEW.to_string(), new_conversation_id());
    }
    (requested_mode.to_string(), new_conversation_id())
}

/// Clipboard contents as the prompt of last resort; any failure is an empty
/// string.
fn clipboard_text() -> String {
    match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.get_text()) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            log::warn!("[STEP1] Clipboard unavailable: {}", e);
            String::new()
        }
    }
}

/// Fire the next step's trigger through the host CLI.
fn trigger_match(trigger: &str) -> i32 {
    let espanso = match which::which("espanso") {
        Ok(path) => path,
        Err(e) => {
            log::error!("[STEP] espanso binary not found: {}", e);
            println!("ERROR: espanso binary not found.");
            return 1;
        }
    };
    match std::process::Command::new(espanso)
        .args(["match", "exec", "-t", trigger])
        .status()
    {
        Ok(status) if status.success() => {
            log::info!("[STEP] Triggered {}", trigger);
            0
        }
        Ok(status) => {
            log::error!("[STEP] Trigger {} exited with {}", trigger, status);
            1
        }
        Err(e) => {
            log::error!("[STEP] Could not run espanso: {}", e);
            1
        }
    }
}
