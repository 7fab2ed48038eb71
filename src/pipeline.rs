//! End-of-pipeline handlers - the subcommands that actually talk to the
//! model and print the result for the host to insert.
//!
//! Everything here writes its payload to stdout and its diagnostics to the
//! log. Error text deliberately goes to stdout too: the host pastes stdout
//! at the cursor, so an error the user can see beats a silent failure.

use crate::capture;
use crate::catalog;
use crate::conversation::{
    new_conversation_id, run_loop, ContextStore, ConversationRecord, Outcome, RequestParams,
};
use crate::llm::{
    prompts, strip_surrounding_quotes, ChatMessage, ChatRequest, ChatTransport, ContentPart,
    OpenAiClient, MODEL,
};
use crate::state::StateStore;
use crate::ui::{DesktopDialogs, ProgressPopup};
use async_trait::async_trait;

const SUPPORT_TEMPERATURE: f32 = 0.6;
const SUPPORT_MAX_TOKENS: u32 = 4000;

const SCREENSHOT_FAILED_NOTE: &str =
    "\n\n(Note: A screenshot was requested but could not be captured.)";

/// Transport decorator that keeps a progress popup on screen for the
/// duration of each request.
pub struct ProgressReporting<T> {
    inner: T,
}

impl<T> ProgressReporting<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: ChatTransport + Send + Sync> ChatTransport for ProgressReporting<T> {
    async fn complete(&self, request: &ChatRequest) -> Result<String, String> {
        let popup = ProgressPopup::show();
        let result = self.inner.complete(request).await;
        popup.dismiss();
        result
    }
}

/// The final step of the form pipeline: consume the state mailbox, run the
/// conversation to completion, print the answer. Returns the process exit
/// code.
pub async fn run_chat() -> i32 {
    let state_store = StateStore::default_location();
    let state = state_store.load();
    if state.is_empty() {
        log::error!("[CHAT] State file missing or empty, nothing to process");
        println!("ERROR: Could not retrieve form data.");
        return 1;
    }

    let transport = match OpenAiClient::from_env() {
        Ok(client) => ProgressReporting::new(client),
        Err(msg) => {
            println!("{}", msg);
            return 1;
        }
    };

    let context = ContextStore::default_location();
    let task = catalog::get_task(&state.task_objective);

    // Continue the previous conversation when asked and it still loads;
    // anything else means a fresh record.
    let mut record = if state.conversation_mode == "Continue Last"
        && !state.active_conversation_id.is_empty()
    {
        match context.load(&state.active_conversation_id) {
            Some(record) => {
                log::info!("[CHAT] Continuing conversation {}", record.conversation_id);
                record
            }
            None => {
                log::warn!(
                    "[CHAT] Conversation {} not found, starting new",
                    state.active_conversation_id
                );
                new_record(&state, &task)
            }
        }
    } else {
        new_record(&state, &task)
    };

    let user_text = prompts::build_initial_user_text(&state.initial_prompt, &state.desired_answer_sketch);
    record.messages.push(build_user_message(user_text, state.wants_screenshot()));
    context.save(&mut record);

    let params = RequestParams {
        model: MODEL.to_string(),
        temperature: task.temperature,
        max_tokens: Some(task.max_tokens),
    };
    let outcome = run_loop(&transport, &DesktopDialogs, &context, &mut record, &params).await;

    if let Some(text) = outcome_text(outcome) {
        println!("{}", text);
    }

    // The mailbox is single-use; a leftover file would poison the next run.
    if let Err(e) = state_store.delete() {
        log::error!("[CHAT] {}", e);
    }
    0
}

/// What `chat` prints for each way the loop can end. Cancellation and the
/// turn cap insert nothing; the cap was already logged by the loop.
fn outcome_text(outcome: Outcome) -> Option<String> {
    match outcome {
        Outcome::Answer(text) => Some(text),
        Outcome::Cancelled => None,
        Outcome::NoOptionSelected => Some("No option selected from dialog.".to_string()),
        Outcome::Fallback(text) => Some(text),
        // Error text replaces the generated content; the host still gets
        // something to insert, so this is not a process failure.
        Outcome::TransportError(msg) => Some(msg),
        Outcome::LoopLimit => None,
    }
}

fn new_record(state: &crate::state::FormState, task: &catalog::TaskConfig) -> ConversationRecord {
    let id = if state.active_conversation_id.is_empty() {
        new_conversation_id()
    } else {
        state.active_conversation_id.clone()
    };
    let system_prompt = prompts::build_task_system_prompt(task, state);
    log::info!("[CHAT] New conversation {} for task '{}'", id, task.name);
    ConversationRecord::new(id, system_prompt, state.clone())
}

/// Text-only or multimodal first user message, depending on the screenshot
/// checkbox. Capture failure degrades to a note in the text.
fn build_user_message(text: String, wants_screenshot: bool) -> ChatMessage {
    if !wants_screenshot {
        return ChatMessage::user(text);
    }
    match capture::capture_inline_image() {
        Ok(image) => ChatMessage::user_parts(vec![
            ContentPart::text(text),
            ContentPart::inline_image(image.data_url),
        ]),
        Err(e) => {
            log::warn!("[CHAT] Screenshot unavailable: {}", e);
            ChatMessage::user(format!("{}{}", text, SCREENSHOT_FAILED_NOTE))
        }
    }
}

/// One-shot text transformation: `transform <action> <tone> <text> <language>`.
pub async fn run_transform(action_name: &str, tone: &str, text: &str, language: &str) -> i32 {
    if text.trim().is_empty() {
        log::warn!("[TRANSFORM] Empty input text, nothing to do");
        return 0;
    }

    let transport = match OpenAiClient::from_env() {
        Ok(client) => ProgressReporting::new(client),
        Err(msg) => {
            println!("{}", msg);
            return 1;
        }
    };

    let action = catalog::get_action(action_name);
    let request = ChatRequest {
        model: MODEL.to_string(),
        messages: vec![
            ChatMessage::system(prompts::transform_system_message(language)),
            ChatMessage::user(prompts::build_transform_prompt(&action, tone, text, language)),
        ],
        temperature: action.temperature,
        max_tokens: Some(action.max_tokens),
    };

    match transport.complete(&request).await {
        Ok(reply) => {
            println!("{}", strip_surrounding_quotes(&reply));
            0
        }
        Err(msg) => {
            println!("{}", msg);
            0
        }
    }
}

/// One-shot customer-support reply:
/// `support <sentiment> <relation> <faq> <language> <screenshot> <message> <sketch>`.
#[allow(clippy::too_many_arguments)]
pub async fn run_support(
    sentiment: &str,
    relation: &str,
    faq: &str,
    language: &str,
    screenshot: &str,
    message: &str,
    sketch: &str,
) -> i32 {
    let transport = match OpenAiClient::from_env() {
        Ok(client) => ProgressReporting::new(client),
        Err(msg) => {
            println!("{}", msg);
            return 1;
        }
    };

    let user_text = prompts::build_support_user_prompt(sentiment, relation, language, message, sketch);
    let user_message = build_user_message(user_text, screenshot.eq_ignore_ascii_case("true"));

    let request = ChatRequest {
        model: MODEL.to_string(),
        messages: vec![
            ChatMessage::system(prompts::build_support_system_prompt(language, faq)),
            user_message,
        ],
        temperature: SUPPORT_TEMPERATURE,
        max_tokens: Some(SUPPORT_MAX_TOKENS),
    };

    match transport.complete(&request).await {
        Ok(reply) => {
            println!("{}", strip_surrounding_quotes(&reply));
            0
        }
        Err(msg) => {
            println!("{}", msg);
            0
        }
    }
}
