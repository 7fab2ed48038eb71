//! Conversation domain - the turn-taking loop and its persistence.
//!
//! Each turn sends the full accumulated message list, classifies the reply,
//! and either finishes (direct answer), asks the user a follow-up (NEED),
//! or offers buttons (TITRE/OPTIONS). The record file is rewritten after
//! every append so a crash mid-conversation loses at most the current turn.

mod reply;
mod store;

pub use reply::{classify_reply, Reply};
pub use store::{new_conversation_id, ContextStore, ConversationRecord};

use crate::llm::{ChatMessage, ChatRequest, ChatTransport};
use crate::ui::Interaction;

/// Hard cap on loop iterations. A model stuck offering options forever
/// stops here instead of burning tokens indefinitely.
pub const MAX_TURNS: usize = 15;

/// Sampling parameters for every request in one conversation.
#[derive(Debug, Clone)]
pub struct RequestParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// How the loop ended. Only `Answer` marks the conversation as the "last"
/// one for later continuation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Direct answer - the terminal success path.
    Answer(String),
    /// The clarification dialog was cancelled; nothing is printed.
    Cancelled,
    /// The options dialog was cancelled.
    NoOptionSelected,
    /// Malformed options payload, printed as-is by the caller.
    Fallback(String),
    /// A request failed; the message replaces the generated content.
    TransportError(String),
    /// MAX_TURNS exceeded without a direct answer.
    LoopLimit,
}

/// Drive the conversation until a terminal state.
///
/// Appends to `record.messages` and re-saves through `store` on every
/// turn; updates the last-conversation pointer only on the `Answer` path.
pub async fn run_loop(
    transport: &dyn ChatTransport,
    interaction: &dyn Interaction,
    store: &ContextStore,
    record: &mut ConversationRecord,
    params: &RequestParams,
) -> Outcome {
    for turn in 0..MAX_TURNS {
        let request = ChatRequest {
            model: params.model.clone(),
            messages: record.messages.clone(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        let reply = match transport.complete(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("[CHAT] Turn {} request failed: {}", turn + 1, e);
                return Outcome::TransportError(e);
            }
        };

        match classify_reply(&reply) {
            Reply::Clarification(question) => {
                log::info!("[CHAT] Clarification requested: {}", truncate(&question, 80));
                let answer = match interaction.clarify(&question) {
                    Some(answer) => answer,
                    None => {
                        log::info!("[CHAT] Clarification dialog cancelled");
                        return Outcome::Cancelled;
                    }
                };
                record.messages.push(ChatMessage::assistant(&reply));
                record.messages.push(ChatMessage::user(answer));
                store.save(record);
            }
            Reply::Options { title, options } => {
                log::info!("[CHAT] {} options offered: {}", options.len(), truncate(&title, 80));
                let selected = match interaction.choose(&title, &options) {
                    Some(selected) => selected,
                    None => {
                        log::info!("[CHAT] Options dialog cancelled");
                        return Outcome::NoOptionSelected;
                    }
                };
                record.messages.push(ChatMessage::assistant(&reply));
                record.messages.push(ChatMessage::user(selected));
                store.save(record);
            }
            Reply::MalformedOptions => {
                log::warn!("[CHAT] Malformed options payload, treating as literal text");
                return Outcome::Fallback(reply);
            }
            Reply::Direct => {
                record.messages.push(ChatMessage::assistant(&reply));
                store.save(record);
                store.set_last_conversation_id(&record.conversation_id);
                return Outcome::Answer(reply);
            }
        }
    }

    log::error!("[CHAT] Loop limit of {} turns reached without a final answer", MAX_TURNS);
    Outcome::LoopLimit
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageContent;
    use crate::state::FormState;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<String, String>>>,
        requests_seen: Mutex<Vec<usize>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<String, String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                requests_seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn complete(&self, request: &ChatRequest) -> Result<String, String> {
            self.requests_seen.lock().unwrap().push(request.messages.len());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok("exhausted".to_string()))
        }
    }

    struct ScriptedInteraction {
        answers: Mutex<VecDeque<Option<String>>>,
        options_seen: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl ScriptedInteraction {
        fn new(answers: Vec<Option<String>>) -> Self {
            Self {
                answers: Mutex::new(answers.into_iter().collect()),
                options_seen: Mutex::new(Vec::new()),
            }
        }
        fn next(&self) -> Option<String> {
            self.answers.lock().unwrap().pop_front().flatten()
        }
    }

    impl Interaction for ScriptedInteraction {
        fn clarify(&self, _question: &str) -> Option<String> {
            self.next()
        }
        fn choose(&self, title: &str, options: &[String]) -> Option<String> {
            self.options_seen
                .lock()
                .unwrap()
                .push((title.to_string(), options.to_vec()));
            self.next()
        }
    }

    fn temp_store(name: &str) -> ContextStore {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        ContextStore::at(dir.join("context"), dir.join("last_conversation_id.txt"))
    }

    fn new_record(id: &str) -> ConversationRecord {
        let mut record =
            ConversationRecord::new(id.to_string(), "system".to_string(), FormState::default());
        record.messages.push(ChatMessage::user("initial question"));
        record
    }

    fn params() -> RequestParams {
        RequestParams {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: Some(2000),
        }
    }

    fn text_of(msg: &ChatMessage) -> &str {
        match &msg.content {
            MessageContent::Text(t) => t,
            MessageContent::Parts(_) => panic!("expected plain text message"),
        }
    }

    #[tokio::test]
    async fn direct_answer_finishes_and_marks_last() {
        let transport = ScriptedTransport::new(vec![Ok("The answer.".into())]);
        let ui = ScriptedInteraction::new(vec![]);
        let store = temp_store("gpt-tools-loop-direct");
        let mut record = new_record("100.000001");

        let outcome = run_loop(&transport, &ui, &store, &mut record, &params()).await;

        assert_eq!(outcome, Outcome::Answer("The answer.".into()));
        assert_eq!(store.last_conversation_id().unwrap(), "100.000001");
        let saved = store.load("100.000001").unwrap();
        assert_eq!(text_of(saved.messages.last().unwrap()), "The answer.");
    }

    #[tokio::test]
    async fn clarification_collects_answer_before_finishing() {
        let transport = ScriptedTransport::new(vec![
            Ok("NEED: which one?".into()),
            Ok("Done.".into()),
        ]);
        let ui = ScriptedInteraction::new(vec![Some("the blue one".into())]);
        let store = temp_store("gpt-tools-loop-need");
        let mut record = new_record("101.000001");

        let outcome = run_loop(&transport, &ui, &store, &mut record, &params()).await;

        assert_eq!(outcome, Outcome::Answer("Done.".into()));
        // system, user, assistant(NEED), user(answer), assistant(final)
        assert_eq!(record.messages.len(), 5);
        assert_eq!(text_of(&record.messages[3]), "the blue one");
        // Second request carried the appended exchange.
        assert_eq!(*transport.requests_seen.lock().unwrap(), vec![2, 4]);
    }

    #[tokio::test]
    async fn cancelled_clarification_aborts_without_marking_last() {
        let transport = ScriptedTransport::new(vec![Ok("NEED: which one?".into())]);
        let ui = ScriptedInteraction::new(vec![None]);
        let store = temp_store("gpt-tools-loop-need-cancel");
        let mut record = new_record("102.000001");

        let outcome = run_loop(&transport, &ui, &store, &mut record, &params()).await;

        assert_eq!(outcome, Outcome::Cancelled);
        assert!(store.last_conversation_id().is_none());
        // Nothing was appended for the cancelled turn.
        assert_eq!(record.messages.len(), 2);
    }

    #[tokio::test]
    async fn options_offer_exactly_the_listed_choices() {
        let transport = ScriptedTransport::new(vec![
            Ok(r#"TITRE: Pick one OPTIONS: ["Overview", "Pricing"]"#.into()),
            Ok("Overview it is.".into()),
        ]);
        let ui = ScriptedInteraction::new(vec![Some("Pricing".into())]);
        let store = temp_store("gpt-tools-loop-options");
        let mut record = new_record("103.000001");

        let outcome = run_loop(&transport, &ui, &store, &mut record, &params()).await;

        assert_eq!(outcome, Outcome::Answer("Overview it is.".into()));
        let seen = ui.options_seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![(
                "Pick one".to_string(),
                vec!["Overview".to_string(), "Pricing".to_string()]
            )]
        );
        // The selection is appended verbatim as a user turn.
        assert_eq!(text_of(&record.messages[3]), "Pricing");
    }

    #[tokio::test]
    async fn malformed_options_fall_back_to_literal_text() {
        let raw = r#"OPTIONS: ["a"] TITRE: backwards"#;
        let transport = ScriptedTransport::new(vec![Ok(raw.into())]);
        let ui = ScriptedInteraction::new(vec![]);
        let store = temp_store("gpt-tools-loop-malformed");
        let mut record = new_record("104.000001");

        let outcome = run_loop(&transport, &ui, &store, &mut record, &params()).await;

        assert_eq!(outcome, Outcome::Fallback(raw.into()));
        assert!(store.last_conversation_id().is_none());
    }

    #[tokio::test]
    async fn loop_stops_at_the_turn_cap() {
        let replies = (0..MAX_TURNS + 5)
            .map(|i| Ok(format!("NEED: again? ({})", i)))
            .collect();
        let transport = ScriptedTransport::new(replies);
        let answers = (0..MAX_TURNS + 5).map(|_| Some("yes".to_string())).collect();
        let ui = ScriptedInteraction::new(answers);
        let store = temp_store("gpt-tools-loop-cap");
        let mut record = new_record("105.000001");

        let outcome = run_loop(&transport, &ui, &store, &mut record, &params()).await;

        assert_eq!(outcome, Outcome::LoopLimit);
        assert_eq!(transport.requests_seen.lock().unwrap().len(), MAX_TURNS);
        assert!(store.last_conversation_id().is_none());
    }

    #[tokio::test]
    async fn transport_error_surfaces_as_text() {
        let transport =
            ScriptedTransport::new(vec![Err("OpenAI API Error: 500 — oops".into())]);
        let ui = ScriptedInteraction::new(vec![]);
        let store = temp_store("gpt-tools-loop-error");
        let mut record = new_record("106.000001");

        let outcome = run_loop(&transport, &ui, &store, &mut record, &params()).await;

        assert_eq!(
            outcome,
            Outcome::TransportError("OpenAI API Error: 500 — oops".into())
        );
    }
}
