//! Integration test for the conversational pipeline.
//!
//! Runs the full flow a form submission produces - system prompt from a
//! task config, initial user message, the clarification/options loop -
//! against a scripted transport and dialog backend, and checks the
//! persisted history file is what a later "Continue Last" run would load.

use async_trait::async_trait;
use espanso_gpt_tools::conversation::{
    run_loop, ContextStore, ConversationRecord, Outcome, RequestParams,
};
use espanso_gpt_tools::llm::{prompts, ChatMessage, ChatRequest, ChatTransport, MessageContent};
use espanso_gpt_tools::state::FormState;
use espanso_gpt_tools::ui::Interaction;
use std::collections::VecDeque;
use std::sync::Mutex;

struct ScriptedTransport {
    replies: Mutex<VecDeque<String>>,
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn complete(&self, _request: &ChatRequest) -> Result<String, String> {
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "out of script".to_string()))
    }
}

struct FirstOption;

impl Interaction for FirstOption {
    fn clarify(&self, _question: &str) -> Option<String> {
        Some("more detail".to_string())
    }
    fn choose(&self, _title: &str, options: &[String]) -> Option<String> {
        options.first().cloned()
    }
}

fn temp_store(name: &str) -> ContextStore {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    ContextStore::at(dir.join("context"), dir.join("last_conversation_id.txt"))
}

fn text_of(msg: &ChatMessage) -> &str {
    match &msg.content {
        MessageContent::Text(t) => t,
        MessageContent::Parts(_) => panic!("expected plain text"),
    }
}

#[tokio::test]
async fn full_conversation_persists_a_resumable_record() {
    let state = FormState {
        conversation_mode: "Start New".into(),
        active_conversation_id: "1718822378.123456".into(),
        task_objective: "General".into(),
        output_language: "English".into(),
        initial_prompt: "Summarize our options".into(),
        desired_answer_sketch: "short bullets".into(),
        ..FormState::default()
    };

    let task = espanso_gpt_tools::catalog::TaskConfig::default();
    let system_prompt = prompts::build_task_system_prompt(&task, &state);
    assert!(system_prompt.contains("Please respond in English."));

    let store = temp_store("gpt-tools-it-full-flow");
    let mut record = ConversationRecord::new(
        state.active_conversation_id.clone(),
        system_prompt,
        state.clone(),
    );
    record.messages.push(ChatMessage::user(prompts::build_initial_user_text(
        &state.initial_prompt,
        &state.desired_answer_sketch,
    )));
    store.save(&mut record);

    let transport = ScriptedTransport {
        replies: Mutex::new(VecDeque::from([
            "NEED: Options for what, exactly?".to_string(),
            r#"TITRE: Which format? OPTIONS: ["Bullets", "Table"]"#.to_string(),
            "- option one\n- option two".to_string(),
        ])),
    };
    let params = RequestParams {
        model: "gpt-4o-mini".to_string(),
        temperature: task.temperature,
        max_tokens: Some(task.max_tokens),
    };

    let outcome = run_loop(&transport, &FirstOption, &store, &mut record, &params).await;
    assert_eq!(outcome, Outcome::Answer("- option one\n- option two".into()));

    // The record on disk is complete and resumable.
    let loaded = store.load("1718822378.123456").expect("record saved");
    let roles: Vec<&str> = loaded.messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(
        roles,
        vec!["system", "user", "assistant", "user", "assistant", "user", "assistant"]
    );
    assert_eq!(text_of(&loaded.messages[3]), "more detail");
    assert_eq!(text_of(&loaded.messages[5]), "Bullets");
    assert_eq!(loaded.original_form_inputs, state);
    assert!(loaded.last_updated_at >= loaded.created_at);

    // And it is now the conversation "Continue Last" would pick up.
    assert_eq!(
        store.last_conversation_id().unwrap(),
        "1718822378.123456"
    );
}

#[tokio::test]
async fn sketch_and_prompt_share_the_first_user_message() {
    let text = prompts::build_initial_user_text("the question", "lead with the price");
    assert!(text.starts_with("the question"));
    assert!(text.contains("GUIDELINE SKETCH:"));
    assert!(text.contains("lead with the price"));
}
