//! Prompt construction - system and user messages assembled from task
//! configuration, instruction fragments, reference files, and form input.
//!
//! Templates use `{placeholder}` markers rendered by plain string
//! replacement: unknown placeholders pass through untouched, and a template
//! without a given placeholder simply ignores that fragment.

use crate::catalog::{ActionConfig, TaskConfig};
use crate::state::FormState;

/// Interaction-protocol rules appended to every conversational system
/// prompt: how the model signals a clarification (`NEED:`), a choice menu
/// (`TITRE:` + `OPTIONS:`), or a direct answer.
pub const BASE_SYSTEM_PROMPT_CORE: &str = "Your primary goal is to provide a direct and helpful answer whenever possible. Strive to understand the user's intent and provide a substantive response with the information available.\n\n\
1. Clarification (NEED): If, and only if, the user's request is critically vague and you cannot provide any meaningful answer or reasonable options, you MAY ask for clarification. Preface your clarifying question with the exact string 'NEED:'. \
The question should be targeted and aimed at resolving the specific ambiguity preventing a direct answer. \
Example: 'NEED: To give you the most relevant information, could you specify which aspect of [topic] you're interested in?'\n\n\
IMPORTANT: If you use 'NEED:', the whole reply MUST be prefixed with 'NEED:'. DO NOT include any other text before the prefix. Use this sparingly.\n\n\
2. Offering Choices (OPTIONS): If a request is clear but very broad, and offering a few distinct choices would genuinely help the user narrow down their interest more efficiently than a clarifying question, you MAY offer these as buttons. \
Do not offer options if a direct answer to a reasonable interpretation of the request is possible.\n\
  * You MUST structure this as follows: Start with a title or question for the user, prefixed by 'TITRE: '. \
Immediately follow this with the options themselves, prefixed by 'OPTIONS: ', which must be a valid JSON list of strings. \
Each string *within* the JSON list MUST be enclosed in double quotes.\n\
  * Example: 'TITRE: Which aspect are you most interested in? OPTIONS: [\"Overview\", \"Key Features\", \"Pricing\"]'\n\
  * IMPORTANT: There should be no other text before 'TITRE:' and no text between 'TITRE: ...' and 'OPTIONS: ...' other than a single space if desired.\n\
  * Convergence after Choice: When the user selects an option, your *primary goal* for the next response is to provide a substantive answer, complete the thought, or take a direct action based on that choice. \
After one or two rounds of option selection by the user, you MUST prioritize reaching a conclusion or, if genuinely necessary, asking a final, single clarifying question using the 'NEED:' prefix.\n\n\
3. Direct Answer: If the request is clear enough for you to provide a useful response, or if you can make a reasonable inference to answer the likely intent, provide a direct answer without any prefix. This should be your default mode of response.";

/// Render `{placeholder}` markers by replacement. Never fails; markers the
/// template does not carry are ignored, markers we do not know survive.
pub fn render_template(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (key, value) in substitutions {
        rendered = rendered.replace(&format!("{{{}}}", key), value);
    }
    rendered
}

/// Language instruction for the system prompt. French always means Canadian
/// French here.
pub fn language_instruction(language: &str) -> String {
    if language.eq_ignore_ascii_case("french") {
        "Please respond in Canadian French.".to_string()
    } else {
        format!("Please respond in {}.", language)
    }
}

/// FAQ contents block for the conversational system prompt. A missing file
/// degrades to a parenthetical note, never an error.
pub fn faq_block(selected_faq: &str) -> String {
    faq_block_in(&crate::paths::faq_dir(), selected_faq)
}

fn faq_block_in(dir: &std::path::Path, selected_faq: &str) -> String {
    if selected_faq.trim().is_empty() || selected_faq.trim().eq_ignore_ascii_case("none") {
        return String::new();
    }
    let path = dir.join(selected_faq);
    match std::fs::read_to_string(&path) {
        Ok(contents) => format!("\n\nFAQ: {}", contents),
        Err(e) => {
            log::warn!("[PROMPT] FAQ file {} unreadable: {}", path.display(), e);
            format!(" (FAQ '{}' not found.)", selected_faq)
        }
    }
}

/// Build the full system message for a new conversation from the task's
/// template plus the fragments selected on the forms.
pub fn build_task_system_prompt(task: &TaskConfig, state: &FormState) -> String {
    let language = language_instruction(&state.output_language);
    let sentiment = task
        .sentiment_instructions
        .get(&state.sentiment)
        .cloned()
        .unwrap_or_default();
    let relation = task
        .relation_instructions
        .get(&state.relation)
        .cloned()
        .unwrap_or_default();
    let faq = faq_block(&state.selected_faq);

    let rendered = render_template(
        &task.system_message_template,
        &[
            ("language_instruction", language.as_str()),
            ("sentiment_instruction", sentiment.as_str()),
            ("relation_instruction", relation.as_str()),
            ("faq_content", faq.as_str()),
        ],
    );

    // The interaction-protocol rules must always be present, whether or not
    // the task template bakes them in.
    if rendered.contains(BASE_SYSTEM_PROMPT_CORE) {
        rendered
    } else {
        format!("{}\n\n---\n{}", rendered, BASE_SYSTEM_PROMPT_CORE)
    }
}

/// First user message text: the typed (or clipboard-filled) prompt plus an
/// optional answer-sketch block.
pub fn build_initial_user_text(initial_prompt: &str, sketch: &str) -> String {
    let mut text = initial_prompt.to_string();
    if !sketch.trim().is_empty() {
        text.push_str(&format!(
            "\n\nGUIDELINE SKETCH:\n«««\n{}\n»»»",
            sketch.trim()
        ));
    }
    text
}

// ── One-shot transform (text_processor flow) ─────────────────────────

/// Tone instruction: the contents of `gpt_tools/tone/<tone>.txt` when such a
/// file exists, otherwise the built-in wording for the known tones.
pub fn tone_instruction(tone: &str) -> String {
    tone_instruction_in(&crate::paths::tone_dir(), tone)
}

fn tone_instruction_in(dir: &std::path::Path, tone: &str) -> String {
    let path = dir.join(format!("{}.txt", tone));
    if let Ok(contents) = std::fs::read_to_string(&path) {
        let contents = contents.trim();
        if !contents.is_empty() {
            return contents.to_string();
        }
    }
    builtin_tone_instruction(tone)
}

fn builtin_tone_instruction(tone: &str) -> String {
    match tone {
        "Walking on eggshells" => {
            "Please be extremely careful, gentle, and overly polite in your response, as if you \
             are walking on eggshells. Ensure the tone is very considerate and cautious."
        }
        "Formal" => "Please ensure the response is in a formal tone.",
        _ => "Please ensure the response is in a friendly and approachable tone.",
    }
    .to_string()
}

pub fn transform_system_message(target_language: &str) -> String {
    format!(
        "You are a versatile AI assistant. Skillfully modify text based on user instructions. \
         Pay close attention to the desired action, tone, and ensure the output is in {}. \
         If the target language is French, use Canadian French unless specified otherwise.",
        target_language
    )
}

/// User prompt for a one-shot transformation: tone instruction prepended to
/// the action's rendered prompt template.
pub fn build_transform_prompt(
    action: &ActionConfig,
    tone: &str,
    input_text: &str,
    target_language: &str,
) -> String {
    let rendered = render_template(
        &action.prompt_template,
        &[
            ("target_language", target_language),
            ("input_text", input_text),
        ],
    );
    format!("{} {}", tone_instruction(tone), rendered)
}

// ── One-shot customer support flow ───────────────────────────────────

pub fn build_support_system_prompt(target_language: &str, selected_faq: &str) -> String {
    let mut intro = format!(
        "You are a concise, friendly customer support agent. Your response must be in {}.",
        target_language
    );
    if target_language.eq_ignore_ascii_case("french") {
        intro.push_str(" Use Canadian French unless specified otherwise.");
    }

    let mut prompt = format!(
        "{}\n\
         Be clear, concise, and well-written, using a 7th-grade level vocabulary and sentence structure.\n\
         The input may come from speech recognition, so if you encounter unusual phrasing, infer the intended meaning.\n\
         Always respect the original language of the input unless a specific output language is requested.\n\
         Avoid slang.\n\
         Format your response in short paragraphs.\n\
         Preserve idioms and write in a simple, conversational style.\n\
         Use natural punctuation (e.g., !, ?, ..., —), ensuring there are no spaces before terminal punctuation marks like ! or ?.\n\
         NEVER ask for more context; Just use your judgment.",
        intro
    );

    if !selected_faq.trim().is_empty() && !selected_faq.trim().eq_ignore_ascii_case("none") {
        let path = crate::paths::faq_dir().join(selected_faq);
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                prompt.push_str(
                    "\n\nFor your reference, here is some relevant FAQ information:\n---\n",
                );
                prompt.push_str(&contents);
                prompt.push_str(
                    "\n---\nIf the question of the user is in the FAQ, DO NOT DEVIATE from the FAQ.\n\
                     If the question is not in the FAQ, answer the question based on your knowledge and the context provided.\n\
                     DO NOT make any assumptions about company policy or troubleshooting procedures.",
                );
            }
            Err(e) => {
                log::warn!("[PROMPT] FAQ file {} unreadable: {}", path.display(), e);
                prompt.push_str(&format!(
                    "\n\n(Note: The selected FAQ file '{}' was not found.)",
                    selected_faq
                ));
            }
        }
    }

    prompt
}

pub fn build_support_user_prompt(
    sentiment: &str,
    relation: &str,
    target_language: &str,
    message: &str,
    sketch: &str,
) -> String {
    let mut prompt = format!(
        "Réponds de façon {} à un·e {} en {}.\n\n\
         Message reçu :\n« {} »\n\n\
         Réponse courte, familière mais polie, en {}.",
        sentiment, relation, target_language, message, target_language
    );

    if !sketch.trim().is_empty() {
        prompt.push_str(&format!(
            "\n\nIMPORTANT GUIDELINE: Here is a sketch of the desired answer. \
             Use it as a strong inspiration for the tone, content, and key points of your response, \
             but adapt it to ensure natural language and coherence with other instructions \
             (like FAQs or politeness). Do not just rephrase it; integrate its essence into your reply.\n\
             Desired Answer Sketch:\n« {} »",
            sketch.trim()
        ));
    }

    prompt
}
