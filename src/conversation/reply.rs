//! Reply classification - the two non-final reply shapes.
//!
//! The model signals a clarification with a literal `NEED:` prefix and a
//! choice menu with `TITRE: <title> OPTIONS: <json string array>`. This is
//! deliberately plain string search, not a grammar: ambiguous input (markers
//! out of order, invalid JSON) is treated as literal text, matching the
//! long-observed behavior of the convention.

const NEED_MARKER: &str = "NEED:";
const TITLE_MARKER: &str = "TITRE:";
const OPTIONS_MARKER: &str = "OPTIONS:";

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// `NEED: <question>` - ask the user for more input.
    Clarification(String),
    /// `TITRE: <title> OPTIONS: ["a", "b"]` - offer the options as buttons.
    Options { title: String, options: Vec<String> },
    /// Both markers present but the payload does not follow the convention;
    /// printed as-is and the loop aborts.
    MalformedOptions,
    /// Anything else is the final answer.
    Direct,
}

pub fn classify_reply(reply: &str) -> Reply {
    if let Some(rest) = reply.strip_prefix(NEED_MARKER) {
        return Reply::Clarification(rest.trim().to_string());
    }

    if reply.contains(OPTIONS_MARKER) && reply.contains(TITLE_MARKER) {
        // Split at the first OPTIONS: - the title must come before it.
        let (title_part, options_part) = match reply.split_once(OPTIONS_MARKER) {
            Some(parts) => parts,
            None => return Reply::Direct,
        };
        if !title_part.starts_with(TITLE_MARKER) {
            return Reply::MalformedOptions;
        }
        let title = title_part[TITLE_MARKER.len()..].trim().to_string();
        match serde_json::from_str::<Vec<String>>(options_part.trim()) {
            Ok(options) => Reply::Options { title, options },
            Err(_) => Reply::MalformedOptions,
        }
    } else {
        Reply::Direct
    }
}
