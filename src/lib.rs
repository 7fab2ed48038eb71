//! Espanso GPT tools - the processing side of a set of text-expansion
//! AI workflows.
//!
//! The host (espanso) owns the trigger and form UI; this crate owns
//! everything after a form is submitted: carrying field values between
//! steps, building prompts, calling the chat-completion API, driving the
//! clarification/options loop, and printing the final text for insertion.

pub mod capture;
pub mod catalog;
pub mod conversation;
pub mod llm;
pub mod paths;
pub mod pipeline;
pub mod state;
pub mod steps;
pub mod ui;
