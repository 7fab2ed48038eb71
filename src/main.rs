//! `gpt-tools` - one binary, one subcommand per espanso script hook.
//!
//! The listing subcommands feed form dropdowns and must stay cheap and
//! silent on stderr; the processing subcommands print the text the host
//! inserts at the cursor.

use espanso_gpt_tools::{catalog, paths, pipeline, steps};

fn print_usage() {
    eprintln!(
        "usage: gpt-tools <subcommand>\n\
         \n\
         listing:\n\
         \x20 list-actions | list-tasks | list-tones | list-faqs\n\
         \x20 get-action <name> | get-task <name>\n\
         \n\
         form steps:\n\
         \x20 form-step1 | form-step2\n\
         \n\
         processing:\n\
         \x20 chat\n\
         \x20 transform <action> <tone> <text> <language>\n\
         \x20 support <sentiment> <relation> <faq> <language> <screenshot> <message> <sketch>"
    );
}

#[tokio::main]
async fn main() {
    // The API key lives in a dotenv file next to the tool data, local
    // overrides first.
    let config = paths::config_dir();
    if dotenvy::from_path(config.join(".env.local")).is_err() {
        let _ = dotenvy::from_path(config.join(".env"));
    }
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let subcommand = args.first().map(String::as_str).unwrap_or("");
    let rest: Vec<&str> = args.iter().skip(1).map(String::as_str).collect();

    let code = match (subcommand, rest.as_slice()) {
        ("list-actions", []) => print_lines(catalog::list_actions()),
        ("list-tasks", []) => print_lines(catalog::list_tasks()),
        ("list-tones", []) => print_lines(catalog::list_tones()),
        ("list-faqs", []) => print_lines(catalog::list_faqs()),
        ("get-action", [name]) => print_config(&catalog::get_action(name)),
        ("get-task", [name]) => print_config(&catalog::get_task(name)),
        ("form-step1", []) => steps::run_step1(),
        ("form-step2", []) => steps::run_step2(),
        ("chat", []) => pipeline::run_chat().await,
        ("transform", [action, tone, text, language]) => {
            pipeline::run_transform(action, tone, text, language).await
        }
        ("support", [sentiment, relation, faq, language, screenshot, message, sketch]) => {
            pipeline::run_support(sentiment, relation, faq, language, screenshot, message, sketch)
                .await
        }
        ("transform", _) | ("support", _) | ("get-action", _) | ("get-task", _) => {
            print_usage();
            // Goes to stdout so the host shows it where the text would be.
            println!("Error: Incorrect number of arguments.");
            1
        }
        _ => {
            print_usage();
            1
        }
    };
    std::process::exit(code);
}

fn print_lines(lines: Vec<String>) -> i32 {
    for line in lines {
        println!("{}", line);
    }
    0
}

fn print_config<T: serde::Serialize>(config: &T) -> i32 {
    match serde_json::to_string_pretty(config) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: could not serialize config: {}", e);
            1
        }
    }
}
