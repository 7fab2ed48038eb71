//! Modal dialogs for the conversation loop.
//!
//! `Interaction` is the seam between the loop and the desktop: the loop
//! only ever asks for a typed answer or a choice, and `None` always means
//! the user cancelled. The production implementation shells out to zenity
//! (Linux) or osascript (macOS); when neither backend exists every prompt
//! reports a cancel, which the loop treats as normal early termination.

use std::process::Command;

pub trait Interaction {
    /// Show `question` with a text entry. `None` on cancel.
    fn clarify(&self, question: &str) -> Option<String>;

    /// Show `title` with one button per option. Returns the selected option
    /// verbatim, `None` on cancel.
    fn choose(&self, title: &str, options: &[String]) -> Option<String>;
}

pub struct DesktopDialogs;

impl Interaction for DesktopDialogs {
    fn clarify(&self, question: &str) -> Option<String> {
        if let Ok(zenity) = which::which("zenity") {
            return run_dialog(
                Command::new(zenity).args([
                    "--entry",
                    "--title=Assistant Needs Info",
                    &format!("--text={}", question),
                ]),
            );
        }
        if let Ok(osascript) = which::which("osascript") {
            let script = format!(
                "display dialog {} default answer \"\" with title \"Assistant Needs Info\"\n\
                 text returned of result",
                applescript_quote(question)
            );
            return run_dialog(Command::new(osascript).args(["-e", &script]));
        }
        log::warn!("[UI] No dialog backend available for clarification prompt");
        None
    }

    fn choose(&self, title: &str, options: &[String]) -> Option<String> {
        if options.is_empty() {
            return None;
        }
        if let Ok(zenity) = which::which("zenity") {
            let mut cmd = Command::new(zenity);
            cmd.args([
                "--list",
                "--title=Assistant Suggests Options",
                &format!("--text={}", title),
                "--column=Option",
                "--hide-header",
            ]);
            for option in options {
                cmd.arg(option);
            }
            return run_dialog(&mut cmd);
        }
        if let Ok(osascript) = which::which("osascript") {
            let list = options
                .iter()
                .map(|o| applescript_quote(o))
                .collect::<Vec<_>>()
                .join(", ");
            let script = format!(
                "choose from list {{{}}} with prompt {}\n\
                 if result is false then error number -128\n\
                 item 1 of result",
                list,
                applescript_quote(title)
            );
            return run_dialog(Command::new(osascript).args(["-e", &script]));
        }
        log::warn!("[UI] No dialog backend available for options prompt");
        None
    }
}

/// Run a dialog command; success means the trimmed stdout is the answer,
/// non-zero exit (Escape, Cancel, window close) means cancel.
fn run_dialog(cmd: &mut Command) -> Option<String> {
    let output = cmd
        .output()
        .map_err(|e| log::warn!("[UI] dialog spawn failed: {}", e))
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(
        String::from_utf8_lossy(&output.stdout)
            .trim_end_matches(['\r', '\n'])
            .to_string(),
    )
}

fn applescript_quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applescript_quoting_escapes_specials() {
        assert_eq!(applescript_quote("plain"), "\"plain\"");
        assert_eq!(applescript_quote("a \"b\""), "\"a \\\"b\\\"\"");
        assert_eq!(applescript_quote("back\\slash"), "\"back\\\\slash\"");
    }
}
