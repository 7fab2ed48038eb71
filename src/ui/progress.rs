//! Progress popup shown while a completion request is in flight.
//!
//! A background thread drives a small always-on-top pulsating window
//! (zenity, where installed) and rewrites its label every 120 ms, cycling
//! through the Braille spinner glyphs. The popup is purely cosmetic: a
//! missing backend, a dead child, or a failed write is swallowed and the
//! pipeline carries on without it.

use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const SPINNER_GLYPHS: [&str; 8] = ["⢿", "⣻", "⣽", "⣾", "⣷", "⣯", "⣟", "⡿"];
const SPINNER_TICK: Duration = Duration::from_millis(120);

pub struct ProgressPopup {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressPopup {
    /// Spawn the popup thread and return immediately.
    pub fn show() -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let handle = std::thread::spawn(move || spinner_loop(flag));
        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Signal the thread to stop, tear the window down, and wait briefly.
    pub fn dismiss(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressPopup {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Thread body: feed spinner frames to the popup's stdin until the flag
/// flips, then kill the child from this same thread.
fn spinner_loop(running: Arc<AtomicBool>) {
    let mut child = match spawn_popup() {
        Some(child) => child,
        None => {
            // No backend - idle until dismissed so `dismiss` still joins.
            while running.load(Ordering::SeqCst) {
                std::thread::sleep(SPINNER_TICK);
            }
            return;
        }
    };

    let mut stdin = child.stdin.take();
    let mut index = 0usize;
    while running.load(Ordering::SeqCst) {
        if let Some(pipe) = stdin.as_mut() {
            let frame = format!("# Processing {}\n", SPINNER_GLYPHS[index]);
            if pipe.write_all(frame.as_bytes()).and_then(|_| pipe.flush()).is_err() {
                // User closed the window; nothing left to animate.
                break;
            }
        }
        index = (index + 1) % SPINNER_GLYPHS.len();
        std::thread::sleep(SPINNER_TICK);
    }

    drop(stdin);
    let _ = child.kill();
    let _ = child.wait();
}

/// Start the popup process, if a supported backend is installed.
fn spawn_popup() -> Option<Child> {
    let zenity = which::which("zenity").ok()?;
    Command::new(zenity)
        .args([
            "--progress",
            "--pulsate",
            "--no-cancel",
            "--auto-close",
            "--title=Processing",
            "--text=Processing...",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| log::debug!("[UI] progress popup unavailable: {}", e))
        .ok()
}
