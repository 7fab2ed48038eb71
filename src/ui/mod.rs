//! Desktop UI helpers - progress popup and modal dialogs.
//!
//! Everything here is cosmetic or cancellable. UI failure never fails the
//! pipeline; at worst the user sees no popup and a prompt counts as
//! cancelled.

mod dialogs;
mod progress;

pub use dialogs::{DesktopDialogs, Interaction};
pub use progress::ProgressPopup;
