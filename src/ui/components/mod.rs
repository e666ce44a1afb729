//! Reusable UI pieces of the chat window

mod confirm_dialog;
mod debug_panel;
mod input_bar;
mod message_list;

pub use confirm_dialog::{ConfirmChoice, ConfirmDialog, NEW_SESSION_PROMPT};
pub use debug_panel::DebugPanel;
pub use input_bar::InputBar;
pub use message_list::MessageList;
