//! Per-user letter composition: prompts, captured replies and the final send.

mod engine;
mod reply;
mod state;

pub use engine::ConversationEngine;
pub use reply::{ChatOutbox, Keyboard, NEW_LETTER_BUTTON, Reply};
pub use state::{ConversationState, Phase};
