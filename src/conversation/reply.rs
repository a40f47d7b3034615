//! Outgoing chat replies and the sink they are delivered through.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ChatId;

/// Label of the single button that starts a new letter.
pub const NEW_LETTER_BUTTON: &str = "New Letter";

const GREETING: &str = "Hi! Press 'New Letter' to start writing a letter.";
const START_PROMPT: &str = "Please start with the /start command or press 'New Letter'.";
const ASK_SUBJECT: &str = "Enter the subject of the letter.";
const ASK_BODY: &str = "Enter the text of the letter.";
const ASK_SENDER: &str = "Enter the sender name.";
const SENDING: &str = "Sending the letter...";
const ANOTHER_LETTER: &str = "Want to send another letter? Press 'New Letter'.";

/// Keyboard directive attached to a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    /// Leave whatever keyboard the user currently sees
    Unchanged,
    /// Show the single "New Letter" button
    NewLetter,
    /// Hide the custom keyboard so free text can be typed
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Reply {
    fn new(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }

    pub(crate) fn greeting() -> Self {
        Self::new(GREETING, Keyboard::NewLetter)
    }

    pub(crate) fn start_prompt() -> Self {
        Self::new(START_PROMPT, Keyboard::NewLetter)
    }

    pub(crate) fn ask_subject() -> Self {
        Self::new(ASK_SUBJECT, Keyboard::Remove)
    }

    pub(crate) fn ask_body() -> Self {
        Self::new(ASK_BODY, Keyboard::Unchanged)
    }

    pub(crate) fn ask_sender() -> Self {
        Self::new(ASK_SENDER, Keyboard::Unchanged)
    }

    pub(crate) fn sending() -> Self {
        Self::new(SENDING, Keyboard::Unchanged)
    }

    /// Final message of a cycle: the outcome line plus an invitation to start over.
    pub(crate) fn outcome(outcome_line: &str) -> Self {
        Self::new(
            format!("{outcome_line}\n{ANOTHER_LETTER}"),
            Keyboard::NewLetter,
        )
    }
}

/// Delivers replies to a chat.
#[async_trait]
pub trait ChatOutbox: Send + Sync {
    async fn deliver(&self, chat_id: ChatId, reply: Reply) -> Result<()>;
}
