//! The per-user state machine driving letter composition.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use log::{debug, error, info, warn};

use crate::error::Result;
use crate::mailer::{Mailer, OutboundEmail, SendOutcome};
use crate::types::{ChatId, IncomingMessage, UserId};

use super::reply::{ChatOutbox, NEW_LETTER_BUTTON, Reply};
use super::state::{ConversationState, Phase};

const START_COMMAND: &str = "/start";

/// Owns every user's conversation state and the mailer used to finish a cycle.
///
/// Updates must be fed one at a time: `&mut self` on every handler is what
/// guarantees a single in-flight cycle per user.
pub struct ConversationEngine<M> {
    mailer: M,
    states: HashMap<UserId, ConversationState>,
}

impl<M: Mailer> ConversationEngine<M> {
    pub fn new(mailer: M) -> Self {
        Self {
            mailer,
            states: HashMap::new(),
        }
    }

    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    /// Current phase of a user, or `None` if the user never wrote.
    pub fn phase(&self, user_id: UserId) -> Option<Phase> {
        self.states.get(&user_id).map(ConversationState::phase)
    }

    /// Routes an incoming text to `/start` handling or to the state machine.
    pub async fn dispatch<O>(&mut self, message: &IncomingMessage, outbox: &O) -> Result<()>
    where
        O: ChatOutbox + ?Sized,
    {
        let text = message.text.trim();
        info!(
            "[{}] Received message: {} (user id {})",
            message.display_name, text, message.user_id
        );

        if is_start_command(text) {
            self.handle_start(message.user_id, message.chat_id, outbox)
                .await
        } else {
            self.handle_message(message.user_id, message.chat_id, text, outbox)
                .await
        }
    }

    /// Resets the user to the initial phase and greets them with the start button.
    pub async fn handle_start<O>(
        &mut self,
        user_id: UserId,
        chat_id: ChatId,
        outbox: &O,
    ) -> Result<()>
    where
        O: ChatOutbox + ?Sized,
    {
        self.states.insert(user_id, ConversationState::Initial);
        debug!("User {user_id} reset to {}", Phase::Initial);
        outbox.deliver(chat_id, Reply::greeting()).await
    }

    /// Advances the user's conversation by one reply.
    pub async fn handle_message<O>(
        &mut self,
        user_id: UserId,
        chat_id: ChatId,
        text: &str,
        outbox: &O,
    ) -> Result<()>
    where
        O: ChatOutbox + ?Sized,
    {
        let state = match self.states.entry(user_id) {
            Entry::Vacant(entry) => {
                entry.insert(ConversationState::Initial);
                debug!("New user {user_id} created in {}", Phase::Initial);
                return outbox.deliver(chat_id, Reply::start_prompt()).await;
            }
            Entry::Occupied(entry) => entry.into_mut(),
        };

        // Taking the state leaves Initial behind, which is where a finished
        // send attempt must land whatever its outcome.
        let reply = match std::mem::take(state) {
            ConversationState::Initial if text == NEW_LETTER_BUTTON => {
                *state = ConversationState::AwaitSubject;
                Reply::ask_subject()
            }
            ConversationState::Initial => {
                debug!("Ignoring stray input from user {user_id} in {}", Phase::Initial);
                Reply::start_prompt()
            }
            ConversationState::AwaitSubject => {
                *state = ConversationState::AwaitBody {
                    subject: text.to_string(),
                };
                Reply::ask_body()
            }
            ConversationState::AwaitBody { subject } => {
                *state = ConversationState::AwaitSender {
                    subject,
                    body: text.to_string(),
                };
                Reply::ask_sender()
            }
            ConversationState::AwaitSender { subject, body } => {
                let email = OutboundEmail {
                    subject,
                    body,
                    sender_name: text.to_string(),
                };
                return self.send_letter(chat_id, email, outbox).await;
            }
        };

        debug!("User {user_id} now in {}", state.phase());
        outbox.deliver(chat_id, reply).await
    }

    async fn send_letter<O>(
        &self,
        chat_id: ChatId,
        email: OutboundEmail,
        outbox: &O,
    ) -> Result<()>
    where
        O: ChatOutbox + ?Sized,
    {
        if let Err(e) = outbox.deliver(chat_id, Reply::sending()).await {
            warn!("Failed to deliver sending notice to chat {chat_id}: {e}");
        }

        let outcome = self.mailer.send(&email).await;
        match &outcome {
            SendOutcome::Success(id) => info!("Letter for chat {chat_id} sent, id {id}"),
            SendOutcome::AmbiguousSuccess => {
                info!("Letter for chat {chat_id} sent without a readable id");
            }
            SendOutcome::ProviderError(message) => {
                error!("Letter for chat {chat_id} rejected by provider: {message}");
            }
            SendOutcome::TransportError(detail) => {
                error!("Letter for chat {chat_id} failed in transport: {detail}");
            }
        }

        outbox
            .deliver(chat_id, Reply::outcome(&outcome.user_message()))
            .await
    }
}

/// Matches `/start` and `/start@bot_name`. Anything longer is ordinary text,
/// so a subject like "/start the engine" is captured as typed.
fn is_start_command(text: &str) -> bool {
    text == START_COMMAND
        || text
            .strip_prefix(START_COMMAND)
            .and_then(|rest| rest.strip_prefix('@'))
            .is_some_and(|bot| !bot.is_empty() && !bot.contains(char::is_whitespace))
}
