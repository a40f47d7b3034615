//! Conversation state for a single user.

use strum::{Display, EnumDiscriminants};

/// Where a user is in composing a letter.
///
/// Each phase carries the fields captured so far, so a field always exists
/// before the phase that reads it is entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, EnumDiscriminants)]
#[strum_discriminants(name(Phase), derive(Display))]
pub enum ConversationState {
    /// Waiting for the "New Letter" button
    #[default]
    Initial,
    AwaitSubject,
    AwaitBody {
        subject: String,
    },
    AwaitSender {
        subject: String,
        body: String,
    },
}

impl ConversationState {
    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_initial() {
        assert_eq!(ConversationState::default().phase(), Phase::Initial);
    }

    #[test]
    fn phase_ignores_captured_fields() {
        let state = ConversationState::AwaitSender {
            subject: "Hello".to_string(),
            body: "World".to_string(),
        };
        assert_eq!(state.phase(), Phase::AwaitSender);
        assert_eq!(state.phase().to_string(), "AwaitSender");
    }
}
