//! Outbound email abstraction used by the conversation engine.

use async_trait::async_trait;

/// The three user-supplied parts of a letter, assembled fresh for every send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub subject: String,
    pub body: String,
    pub sender_name: String,
}

/// Classified result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Provider accepted the letter and returned its identifier
    Success(u64),
    /// Provider reported an error; the letter was not delivered
    ProviderError(String),
    /// Request failed or the response could not be decoded; delivery is unknown
    TransportError(String),
    /// Provider reported no error but no identifier could be extracted
    AmbiguousSuccess,
}

impl SendOutcome {
    /// Returns the single outcome line shown to the user.
    ///
    /// Ambiguous success reads exactly like success.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SendOutcome::Success(_) | SendOutcome::AmbiguousSuccess => {
                "The letter was sent successfully!".to_string()
            }
            SendOutcome::ProviderError(message) => format!("Email provider error: {message}"),
            SendOutcome::TransportError(detail) => {
                format!("Error while sending the letter: {detail}")
            }
        }
    }
}

/// Sends one email and classifies the provider's answer.
///
/// Transport failures are folded into [`SendOutcome::TransportError`], so
/// sending never fails with an error of its own.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> SendOutcome;
}
