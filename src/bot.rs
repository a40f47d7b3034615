//! Telegram bot wiring: the single sequential consumer of updates.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::sync::watch;

use crate::config::Config;
use crate::conversation::{ChatOutbox, ConversationEngine};
use crate::error::Result;
use crate::mailer::Mailer;
use crate::telegram::{POLL_TIMEOUT_SECS, TelegramClient, Update};
use crate::unisender::UnisenderMailer;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Ordered stream of inbound updates.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Returns the next batch of updates with `update_id >= offset`.
    async fn fetch_updates(&self, offset: i64) -> Result<Vec<Update>>;
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn fetch_updates(&self, offset: i64) -> Result<Vec<Update>> {
        self.get_updates(offset, POLL_TIMEOUT_SECS).await
    }
}

/// Run the Telegram bot until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    info!("Initializing bot");
    debug!("Bot token length: {} characters", config.bot_token.len());
    debug!(
        "Unisender API key length: {} characters",
        config.unisender_api_key.len()
    );
    debug!("Target email: {}", config.target_email);
    debug!("Sender email: {}", config.sender_email);

    let telegram = TelegramClient::new(&config.bot_token)?;
    let me = telegram.get_me().await?;
    info!("Authorized on account {}", me.display_name());

    let mailer = UnisenderMailer::new(
        config.unisender_api_url,
        config.unisender_api_key,
        config.target_email,
        config.sender_email,
    );
    let mut engine = ConversationEngine::new(mailer);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, finishing the current update...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!("Failed to listen for the shutdown signal: {e}"),
        }
    });

    info!("Polling for updates");
    poll_updates(&telegram, &mut engine, shutdown_rx).await;
    info!("Update polling stopped");

    Ok(())
}

/// Feeds updates to the engine strictly one at a time, in arrival order.
///
/// Shutdown is honoured only while waiting for updates or between two
/// updates, so a started send always runs to completion.
async fn poll_updates<S, M>(
    chat: &S,
    engine: &mut ConversationEngine<M>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: UpdateSource + ChatOutbox,
    M: Mailer,
{
    let mut offset = 0;

    loop {
        let fetched = tokio::select! {
            biased;
            Ok(_) = shutdown.wait_for(|stop| *stop) => return,
            fetched = chat.fetch_updates(offset) => fetched,
        };

        let updates = match fetched {
            Ok(updates) => updates,
            Err(e) => {
                warn!("Failed to fetch updates: {e}; retrying in {RETRY_DELAY:?}");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            if *shutdown.borrow() {
                return;
            }

            offset = offset.max(update.update_id + 1);
            debug!("Received update {}", update.update_id);

            let Some(message) = update.into_incoming() else {
                debug!("Ignoring non-text update");
                continue;
            };

            if let Err(e) = engine.dispatch(&message, chat).await {
                error!(
                    "Error handling message from {} in chat {}: {e}",
                    message.display_name, message.chat_id
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::conversation::{NEW_LETTER_BUTTON, Phase, Reply};
    use crate::mailer::{OutboundEmail, SendOutcome};
    use crate::types::{ChatId, UserId};

    /// Serves scripted update batches, then waits forever.
    #[derive(Default)]
    struct ScriptedChat {
        batches: Mutex<VecDeque<Vec<Update>>>,
        replies: Mutex<Vec<Reply>>,
    }

    #[async_trait]
    impl UpdateSource for ScriptedChat {
        async fn fetch_updates(&self, _offset: i64) -> Result<Vec<Update>> {
            let next = self.batches.lock().expect("batches lock").pop_front();
            match next {
                Some(batch) => Ok(batch),
                None => std::future::pending().await,
            }
        }
    }

    #[async_trait]
    impl ChatOutbox for ScriptedChat {
        async fn deliver(&self, _chat_id: ChatId, reply: Reply) -> Result<()> {
            self.replies.lock().expect("replies lock").push(reply);
            Ok(())
        }
    }

    /// Requests shutdown while a letter is in flight.
    struct ShutdownDuringSend {
        shutdown: watch::Sender<bool>,
        sent: Mutex<Vec<OutboundEmail>>,
    }

    #[async_trait]
    impl Mailer for ShutdownDuringSend {
        async fn send(&self, email: &OutboundEmail) -> SendOutcome {
            let _ = self.shutdown.send(true);
            tokio::task::yield_now().await;
            self.sent.lock().expect("sent lock").push(email.clone());
            SendOutcome::Success(9)
        }
    }

    fn text_update(update_id: i64, text: &str) -> Update {
        serde_json::from_value(json!({
            "update_id": update_id,
            "message": {
                "message_id": update_id,
                "from": {"id": 7, "first_name": "Alice"},
                "chat": {"id": 70},
                "text": text
            }
        }))
        .expect("valid update")
    }

    #[tokio::test]
    async fn shutdown_lets_the_current_send_finish() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut engine = ConversationEngine::new(ShutdownDuringSend {
            shutdown: shutdown_tx,
            sent: Mutex::new(Vec::new()),
        });
        let chat = ScriptedChat::default();
        chat.batches.lock().expect("batches lock").push_back(vec![
            text_update(1, "/start"),
            text_update(2, NEW_LETTER_BUTTON),
            text_update(3, "Hello"),
            text_update(4, "World"),
            text_update(5, "Alice"),
            text_update(6, "/start"),
        ]);

        tokio::time::timeout(
            Duration::from_secs(5),
            poll_updates(&chat, &mut engine, shutdown_rx),
        )
        .await
        .expect("polling should stop after shutdown");

        assert_eq!(engine.mailer().sent.lock().expect("sent lock").len(), 1);
        let replies = chat.replies.lock().expect("replies lock");
        assert_eq!(
            replies.last(),
            Some(&Reply::outcome(&SendOutcome::Success(9).user_message()))
        );
        assert_eq!(engine.phase(UserId(7)), Some(Phase::Initial));
    }

    #[tokio::test]
    async fn shutdown_while_idle_stops_polling() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut engine = ConversationEngine::new(ShutdownDuringSend {
            shutdown: watch::channel(false).0,
            sent: Mutex::new(Vec::new()),
        });
        let chat = ScriptedChat::default();

        shutdown_tx.send(true).expect("receiver alive");
        tokio::time::timeout(
            Duration::from_secs(5),
            poll_updates(&chat, &mut engine, shutdown_rx),
        )
        .await
        .expect("polling should stop after shutdown");

        assert!(chat.replies.lock().expect("replies lock").is_empty());
    }
}
