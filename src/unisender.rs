//! Unisender `sendEmail` client.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::mailer::{Mailer, OutboundEmail, SendOutcome};

const LIST_ID: u32 = 1;

/// Form body of a `sendEmail` call.
#[derive(Debug, Serialize)]
struct SendEmailForm<'a> {
    format: &'static str,
    api_key: &'a str,
    sender_name: &'a str,
    sender_email: &'a str,
    email: &'a str,
    subject: &'a str,
    body: &'a str,
    list_id: u32,
    error_checking: u8,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    #[serde(default)]
    result: Option<SendResult>,
    #[serde(default)]
    error: Option<String>,
}

/// `result` is an array of ids on success but its shape is not guaranteed.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SendResult {
    Ids(Vec<u64>),
    /// Array serialized into a string, e.g. `"[123,456]"`
    Encoded(String),
    Other(Value),
}

impl SendResult {
    fn first_id(&self) -> Option<u64> {
        match self {
            SendResult::Ids(ids) => ids.first().copied(),
            SendResult::Encoded(raw) => serde_json::from_str::<Vec<u64>>(raw)
                .ok()
                .and_then(|ids| ids.first().copied()),
            SendResult::Other(_) => None,
        }
    }

    fn raw(&self) -> String {
        match self {
            SendResult::Ids(ids) => format!("{ids:?}"),
            SendResult::Encoded(raw) => raw.clone(),
            SendResult::Other(value) => value.to_string(),
        }
    }
}

/// Mailer backed by the Unisender HTTP API.
pub struct UnisenderMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    target_email: String,
    sender_email: String,
}

impl UnisenderMailer {
    pub fn new(
        api_url: String,
        api_key: String,
        target_email: String,
        sender_email: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            target_email,
            sender_email,
        }
    }

    fn build_request(&self, email: &OutboundEmail) -> reqwest::RequestBuilder {
        let form = SendEmailForm {
            format: "json",
            api_key: &self.api_key,
            sender_name: &email.sender_name,
            sender_email: &self.sender_email,
            email: &self.target_email,
            subject: &email.subject,
            body: &email.body,
            list_id: LIST_ID,
            error_checking: 1,
        };

        self.client.post(&self.api_url).form(&form)
    }

    async fn submit(&self, email: &OutboundEmail) -> Result<String> {
        let response = self.build_request(email).send().await?;
        debug!("Unisender responded with status {}", response.status());
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Mailer for UnisenderMailer {
    async fn send(&self, email: &OutboundEmail) -> SendOutcome {
        info!(
            "Preparing letter: subject '{}', sender '{}', recipient {}",
            email.subject, email.sender_name, self.target_email
        );

        match self.submit(email).await {
            Ok(body) => classify_response(&body),
            Err(e) => {
                error!("Unisender request failed: {e}");
                SendOutcome::TransportError(e.to_string())
            }
        }
    }
}

/// Maps a raw `sendEmail` response body to an outcome.
pub fn classify_response(body: &str) -> SendOutcome {
    let response: SendEmailResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to decode Unisender response: {e}; raw body: {body}");
            return SendOutcome::TransportError(format!("failed to decode response: {e}"));
        }
    };

    if let Some(message) = response.error.filter(|message| !message.is_empty()) {
        error!("Unisender API error: {message}");
        return SendOutcome::ProviderError(message);
    }

    match response.result.as_ref().and_then(SendResult::first_id) {
        Some(id) => {
            info!("Letter sent, id {id}");
            SendOutcome::Success(id)
        }
        None => {
            let raw = response
                .result
                .as_ref()
                .map_or_else(|| "<absent>".to_string(), SendResult::raw);
            warn!("Unexpected Unisender result format, assuming success; raw result: {raw}");
            SendOutcome::AmbiguousSuccess
        }
    }
}
