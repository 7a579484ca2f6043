//! Reveal/Delete Gateway
//!
//! Wraps the external message API. Each call issues exactly one network
//! request and performs no internal retry; retries, if any, belong to the
//! caller. Non-2xx responses, transport failures, and `{error}` bodies are
//! mapped uniformly into [`AppError::Transport`]; a 2xx reveal body missing
//! its expected fields is surfaced as [`AppError::MalformedResponse`] rather
//! than silently rendering empty content.

use crate::config::ApiConfig;
use crate::error::{AppError, Result};
use crate::models::{
    Attachment, MessageStatus, MessageSummary, MessageType, RevealPayload, RevealedContent,
};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Network seam of the lifecycle engine
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Fetch and decode the content of an unlocked message
    async fn reveal(&self, message_id: &str) -> Result<RevealPayload>;

    /// Remove a message server-side
    async fn delete(&self, message_id: &str) -> Result<()>;

    /// Best-effort status report; callers log failures and move on
    async fn update_status(&self, message_id: &str, status: MessageStatus) -> Result<()>;

    /// Fetch the raw bytes of a revealed document
    async fn download(&self, message_id: &str) -> Result<Attachment>;
}

#[derive(Debug, Deserialize)]
struct RevealResponseBody {
    success: Option<bool>,
    content: Option<String>,
    message_type: Option<MessageType>,
    is_binary: Option<bool>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponseBody {
    success: Option<bool>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageListBody {
    messages: Vec<MessageSummary>,
}

/// Turn a 2xx reveal body into a decoded payload
///
/// Binary content travels base64-encoded per the wire contract and is
/// decoded here, so the engine and renderer only ever see tagged content.
fn decode_reveal_payload(body: RevealResponseBody) -> Result<RevealPayload> {
    if let Some(error) = body.error {
        return Err(AppError::Transport(error));
    }
    if body.success == Some(false) {
        return Err(AppError::Transport("reveal rejected by server".to_string()));
    }

    let content = body
        .content
        .ok_or_else(|| AppError::MalformedResponse("reveal body missing `content`".to_string()))?;
    let message_type = body.message_type.ok_or_else(|| {
        AppError::MalformedResponse("reveal body missing `message_type`".to_string())
    })?;
    let is_binary = body.is_binary.ok_or_else(|| {
        AppError::MalformedResponse("reveal body missing `is_binary`".to_string())
    })?;

    let content = if is_binary {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(content.trim())
            .map_err(|e| AppError::Decode(format!("invalid base64 payload: {e}")))?;
        RevealedContent::Binary(bytes)
    } else {
        RevealedContent::Text(content)
    };

    Ok(RevealPayload {
        message_type,
        content,
    })
}

/// Best human-readable failure text for a non-2xx response
fn failure_message(operation: &str, status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<StatusResponseBody>(body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| format!("{operation} failed with status {status}"))
}

/// HTTP implementation of the gateway over the external message API
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    wallet_address: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            wallet_address: config.wallet_address.clone(),
        })
    }

    /// Empty body, or `{wallet_address}` when a wallet is configured
    fn request_body(&self) -> serde_json::Value {
        match &self.wallet_address {
            Some(wallet) => json!({ "wallet_address": wallet }),
            None => json!({}),
        }
    }

    /// Fetch the message listing used to seed the live set
    ///
    /// Snapshot-only; not part of the engine's gateway seam.
    pub async fn list_messages(&self) -> Result<Vec<MessageSummary>> {
        let url = format!("{}/messages", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(wallet) = &self.wallet_address {
            request = request.query(&[("wallet_address", wallet)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("message listing failed: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Transport(format!("message listing failed: {e}")))?;

        if !status.is_success() {
            return Err(AppError::Transport(failure_message(
                "message listing",
                status,
                &text,
            )));
        }

        let body: MessageListBody = serde_json::from_str(&text)
            .map_err(|e| AppError::MalformedResponse(format!("message listing: {e}")))?;
        Ok(body.messages)
    }
}

#[async_trait]
impl MessageGateway for HttpGateway {
    async fn reveal(&self, message_id: &str) -> Result<RevealPayload> {
        let url = format!("{}/messages/{}/reveal", self.base_url, message_id);
        debug!(message_id, "revealing message");

        let response = self
            .client
            .post(&url)
            .json(&self.request_body())
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("reveal request failed: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Transport(format!("reveal request failed: {e}")))?;

        if !status.is_success() {
            return Err(AppError::Transport(failure_message("reveal", status, &text)));
        }

        let body: RevealResponseBody = serde_json::from_str(&text)
            .map_err(|e| AppError::MalformedResponse(format!("reveal body: {e}")))?;
        decode_reveal_payload(body)
    }

    async fn delete(&self, message_id: &str) -> Result<()> {
        let url = format!("{}/messages/{}/delete", self.base_url, message_id);
        debug!(message_id, "deleting message");

        let response = self
            .client
            .delete(&url)
            .json(&self.request_body())
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("delete request failed: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Transport(format!("delete request failed: {e}")))?;

        if !status.is_success() {
            return Err(AppError::Transport(failure_message("delete", status, &text)));
        }

        if let Ok(body) = serde_json::from_str::<StatusResponseBody>(&text) {
            if body.success == Some(false) {
                return Err(AppError::Transport(
                    body.error.unwrap_or_else(|| "delete rejected by server".to_string()),
                ));
            }
        }

        Ok(())
    }

    async fn update_status(&self, message_id: &str, status: MessageStatus) -> Result<()> {
        let url = format!("{}/messages/{}/status", self.base_url, message_id);

        let response = self
            .client
            .put(&url)
            .json(&json!({ "status": status.as_str() }))
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("status update failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Transport(format!(
                "status update failed with status {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn download(&self, message_id: &str) -> Result<Attachment> {
        let url = format!("{}/download/{}", self.base_url, message_id);
        debug!(message_id, "downloading attachment");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("download request failed: {e}")))?;
        let status = response.status();

        if !status.is_success() {
            return Err(AppError::Transport(format!(
                "download failed with status {status}"
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Transport(format!("download request failed: {e}")))?;

        Ok(Attachment {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
