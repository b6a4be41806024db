//! Delivery channel boundary: the two transports that post documents.
//!
//! Both paths speak the Bot API `sendDocument` wire format. The lightweight
//! path goes through the hosted Bot API and is subject to its upload size
//! restriction; the fallback path goes through a self-hosted upload gateway
//! that mirrors the same contract without the restriction and additionally
//! serves archived documents back (`documents/{chat_id}/{message_id}`) for
//! the read surface.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result, SendError};
use crate::types::MessageId;

/// A document ready for delivery
#[derive(Debug, Clone)]
pub struct OutgoingDocument {
    /// File bytes
    pub data: Vec<u8>,
    /// Transport-safe filename
    pub filename: String,
    /// Caption shown under the document
    pub caption: String,
}

/// Posts documents to the archive channel and reads them back
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Send through the size-restricted lightweight path
    async fn send_lightweight(
        &self,
        chat_id: i64,
        doc: &OutgoingDocument,
    ) -> std::result::Result<MessageId, SendError>;

    /// Send through the unrestricted fallback path
    async fn send_fallback(
        &self,
        chat_id: i64,
        doc: &OutgoingDocument,
    ) -> std::result::Result<MessageId, SendError>;

    /// Retrieve a delivered document's bytes by message id
    ///
    /// Used by the read surface only, never by the delivery pipeline.
    /// Returns `Ok(None)` when the channel no longer has the message.
    async fn fetch_document(&self, chat_id: i64, message_id: MessageId) -> Result<Option<Vec<u8>>>;
}

/// Bot API envelope shared by both transports
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// The one field of a sent message the pipeline cares about
#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Telegram-backed implementation of [`DeliveryChannel`]
pub struct TelegramChannel {
    client: reqwest::Client,
    bot_token: String,
    api_base: String,
    gateway_base: String,
}

impl TelegramChannel {
    /// Create a channel over the hosted Bot API and the upload gateway
    pub fn new(
        bot_token: impl Into<String>,
        api_base: impl Into<String>,
        gateway_base: impl Into<String>,
    ) -> Result<Self> {
        let api_base = api_base.into();
        let gateway_base = gateway_base.into();
        for (key, base) in [("TELEGRAM_API_URL", &api_base), ("GATEWAY_URL", &gateway_base)] {
            url::Url::parse(base).map_err(|e| Error::Config {
                message: format!("invalid transport URL '{}': {}", base, e),
                key: Some(key.to_string()),
            })?;
        }

        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            bot_token: bot_token.into(),
            api_base,
            gateway_base,
        })
    }

    async fn send_document(
        &self,
        base: &str,
        chat_id: i64,
        doc: &OutgoingDocument,
    ) -> std::result::Result<MessageId, SendError> {
        let url = format!("{}/bot{}/sendDocument", base, self.bot_token);

        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", doc.caption.clone())
            .part(
                "document",
                reqwest::multipart::Part::bytes(doc.data.clone()).file_name(doc.filename.clone()),
            );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SendError::Transport(format!("sendDocument failed: {e}")))?;

        let status = response.status();
        let body: ApiResponse<SentMessage> = response
            .json()
            .await
            .map_err(|e| SendError::Transport(format!("invalid sendDocument response: {e}")))?;

        if !body.ok {
            let description = body.description.unwrap_or_default();
            // 400/413 cover the transport's size, part, and argument
            // rejections; everything else is a plain transport failure.
            if status == reqwest::StatusCode::BAD_REQUEST
                || status == reqwest::StatusCode::PAYLOAD_TOO_LARGE
            {
                return Err(SendError::Rejected(description));
            }
            return Err(SendError::Transport(description));
        }

        body.result
            .map(|m| MessageId(m.message_id))
            .ok_or_else(|| SendError::Transport("sendDocument returned no message".to_string()))
    }
}

#[async_trait]
impl DeliveryChannel for TelegramChannel {
    async fn send_lightweight(
        &self,
        chat_id: i64,
        doc: &OutgoingDocument,
    ) -> std::result::Result<MessageId, SendError> {
        self.send_document(&self.api_base, chat_id, doc).await
    }

    async fn send_fallback(
        &self,
        chat_id: i64,
        doc: &OutgoingDocument,
    ) -> std::result::Result<MessageId, SendError> {
        self.send_document(&self.gateway_base, chat_id, doc).await
    }

    async fn fetch_document(&self, chat_id: i64, message_id: MessageId) -> Result<Option<Vec<u8>>> {
        let url = format!(
            "{}/bot{}/documents/{}/{}",
            self.gateway_base, self.bot_token, chat_id, message_id
        );

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Channel(format!(
                "document fetch returned status {}",
                response.status()
            )));
        }

        Ok(Some(response.bytes().await?.to_vec()))
    }
}
