//! Delivery client: one webhook POST per document, no retries.
//!
//! Wire format: `{ "content": <text>, "credential": <bot key>, "groupMode": 1 }`
//! sent as `application/json`. A delivery counts as accepted only when the
//! HTTP status is 200 *and* the reply body carries status code 200
//! (`retCode`, falling back to `status`).

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use courier_core::{Credential, Document};

/// Grouping mode flag sent with every message.
pub const GROUP_MODE: u8 = 1;
/// Status code the endpoint puts in the reply body on acceptance.
pub const ACCEPTED_CODE: i64 = 200;

const BODY_PREVIEW_CHARS: usize = 300;

/// Why a single delivery was not accepted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Connection, TLS, timeout or body read failure.
    #[error("request failed: {0}")]
    Transport(String),

    #[error("endpoint returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("endpoint reply has no status code: {body}")]
    MalformedReply { body: String },

    #[error("endpoint rejected message: {body}")]
    Rejected { body: String },
}

/// Request body posted to the webhook.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DeliveryPayload<'a> {
    pub content: &'a str,
    pub credential: &'a str,
    #[serde(rename = "groupMode")]
    pub group_mode: u8,
}

impl<'a> DeliveryPayload<'a> {
    pub fn new(content: &'a str, credential: &'a Credential) -> Self {
        Self {
            content,
            credential: credential.expose(),
            group_mode: GROUP_MODE,
        }
    }
}

/// Something that can hand a document to the delivery endpoint.
pub trait Transport {
    fn deliver(&self, document: &Document) -> Result<(), DeliveryError>;
}

/// Blocking webhook client.
#[derive(Debug)]
pub struct WebhookClient {
    agent: ureq::Agent,
    url: String,
    credential: Credential,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, credential: Credential, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            url: url.into(),
            credential,
        }
    }
}

impl Transport for WebhookClient {
    fn deliver(&self, document: &Document) -> Result<(), DeliveryError> {
        let payload = DeliveryPayload::new(&document.content, &self.credential);
        let result = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_json(&payload);

        match result {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|e| DeliveryError::Transport(e.to_string()))?;
                classify_reply(status, &body)
            }
            Err(ureq::Error::Status(code, response)) => Err(DeliveryError::Status {
                code,
                body: preview(&response.into_string().unwrap_or_default()),
            }),
            Err(ureq::Error::Transport(err)) => Err(DeliveryError::Transport(err.to_string())),
        }
    }
}

/// Decide whether an HTTP reply means the message was accepted.
pub fn classify_reply(http_status: u16, body: &str) -> Result<(), DeliveryError> {
    if http_status != 200 {
        return Err(DeliveryError::Status {
            code: http_status,
            body: preview(body),
        });
    }

    let code = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .get("retCode")
            .or_else(|| value.get("status"))
            .and_then(Value::as_i64)
    });

    match code {
        Some(ACCEPTED_CODE) => Ok(()),
        Some(_) => Err(DeliveryError::Rejected {
            body: preview(body),
        }),
        None => Err(DeliveryError::MalformedReply {
            body: preview(body),
        }),
    }
}

fn preview(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= BODY_PREVIEW_CHARS {
        return body.to_string();
    }
    let mut shown: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
    shown.push('…');
    shown
}
