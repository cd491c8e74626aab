//! Outbound SMS gateway.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::GatewayConfig;
use crate::models::MessageId;

/// Failure reported by (or while reaching) the SMS gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct GatewayError {
    pub message: String,
    /// Provider-specific error code, when the gateway supplied one.
    pub code: Option<i64>,
    /// HTTP status of the gateway response, absent for transport failures.
    pub status: Option<u16>,
}

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            status: None,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        let mut gateway_err = GatewayError::new(err.to_string());
        gateway_err.status = err.status().map(|s| s.as_u16());
        gateway_err
    }
}

/// The one capability the dispatcher needs from a provider.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, body: &str, to: &str, from: &str) -> Result<MessageId, GatewayError>;
}

#[derive(Deserialize, Debug)]
struct MessageResource {
    sid: String,
}

#[derive(Deserialize, Debug, Default)]
struct TwilioErrorBody {
    code: Option<i64>,
    message: Option<String>,
    more_info: Option<String>,
}

/// Twilio Programmable Messaging client.
pub struct TwilioClient {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    pub fn new(gateway: &GatewayConfig, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            account_sid: gateway.account_id.clone(),
            auth_token: gateway.auth_secret.clone(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }
}

#[async_trait]
impl SmsGateway for TwilioClient {
    #[instrument(skip(self, body), fields(body_len = body.len()))]
    async fn send(&self, body: &str, to: &str, from: &str) -> Result<MessageId, GatewayError> {
        info!("Attempting to send SMS to: {}", to);

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let resource: MessageResource = response.json().await?;
            info!("SMS accepted for: {} (sid {})", to, resource.sid);
            return Ok(MessageId(resource.sid));
        }

        let text = response.text().await.unwrap_or_default();
        debug!("Gateway error body: {}", text);

        let parsed: TwilioErrorBody = serde_json::from_str(&text).unwrap_or_default();
        if let Some(more_info) = &parsed.more_info {
            debug!("Gateway error reference: {}", more_info);
        }

        let message = parsed
            .message
            .unwrap_or_else(|| format!("Gateway responded with status {}", status.as_u16()));
        let mut err = GatewayError::new(message).with_status(status.as_u16());
        if let Some(code) = parsed.code {
            err = err.with_code(code);
        }

        warn!(status = status.as_u16(), code = ?err.code, "Gateway rejected SMS to: {}", to);
        Err(err)
    }
}
