//! The wire side of the ActionCall protocol.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use runner_core::model::{MetaData, TestContext, TestState};

use crate::error::TransportError;

/// Parameters carried by an action call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionParams {
    #[serde(rename = "metaData", skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ActionParams {
    #[must_use]
    pub fn with_meta(mut self, meta: MetaData) -> Self {
        self.meta_data = Some(meta);
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// The server's reply to an action call: either a full replacement context
/// or the terminal closed sentinel. There are no partial/merge semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionReply {
    Context(Box<TestContext>),
    Closed,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawReply {
    // Tried first: a sentinel carries no context fields, so a full document
    // never matches the second variant by accident.
    Context(Box<TestContext>),
    Sentinel { state: TestState },
}

/// Decodes a reply body into an [`ActionReply`].
///
/// # Errors
///
/// Returns `TransportError::Decode` for unparseable bodies and
/// `TransportError::MalformedReply` for a bare-state sentinel that is not
/// `CLOSED`.
pub fn decode_reply(body: &str) -> Result<ActionReply, TransportError> {
    match serde_json::from_str::<RawReply>(body)? {
        RawReply::Context(context) => Ok(ActionReply::Context(context)),
        RawReply::Sentinel {
            state: TestState::Closed,
        } => Ok(ActionReply::Closed),
        RawReply::Sentinel { .. } => Err(TransportError::MalformedReply),
    }
}

/// One endpoint per action, POSTed with JSON parameters. The seam is a trait
/// so tests and embedders can substitute an in-memory authority.
#[async_trait]
pub trait ActionTransport: Send + Sync {
    /// Performs an action call and returns the replacement context or the
    /// closed sentinel.
    async fn call(&self, url: &str, params: &ActionParams)
    -> Result<ActionReply, TransportError>;

    /// Fire-and-acknowledge post with no context reply (comment storage).
    async fn post(&self, url: &str, params: &ActionParams) -> Result<(), TransportError>;
}

/// Transport settings, overridable from the environment.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Reads `RUNNER_HTTP_TIMEOUT_SECS`, falling back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = env::var("RUNNER_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// Production transport over reqwest.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a transport with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Http` if the underlying client cannot be
    /// constructed.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn send(
        &self,
        url: &str,
        params: &ActionParams,
    ) -> Result<reqwest::Response, TransportError> {
        let response = self.client.post(url).json(params).send().await?;
        match response.status() {
            StatusCode::FORBIDDEN => Err(TransportError::Unauthorized),
            status if !status.is_success() => Err(TransportError::Status(status)),
            _ => Ok(response),
        }
    }
}

#[async_trait]
impl ActionTransport for HttpTransport {
    async fn call(
        &self,
        url: &str,
        params: &ActionParams,
    ) -> Result<ActionReply, TransportError> {
        let response = self.send(url, params).await?;
        let body = response.text().await?;
        decode_reply(&body)
    }

    async fn post(&self, url: &str, params: &ActionParams) -> Result<(), TransportError> {
        self.send(url, params).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_full_context_reply() {
        let reply = decode_reply(
            r#"{
                "state": 1,
                "navigationMode": 0,
                "itemSessionState": 1,
                "itemIdentifier": "item-3",
                "isLast": false,
                "numberItems": 5,
                "numberCompleted": 2
            }"#,
        )
        .unwrap();
        match reply {
            ActionReply::Context(context) => {
                assert_eq!(context.item_identifier, "item-3");
                assert_eq!(context.state, TestState::Interacting);
            }
            ActionReply::Closed => panic!("expected a context reply"),
        }
    }

    #[test]
    fn decodes_the_closed_sentinel() {
        assert_eq!(decode_reply(r#"{"state": 4}"#).unwrap(), ActionReply::Closed);
    }

    #[test]
    fn rejects_a_non_closed_sentinel() {
        assert!(matches!(
            decode_reply(r#"{"state": 1}"#),
            Err(TransportError::MalformedReply)
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            decode_reply("not json"),
            Err(TransportError::Decode(_))
        ));
    }

    #[test]
    fn params_serialize_sparsely() {
        let params = ActionParams::default().with_position(7);
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({"position": 7}));
    }

    #[test]
    fn timeout_config_reads_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
