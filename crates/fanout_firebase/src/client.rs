//! Firebase Cloud Messaging client module
//!
//! [`FirebaseClient`] talks to the FCM HTTP v1 API and implements
//! [`PushProvider`]. The v1 API accepts one token per request, so a batch is
//! sent as concurrent single-token requests that share one access token.
//! Rejections reported by FCM are classified into [`FailureReason`]s; only
//! faults that affect the whole call are returned as errors.

use crate::auth::FirebaseAuth;
use fanout_common::http::client::DEFAULT_TIMEOUT_SECS;
use fanout_common::{
    address_preview, create_client, BoxFuture, FailureReason, Outcome, ProviderError,
    PushMessage, PushProvider,
};
use futures::stream::{self, StreamExt};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Base URL of the FCM HTTP v1 API.
pub const FCM_BASE_URL: &str = "https://fcm.googleapis.com";

/// Number of single-token requests in flight per batch.
const CONCURRENT_REQUESTS: usize = 50;

/// A message to be sent via Firebase Cloud Messaging
///
/// Top-level wrapper required by the FCM HTTP v1 API.
#[derive(Debug, Serialize)]
pub struct FcmMessage<'a> {
    pub message: Message<'a>,
}

/// The message payload for one registration token.
#[derive(Debug, Serialize)]
pub struct Message<'a> {
    pub token: &'a str,

    pub notification: Notification<'a>,

    /// Custom key-value data delivered to the client app.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a HashMap<String, String>>,
}

/// The notification displayed on the device.
#[derive(Debug, Serialize)]
pub struct Notification<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

impl<'a> FcmMessage<'a> {
    pub fn for_token(token: &'a str, message: &'a PushMessage) -> Self {
        Self {
            message: Message {
                token,
                notification: Notification {
                    title: &message.title,
                    body: &message.body,
                },
                data: (!message.data.is_empty()).then_some(&message.data),
            },
        }
    }
}

/// Response from the FCM API after a successful send.
#[derive(Debug, Deserialize)]
pub struct FcmResponse {
    /// Message name in the format "projects/{project_id}/messages/{message_id}"
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct FcmErrorResponse {
    error: FcmErrorBody,
}

#[derive(Debug, Deserialize)]
struct FcmErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<FcmErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FcmErrorDetail {
    #[serde(default)]
    error_code: Option<String>,
}

/// Classify an FCM error response into a failure reason and a message.
///
/// The FCM-specific `errorCode` in `details` takes precedence over the
/// generic RPC `status`; the HTTP status code is the last resort. Only an
/// FCM `UNREGISTERED` code marks the token as gone: a bare 404 or a generic
/// `NOT_FOUND` may come from a misrouted endpoint and stays `Unknown`.
pub fn classify_error(status: StatusCode, body: &str) -> (FailureReason, String) {
    let parsed = serde_json::from_str::<FcmErrorResponse>(body).ok();
    let (fcm_code, code, message) = match &parsed {
        Some(resp) => {
            let fcm_code = resp.error.details.iter().find_map(|d| d.error_code.clone());
            let code = fcm_code.clone().unwrap_or_else(|| resp.error.status.clone());
            let message = if resp.error.message.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                resp.error.message.clone()
            };
            (fcm_code, code, message)
        }
        None => (
            None,
            String::new(),
            format!("HTTP {}: {}", status.as_u16(), body.trim()),
        ),
    };

    let reason = match code.as_str() {
        "UNREGISTERED" if fcm_code.is_some() => FailureReason::Unregistered,
        "SENDER_ID_MISMATCH" => FailureReason::InvalidToken,
        "INVALID_ARGUMENT" => {
            if message.to_lowercase().contains("registration token") {
                FailureReason::InvalidToken
            } else {
                FailureReason::InvalidPayload
            }
        }
        "QUOTA_EXCEEDED" | "RESOURCE_EXHAUSTED" => FailureReason::RateLimited,
        "UNAVAILABLE" | "INTERNAL" => FailureReason::Unavailable,
        "NOT_FOUND" => FailureReason::Unknown,
        _ if status == StatusCode::TOO_MANY_REQUESTS => FailureReason::RateLimited,
        _ if status.is_server_error() => FailureReason::Unavailable,
        _ => FailureReason::Unknown,
    };
    (reason, message)
}

/// Client for the Firebase Cloud Messaging HTTP v1 API
pub struct FirebaseClient {
    client: Client,
    project_id: String,
    auth: FirebaseAuth,
    base_url: String,
}

impl FirebaseClient {
    /// Creates a client for `project_id` authenticating with a service account key.
    pub fn new(project_id: impl Into<String>, key_path: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        Self::with_auth(project_id, FirebaseAuth::service_account(key_path))
    }

    pub fn with_auth(project_id: impl Into<String>, auth: FirebaseAuth) -> Result<Self, ProviderError> {
        let project_id = project_id.into();
        if project_id.trim().is_empty() {
            return Err(ProviderError::Config(
                "Missing project_id in FirebaseConfig".to_string(),
            ));
        }
        Ok(Self {
            client: create_client(DEFAULT_TIMEOUT_SECS)?,
            project_id,
            auth,
            base_url: FCM_BASE_URL.to_string(),
        })
    }

    /// Point the client at another API host, e.g. an emulator.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn send_url(&self) -> String {
        format!("{}/v1/projects/{}/messages:send", self.base_url, self.project_id)
    }

    /// Post one message and classify the answer.
    ///
    /// A network error is returned as `Err`; every HTTP answer becomes an
    /// [`Outcome`].
    async fn post(
        &self,
        url: &str,
        bearer: &str,
        address: &str,
        message: &PushMessage,
    ) -> Result<Outcome, ProviderError> {
        let response = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
            .json(&FcmMessage::for_token(address, message))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let fcm_response: FcmResponse = response.json().await?;
            return Ok(Outcome::delivered(fcm_response.name));
        }

        let body = response.text().await.unwrap_or_default();
        let (reason, text) = classify_error(status, &body);
        debug!(
            "FCM rejected {}: {} {} ({})",
            address_preview(address),
            status,
            reason,
            text
        );
        Ok(Outcome::failed(reason, text))
    }

    async fn send_single(&self, address: &str, message: &PushMessage) -> Result<Outcome, ProviderError> {
        let bearer = self.auth.access_token().await?;
        self.post(&self.send_url(), &bearer, address, message).await
    }

    /// Like [`Self::post`], but a network error becomes an `Unavailable`
    /// outcome for this address only.
    async fn post_or_unavailable(
        &self,
        url: &str,
        bearer: &str,
        address: &str,
        message: &PushMessage,
    ) -> Outcome {
        match self.post(url, bearer, address, message).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("FCM request for {} failed: {}", address_preview(address), err);
                Outcome::failed(FailureReason::Unavailable, err.to_string())
            }
        }
    }

    async fn send_many(
        &self,
        addresses: &[String],
        message: &PushMessage,
    ) -> Result<Vec<Outcome>, ProviderError> {
        let bearer = self.auth.access_token().await?;
        let url = self.send_url();

        let requests: Vec<_> = addresses
            .iter()
            .map(|address| self.post_or_unavailable(&url, &bearer, address, message))
            .collect();
        let outcomes: Vec<Outcome> = stream::iter(requests)
            .buffered(CONCURRENT_REQUESTS)
            .collect()
            .await;

        Ok(outcomes)
    }
}

impl PushProvider for FirebaseClient {
    fn name(&self) -> &'static str {
        "firebase"
    }

    fn send_one<'a>(
        &'a self,
        address: &'a str,
        message: &'a PushMessage,
    ) -> BoxFuture<'a, Outcome, ProviderError> {
        Box::pin(self.send_single(address, message))
    }

    fn send_batch<'a>(
        &'a self,
        addresses: &'a [String],
        message: &'a PushMessage,
    ) -> BoxFuture<'a, Vec<Outcome>, ProviderError> {
        Box::pin(self.send_many(addresses, message))
    }
}
