//! Thin client for the Slack Web API.
//!
//! Covers exactly the surface the feed and the interactive handlers need:
//! posting, updating, and deleting messages, and uploading files into a
//! thread. Everything else about the chat platform (event transport, slash
//! commands, button callbacks) is an external collaborator that hands us
//! opaque text and identifiers.
//!
//! The base URL is injectable so the client can be pointed at a local stub;
//! the HTTP client is constructor-injected like every other collaborator.

use crate::error::SlackError;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://slack.com/api";

/// Slack Web API client bound to one bot token.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

/// The common envelope every Web API method answers with.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    upload_url: Option<String>,
    #[serde(default)]
    file_id: Option<String>,
}

impl SlackClient {
    pub fn new(http: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (stub server in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Post a message, optionally as a thread reply. Returns the message ts.
    ///
    /// Link unfurling is disabled — digest messages carry paper links and an
    /// unfurl preview would duplicate the abstract reply.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<String, SlackError> {
        let mut payload = json!({
            "channel": channel,
            "text": text,
            "unfurl_links": false,
            "unfurl_media": false,
        });
        if let Some(ts) = thread_ts {
            payload["thread_ts"] = json!(ts);
        }

        let envelope = self.call_json("chat.postMessage", &payload).await?;
        envelope.ts.ok_or_else(|| SlackError::MalformedResponse {
            method: "chat.postMessage".into(),
            detail: "missing ts".into(),
        })
    }

    /// Replace the text of an existing message.
    pub async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        text: &str,
    ) -> Result<(), SlackError> {
        let payload = json!({ "channel": channel, "ts": ts, "text": text });
        self.call_json("chat.update", &payload).await.map(|_| ())
    }

    /// Delete a message.
    pub async fn delete_message(&self, channel: &str, ts: &str) -> Result<(), SlackError> {
        let payload = json!({ "channel": channel, "ts": ts });
        self.call_json("chat.delete", &payload).await.map(|_| ())
    }

    /// Upload a file into a channel (or thread) via the external-upload flow:
    /// reserve an upload URL, send the bytes, then complete the upload.
    pub async fn upload_file(
        &self,
        channel: &str,
        filename: &str,
        title: &str,
        bytes: Vec<u8>,
        thread_ts: Option<&str>,
    ) -> Result<(), SlackError> {
        let length = bytes.len();
        let reserve = self
            .call_form(
                "files.getUploadURLExternal",
                &[("filename", filename), ("length", &length.to_string())],
            )
            .await?;

        let upload_url = reserve.upload_url.ok_or_else(|| SlackError::MalformedResponse {
            method: "files.getUploadURLExternal".into(),
            detail: "missing upload_url".into(),
        })?;
        let file_id = reserve.file_id.ok_or_else(|| SlackError::MalformedResponse {
            method: "files.getUploadURLExternal".into(),
            detail: "missing file_id".into(),
        })?;

        let response = self
            .http
            .post(&upload_url)
            .body(bytes)
            .send()
            .await
            .map_err(|e| SlackError::Transport {
                method: "file upload".into(),
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(SlackError::Transport {
                method: "file upload".into(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let mut complete = json!({
            "files": [{ "id": file_id, "title": title }],
            "channel_id": channel,
        });
        if let Some(ts) = thread_ts {
            complete["thread_ts"] = json!(ts);
        }
        self.call_json("files.completeUploadExternal", &complete)
            .await
            .map(|_| ())?;

        debug!("Uploaded '{filename}' ({length} bytes)");
        Ok(())
    }

    async fn call_json(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<ApiEnvelope, SlackError> {
        let request = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .bearer_auth(&self.token)
            .json(payload);
        self.finish(method, request).await
    }

    async fn call_form(
        &self,
        method: &str,
        fields: &[(&str, &str)],
    ) -> Result<ApiEnvelope, SlackError> {
        let request = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .bearer_auth(&self.token)
            .form(fields);
        self.finish(method, request).await
    }

    async fn finish(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<ApiEnvelope, SlackError> {
        let response = request.send().await.map_err(|e| SlackError::Transport {
            method: method.to_string(),
            reason: e.to_string(),
        })?;
        if !response.status().is_success() {
            return Err(SlackError::Transport {
                method: method.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let envelope: ApiEnvelope =
            response
                .json()
                .await
                .map_err(|e| SlackError::MalformedResponse {
                    method: method.to_string(),
                    detail: e.to_string(),
                })?;

        if !envelope.ok {
            return Err(SlackError::Api {
                method: method.to_string(),
                error: envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(envelope)
    }
}

/// mrkdwn link for a paper digest message: `<link|*title*>`.
pub fn paper_link_text(link: &str, title: &str) -> String {
    format!("<{link}|*{title}*>")
}
