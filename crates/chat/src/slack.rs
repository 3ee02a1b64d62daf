// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slack Web API implementation of [`ChatClient`].
//!
//! Every call carries a 10 second deadline. Idempotent reads get exactly one
//! retry on transport failure; mutations are never retried (the reaction
//! reducer makes retried *events* safe, retried *posts* would duplicate).

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::api::{ChatClient, ChatError, MessageRef, ReactionOnMessage};

const CALL_DEADLINE: Duration = Duration::from_secs(10);

pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
}

impl SlackClient {
    pub fn new() -> Result<Self, ChatError> {
        let http = reqwest::Client::builder().timeout(CALL_DEADLINE).build()?;
        Ok(Self { http, base_url: "https://slack.com/api".to_string() })
    }

    /// Point the client at a different API root (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post_api(
        &self,
        token: &str,
        method: &str,
        body: &Value,
    ) -> Result<Value, ChatError> {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        response.error_for_status_ref()?;
        let value: Value = response.json().await?;
        check_ok(method, value)
    }

    async fn get_once(
        &self,
        token: &str,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ChatError> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, method))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        response.error_for_status_ref()?;
        let value: Value = response.json().await?;
        check_ok(method, value)
    }

    /// Idempotent read: one retry on transport failure, none on API errors.
    async fn get_api(
        &self,
        token: &str,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ChatError> {
        match self.get_once(token, method, query).await {
            Err(ChatError::Transport(err)) => {
                tracing::debug!(method, error = %err, "retrying idempotent chat read");
                self.get_once(token, method, query).await
            }
            other => other,
        }
    }
}

fn check_ok(method: &str, value: Value) -> Result<Value, ChatError> {
    match value.get("ok").and_then(Value::as_bool) {
        Some(true) => Ok(value),
        Some(false) => {
            let code = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            Err(ChatError::Api(format!("{method}: {code}")))
        }
        None => Err(ChatError::Malformed(format!("{method}: response without ok field"))),
    }
}

fn str_field<'v>(value: &'v Value, path: &[&str], method: &str) -> Result<&'v str, ChatError> {
    let mut cursor = value;
    for key in path {
        cursor = cursor
            .get(key)
            .ok_or_else(|| ChatError::Malformed(format!("{method}: missing {}", path.join("."))))?;
    }
    cursor
        .as_str()
        .ok_or_else(|| ChatError::Malformed(format!("{method}: {} not a string", path.join("."))))
}

#[async_trait]
impl ChatClient for SlackClient {
    async fn post_message(
        &self,
        token: &str,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<MessageRef, ChatError> {
        let mut body = json!({ "channel": channel, "text": text });
        if let Some(ts) = thread_ts {
            body["thread_ts"] = json!(ts);
        }
        let value = self.post_api(token, "chat.postMessage", &body).await?;
        Ok(MessageRef {
            channel: str_field(&value, &["channel"], "chat.postMessage")?.to_string(),
            ts: str_field(&value, &["ts"], "chat.postMessage")?.to_string(),
        })
    }

    async fn add_reaction(
        &self,
        token: &str,
        channel: &str,
        ts: &str,
        name: &str,
    ) -> Result<(), ChatError> {
        let body = json!({ "channel": channel, "timestamp": ts, "name": name });
        match self.post_api(token, "reactions.add", &body).await {
            Ok(_) => Ok(()),
            // retried events make double-adds routine
            Err(ChatError::Api(code)) if code.ends_with("already_reacted") => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn remove_reaction(
        &self,
        token: &str,
        channel: &str,
        ts: &str,
        name: &str,
    ) -> Result<(), ChatError> {
        let body = json!({ "channel": channel, "timestamp": ts, "name": name });
        match self.post_api(token, "reactions.remove", &body).await {
            Ok(_) => Ok(()),
            Err(ChatError::Api(code)) if code.ends_with("no_reaction") => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn list_reactions(
        &self,
        token: &str,
        channel: &str,
        ts: &str,
    ) -> Result<Vec<ReactionOnMessage>, ChatError> {
        let value = self
            .get_api(
                token,
                "reactions.get",
                &[("channel", channel), ("timestamp", ts), ("full", "true")],
            )
            .await?;
        let reactions = value
            .get("message")
            .and_then(|m| m.get("reactions"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(reactions
            .iter()
            .filter_map(|r| {
                let name = r.get("name")?.as_str()?.to_string();
                let users = r
                    .get("users")
                    .and_then(Value::as_array)
                    .map(|u| {
                        u.iter().filter_map(Value::as_str).map(str::to_string).collect()
                    })
                    .unwrap_or_default();
                Some(ReactionOnMessage { name, users })
            })
            .collect())
    }

    async fn permalink(
        &self,
        token: &str,
        channel: &str,
        ts: &str,
    ) -> Result<String, ChatError> {
        let value = self
            .get_api(token, "chat.getPermalink", &[("channel", channel), ("message_ts", ts)])
            .await?;
        Ok(str_field(&value, &["permalink"], "chat.getPermalink")?.to_string())
    }

    async fn display_name(&self, token: &str, user_id: &str) -> Result<String, ChatError> {
        let value = self.get_api(token, "users.info", &[("user", user_id)]).await?;
        // prefer the profile display name, fall back to the account name
        if let Ok(name) = str_field(&value, &["user", "profile", "display_name"], "users.info") {
            if !name.is_empty() {
                return Ok(name.to_string());
            }
        }
        Ok(str_field(&value, &["user", "name"], "users.info")?.to_string())
    }

    async fn bot_user_id(&self, token: &str) -> Result<String, ChatError> {
        let value = self.get_api(token, "auth.test", &[]).await?;
        Ok(str_field(&value, &["user_id"], "auth.test")?.to_string())
    }
}
