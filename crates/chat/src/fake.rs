// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording in-memory [`ChatClient`] for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{ChatClient, ChatError, MessageRef, ReactionOnMessage};

pub const FAKE_BOT_USER_ID: &str = "UBOT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub thread_ts: Option<String>,
    pub text: String,
    pub ts: String,
}

#[derive(Default)]
struct FakeState {
    posted: Vec<PostedMessage>,
    /// (channel, ts) → [(reaction name, user)]
    reactions: HashMap<(String, String), Vec<(String, String)>>,
    display_names: HashMap<String, String>,
    next_ts: u64,
}

/// In-memory chat platform double. Clones share state.
#[derive(Clone, Default)]
pub struct FakeChat {
    state: Arc<Mutex<FakeState>>,
}

impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_display_name(&self, user_id: &str, name: &str) {
        self.state.lock().display_names.insert(user_id.to_string(), name.to_string());
    }

    /// Seed a reaction as if some user had set it.
    pub fn seed_reaction(&self, channel: &str, ts: &str, name: &str, user: &str) {
        self.state
            .lock()
            .reactions
            .entry((channel.to_string(), ts.to_string()))
            .or_default()
            .push((name.to_string(), user.to_string()));
    }

    pub fn posted(&self) -> Vec<PostedMessage> {
        self.state.lock().posted.clone()
    }

    /// Reaction names currently on a message, any owner.
    pub fn reaction_names(&self, channel: &str, ts: &str) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state
            .reactions
            .get(&(channel.to_string(), ts.to_string()))
            .map(|rs| rs.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default();
        names.dedup();
        names
    }
}

#[async_trait]
impl ChatClient for FakeChat {
    async fn post_message(
        &self,
        _token: &str,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<MessageRef, ChatError> {
        let mut state = self.state.lock();
        state.next_ts += 1;
        let ts = format!("9000.{:06}", state.next_ts);
        state.posted.push(PostedMessage {
            channel: channel.to_string(),
            thread_ts: thread_ts.map(str::to_string),
            text: text.to_string(),
            ts: ts.clone(),
        });
        Ok(MessageRef { channel: channel.to_string(), ts })
    }

    async fn add_reaction(
        &self,
        _token: &str,
        channel: &str,
        ts: &str,
        name: &str,
    ) -> Result<(), ChatError> {
        let mut state = self.state.lock();
        let entry =
            state.reactions.entry((channel.to_string(), ts.to_string())).or_default();
        let mine = (name.to_string(), FAKE_BOT_USER_ID.to_string());
        if !entry.contains(&mine) {
            entry.push(mine);
        }
        Ok(())
    }

    async fn remove_reaction(
        &self,
        _token: &str,
        channel: &str,
        ts: &str,
        name: &str,
    ) -> Result<(), ChatError> {
        let mut state = self.state.lock();
        if let Some(entry) = state.reactions.get_mut(&(channel.to_string(), ts.to_string())) {
            entry.retain(|(n, u)| !(n == name && u == FAKE_BOT_USER_ID));
        }
        Ok(())
    }

    async fn list_reactions(
        &self,
        _token: &str,
        channel: &str,
        ts: &str,
    ) -> Result<Vec<ReactionOnMessage>, ChatError> {
        let state = self.state.lock();
        let mut grouped: Vec<ReactionOnMessage> = Vec::new();
        if let Some(entry) = state.reactions.get(&(channel.to_string(), ts.to_string())) {
            for (name, user) in entry {
                match grouped.iter_mut().find(|r| &r.name == name) {
                    Some(existing) => existing.users.push(user.clone()),
                    None => grouped.push(ReactionOnMessage {
                        name: name.clone(),
                        users: vec![user.clone()],
                    }),
                }
            }
        }
        Ok(grouped)
    }

    async fn permalink(
        &self,
        _token: &str,
        channel: &str,
        ts: &str,
    ) -> Result<String, ChatError> {
        Ok(format!("https://chat.example/archives/{channel}/p{}", ts.replace('.', "")))
    }

    async fn display_name(&self, _token: &str, user_id: &str) -> Result<String, ChatError> {
        let state = self.state.lock();
        match state.display_names.get(user_id) {
            Some(name) => Ok(name.clone()),
            None => Err(ChatError::Api(format!("users.info: user_not_found ({user_id})"))),
        }
    }

    async fn bot_user_id(&self, _token: &str) -> Result<String, ChatError> {
        Ok(FAKE_BOT_USER_ID.to_string())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
