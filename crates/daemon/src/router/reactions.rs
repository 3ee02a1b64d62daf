// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound reaction updates: the only place reactions are mutated.

use gf_chat::reactions::{plan, Reaction, PROCESSING_EMOJI};
use gf_chat::{ChatClient, ChatError};

/// Move a message's bot-owned status reaction to exactly `target`.
///
/// Reads the current set, removes every other bot-owned status reaction,
/// adds the target if absent. Safe to re-run: reaction events are retried
/// by the platform and this reduces to a no-op on the second pass.
pub(crate) async fn set_status_reaction(
    chat: &dyn ChatClient,
    token: &str,
    channel: &str,
    ts: &str,
    target: Reaction,
) -> Result<(), ChatError> {
    let bot = chat.bot_user_id(token).await?;
    let mine: Vec<String> = chat
        .list_reactions(token, channel, ts)
        .await?
        .into_iter()
        .filter(|r| r.users.iter().any(|u| u == &bot))
        .map(|r| r.name)
        .collect();

    let plan = plan(&mine, target);
    for name in &plan.remove {
        chat.remove_reaction(token, channel, ts, name).await?;
    }
    if let Some(name) = plan.add {
        chat.add_reaction(token, channel, ts, name).await?;
    }
    Ok(())
}

/// Add-only thread marker on a top-level message.
pub(crate) async fn mark_processing(
    chat: &dyn ChatClient,
    token: &str,
    channel: &str,
    ts: &str,
) -> Result<(), ChatError> {
    chat.add_reaction(token, channel, ts, PROCESSING_EMOJI).await
}

#[cfg(test)]
#[path = "reactions_tests.rs"]
mod tests;
