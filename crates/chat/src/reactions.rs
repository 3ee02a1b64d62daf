// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reaction vocabulary and the idempotent reducer.
//!
//! The bot owns a small universe of status reactions. Every status change
//! goes through [`plan`]: remove whatever bot-owned reaction is not the
//! target, add the target if absent. Applying the same plan twice yields
//! the same reaction set, which is required because the platform retries
//! events.
//!
//! `eyes` ("the plane took this thread") is deliberately outside the
//! universe: it is add-only, so a queued top-level message can carry both
//! its queue status and the thread marker.

/// Bot-owned status reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Waiting for an agent to come online.
    Queued,
    /// An agent is working the message.
    Working,
    /// Terminal success.
    Completed,
    /// The agent went idle; the thread waits on the user.
    AwaitingUser,
    /// Terminal failure or abandonment.
    Failed,
}

impl Reaction {
    pub const UNIVERSE: [Reaction; 5] =
        [Self::Queued, Self::Working, Self::Completed, Self::AwaitingUser, Self::Failed];

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Queued => "hourglass_flowing_sand",
            Self::Working => "hammer_and_wrench",
            Self::Completed => "white_check_mark",
            Self::AwaitingUser => "hand",
            Self::Failed => "x",
        }
    }
}

/// Add-only marker on a thread's top-level message.
pub const PROCESSING_EMOJI: &str = "eyes";

/// Reactions a job's originating user may close it with.
pub const COMPLETION_REACTIONS: [&str; 3] =
    ["white_check_mark", "heavy_check_mark", "white_tick"];

pub fn is_completion_reaction(name: &str) -> bool {
    COMPLETION_REACTIONS.contains(&name)
}

/// The mutations needed to move a message's bot-owned reactions to exactly
/// `{target}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionPlan {
    pub remove: Vec<&'static str>,
    pub add: Option<&'static str>,
}

impl ReactionPlan {
    pub fn is_noop(&self) -> bool {
        self.remove.is_empty() && self.add.is_none()
    }
}

/// Compute the reducer plan from the bot's current reactions on a message.
///
/// Postcondition: applying the plan leaves current ∩ universe == {target}.
pub fn plan(current_bot_reactions: &[String], target: Reaction) -> ReactionPlan {
    let target_emoji = target.emoji();
    let remove = Reaction::UNIVERSE
        .iter()
        .map(|r| r.emoji())
        .filter(|emoji| {
            *emoji != target_emoji && current_bot_reactions.iter().any(|c| c == emoji)
        })
        .collect();
    let add = if current_bot_reactions.iter().any(|c| c == target_emoji) {
        None
    } else {
        Some(target_emoji)
    };
    ReactionPlan { remove, add }
}

#[cfg(test)]
#[path = "reactions_tests.rs"]
mod tests;
