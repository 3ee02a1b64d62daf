// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Markdown → mrkdwn conversion and mention tokens.
//!
//! Workers speak standard markdown; the chat platform speaks mrkdwn. The
//! transform is pure and deliberately conservative: bold, links, headings,
//! strikethrough. Anything it does not recognize passes through untouched.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"\*\*([^*\n]+)\*\*") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex is valid"),
    })
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex is valid"),
    })
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"(?m)^#{1,6}\s+(.+)$") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex is valid"),
    })
}

fn strike_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"~~([^~\n]+)~~") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex is valid"),
    })
}

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"<@([A-Z0-9]+)>") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex is valid"),
    })
}

/// Convert worker markdown to platform mrkdwn. Applied exactly once, just
/// before posting.
pub fn to_mrkdwn(text: &str) -> String {
    // links first so bold inside link labels still converts
    let text = link_re().replace_all(text, "<$2|$1>");
    let text = bold_re().replace_all(&text, "*$1*");
    let text = strike_re().replace_all(&text, "~$1~");
    let text = heading_re().replace_all(&text, "*$1*");
    text.into_owned()
}

/// User ids referenced as `<@U…>` tokens, in order of first appearance.
pub fn mention_tokens(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for cap in mention_re().captures_iter(text) {
        let id = cap[1].to_string();
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

/// Replace `<@U…>` tokens with `@display-name`. Unknown ids keep their
/// token so nothing silently disappears from the text.
pub fn resolve_mentions(text: &str, names: &HashMap<String, String>) -> String {
    mention_re()
        .replace_all(text, |caps: &regex::Captures<'_>| match names.get(&caps[1]) {
            Some(name) => format!("@{name}"),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Strip a leading mention of the given user (the bot) plus surrounding
/// whitespace: `"<@UBOT> do X"` → `"do X"`.
pub fn strip_leading_mention(text: &str, user_id: &str) -> String {
    let token = format!("<@{user_id}>");
    text.trim_start().strip_prefix(&token).map_or_else(
        || text.trim().to_string(),
        |rest| rest.trim().to_string(),
    )
}

#[cfg(test)]
#[path = "mrkdwn_tests.rs"]
mod tests;
