// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    bold = { "this is **important** stuff", "this is *important* stuff" },
    link = { "see [the docs](https://example.com/docs)", "see <https://example.com/docs|the docs>" },
    heading = { "# Summary\nbody", "*Summary*\nbody" },
    strike = { "~~old~~ new", "~old~ new" },
    untouched = { "plain text with *mrkdwn bold* kept", "plain text with *mrkdwn bold* kept" },
    code_fence_passthrough = { "```\nlet x = 1;\n```", "```\nlet x = 1;\n```" },
)]
fn to_mrkdwn_cases(input: &str, expected: &str) {
    assert_eq!(to_mrkdwn(input), expected);
}

#[test]
fn bold_inside_link_label_converts() {
    assert_eq!(
        to_mrkdwn("[**bold label**](https://example.com)"),
        "<https://example.com|*bold label*>",
    );
}

#[test]
fn mention_tokens_dedupe_in_order() {
    let text = "<@U1> asked <@U2> and <@U1> again";
    assert_eq!(mention_tokens(text), vec!["U1".to_string(), "U2".to_string()]);
}

#[test]
fn resolve_mentions_replaces_known_and_keeps_unknown() {
    let mut names = HashMap::new();
    names.insert("U1".to_string(), "alice".to_string());
    assert_eq!(
        resolve_mentions("<@U1> ping <@U9>", &names),
        "@alice ping <@U9>",
    );
}

#[parameterized(
    leading = { "<@UBOT> do X", "do X" },
    leading_with_space = { "  <@UBOT>   do X  ", "do X" },
    not_leading = { "please <@UBOT> do X", "please <@UBOT> do X" },
    only_mention = { "<@UBOT>", "" },
)]
fn strip_leading_mention_cases(input: &str, expected: &str) {
    assert_eq!(strip_leading_mention(input, "UBOT"), expected);
}
