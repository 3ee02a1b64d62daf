// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::records::SettingKind;
use yare::parameterized;

#[parameterized(
    notify = { SettingKey::NotifyOnQueue, SettingKind::Bool },
    branch = { SettingKey::BranchPrefix, SettingKind::String },
    channels = { SettingKey::AllowedChannels, SettingKind::StringList },
)]
fn registry_key_kinds(key: SettingKey, kind: SettingKind) {
    assert_eq!(key.kind(), kind);
}

#[test]
fn registry_round_trips_every_key() {
    for key in SettingKey::ALL {
        assert_eq!(SettingKey::parse(key.as_str()), Some(key));
    }
    assert_eq!(SettingKey::parse("no_such_key"), None);
}

#[test]
fn value_kind_matches_variant() {
    assert_eq!(SettingValue::Bool(true).kind(), SettingKind::Bool);
    assert_eq!(SettingValue::String("x".into()).kind(), SettingKind::String);
    assert_eq!(SettingValue::StringList(vec![]).kind(), SettingKind::StringList);
}

#[test]
fn value_accessors_are_kind_strict() {
    let v = SettingValue::Bool(true);
    assert_eq!(v.as_bool(), Some(true));
    assert_eq!(v.as_string(), None);
    assert_eq!(v.as_string_list(), None);
}
