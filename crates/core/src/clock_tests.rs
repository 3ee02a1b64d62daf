// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn system_clock_advances() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}

#[test]
fn fake_clock_advance_moves_both_timelines() {
    let clock = FakeClock::new();
    let t0 = clock.now();
    let u0 = clock.now_utc();

    clock.advance(Duration::from_secs(90));

    assert_eq!(clock.now() - t0, Duration::from_secs(90));
    assert_eq!((clock.now_utc() - u0).num_seconds(), 90);
}

#[test]
fn fake_clock_set_utc() {
    let clock = FakeClock::new();
    let t = match Utc.timestamp_opt(1_800_000_000, 0) {
        chrono::LocalResult::Single(t) => t,
        _ => panic!("valid timestamp"),
    };
    clock.set_utc(t);
    assert_eq!(clock.now_utc(), t);
    assert_eq!(clock.epoch_secs(), 1_800_000_000);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.now_utc(), other.now_utc());
}
