// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level CLI specs for `gafferd`.
//!
//! These only exercise the process surface: help text and startup failure
//! paths that need no database.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use assert_cmd::Command;
use serial_test::serial;

fn gafferd() -> Command {
    let mut cmd = Command::cargo_bin("gafferd").unwrap();
    // a hermetic environment: no operator config leaks into the test
    cmd.env_remove("GAFFER_DATABASE_URL")
        .env_remove("GAFFER_DB_SCHEMA")
        .env_remove("GAFFER_HTTP_PORT")
        .env_remove("GAFFER_SIGNING_SECRET")
        .env_remove("GAFFER_STRICT")
        .env_remove("GAFFER_LOG");
    cmd
}

#[test]
#[serial]
fn help_exits_zero_and_names_the_run_command() {
    let assert = gafferd().arg("help").assert().success();
    let out = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(out.contains("run"), "help should list the run command:\n{out}");
}

#[test]
#[serial]
fn long_help_flag_works() {
    gafferd().arg("--help").assert().success();
}

#[test]
#[serial]
fn run_without_database_url_exits_one() {
    let assert = gafferd().arg("run").assert().failure().code(1);
    let err = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(err.contains("GAFFER_DATABASE_URL"), "should name the missing key:\n{err}");
}

#[test]
#[serial]
fn default_command_is_run() {
    // no subcommand behaves like `run`: same config failure, same exit code
    gafferd().assert().failure().code(1);
}

#[test]
#[serial]
fn invalid_port_is_a_config_error() {
    let assert = gafferd()
        .arg("run")
        .env("GAFFER_DATABASE_URL", "postgres://localhost/gaffer")
        .env("GAFFER_HTTP_PORT", "not-a-port")
        .assert()
        .failure()
        .code(1);
    let err = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(err.contains("GAFFER_HTTP_PORT"), "should name the bad key:\n{err}");
}

#[test]
#[serial]
fn strict_mode_without_signing_secret_exits_one() {
    gafferd()
        .arg("run")
        .env("GAFFER_DATABASE_URL", "postgres://localhost/gaffer")
        .env("GAFFER_STRICT", "true")
        .assert()
        .failure()
        .code(1);
}
