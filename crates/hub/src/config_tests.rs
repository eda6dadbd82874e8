// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn config_with_ttl(token_ttl_secs: u64) -> HubConfig {
    HubConfig {
        host: "127.0.0.1".into(),
        port: 9600,
        auth_token: None,
        state_dir: None,
        token_ttl_secs,
    }
}

#[test]
fn default_ttl_is_thirty_days() {
    let ttl = config_with_ttl(30 * 24 * 3600).token_ttl();
    assert_eq!(ttl, chrono::Duration::days(30));
}

#[test]
fn absurd_ttl_saturates_instead_of_going_negative() {
    for secs in [u64::MAX, i64::MAX as u64 + 1, i64::MAX as u64] {
        let ttl = config_with_ttl(secs).token_ttl();
        assert!(ttl > chrono::Duration::zero(), "ttl for {secs} went non-positive");
    }
}

#[test]
fn explicit_state_dir_wins() {
    let mut config = config_with_ttl(60);
    config.state_dir = Some(std::path::PathBuf::from("/tmp/tether-test"));
    assert_eq!(config.state_dir(), std::path::PathBuf::from("/tmp/tether-test"));
}
