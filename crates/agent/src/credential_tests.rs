// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn test_store() -> (tempfile::TempDir, TokenStore) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = TokenStore::new(dir.path());
    (dir, store)
}

#[test]
fn load_without_token_is_none() -> anyhow::Result<()> {
    let (_dir, store) = test_store();
    assert!(store.load()?.is_none());
    Ok(())
}

#[test]
fn save_then_load_roundtrip() -> anyhow::Result<()> {
    let (_dir, store) = test_store();
    let expires = Utc::now() + chrono::Duration::days(30);

    store.save("tok-abc", Some(&expires))?;
    let cred = store.load()?.ok_or_else(|| anyhow::anyhow!("missing"))?;

    assert_eq!(cred.token, "tok-abc");
    assert_eq!(cred.expires, Some(expires));
    Ok(())
}

#[test]
fn missing_expiry_means_unknown_not_missing_token() -> anyhow::Result<()> {
    let (dir, store) = test_store();
    store.save("tok-abc", None)?;

    assert!(!dir.path().join("token.expires").exists());
    let cred = store.load()?.ok_or_else(|| anyhow::anyhow!("missing"))?;
    assert_eq!(cred.token, "tok-abc");
    assert!(cred.expires.is_none());
    Ok(())
}

#[test]
fn garbled_expiry_degrades_to_unknown() -> anyhow::Result<()> {
    let (dir, store) = test_store();
    store.save("tok-abc", None)?;
    std::fs::write(dir.path().join("token.expires"), "not a timestamp")?;

    let cred = store.load()?.ok_or_else(|| anyhow::anyhow!("missing"))?;
    assert_eq!(cred.token, "tok-abc");
    assert!(cred.expires.is_none());
    Ok(())
}

#[test]
fn save_without_expiry_clears_stale_artifact() -> anyhow::Result<()> {
    let (dir, store) = test_store();
    let expires = Utc::now() + chrono::Duration::days(30);

    store.save("tok-1", Some(&expires))?;
    store.save("tok-2", None)?;

    assert!(!dir.path().join("token.expires").exists());
    let cred = store.load()?.ok_or_else(|| anyhow::anyhow!("missing"))?;
    assert_eq!(cred.token, "tok-2");
    assert!(cred.expires.is_none());
    Ok(())
}

// ---------------------------------------------------------------------------
// setup (cold/warm/force)
// ---------------------------------------------------------------------------

#[test]
fn cold_start_installs_explicit_token() -> anyhow::Result<()> {
    let (_dir, store) = test_store();
    let sources =
        CredentialSources { token: Some("tok-cli".to_owned()), ..Default::default() };

    let cred = setup(&store, &sources)?;
    assert_eq!(cred.token, "tok-cli");

    // Persisted before any connection attempt.
    let persisted = store.load()?.ok_or_else(|| anyhow::anyhow!("missing"))?;
    assert_eq!(persisted.token, "tok-cli");
    Ok(())
}

#[test]
fn cold_start_falls_back_through_sources_in_order() -> anyhow::Result<()> {
    let (dir, store) = test_store();
    let file = dir.path().join("seed.token");
    std::fs::write(&file, "tok-file\n")?;

    // Explicit token wins over the file.
    let sources = CredentialSources {
        token: Some("tok-cli".to_owned()),
        token_file: Some(file.clone()),
        fallback_token: Some("tok-fallback".to_owned()),
        force: false,
    };
    assert_eq!(setup(&store, &sources)?.token, "tok-cli");

    // File wins over the fallback.
    let (_dir2, store2) = test_store();
    let sources = CredentialSources {
        token: None,
        token_file: Some(file),
        fallback_token: Some("tok-fallback".to_owned()),
        force: false,
    };
    assert_eq!(setup(&store2, &sources)?.token, "tok-file");
    Ok(())
}

#[test]
fn cold_start_with_only_fallback_persists_it() -> anyhow::Result<()> {
    let (_dir, store) = test_store();
    let sources = CredentialSources {
        fallback_token: Some("tok-fallback".to_owned()),
        ..Default::default()
    };

    let cred = setup(&store, &sources)?;
    assert_eq!(cred.token, "tok-fallback");
    assert_eq!(
        store.load()?.ok_or_else(|| anyhow::anyhow!("missing"))?.token,
        "tok-fallback"
    );
    Ok(())
}

#[test]
fn unreadable_token_file_falls_through_to_fallback() -> anyhow::Result<()> {
    let (dir, store) = test_store();
    let sources = CredentialSources {
        token_file: Some(dir.path().join("no-such-file")),
        fallback_token: Some("tok-fallback".to_owned()),
        ..Default::default()
    };
    assert_eq!(setup(&store, &sources)?.token, "tok-fallback");
    Ok(())
}

#[test]
fn cold_start_with_no_source_is_fatal() {
    let (_dir, store) = test_store();
    assert!(setup(&store, &CredentialSources::default()).is_err());
}

#[test]
fn warm_start_ignores_conflicting_token_without_force() -> anyhow::Result<()> {
    let (_dir, store) = test_store();
    let expires = Utc::now() + chrono::Duration::days(10);
    store.save("tok-installed", Some(&expires))?;

    let sources =
        CredentialSources { token: Some("tok-other".to_owned()), ..Default::default() };
    let cred = setup(&store, &sources)?;

    // The installed credential wins and the artifacts are untouched.
    assert_eq!(cred.token, "tok-installed");
    assert_eq!(cred.expires, Some(expires));
    let persisted = store.load()?.ok_or_else(|| anyhow::anyhow!("missing"))?;
    assert_eq!(persisted.token, "tok-installed");
    assert_eq!(persisted.expires, Some(expires));
    Ok(())
}

#[test]
fn force_replaces_installed_token() -> anyhow::Result<()> {
    let (_dir, store) = test_store();
    store.save("tok-installed", None)?;

    let sources = CredentialSources {
        token: Some("tok-new".to_owned()),
        force: true,
        ..Default::default()
    };
    let cred = setup(&store, &sources)?;

    assert_eq!(cred.token, "tok-new");
    assert_eq!(store.load()?.ok_or_else(|| anyhow::anyhow!("missing"))?.token, "tok-new");
    Ok(())
}

#[test]
fn force_with_no_source_is_fatal_even_when_installed() -> anyhow::Result<()> {
    let (_dir, store) = test_store();
    store.save("tok-installed", None)?;

    let sources = CredentialSources { force: true, ..Default::default() };
    assert!(setup(&store, &sources).is_err());
    Ok(())
}
