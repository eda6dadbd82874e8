// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

use chrono::Utc;

fn sample_record(id: &str) -> ClientRecord {
    let now = Utc::now();
    ClientRecord {
        id: id.to_owned(),
        internal_id: uuid::Uuid::new_v4().to_string(),
        created: now,
        updated: now,
        current_token_id: Some("tok-1".to_owned()),
        state: None,
    }
}

#[test]
fn save_then_load_roundtrip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("clients.json");

    let mut persisted = PersistedClients::default();
    persisted.clients.insert("agent-1".to_owned(), sample_record("agent-1"));
    save(&path, &persisted)?;

    let loaded = load(&path)?;
    assert_eq!(loaded.clients.len(), 1);
    let record = loaded.clients.get("agent-1").ok_or_else(|| anyhow::anyhow!("missing"))?;
    assert_eq!(record.id, "agent-1");
    assert_eq!(record.current_token_id.as_deref(), Some("tok-1"));
    Ok(())
}

#[test]
fn load_missing_file_is_not_found() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let err = load(&dir.path().join("nope.json")).unwrap_err();
    let io = err.downcast_ref::<std::io::Error>().expect("expected io error");
    assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
}

#[test]
fn load_rejects_corrupt_json() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("clients.json");
    std::fs::write(&path, "{ not json")?;
    assert!(load(&path).is_err());
    Ok(())
}

#[test]
fn absent_optional_fields_deserialize() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("clients.json");

    // Hand-written record without current_token_id or state.
    let json = format!(
        r#"{{"clients":{{"agent-1":{{"id":"agent-1","internal_id":"x","created":"{0}","updated":"{0}"}}}}}}"#,
        Utc::now().to_rfc3339(),
    );
    std::fs::write(&path, json)?;

    let loaded = load(&path)?;
    let record = loaded.clients.get("agent-1").ok_or_else(|| anyhow::anyhow!("missing"))?;
    assert!(record.current_token_id.is_none());
    assert!(record.state.is_none());
    Ok(())
}

#[test]
fn write_atomic_replaces_longer_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data");

    write_atomic(&path, "a long initial payload")?;
    write_atomic(&path, "short")?;

    assert_eq!(std::fs::read_to_string(&path)?, "short");

    // No temp files left behind.
    let leftovers = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
    Ok(())
}
