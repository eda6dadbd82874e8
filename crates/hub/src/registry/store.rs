// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-record persistence: load/save to JSON file with atomic writes.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::registry::ClientRecord;

/// Persisted registry state: all client records keyed by external id.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PersistedClients {
    pub clients: HashMap<String, ClientRecord>,
}

/// Load persisted client records from a JSON file.
pub fn load(path: &Path) -> anyhow::Result<PersistedClients> {
    let contents = std::fs::read_to_string(path)?;
    let clients: PersistedClients = serde_json::from_str(&contents)?;
    Ok(clients)
}

/// Save persisted client records to a JSON file atomically.
pub fn save(path: &Path, clients: &PersistedClients) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(clients)?;
    write_atomic(path, json)
}

/// Atomic file write (write tmp + rename).
///
/// Uses a unique temp filename (PID + counter) to avoid corruption when
/// concurrent saves race on the same `.tmp` file — a shorter write can leave
/// trailing bytes from a longer previous write.
pub fn write_atomic(path: &Path, contents: impl AsRef<[u8]>) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
