//! Read-only loader for `ledger/open_positions.json`.
//!
//! Older scope roots may still carry a position ledger at the legacy path
//! (`ledger/open_positions.json`) predating the reconciliation engine's
//! canonical `state/open_positions.json`. This module never writes to that
//! path — it exists purely so an operator migrating a scope can inspect
//! what the legacy ledger believed, without the reconciliation engine
//! treating it as a write target.
//!
//! The legacy shape is treated generically (`serde_json::Value` per
//! symbol) rather than bound to the current `OpenPosition` struct, since a
//! legacy file predates today's schema and may be missing fields the
//! current model requires.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::paths::ScopePaths;

/// Load the legacy ledger, if present, as a raw symbol → JSON object map.
/// Returns an empty map if the file does not exist.
pub fn load_legacy_positions_raw(
    paths: &ScopePaths,
) -> Result<BTreeMap<String, serde_json::Value>> {
    load_legacy_positions_raw_at(&paths.legacy_open_positions_json())
}

fn load_legacy_positions_raw_at(
    path: &Path,
) -> Result<BTreeMap<String, serde_json::Value>> {
    match std::fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing legacy ledger at {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e).with_context(|| format!("reading legacy ledger at {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_legacy_file_is_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ScopePaths::new(dir.path(), "paper-sim-equities-us");
        let m = load_legacy_positions_raw(&paths).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn present_legacy_file_parses_as_raw_map() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ScopePaths::new(dir.path(), "paper-sim-equities-us");
        let legacy_path = paths.legacy_open_positions_json();
        std::fs::create_dir_all(legacy_path.parent().unwrap()).unwrap();
        std::fs::write(&legacy_path, r#"{"AAPL": {"quantity": 10}}"#).unwrap();

        let m = load_legacy_positions_raw(&paths).unwrap();
        assert_eq!(m["AAPL"]["quantity"], 10);
    }
}
