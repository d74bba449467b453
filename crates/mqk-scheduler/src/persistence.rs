//! Last-run registry persistence, routed through `mqk_db`'s atomic writer
//! (§4.8: "a small JSON document per scope ... read at startup to detect
//! staleness").

use mqk_db::atomic::{read_json_opt, write_json_atomic};
use mqk_db::paths::ScopePaths;

use crate::types::TaskRegistry;

pub fn read_registry(paths: &ScopePaths) -> anyhow::Result<TaskRegistry> {
    Ok(read_json_opt(&paths.scheduler_registry_json())?.unwrap_or_default())
}

pub fn write_registry(paths: &ScopePaths, registry: &TaskRegistry) -> anyhow::Result<()> {
    write_json_atomic(&paths.scheduler_registry_json(), registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskKind;

    #[test]
    fn registry_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ScopePaths::new(dir.path(), "paper-alpaca-equities-us");
        assert!(read_registry(&paths).unwrap().entries.is_empty());

        let mut registry = read_registry(&paths).unwrap();
        registry.entry_mut(TaskKind::Reconciliation);
        write_registry(&paths, &registry).unwrap();

        let back = read_registry(&paths).unwrap();
        assert!(back.entry(TaskKind::Reconciliation).is_some());
    }
}
