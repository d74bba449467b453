//! Persists the rebuilt Open Position ledger, the reconciliation cursor,
//! and the full fill history (§4.2, §6), and drives one end-to-end
//! reconciliation cycle over a caller-supplied fill fetcher.
//!
//! [`ledger`](crate::ledger) stays broker- and IO-free by design; this
//! module is where that pure rebuild logic meets `mqk-db`'s atomic-write
//! discipline. The fetcher is a plain closure rather than a
//! `mqk_broker_core::BrokerAdapter` reference so this crate never has to
//! depend on broker-core (which itself depends on this crate for
//! `Side`/`OrderStatus` — a dependency back onto brokers would cycle).
//!
//! `rebuild_from_fills` rebuilds positions from the *entire* fill set every
//! cycle, never from a delta (§4.2 step 5), so the full fill history has to
//! be retrievable without re-fetching it from the broker every tick. This
//! module keeps that history in `state/fills_seen.jsonl`, appending only
//! the fills a cycle actually processed — the cursor's fetch window (§4.2
//! step 2) still limits what gets *requested* from the broker, this is
//! just what gets folded into the rebuild.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use mqk_db::atomic::{append_jsonl_line, read_json_opt, read_jsonl_lenient, write_json_atomic};
use mqk_db::paths::ScopePaths;

use crate::ledger::{
    advance_cursor, dedupe_fills, fetch_window_start, rebuild_from_fills, OpenPosition, RawFill,
    ReconciliationCursor,
};

pub fn read_positions(paths: &ScopePaths) -> anyhow::Result<BTreeMap<String, OpenPosition>> {
    Ok(read_json_opt(&paths.open_positions_json())?.unwrap_or_default())
}

pub fn write_positions(paths: &ScopePaths, positions: &BTreeMap<String, OpenPosition>) -> anyhow::Result<()> {
    write_json_atomic(&paths.open_positions_json(), positions)
}

pub fn read_cursor(paths: &ScopePaths) -> anyhow::Result<ReconciliationCursor> {
    Ok(read_json_opt(&paths.reconciliation_cursor_json())?.unwrap_or_default())
}

pub fn write_cursor(paths: &ScopePaths, cursor: &ReconciliationCursor) -> anyhow::Result<()> {
    write_json_atomic(&paths.reconciliation_cursor_json(), cursor)
}

pub fn read_fills_seen(paths: &ScopePaths) -> anyhow::Result<Vec<RawFill>> {
    read_jsonl_lenient(&paths.fills_seen_jsonl())
}

/// Runs one full reconciliation cycle (§4.2 algorithm, steps 1-7):
///
/// 1. Load cursor + positions + fill history from disk (missing files →
///    empty state).
/// 2. Compute the fetch window from the cursor.
/// 3. Call `fetch_fills` for fills since that window (already normalized to
///    UTC `RawFill`s — adapter-specific timestamp/side mapping happens at
///    the call site, one layer up).
/// 4. Dedupe the new batch against every fill id already known.
/// 5. Rebuild positions from the full fill set (history + new).
/// 6. Advance the cursor past every new fill actually processed.
/// 7. Persist positions, cursor, and the extended fill history atomically
///    (the `.jsonl` append only happens after steps 1-6 succeed).
///
/// A `fetch_fills` error fails the whole cycle without touching disk
/// (§4.2 failure handling, §7 transient broker errors) — steps 1-4 happen
/// entirely in memory before any write.
pub fn run_cycle(
    paths: &ScopePaths,
    now: DateTime<Utc>,
    fetch_fills: impl FnOnce(DateTime<Utc>) -> anyhow::Result<Vec<RawFill>>,
) -> anyhow::Result<BTreeMap<String, OpenPosition>> {
    let cursor = read_cursor(paths)?;
    let history = read_fills_seen(paths)?;

    let window_start = fetch_window_start(&cursor, now);
    let batch = fetch_fills(window_start)?;

    let known_fill_ids: BTreeSet<String> = history.iter().map(|f| f.fill_id.clone()).collect();
    let new_fills = dedupe_fills(&known_fill_ids, batch);

    let mut all_fills = history;
    all_fills.extend(new_fills.iter().cloned());

    let rebuilt = rebuild_from_fills(&all_fills, now);
    let next_cursor = advance_cursor(&cursor, &new_fills, now);

    write_positions(paths, &rebuilt)?;
    write_cursor(paths, &next_cursor)?;
    for fill in &new_fills {
        append_jsonl_line(&paths.fills_seen_jsonl(), fill)?;
    }

    Ok(rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoped(dir: &tempfile::TempDir) -> ScopePaths {
        ScopePaths::new(dir.path(), "paper-alpaca-equities-us")
    }

    fn fill(id: &str, symbol: &str, qty: f64, price: f64, ts: &str) -> RawFill {
        RawFill {
            fill_id: id.to_string(),
            order_id: format!("o-{id}"),
            symbol: symbol.to_string(),
            qty,
            price,
            filled_at_utc: ts.parse().unwrap(),
            side: crate::types::Side::Buy,
        }
    }

    #[test]
    fn first_cycle_rebuilds_and_persists_from_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let paths = scoped(&dir);
        let now = Utc::now();

        let positions = run_cycle(&paths, now, |_window_start| {
            Ok(vec![fill("f1", "PFE", 0.03755163, 26.628, "2026-02-02T20:55:29Z")])
        })
        .unwrap();

        assert_eq!(positions["PFE"].quantity, 0.03755163);
        let on_disk = read_positions(&paths).unwrap();
        assert_eq!(on_disk["PFE"].quantity, 0.03755163);
        let cursor = read_cursor(&paths).unwrap();
        assert_eq!(cursor.last_seen_fill_id.as_deref(), Some("f1"));
        assert_eq!(read_fills_seen(&paths).unwrap().len(), 1);
    }

    #[test]
    fn rerunning_with_no_new_fills_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let paths = scoped(&dir);
        let now = Utc::now();

        run_cycle(&paths, now, |_| Ok(vec![fill("f1", "PFE", 0.03755163, 26.628, "2026-02-02T20:55:29Z")]))
            .unwrap();
        let before = std::fs::read(paths.open_positions_json()).unwrap();

        run_cycle(&paths, now + chrono::Duration::seconds(1), |_| Ok(vec![])).unwrap();
        let after = std::fs::read(paths.open_positions_json()).unwrap();

        assert_eq!(before, after, "no new fills must leave positions byte-identical");
        assert_eq!(read_fills_seen(&paths).unwrap().len(), 1, "no duplicate fill history entries");
    }

    #[test]
    fn a_second_buy_accumulates_onto_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let paths = scoped(&dir);
        let now = Utc::now();

        run_cycle(&paths, now, |_| Ok(vec![fill("f1", "KO", 0.01590747, 77.038, "2026-02-03T20:55:29Z")])).unwrap();
        let positions = run_cycle(&paths, now + chrono::Duration::seconds(1), |_| {
            Ok(vec![fill("f2", "KO", 0.02, 78.0, "2026-02-05T20:55:55Z")])
        })
        .unwrap();

        assert_eq!(positions["KO"].entry_count, 2);
        assert!((positions["KO"].quantity - 0.03590747).abs() < 1e-9);
        assert_eq!(positions["KO"].last_entry_time_utc.to_rfc3339(), "2026-02-05T20:55:55+00:00");
    }

    #[test]
    fn a_fetch_error_leaves_disk_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let paths = scoped(&dir);
        let now = Utc::now();

        run_cycle(&paths, now, |_| Ok(vec![fill("f1", "PFE", 0.1, 10.0, "2026-02-02T20:55:29Z")])).unwrap();
        let before = std::fs::read(paths.open_positions_json()).unwrap();

        let result = run_cycle(&paths, now + chrono::Duration::seconds(1), |_| {
            anyhow::bail!("broker unreachable")
        });
        assert!(result.is_err());

        let after = std::fs::read(paths.open_positions_json()).unwrap();
        assert_eq!(before, after);
    }
}
