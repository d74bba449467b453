//! Fill-stream-based Open Position rebuild (§4.2).
//!
//! This module is deliberately broker- and IO-free, matching the rest of
//! this crate's "deterministic, pure logic; no IO, no broker calls"
//! contract (see the crate doc comment). The caller — `mqk-scheduler`'s
//! reconciliation task — is responsible for fetching fills from a
//! `mqk_broker_core::BrokerAdapter`, converting them to [`RawFill`], and
//! persisting the result via `mqk-db`.
//!
//! The defining property, tested below: **positions are rebuilt from the
//! full fill set every time, never patched incrementally.** A fill dated
//! `2026-02-05T20:55:55Z` must never collapse to a bare date, and
//! re-running the rebuild over an unchanged fill set must produce
//! byte-identical output.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Side;

/// Safety window subtracted from the cursor's last-seen fill time before
/// each fetch, to tolerate a broker's fill stream arriving slightly out of
/// order (§4.2 step 2).
pub const SAFETY_WINDOW_HOURS: i64 = 24;

/// First-ever run (no cursor on disk) defaults to this lookback.
pub const FIRST_RUN_LOOKBACK_DAYS: i64 = 7;

/// A single fill, already normalized to UTC, in the shape the rebuild
/// algorithm needs. Adapters produce their own richer `Fill` type
/// (`mqk_broker_core::Fill`); the caller maps one to the other at the
/// reconciliation task boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawFill {
    pub fill_id: String,
    pub order_id: String,
    pub symbol: String,
    pub qty: f64,
    pub price: f64,
    pub filled_at_utc: DateTime<Utc>,
    pub side: Side,
}

/// Derived purely from the set of fills for one symbol; never edited in
/// place (§3 Open Position). `source` is always `"BROKER_RECONCILIATION"`
/// for positions produced by this module (§6 file format invariant).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub symbol: String,
    pub entry_order_id: String,
    pub entry_timestamp_utc: DateTime<Utc>,
    pub weighted_avg_entry_price: f64,
    pub quantity: f64,
    pub fill_ids: Vec<String>,
    pub entry_count: u32,
    pub last_entry_time_utc: DateTime<Utc>,
    pub last_entry_price: f64,
    pub reconciled_at_utc: DateTime<Utc>,
    pub source: String,
}

/// Durable marker of reconciliation progress (§3 Reconciliation Cursor).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct ReconciliationCursor {
    pub last_seen_fill_id: Option<String>,
    pub last_seen_fill_time_utc: Option<DateTime<Utc>>,
    pub last_reconciliation_time_utc: Option<DateTime<Utc>>,
}

impl ReconciliationCursor {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_first_run(&self) -> bool {
        self.last_seen_fill_time_utc.is_none()
    }
}

/// Start of the fetch window for this reconciliation run (§4.2 step 2).
pub fn fetch_window_start(cursor: &ReconciliationCursor, now: DateTime<Utc>) -> DateTime<Utc> {
    match cursor.last_seen_fill_time_utc {
        Some(last_seen) => last_seen - Duration::hours(SAFETY_WINDOW_HOURS),
        None => now - Duration::days(FIRST_RUN_LOOKBACK_DAYS),
    }
}

/// Drop fills already reflected in `known_fill_ids` and de-duplicate
/// within `batch` itself (§4.2 step 4). Order of first occurrence is
/// preserved so downstream chronological sorting stays stable.
pub fn dedupe_fills(known_fill_ids: &BTreeSet<String>, batch: Vec<RawFill>) -> Vec<RawFill> {
    let mut seen_in_batch: BTreeSet<String> = BTreeSet::new();
    let mut out = Vec::with_capacity(batch.len());
    for fill in batch {
        if known_fill_ids.contains(&fill.fill_id) {
            continue;
        }
        if !seen_in_batch.insert(fill.fill_id.clone()) {
            continue;
        }
        out.push(fill);
    }
    out
}

/// Rebuild every symbol's Open Position from the given fills, in their
/// entirety — never as a delta applied to prior state (§4.2 step 5).
///
/// Fills are sorted chronologically per symbol before folding; a tie in
/// `filled_at_utc` breaks on `fill_id` so the result is deterministic
/// regardless of the order the caller happened to pass fills in.
pub fn rebuild_from_fills(
    fills: &[RawFill],
    reconciled_at_utc: DateTime<Utc>,
) -> BTreeMap<String, OpenPosition> {
    let mut by_symbol: BTreeMap<String, Vec<&RawFill>> = BTreeMap::new();
    for fill in fills {
        by_symbol.entry(fill.symbol.clone()).or_default().push(fill);
    }

    let mut positions = BTreeMap::new();
    for (symbol, mut symbol_fills) in by_symbol {
        symbol_fills.sort_by(|a, b| {
            a.filled_at_utc
                .cmp(&b.filled_at_utc)
                .then_with(|| a.fill_id.cmp(&b.fill_id))
        });

        let net_qty: f64 = symbol_fills
            .iter()
            .map(|f| match f.side {
                Side::Buy => f.qty,
                Side::Sell => -f.qty,
            })
            .sum();

        if net_qty <= 0.0 {
            continue;
        }

        let buys: Vec<&&RawFill> = symbol_fills.iter().filter(|f| f.side == Side::Buy).collect();
        // net_qty > 0 guarantees at least one buy fill exists for this symbol.
        let first_buy = buys.first().expect("positive net_qty implies a buy fill");
        let last_buy = buys.last().expect("positive net_qty implies a buy fill");

        let total_buy_qty: f64 = buys.iter().map(|f| f.qty).sum();
        let weighted_avg_entry_price = if total_buy_qty > 0.0 {
            buys.iter().map(|f| f.qty * f.price).sum::<f64>() / total_buy_qty
        } else {
            0.0
        };

        positions.insert(
            symbol.clone(),
            OpenPosition {
                symbol,
                entry_order_id: first_buy.order_id.clone(),
                entry_timestamp_utc: first_buy.filled_at_utc,
                weighted_avg_entry_price,
                quantity: net_qty,
                fill_ids: symbol_fills.iter().map(|f| f.fill_id.clone()).collect(),
                entry_count: buys.len() as u32,
                last_entry_time_utc: last_buy.filled_at_utc,
                last_entry_price: last_buy.price,
                reconciled_at_utc,
                source: "BROKER_RECONCILIATION".to_string(),
            },
        );
    }

    positions
}

/// Advance the cursor past every fill actually processed (§4.2 step 6).
/// Monotonic: never moves `last_seen_fill_time_utc` backward, even if
/// `processed` is empty (the cursor simply doesn't advance that run).
pub fn advance_cursor(
    previous: &ReconciliationCursor,
    processed: &[RawFill],
    now: DateTime<Utc>,
) -> ReconciliationCursor {
    let latest = processed
        .iter()
        .max_by(|a, b| a.filled_at_utc.cmp(&b.filled_at_utc).then_with(|| a.fill_id.cmp(&b.fill_id)));

    match latest {
        Some(fill) => {
            let advances = previous
                .last_seen_fill_time_utc
                .map(|t| fill.filled_at_utc > t)
                .unwrap_or(true);
            if advances {
                ReconciliationCursor {
                    last_seen_fill_id: Some(fill.fill_id.clone()),
                    last_seen_fill_time_utc: Some(fill.filled_at_utc),
                    last_reconciliation_time_utc: Some(now),
                }
            } else {
                ReconciliationCursor {
                    last_reconciliation_time_utc: Some(now),
                    ..previous.clone()
                }
            }
        }
        None => ReconciliationCursor {
            last_reconciliation_time_utc: Some(now),
            ..previous.clone()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(id: &str, order_id: &str, symbol: &str, qty: f64, price: f64, ts: &str, side: Side) -> RawFill {
        RawFill {
            fill_id: id.to_string(),
            order_id: order_id.to_string(),
            symbol: symbol.to_string(),
            qty,
            price,
            filled_at_utc: ts.parse().unwrap(),
            side,
        }
    }

    #[test]
    fn rebuild_matches_scenario_3_multi_symbol() {
        let fills = vec![
            fill("f1", "o1", "PFE", 0.03755163, 26.628, "2026-02-02T20:55:29Z", Side::Buy),
            fill("f2", "o2", "PFE", 0.04752182, 25.778, "2026-02-03T20:55:29Z", Side::Buy),
            fill("f3", "o3", "PFE", 0.04500565, 26.528, "2026-02-05T20:55:55Z", Side::Buy),
            fill("f4", "o4", "KO", 0.01590747, 77.038, "2026-02-03T20:55:29Z", Side::Buy),
        ];
        let positions = rebuild_from_fills(&fills, Utc::now());

        let pfe = &positions["PFE"];
        assert!((pfe.quantity - 0.1300791).abs() < 1e-9);
        assert_eq!(pfe.entry_timestamp_utc.to_rfc3339(), "2026-02-02T20:55:29+00:00");
        assert!(pfe.entry_timestamp_utc.to_rfc3339().starts_with("2026-02-02"));
        assert!(pfe.last_entry_time_utc.to_rfc3339().starts_with("2026-02-05"));

        let ko = &positions["KO"];
        assert!((ko.quantity - 0.01590747).abs() < 1e-9);

        // Re-running over the identical fill set is idempotent.
        let positions_again = rebuild_from_fills(&fills, positions["PFE"].reconciled_at_utc);
        assert_eq!(positions_again["PFE"].quantity, positions["PFE"].quantity);
        assert_eq!(
            positions_again["PFE"].entry_timestamp_utc,
            positions["PFE"].entry_timestamp_utc
        );
    }

    #[test]
    fn fill_timestamp_never_truncated_to_a_date() {
        let fills = vec![fill(
            "f1",
            "o1",
            "PFE",
            1.0,
            10.0,
            "2026-02-05T20:55:55Z",
            Side::Buy,
        )];
        let positions = rebuild_from_fills(&fills, Utc::now());
        let p = &positions["PFE"];
        assert_eq!(p.entry_timestamp_utc.to_rfc3339(), "2026-02-05T20:55:55+00:00");
        assert_ne!(p.entry_timestamp_utc.format("%Y-%m-%d").to_string(), "2026-02-04");
    }

    #[test]
    fn net_qty_zero_or_negative_drops_the_symbol() {
        let fills = vec![
            fill("f1", "o1", "AAPL", 10.0, 100.0, "2026-01-01T00:00:00Z", Side::Buy),
            fill("f2", "o2", "AAPL", 10.0, 101.0, "2026-01-02T00:00:00Z", Side::Sell),
        ];
        let positions = rebuild_from_fills(&fills, Utc::now());
        assert!(!positions.contains_key("AAPL"));
    }

    #[test]
    fn dedupe_drops_known_and_in_batch_duplicates() {
        let known: BTreeSet<String> = ["f1".to_string()].into_iter().collect();
        let batch = vec![
            fill("f1", "o1", "AAPL", 1.0, 1.0, "2026-01-01T00:00:00Z", Side::Buy),
            fill("f2", "o2", "AAPL", 1.0, 1.0, "2026-01-01T00:00:01Z", Side::Buy),
            fill("f2", "o2", "AAPL", 1.0, 1.0, "2026-01-01T00:00:01Z", Side::Buy),
        ];
        let out = dedupe_fills(&known, batch);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].fill_id, "f2");
    }

    #[test]
    fn cursor_advances_to_latest_processed_fill_and_never_regresses() {
        let previous = ReconciliationCursor::empty();
        let now = Utc::now();
        let processed = vec![
            fill("f1", "o1", "AAPL", 1.0, 1.0, "2026-01-01T00:00:00Z", Side::Buy),
            fill("f2", "o1", "AAPL", 1.0, 1.0, "2026-01-02T00:00:00Z", Side::Buy),
        ];
        let advanced = advance_cursor(&previous, &processed, now);
        assert_eq!(advanced.last_seen_fill_id.as_deref(), Some("f2"));

        // A later call with an older (already-seen) fill must not regress the cursor.
        let stale = vec![fill("f0", "o1", "AAPL", 1.0, 1.0, "2025-12-31T00:00:00Z", Side::Buy)];
        let reapplied = advance_cursor(&advanced, &stale, now);
        assert_eq!(reapplied.last_seen_fill_id.as_deref(), Some("f2"));
    }

    #[test]
    fn empty_fill_set_leaves_cursor_position_unchanged() {
        let previous = ReconciliationCursor {
            last_seen_fill_id: Some("f9".to_string()),
            last_seen_fill_time_utc: Some("2026-01-01T00:00:00Z".parse().unwrap()),
            last_reconciliation_time_utc: Some(Utc::now()),
        };
        let advanced = advance_cursor(&previous, &[], Utc::now());
        assert_eq!(advanced.last_seen_fill_id, previous.last_seen_fill_id);
        assert_eq!(advanced.last_seen_fill_time_utc, previous.last_seen_fill_time_utc);
    }

    #[test]
    fn first_run_fetch_window_defaults_to_seven_days() {
        let now: DateTime<Utc> = "2026-02-10T00:00:00Z".parse().unwrap();
        let window_start = fetch_window_start(&ReconciliationCursor::empty(), now);
        assert_eq!(window_start, now - Duration::days(7));
    }

    #[test]
    fn subsequent_run_fetch_window_subtracts_safety_window() {
        let last_seen: DateTime<Utc> = "2026-02-10T12:00:00Z".parse().unwrap();
        let cursor = ReconciliationCursor {
            last_seen_fill_id: Some("f1".to_string()),
            last_seen_fill_time_utc: Some(last_seen),
            last_reconciliation_time_utc: Some(last_seen),
        };
        let window_start = fetch_window_start(&cursor, last_seen);
        assert_eq!(window_start, last_seen - Duration::hours(24));
    }
}
