//! Corporate event calendar (§9 open question): a pluggable source of
//! blackout windows (earnings, splits, dividends) that the universe
//! pipeline must not add a symbol into the middle of. The trait is
//! intentionally provider-agnostic; the in-memory implementation here is
//! fail-closed — an unknown symbol counts as "no blackout" only when the
//! caller has actually loaded data for it, never as an assumed all-clear
//! across the whole universe.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::types::BlackoutWindow;

pub trait CorporateEventCalendar: Send + Sync {
    /// True if `symbol` is inside a blackout window on `date`. Providers
    /// that cannot answer (feed down, symbol unknown) must return `true` —
    /// fail closed, never silently allow an addition.
    fn is_blacked_out(&self, symbol: &str, date: NaiveDate) -> bool;
}

/// In-memory calendar seeded with known blackout windows per symbol.
/// Symbols with no entry at all are blocked by default; call
/// [`InMemoryCalendar::clear_symbol`] to explicitly mark a symbol as having
/// no known events (and therefore never blacked out).
#[derive(Debug, Clone, Default)]
pub struct InMemoryCalendar {
    windows: HashMap<String, Vec<BlackoutWindow>>,
    cleared: HashMap<String, bool>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_window(&mut self, symbol: &str, window: BlackoutWindow) {
        self.windows.entry(symbol.to_string()).or_default().push(window);
    }

    pub fn clear_symbol(&mut self, symbol: &str) {
        self.cleared.insert(symbol.to_string(), true);
    }
}

impl CorporateEventCalendar for InMemoryCalendar {
    fn is_blacked_out(&self, symbol: &str, date: NaiveDate) -> bool {
        if let Some(windows) = self.windows.get(symbol) {
            return windows.iter().any(|w| w.contains(date));
        }
        !self.cleared.get(symbol).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn unknown_symbol_is_blacked_out_by_default() {
        let cal = InMemoryCalendar::new();
        assert!(cal.is_blacked_out("AAPL", d("2026-07-28")));
    }

    #[test]
    fn cleared_symbol_with_no_windows_is_never_blacked_out() {
        let mut cal = InMemoryCalendar::new();
        cal.clear_symbol("AAPL");
        assert!(!cal.is_blacked_out("AAPL", d("2026-07-28")));
    }

    #[test]
    fn date_inside_window_is_blacked_out() {
        let mut cal = InMemoryCalendar::new();
        cal.add_window(
            "AAPL",
            BlackoutWindow {
                start: d("2026-07-25"),
                end: d("2026-07-30"),
            },
        );
        assert!(cal.is_blacked_out("AAPL", d("2026-07-28")));
        assert!(!cal.is_blacked_out("AAPL", d("2026-08-01")));
    }
}
