//! Entry/exit pricing, slippage, and liquidity gate (§4.3).
//!
//! Pure functions only — no broker wiring, no lookahead. A signal fired on
//! day *D* may only be priced off day *D* or day *D+1* data the caller
//! already holds; this module never reaches further than the slice it's
//! given.

use std::fmt;

/// One bar's worth of OHLC data a signal can be priced against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DailyBar {
    pub open: f64,
    pub close: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlippageDirection {
    Entry,
    Exit,
}

/// Slippage always moves price against the trader: worse (higher) on
/// entry, worse (lower) on exit.
pub fn apply_slippage(price: f64, slippage_bps: i64, direction: SlippageDirection) -> f64 {
    let slippage_pct = slippage_bps as f64 / 10_000.0;
    match direction {
        SlippageDirection::Entry => price * (1.0 + slippage_pct),
        SlippageDirection::Exit => price * (1.0 - slippage_pct),
    }
}

/// Entry price for a signal fired at `signal_index` within `bars`.
///
/// `use_next_open = true` selects `bars[signal_index + 1].open`; if that
/// bar doesn't exist, entry is rejected (`None`) rather than falling back
/// to same-day data. `use_next_open = false` selects `bars[signal_index].close`.
pub fn compute_entry_price(
    bars: &[DailyBar],
    signal_index: usize,
    entry_slippage_bps: i64,
    use_next_open: bool,
) -> Option<f64> {
    let reference = if use_next_open {
        bars.get(signal_index + 1)?.open
    } else {
        bars.get(signal_index)?.close
    };
    Some(apply_slippage(reference, entry_slippage_bps, SlippageDirection::Entry))
}

/// Exit price on `exit_index`. One flag, one meaning, applied consistently
/// to both entries and exits within a scope: `true` selects that bar's
/// open, `false` selects that bar's close.
pub fn compute_exit_price(
    bars: &[DailyBar],
    exit_index: usize,
    exit_slippage_bps: i64,
    use_next_open: bool,
) -> Option<f64> {
    let bar = bars.get(exit_index)?;
    let reference = if use_next_open { bar.open } else { bar.close };
    Some(apply_slippage(reference, exit_slippage_bps, SlippageDirection::Exit))
}

/// Liquidity gate result. `Err` carries the exact rejection string,
/// preserved verbatim from the reference model (tested per §8 scenario 2).
pub fn check_liquidity(
    position_notional: f64,
    avg_daily_dollar_volume: f64,
    max_adv_pct: f64,
) -> Result<(), String> {
    if avg_daily_dollar_volume <= 0.0 {
        return Err("Invalid ADV: must be > 0".to_string());
    }

    let position_adv_pct = position_notional / avg_daily_dollar_volume;
    if position_adv_pct > max_adv_pct {
        return Err(format!(
            "Position too large: {:.0} is {:.2}% of ADV ({:.0}), exceeds limit of {:.2}%",
            position_notional,
            position_adv_pct * 100.0,
            avg_daily_dollar_volume,
            max_adv_pct * 100.0
        ));
    }

    Ok(())
}

/// Dollar cost of slippage relative to idealized (zero-slippage) fills.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlippageCost {
    pub entry_slippage_cost: f64,
    pub exit_slippage_cost: f64,
    pub total_slippage_cost: f64,
    pub entry_slippage_bps: f64,
    pub exit_slippage_bps: f64,
}

pub fn compute_slippage_cost(
    entry_price_idealized: f64,
    exit_price_idealized: f64,
    entry_price_realistic: f64,
    exit_price_realistic: f64,
    position_size: f64,
) -> SlippageCost {
    let entry_slippage_cost = (entry_price_realistic - entry_price_idealized) * position_size;
    let exit_slippage_cost = (exit_price_idealized - exit_price_realistic) * position_size;

    SlippageCost {
        entry_slippage_cost,
        exit_slippage_cost,
        total_slippage_cost: entry_slippage_cost + exit_slippage_cost,
        entry_slippage_bps: (entry_price_realistic / entry_price_idealized - 1.0) * 10_000.0,
        exit_slippage_bps: (exit_price_idealized / exit_price_realistic - 1.0) * 10_000.0,
    }
}

impl fmt::Display for SlippageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlippageDirection::Entry => write!(f, "entry"),
            SlippageDirection::Exit => write!(f, "exit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(opens_closes: &[(f64, f64)]) -> Vec<DailyBar> {
        opens_closes
            .iter()
            .map(|&(open, close)| DailyBar { open, close })
            .collect()
    }

    #[test]
    fn time_safety_scenario_entry_price() {
        let bars = bars(&[(100.0, 100.0), (101.0, 101.0), (102.0, 102.0), (103.0, 103.0), (104.0, 104.0)]);
        let entry = compute_entry_price(&bars, 0, 5, true).unwrap();
        assert!((entry - 101.0505).abs() < 1e-9);
    }

    #[test]
    fn time_safety_scenario_last_day_rejects_next_open() {
        let bars = bars(&[(100.0, 100.0), (101.0, 101.0), (102.0, 102.0), (103.0, 103.0), (104.0, 104.0)]);
        assert_eq!(compute_entry_price(&bars, 4, 5, true), None);
    }

    #[test]
    fn same_day_close_entry_does_not_look_ahead() {
        let bars = bars(&[(100.0, 99.5)]);
        let entry = compute_entry_price(&bars, 0, 0, false).unwrap();
        assert!((entry - 99.5).abs() < 1e-9);
    }

    #[test]
    fn zero_slippage_leaves_prices_unchanged() {
        assert_eq!(apply_slippage(100.0, 0, SlippageDirection::Entry), 100.0);
        assert_eq!(apply_slippage(100.0, 0, SlippageDirection::Exit), 100.0);
    }

    #[test]
    fn slippage_always_moves_against_the_trader() {
        let entry = apply_slippage(100.0, 5, SlippageDirection::Entry);
        let exit = apply_slippage(100.0, 5, SlippageDirection::Exit);
        assert!(entry >= 100.0);
        assert!(exit <= 100.0);
    }

    #[test]
    fn liquidity_boundary_scenario() {
        let adv = 10_000_000.0;
        assert!(check_liquidity(500_000.0, adv, 0.05).is_ok());
        let err = check_liquidity(600_000.0, adv, 0.05).unwrap_err();
        assert!(err.contains("Position too large"));
    }

    #[test]
    fn liquidity_exactly_at_cap_is_accepted() {
        assert!(check_liquidity(500_000.0, 10_000_000.0, 0.05).is_ok());
    }

    #[test]
    fn liquidity_zero_adv_is_rejected() {
        let err = check_liquidity(1.0, 0.0, 0.05).unwrap_err();
        assert_eq!(err, "Invalid ADV: must be > 0");
    }

    #[test]
    fn slippage_cost_entry_and_exit_both_unfavorable() {
        let cost = compute_slippage_cost(100.0, 110.0, 100.5, 109.5, 10.0);
        assert!((cost.entry_slippage_cost - 5.0).abs() < 1e-9);
        assert!((cost.exit_slippage_cost - 5.0).abs() < 1e-9);
        assert!((cost.total_slippage_cost - 10.0).abs() < 1e-9);
    }
}
