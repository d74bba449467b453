//! The Broker Adapter Contract (§4.1) — a single capability interface every
//! broker (paper, Alpaca, Kraken, NSE-sim, ...) implements identically.
//! Selection is a factory keyed by scope, not an inheritance chain; a stub
//! adapter that doesn't support an operation fails loudly rather than
//! returning a default (§9 design note).

use chrono::NaiveDate;

use crate::types::{BrokerResult, Fill, MarketHours, OrderResult, OrderSide, Position, TimeInForce};

/// Uniform broker capability set. Object-safe (`dyn BrokerAdapter`) so the
/// scheduler and reconciliation engine can hold one trait object per scope
/// without knowing which concrete broker backs it.
///
/// Deliberately **absent**: any withdrawal, transfer, or margin-adjustment
/// method. That absence is the code-level guarantee the spec calls for —
/// there is no method here for a caller to misuse into moving money out of
/// the account.
pub trait BrokerAdapter: Send + Sync {
    /// `true` for a paper/simulator account. The safety rule (§4.1) is
    /// enforced by callers: a live-mode scope wired to an adapter that
    /// reports `true` here is a configuration error, checked at startup.
    fn is_paper_trading(&self) -> bool;

    fn account_equity(&self) -> BrokerResult<f64>;

    fn buying_power(&self) -> BrokerResult<f64>;

    fn submit_market_order(
        &self,
        order_id: &str,
        symbol: &str,
        qty: f64,
        side: OrderSide,
        time_in_force: TimeInForce,
    ) -> BrokerResult<OrderResult>;

    fn get_order_status(&self, order_id: &str) -> BrokerResult<OrderResult>;

    fn get_positions(&self) -> BrokerResult<Vec<Position>>;

    fn get_position(&self, symbol: &str) -> BrokerResult<Option<Position>> {
        Ok(self.get_positions()?.into_iter().find(|p| p.symbol == symbol))
    }

    fn close_position(&self, symbol: &str) -> BrokerResult<OrderResult>;

    fn get_market_hours(&self, date: NaiveDate) -> BrokerResult<MarketHours>;

    fn is_market_open(&self) -> BrokerResult<bool>;

    /// Fills observed since `cursor` (a fill id, broker-specific cursor
    /// token, or `None` for "from the start of the adapter's retention
    /// window"). Only reconcilable brokers need to override this; the
    /// default fails loudly rather than silently returning nothing, per
    /// the "stub adapters fail loudly on unsupported operations" design
    /// note (§9).
    fn list_fills_since(&self, _cursor: Option<&str>) -> BrokerResult<Vec<Fill>> {
        Err(crate::types::BrokerError::Unsupported("list_fills_since"))
    }

    /// Adapter-local, bijective symbol normalization (§4.1 contract:
    /// `from_broker(to_broker(s)) == s` for every supported `s`).
    /// Adapters with no exchange-specific mapping (plain equities) use the
    /// identity function.
    fn to_broker_symbol(&self, symbol: &str) -> String {
        symbol.to_string()
    }

    fn from_broker_symbol(&self, broker_symbol: &str) -> String {
        broker_symbol.to_string()
    }
}
