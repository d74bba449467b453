//! Dry-run enforcement (§4.1 safety rule).
//!
//! Live mode requires explicit configuration *plus* `dry_run = false` *and*
//! `enable_live_orders = true`. With `dry_run = true` in live mode,
//! `submit_market_order` must return a synthetic `REJECTED` result carrying
//! a `DRY_RUN` reason and must not contact the broker at all.
//!
//! Rather than asking every adapter to re-implement this check, any
//! adapter can be wrapped in [`DryRunGuard`], which intercepts
//! `submit_market_order` and `close_position` (the two calls that place
//! real orders) and only forwards the call when live orders are actually
//! permitted.

use chrono::{NaiveDate, Utc};

use crate::adapter::BrokerAdapter;
use crate::types::{BrokerResult, Fill, MarketHours, OrderResult, OrderSide, OrderStatus, Position, TimeInForce};

pub struct DryRunGuard<B: BrokerAdapter> {
    inner: B,
    live_orders_permitted: bool,
}

impl<B: BrokerAdapter> DryRunGuard<B> {
    /// `live_orders_permitted` should come from
    /// `FeatureFlags::live_orders_permitted(scope.is_live())` — this type
    /// does not know about scopes or flags, only the resolved boolean.
    pub fn new(inner: B, live_orders_permitted: bool) -> Self {
        Self {
            inner,
            live_orders_permitted,
        }
    }

    fn dry_run_rejection(&self, order_id: &str, symbol: &str, qty: f64, side: OrderSide) -> OrderResult {
        OrderResult {
            order_id: order_id.to_string(),
            broker_order_id: None,
            symbol: symbol.to_string(),
            side,
            qty,
            status: OrderStatus::Rejected,
            filled_qty: 0.0,
            filled_price: None,
            submit_time: Utc::now(),
            fill_time: None,
            rejection_reason: Some("DRY_RUN".to_string()),
        }
    }
}

impl<B: BrokerAdapter> BrokerAdapter for DryRunGuard<B> {
    fn is_paper_trading(&self) -> bool {
        self.inner.is_paper_trading()
    }

    fn account_equity(&self) -> BrokerResult<f64> {
        self.inner.account_equity()
    }

    fn buying_power(&self) -> BrokerResult<f64> {
        self.inner.buying_power()
    }

    fn submit_market_order(
        &self,
        order_id: &str,
        symbol: &str,
        qty: f64,
        side: OrderSide,
        time_in_force: TimeInForce,
    ) -> BrokerResult<OrderResult> {
        if !self.live_orders_permitted {
            return Ok(self.dry_run_rejection(order_id, symbol, qty, side));
        }
        self.inner
            .submit_market_order(order_id, symbol, qty, side, time_in_force)
    }

    fn get_order_status(&self, order_id: &str) -> BrokerResult<OrderResult> {
        self.inner.get_order_status(order_id)
    }

    fn get_positions(&self) -> BrokerResult<Vec<Position>> {
        self.inner.get_positions()
    }

    fn get_position(&self, symbol: &str) -> BrokerResult<Option<Position>> {
        self.inner.get_position(symbol)
    }

    fn close_position(&self, symbol: &str) -> BrokerResult<OrderResult> {
        if !self.live_orders_permitted {
            return Ok(self.dry_run_rejection(
                &format!("close:{symbol}"),
                symbol,
                0.0,
                OrderSide::Sell,
            ));
        }
        self.inner.close_position(symbol)
    }

    fn get_market_hours(&self, date: NaiveDate) -> BrokerResult<MarketHours> {
        self.inner.get_market_hours(date)
    }

    fn is_market_open(&self) -> BrokerResult<bool> {
        self.inner.is_market_open()
    }

    fn list_fills_since(&self, cursor: Option<&str>) -> BrokerResult<Vec<Fill>> {
        self.inner.list_fills_since(cursor)
    }

    fn to_broker_symbol(&self, symbol: &str) -> String {
        self.inner.to_broker_symbol(symbol)
    }

    fn from_broker_symbol(&self, broker_symbol: &str) -> String {
        self.inner.from_broker_symbol(broker_symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqk_reconcile::Side;

    struct RecordingBroker {
        submit_calls: std::cell::Cell<u32>,
    }

    impl BrokerAdapter for RecordingBroker {
        fn is_paper_trading(&self) -> bool {
            false
        }
        fn account_equity(&self) -> BrokerResult<f64> {
            Ok(100_000.0)
        }
        fn buying_power(&self) -> BrokerResult<f64> {
            Ok(100_000.0)
        }
        fn submit_market_order(
            &self,
            order_id: &str,
            symbol: &str,
            qty: f64,
            side: OrderSide,
            _time_in_force: TimeInForce,
        ) -> BrokerResult<OrderResult> {
            self.submit_calls.set(self.submit_calls.get() + 1);
            Ok(OrderResult {
                order_id: order_id.to_string(),
                broker_order_id: Some("b-1".to_string()),
                symbol: symbol.to_string(),
                side,
                qty,
                status: OrderStatus::Filled,
                filled_qty: qty,
                filled_price: Some(100.0),
                submit_time: Utc::now(),
                fill_time: Some(Utc::now()),
                rejection_reason: None,
            })
        }
        fn get_order_status(&self, _order_id: &str) -> BrokerResult<OrderResult> {
            unimplemented!()
        }
        fn get_positions(&self) -> BrokerResult<Vec<Position>> {
            Ok(vec![])
        }
        fn close_position(&self, _symbol: &str) -> BrokerResult<OrderResult> {
            unimplemented!()
        }
        fn get_market_hours(&self, date: NaiveDate) -> BrokerResult<MarketHours> {
            Ok(MarketHours {
                date,
                open_utc: None,
                close_utc: None,
                is_open: false,
            })
        }
        fn is_market_open(&self) -> BrokerResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn dry_run_blocks_submit_without_contacting_broker() {
        let inner = RecordingBroker {
            submit_calls: std::cell::Cell::new(0),
        };
        let guard = DryRunGuard::new(inner, false);
        let result = guard
            .submit_market_order("o-1", "AAPL", 10.0, Side::Buy, TimeInForce::Day)
            .unwrap();
        assert_eq!(result.status, OrderStatus::Rejected);
        assert_eq!(result.rejection_reason.as_deref(), Some("DRY_RUN"));
        assert_eq!(guard.inner.submit_calls.get(), 0);
    }

    #[test]
    fn live_orders_permitted_forwards_to_inner() {
        let inner = RecordingBroker {
            submit_calls: std::cell::Cell::new(0),
        };
        let guard = DryRunGuard::new(inner, true);
        let result = guard
            .submit_market_order("o-1", "AAPL", 10.0, Side::Buy, TimeInForce::Day)
            .unwrap();
        assert_eq!(result.status, OrderStatus::Filled);
        assert_eq!(guard.inner.submit_calls.get(), 1);
    }
}
