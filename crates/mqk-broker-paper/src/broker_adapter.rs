//! `mqk_broker_core::BrokerAdapter` implementation over [`PaperBroker`].
//!
//! `BrokerAdapter` methods take `&self`, but `PaperBroker`'s own API is
//! `&mut self` (it's a plain deterministic simulator, not built for
//! concurrent access). `LockedPaperBroker` is the thin `Mutex` wrapper that
//! bridges the two — the same role a paper broker plays for every other
//! adapter in this workspace: in-process, single-writer, no network.

use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use mqk_broker_core::{
    BrokerAdapter, BrokerError, BrokerResult, Fill, MarketHours, OrderResult, OrderSide,
    OrderStatus as CoreOrderStatus, Position, TimeInForce,
};
use mqk_reconcile::OrderStatus as SnapshotStatus;

use crate::types::SubmitOrder;
use crate::PaperBroker;

pub struct LockedPaperBroker {
    inner: Mutex<PaperBroker>,
}

impl LockedPaperBroker {
    pub fn new(broker: PaperBroker) -> Self {
        Self {
            inner: Mutex::new(broker),
        }
    }

    /// Apply a fill to the wrapped broker (test/scenario setup helper —
    /// production fills arrive only via whatever feeds a real broker's
    /// fill stream; this simulator has none, so tests drive it directly).
    pub fn apply_fill(&self, fill: Fill) {
        self.inner.lock().expect("paper broker lock poisoned").apply_fill(fill);
    }

    pub fn set_account(&self, equity: f64, buying_power: f64) {
        self.inner
            .lock()
            .expect("paper broker lock poisoned")
            .set_account(equity, buying_power);
    }
}

fn snapshot_status_to_core(status: &SnapshotStatus) -> CoreOrderStatus {
    match status {
        SnapshotStatus::New | SnapshotStatus::Accepted => CoreOrderStatus::Pending,
        SnapshotStatus::PartiallyFilled => CoreOrderStatus::Partial,
        SnapshotStatus::Filled => CoreOrderStatus::Filled,
        SnapshotStatus::Canceled => CoreOrderStatus::Cancelled,
        SnapshotStatus::Rejected => CoreOrderStatus::Rejected,
        SnapshotStatus::Unknown => CoreOrderStatus::Pending,
    }
}

impl BrokerAdapter for LockedPaperBroker {
    fn is_paper_trading(&self) -> bool {
        true
    }

    fn account_equity(&self) -> BrokerResult<f64> {
        Ok(self.inner.lock().expect("paper broker lock poisoned").account_equity())
    }

    fn buying_power(&self) -> BrokerResult<f64> {
        Ok(self.inner.lock().expect("paper broker lock poisoned").buying_power())
    }

    fn submit_market_order(
        &self,
        order_id: &str,
        symbol: &str,
        qty: f64,
        side: OrderSide,
        _time_in_force: TimeInForce,
    ) -> BrokerResult<OrderResult> {
        let mut broker = self.inner.lock().expect("paper broker lock poisoned");
        let resp = broker.submit(SubmitOrder {
            client_order_id: order_id.to_string(),
            symbol: symbol.to_string(),
            side,
            qty: qty.round() as i64,
        });
        Ok(OrderResult {
            order_id: order_id.to_string(),
            broker_order_id: Some(resp.broker_order_id),
            symbol: symbol.to_string(),
            side,
            qty,
            status: snapshot_status_to_core(&resp.snapshot.status),
            filled_qty: resp.snapshot.filled_qty as f64,
            filled_price: None,
            submit_time: Utc::now(),
            fill_time: None,
            rejection_reason: None,
        })
    }

    fn get_order_status(&self, order_id: &str) -> BrokerResult<OrderResult> {
        let broker = self.inner.lock().expect("paper broker lock poisoned");
        let snap = broker
            .list_orders()
            .into_iter()
            .find(|o| o.order_id == order_id)
            .ok_or_else(|| BrokerError::Api(format!("unknown order_id {order_id}")))?;
        Ok(OrderResult {
            order_id: order_id.to_string(),
            broker_order_id: Some(snap.order_id.clone()),
            symbol: snap.symbol.clone(),
            side: snap.side.clone(),
            qty: snap.qty as f64,
            status: snapshot_status_to_core(&snap.status),
            filled_qty: snap.filled_qty as f64,
            filled_price: None,
            submit_time: Utc::now(),
            fill_time: None,
            rejection_reason: None,
        })
    }

    fn get_positions(&self) -> BrokerResult<Vec<Position>> {
        let broker = self.inner.lock().expect("paper broker lock poisoned");
        Ok(broker
            .positions()
            .into_iter()
            .map(|(symbol, qty)| Position {
                symbol,
                qty: qty as f64,
                avg_entry_price: 0.0,
            })
            .collect())
    }

    fn close_position(&self, symbol: &str) -> BrokerResult<OrderResult> {
        let qty_signed = {
            let broker = self.inner.lock().expect("paper broker lock poisoned");
            broker.positions().get(symbol).copied().unwrap_or(0)
        };
        if qty_signed == 0 {
            return Err(BrokerError::Api(format!("no open position for {symbol}")));
        }
        let side = if qty_signed > 0 { OrderSide::Sell } else { OrderSide::Buy };
        self.submit_market_order(
            &format!("close:{symbol}"),
            symbol,
            qty_signed.unsigned_abs() as f64,
            side,
            TimeInForce::Day,
        )
    }

    fn get_market_hours(&self, date: NaiveDate) -> BrokerResult<MarketHours> {
        // Deterministic simulator: every day is a full trading day, 24h.
        Ok(MarketHours {
            date,
            open_utc: date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
            close_utc: date.and_hms_opt(23, 59, 59).map(|dt| dt.and_utc()),
            is_open: true,
        })
    }

    fn is_market_open(&self) -> BrokerResult<bool> {
        Ok(true)
    }

    fn list_fills_since(&self, cursor: Option<&str>) -> BrokerResult<Vec<Fill>> {
        let broker = self.inner.lock().expect("paper broker lock poisoned");
        Ok(broker.fills_since(cursor))
    }

    // Equity symbols: identity mapping, no exchange-specific table needed.
}

impl From<PaperBroker> for LockedPaperBroker {
    fn from(broker: PaperBroker) -> Self {
        Self::new(broker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqk_reconcile::Side;

    #[test]
    fn is_paper_trading_is_always_true() {
        let b = LockedPaperBroker::new(PaperBroker::new());
        assert!(b.is_paper_trading());
    }

    #[test]
    fn submit_then_status_round_trips() {
        let b = LockedPaperBroker::new(PaperBroker::new());
        b.submit_market_order("o1", "AAPL", 10.0, Side::Buy, TimeInForce::Day)
            .unwrap();
        let status = b.get_order_status("o1").unwrap();
        assert_eq!(status.status, CoreOrderStatus::Pending);
    }

    #[test]
    fn apply_fill_updates_positions_and_fills_since() {
        let b = LockedPaperBroker::new(PaperBroker::new());
        b.apply_fill(Fill {
            fill_id: "f1".to_string(),
            order_id: "o1".to_string(),
            symbol: "AAPL".to_string(),
            qty: 10.0,
            price: 100.0,
            filled_at_utc: Utc::now(),
            side: Side::Buy,
        });
        let positions = b.get_positions().unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].qty, 10.0);

        let fills = b.list_fills_since(None).unwrap();
        assert_eq!(fills.len(), 1);
        let fills_after = b.list_fills_since(Some("f1")).unwrap();
        assert!(fills_after.is_empty());
    }

    #[test]
    fn close_position_rejects_when_flat() {
        let b = LockedPaperBroker::new(PaperBroker::new());
        let err = b.close_position("AAPL").unwrap_err();
        matches!(err, BrokerError::Api(_));
    }
}
