//! mqk-execution
//!
//! Execution Realism & Scaling Gate (§4.3, §4.4).
//!
//! - Strategies output target positions (not orders); `engine` converts
//!   `(current_positions, targets) -> order intents` with pure, deterministic
//!   logic and no broker wiring.
//! - `model` prices entries/exits with time-safe slippage and a liquidity gate.
//! - `lifecycle` enforces the broker order-status transition table.
//! - `scaling` is the ordered, first-failure-wins Scaling Policy Engine.
//! - `gateway` + `order_router` are the single non-bypassable choke-point
//!   through which every broker operation must flow.
//! - `oms` tracks the richer broker-ack intermediate-state machine for a
//!   single live order, separate from the coarser `OrderStatus` surface.
//! - `prices` defines the integer-micros price representation used on the
//!   execution decision surface.

mod engine;
mod gateway;
mod id_map;
mod lifecycle;
mod model;
pub mod oms;
mod order_router;
mod prices;
mod reconcile_guard;
mod scaling;
mod types;

pub use engine::targets_to_order_intents;
pub use gateway::{
    intent_id_to_client_order_id, BrokerGateway, GateRefusal, IntegrityGate, OutboxClaimToken,
    ReconcileGate, RiskGate, UnknownOrder,
};
pub use id_map::BrokerOrderMap;
pub use lifecycle::{can_transition, IllegalTransition, OrderState};
pub use model::{
    apply_slippage, check_liquidity, compute_entry_price, compute_exit_price,
    compute_slippage_cost, DailyBar, SlippageCost, SlippageDirection,
};
pub use order_router::{
    BrokerAdapter, BrokerCancelResponse, BrokerInvokeToken, BrokerReplaceRequest,
    BrokerReplaceResponse, BrokerSubmitRequest, BrokerSubmitResponse,
};
pub use prices::{micros_to_price, price_to_micros, PricingError, MICROS_PER_UNIT};
pub use reconcile_guard::ReconcileFreshnessGuard;
pub use scaling::{
    evaluate as evaluate_scaling, ScalingContext, ScalingDecision, ScalingDecisionKind,
    ScalingPolicy, ScalingReasonCode, ScalingType,
};
pub use types::{ExecutionDecision, OrderIntent, Side, StrategyOutput, TargetPosition};

use std::collections::BTreeMap;

/// Canonical type for current positions, keyed by symbol.
/// Signed quantity: +long, -short.
pub type PositionBook = BTreeMap<String, i64>;

/// Helper to build a PositionBook with minimal boilerplate in tests/callers.
pub fn position_book<I, S>(items: I) -> PositionBook
where
    I: IntoIterator<Item = (S, i64)>,
    S: Into<String>,
{
    let mut book = PositionBook::new();
    for (sym, qty) in items {
        book.insert(sym.into(), qty);
    }
    book
}
