//! Order Router: the crate-private boundary between the gateway and broker adapters.
//!
//! # Purpose
//! This module defines the thin, deterministic boundary through which all
//! order execution requests must pass. It isolates broker-specific adapter
//! implementations from the gate-enforcing `BrokerGateway`, which is the only
//! public surface that can reach a broker.
//!
//! # Why this boundary exists
//! - Separates order delivery (broker) from order generation (strategy/risk)
//! - Provides a single choke-point for logging, metrics, and pre-flight validation
//! - Enables pluggable broker adapters (paper, Alpaca, etc.) without gateway changes
//!
//! # Why `OrderRouter` stays `pub(crate)`
//! `OrderRouter` is never re-exported from `lib.rs`. The only way external
//! code reaches a broker adapter is through `BrokerGateway`'s gated methods,
//! which construct the [`BrokerInvokeToken`] that every `BrokerAdapter` method
//! requires. External code cannot name `OrderRouter`, and cannot construct a
//! token on its own — the tuple field is `pub(crate)`.

/// Convenience alias so all public items in this module can use `Result<T>`
/// without spelling out the error type everywhere.
type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Proof that a broker call originated inside `BrokerGateway`, past all
/// gate checks. The inner field is `pub(crate)` — only this crate can
/// construct one, so `BrokerAdapter` implementations in external crates
/// can receive a token but never manufacture one themselves.
#[derive(Debug)]
pub struct BrokerInvokeToken(pub(crate) ());

impl BrokerInvokeToken {
    pub(crate) fn new() -> Self {
        Self(())
    }
}

/// Broker-agnostic order submission request. `limit_price` is integer
/// micros (see [`crate::prices`]) — never a raw `f64`.
#[derive(Debug, Clone)]
pub struct BrokerSubmitRequest {
    pub order_id: String,
    pub symbol: String,
    pub quantity: i32,
    pub order_type: String,
    pub limit_price: Option<i64>,
    pub time_in_force: String,
}

/// Broker-agnostic order submission response.
#[derive(Debug, Clone)]
pub struct BrokerSubmitResponse {
    pub broker_order_id: String,
    pub submitted_at: u64,
    pub status: String,
}

/// Broker-agnostic order cancellation response.
#[derive(Debug, Clone)]
pub struct BrokerCancelResponse {
    pub broker_order_id: String,
    pub cancelled_at: u64,
    pub status: String,
}

/// Broker-agnostic order replacement request.
#[derive(Debug, Clone)]
pub struct BrokerReplaceRequest {
    pub broker_order_id: String,
    pub quantity: i32,
    pub limit_price: Option<i64>,
    pub time_in_force: String,
}

/// Broker-agnostic order replacement response.
#[derive(Debug, Clone)]
pub struct BrokerReplaceResponse {
    pub broker_order_id: String,
    pub replaced_at: u64,
    pub status: String,
}

/// Trait every broker adapter must implement (paper, Alpaca, stub, ...).
///
/// Every method takes a [`BrokerInvokeToken`] that only `BrokerGateway` can
/// construct. An implementation cannot be called directly by code that
/// hasn't passed through the gateway's gate checks.
pub trait BrokerAdapter {
    fn submit_order(&self, req: BrokerSubmitRequest, token: &BrokerInvokeToken) -> Result<BrokerSubmitResponse>;

    fn cancel_order(&self, order_id: &str, token: &BrokerInvokeToken) -> Result<BrokerCancelResponse>;

    fn replace_order(&self, req: BrokerReplaceRequest, token: &BrokerInvokeToken) -> Result<BrokerReplaceResponse>;
}

/// Deterministic, `pub(crate)` order router. The sole path to a broker
/// adapter; callers outside this crate cannot construct one.
pub(crate) struct OrderRouter<B: BrokerAdapter> {
    broker: B,
}

impl<B: BrokerAdapter> OrderRouter<B> {
    pub(crate) fn new(broker: B) -> Self {
        Self { broker }
    }

    pub(crate) fn route_submit(&self, req: BrokerSubmitRequest) -> Result<BrokerSubmitResponse> {
        self.broker.submit_order(req, &BrokerInvokeToken::new())
    }

    pub(crate) fn route_cancel(&self, broker_order_id: &str) -> Result<BrokerCancelResponse> {
        self.broker.cancel_order(broker_order_id, &BrokerInvokeToken::new())
    }

    pub(crate) fn route_replace(&self, req: BrokerReplaceRequest) -> Result<BrokerReplaceResponse> {
        self.broker.replace_order(req, &BrokerInvokeToken::new())
    }
}
