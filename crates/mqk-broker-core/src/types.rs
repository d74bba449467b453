//! Shared wire-adjacent types for the Broker Adapter Contract (§4.1).
//!
//! These are the *normalized* domain shapes every adapter hands back to its
//! caller — already parsed out of whatever wire format the broker speaks,
//! timestamps already forced to UTC. `mqk_reconcile::Side` is reused rather
//! than inventing a second buy/sell enum; everything else here is new.

use chrono::{DateTime, NaiveDate, Utc};
use mqk_reconcile::Side;
use serde::{Deserialize, Serialize};

pub use mqk_reconcile::Side as OrderSide;

/// Order state machine (§4.3). Six states; transitions enforced by
/// `mqk_execution::lifecycle`, not by this crate — adapters only ever
/// *report* a status, they don't decide what's legal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Partial,
    Filled,
    Rejected,
    Cancelled,
    Expired,
}

impl OrderStatus {
    /// Terminal states never transition further (§4.3).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Rejected | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }
}

/// Time-in-force for a market order submission.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    Day,
    Gtc,
    Ioc,
}

/// Order Intent / Result (§3). `order_id` is the caller's (internal)
/// identifier; `broker_order_id` is assigned by the broker on acceptance
/// and is `None` until then.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: String,
    pub broker_order_id: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub qty: f64,
    pub status: OrderStatus,
    pub filled_qty: f64,
    pub filled_price: Option<f64>,
    pub submit_time: DateTime<Utc>,
    pub fill_time: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

/// A single broker fill (§3 Fill). Identity is `fill_id`; immutable once
/// observed. `filled_at_utc` is always UTC — adapters normalize
/// timezone-naive broker timestamps to UTC before constructing this.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub fill_id: String,
    pub order_id: String,
    pub symbol: String,
    pub qty: f64,
    pub price: f64,
    pub filled_at_utc: DateTime<Utc>,
    pub side: Side,
}

/// Current broker-reported position for one symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub qty: f64,
    pub avg_entry_price: f64,
}

/// One trading session's open/close window, in UTC, for a given date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketHours {
    pub date: NaiveDate,
    pub open_utc: Option<DateTime<Utc>>,
    pub close_utc: Option<DateTime<Utc>>,
    pub is_open: bool,
}

/// Error taxonomy for adapter calls (§7). Transient errors are retryable on
/// the next scheduler tick without adapter-side backoff bookkeeping leaking
/// to the caller; Api errors are fatal for the current call only.
#[derive(Clone, Debug, PartialEq)]
pub enum BrokerError {
    /// Network/HTTP-layer failure, or a broker rate-limit response that
    /// survived the adapter's own backoff/jitter retries.
    Transient(String),
    /// Broker rejected the call for a reason that retrying will not fix
    /// (auth, permission, malformed request, unknown symbol).
    Api(String),
    /// The call is not implemented by this adapter (e.g. `list_fills_since`
    /// on a non-reconcilable broker). Stub adapters fail loudly here
    /// rather than returning an empty/default result.
    Unsupported(&'static str),
    /// Startup-time configuration problem (missing credentials, live mode
    /// without the required safety flags).
    Configuration(String),
}

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerError::Transient(msg) => write!(f, "transient broker error: {msg}"),
            BrokerError::Api(msg) => write!(f, "broker API error: {msg}"),
            BrokerError::Unsupported(op) => write!(f, "unsupported broker operation: {op}"),
            BrokerError::Configuration(msg) => write!(f, "broker configuration error: {msg}"),
        }
    }
}

impl std::error::Error for BrokerError {}

pub type BrokerResult<T> = std::result::Result<T, BrokerError>;
