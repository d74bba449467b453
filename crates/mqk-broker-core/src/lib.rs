//! mqk-broker-core
//!
//! The Broker Adapter Contract (§4.1): one capability interface every
//! broker implementation (paper, Alpaca, Kraken-style, NSE simulator)
//! satisfies identically. Callers (reconciliation, the execution gateway,
//! the scheduler, the ops query layer) hold a `Box<dyn BrokerAdapter>` or
//! generic `B: BrokerAdapter` and never match on a concrete broker type.
//!
//! Broker *selection* (which concrete adapter backs a given scope) is a
//! factory concern that lives one layer up, in `mqk-cli`'s `serve` wiring,
//! since that's the first crate in the dependency graph that can see every
//! concrete adapter (`mqk-broker-paper`, `mqk-broker-alpaca`, ...) without
//! creating a cycle back into this crate.

pub mod adapter;
pub mod dry_run;
pub mod types;

pub use adapter::BrokerAdapter;
pub use dry_run::DryRunGuard;
pub use types::{
    BrokerError, BrokerResult, Fill, MarketHours, OrderResult, OrderSide, OrderStatus, Position,
    TimeInForce,
};
