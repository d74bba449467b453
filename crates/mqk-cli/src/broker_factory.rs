//! Broker selection: which concrete `BrokerAdapter` backs a scope.
//!
//! This lives here rather than in `mqk-broker-core` because picking among
//! `mqk-broker-paper`/`mqk-broker-alpaca` needs to depend on both, and both
//! already depend on `mqk-broker-core` — putting the factory there would
//! be a cycle. `mqk-cli` is the first crate up the graph that can see
//! every concrete adapter.

use anyhow::{bail, Context, Result};
use mqk_broker_alpaca::{AlpacaBroker, AlpacaConfig};
use mqk_broker_core::{BrokerAdapter, DryRunGuard};
use mqk_broker_paper::{LockedPaperBroker, PaperBroker};
use mqk_config::{FeatureFlags, ResolvedSecrets, Scope};

/// Builds the adapter named by `scope.broker`, wrapped in a `DryRunGuard`
/// gated on `flags.live_orders_permitted(scope.is_live())`. The guard
/// wraps every adapter uniformly, including paper — a paper scope is
/// always permitted to submit, so the guard is a no-op there, but wrapping
/// it anyway means callers never need to special-case "is this the paper
/// adapter" to decide whether the safety gate applies.
pub fn broker_for_scope(
    scope: &Scope,
    secrets: &ResolvedSecrets,
    flags: &FeatureFlags,
) -> Result<Box<dyn BrokerAdapter>> {
    let live_orders_permitted = flags.live_orders_permitted(scope.is_live());

    match scope.broker.as_str() {
        "paper" | "alpaca-paper" => {
            let paper = LockedPaperBroker::new(PaperBroker::new());
            Ok(Box::new(DryRunGuard::new(paper, live_orders_permitted)))
        }
        "alpaca" => {
            let cfg = AlpacaConfig {
                api_key: secrets
                    .broker_api_key
                    .clone()
                    .context("MQK_BROKER_API_KEY is required for the alpaca adapter")?,
                api_secret: secrets
                    .broker_api_secret
                    .clone()
                    .context("MQK_BROKER_API_SECRET is required for the alpaca adapter")?,
                paper: !scope.is_live(),
                dry_run: flags.dry_run,
                enable_live_orders: flags.enable_live_orders,
                base_url: None,
            };
            let broker = AlpacaBroker::new(cfg).map_err(|e| anyhow::anyhow!("{e}"))?;
            Ok(Box::new(DryRunGuard::new(broker, live_orders_permitted)))
        }
        other => bail!("unknown broker '{other}' for scope {scope:?}"),
    }
}
