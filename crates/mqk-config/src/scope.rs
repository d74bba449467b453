//! Scope — the 4-tuple that namespaces every piece of persisted state.
//!
//! `(env, broker, market, region)` is fixed at process start from
//! configuration and never changes for the lifetime of the process. Its
//! slug form roots the entire persistence tree (`mqk_db::paths::ScopePaths`)
//! so that, e.g., a paper/alpaca/equities/us run never shares a single file
//! with a live/alpaca/equities/us run.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Trading environment. Only `paper` and `live` are meaningful — anything
/// else is a configuration error, not a third environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    Paper,
    Live,
}

impl Env {
    pub fn as_str(self) -> &'static str {
        match self {
            Env::Paper => "paper",
            Env::Live => "live",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub env: Env,
    pub broker: String,
    pub market: String,
    pub region: String,
}

impl Scope {
    pub fn new(env: Env, broker: impl Into<String>, market: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            env,
            broker: broker.into(),
            market: market.into(),
            region: region.into(),
        }
    }

    /// Deterministic, filesystem- and URL-safe slug: `<env>-<broker>-<market>-<region>`,
    /// lower-cased with non-alphanumeric characters collapsed to `-`.
    pub fn slug(&self) -> String {
        let raw = format!("{}-{}-{}-{}", self.env.as_str(), self.broker, self.market, self.region);
        slugify(&raw)
    }

    /// `true` if this scope trades against real money. Every live-mode
    /// safety gate (dry_run, enable_live_orders, credential presence)
    /// hinges on this.
    pub fn is_live(&self) -> bool {
        matches!(self.env, Env::Live)
    }

    /// `true` if this scope's market is crypto — used to pick the default
    /// emergency-drawdown threshold (§9 open question).
    pub fn is_crypto_market(&self) -> bool {
        self.market.eq_ignore_ascii_case("crypto")
    }
}

impl Scope {
    /// Build a scope from `MQK_ENV` / `MQK_BROKER` / `MQK_MARKET` /
    /// `MQK_REGION`. `MQK_BROKER`/`MQK_MARKET`/`MQK_REGION` default to
    /// `paper-alpaca-equities-us`'s components for dev ergonomics;
    /// `MQK_ENV` defaults to `paper` rather than `live` so an operator who
    /// forgets to set it never lands in a live scope by accident.
    pub fn from_env() -> Result<Self> {
        let env = match std::env::var("MQK_ENV").ok().as_deref() {
            None | Some("paper") => Env::Paper,
            Some("live") => Env::Live,
            Some(other) => bail!("MQK_ENV must be 'paper' or 'live', got '{other}'"),
        };
        let broker = std::env::var("MQK_BROKER").unwrap_or_else(|_| "alpaca".to_string());
        let market = std::env::var("MQK_MARKET").unwrap_or_else(|_| "equities".to_string());
        let region = std::env::var("MQK_REGION").unwrap_or_else(|_| "us".to_string());
        Ok(Scope::new(env, broker, market, region))
    }
}

fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}
