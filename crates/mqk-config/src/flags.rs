//! The global feature-flag set (§6 External Interfaces).
//!
//! These flags are read once at startup from the layered config and never
//! mutated at runtime; they gate whole subsystems rather than individual
//! decisions, so each one is a plain field rather than a dynamic lookup.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// When true, the execution gate logs what it would have done instead
    /// of submitting orders.
    #[serde(default)]
    pub dry_run: bool,

    /// Must be explicitly true, in addition to `dry_run = false`, before a
    /// live-mode scope is allowed to submit real orders. See
    /// `mqk_execution::gateway` for the enforcement point.
    #[serde(default)]
    pub enable_live_orders: bool,

    /// Enables the constitutional governance pipeline's scheduled runs.
    #[serde(default)]
    pub governance_enabled: bool,

    /// Enables the regime validator / drift detector ("Phase G").
    #[serde(default)]
    pub phase_g_enabled: bool,

    /// When true, Phase G runs and logs its verdicts but never itself
    /// forces a halt — it only advises.
    #[serde(default)]
    pub phase_g_dry_run: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            dry_run: true,
            enable_live_orders: false,
            governance_enabled: false,
            phase_g_enabled: false,
            phase_g_dry_run: true,
        }
    }
}

impl FeatureFlags {
    /// `true` if, given this flag set and a scope's liveness, the gateway
    /// is permitted to submit real broker orders at all.
    ///
    /// Live mode additionally requires `dry_run = false` *and*
    /// `enable_live_orders = true` — both, not either (§4.1 safety rule).
    pub fn live_orders_permitted(&self, scope_is_live: bool) -> bool {
        if !scope_is_live {
            // Paper scopes always submit to the paper/simulator adapter;
            // this flag set only gates *real* money movement.
            return true;
        }
        !self.dry_run && self.enable_live_orders
    }
}
