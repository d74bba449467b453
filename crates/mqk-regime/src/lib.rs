//! mqk-regime
//!
//! Regime Validation & Drift Detection (§4.5).
//!
//! Four-stage pipeline, each stage a pure function over its inputs:
//! - Stage 1 (`validator`): four 0-1 validation scores + a conservative
//!   verdict.
//! - Stage 2 (`drift`): strict five-condition AND logic; drift is only
//!   confirmed when every condition holds.
//! - Stage 3 (`proposal`): turns a confirmed drift into a `mqk-governance`
//!   `Proposal` of type `ADJUST_RULE`, via the shared proposal plumbing —
//!   no direct state mutation.
//! - Stage 4 (`guardrails`): sequential, first-failure-wins checks gating
//!   whether a regime change may actually be applied.

mod alignment;
pub mod drift;
pub mod guardrails;
pub mod persistence;
mod proposal;
mod validator;

pub mod types;

pub use alignment::{
    duration_percentile, regime_agreement_score, regime_distance, volatility_band,
    volatility_shift_detected,
};
pub use drift::{detect as detect_drift, min_dwell_hours};
pub use guardrails::check_proposal as check_guardrails;
pub use persistence::{read_run_state, read_run_state_or_init, read_runs, record_regime_change, RegimeRunRecord};
pub use proposal::drift_to_governance_proposal;
pub use types::*;
pub use validator::validate;
