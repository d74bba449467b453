//! mqk-universe
//!
//! Universe Governance Pipeline (§4.6, component H): scores candidate
//! symbols across five weighted dimensions, proposes a change set,
//! guardrails it against hard bounds (size, cooldowns, open positions), and
//! persists the outcome. Discards the whole change set on any guardrail
//! violation — there is no partial universe update.

pub mod corporate_events;
pub mod guardrails;
pub mod persistence;
pub mod scoring;
pub mod types;

pub use corporate_events::{CorporateEventCalendar, InMemoryCalendar};
pub use guardrails::apply_guardrails;
pub use scoring::score_candidate;
pub use types::*;
