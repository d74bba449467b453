//! mqk-governance
//!
//! Constitutional Governance Pipeline (§4.6): a sequential four-agent flow
//! of pure functions — Proposer → Critic → Auditor → Synthesizer — with no
//! shared mutable agent state and no agent runtime. Every artifact is
//! immutable once written; the pipeline itself never decides anything
//! binding.
//!
//! A proposal becomes actionable **iff and only iff** a separate,
//! human-authored `approval.json` exists next to it (see [`persistence`]).
//! Nothing in this crate ever writes one.

pub mod agents;
pub mod constitution;
pub mod persistence;
pub mod schemas;

pub use agents::auditor::{audit, audit_raw};
pub use agents::critic::{critique, critique_raw, CritiqueContext};
pub use agents::proposer::{generate_proposal, ProposalInputs};
pub use agents::synthesizer::{synthesize, synthesize_raw};
pub use schemas::*;
