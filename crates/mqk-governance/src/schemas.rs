//! Strict output schemas for every governance agent (§4.6), plus the
//! human-authored approval record and the append-only event log entry.
//! Every field here round-trips through `governance/proposals/<id>/*.json`
//! and `governance/logs/governance_events.jsonl` unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Paper,
    Live,
}

/// The only four proposal shapes a proposing agent may emit. Nothing in
/// this enum can express `EXECUTE_TRADE`, `MODIFY_POSITION`, `BYPASS_RISK`,
/// `DISABLE_SAFETY`, or `OVERRIDE_RULE` — those are constitutionally
/// forbidden, and here that's enforced by the type system rather than a
/// runtime denylist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalType {
    AddSymbols,
    RemoveSymbols,
    AdjustRule,
    AdjustThreshold,
}

impl ProposalType {
    /// The `SCREAMING_SNAKE_CASE` name this variant round-trips as on disk —
    /// matches [`crate::constitution::ALLOWED_PROPOSAL_TYPE_NAMES`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddSymbols => "ADD_SYMBOLS",
            Self::RemoveSymbols => "REMOVE_SYMBOLS",
            Self::AdjustRule => "ADJUST_RULE",
            Self::AdjustThreshold => "ADJUST_THRESHOLD",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProposalEvidence {
    pub missed_signals: u32,
    #[serde(default)]
    pub scan_starvation: Vec<String>,
    #[serde(default)]
    pub performance_notes: String,
    #[serde(default)]
    pub dead_symbols: Vec<String>,
}

/// Agent 1 (Proposer) output. `non_binding` is always `true` — the only way
/// to build one is [`Proposal::new`], which hardcodes it — but the field
/// still round-trips on disk so the Auditor can re-check it defensively
/// against anything deserialized from outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub proposal_id: String,
    pub environment: Environment,
    pub proposal_type: ProposalType,
    pub symbols: Vec<String>,
    pub rationale: String,
    pub evidence: ProposalEvidence,
    #[serde(default)]
    pub risk_notes: String,
    pub confidence: f64,
    pub non_binding: bool,
    pub created_at_utc: DateTime<Utc>,
}

impl Proposal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        proposal_id: String,
        environment: Environment,
        proposal_type: ProposalType,
        symbols: Vec<String>,
        rationale: String,
        evidence: ProposalEvidence,
        risk_notes: String,
        confidence: f64,
        created_at_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            proposal_id,
            environment,
            proposal_type,
            symbols,
            rationale,
            evidence,
            risk_notes,
            confidence: confidence.clamp(0.0, 1.0),
            non_binding: true,
            created_at_utc,
        }
    }
}

/// The same shape as [`Proposal`], except `proposal_type` is a plain
/// string instead of [`ProposalType`]. A proposal built through
/// [`Proposal::new`] can never carry a forbidden type, but one read from
/// outside this crate's own Proposer — an externally-authored
/// `proposal.json`, or a proposal ingested over an API boundary — is not
/// bound by that guarantee. The Auditor's `proposal_type` check (§4.7)
/// runs against this form via
/// [`audit_raw`][crate::agents::auditor::audit_raw] so a value like
/// `"EXECUTE_TRADE"` is caught as a constitutional violation instead of
/// merely failing to deserialize.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawProposal {
    pub proposal_id: String,
    pub environment: Environment,
    pub proposal_type: String,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub evidence: ProposalEvidence,
    #[serde(default)]
    pub risk_notes: String,
    #[serde(default)]
    pub confidence: f64,
    pub non_binding: bool,
    pub created_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriticRecommendation {
    Proceed,
    Caution,
    Reject,
}

/// Agent 2 (Critic) output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criticism {
    pub proposal_id: String,
    pub criticisms: Vec<String>,
    #[serde(default)]
    pub counter_evidence: String,
    pub recommendation: CriticRecommendation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationSeverity {
    Critical,
    Major,
    Minor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstitutionalViolation {
    pub rule_name: String,
    pub violation: String,
    pub severity: ViolationSeverity,
}

/// Agent 3 (Auditor) output. Pure constitutional check — no market
/// analysis ever enters this stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    pub proposal_id: String,
    pub constitution_passed: bool,
    #[serde(default)]
    pub violations: Vec<ConstitutionalViolation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalRecommendation {
    Approve,
    Reject,
    Defer,
}

/// Agent 4 (Synthesizer) output — the human-readable decision packet. This
/// is the last artifact the pipeline itself produces; nothing downstream
/// of this struct is binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub proposal_id: String,
    pub summary: String,
    pub key_risks: Vec<String>,
    pub final_recommendation: FinalRecommendation,
    pub confidence: f64,
}

/// The separate, human-authored artifact required before any proposal is
/// actionable. Nothing in this crate writes one on the pipeline's own
/// authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub proposal_id: String,
    pub approved_at_utc: DateTime<Utc>,
    pub approved_by: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GovernanceEventType {
    GovernanceProposalCreated,
    GovernanceProposalCritiqued,
    GovernanceProposalAudited,
    GovernanceProposalSynthesized,
    GovernanceProposalApproved,
    GovernanceProposalRejected,
    GovernanceProposalExpired,
    GovernanceConstitutionViolation,
    GovernanceJobStarted,
    GovernanceJobCompleted,
    GovernanceJobFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceEvent {
    pub ts_utc: DateTime<Utc>,
    pub event_type: GovernanceEventType,
    pub proposal_id: Option<String>,
    pub environment: Option<Environment>,
    #[serde(default)]
    pub details: serde_json::Value,
}
