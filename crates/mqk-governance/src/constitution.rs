//! Constitutional validation (§4.6). Pure functions over a [`Proposal`] —
//! no I/O, no market data. This is the one stage that can never be
//! configured away: the Auditor runs these checks unconditionally.

use std::sync::OnceLock;

use regex::Regex;

use crate::schemas::{Proposal, ProposalType, RawProposal};

/// A proposer built through [`Proposal::new`] can only ever construct one
/// of these four types — the enum makes the forbidden ones unrepresentable
/// on that path. But the Auditor's contract (§4.7) is to validate
/// `proposal_type` against the allowed/forbidden sets at runtime, because
/// a proposal the Auditor receives is not guaranteed to have come from this
/// crate's own Proposer: see [`validate_proposal_type_name`] and
/// [`audit_raw`][crate::agents::auditor::audit_raw] for the path that
/// checks a proposal whose `proposal_type` arrived as a plain string.
pub const ALLOWED_PROPOSAL_TYPES: [ProposalType; 4] = [
    ProposalType::AddSymbols,
    ProposalType::RemoveSymbols,
    ProposalType::AdjustRule,
    ProposalType::AdjustThreshold,
];

/// `proposal_type` names the Auditor must reject outright — these describe
/// the pipeline acting on its own authority instead of proposing.
pub const FORBIDDEN_PROPOSAL_TYPES: [&str; 5] = [
    "EXECUTE_TRADE",
    "MODIFY_POSITION",
    "BYPASS_RISK",
    "DISABLE_SAFETY",
    "OVERRIDE_RULE",
];

/// The only `proposal_type` names the Auditor may accept, spelled the way
/// they round-trip on disk (`ProposalType`'s `SCREAMING_SNAKE_CASE` form).
pub const ALLOWED_PROPOSAL_TYPE_NAMES: [&str; 4] =
    ["ADD_SYMBOLS", "REMOVE_SYMBOLS", "ADJUST_RULE", "ADJUST_THRESHOLD"];

pub const MAX_SYMBOLS_ADDED_PER_PROPOSAL: usize = 5;
pub const MAX_SYMBOLS_REMOVED_PER_PROPOSAL: usize = 3;
pub const MAX_PROPOSAL_SIZE: usize = 10;

/// Plain words that may never appear in rationale, risk notes, or evidence
/// performance notes, regardless of context. Checked as whole tokens, not
/// substrings, so "automate" doesn't trip on "auto". `auto-apply` is a
/// two-word phrase and is checked separately, below.
const FORBIDDEN_WORDS: [&str; 7] = [
    "execute",
    "bypass",
    "override",
    "force",
    "disable",
    "skip",
    "inject",
];

/// Validates a `proposal_type` given as a plain string rather than
/// [`ProposalType`] — the runtime check §4.7 describes, independent of
/// whatever enum a particular caller happens to use. Returns `None` when
/// the name is one of the four allowed types.
pub fn validate_proposal_type_name(proposal_type: &str) -> Option<String> {
    if FORBIDDEN_PROPOSAL_TYPES.contains(&proposal_type) {
        return Some(format!(
            "proposal_type '{proposal_type}' is forbidden by constitution"
        ));
    }
    if !ALLOWED_PROPOSAL_TYPE_NAMES.contains(&proposal_type) {
        return Some(format!(
            "proposal_type '{proposal_type}' is not an allowed type"
        ));
    }
    None
}

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9-]*$").expect("static regex is valid"))
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|tok| !tok.is_empty())
        .map(|tok| tok.to_lowercase())
        .collect()
}

/// Every symbol must match `^[A-Z][A-Z0-9-]*$` and there must be at least
/// one listed for `ADD_SYMBOLS`/`REMOVE_SYMBOLS` proposals. Operates on a
/// plain type name so it serves both [`Proposal`] and [`RawProposal`].
fn validate_symbols_named(proposal_type_name: &str, symbols: &[String]) -> Vec<String> {
    let mut violations = Vec::new();
    let needs_symbols = matches!(proposal_type_name, "ADD_SYMBOLS" | "REMOVE_SYMBOLS");

    if needs_symbols && symbols.is_empty() {
        violations.push(format!("{proposal_type_name} proposal lists no symbols"));
    }

    for symbol in symbols {
        if !symbol_pattern().is_match(symbol) {
            violations.push(format!("symbol '{symbol}' does not match the allowed pattern"));
        }
    }

    violations
}

/// `ADD_SYMBOLS` is capped at 5 per proposal, `REMOVE_SYMBOLS` at 3; no
/// proposal may touch more than 10 symbols regardless of type.
fn validate_symbol_count_by_type_named(proposal_type_name: &str, symbols: &[String]) -> Vec<String> {
    let mut violations = Vec::new();

    match proposal_type_name {
        "ADD_SYMBOLS" if symbols.len() > MAX_SYMBOLS_ADDED_PER_PROPOSAL => {
            violations.push(format!(
                "ADD_SYMBOLS proposes {} symbols, exceeding the per-proposal limit of {MAX_SYMBOLS_ADDED_PER_PROPOSAL}",
                symbols.len()
            ));
        }
        "REMOVE_SYMBOLS" if symbols.len() > MAX_SYMBOLS_REMOVED_PER_PROPOSAL => {
            violations.push(format!(
                "REMOVE_SYMBOLS proposes {} symbols, exceeding the per-proposal limit of {MAX_SYMBOLS_REMOVED_PER_PROPOSAL}",
                symbols.len()
            ));
        }
        _ => {}
    }

    if symbols.len() > MAX_PROPOSAL_SIZE {
        violations.push(format!(
            "proposal touches {} symbols, exceeding the absolute limit of {MAX_PROPOSAL_SIZE}",
            symbols.len()
        ));
    }

    violations
}

/// Scans rationale, risk notes, and evidence performance notes for
/// forbidden language, plus a dedicated check for "auto" immediately
/// followed by "apply" (however spelled), since that pairing specifically
/// describes what this pipeline must never become.
fn validate_no_forbidden_language_fields(fields: [(&str, &str); 3]) -> Vec<String> {
    let mut violations = Vec::new();

    for (field_name, text) in fields {
        let tokens = tokenize(text);
        for word in FORBIDDEN_WORDS {
            if tokens.iter().any(|tok| tok == word) {
                violations.push(format!("{field_name} contains forbidden word '{word}'"));
            }
        }

        let lowered = text.to_lowercase();
        if lowered.contains("auto-apply")
            || lowered.contains("autoapply")
            || lowered.contains("auto apply")
        {
            violations.push(format!("{field_name} describes auto-apply behavior, which this pipeline can never perform"));
        }
    }

    violations
}

/// Every symbol must match `^[A-Z][A-Z0-9-]*$` and there must be at least
/// one listed for `ADD_SYMBOLS`/`REMOVE_SYMBOLS` proposals.
pub fn validate_symbols(proposal: &Proposal) -> Vec<String> {
    validate_symbols_named(proposal.proposal_type.as_str(), &proposal.symbols)
}

/// `ADD_SYMBOLS` is capped at 5 per proposal, `REMOVE_SYMBOLS` at 3; no
/// proposal may touch more than 10 symbols regardless of type.
pub fn validate_symbol_count_by_type(proposal: &Proposal) -> Vec<String> {
    validate_symbol_count_by_type_named(proposal.proposal_type.as_str(), &proposal.symbols)
}

/// Scans rationale, risk notes, and evidence performance notes for
/// forbidden language (see [`validate_no_forbidden_language_fields`]).
pub fn validate_no_forbidden_language(proposal: &Proposal) -> Vec<String> {
    validate_no_forbidden_language_fields([
        ("rationale", &proposal.rationale),
        ("risk_notes", &proposal.risk_notes),
        ("evidence.performance_notes", &proposal.evidence.performance_notes),
    ])
}

/// Runs every constitutional check and accumulates all violations found —
/// the Auditor reports everything wrong with a proposal in one pass
/// rather than stopping at the first failure. `proposal_type` is checked
/// too, even though [`ProposalType`] already makes the forbidden names
/// unrepresentable on this path — belt and suspenders with
/// [`validate_proposal_raw`], which takes the same check on a proposal
/// whose `proposal_type` arrived as a plain string.
pub fn validate_proposal(proposal: &Proposal) -> Vec<String> {
    let mut violations = Vec::new();
    if let Some(v) = validate_proposal_type_name(proposal.proposal_type.as_str()) {
        violations.push(v);
    }
    violations.extend(validate_symbols(proposal));
    violations.extend(validate_symbol_count_by_type(proposal));
    violations.extend(validate_no_forbidden_language(proposal));

    if !proposal.non_binding {
        violations.push("proposal is not marked non_binding".to_string());
    }

    violations
}

/// The same constitutional pass as [`validate_proposal`], but over a
/// [`RawProposal`] whose `proposal_type` is a plain string rather than
/// [`ProposalType`] — the path a proposal deserialized from outside this
/// crate's own Proposer (an externally-authored `proposal.json`, or a
/// proposal ingested over an API boundary) must go through, since nothing
/// stops such a caller from supplying `"EXECUTE_TRADE"`.
pub fn validate_proposal_raw(proposal: &RawProposal) -> Vec<String> {
    let mut violations = Vec::new();
    if let Some(v) = validate_proposal_type_name(&proposal.proposal_type) {
        violations.push(v);
    }
    violations.extend(validate_symbols_named(&proposal.proposal_type, &proposal.symbols));
    violations.extend(validate_symbol_count_by_type_named(
        &proposal.proposal_type,
        &proposal.symbols,
    ));
    violations.extend(validate_no_forbidden_language_fields([
        ("rationale", &proposal.rationale),
        ("risk_notes", &proposal.risk_notes),
        ("evidence.performance_notes", &proposal.evidence.performance_notes),
    ]));

    if !proposal.non_binding {
        violations.push("proposal is not marked non_binding".to_string());
    }

    violations
}
