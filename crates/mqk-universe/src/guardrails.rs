//! Universe guardrails (§4.6): the hard bounds a proposed [`ChangeSet`]
//! must clear before it is applied. Any single violation discards the
//! *entire* change set for the cycle — there is no partial application,
//! matching the drift detector's all-or-nothing posture in `mqk-regime`.

use chrono::{DateTime, Utc};

use crate::types::{ChangeSet, Cooldowns, GuardrailContext, GuardrailResult, GuardrailViolation};

pub const MAX_ADDITIONS_PER_CYCLE: usize = 3;
pub const MAX_REMOVALS_PER_CYCLE: usize = 3;
pub const MIN_UNIVERSE_SIZE: usize = 10;
pub const MAX_UNIVERSE_SIZE: usize = 50;
pub const COOLDOWN_DAYS_AFTER_REMOVE: i64 = 30;

pub fn apply_guardrails(
    current_universe: &[String],
    change_set: &ChangeSet,
    ctx: &GuardrailContext,
    cooldowns: &Cooldowns,
    now: DateTime<Utc>,
) -> GuardrailResult {
    let mut violations = Vec::new();

    if change_set.additions.len() > MAX_ADDITIONS_PER_CYCLE {
        violations.push(GuardrailViolation {
            rule: "max_additions_per_cycle",
            detail: format!(
                "{} additions proposed, max is {}",
                change_set.additions.len(),
                MAX_ADDITIONS_PER_CYCLE
            ),
        });
    }

    if change_set.removals.len() > MAX_REMOVALS_PER_CYCLE {
        violations.push(GuardrailViolation {
            rule: "max_removals_per_cycle",
            detail: format!(
                "{} removals proposed, max is {}",
                change_set.removals.len(),
                MAX_REMOVALS_PER_CYCLE
            ),
        });
    }

    for symbol in &change_set.removals {
        if ctx.symbols_with_open_positions.iter().any(|s| s == symbol) {
            violations.push(GuardrailViolation {
                rule: "open_position_blocks_removal",
                detail: format!("{symbol} has an open position and cannot be removed"),
            });
        }
    }

    for symbol in &change_set.additions {
        if cooldowns.is_cooling_down(symbol, now, COOLDOWN_DAYS_AFTER_REMOVE) {
            violations.push(GuardrailViolation {
                rule: "cooldown_blocks_readd",
                detail: format!(
                    "{symbol} was removed within the last {COOLDOWN_DAYS_AFTER_REMOVE} days"
                ),
            });
        }
        if current_universe.iter().any(|s| s == symbol) {
            violations.push(GuardrailViolation {
                rule: "duplicate_addition",
                detail: format!("{symbol} is already in the active universe"),
            });
        }
    }

    for symbol in &change_set.removals {
        if !current_universe.iter().any(|s| s == symbol) {
            violations.push(GuardrailViolation {
                rule: "removal_not_in_universe",
                detail: format!("{symbol} is not in the active universe"),
            });
        }
    }

    let resulting_size = current_universe.len() + change_set.additions.len()
        - change_set
            .removals
            .iter()
            .filter(|s| current_universe.iter().any(|u| &u == s))
            .count();

    if resulting_size < MIN_UNIVERSE_SIZE {
        violations.push(GuardrailViolation {
            rule: "min_universe_size",
            detail: format!("resulting size {resulting_size} is below minimum {MIN_UNIVERSE_SIZE}"),
        });
    }
    if resulting_size > MAX_UNIVERSE_SIZE {
        violations.push(GuardrailViolation {
            rule: "max_universe_size",
            detail: format!("resulting size {resulting_size} exceeds maximum {MAX_UNIVERSE_SIZE}"),
        });
    }

    if violations.is_empty() {
        let mut resulting_universe: Vec<String> = current_universe
            .iter()
            .filter(|s| !change_set.removals.contains(s))
            .cloned()
            .collect();
        resulting_universe.extend(change_set.additions.iter().cloned());
        GuardrailResult {
            accepted: true,
            resulting_universe,
            violations,
        }
    } else {
        GuardrailResult {
            accepted: false,
            resulting_universe: current_universe.to_vec(),
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clean_change_set_is_accepted_and_applied() {
        let current = universe(&[
            "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L",
        ]);
        let change_set = ChangeSet {
            additions: vec!["NEW".to_string()],
            removals: vec!["A".to_string()],
        };
        let result = apply_guardrails(
            &current,
            &change_set,
            &GuardrailContext::default(),
            &Cooldowns::default(),
            Utc::now(),
        );
        assert!(result.accepted);
        assert!(result.violations.is_empty());
        assert!(result.resulting_universe.contains(&"NEW".to_string()));
        assert!(!result.resulting_universe.contains(&"A".to_string()));
    }

    #[test]
    fn too_many_additions_discards_entire_change_set() {
        let current = universe(&["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"]);
        let change_set = ChangeSet {
            additions: vec!["W".into(), "X".into(), "Y".into(), "Z".into()],
            removals: Vec::new(),
        };
        let result = apply_guardrails(
            &current,
            &change_set,
            &GuardrailContext::default(),
            &Cooldowns::default(),
            Utc::now(),
        );
        assert!(!result.accepted);
        assert_eq!(result.resulting_universe, current);
        assert!(result.violations.iter().any(|v| v.rule == "max_additions_per_cycle"));
    }

    #[test]
    fn removing_symbol_with_open_position_is_blocked() {
        let current = universe(&["A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K"]);
        let change_set = ChangeSet {
            additions: Vec::new(),
            removals: vec!["A".to_string()],
        };
        let ctx = GuardrailContext {
            symbols_with_open_positions: vec!["A".to_string()],
        };
        let result = apply_guardrails(&current, &change_set, &ctx, &Cooldowns::default(), Utc::now());
        assert!(!result.accepted);
        assert!(result.violations.iter().any(|v| v.rule == "open_position_blocks_removal"));
    }

    #[test]
    fn re_adding_a_symbol_during_cooldown_is_blocked() {
        let current = universe(&["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"]);
        let now = Utc::now();
        let mut cooldowns = Cooldowns::default();
        cooldowns.record_removal("NEWBIE", now - chrono::Duration::days(5));
        let change_set = ChangeSet {
            additions: vec!["NEWBIE".to_string()],
            removals: Vec::new(),
        };
        let result = apply_guardrails(&current, &change_set, &GuardrailContext::default(), &cooldowns, now);
        assert!(!result.accepted);
        assert!(result.violations.iter().any(|v| v.rule == "cooldown_blocks_readd"));
    }

    #[test]
    fn cooldown_expires_after_window() {
        let current = universe(&["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"]);
        let now = Utc::now();
        let mut cooldowns = Cooldowns::default();
        cooldowns.record_removal("OLDTIMER", now - chrono::Duration::days(31));
        let change_set = ChangeSet {
            additions: vec!["OLDTIMER".to_string()],
            removals: Vec::new(),
        };
        let result = apply_guardrails(&current, &change_set, &GuardrailContext::default(), &cooldowns, now);
        assert!(result.accepted);
    }

    #[test]
    fn shrinking_below_minimum_size_is_blocked() {
        let current = universe(&["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"]);
        let change_set = ChangeSet {
            additions: Vec::new(),
            removals: vec!["A".into(), "B".into(), "C".into()],
        };
        let result = apply_guardrails(
            &current,
            &change_set,
            &GuardrailContext::default(),
            &Cooldowns::default(),
            Utc::now(),
        );
        assert!(!result.accepted);
        assert!(result.violations.iter().any(|v| v.rule == "min_universe_size"));
    }

    #[test]
    fn empty_change_set_is_trivially_accepted() {
        let current = universe(&["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"]);
        let result = apply_guardrails(
            &current,
            &ChangeSet::default(),
            &GuardrailContext::default(),
            &Cooldowns::default(),
            Utc::now(),
        );
        assert!(result.accepted);
        assert_eq!(result.resulting_universe, current);
    }
}
