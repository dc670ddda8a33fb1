use crate::models::{TriggerRule, TriggerScope, VoteCounts};

/// Decides whether `rule` fires for the given counters.
///
/// Counters must already include the vote being processed: with a
/// threshold of 5 the fifth recorded vote is the one that fires.
pub fn evaluate(rule: &TriggerRule, subject_count: i64, global_count: i64) -> bool {
    // 0 is the "every vote" sentinel; negatives are treated the same so we
    // never take a modulus by a non-positive number.
    if rule.threshold <= 0 {
        return true;
    }

    let count = match rule.scope {
        TriggerScope::Subject => subject_count,
        TriggerScope::Global => global_count,
    };

    if rule.repeat {
        count % rule.threshold == 0
    } else {
        count == rule.threshold
    }
}

/// Every firing rule, in table order.
pub fn firing_rules(rules: &[TriggerRule], counts: VoteCounts) -> Vec<&TriggerRule> {
    rules
        .iter()
        .filter(|r| evaluate(r, counts.subject, counts.global))
        .collect()
}
