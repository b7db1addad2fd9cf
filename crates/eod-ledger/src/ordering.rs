//! Execution ordering policy.
//!
//! The matching engine consumes executions strictly in time order.  Exports
//! are not guaranteed to be sorted, and many fills share the same second, so
//! the canonical key is `(timestamp, seq)` where `seq` is the source row index.
//! Equal timestamps therefore keep their original input order.
//!
//! Grouping by instrument preserves the order in which each instrument first
//! appears in the input; reports list instruments in that order, never
//! alphabetically.

use std::collections::HashMap;

use crate::Execution;

/// Sort `executions` into canonical `(timestamp, seq)` order in place.
///
/// The sort is stable, so records that tie on both keys keep their relative
/// order as well.
pub fn sort_executions_canonical(executions: &mut [Execution]) {
    executions.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.seq.cmp(&b.seq))
    });
}

/// Split executions into per-instrument sequences.
///
/// Instruments are returned in order of first appearance; each sequence is
/// sorted canonically.
pub fn group_by_instrument(executions: &[Execution]) -> Vec<(String, Vec<Execution>)> {
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Execution>)> = Vec::new();

    for ex in executions {
        let idx = match slot.get(ex.instrument_key.as_str()) {
            Some(&i) => i,
            None => {
                groups.push((ex.instrument_key.clone(), Vec::new()));
                slot.insert(ex.instrument_key.as_str(), groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[idx].1.push(ex.clone());
    }

    for (_, seq) in groups.iter_mut() {
        sort_executions_canonical(seq);
    }
    groups
}
