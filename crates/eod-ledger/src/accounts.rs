//! Per-account FIFO pipeline: filter → match → aggregate, once per account.

use crate::matching::{match_executions, MatchReport};
use crate::pivot::{aggregate_pairs, PivotReport};
use crate::Execution;

/// What one account's FIFO run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountPairOutcome {
    /// The account has no executions in the batch.
    NoExecutions,
    /// Executions exist but none closed against each other; only open lots.
    NoCompletedTransitions { matches: MatchReport },
    /// At least one pair was realized.
    Completed {
        matches: MatchReport,
        pivot: PivotReport,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountPairReport {
    pub account_id: String,
    pub outcome: AccountPairOutcome,
}

/// Run the FIFO pipeline over one account's executions.
pub fn pair_report_for_account(executions: &[Execution], account_id: &str) -> AccountPairReport {
    let subset: Vec<Execution> = executions
        .iter()
        .filter(|e| e.account_id == account_id)
        .cloned()
        .collect();

    let outcome = if subset.is_empty() {
        AccountPairOutcome::NoExecutions
    } else {
        let matches = match_executions(&subset);
        match aggregate_pairs(matches.pairs()) {
            Some(pivot) => AccountPairOutcome::Completed { matches, pivot },
            None => AccountPairOutcome::NoCompletedTransitions { matches },
        }
    };

    AccountPairReport {
        account_id: account_id.to_string(),
        outcome,
    }
}

/// Run [`pair_report_for_account`] for each account, in the order given.
pub fn pair_reports_by_account(
    executions: &[Execution],
    accounts: &[String],
) -> Vec<AccountPairReport> {
    accounts
        .iter()
        .map(|a| pair_report_for_account(executions, a))
        .collect()
}

/// Distinct account ids in order of first appearance.
pub fn distinct_accounts(executions: &[Execution]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for e in executions {
        if !out.iter().any(|a| a == &e.account_id) {
            out.push(e.account_id.clone());
        }
    }
    out
}
