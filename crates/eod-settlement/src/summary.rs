//! Multi-account settlement summary.
//!
//! Runs the calculator once per account subset. A failure for one account is
//! recorded and logged; the remaining accounts still produce rows.

use eod_ledger::Micros;
use tracing::{error, info};

use crate::calculator::{compute_settlement, SettlementResult};
use crate::error::SettlementError;
use crate::types::{PositionTable, SettlementConfig, ACCOUNT_COLUMN};

/// One line of the summary table. There is no grand-total line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountSummaryRow {
    pub account_id: String,
    pub nfo_realized: Micros,
    pub nfo_settlement: Micros,
    pub bfo_realized: Micros,
    pub bfo_settlement: Micros,
    pub total_realized: Micros,
    pub total_settlement: Micros,
    pub grand_total: Micros,
}

impl AccountSummaryRow {
    pub fn from_result(account_id: &str, r: &SettlementResult) -> Self {
        Self {
            account_id: account_id.to_string(),
            nfo_realized: r.nfo.realized,
            nfo_settlement: r.nfo.settlement,
            bfo_realized: r.bfo.realized,
            bfo_settlement: r.bfo.settlement,
            total_realized: r.overall_realized,
            total_settlement: r.overall_settlement,
            grand_total: r.grand_total,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountFailure {
    pub account_id: String,
    pub error: SettlementError,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountSummary {
    /// In the order accounts were requested.
    pub rows: Vec<AccountSummaryRow>,
    pub failures: Vec<AccountFailure>,
    /// Accounts that had no rows in the dataset.
    pub empty_accounts: Vec<String>,
}

impl AccountSummary {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build the per-account summary.
///
/// `accounts` empty means "every account in the dataset, first appearance
/// order". Fails only when the dataset has no account column.
pub fn build_account_summary(
    table: &PositionTable,
    accounts: &[String],
    cfg: &SettlementConfig,
) -> Result<AccountSummary, SettlementError> {
    if !table.has_account_column() {
        return Err(SettlementError::MissingColumns(vec![
            ACCOUNT_COLUMN.to_string()
        ]));
    }

    let discovered;
    let accounts: &[String] = if accounts.is_empty() {
        discovered = table.distinct_accounts();
        &discovered
    } else {
        accounts
    };

    let mut out = AccountSummary::default();
    for account_id in accounts {
        match compute_settlement(table.rows_for_account(account_id), cfg) {
            Ok(Some(result)) => {
                out.rows
                    .push(AccountSummaryRow::from_result(account_id, &result));
            }
            Ok(None) => {
                info!(account = %account_id, "no position rows for account");
                out.empty_accounts.push(account_id.clone());
            }
            Err(e) => {
                error!(account = %account_id, error = %e, "settlement failed for account; skipping");
                out.failures.push(AccountFailure {
                    account_id: account_id.clone(),
                    error: e,
                });
            }
        }
    }

    Ok(out)
}
