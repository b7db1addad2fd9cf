use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_currency_symbol() -> String {
    "₹".to_string()
}

fn default_exports_root() -> String {
    "exports".to_string()
}

fn default_status_filter() -> String {
    "COMPLETE".to_string()
}

fn default_timestamp_columns() -> Vec<String> {
    ["order_generated_time", "exchange_transact_time", "_date"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_underlying() -> String {
    "OPTIDXNIFTY".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_exports_root")]
    pub exports_root: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            exports_root: default_exports_root(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderbookConfig {
    /// Empty = every account in the file.
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default = "default_status_filter")]
    pub status_filter: String,
    #[serde(default = "default_timestamp_columns")]
    pub timestamp_columns: Vec<String>,
}

impl Default for OrderbookConfig {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            status_filter: default_status_filter(),
            timestamp_columns: default_timestamp_columns(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NfoSettlementConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `None` = the run date.
    #[serde(default)]
    pub expiry: Option<NaiveDate>,
    #[serde(default = "default_underlying")]
    pub underlying: String,
}

impl Default for NfoSettlementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expiry: None,
            underlying: default_underlying(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BfoSettlementConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub expiry: Option<NaiveDate>,
}

impl Default for BfoSettlementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expiry: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettlementSection {
    #[serde(default)]
    pub nfo: NfoSettlementConfig,
    #[serde(default)]
    pub bfo: BfoSettlementConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryConfig {
    /// Empty = every account in the positions file.
    #[serde(default)]
    pub accounts: Vec<String>,
}

/// Typed view of the merged config. Every key has a default.
///
/// Unknown keys inside a known section are rejected here; unknown top-level
/// sections are left to the unused-key report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EodConfig {
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub orderbook: OrderbookConfig,
    #[serde(default)]
    pub settlement: SettlementSection,
    #[serde(default)]
    pub summary: SummaryConfig,
}

impl EodConfig {
    pub fn from_json(v: &Value) -> Result<Self> {
        serde_json::from_value(v.clone()).context("config does not match the expected shape")
    }
}
