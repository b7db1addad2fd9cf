//! Layered YAML configuration for the end-of-day reports.
//!
//! Files are merged left to right into one JSON tree, hashed over its
//! canonical form, and checked per report mode for keys nothing reads.

mod consumption;
mod layers;
mod typed;

pub use consumption::{
    consumed_pointers_for_mode, report_unused_keys, ReportMode, UnusedKeyPolicy, UnusedKeyReport,
};
pub use layers::{load_layered_yaml, load_layered_yaml_from_strings, sha256_hex, LoadedConfig};
pub use typed::{
    BfoSettlementConfig, EodConfig, NfoSettlementConfig, OrderbookConfig, ReportConfig,
    SettlementSection, SummaryConfig,
};
