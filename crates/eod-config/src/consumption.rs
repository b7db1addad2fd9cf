//! Which config keys each report reads, and what is left over.
//!
//! A key path is consumed when one of the mode's registered pointers is the
//! path itself or one of its ancestors, compared segment by segment:
//! `/settlement/nfo` covers `/settlement/nfo/expiry` but `/report/exports_root`
//! does not cover `/report/exports_root_old`. Arrays count as a single value,
//! so `summary.accounts: [..]` is reported as `/summary/accounts`; empty
//! objects hold no leaves.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    Pairs,
    Settlement,
    Summary,
    Exits,
}

impl ReportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportMode::Pairs => "PAIRS",
            ReportMode::Settlement => "SETTLEMENT",
            ReportMode::Summary => "SUMMARY",
            ReportMode::Exits => "EXITS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    pub mode: String,
    /// Registered pointers for the mode, sorted.
    pub consumed_prefixes: Vec<String>,
    /// Sorted, unique.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

const REPORT_KEYS: [&str; 2] = ["/report/currency_symbol", "/report/exports_root"];
const SETTLEMENT_KEYS: [&str; 2] = ["/settlement/nfo", "/settlement/bfo"];

/// Pointers the `eod` subcommand for `mode` reads. Keep in step with the CLI.
pub fn consumed_pointers_for_mode(mode: ReportMode) -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = match mode {
        ReportMode::Exits => vec!["/report/exports_root"],
        _ => REPORT_KEYS.to_vec(),
    };
    match mode {
        ReportMode::Pairs => keys.extend([
            "/orderbook/accounts",
            "/orderbook/status_filter",
            "/orderbook/timestamp_columns",
        ]),
        ReportMode::Settlement => keys.extend(SETTLEMENT_KEYS),
        ReportMode::Summary => {
            keys.extend(SETTLEMENT_KEYS);
            keys.push("/summary/accounts");
        }
        ReportMode::Exits => {}
    }
    keys
}

/// Leaves of `config_json` that `mode` never reads.
///
/// Under [`UnusedKeyPolicy::Fail`] a non-empty result is an error naming the
/// first keys; under `Warn` the report is returned for the caller to log.
pub fn report_unused_keys(
    mode: ReportMode,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let consumed: Vec<Vec<String>> = consumed_pointers_for_mode(mode)
        .into_iter()
        .map(split_pointer)
        .collect();

    let mut leaves = Vec::new();
    walk_leaves(config_json, &mut Vec::new(), &mut leaves);

    let mut unused: Vec<String> = leaves
        .iter()
        .filter(|leaf| !consumed.iter().any(|c| leaf.starts_with(c)))
        .map(|leaf| join_pointer(leaf))
        .collect();
    unused.sort();
    unused.dedup();

    let mut consumed_prefixes: Vec<String> = consumed.iter().map(|c| join_pointer(c)).collect();
    consumed_prefixes.sort();
    consumed_prefixes.dedup();

    let report = UnusedKeyReport {
        mode: mode.as_str().to_string(),
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        const SHOWN: usize = 12;
        let shown = report.unused_leaf_pointers.iter().take(SHOWN).cloned().collect::<Vec<_>>();
        let more = report.unused_leaf_pointers.len().saturating_sub(SHOWN);
        bail!(
            "CONFIG_UNUSED_KEYS (mode={}): {} key(s) not read by this report: {}{}",
            report.mode,
            report.unused_leaf_pointers.len(),
            shown.join(", "),
            if more > 0 { format!(" (+{more} more)") } else { String::new() }
        );
    }
    Ok(report)
}

fn walk_leaves(v: &Value, path: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
    match v {
        Value::Object(map) => {
            for (key, child) in map {
                path.push(key.clone());
                walk_leaves(child, path, out);
                path.pop();
            }
        }
        _ => out.push(path.clone()),
    }
}

/// RFC 6901 tokens of `pointer`, unescaped. Surrounding slashes are ignored.
fn split_pointer(pointer: &str) -> Vec<String> {
    pointer
        .trim()
        .trim_matches('/')
        .split('/')
        .filter(|t| !t.is_empty())
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn join_pointer(tokens: &[String]) -> String {
    if tokens.is_empty() {
        return "/".to_string();
    }
    tokens
        .iter()
        .map(|t| format!("/{}", t.replace('~', "~0").replace('/', "~1")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pointer_tokens_round_trip_escapes() {
        let tokens = split_pointer("/a~1b/c~0d/");
        assert_eq!(tokens, vec!["a/b".to_string(), "c~d".to_string()]);
        assert_eq!(join_pointer(&tokens), "/a~1b/c~0d");
    }

    #[test]
    fn arrays_are_single_leaves_and_empty_objects_vanish() {
        let mut leaves = Vec::new();
        walk_leaves(
            &json!({"summary": {"accounts": ["A", "B"]}, "misc": {}}),
            &mut Vec::new(),
            &mut leaves,
        );
        let mut ptrs: Vec<String> = leaves.iter().map(|l| join_pointer(l)).collect();
        ptrs.sort();
        assert_eq!(ptrs, vec!["/summary/accounts"]);
    }

    #[test]
    fn exits_reads_only_the_exports_root() {
        assert_eq!(consumed_pointers_for_mode(ReportMode::Exits), vec!["/report/exports_root"]);
        assert!(consumed_pointers_for_mode(ReportMode::Summary).contains(&"/summary/accounts"));
    }

    #[test]
    fn fail_message_truncates_long_lists() {
        let mut map = serde_json::Map::new();
        for i in 0..15 {
            map.insert(format!("k{i:02}"), json!(i));
        }
        let err = report_unused_keys(ReportMode::Exits, &Value::Object(map), UnusedKeyPolicy::Fail)
            .unwrap_err()
            .to_string();
        assert!(err.contains("15 key(s)"), "{err}");
        assert!(err.contains("(+3 more)"), "{err}");
        assert!(!err.contains("/k14"), "{err}");
    }
}
