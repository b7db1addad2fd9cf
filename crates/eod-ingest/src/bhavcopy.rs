//! Exchange bhavcopy files -> [`SettlementPrices`] for one expiry.
//!
//! NFO: `CONTRACT_D` descriptors such as `OPTIDXNIFTY27-MAR-2025CE24500`,
//! priced by `SETTLEMENT`.
//! BFO: `Series Code` / `Expiry Date` (`27 Mar 2025`), priced by `Close Price`.
//!
//! Keys match the position-side key (`24500CE`). The first price seen for a
//! key is kept.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use eod_settlement::SettlementPrices;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::decimal::parse_micros;
use crate::error::IngestError;
use crate::table::{csv_reader, open, ColumnIndex};

pub const DEFAULT_NFO_UNDERLYING: &str = "OPTIDXNIFTY";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BhavStats {
    pub rows_read: usize,
    /// Rows matching the expiry (and underlying) filter with a usable price.
    pub rows_kept: usize,
    pub duplicate_keys: usize,
    /// Descriptor, date or price could not be parsed.
    pub rows_unparsed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BhavLoad {
    pub prices: SettlementPrices,
    pub stats: BhavStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfoFilter {
    pub expiry: NaiveDate,
    pub underlying: String,
}

impl NfoFilter {
    pub fn new(expiry: NaiveDate) -> Self {
        Self {
            expiry,
            underlying: DEFAULT_NFO_UNDERLYING.to_string(),
        }
    }
}

/// Parsed NFO contract descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDescriptor {
    pub underlying: String,
    pub expiry: NaiveDate,
    /// `<strike><CE|PE>`
    pub key: String,
}

pub struct ContractParser {
    date: Regex,
    strike: Regex,
}

impl ContractParser {
    pub fn new() -> Result<Self, IngestError> {
        Ok(Self {
            date: Regex::new(r"(\d{2}-[A-Z]{3}-\d{4})")?,
            strike: Regex::new(r"(PE|CE)(\d+)$")?,
        })
    }

    /// `None` unless the descriptor carries both a date and an option suffix.
    pub fn parse(&self, descriptor: &str) -> Option<ContractDescriptor> {
        let descriptor = descriptor.trim();
        let date = self.date.find(descriptor)?;
        let expiry = NaiveDate::parse_from_str(date.as_str(), "%d-%b-%Y").ok()?;
        let underlying = descriptor[..date.start()].to_string();
        let caps = self.strike.captures(descriptor)?;
        Some(ContractDescriptor {
            underlying,
            expiry,
            key: format!("{}{}", &caps[2], &caps[1]),
        })
    }
}

/// Last seven characters of a BFO series code.
pub fn bfo_series_key(series_code: &str) -> String {
    let s = series_code.trim();
    let chars: Vec<char> = s.chars().collect();
    chars[chars.len().saturating_sub(7)..].iter().collect()
}

pub fn read_nfo_bhavcopy_path(path: &Path, filter: &NfoFilter) -> Result<BhavLoad, IngestError> {
    let load = read_nfo_bhavcopy(open(path)?, filter)?;
    log_load("NFO", path, &load);
    Ok(load)
}

pub fn read_nfo_bhavcopy<R: Read>(src: R, filter: &NfoFilter) -> Result<BhavLoad, IngestError> {
    let parser = ContractParser::new()?;
    let mut rdr = csv_reader(src);
    let cols = ColumnIndex::from_headers(rdr.headers()?);
    cols.require(&["CONTRACT_D", "SETTLEMENT"])?;

    let mut prices = SettlementPrices::new();
    let mut stats = BhavStats::default();

    for record in rdr.records() {
        let record = record?;
        stats.rows_read += 1;

        let Some(contract) = cols.get(&record, "CONTRACT_D").and_then(|d| parser.parse(d)) else {
            stats.rows_unparsed += 1;
            continue;
        };
        if contract.expiry != filter.expiry || contract.underlying != filter.underlying {
            continue;
        }
        let Some(px) = cols
            .get(&record, "SETTLEMENT")
            .and_then(|s| parse_micros(s).ok())
        else {
            stats.rows_unparsed += 1;
            continue;
        };

        stats.rows_kept += 1;
        if !prices.insert_first(contract.key.clone(), px) {
            debug!(key = %contract.key, "duplicate NFO settlement key; keeping first");
            stats.duplicate_keys += 1;
        }
    }

    Ok(BhavLoad { prices, stats })
}

pub fn read_bfo_bhavcopy_path(path: &Path, expiry: NaiveDate) -> Result<BhavLoad, IngestError> {
    let load = read_bfo_bhavcopy(open(path)?, expiry)?;
    log_load("BFO", path, &load);
    Ok(load)
}

pub fn read_bfo_bhavcopy<R: Read>(src: R, expiry: NaiveDate) -> Result<BhavLoad, IngestError> {
    let mut rdr = csv_reader(src);
    let cols = ColumnIndex::from_headers(rdr.headers()?);
    cols.require(&["Expiry Date", "Series Code", "Close Price"])?;

    let mut prices = SettlementPrices::new();
    let mut stats = BhavStats::default();

    for record in rdr.records() {
        let record = record?;
        stats.rows_read += 1;

        let Some(row_expiry) = cols
            .get(&record, "Expiry Date")
            .and_then(|s| NaiveDate::parse_from_str(s, "%d %b %Y").ok())
        else {
            stats.rows_unparsed += 1;
            continue;
        };
        if row_expiry != expiry {
            continue;
        }
        let Some(series) = cols.get_nonempty(&record, "Series Code") else {
            stats.rows_unparsed += 1;
            continue;
        };
        let Some(px) = cols
            .get(&record, "Close Price")
            .and_then(|s| parse_micros(s).ok())
        else {
            stats.rows_unparsed += 1;
            continue;
        };

        stats.rows_kept += 1;
        let key = bfo_series_key(series);
        if !prices.insert_first(key.clone(), px) {
            debug!(%key, "duplicate BFO settlement key; keeping first");
            stats.duplicate_keys += 1;
        }
    }

    Ok(BhavLoad { prices, stats })
}

fn log_load(segment: &str, path: &Path, load: &BhavLoad) {
    info!(
        segment,
        path = %path.display(),
        rows_read = load.stats.rows_read,
        rows_kept = load.stats.rows_kept,
        keys = load.prices.len(),
        "bhavcopy loaded"
    );
    if load.prices.is_empty() {
        warn!(segment, path = %path.display(), "bhavcopy has no prices for the requested expiry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eod_ledger::Micros;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn contract_descriptor_splits_into_parts() {
        let p = ContractParser::new().unwrap();
        let c = p.parse("OPTIDXNIFTY27-MAR-2025CE24500").unwrap();
        assert_eq!(c.underlying, "OPTIDXNIFTY");
        assert_eq!(c.expiry, d(2025, 3, 27));
        assert_eq!(c.key, "24500CE");

        assert!(p.parse("FUTIDXNIFTY27-MAR-2025").is_none());
        assert!(p.parse("garbage").is_none());
    }

    #[test]
    fn nfo_filters_expiry_and_underlying() {
        let csv = "CONTRACT_D,SETTLEMENT\n\
                   OPTIDXNIFTY27-MAR-2025CE24500,130.5\n\
                   OPTIDXNIFTY03-APR-2025CE24500,150\n\
                   OPTIDXBANKNIFTY27-MAR-2025CE24500,999\n\
                   OPTIDXNIFTY27-MAR-2025PE24500,20\n\
                   OPTIDXNIFTY27-MAR-2025CE24500,131\n\
                   bad,1\n";
        let load = read_nfo_bhavcopy(csv.as_bytes(), &NfoFilter::new(d(2025, 3, 27))).unwrap();
        assert_eq!(load.prices.len(), 2);
        assert_eq!(load.prices.get("24500CE"), Some(Micros::new(130_500_000)));
        assert_eq!(load.prices.get("24500PE"), Some(Micros::from_units(20)));
        assert_eq!(load.stats.duplicate_keys, 1);
        assert_eq!(load.stats.rows_unparsed, 1);
        assert_eq!(load.stats.rows_read, 6);
    }

    #[test]
    fn bfo_keys_on_series_code_suffix() {
        let csv = "Series Code,Expiry Date,Close Price\n\
                   SENSEX25MAR81000CE,27 Mar 2025,310\n\
                   SENSEX25APR81000CE,03 Apr 2025,400\n\
                   SENSEX25MAR81000PE,27 Mar 2025,12.75\n";
        let load = read_bfo_bhavcopy(csv.as_bytes(), d(2025, 3, 27)).unwrap();
        assert_eq!(load.prices.get("81000CE"), Some(Micros::from_units(310)));
        assert_eq!(load.prices.get("81000PE"), Some(Micros::new(12_750_000)));
        assert_eq!(load.stats.rows_kept, 2);
    }

    #[test]
    fn missing_bhav_columns_are_named() {
        let err = read_bfo_bhavcopy("Series Code\nX\n".as_bytes(), d(2025, 3, 27)).unwrap_err();
        match err {
            IngestError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["Expiry Date".to_string(), "Close Price".to_string()])
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }
}
