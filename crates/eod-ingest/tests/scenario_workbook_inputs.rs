//! Scenario: Excel workbooks read like their CSV exports
//!
//! GREEN when:
//! - an order book workbook yields the same executions and row counts as
//!   the CSV, including real date cells
//! - a grid log workbook yields the same entries as the CSV
//! - a summary workbook contributes one leg list per sheet named like
//!   "legs" (any case), in workbook order, skipping sheets without
//!   `Portfolio Name`

use std::path::Path;

use eod_ingest::{
    compute_exit_reasons, read_grid_log_path, read_orderbook_path, read_summary_legs_path,
    OrderBookOptions,
};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

/// Sheets given as comma-separated text; numeric cells are written as numbers.
fn write_workbook(path: &Path, sheets: &[(&str, &str)]) {
    let mut book = Workbook::new();
    for (name, body) in sheets {
        let ws = book.add_worksheet();
        ws.set_name(*name).unwrap();
        for (r, line) in body.lines().enumerate() {
            for (c, cell) in line.split(',').enumerate() {
                if cell.is_empty() {
                    continue;
                }
                match cell.parse::<f64>() {
                    Ok(n) => ws.write_number(r as u32, c as u16, n).unwrap(),
                    Err(_) => ws.write_string(r as u32, c as u16, cell).unwrap(),
                };
            }
        }
    }
    book.save(path).unwrap();
}

const BOOK: &str = "\
user_id,traiding_symbol,order_side,order_quantity,order_avg_price,order_status,order_generated_time
7RA1RM61,NIFTY 27MAR25 CE 24500,BUY,75,100,COMPLETE,27-03-2025 09:20:00
7RA1RM61,NIFTY 27MAR25 CE 24500,SELL,75,120.5,COMPLETE,27-03-2025 09:45:00 AM
7RA1RM61,NIFTY 27MAR25 CE 24500,SELL,75,500,REJECTED,27-03-2025 09:46:00
7RIK2014,NIFTY 27MAR25 PE 24000,SELL,50,80.5,COMPLETE,2025-03-27T10:01:00+05:30
";

#[test]
fn orderbook_workbook_matches_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("orderbook.csv");
    let xlsx_path = dir.path().join("orderbook.xlsx");
    std::fs::write(&csv_path, BOOK).unwrap();
    write_workbook(&xlsx_path, &[("Orderbook", BOOK)]);

    let from_csv = read_orderbook_path(&csv_path, &OrderBookOptions::default()).unwrap();
    let from_xlsx = read_orderbook_path(&xlsx_path, &OrderBookOptions::default()).unwrap();
    assert_eq!(from_csv.stats.rows_read, 4);
    assert_eq!(from_csv.stats.rows_ok, 3);
    assert_eq!(from_csv.stats.rows_filtered, 1);
    assert_eq!(from_xlsx, from_csv);
}

#[test]
fn orderbook_date_cells_become_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orderbook.xlsx");

    let mut book = Workbook::new();
    let ws = book.add_worksheet();
    let header = [
        "user_id",
        "trading_symbol",
        "order_side",
        "order_quantity",
        "order_avg_price",
        "order_status",
        "order_generated_time",
    ];
    for (c, h) in header.iter().enumerate() {
        ws.write_string(0, c as u16, *h).unwrap();
    }
    let when = ExcelDateTime::from_ymd(2025, 3, 27)
        .unwrap()
        .and_hms(9, 20, 15)
        .unwrap();
    let fmt = Format::new().set_num_format("dd/mm/yyyy hh:mm:ss");
    ws.write_string(1, 0, "A1").unwrap();
    ws.write_string(1, 1, "X").unwrap();
    ws.write_string(1, 2, "BUY").unwrap();
    ws.write_number(1, 3, 25.0).unwrap();
    ws.write_number(1, 4, 10.25).unwrap();
    ws.write_string(1, 5, "COMPLETE").unwrap();
    ws.write_datetime_with_format(1, 6, &when, &fmt).unwrap();
    book.save(&path).unwrap();

    let parsed = read_orderbook_path(&path, &OrderBookOptions::default()).unwrap();
    assert_eq!(parsed.stats.rows_ok, 1, "{:?}", parsed.stats);
    let e = &parsed.executions[0];
    assert_eq!(
        e.timestamp,
        chrono::NaiveDate::from_ymd_opt(2025, 3, 27)
            .unwrap()
            .and_hms_opt(9, 20, 15)
            .unwrap()
    );
    assert_eq!(e.price, eod_ledger::Micros::new(10_250_000));
}

const GRID: &str = "\
Timestamp,Message,Option Portfolio
27-03-2025 10:00:00,Combined SL: 5000 hit,NF_STRADDLE
27-03-2025 10:00:02,Combined SL: 5000 hit,NF_STRADDLE
27-03-2025 14:02:10,leg exited,NF_IRON
27-03-2025 11:00:00,order placed,BN_FLY
";

#[test]
fn grid_log_workbook_matches_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("GridLog 27 Mar 2025.csv");
    let xlsx_path = dir.path().join("GridLog 27 Mar 2025.xlsx");
    std::fs::write(&csv_path, GRID).unwrap();
    write_workbook(&xlsx_path, &[("GridLog", GRID)]);

    let from_csv = read_grid_log_path(&csv_path).unwrap();
    let from_xlsx = read_grid_log_path(&xlsx_path).unwrap();
    assert_eq!(from_csv.len(), 4);
    assert_eq!(from_xlsx, from_csv);
}

const LEGS_A: &str = "\
Portfolio Name,Exit Type,Exit Time,Status
NF_IRON,Target,14.02.10,completed
NF_IRON,SL,13.59.00,completed
";

const LEGS_B: &str = "\
Portfolio Name,Exit Type,Exit Time,Status
BN_FLY,OnSqOffTime,15.15.00,completed
BN_FLY,OnSqOffTime,15.15.30,completed
";

const NOT_LEGS: &str = "\
Portfolio Name,PNL
NF_IRON,1200
";

const BROKEN_LEGS: &str = "\
Name,Exit Type
NF_IRON,SL
";

#[test]
fn summary_workbook_reads_every_legs_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let summary = dir.path().join("Summary 27 Mar 2025.xlsx");
    write_workbook(
        &summary,
        &[
            ("Portfolios", NOT_LEGS),
            ("Legs", LEGS_A),
            ("Broken legs", BROKEN_LEGS),
            ("SELL LEGS", LEGS_B),
        ],
    );

    let leg_sheets = read_summary_legs_path(&summary).unwrap();
    assert_eq!(leg_sheets.len(), 2);
    assert_eq!(leg_sheets[0][0].portfolio, "NF_IRON");
    assert_eq!(leg_sheets[1][0].portfolio, "BN_FLY");
    assert_eq!(leg_sheets[1][1].exit_time.as_deref(), Some("15.15.30"));

    let grid_path = dir.path().join("grid.csv");
    std::fs::write(&grid_path, GRID).unwrap();
    let grid = read_grid_log_path(&grid_path).unwrap();
    let reasons = compute_exit_reasons(&grid, &leg_sheets).unwrap();
    let rows: Vec<(&str, &str, Option<&str>)> = reasons
        .iter()
        .map(|r| (r.portfolio.as_str(), r.reason.as_str(), r.time.as_deref()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("BN_FLY", "OnSqOffTime", Some("15.15.30")),
            ("NF_STRADDLE", "Combined SL: 5000 hit", Some("27-03-2025 10:00:02")),
            ("NF_IRON", "Target", Some("14.02.10")),
        ]
    );
}

#[test]
fn summary_without_legs_sheets_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let summary = dir.path().join("summary.xlsx");
    write_workbook(&summary, &[("Portfolios", NOT_LEGS)]);
    assert!(read_summary_legs_path(&summary).unwrap().is_empty());
}
