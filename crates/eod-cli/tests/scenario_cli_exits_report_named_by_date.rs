//! Scenario: `eod exits` over a grid log and leg exports
//!
//! GREEN when:
//! - repeated combined-SL triggers and square-off legs become exit reasons
//! - the CSV is named after the date in the grid log file name
//! - a missing required column fails the command

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

const GRID: &str = "\
Timestamp,Message,Option Portfolio
27-03-2025 10:00:00,Combined SL: 5000 hit,NF_STRADDLE
27-03-2025 10:00:02,Combined SL: 5000 hit,NF_STRADDLE
27-03-2025 11:00:00,order placed,NF_IRON
";

const LEGS: &str = "\
Portfolio Name,Exit Type,Exit Time,Status
NF_IRON,OnSqOffTime,15.15.00,completed
NF_IRON,OnSqOffTime,15.15.30,completed
";

#[test]
fn exits_report_lists_reasons_per_portfolio() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let grid = tmp.path().join("GridLog 27 Mar 2025.csv");
    let legs = tmp.path().join("legs.csv");
    fs::write(&grid, GRID)?;
    fs::write(&legs, LEGS)?;
    let exports = tmp.path().join("exports");

    let out = Command::cargo_bin("eod")?
        .current_dir(tmp.path())
        .arg("exits")
        .arg("--gridlog")
        .arg(&grid)
        .arg("--legs")
        .arg(&legs)
        .arg("--exports")
        .arg(&exports)
        .output()?;
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout)?;
    assert!(stdout.contains("portfolios=2"));
    assert!(stdout.contains("exit_report=completed portfolio of 27 mar.csv"));

    let dir = stdout
        .lines()
        .find_map(|l| l.strip_prefix("report_dir="))
        .map(|s| std::path::PathBuf::from(s.trim()))
        .expect("report_dir= line");
    let csv = fs::read_to_string(dir.join("completed portfolio of 27 mar.csv"))?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Option Portfolio,Reason,Time");
    assert_eq!(lines[1], "NF_IRON,OnSqOffTime,15.15.30");
    assert_eq!(lines[2], "NF_STRADDLE,Combined SL: 5000 hit,27-03-2025 10:00:02");

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("manifest.json"))?)?;
    assert_eq!(manifest["kind"], "EXITS");
    assert_eq!(manifest["inputs"][1]["role"], "legs_1");
    Ok(())
}

#[test]
fn grid_log_without_portfolio_column_fails() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let grid = tmp.path().join("grid.csv");
    let legs = tmp.path().join("legs.csv");
    fs::write(&grid, "Timestamp,Message\n10:00:00,hello\n")?;
    fs::write(&legs, LEGS)?;

    Command::cargo_bin("eod")?
        .current_dir(tmp.path())
        .args(["exits", "--no-artifacts", "--gridlog"])
        .arg(&grid)
        .arg("--legs")
        .arg(&legs)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Option Portfolio"));
    Ok(())
}
