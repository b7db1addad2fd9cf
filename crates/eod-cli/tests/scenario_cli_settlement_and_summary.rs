//! Scenario: `eod settlement` / `eod summary` over a positions export
//!
//! GREEN when:
//! - NFO and BFO rows are valued against their own bhavcopy
//! - an enabled segment without a bhavcopy fails before any report is written
//! - --no-nfo / --no-bfo switch a segment off without needing its file
//! - summary.csv has one row per account with the per-segment split

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const POSITIONS: &str = "\
UserID,Exchange,Symbol,Net Qty,Buy Avg Price,Sell Avg Price,Sell Qty,Buy Qty,Realized Profit,Unrealized Profit
7RA1RM61,NFO,NIFTY 27MAR25 CE 24500,75,100,120,75,150,0,0
7RA1RM61,BFO,SENSEX 27MAR25 CE 81000,-10,300,320,20,10,0,0
7RIK2014,NFO,NIFTY 27MAR25 PE 24000,0,50,60,50,50,0,0
7RIK2014,NSE,RELIANCE,5,2500,0,0,5,0,0
";

const NFO_BHAV: &str = "\
CONTRACT_D,SETTLEMENT
OPTIDXNIFTY27-MAR-2025CE24500,130
OPTIDXNIFTY03-APR-2025CE24500,999
";

const BFO_BHAV: &str = "\
Expiry Date,Series Code,Close Price
27 Mar 2025,SENSEX25MAR81000CE,310
";

struct Fixture {
    _tmp: tempfile::TempDir,
    root: PathBuf,
    positions: PathBuf,
    nfo: PathBuf,
    bfo: PathBuf,
}

fn fixture() -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    let write = |name: &str, body: &str| -> PathBuf {
        let p = root.join(name);
        fs::write(&p, body).unwrap();
        p
    };
    let positions = write("positions.csv", POSITIONS);
    let nfo = write("nfo_bhav.csv", NFO_BHAV);
    let bfo = write("bfo_bhav.csv", BFO_BHAV);
    Fixture {
        _tmp: tmp,
        root,
        positions,
        nfo,
        bfo,
    }
}

fn eod(f: &Fixture) -> Command {
    let mut cmd = Command::cargo_bin("eod").unwrap();
    cmd.current_dir(&f.root);
    cmd
}

fn with_bhav<'a>(cmd: &'a mut Command, f: &Fixture) -> &'a mut Command {
    cmd.arg("--nfo-bhav")
        .arg(&f.nfo)
        .arg("--bfo-bhav")
        .arg(&f.bfo)
        .args(["--nfo-expiry", "2025-03-27", "--bfo-expiry", "2025-03-27"])
}

fn report_dir(stdout: &str) -> PathBuf {
    stdout
        .lines()
        .find_map(|l| l.strip_prefix("report_dir="))
        .map(|s| PathBuf::from(s.trim()))
        .expect("report_dir= line")
}

#[test]
fn settlement_values_both_segments() -> anyhow::Result<()> {
    let f = fixture();
    let exports = f.root.join("exports");

    let mut cmd = eod(&f);
    cmd.arg("settlement").arg("--positions").arg(&f.positions);
    cmd.arg("--exports").arg(&exports);
    let out = with_bhav(&mut cmd, &f).output()?;
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout)?;

    // NFO: realized 1500 + 500, settlement 2250; BFO: realized 200, settlement 100
    assert!(stdout.contains("nfo_prices=1"));
    assert!(stdout.contains("₹4,550.00"));
    assert!(stdout.contains("unmatched segment=NFO instrument=24000PE account=7RIK2014"));

    let dir = report_dir(&stdout);
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("settlement.json"))?)?;
    assert_eq!(json["nfo"]["realized"], "2000.000000");
    assert_eq!(json["nfo"]["settlement"], "2250.000000");
    assert_eq!(json["bfo"]["total"], "300.000000");
    assert_eq!(json["grand_total"], "4550.000000");

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("manifest.json"))?)?;
    let roles: Vec<&str> = manifest["inputs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["positions", "nfo_bhav", "bfo_bhav"]);

    let valuations = fs::read_to_string(dir.join("valuations.csv"))?;
    assert!(valuations.contains("7RA1RM61,NFO,NIFTY 27MAR25 CE 24500,24500CE,75.000000,130.000000,1500.000000,2250.000000"));
    Ok(())
}

#[test]
fn enabled_segment_without_bhavcopy_fails_before_reading() -> anyhow::Result<()> {
    let f = fixture();
    let exports = f.root.join("exports");

    eod(&f)
        .arg("settlement")
        .arg("--positions")
        .arg(&f.positions)
        .arg("--exports")
        .arg(&exports)
        .arg("--nfo-bhav")
        .arg(&f.nfo)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--bfo-bhav"));

    assert!(!exports.exists());
    Ok(())
}

#[test]
fn disabled_segments_report_realized_only() -> anyhow::Result<()> {
    let f = fixture();

    eod(&f)
        .args(["settlement", "--no-artifacts", "--no-nfo", "--no-bfo", "--account", "7RA1RM61"])
        .arg("--positions")
        .arg(&f.positions)
        .assert()
        .success()
        // realized 1500 + 200, no settlement
        .stdout(predicate::str::contains("₹1,700.00"))
        .stdout(predicate::str::contains("unmatched").not());
    Ok(())
}

#[test]
fn summary_writes_one_row_per_account() -> anyhow::Result<()> {
    let f = fixture();
    let exports = f.root.join("exports");

    let mut cmd = eod(&f);
    cmd.arg("summary").arg("--positions").arg(&f.positions);
    cmd.arg("--exports").arg(&exports);
    cmd.args(["--account", "7RA1RM61", "--account", "7RIK2014", "--account", "GHOST"]);
    let out = with_bhav(&mut cmd, &f).output()?;
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout)?;

    assert!(stdout.contains("accounts_ok=2 accounts_failed=0 accounts_empty=1"));
    assert!(stdout.contains("no_data account=GHOST"));

    let dir = report_dir(&stdout);
    let summary = fs::read_to_string(dir.join("summary.csv"))?;
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(
        lines[0],
        "UserID,NFO Realized,NFO Settlement,BFO Realized,BFO Settlement,Total Realized,Total Settlement,Grand Total"
    );
    assert_eq!(
        lines[1],
        "7RA1RM61,1500.000000,2250.000000,200.000000,100.000000,1700.000000,2350.000000,4050.000000"
    );
    assert_eq!(
        lines[2],
        "7RIK2014,500.000000,0.000000,0.000000,0.000000,500.000000,0.000000,500.000000"
    );

    let failures = fs::read_to_string(dir.join("failures.csv"))?;
    assert!(failures.contains("GHOST,no_data,"));
    Ok(())
}

#[test]
fn summary_needs_an_account_column() -> anyhow::Result<()> {
    let f = fixture();
    let no_user = f.root.join("no_user.csv");
    let body: String = POSITIONS
        .lines()
        .map(|l| l.split_once(',').map(|(_, rest)| rest).unwrap_or(l))
        .collect::<Vec<_>>()
        .join("\n");
    fs::write(&no_user, body)?;

    eod(&f)
        .args(["summary", "--no-artifacts", "--no-nfo", "--no-bfo", "--positions"])
        .arg(Path::new(&no_user))
        .assert()
        .failure()
        .stderr(predicate::str::contains("UserID"));
    Ok(())
}
