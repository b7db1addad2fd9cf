use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use uuid::Uuid;

mod money;
pub mod records;

pub use money::fmt_money;
pub use records::CsvRecord;

pub const MANIFEST_SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportManifest {
    pub schema_version: i32,
    pub report_id: Uuid,
    pub kind: String,
    pub config_hash: String,
    pub inputs: Vec<InputDigest>,
    pub created_at_utc: DateTime<Utc>,
    /// File names relative to the report directory, in write order.
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDigest {
    /// e.g. "orderbook", "positions", "nfo_bhav"
    pub role: String,
    pub path: String,
    pub sha256: String,
}

pub struct InitReportArgs<'a> {
    pub exports_root: &'a Path, // e.g. ./exports
    pub report_id: Uuid,
    pub kind: &'a str,
    pub config_hash: &'a str,
    pub inputs: &'a [(&'a str, &'a Path)],
}

/// An open `exports/<report_id>/` directory.
///
/// Files are written through the `write_*` methods; [`ReportDir::finish`]
/// writes `manifest.json` listing them.
#[derive(Debug)]
pub struct ReportDir {
    dir: PathBuf,
    manifest: ReportManifest,
}

pub fn init_report_dir(args: InitReportArgs<'_>) -> Result<ReportDir> {
    let mut inputs = Vec::with_capacity(args.inputs.len());
    for (role, path) in args.inputs {
        inputs.push(InputDigest {
            role: role.to_string(),
            path: path.display().to_string(),
            sha256: sha256_file(path)?,
        });
    }

    // exports/<report_id>/
    let dir = args.exports_root.join(args.report_id.to_string());
    fs::create_dir_all(&dir)
        .with_context(|| format!("create exports dir failed: {}", dir.display()))?;

    Ok(ReportDir {
        dir,
        manifest: ReportManifest {
            schema_version: MANIFEST_SCHEMA_VERSION,
            report_id: args.report_id,
            kind: args.kind.to_string(),
            config_hash: args.config_hash.to_string(),
            inputs,
            created_at_utc: Utc::now(),
            artifacts: Vec::new(),
        },
    })
}

impl ReportDir {
    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> &ReportManifest {
        &self.manifest
    }

    /// Header-first CSV of `rows`. An empty slice still writes the header.
    pub fn write_csv<T: CsvRecord>(&mut self, name: &str, rows: &[T]) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let mut w = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("create csv failed: {}", path.display()))?;
        w.write_record(T::HEADER)
            .with_context(|| format!("write csv header failed: {}", path.display()))?;
        for r in rows {
            w.serialize(r)
                .with_context(|| format!("write csv row failed: {}", path.display()))?;
        }
        w.flush()
            .with_context(|| format!("flush csv failed: {}", path.display()))?;
        self.record(name);
        Ok(path)
    }

    pub fn write_json<T: Serialize>(&mut self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value).context("serialize json failed")?;
        fs::write(&path, format!("{json}\n"))
            .with_context(|| format!("write json failed: {}", path.display()))?;
        self.record(name);
        Ok(path)
    }

    fn record(&mut self, name: &str) {
        if !self.manifest.artifacts.iter().any(|a| a == name) {
            self.manifest.artifacts.push(name.to_string());
        }
    }

    /// Write `manifest.json` and return its path.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.record("manifest.json");
        let manifest_path = self.dir.join("manifest.json");
        let json =
            serde_json::to_string_pretty(&self.manifest).context("serialize manifest failed")?;
        fs::write(&manifest_path, format!("{json}\n"))
            .with_context(|| format!("write manifest failed: {}", manifest_path.display()))?;
        Ok(manifest_path)
    }
}

/// Lowercase hex SHA-256 of a file's bytes.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut f = fs::File::open(path)
        .with_context(|| format!("open input for digest failed: {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read input for digest failed: {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
