//! Command handler modules for the `eod` binary.
//!
//! Shared config/exports plumbing lives here; report logic lives in the
//! submodules.

pub mod exits;
pub mod pairs;
pub mod settlement;

use anyhow::{Context, Result};
use eod_artifacts::{init_report_dir, InitReportArgs, ReportDir};
use eod_config::{EodConfig, LoadedConfig, ReportMode, UnusedKeyPolicy};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Everything a report command needs besides its own inputs.
pub struct ReportContext {
    pub mode: ReportMode,
    pub loaded: LoadedConfig,
    pub cfg: EodConfig,
    pub exports_root: PathBuf,
    pub write_artifacts: bool,
}

impl ReportContext {
    /// Merge `config_paths`, run the unused-key guard for `mode`, and resolve
    /// the exports root (`--exports` wins over `report.exports_root`).
    pub fn load(
        config_paths: &[PathBuf],
        mode: ReportMode,
        policy: UnusedKeyPolicy,
        exports_override: Option<PathBuf>,
        write_artifacts: bool,
    ) -> Result<Self> {
        let loaded = eod_config::load_layered_yaml(config_paths)?;

        let unused = eod_config::report_unused_keys(mode, &loaded.config_json, policy)?;
        for p in &unused.unused_leaf_pointers {
            warn!(mode = mode.as_str(), pointer = %p, "config key not read by this report");
        }

        let cfg = loaded.typed()?;
        let exports_root =
            exports_override.unwrap_or_else(|| PathBuf::from(&cfg.report.exports_root));

        info!(
            mode = mode.as_str(),
            config_hash = %loaded.config_hash,
            layers = config_paths.len(),
            "config loaded"
        );

        Ok(Self {
            mode,
            loaded,
            cfg,
            exports_root,
            write_artifacts,
        })
    }

    pub fn currency(&self) -> &str {
        &self.cfg.report.currency_symbol
    }

    /// Open `exports/<report_id>/` for this report, or `None` under
    /// `--no-artifacts`.
    pub fn open_report(&self, inputs: &[(&str, &Path)]) -> Result<Option<ReportDir>> {
        if !self.write_artifacts {
            return Ok(None);
        }
        let report_id = Uuid::new_v4();
        let dir = init_report_dir(InitReportArgs {
            exports_root: &self.exports_root,
            report_id,
            kind: self.mode.as_str(),
            config_hash: &self.loaded.config_hash,
            inputs,
        })
        .with_context(|| format!("init report dir failed for {}", self.mode.as_str()))?;
        println!("report_id={}", report_id);
        Ok(Some(dir))
    }
}

/// Write the manifest and print where the report landed.
pub fn finish_report(dir: ReportDir) -> Result<()> {
    let report_path = dir.path().to_path_buf();
    let manifest = dir.finish()?;
    println!("report_dir={}", report_path.display());
    println!("manifest={}", manifest.display());
    Ok(())
}

/// Left-aligned first column, right-aligned rest.
pub fn print_table(header: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    println!("{}", render_line(&widths, header.iter().copied()));
    for r in rows {
        println!("{}", render_line(&widths, r.iter().map(String::as_str)));
    }
}

fn render_line<'a>(widths: &[usize], cells: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for (i, cell) in cells.enumerate() {
        let w = widths.get(i).copied().unwrap_or(0);
        let pad = " ".repeat(w.saturating_sub(cell.chars().count()));
        if i == 0 {
            out.push_str(cell);
            out.push_str(&pad);
        } else {
            out.push_str("  ");
            out.push_str(&pad);
            out.push_str(cell);
        }
    }
    out.trim_end().to_string()
}
