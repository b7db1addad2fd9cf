use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::error::IngestError;

/// Header name -> column index. Names are trimmed; matching is
/// case-sensitive.
#[derive(Debug, Clone)]
pub(crate) struct ColumnIndex {
    names: Vec<String>,
    idx: HashMap<String, usize>,
}

impl ColumnIndex {
    pub(crate) fn from_headers(headers: &StringRecord) -> Self {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
        let mut idx = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            // first occurrence wins on duplicate headers
            idx.entry(name.clone()).or_insert(i);
        }
        Self { names, idx }
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn has(&self, name: &str) -> bool {
        self.idx.contains_key(name)
    }

    pub(crate) fn require(&self, required: &[&str]) -> Result<(), IngestError> {
        let missing: Vec<String> = required
            .iter()
            .filter(|c| !self.has(c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(IngestError::MissingColumns(missing))
        }
    }

    /// Trimmed cell; `None` when the column is absent or the record is short.
    pub(crate) fn get<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.idx
            .get(name)
            .and_then(|i| record.get(*i))
            .map(str::trim)
    }

    /// Trimmed, non-empty cell.
    pub(crate) fn get_nonempty<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.get(record, name).filter(|s| !s.is_empty())
    }
}

pub(crate) fn csv_reader<R: Read>(src: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(src)
}

pub(crate) fn open(path: &Path) -> Result<File, IngestError> {
    File::open(path).map_err(|e| IngestError::Io(format!("open '{}': {e}", path.display())))
}
