use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::model::CandidateRecord;

/// Reads a header-bearing delimited dataset into candidate rows. Row
/// numbers in error messages are 1-based file lines, counting the header.
pub fn load_candidates(path: &Path) -> Result<Vec<CandidateRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open dataset: {}", path.display()))?;

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<CandidateRecord>().enumerate() {
        let record =
            row.with_context(|| format!("failed to parse row {} of {}", index + 2, path.display()))?;
        records.push(record);
    }

    if records.is_empty() {
        bail!("dataset {} contains no candidate rows", path.display());
    }

    Ok(records)
}
