//! Serialize harvested records to a single JSON document.
//!
//! The output is a pure function of `HarvestResult.records`: one JSON array
//! of the opaque record objects, no envelope wrapping. Records were decoded
//! exactly once by the fetcher and are serialized here exactly once, so no
//! escape artifacts from double-encoding can appear.

use anyhow::Result;
use std::path::Path;

use crate::models::HarvestResult;

/// Write the record sequence as pretty-printed JSON.
///
/// If `output` is `Some`, writes to that file path (creating parent
/// directories). Otherwise writes to stdout for piping. The ledger summary
/// goes to stderr either way.
pub fn write_records(result: &HarvestResult, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(&result.records)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            eprintln!(
                "Wrote {} of {} declared records to {}",
                result.total_retrieved,
                result.total_declared,
                path.display()
            );
        }
        None => {
            println!("{}", json);
        }
    }

    let duplicates = result.ledger.duplicates();
    if duplicates > 0 {
        eprintln!("Dropped {} duplicate records", duplicates);
    }
    if !result.ledger.is_complete() {
        for (offset, reason) in result.ledger.failures() {
            eprintln!("Warning: page at offset {} missing ({})", offset, reason);
        }
    }

    Ok(())
}

/// Default output file name, after the originating workflow's convention:
/// `{last_updated}_FDA_JSON_{database}.json`, falling back to the current
/// UTC date when the server omitted a last-updated timestamp.
pub fn default_file_name(result: &HarvestResult, database: &str) -> String {
    let stamp = result
        .last_updated
        .clone()
        .unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%d").to_string());
    format!("{}_FDA_JSON_{}.json", stamp, database)
}
