//! Merging page outcomes into one ordered, de-duplicated record sequence.
//!
//! The merge walks outcomes in ascending offset order, appending each
//! fetched page's records in server order. Records are moved, never
//! re-parsed or re-encoded: the decoded form produced by the fetcher is the
//! form that gets serialized, so escape sequences in the source JSON appear
//! exactly once-decoded in the output.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::HarvestError;
use crate::models::{HarvestPlan, HarvestResult, Ledger, PageOutcome, Query};

/// Merge page outcomes (sorted by ascending offset) into a [`HarvestResult`].
///
/// Lenient mode records failed pages in the ledger and keeps going; strict
/// mode aborts on the first failure. De-duplication runs only when the
/// query names an identity field: a record whose identity value was already
/// seen is dropped and counted against its page's ledger entry. Records
/// missing the field are kept, since they cannot be compared.
///
/// # Errors
///
/// [`HarvestError::IncompletePagination`] in strict mode, carrying the
/// ledger accumulated so far.
pub fn merge(
    outcomes: Vec<PageOutcome>,
    query: &Query,
    plan: &HarvestPlan,
) -> Result<HarvestResult, HarvestError> {
    debug_assert!(outcomes.windows(2).all(|w| w[0].offset() < w[1].offset()));

    let mut records = Vec::new();
    let mut ledger = Ledger::default();
    let mut seen: HashSet<String> = HashSet::new();

    for outcome in outcomes {
        match outcome {
            PageOutcome::Fetched {
                offset,
                records: page,
            } => {
                let served = page.len();
                let mut duplicates = 0;

                for record in page {
                    if let Some(field) = &query.identity_field {
                        if let Some(identity) = record.get(field).map(identity_key) {
                            if !seen.insert(identity) {
                                duplicates += 1;
                                continue;
                            }
                        }
                    }
                    records.push(record);
                }

                ledger.record_fetched(offset, served, duplicates);
            }
            PageOutcome::Failed { offset, reason } => {
                ledger.record_failed(offset, reason.clone());
                if query.strict {
                    return Err(HarvestError::IncompletePagination {
                        offset,
                        reason,
                        ledger,
                    });
                }
                tracing::warn!(offset, reason = %reason, "page failed, continuing without it");
            }
        }
    }

    // The plan already bounds the offsets, so a cap overshoots by at most
    // one page worth of records.
    if let Some(cap) = query.max_records {
        records.truncate(cap as usize);
    }

    let total_retrieved = records.len();
    Ok(HarvestResult {
        records,
        total_declared: plan.total,
        total_retrieved,
        last_updated: plan.last_updated.clone(),
        ledger,
    })
}

/// Canonical JSON rendering of an identity value, so string and numeric
/// report numbers compare consistently.
fn identity_key(value: &Value) -> String {
    value.to_string()
}
