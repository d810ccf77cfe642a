//! Harvest planning: one metadata probe, then offset arithmetic.
//!
//! The probe's declared total is authoritative for the whole harvest. Later
//! pages may report a different total if the dataset moves underneath us;
//! those are ignored so the planned offset set never oscillates.

use crate::error::HarvestError;
use crate::fetcher::Fetcher;
use crate::models::{HarvestPlan, Query};

/// Probe the query and compute the page offsets that cover it.
///
/// Issues exactly one network call. A zero-match query is a valid plan with
/// no offsets, not an error.
///
/// # Errors
///
/// [`HarvestError::Query`] when the probe returns a non-success status or
/// the envelope lacks `meta.results.total`.
pub async fn plan(fetcher: &Fetcher, query: &Query) -> Result<HarvestPlan, HarvestError> {
    let meta = fetcher.probe(query).await?;
    // probe() guarantees the total is present
    let total = meta.total().unwrap_or(0);

    let plan = HarvestPlan {
        total,
        last_updated: meta.last_updated().map(str::to_string),
        offsets: page_offsets(total, query.page_size, query.max_records),
    };

    tracing::info!(
        database = query.database.as_str(),
        total = plan.total,
        pages = plan.offsets.len(),
        "harvest planned"
    );

    Ok(plan)
}

/// Offsets `0, p, 2p, …` covering `min(total, cap)` records: one offset per
/// page, `ceil(covered / page_size)` pages in all.
pub fn page_offsets(total: u64, page_size: usize, cap: Option<u64>) -> Vec<u64> {
    let page_size = page_size as u64;
    let covered = cap.map_or(total, |c| total.min(c));
    let pages = covered.div_ceil(page_size);
    (0..pages).map(|i| i * page_size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_total_yields_no_offsets() {
        assert!(page_offsets(0, 100, None).is_empty());
    }

    #[test]
    fn test_exact_multiple() {
        assert_eq!(page_offsets(300, 100, None), vec![0, 100, 200]);
    }

    #[test]
    fn test_partial_last_page() {
        assert_eq!(page_offsets(301, 100, None), vec![0, 100, 200, 300]);
        assert_eq!(page_offsets(99, 100, None), vec![0]);
    }

    #[test]
    fn test_offsets_strictly_increase_by_page_size() {
        let offsets = page_offsets(1234, 77, None);
        assert_eq!(offsets[0], 0);
        for pair in offsets.windows(2) {
            assert_eq!(pair[1] - pair[0], 77);
        }
        assert_eq!(offsets.len(), 1234usize.div_ceil(77));
    }

    #[test]
    fn test_cap_limits_pages() {
        assert_eq!(page_offsets(10_000, 100, Some(250)), vec![0, 100, 200]);
        // A cap beyond the total changes nothing.
        assert_eq!(page_offsets(150, 100, Some(9999)), vec![0, 100]);
    }
}
