//! Core data types for a harvest: queries, response envelopes, per-page
//! outcomes, the ledger, and the final result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One harvested record: an opaque JSON object, parsed exactly once.
///
/// The harvester never inspects record fields except to read the configured
/// identity field for de-duplication.
pub type Record = serde_json::Map<String, Value>;

/// A single logical query against one openFDA database.
#[derive(Debug, Clone)]
pub struct Query {
    /// Opaque search expression, passed through to the `search=` parameter.
    pub search: String,
    /// Database path segment (e.g. `event`, `udi`, `recall`, `510k`).
    pub database: String,
    /// Records per page. Validated against the server cap in config.
    pub page_size: usize,
    /// Optional cap on the total number of records to retrieve.
    pub max_records: Option<u64>,
    /// Record field whose value is unique per record (e.g. `report_number`).
    /// When set, records repeated across page boundaries are dropped.
    /// When unset, no de-duplication occurs and a harvest over a mutating
    /// dataset may contain boundary duplicates.
    pub identity_field: Option<String>,
    /// Abort on the first page failure instead of returning a partial result.
    pub strict: bool,
}

impl Query {
    pub fn new(search: impl Into<String>, database: impl Into<String>, page_size: usize) -> Self {
        Self {
            search: search.into(),
            database: database.into(),
            page_size,
            max_records: None,
            identity_field: None,
            strict: false,
        }
    }

    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = Some(field.into());
        self
    }

    pub fn with_max_records(mut self, cap: u64) -> Self {
        self.max_records = Some(cap);
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

// ============ Response envelope ============

/// Metadata section of an openFDA response envelope.
///
/// Live responses carry `last_updated` directly under `meta`; the documented
/// envelope nests it under `meta.results`. Both locations are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub results: Option<MetaResults>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaResults {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl Meta {
    /// Declared total result count, if the server reported one.
    pub fn total(&self) -> Option<u64> {
        self.results.as_ref().and_then(|r| r.total)
    }

    /// Last-updated timestamp, whichever location it was served at.
    pub fn last_updated(&self) -> Option<&str> {
        self.results
            .as_ref()
            .and_then(|r| r.last_updated.as_deref())
            .or(self.last_updated.as_deref())
    }
}

/// Envelope of the metadata probe. The `results` payload is ignored.
#[derive(Debug, Deserialize)]
pub struct ProbeEnvelope {
    #[serde(default)]
    pub meta: Option<Meta>,
}

/// Envelope of a page fetch. A success requires `results` to be present and
/// be an array of objects; an empty array is a valid empty page.
#[derive(Debug, Deserialize)]
pub struct PageEnvelope {
    #[serde(default)]
    pub results: Option<Vec<Record>>,
}

// ============ Page outcomes and ledger ============

/// Why a page fetch ultimately failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Connection error or per-attempt timeout, after retries.
    Network,
    /// Non-success HTTP status, after retries where retryable.
    HttpStatus(u16),
    /// Response body was not the expected envelope shape.
    MalformedEnvelope,
    /// The harvest was cancelled before this page completed.
    Cancelled,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Network => write!(f, "network"),
            FailureReason::HttpStatus(code) => write!(f, "http_status({})", code),
            FailureReason::MalformedEnvelope => write!(f, "malformed_envelope"),
            FailureReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal outcome of one page fetch. Fetch failures are data, not errors:
/// the aggregator decides whether a failed page aborts the harvest.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Fetched { offset: u64, records: Vec<Record> },
    Failed { offset: u64, reason: FailureReason },
}

impl PageOutcome {
    pub fn offset(&self) -> u64 {
        match self {
            PageOutcome::Fetched { offset, .. } => *offset,
            PageOutcome::Failed { offset, .. } => *offset,
        }
    }
}

/// Per-page entry in the harvest ledger.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub offset: u64,
    pub status: PageStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Page retrieved; `records` as served, `duplicates` dropped from it.
    Fetched { records: usize, duplicates: usize },
    Failed { reason: FailureReason },
}

/// Append-only record of per-page outcomes for one harvest.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn record_fetched(&mut self, offset: u64, records: usize, duplicates: usize) {
        self.entries.push(LedgerEntry {
            offset,
            status: PageStatus::Fetched {
                records,
                duplicates,
            },
        });
    }

    pub fn record_failed(&mut self, offset: u64, reason: FailureReason) {
        self.entries.push(LedgerEntry {
            offset,
            status: PageStatus::Failed { reason },
        });
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Offsets that ultimately failed, with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (u64, &FailureReason)> {
        self.entries.iter().filter_map(|e| match &e.status {
            PageStatus::Failed { reason } => Some((e.offset, reason)),
            PageStatus::Fetched { .. } => None,
        })
    }

    /// Total records dropped as duplicates across all pages.
    pub fn duplicates(&self) -> usize {
        self.entries
            .iter()
            .map(|e| match &e.status {
                PageStatus::Fetched { duplicates, .. } => *duplicates,
                PageStatus::Failed { .. } => 0,
            })
            .sum()
    }

    /// True when every planned page was retrieved.
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

// ============ Harvest plan and result ============

/// Output of the metadata probe: the authoritative total and the page
/// offsets that cover it. Totals re-derived from later pages are ignored,
/// so the page count cannot oscillate under a moving target.
#[derive(Debug, Clone)]
pub struct HarvestPlan {
    pub total: u64,
    pub last_updated: Option<String>,
    pub offsets: Vec<u64>,
}

/// The final artifact of a harvest.
///
/// `records` preserves server order within each page and ascending offset
/// order across pages. A non-empty set of ledger failures means the harvest
/// is partial; callers that need completeness should check
/// [`Ledger::is_complete`] or run in strict mode.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestResult {
    pub records: Vec<Record>,
    pub total_declared: u64,
    pub total_retrieved: usize,
    pub last_updated: Option<String>,
    pub ledger: Ledger,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_last_updated_prefers_nested() {
        let meta: Meta = serde_json::from_value(serde_json::json!({
            "last_updated": "2024-01-01",
            "results": { "total": 5, "last_updated": "2024-02-02" }
        }))
        .unwrap();
        assert_eq!(meta.last_updated(), Some("2024-02-02"));
        assert_eq!(meta.total(), Some(5));
    }

    #[test]
    fn test_meta_last_updated_top_level_fallback() {
        let meta: Meta = serde_json::from_value(serde_json::json!({
            "last_updated": "2024-01-01",
            "results": { "total": 5 }
        }))
        .unwrap();
        assert_eq!(meta.last_updated(), Some("2024-01-01"));
    }

    #[test]
    fn test_ledger_counts() {
        let mut ledger = Ledger::default();
        ledger.record_fetched(0, 100, 0);
        ledger.record_fetched(100, 100, 2);
        ledger.record_failed(200, FailureReason::HttpStatus(404));
        assert_eq!(ledger.duplicates(), 2);
        assert!(!ledger.is_complete());
        let failures: Vec<_> = ledger.failures().collect();
        assert_eq!(failures, vec![(200, &FailureReason::HttpStatus(404))]);
    }
}
