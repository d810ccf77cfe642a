//! Harvest error taxonomy.
//!
//! Only two conditions are fatal: a failed metadata probe, and a page
//! failure in strict mode. Everything else is absorbed into the ledger of a
//! (possibly partial) [`crate::models::HarvestResult`].

use thiserror::Error;

use crate::models::{FailureReason, Ledger};

#[derive(Debug, Error)]
pub enum HarvestError {
    /// The initial metadata probe failed, so the harvest cannot be planned.
    /// A probe that returns a non-success status is an error, never an empty
    /// result: a silently empty harvest would be indistinguishable from a
    /// legitimately zero-match query.
    #[error("query probe failed: {message}")]
    Query {
        status: Option<u16>,
        message: String,
    },

    /// Strict mode only: a page ultimately failed after retries. Carries the
    /// ledger accumulated up to and including the failed page.
    #[error("harvest incomplete: page at offset {offset} failed ({reason})")]
    IncompletePagination {
        offset: u64,
        reason: FailureReason,
        ledger: Ledger,
    },
}

impl HarvestError {
    pub(crate) fn probe(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        HarvestError::Query {
            status,
            message: match status {
                Some(code) => format!("HTTP {}: {}", code, message),
                None => message,
            },
        }
    }
}
