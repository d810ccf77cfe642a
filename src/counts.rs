//! Term-frequency queries via the openFDA `count=` parameter.
//!
//! A count query is a single request, not a paginated harvest: the server
//! aggregates matching records by the named field and returns the frequency
//! table directly. Date-typed fields come back keyed as `time` instead of
//! `term`; both are accepted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HarvestError;
use crate::fetcher::Fetcher;
use crate::models::Query;

/// One row of a count query result.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TermCount {
    #[serde(alias = "time")]
    pub term: Value,
    pub count: u64,
}

#[derive(Debug, Deserialize)]
struct CountEnvelope {
    #[serde(default)]
    results: Option<Vec<TermCount>>,
}

impl Fetcher {
    /// Count matching records grouped by `field`.
    ///
    /// Like the metadata probe, this is a single query-level request;
    /// any failure is a fatal [`HarvestError::Query`].
    pub async fn count_terms(
        &self,
        query: &Query,
        field: &str,
    ) -> Result<Vec<TermCount>, HarvestError> {
        let resp = self
            .request(&query.database)
            .query(&[("search", query.search.as_str()), ("count", field)])
            .send()
            .await
            .map_err(|e| HarvestError::probe(None, format!("network error: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HarvestError::probe(
                Some(status.as_u16()),
                body.chars().take(200).collect::<String>(),
            ));
        }

        let envelope: CountEnvelope = resp
            .json()
            .await
            .map_err(|e| HarvestError::probe(None, format!("malformed envelope: {}", e)))?;

        envelope
            .results
            .ok_or_else(|| HarvestError::probe(None, "count envelope missing results"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_rows_accept_term_and_time_keys() {
        let envelope: CountEnvelope = serde_json::from_value(serde_json::json!({
            "results": [
                { "term": "INFECTION", "count": 42 },
                { "time": "20240101", "count": 7 }
            ]
        }))
        .unwrap();
        let rows = envelope.results.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].term, Value::from("INFECTION"));
        assert_eq!(rows[0].count, 42);
        assert_eq!(rows[1].term, Value::from("20240101"));
    }
}
