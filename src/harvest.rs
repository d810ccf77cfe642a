//! Harvest orchestration: plan, fetch concurrently, merge deterministically.
//!
//! The metadata probe must succeed before any page fetch is dispatched,
//! since it fixes the offset set. Page fetches then run with bounded
//! concurrency; each outcome lands in its own slot of the collected vector,
//! written once by the task that fetched it. Outcomes are re-sorted by
//! offset before merging, so the final record sequence is deterministic
//! regardless of completion order.
//!
//! # Cancellation
//!
//! [`Harvester::run_cancellable`] accepts a `CancellationToken`. Offsets
//! not yet started short-circuit to a `cancelled` failure without touching
//! the network; in-flight fetches are raced against the token and
//! abandoned. The merge then runs over whatever completed, yielding a
//! partial result whose ledger marks the cancelled offsets (or an
//! `IncompletePagination` error in strict mode).

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::aggregator;
use crate::config::Config;
use crate::error::HarvestError;
use crate::fetcher::Fetcher;
use crate::models::{FailureReason, HarvestResult, PageOutcome, Query};
use crate::pager;
use crate::progress::{HarvestEvent, HarvestProgressReporter, NoProgress};

/// Executes harvests against one configured endpoint family.
pub struct Harvester {
    fetcher: Fetcher,
    concurrency: usize,
}

impl Harvester {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(config)?,
            concurrency: config.harvest.concurrency,
        })
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Run a harvest to completion, without cancellation or progress output.
    pub async fn run(&self, query: &Query) -> Result<HarvestResult, HarvestError> {
        self.run_cancellable(query, CancellationToken::new(), &NoProgress)
            .await
    }

    /// Run a harvest with cancellation support and progress reporting.
    ///
    /// # Errors
    ///
    /// [`HarvestError::Query`] when the metadata probe fails, or
    /// [`HarvestError::IncompletePagination`] when a page ultimately fails
    /// (including by cancellation) and the query is strict.
    pub async fn run_cancellable(
        &self,
        query: &Query,
        cancel_token: CancellationToken,
        reporter: &dyn HarvestProgressReporter,
    ) -> Result<HarvestResult, HarvestError> {
        reporter.report(HarvestEvent::Probing {
            database: query.database.clone(),
        });

        let plan = pager::plan(&self.fetcher, query).await?;

        let pages_total = plan.offsets.len() as u64;
        let pages_done = AtomicU64::new(0);

        let mut outcomes: Vec<PageOutcome> = stream::iter(plan.offsets.iter().copied())
            .map(|offset| {
                let cancel_token = cancel_token.clone();
                let pages_done = &pages_done;
                async move {
                    let outcome = if cancel_token.is_cancelled() {
                        // Not yet started: no network call.
                        PageOutcome::Failed {
                            offset,
                            reason: FailureReason::Cancelled,
                        }
                    } else {
                        tokio::select! {
                            _ = cancel_token.cancelled() => PageOutcome::Failed {
                                offset,
                                reason: FailureReason::Cancelled,
                            },
                            outcome = self.fetcher.fetch_page(query, offset) => outcome,
                        }
                    };

                    let done = pages_done.fetch_add(1, Ordering::Relaxed) + 1;
                    reporter.report(HarvestEvent::Fetching {
                        database: query.database.clone(),
                        pages_done: done,
                        pages_total,
                    });
                    outcome
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        // Completion order is arbitrary; offset order is the contract.
        outcomes.sort_by_key(PageOutcome::offset);

        aggregator::merge(outcomes, query, &plan)
    }
}
