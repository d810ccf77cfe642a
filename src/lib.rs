//! # openFDA Harvest
//!
//! A resilient paginated harvester for the openFDA device API family.
//!
//! One logical query against a record-paginated endpoint becomes a
//! complete, de-duplicated, deterministically ordered collection of result
//! records, tolerant of partial failures across pages.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────┐   ┌──────────────┐   ┌────────────┐
//! │ Pager  │──▶│   Fetcher    │──▶│ Aggregator │──▶ HarvestResult
//! │ probe  │   │ N concurrent │   │ sort+merge │
//! └────────┘   └──────────────┘   └────────────┘
//! ```
//!
//! The pager issues one metadata probe and fixes the offset set from the
//! declared total. The fetcher retrieves pages concurrently, classifying
//! every failure instead of raising. The aggregator re-sorts by offset and
//! merges, so the output is independent of completion order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use openfda_harvest::config::Config;
//! use openfda_harvest::harvest::Harvester;
//! use openfda_harvest::models::Query;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let harvester = Harvester::new(&config)?;
//!
//! let query = Query::new("In2Bones", "udi", 100).with_identity_field("public_device_record_key");
//! let result = harvester.run(&query).await?;
//! println!("{} / {} records", result.total_retrieved, result.total_declared);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Queries, envelopes, ledger, results |
//! | [`pager`] | Metadata probe and offset planning |
//! | [`fetcher`] | Per-page HTTP with retry/backoff |
//! | [`aggregator`] | Offset-ordered merge and de-duplication |
//! | [`harvest`] | Orchestration, concurrency, cancellation |
//! | [`counts`] | `count=` term-frequency queries |
//! | [`export`] | Single-document JSON output |
//! | [`progress`] | stderr progress reporting |
//! | [`error`] | Fatal error taxonomy |

pub mod aggregator;
pub mod config;
pub mod counts;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod harvest;
pub mod models;
pub mod pager;
pub mod progress;
