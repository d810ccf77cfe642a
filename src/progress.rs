//! Harvest progress reporting.
//!
//! Progress is emitted on **stderr** so stdout stays parseable when records
//! are piped. The human reporter rewrites a short status line per event;
//! the JSON reporter emits one object per line for tooling.

use std::io::Write;

/// A single progress event during a harvest.
#[derive(Clone, Debug)]
pub enum HarvestEvent {
    /// Metadata probe in flight; no total yet.
    Probing { database: String },
    /// Page fetches running: `pages_done` of `pages_total` complete.
    Fetching {
        database: String,
        pages_done: u64,
        pages_total: u64,
    },
}

/// Reports harvest progress. Implementations write to stderr.
pub trait HarvestProgressReporter: Send + Sync {
    fn report(&self, event: HarvestEvent);
}

/// Human-friendly lines: `harvest event  fetching  3 / 12 pages`.
pub struct StderrProgress;

impl HarvestProgressReporter for StderrProgress {
    fn report(&self, event: HarvestEvent) {
        let line = match &event {
            HarvestEvent::Probing { database } => {
                format!("harvest {}  probing...\n", database)
            }
            HarvestEvent::Fetching {
                database,
                pages_done,
                pages_total,
            } => {
                format!(
                    "harvest {}  fetching  {} / {} pages\n",
                    database,
                    format_number(*pages_done),
                    format_number(*pages_total)
                )
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl HarvestProgressReporter for JsonProgress {
    fn report(&self, event: HarvestEvent) {
        let obj = match &event {
            HarvestEvent::Probing { database } => serde_json::json!({
                "event": "progress",
                "database": database,
                "phase": "probing"
            }),
            HarvestEvent::Fetching {
                database,
                pages_done,
                pages_total,
            } => serde_json::json!({
                "event": "progress",
                "database": database,
                "phase": "fetching",
                "pages_done": pages_done,
                "pages_total": pages_total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl HarvestProgressReporter for NoProgress {
    fn report(&self, _event: HarvestEvent) {}
}

fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn HarvestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
