use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::detector::Detector;
use crate::error::DedupError;
use crate::source::BugSource;
use crate::types::BugRecord;

/// Status value that routes a bug into the priority registry as well.
pub const STATUS_CLOSED: &str = "Closed";

const MSG_OK: &str = "Bootstrapped";
const MSG_FAILED: &str = "Bootstrap failed";

/// Outcome of a bootstrap run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BootstrapReport {
    pub message: String,
    /// Records received from the source (processed or not).
    pub count: usize,
    /// Records stored in the general registry.
    pub inserted: usize,
    /// Of those, records also stored in the priority registry.
    pub priority_inserted: usize,
    /// Records rejected as malformed or missing an application.
    pub skipped: usize,
    /// Records that were well-formed but could not be embedded or stored,
    /// including closed bugs whose priority copy failed after the general
    /// insert went through (those also count in `inserted`).
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BootstrapReport {
    fn failed(err: &DedupError) -> Self {
        Self {
            message: MSG_FAILED.to_string(),
            error: Some(err.to_string()),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl Detector {
    /// Ingest the configured bug source into both registries.
    pub async fn bootstrap(&self) -> BootstrapReport {
        match self.source.clone() {
            Some(source) => self.bootstrap_from(source.as_ref()).await,
            None => {
                let err = DedupError::Validation("no bug source configured".to_string());
                error!(error = %err, "bootstrap failed");
                BootstrapReport::failed(&err)
            }
        }
    }

    /// Fetch the corpus from `source` and index every usable record.
    ///
    /// A failed fetch ends the run with a failed report. After that, each
    /// record is handled on its own: a bad record is logged with its
    /// position and counted, and the run moves on. Locks are taken per
    /// insert, never for the whole run.
    pub async fn bootstrap_from(&self, source: &dyn BugSource) -> BootstrapReport {
        info!("bootstrap: fetching bug corpus");
        let bugs = match source.fetch_bugs().await {
            Ok(bugs) => bugs,
            Err(e) => {
                let err = DedupError::from(e);
                error!(error = %err, "bootstrap failed");
                return BootstrapReport::failed(&err);
            }
        };

        let mut report = BootstrapReport {
            message: MSG_OK.to_string(),
            count: bugs.len(),
            ..Default::default()
        };

        for (index, value) in bugs.into_iter().enumerate() {
            match self.ingest(index, value).await {
                Ok(Ingested::General) => report.inserted += 1,
                Ok(Ingested::Both) => {
                    report.inserted += 1;
                    report.priority_inserted += 1;
                }
                Ok(Ingested::PriorityFailed(e)) => {
                    warn!(index, error = %e, "indexed bug record, but not as a priority precedent");
                    report.inserted += 1;
                    report.failed += 1;
                }
                Err(e @ DedupError::MalformedRecord { .. }) => {
                    warn!(index, error = %e, "skipping bug record");
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(index, error = %e, "failed to index bug record");
                    report.failed += 1;
                }
            }
        }

        info!(
            count = report.count,
            inserted = report.inserted,
            priority = report.priority_inserted,
            skipped = report.skipped,
            failed = report.failed,
            "bootstrap finished"
        );
        report
    }

    /// Index one corpus entry into the general registry and, for closed
    /// bugs, the priority registry.
    async fn ingest(&self, index: usize, value: Value) -> Result<Ingested, DedupError> {
        let record = parse_record(index, value)?;
        let application = match record.application.as_deref() {
            Some(app) if !app.trim().is_empty() => app,
            _ => {
                return Err(DedupError::MalformedRecord {
                    index,
                    reason: "missing application name".to_string(),
                });
            }
        };
        let bug_id = record.bug_id.as_deref().unwrap_or_default();

        let vector = self.embed(&record.text()).await?;
        self.general.insert(application, bug_id, &vector)?;

        if record.status.as_deref() != Some(STATUS_CLOSED) {
            return Ok(Ingested::General);
        }
        Ok(match self.priority.insert(application, bug_id, &vector) {
            Ok(()) => Ingested::Both,
            Err(e) => Ingested::PriorityFailed(e),
        })
    }
}

/// Where a record ended up once the general insert succeeded.
enum Ingested {
    General,
    Both,
    PriorityFailed(DedupError),
}

fn parse_record(index: usize, value: Value) -> Result<BugRecord, DedupError> {
    if !value.is_object() {
        return Err(DedupError::MalformedRecord {
            index,
            reason: format!("not an object: {value}"),
        });
    }
    serde_json::from_value(value).map_err(|e| DedupError::MalformedRecord {
        index,
        reason: e.to_string(),
    })
}
