use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::admission::AdmissionFilter;
use crate::domain::{NATURE_NAMES, TYPE_NAMES};
use crate::error::{CatalogError, ErrorKind};
use crate::normalize::{FormOutcome, Normalizer};
use crate::pokeapi::CatalogSource;
use crate::remediation::RemediationTable;
use crate::store::{Store, TableCounts};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Cooperative cancellation, honoured between species.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub truncate: bool,
    /// Explicit operator confirmation; required when `truncate` is set.
    pub confirmed: bool,
    pub limit: u32,
    pub delay: Duration,
    pub progress_every: usize,
    pub cancel: CancelFlag,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            truncate: false,
            confirmed: false,
            limit: 1025,
            delay: Duration::from_millis(100),
            progress_every: 25,
            cancel: CancelFlag::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded { species_id: i64, inserted: bool },
    Skipped { reason: String },
    Failed { kind: ErrorKind, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeciesItem {
    pub name: String,
    pub outcome: ItemOutcome,
    /// Lineage failure that did not stop the species from being written.
    pub lineage_error: Option<String>,
    pub forms: Vec<FormOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: String,
    pub cancelled: bool,
    pub species_total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub forms_inserted: usize,
    pub forms_existing: usize,
    pub forms_skipped: usize,
    pub forms_failed: usize,
    pub items: Vec<SpeciesItem>,
    pub counts: TableCounts,
}

impl RunReport {
    fn tally(
        started_at: String,
        cancelled: bool,
        species_total: usize,
        items: Vec<SpeciesItem>,
        counts: TableCounts,
    ) -> Self {
        let count_items = |pred: fn(&ItemOutcome) -> bool| {
            items.iter().filter(|item| pred(&item.outcome)).count()
        };
        let count_forms = |pred: fn(&FormOutcome) -> bool| {
            items
                .iter()
                .flat_map(|item| item.forms.iter())
                .filter(|form| pred(form))
                .count()
        };
        Self {
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            cancelled,
            species_total,
            succeeded: count_items(|o| matches!(o, ItemOutcome::Succeeded { .. })),
            skipped: count_items(|o| matches!(o, ItemOutcome::Skipped { .. })),
            failed: count_items(|o| matches!(o, ItemOutcome::Failed { .. })),
            forms_inserted: count_forms(|f| matches!(f, FormOutcome::Inserted { .. })),
            forms_existing: count_forms(|f| matches!(f, FormOutcome::Existing { .. })),
            forms_skipped: count_forms(|f| matches!(f, FormOutcome::Skipped { .. })),
            forms_failed: count_forms(|f| matches!(f, FormOutcome::Failed { .. })),
            items,
            counts,
        }
    }
}

/// Admission and remediation policy plus the lineage switch.
#[derive(Debug, Clone, Default)]
pub struct IngestPolicy {
    pub admission: AdmissionFilter,
    pub remediations: RemediationTable,
    pub track_lineage: bool,
}

pub struct Ingestor<C: CatalogSource> {
    store: Arc<Store>,
    source: C,
    policy: IngestPolicy,
}

impl<C: CatalogSource> Ingestor<C> {
    pub fn new(store: Arc<Store>, source: C, policy: IngestPolicy) -> Self {
        Self {
            store,
            source,
            policy,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Runs one full ingestion pass.
    ///
    /// Only storage failures during setup and a failed species listing abort
    /// the run; everything per species ends up in the report. Rerunning is the
    /// recovery path since every write is insert-if-absent.
    pub fn run(
        &self,
        options: &IngestOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, CatalogError> {
        if options.truncate && !options.confirmed {
            return Err(CatalogError::TruncateNotConfirmed);
        }
        let started_at = chrono::Utc::now().to_rfc3339();
        let start = Instant::now();

        sink.event(ProgressEvent {
            message: "phase=Schema; ensuring tables".to_string(),
            elapsed: None,
        });
        self.store.initialize()?;
        if options.truncate {
            sink.event(ProgressEvent {
                message: "phase=Schema; truncating tables".to_string(),
                elapsed: None,
            });
            self.store.truncate()?;
        }
        self.seed_reference_data(sink)?;

        sink.event(ProgressEvent {
            message: format!("phase=Resolve; listing up to {} species", options.limit),
            elapsed: Some(start.elapsed()),
        });
        let species = self.source.list_species(options.limit)?;
        let total = species.len();

        let normalizer = Normalizer::new(
            &self.source,
            &self.store,
            &self.policy.admission,
            &self.policy.remediations,
            self.policy.track_lineage,
        );
        let mut items = Vec::with_capacity(total);
        let mut cancelled = false;
        for (index, entry) in species.iter().enumerate() {
            if index > 0 && !options.delay.is_zero() {
                thread::sleep(options.delay);
            }
            if options.cancel.is_cancelled() {
                tracing::warn!(processed = index, total, "ingestion cancelled");
                cancelled = true;
                break;
            }

            items.push(self.ingest_species(&normalizer, &entry.name));

            if options.progress_every > 0 && index % options.progress_every == 0 {
                tracing::info!(done = index + 1, total, "progress");
                sink.event(ProgressEvent {
                    message: format!("phase=Ingest; progress {}/{}", index + 1, total),
                    elapsed: Some(start.elapsed()),
                });
            }
        }

        let report = RunReport::tally(started_at, cancelled, total, items, self.store.counts()?);
        sink.event(ProgressEvent {
            message: format!(
                "phase=Done; succeeded={} skipped={} failed={}",
                report.succeeded, report.skipped, report.failed
            ),
            elapsed: Some(start.elapsed()),
        });
        Ok(report)
    }

    fn seed_reference_data(&self, sink: &dyn ProgressSink) -> Result<(), CatalogError> {
        sink.event(ProgressEvent {
            message: "phase=Seed; types and natures".to_string(),
            elapsed: None,
        });
        for name in TYPE_NAMES {
            if self.store.insert_type(name)? {
                tracing::debug!(name, "inserted type");
            }
        }
        for name in NATURE_NAMES {
            if self.store.insert_nature(name)? {
                tracing::debug!(name, "inserted nature");
            }
        }
        Ok(())
    }

    fn ingest_species(&self, normalizer: &Normalizer<'_, C>, name: &str) -> SpeciesItem {
        let result = self.source.species_detail(name).and_then(|detail| {
            let upsert = normalizer.upsert_species(&detail)?;
            Ok((detail, upsert))
        });

        match result {
            Ok((detail, upsert)) => SpeciesItem {
                name: name.to_string(),
                outcome: ItemOutcome::Succeeded {
                    species_id: upsert.species_id,
                    inserted: upsert.inserted,
                },
                lineage_error: upsert.lineage_error,
                forms: normalizer.populate_forms(upsert.species_id, &detail),
            },
            Err(err) if err.kind() == ErrorKind::Parse => {
                tracing::warn!(species = name, error = %err, "skipping species");
                SpeciesItem {
                    name: name.to_string(),
                    outcome: ItemOutcome::Skipped {
                        reason: err.to_string(),
                    },
                    lineage_error: None,
                    forms: Vec::new(),
                }
            }
            Err(err) => {
                tracing::error!(species = name, error = %err, "failed to populate species");
                SpeciesItem {
                    name: name.to_string(),
                    outcome: ItemOutcome::Failed {
                        kind: err.kind(),
                        error: err.to_string(),
                    },
                    lineage_error: None,
                    forms: Vec::new(),
                }
            }
        }
    }
}
