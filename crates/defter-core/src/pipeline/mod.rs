//! Batch orchestration: bounded concurrency, backoff, and
//! partial-failure isolation.

pub mod retry;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::error::{DefterError, Result, StoreError};
use crate::extract::delegated::{parse_statement, parse_structured};
use crate::extract::orientation::scan_with_rotations;
use crate::ledger::duplicate::{fingerprint_snapshot, DuplicateDetector, Fingerprint};
use crate::models::config::DefterConfig;
use crate::models::record::{NormalizedRecord, RawDocument, RecordOrigin};
use crate::service::{ExtractionMode, RecognitionPayload, RecognitionService};
use crate::store::TabularStore;

use retry::RetryPolicy;

/// Cooperative batch cancellation: stops issuing new work without
/// killing in-flight calls.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One per-document failure, carrying the document identifier.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub document_id: String,
    pub reason: String,
}

/// Result of one batch run: extracted records (possibly flagged) plus
/// per-document failures. Never all-or-nothing.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<NormalizedRecord>,
    pub failures: Vec<BatchFailure>,
}

/// The document-to-ledger extraction pipeline.
pub struct Pipeline<S> {
    service: Arc<S>,
    config: DefterConfig,
    retry: RetryPolicy,
}

impl<S> Pipeline<S>
where
    S: RecognitionService + 'static,
{
    pub fn new(service: Arc<S>, config: DefterConfig) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        Self {
            service,
            config,
            retry,
        }
    }

    /// Process a batch of documents with bounded concurrency.
    ///
    /// Results are collected as workers complete, not in submission
    /// order; every result carries its source document identifier. The
    /// fingerprint history is a per-batch snapshot shared by all
    /// workers, so duplicate detection stays consistent within the
    /// batch.
    pub async fn process_batch(
        &self,
        documents: Vec<(RawDocument, ExtractionMode)>,
        history: HashSet<Fingerprint>,
        abort: &AbortFlag,
    ) -> BatchOutcome {
        let jobs = self.config.pipeline.jobs.max(1);
        let semaphore = Arc::new(Semaphore::new(jobs));
        let mut tasks: JoinSet<(String, Result<Vec<NormalizedRecord>>)> = JoinSet::new();

        for (document, mode) in documents {
            let service = Arc::clone(&self.service);
            let semaphore = Arc::clone(&semaphore);
            let retry = self.retry.clone();
            let scan_orientations = self.config.extraction.scan_orientations;
            let abort = abort.clone();

            tasks.spawn(async move {
                let id = document.id.clone();
                // Closing the semaphore is not part of the protocol, so
                // acquire can only fail if the batch itself is dropped
                let Ok(_permit) = semaphore.acquire().await else {
                    return (id, Err(DefterError::Aborted));
                };

                if abort.is_aborted() {
                    debug!(document = %id, "skipping document, batch aborted");
                    return (id, Err(DefterError::Aborted));
                }

                let result =
                    process_document(service.as_ref(), &retry, &document, mode, scan_orientations)
                        .await;
                (id, result)
            });
        }

        let mut outcome = BatchOutcome::default();
        let mut detector = DuplicateDetector::new(history);

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(mut records))) => {
                    for record in &mut records {
                        detector.annotate(record);
                        if record.needs_review() {
                            warn!(
                                document = %id,
                                merchant = %record.merchant_name,
                                issues = ?record.review_issues(),
                                "record flagged for manual review"
                            );
                        }
                    }
                    outcome.records.extend(records);
                }
                Ok((id, Err(err))) => {
                    warn!(document = %id, %err, "document failed");
                    outcome.failures.push(BatchFailure {
                        document_id: id,
                        reason: err.to_string(),
                    });
                }
                Err(join_err) => {
                    // A panicked worker loses its document id; surface
                    // what we know rather than dropping it silently
                    error!(%join_err, "extraction worker crashed");
                    outcome.failures.push(BatchFailure {
                        document_id: "<unknown>".to_string(),
                        reason: join_err.to_string(),
                    });
                }
            }
        }

        outcome
    }
}

/// Full extraction of a single document.
async fn process_document<S>(
    service: &S,
    retry: &RetryPolicy,
    document: &RawDocument,
    mode: ExtractionMode,
    scan_orientations: bool,
) -> Result<Vec<NormalizedRecord>>
where
    S: RecognitionService,
{
    // A side-channel hint is a pre-read structured guess; when it parses
    // cleanly the service call is skipped entirely
    if let Some(hint) = &document.hint {
        match parse_structured(hint) {
            Ok(fields) => {
                debug!(document = %document.id, "extracted from side-channel hint");
                return Ok(vec![NormalizedRecord::from_extracted(
                    &fields,
                    RecordOrigin::Receipt,
                    Some(document.id.clone()),
                )]);
            }
            Err(err) => {
                debug!(document = %document.id, %err, "hint unusable, falling back to service");
            }
        }
    }

    match mode {
        ExtractionMode::Receipt => {
            let outcome = scan_with_rotations(service, retry, document, scan_orientations).await?;
            Ok(vec![NormalizedRecord::from_extracted(
                &outcome.fields,
                RecordOrigin::Receipt,
                Some(document.id.clone()),
            )])
        }
        ExtractionMode::Statement => {
            let payload = retry
                .run(|| service.recognize(&document.bytes, document.media, ExtractionMode::Statement))
                .await?;

            let body = match payload {
                RecognitionPayload::Structured(body) => body,
                // A raw-text answer to a statement request still has to
                // carry the array body to be usable
                RecognitionPayload::Text(text) => text,
            };

            let lines = parse_statement(&body)?;
            Ok(lines
                .iter()
                .map(|fields| {
                    NormalizedRecord::from_extracted(fields, RecordOrigin::StatementLine, None)
                })
                .collect())
        }
    }
}

/// Read a partition once and build the duplicate-detection snapshot.
pub fn history_from_store(
    store: &dyn TabularStore,
    partition: &str,
) -> std::result::Result<HashSet<Fingerprint>, StoreError> {
    let records = store.load_records(partition)?;
    Ok(fingerprint_snapshot(records.iter()))
}
