//! Bulk load from the catalog into the store.
//!
//! Employers are walked in order; each accepted employer is written before
//! its postings are fetched. Malformed records are skipped and counted, a
//! failed posting fetch counts as an empty list, and a failed row write is
//! logged and counted. Only a catalog that resolves no employer at all, or a
//! store that can no longer be used, aborts the run.

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::db::Store;
use crate::error::{IngestError, StoreError};
use crate::models::{EmployerRecord, PostingRecord, UpsertOutcome};
use crate::validate::{Admission, validate_employer, validate_posting};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub employers_fetched: usize,
    pub employers_inserted: usize,
    pub employers_existing: usize,
    pub employers_rejected: usize,
    pub employers_failed: usize,
    pub postings_fetched: usize,
    pub postings_inserted: usize,
    pub postings_existing: usize,
    pub postings_rejected: usize,
    /// Write errors, including constraint violations that are not a
    /// duplicate (e.g. the employer row was never stored). Duplicates are
    /// skipped by the store and land in `postings_existing`.
    pub postings_failed: usize,
    pub posting_fetch_failures: usize,
}

impl IngestStats {
    fn record_employer(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.employers_inserted += 1,
            UpsertOutcome::AlreadyPresent => self.employers_existing += 1,
        }
    }

    fn record_posting(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.postings_inserted += 1,
            UpsertOutcome::AlreadyPresent => self.postings_existing += 1,
        }
    }

    /// Records skipped for any reason (rejected or failed to write).
    pub fn skipped(&self) -> usize {
        self.employers_rejected
            + self.employers_failed
            + self.postings_rejected
            + self.postings_failed
    }
}

pub struct Ingester<C> {
    catalog: C,
}

impl<C: Catalog> Ingester<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    pub fn run(&self, store: &Store) -> Result<IngestStats, IngestError> {
        let employers = self.catalog.fetch_employers()?;
        info!(count = employers.len(), "fetched employers");

        let mut stats = IngestStats {
            employers_fetched: employers.len(),
            ..IngestStats::default()
        };

        for record in &employers {
            self.ingest_employer(store, record, &mut stats)?;
        }

        info!(
            employers_new = stats.employers_inserted,
            employers_known = stats.employers_existing,
            postings_new = stats.postings_inserted,
            postings_known = stats.postings_existing,
            skipped = stats.skipped(),
            "ingestion finished"
        );
        Ok(stats)
    }

    fn ingest_employer(
        &self,
        store: &Store,
        record: &EmployerRecord,
        stats: &mut IngestStats,
    ) -> Result<(), IngestError> {
        let employer = match validate_employer(record) {
            Admission::Accepted(employer) => employer,
            Admission::Rejected(reason) => {
                warn!(?record, %reason, "skipping employer");
                stats.employers_rejected += 1;
                return Ok(());
            }
        };

        match store.upsert_employer(record) {
            Ok(outcome) => stats.record_employer(outcome),
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                warn!(employer_id = %employer.id, error = %err, "failed to store employer");
                stats.employers_failed += 1;
                return Ok(());
            }
        }

        let postings = self
            .catalog
            .fetch_postings(&employer.id)
            .unwrap_or_else(|err| {
                warn!(employer_id = %employer.id, error = %err, "posting fetch failed");
                stats.posting_fetch_failures += 1;
                Vec::new()
            });
        info!(employer = %employer.name, count = postings.len(), "fetched postings");
        stats.postings_fetched += postings.len();

        for posting in &postings {
            self.ingest_posting(store, posting, &employer.id, stats)?;
        }
        Ok(())
    }

    fn ingest_posting(
        &self,
        store: &Store,
        record: &PostingRecord,
        employer_id: &str,
        stats: &mut IngestStats,
    ) -> Result<(), StoreError> {
        if let Admission::Rejected(reason) = validate_posting(record) {
            warn!(employer_id, posting_id = ?record.id, %reason, "skipping posting");
            stats.postings_rejected += 1;
            return Ok(());
        }

        match store.upsert_posting(record, employer_id) {
            Ok(outcome) => stats.record_posting(outcome),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(
                    employer_id,
                    posting_id = ?record.id,
                    error = %err,
                    "failed to store posting"
                );
                stats.postings_failed += 1;
            }
        }
        Ok(())
    }
}
