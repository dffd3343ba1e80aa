// Reconciliation pass
// Detects and repairs drift between the record store and the vector index.
// Runs out of band; normal operations never depend on it for correctness,
// only for eventual convergence after logged deletion failures.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::database::sqlite::Database;
use crate::database::vector::VectorIndexClient;
use crate::{KnowledgeError, Result};

/// Outcome of comparing relational vector ids against an index snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Registered vector ids in the record store
    pub relational_vector_ids: usize,
    /// Entries in the index snapshot
    pub index_entries: usize,
    /// Ids a slice row points at but the index does not hold (re-embed these)
    pub missing_in_index: Vec<String>,
    /// Index entries with no owning slice row (sweep these)
    pub orphaned_in_index: Vec<String>,
    pub is_consistent: bool,
}

impl ReconciliationReport {
    #[inline]
    pub fn total_issues(&self) -> usize {
        self.missing_in_index.len() + self.orphaned_in_index.len()
    }

    /// Errors with `InconsistentState` when the audit found drift.
    #[inline]
    pub fn ensure_consistent(&self) -> Result<()> {
        if self.is_consistent {
            return Ok(());
        }
        Err(KnowledgeError::InconsistentState(self.summary()))
    }

    #[inline]
    pub fn summary(&self) -> String {
        if self.is_consistent {
            format!(
                "stores are consistent: {} vector ids in records, {} index entries",
                self.relational_vector_ids, self.index_entries
            )
        } else {
            format!(
                "inconsistencies found: {} missing in index, {} orphaned in index",
                self.missing_in_index.len(),
                self.orphaned_in_index.len()
            )
        }
    }
}

/// Compares the record store against the vector index and sweeps orphans.
///
/// The index snapshot is supplied by the caller because the client interface
/// deliberately has no enumeration operation; whichever collaborator owns the
/// index exports its id list for the audit.
pub struct Reconciler<'a> {
    database: &'a Database,
    vector_index: &'a dyn VectorIndexClient,
}

impl<'a> Reconciler<'a> {
    #[inline]
    pub fn new(database: &'a Database, vector_index: &'a dyn VectorIndexClient) -> Self {
        Self {
            database,
            vector_index,
        }
    }

    /// Audit the record store against a snapshot of index ids.
    #[inline]
    pub async fn audit(&self, index_ids: &[String]) -> Result<ReconciliationReport> {
        info!("starting record-store / vector-index reconciliation audit");

        let relational_ids = self.database.list_all_vector_ids().await?;
        debug!("found [{}] registered vector ids in record store", relational_ids.len());

        let relational_set: HashSet<&String> = relational_ids.iter().collect();
        let index_set: HashSet<&String> = index_ids.iter().collect();

        let missing_in_index: Vec<String> = relational_set
            .difference(&index_set)
            .map(|id| (*id).clone())
            .collect();

        let orphaned_in_index: Vec<String> = index_set
            .difference(&relational_set)
            .map(|id| (*id).clone())
            .collect();

        let is_consistent = missing_in_index.is_empty() && orphaned_in_index.is_empty();

        let report = ReconciliationReport {
            relational_vector_ids: relational_ids.len(),
            index_entries: index_ids.len(),
            missing_in_index,
            orphaned_in_index,
            is_consistent,
        };

        if report.is_consistent {
            info!("reconciliation audit passed");
        } else {
            warn!("reconciliation audit found issues: {}", report.summary());
        }

        Ok(report)
    }

    /// Deletes orphaned index entries found by [`Self::audit`].
    ///
    /// The delete is idempotent, so repeating a partially-failed sweep is
    /// safe. Returns the number of ids submitted for deletion.
    #[inline]
    pub async fn sweep_orphans(&self, orphaned: &[String]) -> Result<usize> {
        if orphaned.is_empty() {
            return Ok(0);
        }

        info!("sweeping [{}] orphaned vector entries", orphaned.len());
        self.vector_index.delete_many(orphaned).await?;
        Ok(orphaned.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(missing: Vec<String>, orphaned: Vec<String>) -> ReconciliationReport {
        let is_consistent = missing.is_empty() && orphaned.is_empty();
        ReconciliationReport {
            relational_vector_ids: 10,
            index_entries: 10,
            missing_in_index: missing,
            orphaned_in_index: orphaned,
            is_consistent,
        }
    }

    #[test]
    fn consistent_report() {
        let report = report(vec![], vec![]);

        assert_eq!(report.total_issues(), 0);
        assert!(report.is_consistent);
        assert!(report.ensure_consistent().is_ok());
        assert!(report.summary().contains("consistent"));
    }

    #[test]
    fn inconsistent_report() {
        let report = report(vec!["v1".to_string()], vec!["v2".to_string(), "v3".to_string()]);

        assert_eq!(report.total_issues(), 3);
        assert!(!report.is_consistent);
        assert!(report.summary().contains("1 missing in index"));
        assert!(report.summary().contains("2 orphaned in index"));

        let err = report.ensure_consistent().expect_err("drift must error");
        assert!(matches!(err, KnowledgeError::InconsistentState(_)));
    }
}
