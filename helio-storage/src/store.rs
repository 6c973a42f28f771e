//! Project store interface and an in-memory implementation.
//!
//! The service only ever reads a project, reads its latest calculation,
//! erases both, or pings the store for health. Nothing else of the upstream
//! database is visible here.

use async_trait::async_trait;
use helio_core::{
    CalculationRecord, ErasureReport, ProjectId, ProjectRecord, ReportError, ReportResult,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::RwLock;

/// Narrow query interface over the upstream project database.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Get a project by ID.
    async fn project_get(&self, id: ProjectId) -> ReportResult<Option<ProjectRecord>>;

    /// Get the most recently created calculation of a project.
    async fn calculation_latest(
        &self,
        project_id: ProjectId,
    ) -> ReportResult<Option<CalculationRecord>>;

    /// Delete every calculation of a project, then the project itself.
    ///
    /// Both deletions commit together or not at all. A project that does not
    /// exist yields `ReportError::NotFound`.
    async fn erase_project(&self, id: ProjectId) -> ReportResult<ErasureReport>;

    /// Cheap round trip used by the health endpoint.
    async fn ping(&self) -> ReportResult<()>;
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// A mutation the in-memory store performed, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    DeleteCalculations { project_id: ProjectId, count: u64 },
    DeleteProject { project_id: ProjectId },
}

#[derive(Debug, Default)]
struct Tables {
    projects: HashMap<ProjectId, ProjectRecord>,
    /// Insertion order breaks ties between equal `created_at` values.
    calculations: Vec<CalculationRecord>,
}

/// In-memory store for tests and local runs.
///
/// Enforces the same referential rule as the real schema: a calculation can
/// only be inserted for an existing project, and a project cannot be removed
/// while calculations still reference it.
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    tables: RwLock<Tables>,
    operations: Mutex<Vec<StoreOperation>>,
    unavailable: AtomicBool,
    fail_project_delete: AtomicBool,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_project(&self, project: ProjectRecord) {
        self.tables
            .write()
            .await
            .projects
            .insert(project.id, project);
    }

    pub async fn insert_calculation(&self, calculation: CalculationRecord) -> ReportResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.projects.contains_key(&calculation.project_id) {
            return Err(ReportError::upstream(format!(
                "foreign key violation: project {} does not exist",
                calculation.project_id
            )));
        }
        tables.calculations.push(calculation);
        Ok(())
    }

    pub async fn project_count(&self) -> usize {
        self.tables.read().await.projects.len()
    }

    pub async fn calculation_count(&self, project_id: ProjectId) -> usize {
        self.tables
            .read()
            .await
            .calculations
            .iter()
            .filter(|c| c.project_id == project_id)
            .count()
    }

    /// Mutations performed so far.
    pub fn operations(&self) -> Vec<StoreOperation> {
        self.operations
            .lock()
            .map(|ops| ops.clone())
            .unwrap_or_default()
    }

    /// Make every call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make the project-row deletion of the next erasures fail, after the
    /// calculation rows were already deleted inside the transaction.
    pub fn fail_project_delete(&self, fail: bool) {
        self.fail_project_delete.store(fail, Ordering::SeqCst);
    }

    fn check_available(&self) -> ReportResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ReportError::upstream("connection refused"));
        }
        Ok(())
    }

    fn log(&self, op: StoreOperation) {
        if let Ok(mut ops) = self.operations.lock() {
            ops.push(op);
        }
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn project_get(&self, id: ProjectId) -> ReportResult<Option<ProjectRecord>> {
        self.check_available()?;
        Ok(self.tables.read().await.projects.get(&id).cloned())
    }

    async fn calculation_latest(
        &self,
        project_id: ProjectId,
    ) -> ReportResult<Option<CalculationRecord>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .calculations
            .iter()
            .enumerate()
            .filter(|(_, c)| c.project_id == project_id)
            .max_by_key(|(idx, c)| (c.created_at, *idx))
            .map(|(_, c)| c.clone()))
    }

    async fn erase_project(&self, id: ProjectId) -> ReportResult<ErasureReport> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if !tables.projects.contains_key(&id) {
            return Err(ReportError::project_not_found(id.as_uuid()));
        }

        // Stage the deletion so a failure leaves both tables untouched.
        let remaining: Vec<CalculationRecord> = tables
            .calculations
            .iter()
            .filter(|c| c.project_id != id)
            .cloned()
            .collect();
        let calculations_deleted = (tables.calculations.len() - remaining.len()) as u64;

        if self.fail_project_delete.load(Ordering::SeqCst) {
            return Err(ReportError::upstream(format!(
                "failed to delete project row {id}, transaction rolled back"
            )));
        }

        tables.calculations = remaining;
        tables.projects.remove(&id);
        drop(tables);

        self.log(StoreOperation::DeleteCalculations {
            project_id: id,
            count: calculations_deleted,
        });
        self.log(StoreOperation::DeleteProject { project_id: id });

        Ok(ErasureReport {
            project_id: id,
            calculations_deleted,
        })
    }

    async fn ping(&self) -> ReportResult<()> {
        self.check_available()
    }
}
