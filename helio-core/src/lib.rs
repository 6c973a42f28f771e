//! HELIO Core - Domain Types for the Report Service
//!
//! Pure data and pure functions shared by the storage and API crates:
//! project/calculation records as the upstream store exposes them, the
//! schema-less field maps stored alongside them, the render model assembled
//! from a project and its latest calculation, audit events, and the
//! documents produced by the data-subject lifecycle operations.
//!
//! Nothing in this crate performs I/O.

pub mod audit;
pub mod enums;
pub mod error;
pub mod field_map;
pub mod identifiers;
pub mod lifecycle;
pub mod records;
pub mod report;

pub use audit::{Actor, AuditAction, AuditEvent, AuditOutcome, ANONYMOUS_ACTOR};
pub use enums::{ProjectStatus, ReportFormat};
pub use error::{MissingEntity, ReportError, ReportResult};
pub use field_map::{FieldMap, StoredJson};
pub use identifiers::{CalculationId, ProjectId};
pub use lifecycle::{CalculationExport, DeletionConfirmation, ExportDocument};
pub use records::{CalculationRecord, ErasureReport, ProjectRecord};
pub use report::{assemble, Location, RenderModel, UNNAMED_PROJECT};

/// Timestamp type used throughout HELIO.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
