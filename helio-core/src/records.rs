//! Records read from the upstream project store.
//!
//! These mirror the `projects` and `calculations` tables. Every column the
//! store allows to be NULL is an `Option` here; defaults are applied later by
//! the assembler, never at read time, so exports stay verbatim.

use crate::enums::ProjectStatus;
use crate::field_map::StoredJson;
use crate::identifiers::{CalculationId, ProjectId};
use crate::Timestamp;

/// A row of the `projects` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub name: Option<String>,
    pub status: ProjectStatus,
    pub location_lat: Option<f64>,
    pub location_lon: Option<f64>,
    pub cost_usd: Option<f64>,
    pub metadata: StoredJson,
    pub created_at: Option<Timestamp>,
}

impl ProjectRecord {
    /// A record with only the mandatory columns set.
    pub fn new(id: ProjectId, status: ProjectStatus) -> Self {
        Self {
            id,
            name: None,
            status,
            location_lat: None,
            location_lon: None,
            cost_usd: None,
            metadata: StoredJson::Absent,
            created_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.location_lat = Some(lat);
        self.location_lon = Some(lon);
        self
    }

    pub fn with_cost(mut self, cost_usd: f64) -> Self {
        self.cost_usd = Some(cost_usd);
        self
    }

    pub fn with_metadata(mut self, metadata: StoredJson) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn is_entitled(&self) -> bool {
        self.status.is_entitled()
    }
}

/// A row of the `calculations` table.
///
/// A project may own any number of these; the most recently created one is
/// authoritative.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationRecord {
    pub id: CalculationId,
    pub project_id: ProjectId,
    pub annual_kwh: Option<f64>,
    pub shading_loss_pct: Option<f64>,
    pub financial_data: StoredJson,
    pub created_at: Option<Timestamp>,
}

impl CalculationRecord {
    pub fn new(id: CalculationId, project_id: ProjectId) -> Self {
        Self {
            id,
            project_id,
            annual_kwh: None,
            shading_loss_pct: None,
            financial_data: StoredJson::Absent,
            created_at: None,
        }
    }

    pub fn with_yield(mut self, annual_kwh: f64, shading_loss_pct: f64) -> Self {
        self.annual_kwh = Some(annual_kwh);
        self.shading_loss_pct = Some(shading_loss_pct);
        self
    }

    pub fn with_financial_data(mut self, financial_data: StoredJson) -> Self {
        self.financial_data = financial_data;
        self
    }

    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Outcome of erasing one project and its calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErasureReport {
    pub project_id: ProjectId,
    pub calculations_deleted: u64,
}
