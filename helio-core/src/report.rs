//! Report assembly: joins a project with its latest calculation.
//!
//! [`assemble`] is a pure function. The generation timestamp is passed in
//! rather than read from the clock so identical inputs always produce an
//! identical model.

use serde::{Deserialize, Serialize};

use crate::enums::ProjectStatus;
use crate::field_map::FieldMap;
use crate::identifiers::ProjectId;
use crate::records::{CalculationRecord, ProjectRecord};
use crate::Timestamp;

/// Display name used when the project has none.
pub const UNNAMED_PROJECT: &str = "Unnamed Project";

/// Geographic position of the installation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// Everything a report template needs, with defaults already applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderModel {
    pub project_id: ProjectId,
    pub project_name: String,
    pub status: ProjectStatus,
    pub location: Location,
    pub cost_usd: f64,
    pub annual_kwh: f64,
    pub shading_loss_pct: f64,
    /// Yield after shading losses.
    pub net_annual_kwh: f64,
    /// System cost divided by net yield, zero when there is no yield.
    pub cost_per_kwh: f64,
    pub metadata: FieldMap,
    pub financial_data: FieldMap,
    pub include_financial: bool,
    pub generated_at: Timestamp,
}

/// Build the render model for a project and its authoritative calculation.
///
/// When `include_financial` is false the financial data is dropped here,
/// whatever the store holds, so no template can leak it.
pub fn assemble(
    project: &ProjectRecord,
    calculation: &CalculationRecord,
    include_financial: bool,
    generated_at: Timestamp,
) -> RenderModel {
    let net_annual_kwh = match (calculation.annual_kwh, calculation.shading_loss_pct) {
        (Some(annual), Some(loss)) => annual * (1.0 - loss),
        (annual, _) => annual.unwrap_or(0.0),
    };
    let cost_usd = project.cost_usd.unwrap_or(0.0);
    let cost_per_kwh = if net_annual_kwh > 0.0 {
        cost_usd / net_annual_kwh
    } else {
        0.0
    };

    let financial_data = if include_financial {
        calculation.financial_data.to_field_map()
    } else {
        FieldMap::new()
    };

    RenderModel {
        project_id: project.id,
        project_name: project
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNNAMED_PROJECT.to_string()),
        status: project.status.clone(),
        location: Location {
            lat: project.location_lat.unwrap_or(0.0),
            lon: project.location_lon.unwrap_or(0.0),
        },
        cost_usd,
        annual_kwh: calculation.annual_kwh.unwrap_or(0.0),
        shading_loss_pct: calculation.shading_loss_pct.unwrap_or(0.0),
        net_annual_kwh,
        cost_per_kwh,
        metadata: project.metadata.to_field_map(),
        financial_data,
        include_financial,
        generated_at,
    }
}
