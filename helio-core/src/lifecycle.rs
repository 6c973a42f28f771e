//! Documents returned by the data-subject lifecycle operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::enums::ProjectStatus;
use crate::records::{CalculationRecord, ErasureReport, ProjectRecord};
use crate::Timestamp;

/// Latest calculation as it appears inside an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationExport {
    pub calculation_id: Uuid,
    pub annual_kwh: Option<f64>,
    pub shading_loss_pct: Option<f64>,
    pub financial_data: Value,
    pub created_at: Option<Timestamp>,
}

impl From<&CalculationRecord> for CalculationExport {
    fn from(calc: &CalculationRecord) -> Self {
        Self {
            calculation_id: calc.id.as_uuid(),
            annual_kwh: calc.annual_kwh,
            shading_loss_pct: calc.shading_loss_pct,
            financial_data: calc.financial_data.to_export_value(),
            created_at: calc.created_at,
        }
    }
}

/// Full portable copy of everything stored about a project.
///
/// Absent values serialise as explicit `null`, never as missing keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub project_id: Uuid,
    pub project_name: Option<String>,
    pub status: ProjectStatus,
    pub cost_usd: Option<f64>,
    pub location_lat: Option<f64>,
    pub location_lon: Option<f64>,
    pub metadata: Value,
    pub created_at: Option<Timestamp>,
    pub calculation_data: Option<CalculationExport>,
    pub export_timestamp: Timestamp,
    pub gdpr_compliant: bool,
}

impl ExportDocument {
    pub fn build(
        project: &ProjectRecord,
        calculation: Option<&CalculationRecord>,
        exported_at: Timestamp,
    ) -> Self {
        Self {
            project_id: project.id.as_uuid(),
            project_name: project.name.clone(),
            status: project.status.clone(),
            cost_usd: project.cost_usd,
            location_lat: project.location_lat,
            location_lon: project.location_lon,
            metadata: project.metadata.to_export_value(),
            created_at: project.created_at,
            calculation_data: calculation.map(CalculationExport::from),
            export_timestamp: exported_at,
            gdpr_compliant: true,
        }
    }
}

/// Confirmation returned after a successful erasure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionConfirmation {
    pub message: String,
    pub project_id: Uuid,
    pub calculations_deleted: u64,
    pub deleted_at: Timestamp,
    pub gdpr_compliant: bool,
}

impl DeletionConfirmation {
    pub fn from_report(report: &ErasureReport, deleted_at: Timestamp) -> Self {
        Self {
            message: "Project data deleted successfully".to_string(),
            project_id: report.project_id.as_uuid(),
            calculations_deleted: report.calculations_deleted,
            deleted_at,
            gdpr_compliant: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_map::StoredJson;
    use crate::identifiers::{CalculationId, ProjectId};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_export_contains_every_field() {
        let created = Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap();
        let project = ProjectRecord::new(ProjectId::new_v4(), ProjectStatus::Paid)
            .with_name("Test Project")
            .with_location(35.79, -78.78)
            .with_cost(10000.0)
            .with_metadata(StoredJson::Text(r#"{"key":"value"}"#.into()))
            .with_created_at(created);
        let calc = CalculationRecord::new(CalculationId::new_v4(), project.id)
            .with_yield(10000.0, 0.05)
            .with_financial_data(StoredJson::Text(r#"{"financial_key":"financial_value"}"#.into()));

        let doc = ExportDocument::build(&project, Some(&calc), Utc::now());
        let json = serde_json::to_value(&doc).unwrap();

        for field in ["project_name", "location_lat", "location_lon", "cost_usd", "status"] {
            assert!(!json[field].is_null(), "{field} should be present");
        }
        assert_eq!(json["metadata"], json!({"key": "value"}));
        assert_eq!(json["created_at"], "2023-01-01T10:00:00Z");
        assert_eq!(json["calculation_data"]["annual_kwh"], 10000.0);
        assert_eq!(json["calculation_data"]["shading_loss_pct"], 0.05);
        assert_eq!(
            json["calculation_data"]["financial_data"]["financial_key"],
            "financial_value"
        );
        assert_eq!(json["gdpr_compliant"], true);
    }

    #[test]
    fn test_export_absent_fields_are_null() {
        let project = ProjectRecord::new(ProjectId::new_v4(), ProjectStatus::Pending);
        let json = serde_json::to_value(ExportDocument::build(&project, None, Utc::now())).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.contains_key("project_name"));
        assert!(json["project_name"].is_null());
        assert!(json["metadata"].is_null());
        assert!(json["calculation_data"].is_null());
    }
}
