//! HELIO Test Utilities
//!
//! Shared test infrastructure for the Helio workspace:
//! - Proptest generators for identifiers, formats and cache keys
//! - Failing store/cache/audit doubles for error-path tests
//! - Fixtures for paid and unpaid projects with calculations
//! - Assertions for rendered documents and audit trails

pub use helio_core::{
    Actor, AuditAction, AuditEvent, AuditOutcome, CalculationId, CalculationRecord, ErasureReport,
    ProjectId, ProjectRecord, ProjectStatus, ReportError, ReportFormat, ReportResult, StoredJson,
    Timestamp,
};
pub use helio_storage::{
    AuditError, AuditSink, CacheStats, InMemoryAuditSink, InMemoryProjectStore,
    InMemoryReportCache, ProjectStore, ReportCache, ReportCacheKey,
};

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

// ============================================================================
// FAILING DOUBLES
// ============================================================================

/// Audit sink whose every write fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn record(&self, _event: &AuditEvent) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("audit backend down".to_string()))
    }
}

/// Report cache whose every call fails as if its backend were gone.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingReportCache;

impl FailingReportCache {
    fn error() -> ReportError {
        ReportError::upstream("cache backend unavailable")
    }
}

#[async_trait]
impl ReportCache for FailingReportCache {
    async fn get(&self, _key: &str) -> ReportResult<Option<Bytes>> {
        Err(Self::error())
    }

    async fn set(&self, _key: &str, _payload: Bytes, _ttl: Duration) -> ReportResult<()> {
        Err(Self::error())
    }

    async fn delete(&self, _key: &str) -> ReportResult<bool> {
        Err(Self::error())
    }

    async fn clear(&self) -> ReportResult<u64> {
        Err(Self::error())
    }

    async fn stats(&self) -> ReportResult<CacheStats> {
        Err(Self::error())
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Helio types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a random ProjectId.
    pub fn arb_project_id() -> impl Strategy<Value = ProjectId> {
        arb_uuid().prop_map(ProjectId::new)
    }

    /// Generate a report format.
    pub fn arb_report_format() -> impl Strategy<Value = ReportFormat> {
        prop_oneof![Just(ReportFormat::Detailed), Just(ReportFormat::Summary)]
    }

    /// Generate a cache key over random identifiers and variants.
    pub fn arb_cache_key() -> impl Strategy<Value = ReportCacheKey> {
        (arb_project_id(), arb_report_format(), any::<bool>())
            .prop_map(|(id, format, include)| ReportCacheKey::new(id, format, include))
    }

    /// Generate a project status, including unrecognised stored values.
    pub fn arb_project_status() -> impl Strategy<Value = ProjectStatus> {
        prop_oneof![
            Just(ProjectStatus::Pending),
            Just(ProjectStatus::Paid),
            Just(ProjectStatus::Calculating),
            Just(ProjectStatus::Completed),
            Just(ProjectStatus::Error),
            "[a-z]{3,12}".prop_map(ProjectStatus::from),
        ]
    }

    /// Generate strings that are not UUIDs and are safe to put in a URL
    /// path segment, including percent-escapes that do not decode to UTF-8.
    pub fn arb_malformed_id() -> impl Strategy<Value = String> {
        prop_oneof![
            "[0-9]{1,12}",
            "[g-z]{1,36}",
            "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}",
            "[0-9a-f]{33,40}",
            "(%[89A-F][0-9A-F]){1,4}",
        ]
        .prop_filter("must not parse as a UUID", |s| Uuid::parse_str(s).is_err())
    }

    /// Generate a stored (annual_kwh, shading_loss fraction) pair.
    pub fn arb_yield() -> impl Strategy<Value = (f64, f64)> {
        (0.0f64..50_000.0, 0.0f64..1.0)
    }

    /// Generate a project cost in dollars.
    pub fn arb_cost() -> impl Strategy<Value = f64> {
        0.0f64..500_000.0
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common scenarios.

    use super::*;
    use serde_json::json;

    /// Annual yield stored on fixture calculations.
    pub const FIXTURE_ANNUAL_KWH: f64 = 9500.0;

    /// Shading loss (fraction) stored on fixture calculations.
    pub const FIXTURE_SHADING_LOSS: f64 = 0.05;

    /// Project cost stored on fixture projects.
    pub const FIXTURE_COST_USD: f64 = 18_500.0;

    /// Financial fields stored on fixture calculations.
    pub fn financial_data() -> serde_json::Value {
        json!({
            "annual_savings_usd": 1450.0,
            "payback_years": 8.2,
            "incentive_program": "SGIP"
        })
    }

    /// A project with the given status and every optional field filled in.
    pub fn project_with_status(status: ProjectStatus) -> ProjectRecord {
        ProjectRecord::new(ProjectId::new_v4(), status)
            .with_name("Fixture Rooftop")
            .with_location(37.7749, -122.4194)
            .with_cost(FIXTURE_COST_USD)
            .with_metadata(StoredJson::Structured(json!({
                "panel_count": 24,
                "inverter": "string"
            })))
            .with_created_at(chrono::Utc::now())
    }

    /// A paid project with the given name.
    pub fn paid_project(name: &str) -> ProjectRecord {
        project_with_status(ProjectStatus::Paid).with_name(name)
    }

    /// A calculation for `project_id` with yield and financial data.
    pub fn calculation_for(project_id: ProjectId) -> CalculationRecord {
        CalculationRecord::new(CalculationId::new_v4(), project_id)
            .with_yield(FIXTURE_ANNUAL_KWH, FIXTURE_SHADING_LOSS)
            .with_financial_data(StoredJson::Structured(financial_data()))
            .with_created_at(chrono::Utc::now())
    }

    /// A calculation whose financial data is stored as unparsable text.
    pub fn calculation_with_malformed_financials(project_id: ProjectId) -> CalculationRecord {
        CalculationRecord::new(CalculationId::new_v4(), project_id)
            .with_yield(FIXTURE_ANNUAL_KWH, FIXTURE_SHADING_LOSS)
            .with_financial_data(StoredJson::Text("{not json".to_string()))
    }

    /// An in-memory store holding one paid project with one calculation.
    pub async fn seeded_store() -> ReportResult<(InMemoryProjectStore, ProjectId)> {
        let store = InMemoryProjectStore::new();
        let project = paid_project("Seeded Project");
        let id = project.id;
        store.insert_project(project).await;
        store.insert_calculation(calculation_for(id)).await?;
        Ok((store, id))
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for rendered documents and audit trails.

    use super::*;

    /// Assert that bytes form a complete PDF document.
    #[track_caller]
    pub fn assert_pdf(bytes: &[u8]) {
        assert!(bytes.starts_with(b"%PDF-"), "missing PDF header");
        let tail = &bytes[bytes.len().saturating_sub(16)..];
        assert!(
            tail.windows(5).any(|w| w == b"%%EOF"),
            "missing PDF trailer"
        );
    }

    /// Assert that the PDF text contains `needle`.
    #[track_caller]
    pub fn assert_pdf_contains(bytes: &[u8], needle: &str) {
        let text = String::from_utf8_lossy(bytes);
        assert!(text.contains(needle), "PDF does not contain {:?}", needle);
    }

    /// Assert that the PDF text does not contain `needle`.
    #[track_caller]
    pub fn assert_pdf_lacks(bytes: &[u8], needle: &str) {
        let text = String::from_utf8_lossy(bytes);
        assert!(!text.contains(needle), "PDF unexpectedly contains {:?}", needle);
    }

    /// Assert that exactly one recorded event has `action`, and that it ended
    /// with `status`.
    #[track_caller]
    pub fn assert_single_audit(events: &[AuditEvent], action: AuditAction, status: u16) {
        let matching: Vec<&AuditEvent> = events.iter().filter(|e| e.action == action).collect();
        assert_eq!(
            matching.len(),
            1,
            "expected one {} event, got {}",
            action,
            matching.len()
        );
        assert_eq!(matching[0].outcome.status, status);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixture_project_is_entitled_only_when_paid() {
        assert!(fixtures::paid_project("A").is_entitled());
        assert!(!fixtures::project_with_status(ProjectStatus::Pending).is_entitled());
    }

    #[tokio::test]
    async fn test_seeded_store_has_calculation() -> ReportResult<()> {
        let (store, id) = fixtures::seeded_store().await?;
        assert!(store.project_get(id).await?.is_some());
        assert!(store.calculation_latest(id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_failing_doubles_fail() {
        let event = AuditEvent::new(AuditAction::ExportData, "project/x", Actor::anonymous());
        assert!(FailingAuditSink.record(&event).await.is_err());
        assert!(FailingReportCache.get("k").await.is_err());
    }

    proptest! {
        #[test]
        fn prop_malformed_ids_never_parse(raw in generators::arb_malformed_id()) {
            prop_assert!(ProjectId::parse(&raw).is_err());
        }
    }
}
