//! Cache keys for rendered reports.
//!
//! A rendered report depends on three inputs: the project, the format and
//! whether financial data was included. `ReportCacheKey` can only be built
//! from all three, so two variants of the same project can never share an
//! entry.

use helio_core::{ProjectId, ReportFormat};
use std::fmt;

/// Prefix shared by every report key.
const KEY_PREFIX: &str = "report";

/// Key of one rendered report variant.
///
/// # Format
///
/// `report:{project uuid}:{detailed|summary}:{financial|standard}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportCacheKey {
    inner: KeyInner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct KeyInner {
    project_id: ProjectId,
    format: ReportFormat,
    include_financial: bool,
}

impl ReportCacheKey {
    pub fn new(project_id: ProjectId, format: ReportFormat, include_financial: bool) -> Self {
        Self {
            inner: KeyInner {
                project_id,
                format,
                include_financial,
            },
        }
    }

    pub fn project_id(&self) -> ProjectId {
        self.inner.project_id
    }

    pub fn format(&self) -> ReportFormat {
        self.inner.format
    }

    pub fn include_financial(&self) -> bool {
        self.inner.include_financial
    }

    /// Every key a project's reports can be cached under.
    pub fn variants(project_id: ProjectId) -> impl Iterator<Item = ReportCacheKey> {
        ReportFormat::ALL.into_iter().flat_map(move |format| {
            [true, false]
                .into_iter()
                .map(move |financial| ReportCacheKey::new(project_id, format, financial))
        })
    }

    /// Encode to the opaque string the cache stores.
    pub fn encode(&self) -> String {
        let financial = if self.inner.include_financial {
            "financial"
        } else {
            "standard"
        };
        format!(
            "{KEY_PREFIX}:{}:{}:{financial}",
            self.inner.project_id,
            self.inner.format.as_str()
        )
    }

    /// Decode a key produced by [`ReportCacheKey::encode`].
    pub fn decode(raw: &str) -> Option<Self> {
        let mut parts = raw.split(':');
        if parts.next()? != KEY_PREFIX {
            return None;
        }
        let project_id = ProjectId::parse(parts.next()?).ok()?;
        let format = match parts.next()? {
            "detailed" => ReportFormat::Detailed,
            "summary" => ReportFormat::Summary,
            _ => return None,
        };
        let include_financial = match parts.next()? {
            "financial" => true,
            "standard" => false,
            _ => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(project_id, format, include_financial))
    }
}

impl fmt::Display for ReportCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
