//! Report rendering: template selection, markup rendering, PDF compilation.
//!
//! Both engines sit behind traits so tests can count or break them. The
//! pipeline treats them as pure functions of their input and never returns
//! partial output: either the full document is produced or a
//! [`ReportError::Render`] is.

pub mod pdf;
pub mod templates;

pub use pdf::{PageConfig, PdfCompiler};
pub use templates::BuiltinTemplates;

use std::sync::Arc;

use bytes::Bytes;
use helio_core::{RenderModel, ReportError, ReportFormat, ReportResult};

/// Failure inside a rendering engine.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Document compilation failed: {0}")]
    Compile(String),
}

impl From<RenderError> for ReportError {
    fn from(e: RenderError) -> Self {
        ReportError::render(e.to_string())
    }
}

/// Renders a model into markup with a named template.
pub trait TemplateRenderer: Send + Sync {
    fn has_template(&self, name: &str) -> bool;

    fn render(&self, model: &RenderModel, template: &str) -> Result<String, RenderError>;
}

/// Compiles markup into document bytes.
pub trait DocumentCompiler: Send + Sync {
    fn compile(&self, markup: &str) -> Result<Bytes, RenderError>;
}

/// Template renderer plus document compiler.
#[derive(Clone)]
pub struct RenderPipeline {
    renderer: Arc<dyn TemplateRenderer>,
    compiler: Arc<dyn DocumentCompiler>,
}

impl RenderPipeline {
    pub fn new(renderer: Arc<dyn TemplateRenderer>, compiler: Arc<dyn DocumentCompiler>) -> Self {
        Self { renderer, compiler }
    }

    /// Built-in templates compiled with the default page setup.
    pub fn builtin() -> Self {
        Self::new(
            Arc::new(BuiltinTemplates::new()),
            Arc::new(PdfCompiler::default()),
        )
    }

    /// Template used for `format`, falling back to the detailed template when
    /// the renderer does not provide the requested one.
    pub fn select_template(&self, format: ReportFormat) -> &'static str {
        let wanted = format.template_name();
        if self.renderer.has_template(wanted) {
            wanted
        } else {
            tracing::warn!(
                template = wanted,
                "Template unavailable, falling back to detailed"
            );
            ReportFormat::Detailed.template_name()
        }
    }

    /// Render and compile one report.
    ///
    /// Runs on the blocking pool; both engines are CPU bound.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Render` if either engine fails.
    pub async fn produce(&self, model: RenderModel, format: ReportFormat) -> ReportResult<Bytes> {
        let template = self.select_template(format);
        let renderer = Arc::clone(&self.renderer);
        let compiler = Arc::clone(&self.compiler);

        tokio::task::spawn_blocking(move || {
            let markup = renderer.render(&model, template)?;
            compiler.compile(&markup)
        })
        .await
        .map_err(|e| ReportError::render(format!("render task failed: {e}")))?
        .map_err(ReportError::from)
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use helio_core::{
        assemble, CalculationId, CalculationRecord, ProjectId, ProjectRecord, ProjectStatus,
    };

    struct DetailedOnly;

    impl TemplateRenderer for DetailedOnly {
        fn has_template(&self, name: &str) -> bool {
            name == ReportFormat::Detailed.template_name()
        }

        fn render(&self, _model: &RenderModel, template: &str) -> Result<String, RenderError> {
            Ok(format!("<p>{template}</p>"))
        }
    }

    struct BrokenCompiler;

    impl DocumentCompiler for BrokenCompiler {
        fn compile(&self, _markup: &str) -> Result<Bytes, RenderError> {
            Err(RenderError::Compile("font cache unavailable".into()))
        }
    }

    fn model() -> RenderModel {
        let project_id = ProjectId::new_v4();
        let project = ProjectRecord::new(project_id, ProjectStatus::Paid).with_name("Roof A");
        let calc = CalculationRecord::new(CalculationId::new_v4(), project_id)
            .with_yield(10_000.0, 0.05);
        assemble(&project, &calc, true, Utc::now())
    }

    #[test]
    fn test_missing_template_falls_back_to_detailed() {
        let pipeline = RenderPipeline::new(Arc::new(DetailedOnly), Arc::new(PdfCompiler::default()));
        assert_eq!(
            pipeline.select_template(ReportFormat::Summary),
            "report_detailed.html"
        );
    }

    #[test]
    fn test_builtin_templates_are_distinct() {
        let pipeline = RenderPipeline::builtin();
        assert_ne!(
            pipeline.select_template(ReportFormat::Summary),
            pipeline.select_template(ReportFormat::Detailed)
        );
    }

    #[tokio::test]
    async fn test_produce_returns_pdf() {
        let bytes = RenderPipeline::builtin()
            .produce(model(), ReportFormat::Detailed)
            .await
            .expect("render should succeed");
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_compile_failure_is_opaque_render_error() {
        let pipeline = RenderPipeline::new(
            Arc::new(BuiltinTemplates::new()),
            Arc::new(BrokenCompiler),
        );
        let err = pipeline
            .produce(model(), ReportFormat::Summary)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Render { .. }));
    }
}
