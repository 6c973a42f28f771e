//! In-process application for router-level tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use helio_api::{
    create_router, ApiConfig, AppState, DocumentCompiler, PdfCompiler, RenderError,
    RenderPipeline,
};
use helio_api::render::BuiltinTemplates;
use helio_core::{ProjectId, ProjectRecord, ProjectStatus};
use helio_storage::{AuditSink, InMemoryAuditSink, InMemoryProjectStore, InMemoryReportCache};
use helio_test_utils::fixtures;
use tower::ServiceExt;

/// PDF compiler that counts its invocations.
#[derive(Default)]
pub struct CountingCompiler {
    inner: PdfCompiler,
    calls: AtomicUsize,
}

impl CountingCompiler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentCompiler for CountingCompiler {
    fn compile(&self, markup: &str) -> Result<Bytes, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compile(markup)
    }
}

/// Compiler that always fails.
pub struct FailingCompiler;

impl DocumentCompiler for FailingCompiler {
    fn compile(&self, _markup: &str) -> Result<Bytes, RenderError> {
        Err(RenderError::Compile("font subsystem crashed at /opt/fonts".to_string()))
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body should be JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryProjectStore>,
    pub cache: Arc<InMemoryReportCache>,
    pub audit: Arc<InMemoryAuditSink>,
    pub compiler: Arc<CountingCompiler>,
}

impl TestApp {
    /// Default configuration with rate limiting disabled.
    pub fn new() -> Self {
        Self::with_config(ApiConfig {
            rate_limit_enabled: false,
            ..ApiConfig::default()
        })
    }

    pub fn with_config(config: ApiConfig) -> Self {
        Self::with_parts(config, None, None)
    }

    /// Replace the recorded audit trail and/or the counting compiler.
    pub fn with_parts(
        config: ApiConfig,
        audit: Option<Arc<dyn AuditSink>>,
        compiler: Option<Arc<dyn DocumentCompiler>>,
    ) -> Self {
        let store = Arc::new(InMemoryProjectStore::new());
        let cache = Arc::new(InMemoryReportCache::new());
        let recorded = Arc::new(InMemoryAuditSink::new());
        let counting = Arc::new(CountingCompiler::default());

        let audit_sink: Arc<dyn AuditSink> = match audit {
            Some(sink) => sink,
            None => recorded.clone(),
        };
        let compiler: Arc<dyn DocumentCompiler> = match compiler {
            Some(compiler) => compiler,
            None => counting.clone(),
        };
        let pipeline = RenderPipeline::new(Arc::new(BuiltinTemplates::new()), compiler);

        let state = AppState::new(config, store.clone(), cache.clone(), pipeline, audit_sink);
        Self {
            router: create_router(state),
            store,
            cache,
            audit: recorded,
            compiler: counting,
        }
    }

    /// Insert a paid project with one calculation.
    pub async fn seed_paid(&self, name: &str) -> ProjectId {
        let project = fixtures::paid_project(name);
        let id = project.id;
        self.store.insert_project(project).await;
        self.store
            .insert_calculation(fixtures::calculation_for(id))
            .await
            .expect("calculation insert should succeed");
        id
    }

    /// Insert a project without any calculation.
    pub async fn seed_project(&self, status: ProjectStatus) -> ProjectRecord {
        let project = fixtures::project_with_status(status);
        self.store.insert_project(project.clone()).await;
        project
    }

    pub async fn request(&self, method: Method, uri: &str) -> TestResponse {
        self.request_from(method, uri, None).await
    }

    pub async fn request_from(
        &self,
        method: Method,
        uri: &str,
        client: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(client) = client {
            builder = builder.header("x-forwarded-for", client);
        }
        let request = builder.body(Body::empty()).expect("request should build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
