//! Shared fixtures for fda-analyzer integration tests
//!
//! - Scripted pipeline stages (immediate, deferred, stalled, failing) that record
//!   every invocation
//! - A scripted model client and a fixed-text document source for agent tests
//! - Multipart body construction and router helpers

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use fda_analyzer::agents::{build_stages, AgentContext};
use fda_analyzer::document::{DocumentSource, DocumentText};
use fda_analyzer::intake::{Intake, IntakeLimits};
use fda_analyzer::model::{ModelClient, ModelError, ModelPrompt};
use fda_analyzer::models::analysis::DEFAULT_QUERY;
use fda_analyzer::models::StageKind;
use fda_analyzer::pipeline::{
    AnalysisStage, ExecutionNormalizer, PipelineRunner, StageCall, StageError, StageInput,
};
use fda_analyzer::AppState;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const MIB: usize = 1024 * 1024;

// ============================================================================
// Scripted stages
// ============================================================================

/// What a scripted stage does when invoked
#[derive(Clone)]
pub enum Script {
    /// Return `{"text": "<stage> output"}` immediately
    Immediate,
    /// Return the same payload from a deferred computation
    Deferred,
    /// Deferred computation that never resolves
    Stall,
    /// Fail immediately with the produced error
    Fail(fn() -> StageError),
}

/// One observed stage invocation
#[derive(Debug, Clone)]
pub struct StageCallRecord {
    pub stage: StageKind,
    pub previous: Option<StageKind>,
    pub artifact_path: PathBuf,
    pub artifact_exists: bool,
    pub query: String,
}

pub type CallLog = Arc<Mutex<Vec<StageCallRecord>>>;

pub struct ScriptedStage {
    kind: StageKind,
    script: Script,
    log: CallLog,
}

pub fn stage_output(kind: StageKind) -> Value {
    json!({ "text": format!("{} output", kind) })
}

impl AnalysisStage for ScriptedStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn invoke(&self, input: StageInput) -> StageCall<Value> {
        let path = input.request.artifact_path().to_path_buf();
        self.log.lock().unwrap().push(StageCallRecord {
            stage: self.kind,
            previous: input.previous.as_ref().map(|p| p.stage),
            artifact_exists: path.exists(),
            artifact_path: path,
            query: input.request.query().to_string(),
        });

        let output = stage_output(self.kind);
        match &self.script {
            Script::Immediate => StageCall::ready(output),
            Script::Deferred => StageCall::deferred(async move {
                tokio::task::yield_now().await;
                Ok(output)
            }),
            Script::Stall => StageCall::deferred(std::future::pending()),
            Script::Fail(make) => StageCall::fail(make()),
        }
    }
}

/// Four scripted stages in pipeline order sharing one call log
pub fn scripted_stages(scripts: [Script; 4]) -> (Vec<Arc<dyn AnalysisStage>>, CallLog) {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let stages = StageKind::ORDER
        .iter()
        .zip(scripts)
        .map(|(kind, script)| {
            Arc::new(ScriptedStage {
                kind: *kind,
                script,
                log: Arc::clone(&log),
            }) as Arc<dyn AnalysisStage>
        })
        .collect();
    (stages, log)
}

pub fn all(script: Script) -> [Script; 4] {
    [script.clone(), script.clone(), script.clone(), script]
}

pub fn logged_stages(log: &CallLog) -> Vec<StageKind> {
    log.lock().unwrap().iter().map(|r| r.stage).collect()
}

// ============================================================================
// Scripted model and document source
// ============================================================================

/// Model that answers every call except `fail_on_call` (1-based)
pub struct ScriptedModel {
    fail_on_call: Option<usize>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn answering() -> Arc<Self> {
        Arc::new(Self {
            fail_on_call: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn malformed_on(call: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_on_call: Some(call),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _prompt: &ModelPrompt) -> Result<String, ModelError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if Some(call) == self.fail_on_call {
            return Err(ModelError::Malformed("response has no choices".to_string()));
        }
        Ok(format!("Model answer {}", call))
    }
}

/// Returns the same text for any path, after checking the file is present
pub struct FixedTextSource(pub String);

#[async_trait]
impl DocumentSource for FixedTextSource {
    async fn load(&self, path: &Path) -> Result<DocumentText, StageError> {
        if !path.exists() {
            return Err(StageError::Document(format!("missing {}", path.display())));
        }
        Ok(DocumentText::from_pages(vec![self.0.clone()]))
    }
}

pub const FINANCIAL_TEXT: &str = "Consolidated Income Statement\n\
    Revenue of $10,000 and net income of 2,000 reflect strong growth\n\
    Total assets 50,000 and debt of 5,000";

// ============================================================================
// Application fixtures
// ============================================================================

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub upload_dir: TempDir,
}

impl TestApp {
    /// Files currently present in the upload directory
    pub fn artifacts(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.upload_dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }
}

pub fn app_with_stages(
    stages: Vec<Arc<dyn AnalysisStage>>,
    timeout: Duration,
    max_bytes: u64,
) -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let intake = Intake::new(
        upload_dir.path().to_path_buf(),
        IntakeLimits::new(max_bytes, 64 * 1024),
    );
    let pipeline = PipelineRunner::new(stages, ExecutionNormalizer::new(timeout)).unwrap();
    let state = AppState::new(intake, pipeline, DEFAULT_QUERY);
    let router = fda_analyzer::build_router(state.clone());

    TestApp {
        router,
        state,
        upload_dir,
    }
}

pub fn app_with_agents(model: Arc<dyn ModelClient>, text: &str) -> TestApp {
    let ctx = AgentContext::new(model, Arc::new(FixedTextSource(text.to_string())), 4000);
    app_with_stages(build_stages(ctx), Duration::from_secs(5), 10 * MIB as u64)
}

// ============================================================================
// Requests
// ============================================================================

pub enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn file_part<'a>(filename: &'a str, bytes: &'a [u8]) -> Part<'a> {
    Part::File {
        name: "file",
        filename,
        bytes,
    }
}

const BOUNDARY: &str = "fda-test-boundary-7MA4YWxkTrZu0gW";

/// Encode `parts` as multipart/form-data; returns (content type, body)
pub fn multipart_body(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/pdf\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

pub fn analyze_request(parts: &[Part<'_>]) -> Request<Body> {
    let (content_type, body) = multipart_body(parts);
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Bytes that look like a PDF upload
pub fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.resize(len.max(bytes.len()), b'0');
    bytes
}
