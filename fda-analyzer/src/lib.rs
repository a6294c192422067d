//! fda-analyzer library interface
//!
//! Financial document analysis service: a PDF upload is streamed to a
//! request-scoped temporary file, run through a four-stage analysis pipeline
//! (reading, verification, advisory, risk assessment), and answered with a
//! single aggregated report or one classified error.

pub mod agents;
pub mod api;
pub mod artifact;
pub mod config;
pub mod document;
pub mod error;
pub mod intake;
pub mod model;
pub mod models;
pub mod pipeline;
pub mod signals;

pub use crate::error::{ApiResult, ClassifiedError, ErrorKind};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::intake::Intake;
use crate::pipeline::PipelineRunner;

/// Headroom above the upload ceiling for multipart framing and form fields
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<Intake>,
    pub pipeline: Arc<PipelineRunner>,
    /// Query used when the caller omits one
    pub default_query: Arc<str>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last classified failure for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(intake: Intake, pipeline: PipelineRunner, default_query: &str) -> Self {
        Self {
            intake: Arc::new(intake),
            pipeline: Arc::new(pipeline),
            default_query: Arc::from(default_query),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.intake.limits().max_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .merge(api::health_routes())
        .merge(api::analyze_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
