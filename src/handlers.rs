use crate::config::Config;
use crate::errors::AppError;
use crate::export::{fetch_dataset, run_export, ExportOptions};
use crate::fetcher::{PgDataSource, ResponseDataSource};
use crate::models::{ExportRequest, SummaryQuery};
use crate::schema::parse_questionnaire;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use moka::future::Cache;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Questionnaire text cache (checksum-validated entries), keyed per
    /// survey id. Skips the survey round trip on repeated exports.
    pub questionnaire_cache: Cache<String, String>,
}

impl AppState {
    /// Builds the Postgres data source backing one request.
    fn data_source(&self) -> PgDataSource {
        PgDataSource::new(self.db.clone(), self.questionnaire_cache.clone())
    }
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "survey-export-api",
            "version": "0.1.0"
        })),
    )
}

/// GET /api/v1/campaigns/:id/questions
///
/// Returns the parsed question list for a campaign's survey. A malformed
/// questionnaire yields an empty list, mirroring export behavior.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `id` - The UUID of the campaign.
///
/// # Returns
///
/// * `Result<Json<serde_json::Value>, AppError>` - The question list or an error.
pub async fn get_campaign_questions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("GET /campaigns/{}/questions", id);

    let source = state.data_source();
    let campaign = source.fetch_campaign(id).await?;
    let questionnaire = source.fetch_questionnaire(campaign.survey_id).await?;
    let schema = parse_questionnaire(&questionnaire);

    Ok(Json(json!({
        "campaign_id": campaign.id,
        "campaign_name": campaign.name,
        "questions": schema.questions,
    })))
}

/// GET /api/v1/campaigns/:id/summary
///
/// Aggregate statistics per chartable question, as JSON. This is the
/// server-side counterpart of the deck export: same scope and eligibility
/// rules, no document.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `id` - The UUID of the campaign.
/// * `params` - Optional instance scope.
///
/// # Returns
///
/// * `Result<Json<serde_json::Value>, AppError>` - Per-question statistics or an error.
pub async fn get_campaign_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("GET /campaigns/{}/summary - params: {:?}", id, params);

    let source = state.data_source();
    let dataset = fetch_dataset(&source, id, params.instance_id).await?;

    let questions: Vec<serde_json::Value> = dataset
        .schema
        .questions
        .iter()
        .filter(|q| q.question_type.is_chartable())
        .map(|q| {
            let answers = crate::aggregate::answers_for(&dataset.responses, &q.name);
            json!({
                "name": q.name,
                "title": q.title,
                "stat": crate::aggregate::aggregate_question(q, &answers),
            })
        })
        .collect();

    Ok(Json(json!({
        "campaign_id": dataset.campaign.id,
        "campaign_name": dataset.campaign.name,
        "instance_id": dataset.instance.as_ref().map(|i| i.id),
        "response_count": dataset.responses.len(),
        "questions": questions,
    })))
}

/// POST /api/v1/campaigns/:id/export
///
/// Runs the full export pipeline and responds with the deck bytes. The
/// request body is optional; omitted options fall back to config defaults.
/// Progress is reported to the log; the HTTP path has no streaming channel.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `id` - The UUID of the campaign.
/// * `request` - Export options (instance scope, dimensions, slide toggles,
///   filename, theme).
///
/// # Returns
///
/// * `Result<impl IntoResponse, AppError>` - The deck document as an
///   attachment, or an error.
pub async fn export_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    request: Option<Json<ExportRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    tracing::info!("POST /campaigns/{}/export - options: {:?}", id, request);

    if let Some(dimensions) = request.dimensions.as_ref() {
        if dimensions.is_empty() {
            return Err(AppError::BadRequest(
                "dimensions must not be an empty list; omit it for the default set".to_string(),
            ));
        }
    }

    let options = ExportOptions::from_request(request, &state.config);
    let source = state.data_source();

    let artifact = run_export(&source, id, &options, |pct| {
        tracing::debug!("Export progress: {:.1}%", pct);
    })
    .await?;

    tracing::info!(
        "Export for campaign {} produced {} slides ({} bytes)",
        id,
        artifact.slide_count,
        artifact.bytes.len()
    );

    let headers = [
        (
            header::CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.file_name),
        ),
    ];
    Ok((headers, artifact.bytes))
}
