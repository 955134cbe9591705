//! HTTP transport for [`AnalyzerService`]
//!
//! JSON in, JSON out, every route under `/api`. Failures render as
//! `{"error": {"code": ..., "message": ...}}` with the status from
//! [`AnalyzerError::status_code`].

use crate::analyser::lifecycle::EntrySummary;
use crate::commands::{
    AnalyzerService, AnovaRequest, ApplyPipelineRequest, CleanMissingRequest,
    HypothesisTestRequest, NormalityTestRequest, RegressionRequest, RemoveOutliersRequest,
    ScaleDataRequest,
};
use crate::config::AppConfig;
use crate::error::AnalyzerError;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// [`AnalyzerError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(AnalyzerError);

impl From<AnalyzerError> for ApiError {
    fn from(err: AnalyzerError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AnalyzerError::InvalidParameter(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self.0);
        }

        let body = Json(ErrorResponse {
            error: ErrorBody {
                code: self.0.error_code(),
                message: self.0.to_string(),
            },
        });
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Runs a service call on the blocking pool.
async fn run_blocking<T, F>(service: AnalyzerService, call: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&AnalyzerService) -> crate::error::Result<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| AnalyzerError::Other(format!("Worker task failed: {e}")))?;
    Ok(Json(result?))
}

pub fn router(service: AnalyzerService, max_upload_bytes: usize) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/datasets", get(list_datasets))
        .route("/datasets/{id}", axum::routing::delete(evict_dataset))
        .route("/datasets/{id}/lineage", get(lineage))
        .route("/datasets/{id}/children", get(children))
        .route("/data-preview/{id}", get(data_preview))
        .route("/clean-missing", post(clean_missing))
        .route("/remove-outliers", post(remove_outliers))
        .route("/scale-data", post(scale_data))
        .route("/apply-pipeline", post(apply_pipeline))
        .route("/statistics/{id}", get(statistics))
        .route("/correlation/{id}", get(correlation))
        .route("/hypothesis-test", post(hypothesis_test))
        .route("/anova", post(anova))
        .route("/regression", post(regression))
        .route("/normality-test", post(normality_test));

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn serve(config: &AppConfig) -> anyhow::Result<()> {
    let service = AnalyzerService::new(config.analysis.clone());
    let app = router(service, config.server.max_upload_bytes);

    let address = config.server.address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Listening on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health(State(service): State<AnalyzerService>) -> ApiResult<impl Serialize> {
    Ok(Json(service.health()?))
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    filename: Option<String>,
    format: Option<String>,
}

async fn upload(
    State(service): State<AnalyzerService>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<impl Serialize> {
    if body.is_empty() {
        return Err(AnalyzerError::Parse("Upload body is empty".to_owned()).into());
    }
    let filename = params.filename.unwrap_or_else(|| "upload".to_owned());
    run_blocking(service, move |s| {
        s.upload(&body, &filename, params.format.as_deref())
    })
    .await
}

async fn list_datasets(State(service): State<AnalyzerService>) -> ApiResult<Vec<EntrySummary>> {
    Ok(Json(service.datasets()?))
}

async fn lineage(
    State(service): State<AnalyzerService>,
    Path(id): Path<String>,
) -> ApiResult<Vec<EntrySummary>> {
    Ok(Json(service.lineage(&id)?))
}

async fn children(
    State(service): State<AnalyzerService>,
    Path(id): Path<String>,
) -> ApiResult<Vec<EntrySummary>> {
    Ok(Json(service.children(&id)?))
}

async fn evict_dataset(
    State(service): State<AnalyzerService>,
    Path(id): Path<String>,
) -> ApiResult<EntrySummary> {
    Ok(Json(service.evict(&id)?))
}

#[derive(Debug, Deserialize)]
struct PreviewParams {
    rows: Option<usize>,
}

async fn data_preview(
    State(service): State<AnalyzerService>,
    Path(id): Path<String>,
    Query(params): Query<PreviewParams>,
) -> ApiResult<impl Serialize> {
    Ok(Json(service.data_preview(&id, params.rows)?))
}

async fn clean_missing(
    State(service): State<AnalyzerService>,
    payload: Result<Json<CleanMissingRequest>, JsonRejection>,
) -> ApiResult<impl Serialize> {
    let Json(request) = payload?;
    run_blocking(service, move |s| s.clean_missing(&request)).await
}

async fn remove_outliers(
    State(service): State<AnalyzerService>,
    payload: Result<Json<RemoveOutliersRequest>, JsonRejection>,
) -> ApiResult<impl Serialize> {
    let Json(request) = payload?;
    run_blocking(service, move |s| s.remove_outliers(&request)).await
}

async fn scale_data(
    State(service): State<AnalyzerService>,
    payload: Result<Json<ScaleDataRequest>, JsonRejection>,
) -> ApiResult<impl Serialize> {
    let Json(request) = payload?;
    run_blocking(service, move |s| s.scale_data(&request)).await
}

async fn apply_pipeline(
    State(service): State<AnalyzerService>,
    payload: Result<Json<ApplyPipelineRequest>, JsonRejection>,
) -> ApiResult<impl Serialize> {
    let Json(request) = payload?;
    run_blocking(service, move |s| s.apply_pipeline(&request)).await
}

async fn statistics(
    State(service): State<AnalyzerService>,
    Path(id): Path<String>,
) -> ApiResult<impl Serialize> {
    run_blocking(service, move |s| s.statistics(&id)).await
}

async fn correlation(
    State(service): State<AnalyzerService>,
    Path(id): Path<String>,
) -> ApiResult<impl Serialize> {
    run_blocking(service, move |s| s.correlation(&id)).await
}

async fn hypothesis_test(
    State(service): State<AnalyzerService>,
    payload: Result<Json<HypothesisTestRequest>, JsonRejection>,
) -> ApiResult<impl Serialize> {
    let Json(request) = payload?;
    run_blocking(service, move |s| s.hypothesis_test(&request)).await
}

async fn anova(
    State(service): State<AnalyzerService>,
    payload: Result<Json<AnovaRequest>, JsonRejection>,
) -> ApiResult<impl Serialize> {
    let Json(request) = payload?;
    run_blocking(service, move |s| s.anova(&request)).await
}

async fn regression(
    State(service): State<AnalyzerService>,
    payload: Result<Json<RegressionRequest>, JsonRejection>,
) -> ApiResult<impl Serialize> {
    let Json(request) = payload?;
    run_blocking(service, move |s| s.regression(&request)).await
}

async fn normality_test(
    State(service): State<AnalyzerService>,
    payload: Result<Json<NormalityTestRequest>, JsonRejection>,
) -> ApiResult<impl Serialize> {
    let Json(request) = payload?;
    run_blocking(service, move |s| s.normality_test(&request)).await
}
