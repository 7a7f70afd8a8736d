//! HTTP Endpoints
//!
//! REST API over the growth operations. Every route works against the
//! practice configured for this deployment.

use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use practice_growth_core::{Error, ErrorKind, ReactivationStatus, ReviewPlatform, SequenceType};
use practice_growth_engine::{ReputationReport, ResponseType};
use practice_growth_service::{
    AssignmentOutcome, CaptureLeadRequest, CaptureOutcome, ConversionOutcome, LapseOutcome,
    NurtureOutcome, OutreachOutcome, ReactivationCandidate, ReactivationCriteria,
    ReactivationOutcomeResult, ReactivationOutreachOutcome, ReferralCandidate, ReferralCriteria,
    ResponseOutcome, ScoreOutcome, SnapshotInput,
};

use crate::metrics::{metrics_handler, record_error, track_requests};
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.settings.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let timeout = Duration::from_secs(server.timeout_seconds);

    let api = Router::new()
        // Leads
        .route("/api/leads", post(capture_lead))
        .route("/api/leads/:id/score", post(score_lead))
        .route("/api/leads/:id/nurture", post(nurture_lead))
        .route("/api/leads/:id/nurture/advance", post(advance_nurture))
        .route("/api/leads/:id/nurture/pause", post(pause_nurture))
        .route("/api/leads/:id/nurture/resume", post(resume_nurture))
        .route("/api/leads/:id/responses", post(handle_response))
        .route("/api/leads/:id/convert", post(record_conversion))
        .route("/api/leads/:id/assign", post(assign_lead))
        // Patients
        .route("/api/patients/:id/lapse", get(analyze_lapse))
        .route("/api/patients/:id/referral-request", post(request_referral))
        .route("/api/patients/:id/review-request", post(request_review))
        .route(
            "/api/patients/:id/reactivation/outreach",
            post(send_reactivation_outreach),
        )
        .route(
            "/api/patients/:id/reactivation/outcome",
            post(record_reactivation_outcome),
        )
        .route("/api/referrals/candidates", post(identify_referrers))
        .route(
            "/api/reactivation/candidates",
            post(identify_reactivation_candidates),
        )
        // Reputation
        .route("/api/reputation", get(get_reputation))
        .route("/api/reputation/snapshots", post(record_snapshot))
        .route_layer(middleware::from_fn(track_requests));

    api.route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer)
        .with_state(state)
}

/// CORS from configured origins; an empty list allows any origin
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.is_empty() {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(origin = %origin, "Invalid CORS origin");
                None
            })
        })
        .collect();

    if parsed.is_empty() {
        tracing::error!("All configured CORS origins are invalid, falling back to localhost");
        return base.allow_origin(HeaderValue::from_static("http://localhost:3000"));
    }

    tracing::info!(count = parsed.len(), "CORS configured");
    base.allow_origin(parsed)
}

/// Error body: `{ "error": <kind>, "message": <text> }`
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, kind = kind.as_str(), "Request rejected");
        }
        record_error(kind.as_str());

        let body = json!({
            "error": kind.as_str(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    practice_id: Uuid,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        practice_id: state.service.practice().id,
    })
}

// ---------------------------------------------------------------- leads

async fn capture_lead(
    State(state): State<AppState>,
    Json(request): Json<CaptureLeadRequest>,
) -> Result<(StatusCode, Json<CaptureOutcome>), ApiError> {
    let outcome = state.service.capture_lead(request).await?;
    let status = if outcome.is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

#[derive(Debug, Default, Deserialize)]
struct ScoreParams {
    #[serde(default)]
    force: bool,
}

async fn score_lead(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ScoreParams>,
) -> ApiResult<ScoreOutcome> {
    Ok(Json(state.service.score_lead(id, params.force).await?))
}

#[derive(Debug, Default, Deserialize)]
struct NurtureRequest {
    #[serde(default)]
    sequence: Option<SequenceType>,
}

async fn nurture_lead(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<NurtureRequest>>,
) -> ApiResult<NurtureOutcome> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(state.service.nurture_lead(id, request.sequence).await?))
}

#[derive(Debug, Default, Deserialize)]
struct AdvanceRequest {
    #[serde(default)]
    skip_to: Option<u32>,
}

async fn advance_nurture(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<AdvanceRequest>>,
) -> ApiResult<NurtureOutcome> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(
        state.service.advance_nurture_step(id, request.skip_to).await?,
    ))
}

async fn pause_nurture(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<NurtureOutcome> {
    Ok(Json(state.service.pause_nurture(id).await?))
}

#[derive(Debug, Default, Deserialize)]
struct ResumeRequest {
    #[serde(default)]
    restart: bool,
}

async fn resume_nurture(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ResumeRequest>>,
) -> ApiResult<NurtureOutcome> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(state.service.resume_nurture(id, request.restart).await?))
}

#[derive(Debug, Deserialize)]
struct ResponseRequest {
    response_type: ResponseType,
    #[serde(default)]
    content: Option<String>,
}

async fn handle_response(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResponseRequest>,
) -> ApiResult<ResponseOutcome> {
    Ok(Json(
        state
            .service
            .handle_response(id, request.response_type, request.content.as_deref())
            .await?,
    ))
}

async fn record_conversion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ConversionOutcome> {
    Ok(Json(state.service.record_conversion(id).await?))
}

#[derive(Debug, Default, Deserialize)]
struct AssignRequest {
    #[serde(default)]
    reassign: bool,
}

async fn assign_lead(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<AssignRequest>>,
) -> ApiResult<AssignmentOutcome> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(state.service.assign_lead(id, request.reassign).await?))
}

// ---------------------------------------------------------------- patients

async fn analyze_lapse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<LapseOutcome> {
    Ok(Json(state.service.analyze_lapse(id).await?))
}

async fn identify_referrers(
    State(state): State<AppState>,
    body: Option<Json<ReferralCriteria>>,
) -> ApiResult<Vec<ReferralCandidate>> {
    let criteria = body.map(|Json(c)| c).unwrap_or_default();
    Ok(Json(state.service.identify_referrers(criteria).await?))
}

async fn request_referral(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OutreachOutcome> {
    Ok(Json(state.service.request_referral(id).await?))
}

#[derive(Debug, Deserialize)]
struct ReviewRequest {
    platform: ReviewPlatform,
}

async fn request_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<OutreachOutcome> {
    Ok(Json(state.service.request_review(id, request.platform).await?))
}

async fn identify_reactivation_candidates(
    State(state): State<AppState>,
    body: Option<Json<ReactivationCriteria>>,
) -> ApiResult<Vec<ReactivationCandidate>> {
    let criteria = body.map(|Json(c)| c).unwrap_or_default();
    Ok(Json(
        state
            .service
            .identify_reactivation_candidates(criteria)
            .await?,
    ))
}

#[derive(Debug, Default, Deserialize)]
struct ReactivationOutreachRequest {
    #[serde(default)]
    offer_id: Option<String>,
}

async fn send_reactivation_outreach(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ReactivationOutreachRequest>>,
) -> ApiResult<ReactivationOutreachOutcome> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(
        state
            .service
            .send_reactivation_outreach(id, request.offer_id.as_deref())
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct ReactivationOutcomeRequest {
    status: ReactivationStatus,
}

async fn record_reactivation_outcome(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReactivationOutcomeRequest>,
) -> ApiResult<ReactivationOutcomeResult> {
    Ok(Json(
        state
            .service
            .record_reactivation_outcome(id, request.status)
            .await?,
    ))
}

// ---------------------------------------------------------------- reputation

async fn get_reputation(State(state): State<AppState>) -> ApiResult<ReputationReport> {
    Ok(Json(state.service.get_reputation_score().await?))
}

async fn record_snapshot(
    State(state): State<AppState>,
    Json(input): Json<SnapshotInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let metric = state.service.record_reputation_snapshot(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": metric.id,
            "platform": metric.platform,
            "captured_at": metric.captured_at,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use practice_growth_config::{GrowthConfig, Settings};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::in_memory(Settings::default(), Arc::new(GrowthConfig::default()));
        create_router(state)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_capture_then_recapture() {
        let app = app();
        let request = json!({
            "source": "referral",
            "contact": { "first_name": "Ana", "email": "ana@example.com" },
            "behavior": { "site_visits": 3 }
        });

        let created = app
            .clone()
            .oneshot(post_json("/api/leads", request.clone()))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let body = json_body(created).await;
        assert_eq!(body["is_new"], true);

        let merged = app.oneshot(post_json("/api/leads", request)).await.unwrap();
        assert_eq!(merged.status(), StatusCode::OK);
        let merged = json_body(merged).await;
        assert_eq!(merged["merged"], true);
        assert_eq!(merged["lead"]["id"], body["lead"]["id"]);
    }

    #[tokio::test]
    async fn test_capture_without_contact_is_bad_request() {
        let response = app()
            .oneshot(post_json(
                "/api/leads",
                json!({ "source": "website", "contact": { "first_name": "Nobody" } }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_unknown_lead_is_not_found() {
        let uri = format!("/api/leads/{}/score?force=true", Uuid::new_v4());
        let response = app()
            .oneshot(Request::post(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"], "not_found");
        assert!(body["message"].as_str().unwrap().contains("lead"));
    }

    #[tokio::test]
    async fn test_pause_without_nurture_is_bad_request() {
        let app = app();
        let created = app
            .clone()
            .oneshot(post_json(
                "/api/leads",
                json!({ "source": "website", "contact": { "first_name": "Bo", "phone": "555-0101" } }),
            ))
            .await
            .unwrap();
        let id = json_body(created).await["lead"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(
                Request::post(format!("/api/leads/{}/nurture/pause", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reputation_snapshot_round_trip() {
        let app = app();
        let empty = app
            .clone()
            .oneshot(Request::get("/api/reputation").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(empty).await["risk_level"], "unknown");

        let created = app
            .clone()
            .oneshot(post_json(
                "/api/reputation/snapshots",
                json!({ "platform": "google", "rating": 4.8, "review_count": 150, "response_rate": 0.6 }),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let report = app
            .oneshot(Request::get("/api/reputation").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let report = json_body(report).await;
        assert_eq!(report["platform_scores"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::BadRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Internal), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
