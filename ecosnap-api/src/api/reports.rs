//! Report submission and history

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use ecosnap_common::db::ReportRecord;
use ecosnap_common::progression::Badge;
use ecosnap_common::Rank;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::users::{require_user, UserProfile};
use super::LimitQuery;
use crate::error::{ApiError, ApiResult};
use crate::workflow::NewReport;
use crate::{db, AppState};

#[derive(Debug, Deserialize)]
pub struct SubmitReportRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub submission_id: Option<String>,
    /// Plain base64 or a `data:image/...;base64,` URL
    pub image_base64: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitReportResponse {
    pub report: ReportRecord,
    pub progression: UserProfile,
    pub unlocked_badges: Vec<Badge>,
    pub previous_rank: Rank,
    pub rank_changed: bool,
    pub duplicate: bool,
}

fn decode_image(encoded: &str) -> ApiResult<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    let image = STANDARD
        .decode(payload.trim())
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 image: {}", e)))?;

    if image.is_empty() {
        return Err(ApiError::BadRequest("Image is empty".to_string()));
    }
    Ok(image)
}

/// POST /api/reports
///
/// 201 for a newly processed report, 200 for a repeated `submission_id`.
pub async fn submit_report(
    State(state): State<AppState>,
    Json(request): Json<SubmitReportRequest>,
) -> ApiResult<(StatusCode, Json<SubmitReportResponse>)> {
    let image = decode_image(&request.image_base64)?;

    let outcome = state
        .workflow
        .submit(NewReport {
            user_id: request.user_id,
            submission_id: request.submission_id,
            image,
            latitude: request.latitude,
            longitude: request.longitude,
            description: request.description,
        })
        .await?;

    let status = if outcome.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((
        status,
        Json(SubmitReportResponse {
            progression: UserProfile::from(&outcome.user),
            rank_changed: outcome.rank_changed(),
            previous_rank: outcome.previous_rank,
            unlocked_badges: outcome.unlocked,
            duplicate: outcome.duplicate,
            report: outcome.report,
        }),
    ))
}

/// GET /api/reports/:id
pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> ApiResult<Json<ReportRecord>> {
    db::get_report(&state.db, report_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Report {}", report_id)))
}

/// GET /api/users/:id/reports?limit=
pub async fn list_user_reports(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<ReportRecord>>> {
    require_user(&state, user_id).await?;
    let reports = db::list_user_reports(&state.db, user_id, query.resolve()).await?;
    Ok(Json(reports))
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reports", post(submit_report))
        .route("/api/reports/:id", get(get_report))
        .route("/api/users/:id/reports", get(list_user_reports))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_and_data_url() {
        assert_eq!(decode_image("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_image("data:image/jpeg;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn test_decode_rejects_garbage_and_empty() {
        assert!(matches!(decode_image("not base64!"), Err(ApiError::BadRequest(_))));
        assert!(matches!(decode_image(""), Err(ApiError::BadRequest(_))));
    }
}
