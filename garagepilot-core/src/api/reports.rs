use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use serde::Deserialize;

use super::extract::{AppJson, AppQuery};
use super::AppState;
use crate::auth::{require_admin, CurrentUser};
use crate::error::{ShopError, ShopResult};
use crate::models::report::CreateReport;
use crate::models::Report;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub kind: Option<String>,
}

/// Any authenticated user may file a report.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(request): AppJson<CreateReport>,
) -> ShopResult<(StatusCode, Json<Report>)> {
    if request.kind.trim().is_empty() || request.description.trim().is_empty() {
        return Err(ShopError::invalid("a report needs a kind and a description"));
    }
    let report = state
        .workshop
        .reports
        .file(&request.kind, &user.name, &request.description, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<ReportQuery>,
) -> ShopResult<Json<Vec<Report>>> {
    let audit = state.workshop.audit();
    require_admin(&user, audit.as_ref(), "read reports").await?;
    Ok(Json(state.workshop.reports.list(query.kind.as_deref()).await))
}
