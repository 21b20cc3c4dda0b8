use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;

use super::extract::{AppJson, AppPath};
use super::AppState;
use crate::auth::{require_admin, CurrentUser};
use crate::error::ShopResult;
use crate::models::quotation::{CreateQuotation, DraftFromWorkOrder, QuotationPatch};
use crate::models::Quotation;

pub async fn list(State(state): State<AppState>) -> Json<Vec<Quotation>> {
    Json(state.workshop.quotations.list().await)
}

pub async fn get(State(state): State<AppState>, AppPath(code): AppPath<String>) -> ShopResult<Json<Quotation>> {
    Ok(Json(state.workshop.quotations.get(&code).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(request): AppJson<CreateQuotation>,
) -> ShopResult<(StatusCode, Json<Quotation>)> {
    let audit = state.workshop.audit();
    require_admin(&user, audit.as_ref(), "create a quotation").await?;
    let created = state.workshop.quotations.create(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn draft_from_work_order(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(code): AppPath<String>,
    body: Option<AppJson<DraftFromWorkOrder>>,
) -> ShopResult<(StatusCode, Json<Quotation>)> {
    let audit = state.workshop.audit();
    require_admin(&user, audit.as_ref(), &format!("quote work order {}", code)).await?;
    let request = body.map(|AppJson(b)| b).unwrap_or_default();
    let created = state.workshop.quotations.draft_from_work_order(&code, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(code): AppPath<String>,
    AppJson(patch): AppJson<QuotationPatch>,
) -> ShopResult<Json<Quotation>> {
    let audit = state.workshop.audit();
    require_admin(&user, audit.as_ref(), &format!("edit quotation {}", code)).await?;
    Ok(Json(state.workshop.quotations.update(&code, patch).await?))
}

pub async fn convert_to_proforma(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(code): AppPath<String>,
) -> ShopResult<Json<Quotation>> {
    let audit = state.workshop.audit();
    require_admin(&user, audit.as_ref(), &format!("convert quotation {} to proforma", code)).await?;
    Ok(Json(state.workshop.quotations.convert_to_proforma(&code).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(code): AppPath<String>,
) -> ShopResult<Json<Quotation>> {
    let audit = state.workshop.audit();
    require_admin(&user, audit.as_ref(), &format!("delete quotation {}", code)).await?;
    Ok(Json(state.workshop.quotations.delete(&code).await?))
}
