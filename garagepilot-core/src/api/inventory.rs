use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use super::extract::{AppJson, AppPath, AppQuery};
use super::AppState;
use crate::auth::{require_admin, CurrentUser};
use crate::error::ShopResult;
use crate::models::inventory::InventoryPatch;
use crate::models::{InventoryItem, LaborCatalogItem};

#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    /// Vehicle catalog id; narrows the list to parts that fit it.
    pub vehicle: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InventoryQuery>,
) -> Json<Vec<InventoryItem>> {
    let vehicle = query.vehicle.as_deref().map(str::trim).filter(|v| !v.is_empty());
    Json(state.workshop.ledger.list(vehicle).await)
}

pub async fn get(State(state): State<AppState>, AppPath(code): AppPath<String>) -> ShopResult<Json<InventoryItem>> {
    Ok(Json(state.workshop.ledger.part(&code).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(item): AppJson<InventoryItem>,
) -> ShopResult<(StatusCode, Json<InventoryItem>)> {
    let audit = state.workshop.audit();
    require_admin(&user, audit.as_ref(), &format!("create inventory item {}", item.code)).await?;
    let created = state.workshop.ledger.create(item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(code): AppPath<String>,
    AppJson(patch): AppJson<InventoryPatch>,
) -> ShopResult<Json<InventoryItem>> {
    let audit = state.workshop.audit();
    require_admin(&user, audit.as_ref(), &format!("edit inventory item {}", code)).await?;
    Ok(Json(state.workshop.ledger.update(&code, patch).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(code): AppPath<String>,
) -> ShopResult<Json<InventoryItem>> {
    let audit = state.workshop.audit();
    require_admin(&user, audit.as_ref(), &format!("delete inventory item {}", code)).await?;
    Ok(Json(state.workshop.ledger.delete(&code).await?))
}

pub async fn list_labor(State(state): State<AppState>) -> Json<Vec<LaborCatalogItem>> {
    Json(state.workshop.ledger.labor_catalog().await)
}

pub async fn get_labor(
    State(state): State<AppState>,
    AppPath(code): AppPath<String>,
) -> ShopResult<Json<LaborCatalogItem>> {
    Ok(Json(state.workshop.ledger.labor_item(&code).await?))
}

pub async fn create_labor(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(item): AppJson<LaborCatalogItem>,
) -> ShopResult<(StatusCode, Json<LaborCatalogItem>)> {
    let audit = state.workshop.audit();
    require_admin(&user, audit.as_ref(), &format!("create labor item {}", item.code)).await?;
    let created = state.workshop.ledger.create_labor(item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_labor(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(code): AppPath<String>,
) -> ShopResult<Json<LaborCatalogItem>> {
    let audit = state.workshop.audit();
    require_admin(&user, audit.as_ref(), &format!("delete labor item {}", code)).await?;
    Ok(Json(state.workshop.ledger.delete_labor(&code).await?))
}
