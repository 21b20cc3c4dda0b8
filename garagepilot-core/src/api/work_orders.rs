use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;

use super::extract::{AppJson, AppPath};
use super::AppState;
use crate::auth::CurrentUser;
use crate::error::ShopResult;
use crate::models::work_order::{AddNote, AddPart, AddService, CreateWorkOrder, SetState, WorkOrderPatch};
use crate::models::WorkOrder;

/// Admins see every order, mechanics the ones assigned to them.
pub async fn list(State(state): State<AppState>, user: CurrentUser) -> Json<Vec<WorkOrder>> {
    Json(state.workshop.work_orders.list(user.scope()).await)
}

pub async fn get(State(state): State<AppState>, AppPath(code): AppPath<String>) -> ShopResult<Json<WorkOrder>> {
    Ok(Json(state.workshop.work_orders.get(&code).await?))
}

pub async fn create(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateWorkOrder>,
) -> ShopResult<(StatusCode, Json<WorkOrder>)> {
    let created = state.workshop.work_orders.create_from_appointment(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    AppPath(code): AppPath<String>,
    AppJson(patch): AppJson<WorkOrderPatch>,
) -> ShopResult<Json<WorkOrder>> {
    Ok(Json(state.workshop.work_orders.update(&code, patch).await?))
}

pub async fn set_state(
    State(state): State<AppState>,
    AppPath(code): AppPath<String>,
    AppJson(body): AppJson<SetState>,
) -> ShopResult<Json<WorkOrder>> {
    Ok(Json(state.workshop.work_orders.set_state(&code, body.state).await?))
}

pub async fn add_part(
    State(state): State<AppState>,
    AppPath(code): AppPath<String>,
    AppJson(body): AppJson<AddPart>,
) -> ShopResult<Json<WorkOrder>> {
    Ok(Json(state.workshop.work_orders.add_part(&code, body).await?))
}

pub async fn remove_part(
    State(state): State<AppState>,
    AppPath((code, index)): AppPath<(String, usize)>,
) -> ShopResult<Json<WorkOrder>> {
    Ok(Json(state.workshop.work_orders.remove_part(&code, index).await?))
}

pub async fn add_service(
    State(state): State<AppState>,
    AppPath(code): AppPath<String>,
    AppJson(body): AppJson<AddService>,
) -> ShopResult<Json<WorkOrder>> {
    Ok(Json(state.workshop.work_orders.add_service(&code, body).await?))
}

pub async fn remove_service(
    State(state): State<AppState>,
    AppPath((code, index)): AppPath<(String, usize)>,
) -> ShopResult<Json<WorkOrder>> {
    Ok(Json(state.workshop.work_orders.remove_service(&code, index).await?))
}

pub async fn add_note(
    State(state): State<AppState>,
    AppPath(code): AppPath<String>,
    AppJson(body): AppJson<AddNote>,
) -> ShopResult<Json<WorkOrder>> {
    Ok(Json(state.workshop.work_orders.add_diagnostic_note(&code, body).await?))
}

pub async fn remove_note(
    State(state): State<AppState>,
    AppPath((code, index)): AppPath<(String, usize)>,
) -> ShopResult<Json<WorkOrder>> {
    Ok(Json(state.workshop.work_orders.remove_diagnostic_note(&code, index).await?))
}
