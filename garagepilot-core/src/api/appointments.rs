use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::extract::{AppJson, AppPath, AppQuery};
use super::AppState;
use crate::auth::{require_admin, CurrentUser};
use crate::error::ShopResult;
use crate::models::appointment::{hhmm, AppointmentPatch, CreateAppointment};
use crate::models::Appointment;
use crate::pipeline::directory::UserRecord;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub mechanic: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Appointment to ignore, when checking a reschedule.
    pub exclude: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct Availability {
    pub mechanic: String,
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct AssignMechanic {
    pub mechanic: String,
}

pub async fn mechanics(State(state): State<AppState>) -> ShopResult<Json<Vec<UserRecord>>> {
    Ok(Json(state.workshop.mechanics.mechanics().await?))
}

/// Admins see every appointment, mechanics only their own.
pub async fn list(State(state): State<AppState>, user: CurrentUser) -> Json<Vec<Appointment>> {
    Json(state.workshop.scheduler.list(user.scope()).await)
}

pub async fn get(State(state): State<AppState>, AppPath(id): AppPath<u64>) -> ShopResult<Json<Appointment>> {
    Ok(Json(state.workshop.scheduler.get(id).await?))
}

pub async fn availability(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AvailabilityQuery>,
) -> Json<Availability> {
    let available = state
        .workshop
        .scheduler
        .check_availability(&query.mechanic, query.date, query.time, query.exclude)
        .await;
    Json(Availability {
        mechanic: query.mechanic,
        available,
    })
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(request): AppJson<CreateAppointment>,
) -> ShopResult<(StatusCode, Json<Appointment>)> {
    info!("{} books an appointment for {}", user.name, request.vehicle_plate);
    let created = state.workshop.scheduler.create(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    AppPath(id): AppPath<u64>,
    AppJson(patch): AppJson<AppointmentPatch>,
) -> ShopResult<Json<Appointment>> {
    Ok(Json(state.workshop.scheduler.update(id, patch).await?))
}

pub async fn assign(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<u64>,
    AppJson(body): AppJson<AssignMechanic>,
) -> ShopResult<Json<Appointment>> {
    let audit = state.workshop.audit();
    require_admin(&user, audit.as_ref(), &format!("assign a mechanic to appointment {}", id)).await?;
    Ok(Json(state.workshop.scheduler.assign_mechanic(id, &body.mechanic).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<u64>,
) -> ShopResult<Json<Appointment>> {
    let audit = state.workshop.audit();
    require_admin(&user, audit.as_ref(), &format!("delete appointment {}", id)).await?;
    Ok(Json(state.workshop.scheduler.delete(id).await?))
}
