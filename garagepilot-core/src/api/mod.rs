pub mod appointments;
pub mod extract;
pub mod inventory;
pub mod quotations;
pub mod reports;
pub mod work_orders;

#[cfg(test)]
mod tests;

use axum::http::{HeaderValue, Method};
use axum::response::Json;
use axum::routing::{delete, get, patch, post};
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::jwt_middleware;
use crate::pipeline::Workshop;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub workshop: Workshop,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(workshop: Workshop, jwt_secret: &str) -> Self {
        Self {
            workshop,
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}

/// Health check endpoint.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "garagepilot-core",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the CORS layer from the configured origins; `*` allows any.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", o);
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}

/// Routes under `/api`, all behind the bearer-token middleware.
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/inventory", get(inventory::list).post(inventory::create))
        .route(
            "/inventory/:code",
            get(inventory::get).put(inventory::update).delete(inventory::delete),
        )
        .route("/labor", get(inventory::list_labor).post(inventory::create_labor))
        .route("/labor/:code", get(inventory::get_labor).delete(inventory::delete_labor))
        .route("/mechanics", get(appointments::mechanics))
        .route("/appointments", get(appointments::list).post(appointments::create))
        .route("/appointments/availability", get(appointments::availability))
        .route(
            "/appointments/:id",
            get(appointments::get).put(appointments::update).delete(appointments::delete),
        )
        .route("/appointments/:id/mechanic", patch(appointments::assign))
        .route("/work-orders", get(work_orders::list).post(work_orders::create))
        .route("/work-orders/:code", get(work_orders::get).put(work_orders::update))
        .route("/work-orders/:code/state", patch(work_orders::set_state))
        .route("/work-orders/:code/parts", post(work_orders::add_part))
        .route("/work-orders/:code/parts/:index", delete(work_orders::remove_part))
        .route("/work-orders/:code/services", post(work_orders::add_service))
        .route("/work-orders/:code/services/:index", delete(work_orders::remove_service))
        .route("/work-orders/:code/notes", post(work_orders::add_note))
        .route("/work-orders/:code/notes/:index", delete(work_orders::remove_note))
        .route("/quotations", get(quotations::list).post(quotations::create))
        .route(
            "/quotations/:code",
            get(quotations::get).put(quotations::update).delete(quotations::delete),
        )
        .route("/quotations/:code/proforma", patch(quotations::convert_to_proforma))
        .route("/quotations/from-work-order/:code", post(quotations::draft_from_work_order))
        .route("/reports", get(reports::list).post(reports::create))
        .route_layer(middleware::from_fn_with_state(state, jwt_middleware))
}

/// Creates the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
