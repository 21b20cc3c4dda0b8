use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::error;

/// Failures of the on-disk record store.
///
/// These are the only errors treated as fatal for a request; they are
/// surfaced as `500` and never bring the process down.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Coarse error taxonomy used to pick a client-visible status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    InsufficientStock,
    Immutable,
    Unauthorized,
    Forbidden,
    Storage,
}

/// Every recoverable failure a core operation can report.
#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("unknown part code: {0}")]
    UnknownPart(String),

    #[error("insufficient stock for part {code}: requested {requested}, available {available}")]
    InsufficientStock {
        code: String,
        requested: u32,
        available: u32,
    },

    #[error("mechanic {mechanic} already has an appointment within 60 minutes of {date} {time}")]
    SchedulingConflict {
        mechanic: String,
        date: String,
        time: String,
    },

    #[error("appointment {0} not found")]
    AppointmentNotFound(u64),

    #[error("appointment {id} is {state}, only accepted appointments can open a work order")]
    AppointmentNotAccepted { id: u64, state: String },

    #[error("appointment {0} must be cancelled before it can be deleted")]
    AppointmentNotCancelled(u64),

    #[error("vehicle {plate} already has an active appointment ({existing})")]
    ActiveAppointmentExists { plate: String, existing: u64 },

    #[error("a work order already exists for appointment {0}")]
    DuplicateWorkOrder(u64),

    #[error("{entity} with key {key} already exists")]
    Duplicate { entity: &'static str, key: String },

    #[error("cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("client name and id are required")]
    MissingClient,

    #[error("a quotation needs at least one part or labor line")]
    EmptyQuotation,

    #[error("quotation {0} not found")]
    QuotationNotFound(String),

    #[error("quotation {0} is a proforma and can no longer be modified")]
    ProformaImmutable(String),

    #[error("quotation {0} is already a proforma")]
    AlreadyProforma(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing or invalid credentials")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ShopError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        ShopError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ShopError::InvalidInput(message.into())
    }

    /// Folds the variant onto the error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShopError::NotFound { .. }
            | ShopError::UnknownPart(_)
            | ShopError::AppointmentNotFound(_)
            | ShopError::QuotationNotFound(_) => ErrorKind::NotFound,

            ShopError::SchedulingConflict { .. }
            | ShopError::AppointmentNotAccepted { .. }
            | ShopError::AppointmentNotCancelled(_)
            | ShopError::ActiveAppointmentExists { .. }
            | ShopError::DuplicateWorkOrder(_)
            | ShopError::Duplicate { .. }
            | ShopError::InvalidTransition { .. } => ErrorKind::Conflict,

            ShopError::MissingClient | ShopError::EmptyQuotation | ShopError::InvalidInput(_) => {
                ErrorKind::InvalidInput
            }

            ShopError::InsufficientStock { .. } => ErrorKind::InsufficientStock,

            ShopError::ProformaImmutable(_) | ShopError::AlreadyProforma(_) => ErrorKind::Immutable,

            ShopError::Unauthorized => ErrorKind::Unauthorized,
            ShopError::Forbidden(_) => ErrorKind::Forbidden,
            ShopError::Store(_) => ErrorKind::Storage,
        }
    }

    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            ShopError::NotFound { .. } => "NOT_FOUND",
            ShopError::UnknownPart(_) => "UNKNOWN_PART",
            ShopError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            ShopError::SchedulingConflict { .. } => "SCHEDULING_CONFLICT",
            ShopError::AppointmentNotFound(_) => "APPOINTMENT_NOT_FOUND",
            ShopError::AppointmentNotAccepted { .. } => "APPOINTMENT_NOT_ACCEPTED",
            ShopError::AppointmentNotCancelled(_) => "APPOINTMENT_NOT_CANCELLED",
            ShopError::ActiveAppointmentExists { .. } => "ACTIVE_APPOINTMENT_EXISTS",
            ShopError::DuplicateWorkOrder(_) => "DUPLICATE_WORK_ORDER",
            ShopError::Duplicate { .. } => "DUPLICATE",
            ShopError::InvalidTransition { .. } => "INVALID_TRANSITION",
            ShopError::MissingClient => "MISSING_CLIENT",
            ShopError::EmptyQuotation => "EMPTY_QUOTATION",
            ShopError::QuotationNotFound(_) => "QUOTATION_NOT_FOUND",
            ShopError::ProformaImmutable(_) => "PROFORMA_IMMUTABLE",
            ShopError::AlreadyProforma(_) => "ALREADY_PROFORMA",
            ShopError::InvalidInput(_) => "INVALID_INPUT",
            ShopError::Unauthorized => "UNAUTHORIZED",
            ShopError::Forbidden(_) => "FORBIDDEN",
            ShopError::Store(_) => "STORAGE_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict | ErrorKind::InsufficientStock => StatusCode::CONFLICT,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Immutable => StatusCode::LOCKED,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body returned by the API.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorKind,
    message: String,
    code: &'static str,
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ShopError::Store(e) => {
                error!("Record store failure: {}", e);
                "the record store could not be read or written".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: self.kind(),
            message,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ShopError {
    fn from(rejection: JsonRejection) -> Self {
        ShopError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for ShopError {
    fn from(rejection: PathRejection) -> Self {
        ShopError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for ShopError {
    fn from(rejection: QueryRejection) -> Self {
        ShopError::InvalidInput(rejection.body_text())
    }
}

pub type ShopResult<T> = Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_mapping() {
        assert_eq!(ShopError::UnknownPart("P1".into()).kind(), ErrorKind::NotFound);
        assert_eq!(ShopError::DuplicateWorkOrder(7).kind(), ErrorKind::Conflict);
        assert_eq!(ShopError::EmptyQuotation.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            ShopError::ProformaImmutable("COT-1".into()).kind(),
            ErrorKind::Immutable
        );
    }

    #[test]
    fn test_status_codes() {
        let stock = ShopError::InsufficientStock {
            code: "P1".into(),
            requested: 3,
            available: 2,
        };
        assert_eq!(stock.status(), StatusCode::CONFLICT);
        assert_eq!(
            ShopError::AlreadyProforma("COT-1".into()).status(),
            StatusCode::LOCKED
        );
        assert_eq!(ShopError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
