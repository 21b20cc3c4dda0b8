use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::appointment::hhmm;
use super::{checked_product, round_money};
use crate::db::Record;
use crate::error::ShopResult;

/// Work order lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderState {
    Pending,
    InProgress,
    Finished,
    Cancelled,
}

impl fmt::Display for WorkOrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkOrderState::Pending => write!(f, "pending"),
            WorkOrderState::InProgress => write!(f, "in_progress"),
            WorkOrderState::Finished => write!(f, "finished"),
            WorkOrderState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A part consumed by a work order or quoted on a quotation.
///
/// The unit price is captured when the line is created and never re-read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartLine {
    pub code: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl PartLine {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> ShopResult<Self> {
        let subtotal = checked_product(Decimal::from(quantity), unit_price)?;
        Ok(Self {
            code: code.into(),
            name: name.into(),
            quantity,
            unit_price,
            subtotal: round_money(subtotal),
        })
    }
}

/// A labor catalog service performed on the vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceLine {
    pub code: String,
    pub name: String,
    /// Catalog price at the moment the service was recorded
    pub unit_price: Decimal,
}

/// Timestamped diagnostic entry. Notes are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticNote {
    pub recorded_at: DateTime<Utc>,
    pub text: String,
}

/// Work order opened from an accepted appointment.
///
/// Holds a snapshot of the appointment and the record of everything done
/// to the vehicle. Work orders are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    /// Unique order code (`OT-<n>`)
    pub code_order: String,

    /// Appointment this order was opened from (one order per appointment)
    pub id_appointment: u64,

    pub client_id: String,

    pub client_name: String,

    pub vehicle_plate: String,

    /// Mechanic responsible for the job
    pub mechanic: String,

    /// Appointment snapshot
    pub appointment_date: NaiveDate,

    #[serde(with = "hhmm")]
    pub appointment_time: NaiveTime,

    #[serde(default)]
    pub appointment_description: String,

    #[serde(default)]
    pub initial_observations: String,

    pub state: WorkOrderState,

    #[serde(default)]
    pub diagnostic_notes: Vec<DiagnosticNote>,

    #[serde(default)]
    pub services_performed: Vec<ServiceLine>,

    #[serde(default)]
    pub parts_used: Vec<PartLine>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Record for WorkOrder {
    const ENTITY: &'static str = "work order";

    fn key(&self) -> String {
        self.code_order.clone()
    }
}

/// Request to open a work order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkOrder {
    pub appointment_id: u64,
    #[serde(default)]
    pub initial_observations: String,
    /// Defaults to the appointment's mechanic.
    pub mechanic: Option<String>,
}

/// Edit of the free-text fields of a work order.
///
/// `code_order` and `id_appointment` are accepted for compatibility with
/// clients that send the whole record back, but are never applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkOrderPatch {
    pub code_order: Option<String>,
    pub id_appointment: Option<u64>,
    pub initial_observations: Option<String>,
    pub appointment_description: Option<String>,
    pub mechanic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPart {
    pub part_code: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddService {
    pub labor_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNote {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetState {
    pub state: WorkOrderState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_line_subtotal_is_rounded() {
        let line = PartLine::new("P1", "Bulb", 3, Decimal::from_str_exact("0.335").unwrap()).unwrap();
        assert_eq!(line.subtotal, Decimal::from_str_exact("1.01").unwrap());
    }

    #[test]
    fn test_part_line_rejects_overflowing_subtotal() {
        let err = PartLine::new("P1", "Bulb", 4_000_000_000, Decimal::MAX).unwrap_err();
        assert!(matches!(err, crate::error::ShopError::InvalidInput(_)));
    }
}
