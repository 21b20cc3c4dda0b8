use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::db::Collection;
use crate::error::{ShopError, ShopResult};
use crate::ids::{work_order_code, IdProvider};
use crate::models::work_order::{
    AddNote, AddPart, AddService, CreateWorkOrder, DiagnosticNote, ServiceLine, WorkOrderPatch,
};
use crate::models::{Appointment, AppointmentState, WorkOrder, WorkOrderState};
use crate::pipeline::ledger::InventoryLedger;
use crate::pipeline::state_machine::{Transition, WorkOrderTransitions};

/// Work orders and the stock movements they drive.
///
/// Lock order: the work order collection is taken first, then the
/// appointment collection (read only) or the inventory ledger.
#[derive(Clone)]
pub struct WorkOrderEngine {
    orders: Arc<Collection<WorkOrder>>,
    appointments: Arc<Collection<Appointment>>,
    ledger: InventoryLedger,
    ids: Arc<dyn IdProvider>,
}

impl WorkOrderEngine {
    pub fn new(
        orders: Arc<Collection<WorkOrder>>,
        appointments: Arc<Collection<Appointment>>,
        ledger: InventoryLedger,
        ids: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            orders,
            appointments,
            ledger,
            ids,
        }
    }

    pub async fn get(&self, code: &str) -> ShopResult<WorkOrder> {
        self.orders
            .get(code)
            .await
            .ok_or_else(|| ShopError::not_found("work order", code))
    }

    /// Lists orders; a mechanic sees the orders whose appointment is
    /// assigned to them.
    pub async fn list(&self, mechanic: Option<&str>) -> Vec<WorkOrder> {
        let orders = self.orders.list().await;
        let Some(name) = mechanic else {
            return orders;
        };

        let assigned: HashMap<u64, String> = self
            .appointments
            .list()
            .await
            .into_iter()
            .map(|a| (a.id, a.mechanic))
            .collect();

        orders
            .into_iter()
            .filter(|o| match assigned.get(&o.id_appointment) {
                Some(m) => m == name,
                None => o.mechanic == name,
            })
            .collect()
    }

    /// Opens a work order from an accepted appointment.
    pub async fn create_from_appointment(&self, request: CreateWorkOrder) -> ShopResult<WorkOrder> {
        let id = request.appointment_id;

        let mut tx = self.orders.begin().await;
        let appointment = self
            .appointments
            .get(&id.to_string())
            .await
            .ok_or(ShopError::AppointmentNotFound(id))?;

        if appointment.state != AppointmentState::Accepted {
            return Err(ShopError::AppointmentNotAccepted {
                id,
                state: appointment.state.to_string(),
            });
        }
        if tx.iter().any(|o| o.id_appointment == id) {
            return Err(ShopError::DuplicateWorkOrder(id));
        }

        let mechanic = request
            .mechanic
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or(appointment.mechanic);

        let now = Utc::now();
        let order = WorkOrder {
            code_order: work_order_code(self.ids.next_id()),
            id_appointment: id,
            client_id: appointment.client_id,
            client_name: appointment.client_name,
            vehicle_plate: appointment.vehicle_plate,
            mechanic,
            appointment_date: appointment.date,
            appointment_time: appointment.time,
            appointment_description: appointment.description,
            initial_observations: request.initial_observations.trim().to_string(),
            state: WorkOrderTransitions::initial_state(),
            diagnostic_notes: Vec::new(),
            services_performed: Vec::new(),
            parts_used: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tx.insert(order.clone())?;
        tx.commit().await?;

        info!("Work order {} opened from appointment {}", order.code_order, id);
        Ok(order)
    }

    /// Consumes stock for a part and records it on the order at the price
    /// in effect right now. On any failure neither the order nor the stock
    /// changes.
    pub async fn add_part(&self, code: &str, request: AddPart) -> ShopResult<WorkOrder> {
        let mut tx = self.orders.begin().await;
        if tx.find(code).is_none() {
            return Err(ShopError::not_found("work order", code));
        }

        let line = self.ledger.reserve_line(&request.part_code, request.quantity).await?;

        let order = tx
            .find_mut(code)
            .ok_or_else(|| ShopError::not_found("work order", code))?;
        order.parts_used.push(line.clone());
        order.updated_at = Utc::now();
        let updated = order.clone();

        if let Err(e) = tx.commit().await {
            error!("Work order {} not saved, returning {} x {} to stock", code, line.quantity, line.code);
            if let Err(undo) = self.ledger.release(&line.code, line.quantity).await {
                error!("Could not return {} x {} to stock: {}", line.quantity, line.code, undo);
            }
            return Err(e.into());
        }

        info!("Work order {}: used {} x {} at {}", code, line.quantity, line.code, line.unit_price);
        Ok(updated)
    }

    /// Returns a part line's quantity to stock and drops the line.
    pub async fn remove_part(&self, code: &str, index: usize) -> ShopResult<WorkOrder> {
        let mut tx = self.orders.begin().await;
        let order = tx
            .find_mut(code)
            .ok_or_else(|| ShopError::not_found("work order", code))?;
        let line = order
            .parts_used
            .get(index)
            .cloned()
            .ok_or_else(|| ShopError::not_found("part line", index))?;

        self.ledger.release(&line.code, line.quantity).await?;

        let order = tx
            .find_mut(code)
            .ok_or_else(|| ShopError::not_found("work order", code))?;
        order.parts_used.remove(index);
        order.updated_at = Utc::now();
        let updated = order.clone();

        if let Err(e) = tx.commit().await {
            error!("Work order {} not saved, taking {} x {} back out of stock", code, line.quantity, line.code);
            if let Err(undo) = self.ledger.reserve(&line.code, line.quantity).await {
                error!("Could not take {} x {} back out of stock: {}", line.quantity, line.code, undo);
            }
            return Err(e.into());
        }

        info!("Work order {}: returned {} x {} to stock", code, line.quantity, line.code);
        Ok(updated)
    }

    /// Records a labor catalog service at its current price.
    pub async fn add_service(&self, code: &str, request: AddService) -> ShopResult<WorkOrder> {
        let mut tx = self.orders.begin().await;
        if tx.find(code).is_none() {
            return Err(ShopError::not_found("work order", code));
        }

        let labor = self.ledger.labor_item(&request.labor_code).await?;

        let order = tx
            .find_mut(code)
            .ok_or_else(|| ShopError::not_found("work order", code))?;
        order.services_performed.push(ServiceLine {
            code: labor.code,
            name: labor.name,
            unit_price: labor.unit_price,
        });
        order.updated_at = Utc::now();
        let updated = order.clone();
        tx.commit().await?;

        info!("Work order {}: service {} recorded", code, request.labor_code);
        Ok(updated)
    }

    pub async fn remove_service(&self, code: &str, index: usize) -> ShopResult<WorkOrder> {
        self.edit(code, |order| {
            if index >= order.services_performed.len() {
                return Err(ShopError::not_found("service line", index));
            }
            order.services_performed.remove(index);
            Ok(())
        })
        .await
    }

    /// Appends a timestamped diagnostic note.
    pub async fn add_diagnostic_note(&self, code: &str, request: AddNote) -> ShopResult<WorkOrder> {
        let text = request.text.trim().to_string();
        if text.is_empty() {
            return Err(ShopError::invalid("diagnostic note cannot be empty"));
        }

        self.edit(code, move |order| {
            order.diagnostic_notes.push(DiagnosticNote {
                recorded_at: Utc::now(),
                text,
            });
            Ok(())
        })
        .await
    }

    pub async fn remove_diagnostic_note(&self, code: &str, index: usize) -> ShopResult<WorkOrder> {
        self.edit(code, |order| {
            if index >= order.diagnostic_notes.len() {
                return Err(ShopError::not_found("diagnostic note", index));
            }
            order.diagnostic_notes.remove(index);
            Ok(())
        })
        .await
    }

    pub async fn set_state(&self, code: &str, state: WorkOrderState) -> ShopResult<WorkOrder> {
        let updated = self
            .edit(code, |order| {
                WorkOrderTransitions::check(order.state, state)?;
                order.state = state;
                Ok(())
            })
            .await?;

        info!("Work order {} is now {}", code, state);
        Ok(updated)
    }

    /// Edits the free-text fields. The order code and appointment link are
    /// always kept as they were.
    pub async fn update(&self, code: &str, patch: WorkOrderPatch) -> ShopResult<WorkOrder> {
        if patch.code_order.as_deref().is_some_and(|c| c != code) {
            debug!("Ignoring attempt to rename work order {}", code);
        }

        self.edit(code, |order| {
            if patch.id_appointment.is_some_and(|id| id != order.id_appointment) {
                debug!("Ignoring attempt to relink work order {}", order.code_order);
            }
            if let Some(observations) = patch.initial_observations {
                order.initial_observations = observations.trim().to_string();
            }
            if let Some(description) = patch.appointment_description {
                order.appointment_description = description.trim().to_string();
            }
            if let Some(mechanic) = patch.mechanic.filter(|m| !m.trim().is_empty()) {
                order.mechanic = mechanic.trim().to_string();
            }
            Ok(())
        })
        .await
    }

    async fn edit<F>(&self, code: &str, apply: F) -> ShopResult<WorkOrder>
    where
        F: FnOnce(&mut WorkOrder) -> ShopResult<()>,
    {
        let mut tx = self.orders.begin().await;
        let order = tx
            .find_mut(code)
            .ok_or_else(|| ShopError::not_found("work order", code))?;
        apply(order)?;
        order.updated_at = Utc::now();
        let updated = order.clone();
        tx.commit().await?;
        Ok(updated)
    }
}
