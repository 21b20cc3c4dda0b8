use chrono::{NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::Collection;
use crate::error::{ShopError, ShopResult};
use crate::ids::IdProvider;
use crate::models::appointment::{
    minutes_since_midnight, AppointmentPatch, CreateAppointment, UNASSIGNED,
};
use crate::models::{Appointment, AppointmentState};
use crate::pipeline::directory::{same_plate, ClientDirectory, MechanicDirectory};
use crate::pipeline::state_machine::{AppointmentTransitions, Transition};

/// Minimum distance between two appointments of the same mechanic.
pub const SLOT_MINUTES: i64 = 60;

/// Returns the first active appointment of `mechanic` on `date` that
/// starts less than [`SLOT_MINUTES`] away from `time`.
///
/// This is a fixed-slot heuristic on start times only; schedules of
/// different mechanics never interact.
pub fn find_conflict<'a>(
    appointments: &'a [Appointment],
    mechanic: &str,
    date: NaiveDate,
    time: NaiveTime,
    exclude: Option<u64>,
) -> Option<&'a Appointment> {
    let candidate = minutes_since_midnight(time);
    appointments.iter().find(|a| {
        a.is_active()
            && a.mechanic == mechanic
            && a.date == date
            && Some(a.id) != exclude
            && (a.minutes() - candidate).abs() < SLOT_MINUTES
    })
}

/// Appointment booking, mechanic assignment and rescheduling.
#[derive(Clone)]
pub struct AppointmentScheduler {
    appointments: Arc<Collection<Appointment>>,
    clients: Arc<dyn ClientDirectory>,
    mechanics: Arc<dyn MechanicDirectory>,
    ids: Arc<dyn IdProvider>,
}

impl AppointmentScheduler {
    pub fn new(
        appointments: Arc<Collection<Appointment>>,
        clients: Arc<dyn ClientDirectory>,
        mechanics: Arc<dyn MechanicDirectory>,
        ids: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            appointments,
            clients,
            mechanics,
            ids,
        }
    }

    pub async fn check_availability(
        &self,
        mechanic: &str,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<u64>,
    ) -> bool {
        let appointments = self.appointments.list().await;
        find_conflict(&appointments, mechanic, date, time, exclude).is_none()
    }

    pub async fn get(&self, id: u64) -> ShopResult<Appointment> {
        self.appointments
            .get(&id.to_string())
            .await
            .ok_or(ShopError::AppointmentNotFound(id))
    }

    /// Lists appointments; a mechanic only sees the ones assigned to them.
    pub async fn list(&self, mechanic: Option<&str>) -> Vec<Appointment> {
        let all = self.appointments.list().await;
        match mechanic {
            Some(name) => all.into_iter().filter(|a| a.mechanic == name).collect(),
            None => all,
        }
    }

    /// Books a new appointment in the Waiting state.
    pub async fn create(&self, request: CreateAppointment) -> ShopResult<Appointment> {
        let client = self
            .clients
            .find_client(&request.client_id)
            .await?
            .ok_or_else(|| ShopError::not_found("client", &request.client_id))?;
        let vehicle = self
            .clients
            .find_vehicle(&request.vehicle_plate)
            .await?
            .ok_or_else(|| ShopError::not_found("vehicle", &request.vehicle_plate))?;
        if vehicle.client_id != client.id {
            return Err(ShopError::invalid(format!(
                "vehicle {} does not belong to client {}",
                vehicle.plate, client.id
            )));
        }

        let mut tx = self.appointments.begin().await;

        let active = tx
            .iter()
            .find(|a| a.is_active() && same_plate(&a.vehicle_plate, &vehicle.plate))
            .map(|a| (a.id, a.state));
        if let Some((existing, state)) = active {
            if !request.replace_active || state != AppointmentState::Waiting {
                return Err(ShopError::ActiveAppointmentExists {
                    plate: vehicle.plate,
                    existing,
                });
            }
            if let Some(old) = tx.find_mut(&existing.to_string()) {
                old.state = AppointmentState::Cancelled;
                old.updated_at = Utc::now();
            }
            info!("Appointment {} replaced and cancelled", existing);
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: self.ids.next_id(),
            client_id: client.id,
            client_name: client.name,
            vehicle_plate: vehicle.plate,
            date: request.date,
            time: request.time,
            description: request.description.trim().to_string(),
            mechanic: UNASSIGNED.to_string(),
            state: AppointmentTransitions::initial_state(),
            created_at: now,
            updated_at: now,
        };
        tx.insert(appointment.clone())?;
        tx.commit().await?;

        info!(
            "Appointment {} booked for {} on {} {}",
            appointment.id, appointment.vehicle_plate, appointment.date, appointment.time
        );
        Ok(appointment)
    }

    /// Assigns a mechanic and accepts the appointment.
    ///
    /// The availability check and the write happen under the same lock, so
    /// two concurrent assignments cannot both take the same slot.
    pub async fn assign_mechanic(&self, id: u64, mechanic: &str) -> ShopResult<Appointment> {
        let mechanic = mechanic.trim();
        if !self.mechanics.is_mechanic(mechanic).await? {
            return Err(ShopError::not_found("mechanic", mechanic));
        }

        let mut tx = self.appointments.begin().await;
        let current = tx
            .find(&id.to_string())
            .cloned()
            .ok_or(ShopError::AppointmentNotFound(id))?;

        if !AppointmentTransitions::assignable(current.state) {
            return Err(ShopError::InvalidTransition {
                entity: "appointment",
                from: current.state.to_string(),
                to: AppointmentState::Accepted.to_string(),
            });
        }

        if let Some(clash) = find_conflict(&tx, mechanic, current.date, current.time, Some(id)) {
            warn!(
                "Mechanic {} unavailable for appointment {}: clashes with {}",
                mechanic, id, clash.id
            );
            return Err(ShopError::SchedulingConflict {
                mechanic: mechanic.to_string(),
                date: current.date.to_string(),
                time: current.time.format("%H:%M").to_string(),
            });
        }

        let appointment = tx
            .find_mut(&id.to_string())
            .ok_or(ShopError::AppointmentNotFound(id))?;
        appointment.mechanic = mechanic.to_string();
        appointment.state = AppointmentState::Accepted;
        appointment.updated_at = Utc::now();
        let updated = appointment.clone();
        tx.commit().await?;

        info!("Appointment {} accepted by {}", id, mechanic);
        Ok(updated)
    }

    /// Edits date, time, description or state.
    ///
    /// Rescheduling an accepted appointment is re-validated against the
    /// assigned mechanic's other appointments.
    pub async fn update(&self, id: u64, patch: AppointmentPatch) -> ShopResult<Appointment> {
        let mut tx = self.appointments.begin().await;
        let current = tx
            .find(&id.to_string())
            .cloned()
            .ok_or(ShopError::AppointmentNotFound(id))?;

        let mut next = current.clone();
        if let Some(state) = patch.state {
            AppointmentTransitions::check(current.state, state)?;
            next.state = state;
        }
        if let Some(date) = patch.date {
            next.date = date;
        }
        if let Some(time) = patch.time {
            next.time = time;
        }
        if let Some(description) = patch.description {
            next.description = description.trim().to_string();
        }

        if current.state == AppointmentState::Cancelled && next.is_active() {
            if let Some(other) = tx
                .iter()
                .find(|a| a.id != id && a.is_active() && same_plate(&a.vehicle_plate, &next.vehicle_plate))
            {
                return Err(ShopError::ActiveAppointmentExists {
                    plate: next.vehicle_plate.clone(),
                    existing: other.id,
                });
            }
        }

        let rescheduled = next.date != current.date || next.time != current.time;
        if rescheduled && next.state == AppointmentState::Accepted && next.is_assigned() {
            if find_conflict(&tx, &next.mechanic, next.date, next.time, Some(id)).is_some() {
                return Err(ShopError::SchedulingConflict {
                    mechanic: next.mechanic.clone(),
                    date: next.date.to_string(),
                    time: next.time.format("%H:%M").to_string(),
                });
            }
        }

        next.updated_at = Utc::now();
        if let Some(slot) = tx.find_mut(&id.to_string()) {
            *slot = next.clone();
        }
        tx.commit().await?;

        if current.state != next.state {
            info!("Appointment {}: {} -> {}", id, current.state, next.state);
        }
        Ok(next)
    }

    /// Purges a cancelled appointment. Any other state is kept.
    pub async fn delete(&self, id: u64) -> ShopResult<Appointment> {
        let mut tx = self.appointments.begin().await;
        let state = tx
            .find(&id.to_string())
            .map(|a| a.state)
            .ok_or(ShopError::AppointmentNotFound(id))?;
        if state != AppointmentState::Cancelled {
            return Err(ShopError::AppointmentNotCancelled(id));
        }

        let removed = tx
            .remove(&id.to_string())
            .ok_or(ShopError::AppointmentNotFound(id))?;
        tx.commit().await?;

        info!("Cancelled appointment {} deleted", id);
        Ok(removed)
    }
}
