pub mod audit;
pub mod directory;
pub mod ledger;
pub mod quotations;
pub mod scheduler;
pub mod state_machine;
pub mod work_orders;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::db::Database;
use crate::ids::IdProvider;

pub use audit::{ReportSink, StoredReports, UNAUTHORIZED_ATTEMPT};
pub use directory::{ClientDirectory, JsonDirectory, MechanicDirectory, StaticDirectory};
pub use ledger::InventoryLedger;
pub use quotations::{compute_totals, QuotationEngine};
pub use scheduler::AppointmentScheduler;
pub use state_machine::{AppointmentTransitions, Transition, WorkOrderTransitions};
pub use work_orders::WorkOrderEngine;

/// The shop's engines wired over one record store.
#[derive(Clone)]
pub struct Workshop {
    pub ledger: InventoryLedger,
    pub scheduler: AppointmentScheduler,
    pub work_orders: WorkOrderEngine,
    pub quotations: QuotationEngine,
    pub reports: StoredReports,
    pub mechanics: Arc<dyn MechanicDirectory>,
}

impl Workshop {
    pub fn new(
        db: &Database,
        clients: Arc<dyn ClientDirectory>,
        mechanics: Arc<dyn MechanicDirectory>,
        ids: Arc<dyn IdProvider>,
    ) -> Self {
        let ledger = InventoryLedger::new(db.inventory.clone(), db.labor_catalog.clone());
        let scheduler = AppointmentScheduler::new(
            db.appointments.clone(),
            clients,
            mechanics.clone(),
            ids.clone(),
        );
        let work_orders = WorkOrderEngine::new(
            db.work_orders.clone(),
            db.appointments.clone(),
            ledger.clone(),
            ids.clone(),
        );
        let quotations = QuotationEngine::new(
            db.quotations.clone(),
            db.work_orders.clone(),
            ledger.clone(),
            ids,
        );

        Self {
            ledger,
            scheduler,
            work_orders,
            quotations,
            reports: StoredReports::new(db.reports.clone()),
            mechanics,
        }
    }

    /// Sink that role checks report unauthorized attempts to.
    pub fn audit(&self) -> Arc<dyn ReportSink> {
        Arc::new(self.reports.clone())
    }
}
