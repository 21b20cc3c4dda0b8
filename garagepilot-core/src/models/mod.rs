pub mod appointment;
pub mod inventory;
pub mod quotation;
pub mod report;
pub mod work_order;

pub use appointment::{Appointment, AppointmentState};
pub use inventory::{InventoryItem, LaborCatalogItem};
pub use quotation::{LaborLine, Quotation, QuotationTotals};
pub use report::Report;
pub use work_order::{PartLine, WorkOrder, WorkOrderState};

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{ShopError, ShopResult};

/// Rounds a monetary amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `a × b`, rejecting amounts outside the representable range.
pub fn checked_product(a: Decimal, b: Decimal) -> ShopResult<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| ShopError::invalid(format!("amount out of range: {} x {}", a, b)))
}

/// Sum of `amounts`, rejecting totals outside the representable range.
pub fn checked_sum<I>(amounts: I) -> ShopResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| ShopError::invalid("total amount out of range"))
    })
}
