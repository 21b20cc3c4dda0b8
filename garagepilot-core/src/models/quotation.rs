use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{checked_product, round_money};
use super::work_order::PartLine;
use crate::db::Record;
use crate::error::ShopResult;

/// Label of a quotation that is still editable.
pub const DRAFT: &str = "draft";

/// Label stamped on conversion.
pub const PROFORMA: &str = "proforma";

/// Labor entry on a quotation.
///
/// With `hours` set the subtotal is `hours × rate`; without it the rate is
/// a flat amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborLine {
    pub code: Option<String>,
    pub name: String,
    pub hours: Option<Decimal>,
    pub rate: Decimal,
    pub subtotal: Decimal,
}

impl LaborLine {
    pub fn new(
        code: Option<String>,
        name: impl Into<String>,
        hours: Option<Decimal>,
        rate: Decimal,
    ) -> ShopResult<Self> {
        let amount = match hours {
            Some(h) => checked_product(h, rate)?,
            None => rate,
        };
        Ok(Self {
            code,
            name: name.into(),
            hours,
            rate,
            subtotal: round_money(amount),
        })
    }
}

/// Computed money fields of a quotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationTotals {
    pub parts_subtotal: Decimal,
    pub labor_subtotal: Decimal,
    pub discount_amount: Decimal,
    pub taxable_base: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Cost estimate for a client. Frozen for good once `is_proforma` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quotation {
    /// Unique quotation code (`COT-<n>`)
    pub code: String,

    pub client_id: String,

    pub client_name: String,

    #[serde(default)]
    pub vehicle_plate: String,

    /// Informational link to the work order it was drafted from
    pub work_order_code: Option<String>,

    #[serde(default)]
    pub parts: Vec<PartLine>,

    #[serde(default)]
    pub labor_lines: Vec<LaborLine>,

    /// Discount on labor only, clamped to 0-20
    pub labor_discount_percent: Decimal,

    pub totals: QuotationTotals,

    pub is_proforma: bool,

    /// Free-form label (draft, accepted, proforma)
    pub state: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// When the quotation was frozen
    pub proforma_at: Option<DateTime<Utc>>,
}

impl Record for Quotation {
    const ENTITY: &'static str = "quotation";

    fn key(&self) -> String {
        self.code.clone()
    }
}

/// Part line as submitted by a client; a missing price is looked up in
/// the inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartInput {
    pub code: String,
    pub name: Option<String>,
    pub quantity: u32,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaborInput {
    pub code: Option<String>,
    pub name: String,
    pub hours: Option<Decimal>,
    pub rate: Decimal,
}

/// Quotation creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateQuotation {
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    pub vehicle_plate: Option<String>,
    pub work_order_code: Option<String>,
    #[serde(default)]
    pub parts: Vec<PartInput>,
    #[serde(default)]
    pub labor_lines: Vec<LaborInput>,
    pub labor_discount_percent: Option<Decimal>,
    pub state: Option<String>,
}

/// Quotation update request; absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotationPatch {
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    pub vehicle_plate: Option<String>,
    pub work_order_code: Option<String>,
    pub parts: Option<Vec<PartInput>>,
    pub labor_lines: Option<Vec<LaborInput>>,
    pub labor_discount_percent: Option<Decimal>,
    pub state: Option<String>,
}

/// Request to draft a quotation from a work order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftFromWorkOrder {
    pub labor_discount_percent: Option<Decimal>,
}
