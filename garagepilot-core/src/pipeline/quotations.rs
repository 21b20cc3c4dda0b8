use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::Collection;
use crate::error::{ShopError, ShopResult};
use crate::ids::{quotation_code, IdProvider};
use crate::models::quotation::{
    CreateQuotation, DraftFromWorkOrder, LaborInput, PartInput, QuotationPatch, DRAFT, PROFORMA,
};
use crate::models::{
    checked_product, checked_sum, round_money, LaborLine, PartLine, Quotation, QuotationTotals, WorkOrder,
};
use crate::pipeline::ledger::InventoryLedger;

/// Largest discount allowed on labor, in percent.
pub const MAX_LABOR_DISCOUNT: i64 = 20;

/// Fixed sales tax rate (13%).
pub fn tax_rate() -> Decimal {
    Decimal::new(13, 2)
}

pub fn clamp_discount(percent: Decimal) -> Decimal {
    percent.clamp(Decimal::ZERO, Decimal::from(MAX_LABOR_DISCOUNT))
}

/// Computes the money fields of a quotation.
///
/// Line subtotals are rounded to cents first and the rounded values are
/// summed; every derived amount is rounded half-up where it is computed.
/// The discount applies to labor only. Amounts too large to represent are
/// rejected as invalid input.
pub fn compute_totals(
    parts: &[PartLine],
    labor: &[LaborLine],
    discount_percent: Decimal,
) -> ShopResult<QuotationTotals> {
    let part_amounts = parts
        .iter()
        .map(|p| checked_product(Decimal::from(p.quantity), p.unit_price).map(round_money))
        .collect::<ShopResult<Vec<_>>>()?;
    let parts_subtotal = round_money(checked_sum(part_amounts)?);
    let labor_subtotal = round_money(checked_sum(labor.iter().map(|l| round_money(l.subtotal)))?);

    let discount = clamp_discount(discount_percent);
    let discount_amount = round_money(checked_product(labor_subtotal, discount)? / Decimal::ONE_HUNDRED);
    let taxable_base = round_money(checked_sum([parts_subtotal, labor_subtotal, -discount_amount])?);
    let tax = round_money(checked_product(taxable_base, tax_rate())?);
    let total = round_money(checked_sum([taxable_base, tax])?);

    Ok(QuotationTotals {
        parts_subtotal,
        labor_subtotal,
        discount_amount,
        taxable_base,
        tax,
        total,
    })
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Quotations and proformas.
#[derive(Clone)]
pub struct QuotationEngine {
    quotations: Arc<Collection<Quotation>>,
    orders: Arc<Collection<WorkOrder>>,
    ledger: InventoryLedger,
    ids: Arc<dyn IdProvider>,
}

impl QuotationEngine {
    pub fn new(
        quotations: Arc<Collection<Quotation>>,
        orders: Arc<Collection<WorkOrder>>,
        ledger: InventoryLedger,
        ids: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            quotations,
            orders,
            ledger,
            ids,
        }
    }

    pub async fn get(&self, code: &str) -> ShopResult<Quotation> {
        self.quotations
            .get(code)
            .await
            .ok_or_else(|| ShopError::QuotationNotFound(code.to_string()))
    }

    pub async fn list(&self) -> Vec<Quotation> {
        self.quotations.list().await
    }

    /// Creates a draft quotation from manually entered lines.
    pub async fn create(&self, request: CreateQuotation) -> ShopResult<Quotation> {
        let client_id = required(request.client_id).ok_or(ShopError::MissingClient)?;
        let client_name = required(request.client_name).ok_or(ShopError::MissingClient)?;
        if request.parts.is_empty() && request.labor_lines.is_empty() {
            return Err(ShopError::EmptyQuotation);
        }

        let parts = self.price_parts(request.parts).await?;
        let labor_lines = build_labor(request.labor_lines)?;
        let discount = clamp_discount(request.labor_discount_percent.unwrap_or(Decimal::ZERO));

        let now = Utc::now();
        let quotation = Quotation {
            code: quotation_code(self.ids.next_id()),
            client_id,
            client_name,
            vehicle_plate: request.vehicle_plate.unwrap_or_default().trim().to_string(),
            work_order_code: required(request.work_order_code),
            totals: compute_totals(&parts, &labor_lines, discount)?,
            parts,
            labor_lines,
            labor_discount_percent: discount,
            is_proforma: false,
            state: required(request.state).unwrap_or_else(|| DRAFT.to_string()),
            created_at: now,
            updated_at: now,
            proforma_at: None,
        };

        let mut tx = self.quotations.begin().await;
        tx.insert(quotation.clone())?;
        tx.commit().await?;

        info!("Quotation {} created, total {}", quotation.code, quotation.totals.total);
        Ok(quotation)
    }

    /// Drafts a quotation from the parts and services of a work order.
    pub async fn draft_from_work_order(
        &self,
        order_code: &str,
        request: DraftFromWorkOrder,
    ) -> ShopResult<Quotation> {
        let order = self
            .orders
            .get(order_code)
            .await
            .ok_or_else(|| ShopError::not_found("work order", order_code))?;

        let parts = order
            .parts_used
            .iter()
            .map(|p| PartInput {
                code: p.code.clone(),
                name: Some(p.name.clone()),
                quantity: p.quantity,
                unit_price: Some(p.unit_price),
            })
            .collect();
        let labor_lines = order
            .services_performed
            .iter()
            .map(|s| LaborInput {
                code: Some(s.code.clone()),
                name: s.name.clone(),
                hours: None,
                rate: s.unit_price,
            })
            .collect();

        self.create(CreateQuotation {
            client_id: Some(order.client_id),
            client_name: Some(order.client_name),
            vehicle_plate: Some(order.vehicle_plate),
            work_order_code: Some(order.code_order),
            parts,
            labor_lines,
            labor_discount_percent: request.labor_discount_percent,
            state: None,
        })
        .await
    }

    /// Merges the patch into a draft and recomputes its totals.
    pub async fn update(&self, code: &str, patch: QuotationPatch) -> ShopResult<Quotation> {
        let mut tx = self.quotations.begin().await;
        let current = tx
            .find(code)
            .cloned()
            .ok_or_else(|| ShopError::QuotationNotFound(code.to_string()))?;
        if current.is_proforma {
            warn!("Rejected edit of proforma {}", code);
            return Err(ShopError::ProformaImmutable(code.to_string()));
        }

        let mut next = current;
        if let Some(client_id) = patch.client_id {
            next.client_id = required(Some(client_id)).ok_or(ShopError::MissingClient)?;
        }
        if let Some(client_name) = patch.client_name {
            next.client_name = required(Some(client_name)).ok_or(ShopError::MissingClient)?;
        }
        if let Some(plate) = patch.vehicle_plate {
            next.vehicle_plate = plate.trim().to_string();
        }
        if let Some(link) = patch.work_order_code {
            next.work_order_code = required(Some(link));
        }
        if let Some(parts) = patch.parts {
            next.parts = self.price_parts(parts).await?;
        }
        if let Some(labor) = patch.labor_lines {
            next.labor_lines = build_labor(labor)?;
        }
        if let Some(discount) = patch.labor_discount_percent {
            next.labor_discount_percent = clamp_discount(discount);
        }
        if let Some(state) = required(patch.state) {
            if state.eq_ignore_ascii_case(PROFORMA) {
                return Err(ShopError::invalid("use the proforma conversion to freeze a quotation"));
            }
            next.state = state;
        }
        if next.parts.is_empty() && next.labor_lines.is_empty() {
            return Err(ShopError::EmptyQuotation);
        }

        next.totals = compute_totals(&next.parts, &next.labor_lines, next.labor_discount_percent)?;
        next.updated_at = Utc::now();
        if let Some(slot) = tx.find_mut(code) {
            *slot = next.clone();
        }
        tx.commit().await?;

        info!("Quotation {} updated, total {}", code, next.totals.total);
        Ok(next)
    }

    /// Freezes a quotation as a proforma. There is no way back.
    pub async fn convert_to_proforma(&self, code: &str) -> ShopResult<Quotation> {
        let mut tx = self.quotations.begin().await;
        let quotation = tx
            .find_mut(code)
            .ok_or_else(|| ShopError::QuotationNotFound(code.to_string()))?;
        if quotation.is_proforma {
            return Err(ShopError::AlreadyProforma(code.to_string()));
        }

        let now = Utc::now();
        quotation.totals = compute_totals(
            &quotation.parts,
            &quotation.labor_lines,
            quotation.labor_discount_percent,
        )?;
        quotation.is_proforma = true;
        quotation.state = PROFORMA.to_string();
        quotation.proforma_at = Some(now);
        quotation.updated_at = now;
        let frozen = quotation.clone();
        tx.commit().await?;

        info!("Quotation {} frozen as proforma, total {}", code, frozen.totals.total);
        Ok(frozen)
    }

    /// Deletes a draft. Proformas are permanent.
    pub async fn delete(&self, code: &str) -> ShopResult<Quotation> {
        let mut tx = self.quotations.begin().await;
        let is_proforma = tx
            .find(code)
            .map(|q| q.is_proforma)
            .ok_or_else(|| ShopError::QuotationNotFound(code.to_string()))?;
        if is_proforma {
            warn!("Rejected deletion of proforma {}", code);
            return Err(ShopError::ProformaImmutable(code.to_string()));
        }

        let removed = tx
            .remove(code)
            .ok_or_else(|| ShopError::QuotationNotFound(code.to_string()))?;
        tx.commit().await?;

        info!("Quotation {} deleted", code);
        Ok(removed)
    }

    async fn price_parts(&self, inputs: Vec<PartInput>) -> ShopResult<Vec<PartLine>> {
        let mut lines = Vec::with_capacity(inputs.len());
        for input in inputs {
            let code = input.code.trim().to_string();
            if code.is_empty() {
                return Err(ShopError::invalid("part code is required"));
            }
            if input.quantity == 0 {
                return Err(ShopError::invalid(format!("quantity for part {} must be at least 1", code)));
            }

            let (name, unit_price) = match input.unit_price {
                Some(price) if price.is_sign_negative() => {
                    return Err(ShopError::invalid(format!("price for part {} cannot be negative", code)))
                }
                Some(price) => {
                    let name = match required(input.name) {
                        Some(name) => name,
                        None => self.ledger.part(&code).await.map(|p| p.name).unwrap_or_else(|_| code.clone()),
                    };
                    (name, price)
                }
                None => {
                    let item = self.ledger.part(&code).await?;
                    (required(input.name).unwrap_or(item.name), item.unit_price)
                }
            };

            lines.push(PartLine::new(code, name, input.quantity, unit_price)?);
        }
        Ok(lines)
    }
}

fn build_labor(inputs: Vec<LaborInput>) -> ShopResult<Vec<LaborLine>> {
    inputs
        .into_iter()
        .map(|input| {
            let name = required(Some(input.name))
                .ok_or_else(|| ShopError::invalid("labor line name is required"))?;
            if input.rate.is_sign_negative() || input.hours.is_some_and(|h| h.is_sign_negative()) {
                return Err(ShopError::invalid(format!("labor line {} has a negative amount", name)));
            }
            LaborLine::new(required(input.code), name, input.hours, input.rate)
        })
        .collect()
}
