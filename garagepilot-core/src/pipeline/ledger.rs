use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::Collection;
use crate::error::{ShopError, ShopResult};
use crate::models::inventory::InventoryPatch;
use crate::models::{InventoryItem, LaborCatalogItem, PartLine};

/// Stock quantities and catalog prices.
///
/// Every reserve/release runs under the inventory collection lock and is
/// persisted before the lock is released, so concurrent reservations
/// against the same part are serialized and stock never goes negative.
#[derive(Clone)]
pub struct InventoryLedger {
    items: Arc<Collection<InventoryItem>>,
    labor: Arc<Collection<LaborCatalogItem>>,
}

impl InventoryLedger {
    pub fn new(items: Arc<Collection<InventoryItem>>, labor: Arc<Collection<LaborCatalogItem>>) -> Self {
        Self { items, labor }
    }

    /// Takes `quantity` units out of stock and returns the remaining count.
    pub async fn reserve(&self, code: &str, quantity: u32) -> ShopResult<u32> {
        let (_, remaining) = self.take(code, quantity, false).await?;
        Ok(remaining)
    }

    /// Reserves stock and returns a part line priced at this instant.
    pub async fn reserve_line(&self, code: &str, quantity: u32) -> ShopResult<PartLine> {
        let (line, _) = self.take(code, quantity, true).await?;
        line.ok_or_else(|| ShopError::UnknownPart(code.to_string()))
    }

    /// The line is priced before the decrement is committed, so a line that
    /// cannot be priced leaves the stock untouched.
    async fn take(&self, code: &str, quantity: u32, priced: bool) -> ShopResult<(Option<PartLine>, u32)> {
        if quantity == 0 {
            return Err(ShopError::invalid("quantity must be at least 1"));
        }

        let mut tx = self.items.begin().await;
        let Some(item) = tx.find_mut(code) else {
            warn!("Reservation of {} unit(s) of unknown part {}", quantity, code);
            return Err(ShopError::InsufficientStock {
                code: code.to_string(),
                requested: quantity,
                available: 0,
            });
        };

        if quantity > item.quantity {
            warn!(
                "Insufficient stock for {}: requested {}, available {}",
                code, quantity, item.quantity
            );
            return Err(ShopError::InsufficientStock {
                code: code.to_string(),
                requested: quantity,
                available: item.quantity,
            });
        }

        let line = if priced {
            Some(PartLine::new(item.code.clone(), item.name.clone(), quantity, item.unit_price)?)
        } else {
            None
        };
        item.quantity -= quantity;
        let remaining = item.quantity;
        tx.commit().await?;

        info!("Reserved {} x {} ({} left)", quantity, code, remaining);
        Ok((line, remaining))
    }

    /// Puts `quantity` units back into stock and returns the new count.
    pub async fn release(&self, code: &str, quantity: u32) -> ShopResult<u32> {
        let mut tx = self.items.begin().await;
        let item = tx
            .find_mut(code)
            .ok_or_else(|| ShopError::UnknownPart(code.to_string()))?;

        item.quantity = item
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| ShopError::invalid(format!("stock overflow for part {}", code)))?;
        let remaining = item.quantity;
        tx.commit().await?;

        info!("Released {} x {} ({} in stock)", quantity, code, remaining);
        Ok(remaining)
    }

    /// Current unit price of a part.
    pub async fn price_of(&self, code: &str) -> ShopResult<Decimal> {
        Ok(self.part(code).await?.unit_price)
    }

    pub async fn part(&self, code: &str) -> ShopResult<InventoryItem> {
        self.items
            .get(code)
            .await
            .ok_or_else(|| ShopError::UnknownPart(code.to_string()))
    }

    /// Lists parts in insertion order. With a vehicle catalog id, only
    /// universal parts and parts for that vehicle are returned.
    pub async fn list(&self, vehicle_id: Option<&str>) -> Vec<InventoryItem> {
        let items = self.items.list().await;
        match vehicle_id {
            Some(v) => items.into_iter().filter(|i| i.fits(v)).collect(),
            None => items,
        }
    }

    pub async fn create(&self, item: InventoryItem) -> ShopResult<InventoryItem> {
        item.validate()?;

        let mut tx = self.items.begin().await;
        tx.insert(item.clone())?;
        tx.commit().await?;

        info!("Inventory item {} created with {} unit(s)", item.code, item.quantity);
        Ok(item)
    }

    /// Admin edit; the part code is immutable.
    pub async fn update(&self, code: &str, patch: InventoryPatch) -> ShopResult<InventoryItem> {
        let mut tx = self.items.begin().await;
        let item = tx
            .find_mut(code)
            .ok_or_else(|| ShopError::not_found("inventory item", code))?;

        patch.apply(item);
        item.validate()?;
        let updated = item.clone();
        tx.commit().await?;

        info!("Inventory item {} updated", code);
        Ok(updated)
    }

    pub async fn delete(&self, code: &str) -> ShopResult<InventoryItem> {
        let mut tx = self.items.begin().await;
        let removed = tx
            .remove(code)
            .ok_or_else(|| ShopError::not_found("inventory item", code))?;
        tx.commit().await?;

        info!("Inventory item {} deleted", code);
        Ok(removed)
    }

    pub async fn labor_item(&self, code: &str) -> ShopResult<LaborCatalogItem> {
        self.labor
            .get(code)
            .await
            .ok_or_else(|| ShopError::not_found("labor item", code))
    }

    pub async fn labor_catalog(&self) -> Vec<LaborCatalogItem> {
        self.labor.list().await
    }

    pub async fn create_labor(&self, item: LaborCatalogItem) -> ShopResult<LaborCatalogItem> {
        item.validate()?;

        let mut tx = self.labor.begin().await;
        tx.insert(item.clone())?;
        tx.commit().await?;

        info!("Labor item {} added to the catalog", item.code);
        Ok(item)
    }

    pub async fn delete_labor(&self, code: &str) -> ShopResult<LaborCatalogItem> {
        let mut tx = self.labor.begin().await;
        let removed = tx
            .remove(code)
            .ok_or_else(|| ShopError::not_found("labor item", code))?;
        tx.commit().await?;

        info!("Labor item {} removed from the catalog", code);
        Ok(removed)
    }
}
