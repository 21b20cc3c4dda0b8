use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::Record;
use crate::error::{ShopError, ShopResult};

/// Replacement part held in stock.
///
/// Quantities are only ever changed through the inventory ledger or an
/// admin edit, and never drop below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Unique part code
    pub code: String,

    /// Display name
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Units currently on the shelf
    pub quantity: u32,

    /// Price per unit
    pub unit_price: Decimal,

    /// Vehicle catalog entry this part fits (`None` for universal parts)
    #[serde(default)]
    pub vehicle_id: Option<String>,
}

impl InventoryItem {
    /// Universal parts fit every vehicle.
    pub fn fits(&self, vehicle_id: &str) -> bool {
        match &self.vehicle_id {
            None => true,
            Some(v) => v == vehicle_id,
        }
    }

    pub fn validate(&self) -> ShopResult<()> {
        if self.code.trim().is_empty() {
            return Err(ShopError::invalid("part code is required"));
        }
        if self.name.trim().is_empty() {
            return Err(ShopError::invalid("part name is required"));
        }
        if self.unit_price.is_sign_negative() {
            return Err(ShopError::invalid("unit price cannot be negative"));
        }
        Ok(())
    }
}

impl Record for InventoryItem {
    const ENTITY: &'static str = "inventory item";

    fn key(&self) -> String {
        self.code.clone()
    }
}

/// Admin edit of an inventory item. The code itself cannot change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub unit_price: Option<Decimal>,
    /// `Some(None)` turns the part into a universal one.
    #[serde(default, with = "double_option")]
    pub vehicle_id: Option<Option<String>>,
}

impl InventoryPatch {
    pub fn apply(self, item: &mut InventoryItem) {
        if let Some(name) = self.name {
            item.name = name;
        }
        if let Some(description) = self.description {
            item.description = description;
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(price) = self.unit_price {
            item.unit_price = price;
        }
        if let Some(vehicle_id) = self.vehicle_id {
            item.vehicle_id = vehicle_id;
        }
    }
}

/// Labor catalog entry: a priced service a mechanic can perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborCatalogItem {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub unit_price: Decimal,
}

impl LaborCatalogItem {
    pub fn validate(&self) -> ShopResult<()> {
        if self.code.trim().is_empty() || self.name.trim().is_empty() {
            return Err(ShopError::invalid("labor code and name are required"));
        }
        if self.unit_price.is_sign_negative() {
            return Err(ShopError::invalid("labor price cannot be negative"));
        }
        Ok(())
    }
}

impl Record for LaborCatalogItem {
    const ENTITY: &'static str = "labor item";

    fn key(&self) -> String {
        self.code.clone()
    }
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
