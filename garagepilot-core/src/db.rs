use serde::{de::DeserializeOwned, Serialize};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::{ShopError, StoreError};
use crate::models::{Appointment, InventoryItem, LaborCatalogItem, Quotation, Report, WorkOrder};

/// A record that lives in a keyed JSON collection.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human readable entity name, used in errors and logs.
    const ENTITY: &'static str;

    /// Unique key of the record within its collection.
    fn key(&self) -> String;
}

/// An ordered, keyed collection of records backed by one JSON array file.
///
/// All access goes through a single async mutex, so there is exactly one
/// writer at a time. Insertion order is preserved on listing.
pub struct Collection<T> {
    path: Option<PathBuf>,
    records: Mutex<Vec<T>>,
}

impl<T: Record> Collection<T> {
    /// Opens the collection stored at `path`.
    ///
    /// A missing file is treated as an empty collection; it is created on
    /// the first commit.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = read_records(&path).await?;
        debug!("Loaded {} {} record(s) from {}", records.len(), T::ENTITY, path.display());
        Ok(Self {
            path: Some(path),
            records: Mutex::new(records),
        })
    }

    /// Creates a collection that is never written to disk.
    pub fn in_memory(records: Vec<T>) -> Self {
        Self {
            path: None,
            records: Mutex::new(records),
        }
    }

    pub async fn list(&self) -> Vec<T> {
        self.records.lock().await.clone()
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        self.records
            .lock()
            .await
            .iter()
            .find(|r| r.key() == key)
            .cloned()
    }

    /// Starts a read-modify-write cycle holding the collection lock.
    pub async fn begin(&self) -> Transaction<'_, T> {
        let guard = self.records.lock().await;
        let working = guard.clone();
        Transaction {
            guard,
            working,
            path: self.path.as_deref(),
        }
    }
}

/// Exclusive working copy of a collection.
///
/// Edits become visible only after [`Transaction::commit`] has persisted
/// them. Dropping the transaction discards every edit.
pub struct Transaction<'a, T> {
    guard: MutexGuard<'a, Vec<T>>,
    working: Vec<T>,
    path: Option<&'a Path>,
}

impl<'a, T: Record> Transaction<'a, T> {
    pub fn find(&self, key: &str) -> Option<&T> {
        self.working.iter().find(|r| r.key() == key)
    }

    pub fn find_mut(&mut self, key: &str) -> Option<&mut T> {
        self.working.iter_mut().find(|r| r.key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.working.iter()
    }

    /// Appends a record, rejecting a key that is already taken.
    pub fn insert(&mut self, record: T) -> Result<(), ShopError> {
        let key = record.key();
        if self.find(&key).is_some() {
            return Err(ShopError::Duplicate {
                entity: T::ENTITY,
                key,
            });
        }
        self.working.push(record);
        Ok(())
    }

    /// Removes the record with `key`, returning it if it existed.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let idx = self.working.iter().position(|r| r.key() == key)?;
        Some(self.working.remove(idx))
    }

    /// Persists the working copy and publishes it.
    pub async fn commit(mut self) -> Result<(), StoreError> {
        if let Some(path) = self.path {
            write_records(path, &self.working).await?;
        }
        *self.guard = std::mem::take(&mut self.working);
        Ok(())
    }
}

impl<T> Deref for Transaction<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.working
    }
}

pub(crate) async fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    serde_json::from_slice(&raw).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let body = serde_json::to_vec_pretty(records).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

/// The four core collections plus the labor catalog and the audit log.
#[derive(Clone)]
pub struct Database {
    pub inventory: Arc<Collection<InventoryItem>>,
    pub labor_catalog: Arc<Collection<LaborCatalogItem>>,
    pub appointments: Arc<Collection<Appointment>>,
    pub work_orders: Arc<Collection<WorkOrder>>,
    pub quotations: Arc<Collection<Quotation>>,
    pub reports: Arc<Collection<Report>>,
}

impl Database {
    /// Opens every collection file under `data_dir`.
    pub async fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let db = Self {
            inventory: Arc::new(Collection::open(data_dir.join("inventory.json")).await?),
            labor_catalog: Arc::new(Collection::open(data_dir.join("labor_catalog.json")).await?),
            appointments: Arc::new(Collection::open(data_dir.join("appointments.json")).await?),
            work_orders: Arc::new(Collection::open(data_dir.join("work_orders.json")).await?),
            quotations: Arc::new(Collection::open(data_dir.join("quotations.json")).await?),
            reports: Arc::new(Collection::open(data_dir.join("reports.json")).await?),
        };
        info!("Record store opened at {}", data_dir.display());
        Ok(db)
    }

    pub fn in_memory() -> Self {
        Self {
            inventory: Arc::new(Collection::in_memory(Vec::new())),
            labor_catalog: Arc::new(Collection::in_memory(Vec::new())),
            appointments: Arc::new(Collection::in_memory(Vec::new())),
            work_orders: Arc::new(Collection::in_memory(Vec::new())),
            quotations: Arc::new(Collection::in_memory(Vec::new())),
            reports: Arc::new(Collection::in_memory(Vec::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn part(code: &str, quantity: u32) -> InventoryItem {
        InventoryItem {
            code: code.to_string(),
            name: format!("Part {}", code),
            description: String::new(),
            quantity,
            unit_price: Decimal::from(100),
            vehicle_id: None,
        }
    }

    #[tokio::test]
    async fn test_commit_persists_and_reloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("inventory.json");

        let items: Collection<InventoryItem> = Collection::open(&path).await.expect("open");
        let mut tx = items.begin().await;
        tx.insert(part("P1", 5)).expect("insert");
        tx.insert(part("P2", 1)).expect("insert");
        tx.commit().await.expect("commit");

        let reopened: Collection<InventoryItem> = Collection::open(&path).await.expect("reopen");
        let listed = reopened.list().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].code, "P1");
        assert_eq!(listed[1].code, "P2");
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_edits() {
        let items = Collection::in_memory(vec![part("P1", 5)]);
        {
            let mut tx = items.begin().await;
            tx.find_mut("P1").expect("present").quantity = 0;
        }
        assert_eq!(items.get("P1").await.expect("present").quantity, 5);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_key() {
        let items = Collection::in_memory(vec![part("P1", 5)]);
        let mut tx = items.begin().await;
        let err = tx.insert(part("P1", 9)).unwrap_err();
        assert!(matches!(err, ShopError::Duplicate { entity: "inventory item", .. }));
    }

    #[tokio::test]
    async fn test_malformed_file_is_a_store_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, b"{ not json").expect("write");

        let result: Result<Collection<InventoryItem>, _> = Collection::open(&path).await;
        assert!(matches!(result, Err(StoreError::Json { .. })));
    }
}
