use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::db::read_records;
use crate::error::ShopResult;

pub const MECHANIC_ROLE: &str = "mechanic";

/// Client identity as kept by the client directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub plate: String,
    pub client_id: String,
    /// Vehicle catalog entry (make/model) used to match parts
    #[serde(default)]
    pub model_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub code: String,
    pub name: String,
    pub role: String,
}

/// Lookup of clients and their vehicles.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    async fn find_client(&self, id: &str) -> ShopResult<Option<ClientRecord>>;

    async fn find_vehicle(&self, plate: &str) -> ShopResult<Option<VehicleRecord>>;
}

/// Lookup of users that can be assigned to appointments.
#[async_trait]
pub trait MechanicDirectory: Send + Sync {
    async fn mechanics(&self) -> ShopResult<Vec<UserRecord>>;

    async fn is_mechanic(&self, name: &str) -> ShopResult<bool> {
        let name = name.trim();
        Ok(self.mechanics().await?.iter().any(|m| m.name.trim() == name))
    }
}

pub fn same_plate(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Directory backed by the JSON files the client, vehicle and user CRUD
/// screens maintain. Files are re-read on every lookup since another
/// process owns them.
pub struct JsonDirectory {
    data_dir: PathBuf,
}

impl JsonDirectory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

#[async_trait]
impl ClientDirectory for JsonDirectory {
    async fn find_client(&self, id: &str) -> ShopResult<Option<ClientRecord>> {
        let clients: Vec<ClientRecord> = read_records(&self.data_dir.join("clients.json")).await?;
        Ok(clients.into_iter().find(|c| c.id.trim() == id.trim()))
    }

    async fn find_vehicle(&self, plate: &str) -> ShopResult<Option<VehicleRecord>> {
        let vehicles: Vec<VehicleRecord> = read_records(&self.data_dir.join("vehicles.json")).await?;
        Ok(vehicles.into_iter().find(|v| same_plate(&v.plate, plate)))
    }
}

#[async_trait]
impl MechanicDirectory for JsonDirectory {
    async fn mechanics(&self) -> ShopResult<Vec<UserRecord>> {
        let users: Vec<UserRecord> = read_records(&self.data_dir.join("users.json")).await?;
        Ok(users.into_iter().filter(|u| u.role == MECHANIC_ROLE).collect())
    }
}

/// Fixed in-memory directory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    pub clients: Vec<ClientRecord>,
    pub vehicles: Vec<VehicleRecord>,
    pub users: Vec<UserRecord>,
}

impl StaticDirectory {
    pub fn with_client(mut self, id: &str, name: &str) -> Self {
        self.clients.push(ClientRecord {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_vehicle(mut self, plate: &str, client_id: &str, model_id: Option<&str>) -> Self {
        self.vehicles.push(VehicleRecord {
            plate: plate.to_string(),
            client_id: client_id.to_string(),
            model_id: model_id.map(str::to_string),
        });
        self
    }

    pub fn with_user(mut self, name: &str, role: &str) -> Self {
        self.users.push(UserRecord {
            code: name.to_lowercase(),
            name: name.to_string(),
            role: role.to_string(),
        });
        self
    }
}

#[async_trait]
impl ClientDirectory for StaticDirectory {
    async fn find_client(&self, id: &str) -> ShopResult<Option<ClientRecord>> {
        Ok(self.clients.iter().find(|c| c.id == id).cloned())
    }

    async fn find_vehicle(&self, plate: &str) -> ShopResult<Option<VehicleRecord>> {
        Ok(self.vehicles.iter().find(|v| same_plate(&v.plate, plate)).cloned())
    }
}

#[async_trait]
impl MechanicDirectory for StaticDirectory {
    async fn mechanics(&self) -> ShopResult<Vec<UserRecord>> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.role == MECHANIC_ROLE)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_directory_reads_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("users.json"),
            r#"[{"code":"admin01","name":"Administrador","role":"admin"},
                {"code":"m1","name":"Ana","role":"mechanic"}]"#,
        )
        .expect("write users");
        std::fs::write(
            dir.path().join("vehicles.json"),
            r#"[{"plate":"abc123","client_id":"1-111"}]"#,
        )
        .expect("write vehicles");

        let directory = JsonDirectory::new(dir.path());
        let mechanics = directory.mechanics().await.expect("mechanics");
        assert_eq!(mechanics.len(), 1);
        assert!(directory.is_mechanic("Ana").await.expect("lookup"));
        assert!(!directory.is_mechanic("Administrador").await.expect("lookup"));

        let vehicle = directory.find_vehicle("ABC123").await.expect("lookup");
        assert_eq!(vehicle.map(|v| v.client_id), Some("1-111".to_string()));
        assert!(directory.find_client("1-111").await.expect("lookup").is_none());
    }
}
