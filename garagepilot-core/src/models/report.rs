use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Record;

/// Free-text incident record filed by a user or by the audit sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,

    /// Category, e.g. `Inventory`, `Clients`, `Unauthorized`
    pub kind: String,

    /// Name of whoever triggered the report
    pub actor: String,

    pub description: String,

    pub submitted_at: DateTime<Utc>,
}

impl Record for Report {
    const ENTITY: &'static str = "report";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Report filed through the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReport {
    pub kind: String,
    pub description: String,
}
