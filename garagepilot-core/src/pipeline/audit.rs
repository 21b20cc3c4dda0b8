use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::Collection;
use crate::error::ShopResult;
use crate::models::Report;

/// Report kind used when a user attempts a mutation their role forbids.
pub const UNAUTHORIZED_ATTEMPT: &str = "Unauthorized";

/// Fire-and-forget incident submission.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn submit(&self, kind: &str, actor: &str, description: &str, at: DateTime<Utc>);
}

/// Reports persisted in the `reports` collection.
#[derive(Clone)]
pub struct StoredReports {
    reports: Arc<Collection<Report>>,
}

impl StoredReports {
    pub fn new(reports: Arc<Collection<Report>>) -> Self {
        Self { reports }
    }

    pub async fn file(
        &self,
        kind: &str,
        actor: &str,
        description: &str,
        at: DateTime<Utc>,
    ) -> ShopResult<Report> {
        let report = Report {
            id: Uuid::new_v4(),
            kind: kind.trim().to_string(),
            actor: actor.to_string(),
            description: description.trim().to_string(),
            submitted_at: at,
        };

        let mut tx = self.reports.begin().await;
        tx.insert(report.clone())?;
        tx.commit().await?;

        info!("Report {} filed by {} ({})", report.id, report.actor, report.kind);
        Ok(report)
    }

    /// Lists reports, optionally narrowed to one kind.
    pub async fn list(&self, kind: Option<&str>) -> Vec<Report> {
        self.reports
            .list()
            .await
            .into_iter()
            .filter(|r| kind.map_or(true, |k| r.kind.eq_ignore_ascii_case(k)))
            .collect()
    }
}

#[async_trait]
impl ReportSink for StoredReports {
    async fn submit(&self, kind: &str, actor: &str, description: &str, at: DateTime<Utc>) {
        if let Err(e) = self.file(kind, actor, description, at).await {
            warn!("Dropping {} report from {}: {}", kind, actor, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_and_filter() {
        let sink = StoredReports::new(Arc::new(Collection::in_memory(Vec::new())));
        sink.submit(UNAUTHORIZED_ATTEMPT, "Ana", "tried to delete part P1", Utc::now())
            .await;
        sink.file("Inventory", "Luis", "shelf B is empty", Utc::now())
            .await
            .expect("file");

        assert_eq!(sink.list(None).await.len(), 2);
        let unauthorized = sink.list(Some("unauthorized")).await;
        assert_eq!(unauthorized.len(), 1);
        assert_eq!(unauthorized[0].actor, "Ana");
    }
}
