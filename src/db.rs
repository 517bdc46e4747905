use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::models::StatsReport;

/// The single cache slot holding the last computed report.
pub const CACHE_SLOT: &str = "gradesData";

#[async_trait]
pub trait ReportCache: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<StatsReport>>;
    async fn store(&self, report: &StatsReport) -> anyhow::Result<()>;
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub struct PgReportCache {
    pool: PgPool,
}

impl PgReportCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportCache for PgReportCache {
    async fn load(&self) -> anyhow::Result<Option<StatsReport>> {
        let row = sqlx::query("SELECT payload FROM grades_panel.report_cache WHERE slot = $1")
            .bind(CACHE_SLOT)
            .fetch_optional(&self.pool)
            .await
            .context("failed to read cached report")?;

        match row {
            Some(row) => {
                let Json(report): Json<StatsReport> = row.try_get("payload")?;
                Ok(Some(report))
            }
            None => Ok(None),
        }
    }

    async fn store(&self, report: &StatsReport) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO grades_panel.report_cache (slot, payload, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (slot) DO UPDATE
            SET payload = EXCLUDED.payload, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(CACHE_SLOT)
        .bind(Json(report))
        .execute(&self.pool)
        .await
        .context("failed to write cached report")?;
        Ok(())
    }
}

/// Process-local cache, used when no database is configured.
#[derive(Default)]
pub struct MemoryReportCache {
    slot: Mutex<Option<StatsReport>>,
}

#[async_trait]
impl ReportCache for MemoryReportCache {
    async fn load(&self) -> anyhow::Result<Option<StatsReport>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("report cache lock poisoned"))?;
        Ok(slot.clone())
    }

    async fn store(&self, report: &StatsReport) -> anyhow::Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("report cache lock poisoned"))?;
        *slot = Some(report.clone());
        Ok(())
    }
}
