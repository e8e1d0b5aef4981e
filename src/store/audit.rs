// Append-only audit log of seed state transitions. Every entry is mirrored to tracing.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::SeedStore;
use crate::clock::unix_millis;
use crate::models::AuditEntry;

/// Audit sink. Appending never fails the caller; write errors are logged and dropped.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn log(&self, kind: &str, message: &str);
}

pub(super) async fn init_audit_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at INTEGER NOT NULL,
            kind TEXT NOT NULL,
            message TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[async_trait]
impl AuditLog for SeedStore {
    async fn log(&self, kind: &str, message: &str) {
        tracing::info!(audit = kind, "{}", message);
        if let Err(e) = self.append_audit(kind, message).await {
            tracing::warn!(error = %e, audit = kind, "audit log append failed");
        }
    }
}

impl SeedStore {
    async fn append_audit(&self, kind: &str, message: &str) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO audit_log (created_at, kind, message) VALUES ($1, $2, $3)")
            .bind(unix_millis()?)
            .bind(kind)
            .bind(message)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Most recent entries, newest first.
    pub async fn recent_audit(&self, limit: u32) -> anyhow::Result<Vec<AuditEntry>> {
        let rows = sqlx::query(
            "SELECT id, created_at, kind, message FROM audit_log ORDER BY id DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(AuditEntry {
                id: row.try_get("id")?,
                created_at: row.try_get("created_at")?,
                kind: row.try_get("kind")?,
                message: row.try_get("message")?,
            });
        }
        Ok(out)
    }
}
