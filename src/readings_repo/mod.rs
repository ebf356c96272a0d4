// SQLite reading store. One row per reading; absent measurements are NULL.
// kv_store (same file) holds session state as versioned wincode blobs, see kv.rs.

mod blob;
pub mod kv;

use crate::models::{Posture, VitalReading};
use chrono::{TimeZone, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

pub use kv::KvStore;

pub struct ReadingsRepo {
    pool: SqlitePool,
    retention_ms: i64,
}

impl ReadingsRepo {
    pub async fn connect(path: &str, retention_days: u32) -> anyhow::Result<Self> {
        Self::connect_with_pool_size(path, retention_days, 5).await
    }

    pub async fn connect_with_pool_size(
        path: &str,
        retention_days: u32,
        max_pool_size: u32,
    ) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        let retention_ms = (retention_days as i64) * 24 * 60 * 60 * 1000;
        Ok(Self { pool, retention_ms })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recorded_at INTEGER NOT NULL,
                temperature REAL,
                heart_rate INTEGER,
                spo2 REAL,
                posture TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_readings_recorded_at ON readings(recorded_at)",
        )
        .execute(&self.pool)
        .await?;

        kv::init_kv_table(&self.pool).await?;

        Ok(())
    }

    /// Key-value store sharing this database file.
    pub fn kv_store(&self) -> KvStore {
        KvStore::new(self.pool.clone())
    }

    #[instrument(skip(self, reading), fields(repo = "readings", operation = "insert_reading"))]
    pub async fn insert_reading(&self, reading: &VitalReading) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO readings (recorded_at, temperature, heart_rate, spo2, posture) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(reading.recorded_at.timestamp_millis())
        .bind(reading.temperature_c)
        .bind(reading.heart_rate_bpm.map(i64::from))
        .bind(reading.spo2_percent)
        .bind(reading.posture.as_ref().map(|p| p.label().to_string()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent reading by timestamp (ties: last inserted).
    #[instrument(skip(self), fields(repo = "readings", operation = "latest_reading"))]
    pub async fn latest_reading(&self) -> anyhow::Result<Option<VitalReading>> {
        let row = sqlx::query(
            "SELECT recorded_at, temperature, heart_rate, spo2, posture
             FROM readings ORDER BY recorded_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::parse_reading_row).transpose()
    }

    /// Readings in [from_ms, to_ms], ascending by timestamp.
    #[instrument(skip(self), fields(repo = "readings", operation = "readings_in_range"))]
    pub async fn readings_in_range(
        &self,
        from_ms: i64,
        to_ms: i64,
    ) -> anyhow::Result<Vec<VitalReading>> {
        let rows = sqlx::query(
            "SELECT recorded_at, temperature, heart_rate, spo2, posture
             FROM readings WHERE recorded_at >= $1 AND recorded_at <= $2
             ORDER BY recorded_at ASC, id ASC",
        )
        .bind(from_ms)
        .bind(to_ms)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_reading_row(&row)?);
        }
        Ok(out)
    }

    pub async fn count_readings(&self) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM readings")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Delete readings older than the retention window. Returns rows removed.
    #[instrument(skip(self), fields(repo = "readings", operation = "prune_old_data"))]
    pub async fn prune_old_data(&self) -> anyhow::Result<u64> {
        let cutoff = Utc::now().timestamp_millis() - self.retention_ms;
        let r = sqlx::query("DELETE FROM readings WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    /// Reclaim space after deletes (run periodically after pruning).
    #[instrument(skip(self), fields(repo = "readings", operation = "vacuum"))]
    pub async fn vacuum(&self) -> anyhow::Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    fn parse_reading_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<VitalReading> {
        let recorded_at: i64 = row.try_get("recorded_at")?;
        let temperature: Option<f64> = row.try_get("temperature")?;
        let heart_rate: Option<i64> = row.try_get("heart_rate")?;
        let spo2: Option<f64> = row.try_get("spo2")?;
        let posture: Option<String> = row.try_get("posture")?;

        let recorded_at = Utc
            .timestamp_millis_opt(recorded_at)
            .single()
            .ok_or_else(|| anyhow::anyhow!("recorded_at out of range: {}", recorded_at))?;
        let heart_rate_bpm = match heart_rate {
            Some(hr) => Some(u32::try_from(hr)?),
            None => None,
        };

        Ok(VitalReading {
            recorded_at,
            temperature_c: temperature,
            heart_rate_bpm,
            spo2_percent: spo2,
            posture: posture.map(Posture::from),
        })
    }
}
