// Process-local key-value store (kv_store table). Values are opaque payloads stored with a
// version prefix; callers own the encoding.

use super::blob;
use sqlx::SqlitePool;
use tracing::instrument;

pub(super) async fn init_kv_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query("CREATE TABLE IF NOT EXISTS kv_store (key TEXT PRIMARY KEY, value BLOB NOT NULL)")
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(Clone)]
pub struct KvStore {
    pool: SqlitePool,
}

impl KvStore {
    pub(super) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Payload stored under `key`. A blob with an unknown version reads as absent.
    #[instrument(skip(self), fields(repo = "kv", operation = "get"))]
    pub async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let value = sqlx::query_scalar::<_, Vec<u8>>("SELECT value FROM kv_store WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        let Some(value) = value else {
            return Ok(None);
        };
        match blob::blob_payload(&value, blob::BLOB_VERSION) {
            Some(payload) => Ok(Some(payload.to_vec())),
            None => {
                tracing::warn!(key, "kv value has unknown version, ignoring");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, payload), fields(repo = "kv", operation = "put"))]
    pub async fn put(&self, key: &str, payload: Vec<u8>) -> anyhow::Result<()> {
        let value = blob::with_version_prefix(blob::BLOB_VERSION, payload);
        sqlx::query("INSERT OR REPLACE INTO kv_store (key, value) VALUES ($1, $2)")
            .bind(key)
            .bind(&value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "kv", operation = "remove"))]
    pub async fn remove(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
