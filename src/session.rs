// Caregiver session: access flag + notes, loaded on start and persisted in the kv store.
// The access gate is a shared-code comparison, not a security boundary.

use tokio::sync::RwLock;
use tracing::{info, warn};
use wincode::{SchemaRead, SchemaWrite};

use crate::readings_repo::KvStore;

const ACCESS_KEY: &str = "healthmonitor_auth";
const NOTES_KEY: &str = "caregiver_notes";

#[derive(Debug, SchemaRead, SchemaWrite)]
struct AccessRecord {
    granted: bool,
}

#[derive(Debug, SchemaRead, SchemaWrite)]
struct NotesRecord {
    notes: Vec<String>,
}

/// Single static access code compared verbatim.
#[derive(Debug, Clone)]
pub struct AccessGate {
    code: String,
}

impl AccessGate {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    pub fn check(&self, input: &str) -> bool {
        input == self.code
    }
}

#[derive(Debug, Default)]
struct SessionState {
    authenticated: bool,
    notes: Vec<String>,
}

pub struct Session {
    kv: KvStore,
    gate: AccessGate,
    state: RwLock<SessionState>,
}

impl Session {
    /// Restores the access flag and notes from the store.
    pub async fn load(kv: KvStore, gate: AccessGate) -> anyhow::Result<Self> {
        let authenticated = match kv.get(ACCESS_KEY).await? {
            Some(bytes) => match wincode::deserialize::<AccessRecord>(&bytes) {
                Ok(r) => r.granted,
                Err(e) => {
                    warn!(error = %e, "wincode deserialize access record, treating as signed out");
                    false
                }
            },
            None => false,
        };
        let notes = match kv.get(NOTES_KEY).await? {
            Some(bytes) => match wincode::deserialize::<NotesRecord>(&bytes) {
                Ok(r) => r.notes,
                Err(e) => {
                    warn!(error = %e, "wincode deserialize notes, starting empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        info!(authenticated, notes = notes.len(), "session loaded");
        Ok(Self {
            kv,
            gate,
            state: RwLock::new(SessionState {
                authenticated,
                notes,
            }),
        })
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.authenticated
    }

    /// Sets and persists the access flag when `code` matches. Returns whether it matched.
    pub async fn login(&self, code: &str) -> anyhow::Result<bool> {
        if !self.gate.check(code) {
            info!("access code rejected");
            return Ok(false);
        }
        let payload = wincode::serialize(&AccessRecord { granted: true })
            .map_err(|e| anyhow::anyhow!("wincode access record: {}", e))?;
        self.kv.put(ACCESS_KEY, payload).await?;
        self.state.write().await.authenticated = true;
        info!("access granted");
        Ok(true)
    }

    /// Clears the access flag in memory and in the store. Notes are kept.
    pub async fn logout(&self) -> anyhow::Result<()> {
        self.kv.remove(ACCESS_KEY).await?;
        self.state.write().await.authenticated = false;
        info!("signed out");
        Ok(())
    }

    /// Most recent first.
    pub async fn notes(&self) -> Vec<String> {
        self.state.read().await.notes.clone()
    }

    /// Prepends the trimmed note and persists. Blank input is ignored (returns None).
    pub async fn add_note(&self, text: &str) -> anyhow::Result<Option<Vec<String>>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let mut state = self.state.write().await;
        let mut updated = Vec::with_capacity(state.notes.len() + 1);
        updated.push(text.to_string());
        updated.extend(state.notes.iter().cloned());

        let record = NotesRecord { notes: updated };
        let payload = wincode::serialize(&record)
            .map_err(|e| anyhow::anyhow!("wincode notes: {}", e))?;
        self.kv.put(NOTES_KEY, payload).await?;
        state.notes = record.notes;
        Ok(Some(state.notes.clone()))
    }
}
