// 💾 Session Store - model snapshots per clarification session + audit trail
//
// Every accepted answer batch produces a new snapshot and one transition
// event. Events are append-only; snapshots are replaced in place.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, RwLock};

use crate::model::UnifiedBudgetModel;

// ============================================================================
// STAGE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parsed,
    Clarifying,
    ReadyForOptimization,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Parsed => "parsed",
            Stage::Clarifying => "clarifying",
            Stage::ReadyForOptimization => "ready_for_optimization",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "parsed" => Some(Stage::Parsed),
            "clarifying" => Some(Stage::Clarifying),
            "ready_for_optimization" => Some(Stage::ReadyForOptimization),
            _ => None,
        }
    }

    /// Stage a snapshot belongs in given its readiness
    pub fn for_readiness(ready: bool) -> Self {
        if ready {
            Stage::ReadyForOptimization
        } else {
            Stage::Clarifying
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// Current snapshot of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub stage: Stage,
    pub model: UnifiedBudgetModel,
    pub updated_at: DateTime<Utc>,
    /// 1 on creation, +1 per accepted batch
    #[serde(default = "first_version")]
    pub version: i64,
}

fn first_version() -> i64 {
    1
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>, stage: Stage, model: UnifiedBudgetModel) -> Self {
        SessionRecord {
            session_id: session_id.into(),
            stage,
            model,
            updated_at: Utc::now(),
            version: first_version(),
        }
    }

    /// Successor snapshot, one version up
    pub fn next(&self, stage: Stage, model: UnifiedBudgetModel) -> Self {
        SessionRecord {
            session_id: self.session_id.clone(),
            stage,
            model,
            updated_at: Utc::now(),
            version: self.version + 1,
        }
    }

    /// Version the store must hold for this record to be committed
    fn expected_previous(&self) -> Option<i64> {
        (self.version > first_version()).then(|| self.version - 1)
    }
}

/// Audit trail entry: one per session creation or accepted answer batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub event_id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub from_stage: Stage,
    pub to_stage: Stage,
    /// Answered field_ids, in batch order (empty on creation)
    pub field_ids: Vec<String>,
    pub fingerprint_before: String,
    pub fingerprint_after: String,
    pub actor: String,
}

impl TransitionEvent {
    pub fn new(
        session_id: &str,
        from_stage: Stage,
        to_stage: Stage,
        field_ids: Vec<String>,
        fingerprint_before: String,
        fingerprint_after: String,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            from_stage,
            to_stage,
            field_ids,
            fingerprint_before,
            fingerprint_after,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// STORE TRAIT
// ============================================================================

pub trait SessionStore: Send + Sync {
    fn load(&self, session_id: &str) -> Result<Option<SessionRecord>>;

    fn save(&self, record: &SessionRecord) -> Result<()>;

    fn record_transition(&self, event: &TransitionEvent) -> Result<()>;

    /// Transitions for a session, oldest first
    fn transitions(&self, session_id: &str) -> Result<Vec<TransitionEvent>>;

    /// Save a snapshot together with the transition that produced it, as
    /// one unit. Only succeeds if the stored version is the one `record`
    /// was derived from (or no session exists, for version 1). Returns
    /// `Ok(false)` and writes nothing otherwise.
    fn commit(&self, record: &SessionRecord, event: &TransitionEvent) -> Result<bool>;
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    /// Open (or create) a database file, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteSessionStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("session database lock poisoned"))
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            stage TEXT NOT NULL,
            model TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transitions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            session_id TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            from_stage TEXT NOT NULL,
            to_stage TEXT NOT NULL,
            field_ids TEXT NOT NULL,
            fingerprint_before TEXT NOT NULL,
            fingerprint_after TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transitions_session ON transitions(session_id)",
        [],
    )?;

    Ok(())
}

fn save_record(conn: &Connection, record: &SessionRecord) -> Result<()> {
    let model_json = serde_json::to_string(&record.model)?;

    conn.execute(
        "INSERT INTO sessions (session_id, stage, model, updated_at, version)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(session_id) DO UPDATE SET
            stage = excluded.stage,
            model = excluded.model,
            updated_at = excluded.updated_at,
            version = excluded.version",
        params![
            record.session_id,
            record.stage.as_str(),
            model_json,
            record.updated_at.to_rfc3339(),
            record.version,
        ],
    )?;

    Ok(())
}

/// Write `record` only if the stored row is at its predecessor version.
/// Returns whether a row was written.
fn swap_record(conn: &Connection, record: &SessionRecord) -> Result<bool> {
    let model_json = serde_json::to_string(&record.model)?;

    let changed = match record.expected_previous() {
        None => conn.execute(
            "INSERT OR IGNORE INTO sessions (session_id, stage, model, updated_at, version)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.session_id,
                record.stage.as_str(),
                model_json,
                record.updated_at.to_rfc3339(),
                record.version,
            ],
        )?,
        Some(previous) => conn.execute(
            "UPDATE sessions
             SET stage = ?2, model = ?3, updated_at = ?4, version = ?5
             WHERE session_id = ?1 AND version = ?6",
            params![
                record.session_id,
                record.stage.as_str(),
                model_json,
                record.updated_at.to_rfc3339(),
                record.version,
                previous,
            ],
        )?,
    };

    Ok(changed == 1)
}

fn insert_transition(conn: &Connection, event: &TransitionEvent) -> Result<()> {
    let field_ids_json = serde_json::to_string(&event.field_ids)?;

    conn.execute(
        "INSERT INTO transitions (
            event_id, session_id, timestamp, from_stage, to_stage,
            field_ids, fingerprint_before, fingerprint_after, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            event.event_id,
            event.session_id,
            event.timestamp.to_rfc3339(),
            event.from_stage.as_str(),
            event.to_stage.as_str(),
            field_ids_json,
            event.fingerprint_before,
            event.fingerprint_after,
            event.actor,
        ],
    )?;

    Ok(())
}

fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_stage(column: usize, raw: &str) -> rusqlite::Result<Stage> {
    Stage::parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            format!("unknown stage '{}'", raw).into(),
        )
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(column: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl SessionStore for SqliteSessionStore {
    fn load(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT session_id, stage, model, updated_at, version
                 FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| {
                    let stage: String = row.get(1)?;
                    let model: String = row.get(2)?;
                    let updated_at: String = row.get(3)?;

                    let mut model: UnifiedBudgetModel = parse_json(2, &model)?;
                    model.recompute_summary();

                    Ok(SessionRecord {
                        session_id: row.get(0)?,
                        stage: parse_stage(1, &stage)?,
                        model,
                        updated_at: parse_timestamp(3, &updated_at)?,
                        version: row.get(4)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("Failed to load session {}", session_id))?;

        Ok(record)
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        let conn = self.conn()?;
        save_record(&conn, record)
    }

    fn record_transition(&self, event: &TransitionEvent) -> Result<()> {
        let conn = self.conn()?;
        insert_transition(&conn, event)
    }

    fn transitions(&self, session_id: &str) -> Result<Vec<TransitionEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT event_id, session_id, timestamp, from_stage, to_stage,
                    field_ids, fingerprint_before, fingerprint_after, actor
             FROM transitions
             WHERE session_id = ?1
             ORDER BY id ASC",
        )?;

        let events = stmt
            .query_map(params![session_id], |row| {
                let timestamp: String = row.get(2)?;
                let from_stage: String = row.get(3)?;
                let to_stage: String = row.get(4)?;
                let field_ids: String = row.get(5)?;

                Ok(TransitionEvent {
                    event_id: row.get(0)?,
                    session_id: row.get(1)?,
                    timestamp: parse_timestamp(2, &timestamp)?,
                    from_stage: parse_stage(3, &from_stage)?,
                    to_stage: parse_stage(4, &to_stage)?,
                    field_ids: parse_json(5, &field_ids)?,
                    fingerprint_before: row.get(6)?,
                    fingerprint_after: row.get(7)?,
                    actor: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }

    fn commit(&self, record: &SessionRecord, event: &TransitionEvent) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if !swap_record(&tx, record)? {
            // Dropping the transaction rolls it back
            return Ok(false);
        }
        insert_transition(&tx, event)?;
        tx.commit()?;
        Ok(true)
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// Process-local store for tests and one-shot CLI runs
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    transitions: RwLock<Vec<TransitionEvent>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("session store lock poisoned")
}

impl SessionStore for MemorySessionStore {
    fn load(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(session_id).cloned())
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    fn record_transition(&self, event: &TransitionEvent) -> Result<()> {
        let mut transitions = self.transitions.write().map_err(poisoned)?;
        transitions.push(event.clone());
        Ok(())
    }

    fn transitions(&self, session_id: &str) -> Result<Vec<TransitionEvent>> {
        let transitions = self.transitions.read().map_err(poisoned)?;
        Ok(transitions
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect())
    }

    fn commit(&self, record: &SessionRecord, event: &TransitionEvent) -> Result<bool> {
        // Lock order: sessions, then transitions
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let mut transitions = self.transitions.write().map_err(poisoned)?;

        let stored = sessions.get(&record.session_id).map(|r| r.version);
        if stored != record.expected_previous() {
            return Ok(false);
        }

        sessions.insert(record.session_id.clone(), record.clone());
        transitions.push(event.clone());
        Ok(true)
    }
}

// ============================================================================
// TESTS
// ============================================================================
