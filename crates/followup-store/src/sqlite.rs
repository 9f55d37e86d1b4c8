//! SQLite-backed prospect store.
//!
//! One file holds prospects, sequences, the activity log and leases. Several
//! processes may share it; WAL mode keeps readers off the writer's back and
//! every batch commit is a single transaction.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use followup_core::error::{FollowUpError, Result};
use followup_core::traits::ProspectStore;
use followup_core::types::{
    ActivityKind, ActivityRecord, NewProspect, NewSequence, OwnerId, Prospect, ProspectCommit,
    ProspectId, Sequence, SequenceId, SequenceStep,
};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

use crate::{ImportBundle, ImportSummary};

const PROSPECT_COLUMNS: &str = "id, owner_id, name, email, company, phone, last_contacted_at, \
     status, category, tech_stack, resume_link, sequence_id, current_step_number";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database, running migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(store_err)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(store_err)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory().map_err(store_err)?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;").map_err(store_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sequences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sequence_steps (
                sequence_id INTEGER NOT NULL REFERENCES sequences(id) ON DELETE CASCADE,
                step_number INTEGER NOT NULL,
                wait_days INTEGER NOT NULL DEFAULT 0,
                action_type TEXT NOT NULL,       -- 'email', 'whatsapp', ...
                template_name TEXT,              -- context tag for the composer
                PRIMARY KEY (sequence_id, step_number)
            );

            CREATE TABLE IF NOT EXISTS prospects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                company TEXT,
                phone TEXT,
                last_contacted_at TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                category TEXT NOT NULL DEFAULT 'client',
                tech_stack TEXT,
                resume_link TEXT,
                sequence_id INTEGER REFERENCES sequences(id) ON DELETE SET NULL,
                current_step_number INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_prospects_owner ON prospects(owner_id);
            CREATE INDEX IF NOT EXISTS idx_prospects_sequence ON prospects(sequence_id);

            CREATE TABLE IF NOT EXISTS activity_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                prospect_id INTEGER,
                kind TEXT NOT NULL,              -- 'classified', 'dispatched', 'error'
                details TEXT NOT NULL,           -- JSON payload
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_activity_owner ON activity_log(owner_id, id);

            CREATE TABLE IF NOT EXISTS prospect_leases (
                prospect_id INTEGER PRIMARY KEY,
                holder TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );
            ",
        )
        .map_err(store_err)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FollowUpError::Store(format!("Lock: {e}")))
    }

    // ─── Administration ───────────────────────────────────

    /// Insert a prospect, enrolling it in the named sequence if given.
    pub fn insert_prospect(&self, prospect: &NewProspect) -> Result<ProspectId> {
        let conn = self.lock()?;
        let sequence_id = match &prospect.sequence {
            Some(name) => Some(
                sequence_id_by_name(&conn, name)?
                    .ok_or_else(|| FollowUpError::NotFound(format!("sequence '{name}'")))?,
            ),
            None => None,
        };
        conn.execute(
            "INSERT INTO prospects (owner_id, name, email, company, phone, last_contacted_at,
                status, category, tech_stack, resume_link, sequence_id, current_step_number)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active', ?7, ?8, ?9, ?10, 0)",
            params![
                prospect.owner_id,
                prospect.name,
                prospect.email,
                prospect.company,
                prospect.phone,
                prospect.last_contacted_at.map(ts),
                prospect.category.as_str(),
                prospect.tech_stack,
                prospect.resume_link,
                sequence_id,
            ],
        )
        .map_err(store_err)?;
        Ok(conn.last_insert_rowid())
    }

    /// Create a sequence. Names are unique; step numbers are validated.
    pub fn create_sequence(&self, sequence: &NewSequence) -> Result<SequenceId> {
        sequence.validate()?;
        let mut conn = self.lock()?;
        if sequence_id_by_name(&conn, &sequence.name)?.is_some() {
            return Err(FollowUpError::Invalid(format!(
                "sequence '{}' already exists",
                sequence.name
            )));
        }

        let tx = conn.transaction().map_err(store_err)?;
        tx.execute(
            "INSERT INTO sequences (name, description, created_at) VALUES (?1, ?2, ?3)",
            params![sequence.name, sequence.description, ts(Utc::now())],
        )
        .map_err(store_err)?;
        let id = tx.last_insert_rowid();
        for step in &sequence.steps {
            tx.execute(
                "INSERT INTO sequence_steps (sequence_id, step_number, wait_days, action_type, template_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, step.step_number, step.wait_days, step.action.as_str(), step.template],
            )
            .map_err(store_err)?;
        }
        tx.commit().map_err(store_err)?;

        tracing::info!("📋 Sequence created: {} ({} steps)", sequence.name, sequence.steps.len());
        Ok(id)
    }

    pub fn sequence_by_name(&self, name: &str) -> Result<Option<Sequence>> {
        let conn = self.lock()?;
        match sequence_id_by_name(&conn, name)? {
            Some(id) => load_sequence(&conn, id),
            None => Ok(None),
        }
    }

    pub fn list_sequences(&self) -> Result<Vec<Sequence>> {
        let conn = self.lock()?;
        let ids: Vec<SequenceId> = {
            let mut stmt = conn
                .prepare("SELECT id FROM sequences ORDER BY name")
                .map_err(store_err)?;
            let rows = stmt.query_map([], |r| r.get(0)).map_err(store_err)?;
            rows.collect::<rusqlite::Result<_>>().map_err(store_err)?
        };
        let mut sequences = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(seq) = load_sequence(&conn, id)? {
                sequences.push(seq);
            }
        }
        Ok(sequences)
    }

    /// Enroll a prospect in a sequence, restarting it at step 0.
    pub fn attach_sequence(&self, owner: OwnerId, prospect: ProspectId, name: &str) -> Result<()> {
        let conn = self.lock()?;
        let sequence_id = sequence_id_by_name(&conn, name)?
            .ok_or_else(|| FollowUpError::NotFound(format!("sequence '{name}'")))?;
        let changed = conn
            .execute(
                "UPDATE prospects SET sequence_id = ?1, current_step_number = 0
                 WHERE id = ?2 AND owner_id = ?3",
                params![sequence_id, prospect, owner],
            )
            .map_err(store_err)?;
        if changed == 0 {
            return Err(FollowUpError::NotFound(format!("prospect {prospect}")));
        }
        Ok(())
    }

    pub fn detach_sequence(&self, owner: OwnerId, prospect: ProspectId) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE prospects SET sequence_id = NULL, current_step_number = 0
                 WHERE id = ?1 AND owner_id = ?2",
                params![prospect, owner],
            )
            .map_err(store_err)?;
        if changed == 0 {
            return Err(FollowUpError::NotFound(format!("prospect {prospect}")));
        }
        Ok(())
    }

    /// Delete a sequence and detach its prospects. Returns how many were detached.
    pub fn delete_sequence(&self, name: &str) -> Result<usize> {
        let mut conn = self.lock()?;
        let id = sequence_id_by_name(&conn, name)?
            .ok_or_else(|| FollowUpError::NotFound(format!("sequence '{name}'")))?;

        let tx = conn.transaction().map_err(store_err)?;
        let detached = tx
            .execute(
                "UPDATE prospects SET sequence_id = NULL, current_step_number = 0
                 WHERE sequence_id = ?1",
                params![id],
            )
            .map_err(store_err)?;
        tx.execute("DELETE FROM sequence_steps WHERE sequence_id = ?1", params![id])
            .map_err(store_err)?;
        tx.execute("DELETE FROM sequences WHERE id = ?1", params![id])
            .map_err(store_err)?;
        tx.commit().map_err(store_err)?;

        tracing::info!("🗑️ Sequence deleted: {name} ({detached} prospects detached)");
        Ok(detached)
    }

    /// Load sequences then prospects. Sequences whose name already exists
    /// are left as they are.
    pub fn import(&self, bundle: &ImportBundle) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        for sequence in &bundle.sequences {
            if self.sequence_by_name(&sequence.name)?.is_some() {
                tracing::warn!("Sequence '{}' exists, skipping", sequence.name);
                summary.sequences_skipped += 1;
                continue;
            }
            self.create_sequence(sequence)?;
            summary.sequences_created += 1;
        }
        for prospect in &bundle.prospects {
            self.insert_prospect(prospect)?;
            summary.prospects_created += 1;
        }
        Ok(summary)
    }

    pub fn import_file(&self, path: &Path) -> Result<ImportSummary> {
        let content = std::fs::read_to_string(path)?;
        let bundle: ImportBundle = serde_json::from_str(&content)?;
        self.import(&bundle)
    }
}

#[async_trait]
impl ProspectStore for SqliteStore {
    async fn prospects_for_owner(&self, owner: OwnerId) -> Result<Vec<Prospect>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {PROSPECT_COLUMNS} FROM prospects WHERE owner_id = ?1 ORDER BY id");
        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let rows = stmt
            .query_map(params![owner], row_to_prospect)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    async fn prospect(&self, owner: OwnerId, id: ProspectId) -> Result<Option<Prospect>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {PROSPECT_COLUMNS} FROM prospects WHERE id = ?1 AND owner_id = ?2");
        conn.query_row(&sql, params![id, owner], row_to_prospect)
            .optional()
            .map_err(store_err)
    }

    async fn sequenced_prospects(&self) -> Result<Vec<Prospect>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {PROSPECT_COLUMNS} FROM prospects WHERE sequence_id IS NOT NULL ORDER BY id"
        );
        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let rows = stmt.query_map([], row_to_prospect).map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    async fn sequence_step(
        &self,
        sequence: SequenceId,
        step_number: u32,
    ) -> Result<Option<SequenceStep>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT step_number, wait_days, action_type, template_name
             FROM sequence_steps WHERE sequence_id = ?1 AND step_number = ?2",
            params![sequence, step_number],
            row_to_step,
        )
        .optional()
        .map_err(store_err)
    }

    async fn commit(&self, batch: &[ProspectCommit]) -> Result<()> {
        if batch.iter().all(ProspectCommit::is_empty) {
            return Ok(());
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(store_err)?;
        for item in batch {
            apply_commit(&tx, item)?;
        }
        tx.commit().map_err(store_err)
    }

    async fn try_lease(&self, prospect: ProspectId, holder: &str, ttl_secs: u64) -> Result<bool> {
        let now = Utc::now();
        let expires = now + TimeDelta::seconds(ttl_secs.min(u32::MAX as u64) as i64);
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "INSERT INTO prospect_leases (prospect_id, holder, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(prospect_id) DO UPDATE
                    SET holder = excluded.holder, expires_at = excluded.expires_at
                    WHERE prospect_leases.expires_at <= ?4
                       OR prospect_leases.holder = excluded.holder",
                params![prospect, holder, ts(expires), ts(now)],
            )
            .map_err(store_err)?;
        Ok(changed > 0)
    }

    async fn release_lease(&self, prospect: ProspectId, holder: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM prospect_leases WHERE prospect_id = ?1 AND holder = ?2",
            params![prospect, holder],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn recent_activity(&self, owner: OwnerId, limit: usize) -> Result<Vec<ActivityRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, owner_id, prospect_id, kind, details, created_at
                 FROM activity_log WHERE owner_id = ?1 ORDER BY id DESC LIMIT ?2",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![owner, limit as i64], row_to_activity)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }
}

fn apply_commit(tx: &Transaction<'_>, item: &ProspectCommit) -> Result<()> {
    let update = &item.update;
    if let Some(status) = update.status {
        tx.execute(
            "UPDATE prospects SET status = ?1 WHERE id = ?2",
            params![status.as_str(), item.prospect_id],
        )
        .map_err(store_err)?;
    }
    if let Some(at) = update.last_contacted_at {
        tx.execute(
            "UPDATE prospects SET last_contacted_at = ?1 WHERE id = ?2",
            params![ts(at), item.prospect_id],
        )
        .map_err(store_err)?;
    }
    if let Some(step) = update.step_number {
        // Forward only.
        tx.execute(
            "UPDATE prospects SET current_step_number = ?1
             WHERE id = ?2 AND current_step_number < ?1",
            params![step, item.prospect_id],
        )
        .map_err(store_err)?;
    }
    for record in &item.records {
        tx.execute(
            "INSERT INTO activity_log (owner_id, prospect_id, kind, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.owner_id,
                record.prospect_id,
                record.kind.as_str(),
                record.details.to_string(),
                ts(record.created_at),
            ],
        )
        .map_err(store_err)?;
    }
    Ok(())
}

fn sequence_id_by_name(conn: &Connection, name: &str) -> Result<Option<SequenceId>> {
    conn.query_row(
        "SELECT id FROM sequences WHERE name = ?1",
        params![name],
        |r| r.get(0),
    )
    .optional()
    .map_err(store_err)
}

fn load_sequence(conn: &Connection, id: SequenceId) -> Result<Option<Sequence>> {
    let head = conn
        .query_row(
            "SELECT id, name, description, created_at FROM sequences WHERE id = ?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, SequenceId>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    parse_ts(3, r.get::<_, String>(3)?)?,
                ))
            },
        )
        .optional()
        .map_err(store_err)?;
    let Some((id, name, description, created_at)) = head else {
        return Ok(None);
    };

    let mut stmt = conn
        .prepare(
            "SELECT step_number, wait_days, action_type, template_name
             FROM sequence_steps WHERE sequence_id = ?1 ORDER BY step_number",
        )
        .map_err(store_err)?;
    let steps = stmt
        .query_map(params![id], row_to_step)
        .map_err(store_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(store_err)?;

    Ok(Some(Sequence {
        id,
        name,
        description,
        created_at,
        steps,
    }))
}

fn row_to_prospect(row: &Row<'_>) -> rusqlite::Result<Prospect> {
    let last_contacted_at = match row.get::<_, Option<String>>(6)? {
        Some(raw) => Some(parse_ts(6, raw)?),
        None => None,
    };
    let status: String = row.get(7)?;
    let category: String = row.get(8)?;
    Ok(Prospect {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        company: row.get(4)?,
        phone: row.get(5)?,
        last_contacted_at,
        status: status.parse().map_err(|e| conversion_err(7, e))?,
        category: category.parse().map_err(|e| conversion_err(8, e))?,
        tech_stack: row.get(9)?,
        resume_link: row.get(10)?,
        sequence_id: row.get(11)?,
        current_step_number: row.get(12)?,
    })
}

fn row_to_step(row: &Row<'_>) -> rusqlite::Result<SequenceStep> {
    Ok(SequenceStep {
        step_number: row.get(0)?,
        wait_days: row.get(1)?,
        action: row.get::<_, String>(2)?.into(),
        template: row.get(3)?,
    })
}

fn row_to_activity(row: &Row<'_>) -> rusqlite::Result<ActivityRecord> {
    let kind: String = row.get(3)?;
    let details: String = row.get(4)?;
    Ok(ActivityRecord {
        id: Some(row.get(0)?),
        owner_id: row.get(1)?,
        prospect_id: row.get(2)?,
        kind: kind.parse::<ActivityKind>().map_err(|e| conversion_err(3, e))?,
        details: serde_json::from_str(&details).map_err(|e| conversion_err(4, e))?,
        created_at: parse_ts(5, row.get(5)?)?,
    })
}

/// Fixed-width UTC timestamps so text comparison matches time order.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn conversion_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn store_err(e: rusqlite::Error) -> FollowUpError {
    FollowUpError::Store(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use followup_core::types::{LeadStatus, ProspectUpdate, StepAction};
    use serde_json::json;

    fn temp_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn new_prospect(owner: OwnerId, name: &str) -> NewProspect {
        NewProspect {
            owner_id: owner,
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            company: Some("Globex".into()),
            phone: Some("+15550102030".into()),
            last_contacted_at: None,
            category: Default::default(),
            tech_stack: None,
            resume_link: None,
            sequence: None,
        }
    }

    fn two_step_sequence() -> NewSequence {
        NewSequence {
            name: "outbound".into(),
            description: Some("cold outreach".into()),
            steps: vec![
                SequenceStep {
                    step_number: 1,
                    wait_days: 0,
                    action: StepAction::Email,
                    template: Some("cold_mail".into()),
                },
                SequenceStep {
                    step_number: 2,
                    wait_days: 5,
                    action: StepAction::WhatsApp,
                    template: None,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_prospects_scoped_by_owner() {
        let store = temp_store();
        let a = store.insert_prospect(&new_prospect(1, "Ada")).unwrap();
        store.insert_prospect(&new_prospect(2, "Bob")).unwrap();

        let mine = store.prospects_for_owner(1).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Ada");
        assert_eq!(mine[0].status, LeadStatus::Active);

        assert!(store.prospect(1, a).await.unwrap().is_some());
        assert!(store.prospect(2, a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sequence_crud_and_steps() {
        let store = temp_store();
        let id = store.create_sequence(&two_step_sequence()).unwrap();
        assert!(store.create_sequence(&two_step_sequence()).is_err());

        let step = store.sequence_step(id, 2).await.unwrap().unwrap();
        assert_eq!(step.wait_days, 5);
        assert_eq!(step.action, StepAction::WhatsApp);
        assert!(store.sequence_step(id, 3).await.unwrap().is_none());

        let listed = store.list_sequences().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].steps.len(), 2);
    }

    #[tokio::test]
    async fn test_attach_detach_and_delete() {
        let store = temp_store();
        store.create_sequence(&two_step_sequence()).unwrap();
        let p = store.insert_prospect(&new_prospect(1, "Ada")).unwrap();

        assert!(store.attach_sequence(2, p, "outbound").unwrap_err().is_not_found());
        store.attach_sequence(1, p, "outbound").unwrap();
        assert_eq!(store.sequenced_prospects().await.unwrap().len(), 1);

        store.detach_sequence(1, p).unwrap();
        assert!(store.sequenced_prospects().await.unwrap().is_empty());

        store.attach_sequence(1, p, "outbound").unwrap();
        assert_eq!(store.delete_sequence("outbound").unwrap(), 1);
        assert!(store.sequenced_prospects().await.unwrap().is_empty());
        assert!(store.sequence_by_name("outbound").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_applies_updates_and_records() {
        let store = temp_store();
        let p = store.insert_prospect(&new_prospect(1, "Ada")).unwrap();
        let contacted = Utc::now() - Duration::days(1);

        let mut item = ProspectCommit::new(p);
        item.update = ProspectUpdate {
            status: Some(LeadStatus::Stalled),
            last_contacted_at: Some(contacted),
            step_number: Some(2),
        };
        item.records.push(ActivityRecord::new(
            1,
            Some(p),
            ActivityKind::Dispatched,
            json!({ "provider": "resend" }),
        ));
        store.commit(&[item]).await.unwrap();

        let stored = store.prospect(1, p).await.unwrap().unwrap();
        assert_eq!(stored.status, LeadStatus::Stalled);
        assert_eq!(stored.current_step_number, 2);
        assert_eq!(
            stored.last_contacted_at.map(|t| t.timestamp_millis()),
            Some(contacted.timestamp_millis())
        );

        let activity = store.recent_activity(1, 10).await.unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].kind, ActivityKind::Dispatched);
        assert_eq!(activity[0].details["provider"], "resend");
    }

    #[tokio::test]
    async fn test_step_never_moves_backwards() {
        let store = temp_store();
        let p = store.insert_prospect(&new_prospect(1, "Ada")).unwrap();

        let mut forward = ProspectCommit::new(p);
        forward.update.step_number = Some(3);
        store.commit(&[forward]).await.unwrap();

        let mut backward = ProspectCommit::new(p);
        backward.update.step_number = Some(1);
        store.commit(&[backward]).await.unwrap();

        let stored = store.prospect(1, p).await.unwrap().unwrap();
        assert_eq!(stored.current_step_number, 3);
    }

    #[tokio::test]
    async fn test_lease_exclusive_until_released() {
        let store = temp_store();
        assert!(store.try_lease(7, "run-a", 300).await.unwrap());
        assert!(!store.try_lease(7, "run-b", 300).await.unwrap());
        // Re-entrant for the same holder.
        assert!(store.try_lease(7, "run-a", 300).await.unwrap());

        store.release_lease(7, "run-a").await.unwrap();
        assert!(store.try_lease(7, "run-b", 300).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_lease_can_be_taken() {
        let store = temp_store();
        assert!(store.try_lease(7, "run-a", 0).await.unwrap());
        assert!(store.try_lease(7, "run-b", 300).await.unwrap());
    }

    #[tokio::test]
    async fn test_file_store_shared_between_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("followup.db");

        let first = SqliteStore::open(&path).unwrap();
        first.insert_prospect(&new_prospect(1, "Ada")).unwrap();
        assert!(first.try_lease(1, "proc-1", 300).await.unwrap());

        let second = SqliteStore::open(&path).unwrap();
        assert_eq!(second.prospects_for_owner(1).await.unwrap().len(), 1);
        assert!(!second.try_lease(1, "proc-2", 300).await.unwrap());
    }

    #[tokio::test]
    async fn test_import_bundle() {
        let store = temp_store();
        let bundle: ImportBundle = serde_json::from_value(json!({
            "sequences": [{
                "name": "outbound",
                "steps": [
                    { "step_number": 1, "wait_days": 0, "action_type": "email", "template_name": "cold_mail" }
                ]
            }],
            "prospects": [
                { "owner_id": 1, "name": "Ada", "email": "ada@example.com", "sequence": "outbound" },
                { "owner_id": 1, "name": "Bob", "email": "bob@example.com", "category": "recruiter" }
            ]
        }))
        .unwrap();

        let summary = store.import(&bundle).unwrap();
        assert_eq!(summary.sequences_created, 1);
        assert_eq!(summary.prospects_created, 2);
        assert_eq!(store.sequenced_prospects().await.unwrap().len(), 1);

        let again = store.import(&ImportBundle {
            sequences: bundle.sequences.clone(),
            prospects: Vec::new(),
        });
        assert_eq!(again.unwrap().sequences_skipped, 1);
    }
}
