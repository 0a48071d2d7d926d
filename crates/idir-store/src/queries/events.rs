use idir_canonical::IsoTimestamp;
use idir_core::{CertificateEvent, CertificateId, EventType};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::decode;
use crate::{Result, StoreError};

const COLUMNS: &str =
    "id, certificate_id, certificate_uuid, event_type, actor_type, actor_email, metadata, created_at";

struct RawEvent {
    id: String,
    certificate_id: String,
    certificate_uuid: String,
    event_type: String,
    actor_type: String,
    actor_email: Option<String>,
    metadata: String,
    created_at: String,
}

impl RawEvent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            certificate_id: row.get(1)?,
            certificate_uuid: row.get(2)?,
            event_type: row.get(3)?,
            actor_type: row.get(4)?,
            actor_email: row.get(5)?,
            metadata: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_event(self) -> Result<CertificateEvent> {
        Ok(CertificateEvent {
            id: decode::<Uuid>("id", &self.id)?,
            certificate_id: CertificateId::parse(self.certificate_id)
                .map_err(|e| StoreError::corrupt("certificate_id", e))?,
            certificate_uuid: decode::<Uuid>("certificate_uuid", &self.certificate_uuid)?,
            event_type: decode("event_type", &self.event_type)?,
            actor_type: decode("actor_type", &self.actor_type)?,
            actor_email: self.actor_email,
            metadata: serde_json::from_str(&self.metadata)
                .map_err(|e| StoreError::corrupt("metadata", e))?,
            created_at: IsoTimestamp::parse(self.created_at)
                .map_err(|e| StoreError::corrupt("created_at", e))?,
        })
    }
}

/// Appends an audit event.
pub fn insert(conn: &Connection, event: &CertificateEvent) -> Result<()> {
    let metadata = serde_json::to_string(&event.metadata)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    conn.execute(
        "INSERT INTO certificate_events (
             id, certificate_id, certificate_uuid, event_type, actor_type, actor_email,
             metadata, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            event.id.to_string(),
            event.certificate_id.as_str(),
            event.certificate_uuid.to_string(),
            event.event_type.as_str(),
            event.actor_type.as_str(),
            event.actor_email,
            metadata,
            event.created_at.as_str(),
        ],
    )?;
    Ok(())
}

/// Events for one certificate row in the order they were recorded.
pub fn list_for_certificate(conn: &Connection, certificate_uuid: &Uuid) -> Result<Vec<CertificateEvent>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM certificate_events
         WHERE certificate_uuid = ?1
         ORDER BY created_at, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw = stmt
        .query_map(params![certificate_uuid.to_string()], RawEvent::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    raw.into_iter().map(RawEvent::into_event).collect()
}

/// Most recent event of `event_type` for a certificate row.
pub fn latest_of_type(
    conn: &Connection,
    certificate_uuid: &Uuid,
    event_type: EventType,
) -> Result<Option<CertificateEvent>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM certificate_events
         WHERE certificate_uuid = ?1 AND event_type = ?2
         ORDER BY created_at DESC, rowid DESC
         LIMIT 1"
    );
    conn.query_row(
        &sql,
        params![certificate_uuid.to_string(), event_type.as_str()],
        RawEvent::from_row,
    )
    .optional()?
    .map(RawEvent::into_event)
    .transpose()
}

/// Total number of audit events.
pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM certificate_events", [], |row| row.get(0))?;
    Ok(n as u64)
}
