use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use uuid::Uuid;

use crate::db::now_ts;
use crate::mode::Mode;
use crate::record::LessonRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("stored record is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Database(_) => "db_query_failed",
            Self::Corrupt(_) => "db_corrupt_record",
        }
    }
}

/// Summary row for lesson lists.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub id: String,
    pub mode: Mode,
    pub topic: Option<String>,
    pub subject: Option<String>,
    pub year_group: Option<String>,
    pub date: Option<String>,
    pub updated_at: String,
}

/// The persistence seam a form talks to. Every call is scoped to one owner.
pub trait LessonStore {
    fn load(&self, id: &str) -> Result<LessonRecord, StoreError>;
    /// Inserts a record without an id and returns it with id and timestamps set.
    fn insert(&self, record: &LessonRecord) -> Result<LessonRecord, StoreError>;
    fn update(&self, record: &LessonRecord) -> Result<LessonRecord, StoreError>;
}

pub struct SqliteLessonStore<'a> {
    conn: &'a Connection,
    owner_id: &'a str,
}

impl<'a> SqliteLessonStore<'a> {
    pub fn new(conn: &'a Connection, owner_id: &'a str) -> Self {
        Self { conn, owner_id }
    }

    pub fn list(&self, mode: Option<Mode>) -> Result<Vec<LessonSummary>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, mode, topic, subject, year_group, lesson_date, updated_at
             FROM lessons
             WHERE owner_id = ?1 AND (?2 IS NULL OR mode = ?2)
             ORDER BY lesson_date DESC, updated_at DESC, id",
        )?;
        let rows = stmt.query_map(params![self.owner_id, mode.map(Mode::as_str)], |row| {
            let mode: String = row.get(1)?;
            Ok(LessonSummary {
                id: row.get(0)?,
                mode: Mode::parse(&mode).unwrap_or_default(),
                topic: row.get(2)?,
                subject: row.get(3)?,
                year_group: row.get(4)?,
                date: row.get(5)?,
                updated_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let n = self.conn.execute(
            "DELETE FROM lessons WHERE owner_id = ? AND id = ?",
            params![self.owner_id, id],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound {
                kind: "lesson",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn write(&self, record: &LessonRecord, id: &str, created_at: &str, updated_at: &str) -> Result<LessonRecord, StoreError> {
        let mut stored = record.clone();
        stored.id = Some(id.to_string());
        stored.created_at = Some(created_at.to_string());
        stored.updated_at = Some(updated_at.to_string());
        let json = serde_json::to_string(&stored)?;
        self.conn.execute(
            "INSERT INTO lessons(
                id, owner_id, mode, topic, subject, year_group, lesson_date, record_json, created_at, updated_at
             ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                mode = excluded.mode,
                topic = excluded.topic,
                subject = excluded.subject,
                year_group = excluded.year_group,
                lesson_date = excluded.lesson_date,
                record_json = excluded.record_json,
                updated_at = excluded.updated_at",
            params![
                id,
                self.owner_id,
                stored.mode.as_str(),
                stored.topic,
                stored.subject,
                stored.year_group,
                stored.date,
                json,
                created_at,
                updated_at
            ],
        )?;
        Ok(stored)
    }
}

impl LessonStore for SqliteLessonStore<'_> {
    fn load(&self, id: &str) -> Result<LessonRecord, StoreError> {
        let row: Option<(String, String, String, String)> = self
            .conn
            .query_row(
                "SELECT mode, record_json, created_at, updated_at FROM lessons WHERE owner_id = ? AND id = ?",
                params![self.owner_id, id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        let Some((mode, json, created_at, updated_at)) = row else {
            return Err(StoreError::NotFound {
                kind: "lesson",
                id: id.to_string(),
            });
        };
        let mut record: LessonRecord = serde_json::from_str(&json)?;
        // The indexed column is written on every save and wins over the JSON.
        match Mode::parse(&mode) {
            Some(m) => record.mode = m,
            None => log::warn!(
                "lesson {} has unknown mode {:?}; using {}",
                id,
                mode,
                record.mode.as_str()
            ),
        }
        record.id = Some(id.to_string());
        record.created_at = Some(created_at);
        record.updated_at = Some(updated_at);
        Ok(record)
    }

    fn insert(&self, record: &LessonRecord) -> Result<LessonRecord, StoreError> {
        let id = Uuid::new_v4().to_string();
        let ts = now_ts();
        self.write(record, &id, &ts, &ts)
    }

    fn update(&self, record: &LessonRecord) -> Result<LessonRecord, StoreError> {
        let Some(id) = record.id.as_deref() else {
            return self.insert(record);
        };
        let created_at: Option<String> = self
            .conn
            .query_row(
                "SELECT created_at FROM lessons WHERE owner_id = ? AND id = ?",
                params![self.owner_id, id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(created_at) = created_at else {
            return Err(StoreError::NotFound {
                kind: "lesson",
                id: id.to_string(),
            });
        };
        self.write(record, id, &created_at, &now_ts())
    }
}
