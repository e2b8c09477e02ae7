use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::now_ts;
use crate::mode::exam_board_required;
use crate::record::lenient_string;
use crate::store::StoreError;
use crate::text::{capitalize_first_letter, capitalize_text, proper_title_case};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "year_group", deserialize_with = "lenient_string")]
    pub year_group: Option<String>,
    #[serde(default, alias = "exam_board", deserialize_with = "lenient_string")]
    pub exam_board: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default, alias = "target_grade", deserialize_with = "lenient_string")]
    pub target_grade: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub strengths: Option<String>,
    #[serde(default, alias = "areas_for_development", deserialize_with = "lenient_string")]
    pub areas_for_development: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn blank(v: &Option<String>) -> bool {
    v.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true)
}

impl StudentProfile {
    pub fn validate(&self) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();
        if self.name.trim().is_empty() {
            errors.insert("name".to_string(), "Student name is required".to_string());
        }
        if exam_board_required(self.year_group.as_deref()) && blank(&self.exam_board) {
            errors.insert(
                "examBoard".to_string(),
                "Exam board is required for GCSE and A-level year groups".to_string(),
            );
        }
        errors
    }

    /// Create-path formatting.
    pub fn capitalize(&mut self) {
        self.name = proper_title_case(&self.name);
        for subject in &mut self.subjects {
            *subject = capitalize_first_letter(subject.trim());
        }
        for v in [&mut self.exam_board, &mut self.target_grade] {
            if let Some(s) = v.as_mut() {
                *s = capitalize_first_letter(s);
            }
        }
        for v in [
            &mut self.strengths,
            &mut self.areas_for_development,
            &mut self.notes,
        ] {
            if let Some(s) = v.as_mut() {
                *s = capitalize_text(s);
            }
        }
    }
}

pub fn list(conn: &Connection, owner_id: &str) -> Result<Vec<StudentProfile>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, profile_json, created_at, updated_at FROM students
         WHERE owner_id = ? ORDER BY name COLLATE NOCASE, id",
    )?;
    let rows = stmt.query_map([owner_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, json, created_at, updated_at) = row?;
        out.push(hydrate(id, &json, created_at, updated_at)?);
    }
    Ok(out)
}

fn hydrate(
    id: String,
    json: &str,
    created_at: String,
    updated_at: String,
) -> Result<StudentProfile, StoreError> {
    let mut profile: StudentProfile = serde_json::from_str(json)?;
    profile.id = Some(id);
    profile.created_at = Some(created_at);
    profile.updated_at = Some(updated_at);
    Ok(profile)
}

pub fn open(conn: &Connection, owner_id: &str, id: &str) -> Result<StudentProfile, StoreError> {
    let row = conn
        .query_row(
            "SELECT profile_json, created_at, updated_at FROM students WHERE owner_id = ? AND id = ?",
            params![owner_id, id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;
    let Some((json, created_at, updated_at)) = row else {
        return Err(StoreError::NotFound {
            kind: "student",
            id: id.to_string(),
        });
    };
    hydrate(id.to_string(), &json, created_at, updated_at)
}

fn write(
    conn: &Connection,
    owner_id: &str,
    profile: &StudentProfile,
    id: &str,
    created_at: &str,
    updated_at: &str,
) -> Result<StudentProfile, StoreError> {
    let mut stored = profile.clone();
    stored.id = Some(id.to_string());
    stored.created_at = Some(created_at.to_string());
    stored.updated_at = Some(updated_at.to_string());
    conn.execute(
        "INSERT INTO students(id, owner_id, name, year_group, exam_board, profile_json, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            year_group = excluded.year_group,
            exam_board = excluded.exam_board,
            profile_json = excluded.profile_json,
            updated_at = excluded.updated_at",
        params![
            id,
            owner_id,
            stored.name,
            stored.year_group,
            stored.exam_board,
            serde_json::to_string(&stored)?,
            created_at,
            updated_at
        ],
    )?;
    Ok(stored)
}

pub fn create(
    conn: &Connection,
    owner_id: &str,
    profile: &StudentProfile,
) -> Result<StudentProfile, StoreError> {
    let ts = now_ts();
    write(conn, owner_id, profile, &Uuid::new_v4().to_string(), &ts, &ts)
}

pub fn update(
    conn: &Connection,
    owner_id: &str,
    profile: &StudentProfile,
) -> Result<StudentProfile, StoreError> {
    let id = profile.id.clone().unwrap_or_default();
    let existing = open(conn, owner_id, &id)?;
    let created_at = existing.created_at.unwrap_or_else(now_ts);
    write(conn, owner_id, profile, &id, &created_at, &now_ts())
}

pub fn delete(conn: &Connection, owner_id: &str, id: &str) -> Result<(), StoreError> {
    let n = conn.execute(
        "DELETE FROM students WHERE owner_id = ? AND id = ?",
        params![owner_id, id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound {
            kind: "student",
            id: id.to_string(),
        });
    }
    Ok(())
}
