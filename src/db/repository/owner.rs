use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::Owner;

pub fn insert_owner(conn: &Connection, owner: &Owner) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO owners (id, display_name, created_at) VALUES (?1, ?2, ?3)",
        params![owner.id, owner.display_name, owner.created_at.to_rfc3339()],
    )?;
    Ok(())
}

/// Insert the owner, or refresh its display name if it already exists.
/// A `None` display name keeps the stored one.
pub fn upsert_owner(conn: &Connection, owner: &Owner) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO owners (id, display_name, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
            display_name = COALESCE(excluded.display_name, owners.display_name)",
        params![owner.id, owner.display_name, owner.created_at.to_rfc3339()],
    )?;
    Ok(())
}

pub fn get_owner(conn: &Connection, owner_id: &str) -> Result<Option<Owner>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, display_name, created_at FROM owners WHERE id = ?1",
            params![owner_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, display_name, created_at)| {
        Ok(Owner {
            id,
            display_name,
            created_at: parse_timestamp("owners.created_at", &created_at)?,
        })
    })
    .transpose()
}

/// Custom categories registered by the owner, alphabetical.
pub fn list_custom_categories(
    conn: &Connection,
    owner_id: &str,
) -> Result<Vec<String>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT name FROM owner_categories WHERE owner_id = ?1 ORDER BY name")?;
    let rows = stmt.query_map(params![owner_id], |row| row.get::<_, String>(0))?;

    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

/// Register a custom category. Returns false if it was already registered.
pub fn insert_custom_category(
    conn: &Connection,
    owner_id: &str,
    name: &str,
) -> Result<bool, DatabaseError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO owner_categories (owner_id, name, created_at) VALUES (?1, ?2, ?3)",
        params![owner_id, name, Utc::now().to_rfc3339()],
    )?;
    Ok(inserted > 0)
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptColumn {
            column: column.into(),
            reason: e.to_string(),
        })
}
