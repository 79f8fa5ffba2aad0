use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::owner::parse_timestamp;
use crate::db::DatabaseError;
use crate::models::enums::Unit;
use crate::models::PantryItem;

const SELECT_COLUMNS: &str = "SELECT id, owner_id, name, quantity, unit, categories, expiry_date,
     notes, image_url, created_at, updated_at FROM pantry_items";

pub fn insert_pantry_item(conn: &Connection, item: &PantryItem) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO pantry_items (id, owner_id, name, quantity, unit, categories, expiry_date,
         notes, image_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            item.id.to_string(),
            item.owner_id,
            item.name,
            item.quantity,
            item.unit.as_str(),
            encode_categories(&item.categories)?,
            item.expiry_date.to_string(),
            item.notes,
            item.image_url,
            item.created_at.to_rfc3339(),
            item.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_pantry_item(conn: &Connection, id: &Uuid) -> Result<Option<PantryItem>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            params![id.to_string()],
            pantry_row_from_rusqlite,
        )
        .optional()?;
    row.map(pantry_item_from_row).transpose()
}

/// All items of one owner, soonest expiry first.
pub fn list_pantry_items_by_owner(
    conn: &Connection,
    owner_id: &str,
) -> Result<Vec<PantryItem>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} WHERE owner_id = ?1 ORDER BY expiry_date, name"
    ))?;
    let rows = stmt.query_map(params![owner_id], pantry_row_from_rusqlite)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(pantry_item_from_row(row?)?);
    }
    Ok(items)
}

/// Overwrite the editable columns. Returns false when no row has this id.
pub fn update_pantry_item(conn: &Connection, item: &PantryItem) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE pantry_items SET name = ?2, quantity = ?3, unit = ?4, categories = ?5,
         expiry_date = ?6, notes = ?7, image_url = ?8, updated_at = ?9
         WHERE id = ?1",
        params![
            item.id.to_string(),
            item.name,
            item.quantity,
            item.unit.as_str(),
            encode_categories(&item.categories)?,
            item.expiry_date.to_string(),
            item.notes,
            item.image_url,
            item.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(changed > 0)
}

pub fn delete_pantry_item(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM pantry_items WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(deleted > 0)
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct PantryRow {
    id: String,
    owner_id: String,
    name: String,
    quantity: f64,
    unit: String,
    categories: String,
    expiry_date: String,
    notes: Option<String>,
    image_url: Option<String>,
    created_at: String,
    updated_at: String,
}

fn pantry_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PantryRow, rusqlite::Error> {
    Ok(PantryRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        quantity: row.get(3)?,
        unit: row.get(4)?,
        categories: row.get(5)?,
        expiry_date: row.get(6)?,
        notes: row.get(7)?,
        image_url: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn pantry_item_from_row(row: PantryRow) -> Result<PantryItem, DatabaseError> {
    Ok(PantryItem {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::CorruptColumn {
            column: "pantry_items.id".into(),
            reason: e.to_string(),
        })?,
        owner_id: row.owner_id,
        name: row.name,
        quantity: row.quantity,
        unit: Unit::from_str(&row.unit)?,
        categories: serde_json::from_str(&row.categories).map_err(|e| {
            DatabaseError::CorruptColumn {
                column: "pantry_items.categories".into(),
                reason: e.to_string(),
            }
        })?,
        expiry_date: NaiveDate::parse_from_str(&row.expiry_date, "%Y-%m-%d").map_err(|e| {
            DatabaseError::CorruptColumn {
                column: "pantry_items.expiry_date".into(),
                reason: e.to_string(),
            }
        })?,
        notes: row.notes,
        image_url: row.image_url,
        created_at: parse_timestamp("pantry_items.created_at", &row.created_at)?,
        updated_at: parse_timestamp("pantry_items.updated_at", &row.updated_at)?,
    })
}

fn encode_categories(categories: &[String]) -> Result<String, DatabaseError> {
    serde_json::to_string(categories).map_err(|e| DatabaseError::CorruptColumn {
        column: "pantry_items.categories".into(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_owner;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{Owner, ValidatedPantryItem};
    use chrono::Utc;

    fn test_db() -> Connection {
        let conn = open_memory_database().unwrap();
        insert_owner(
            &conn,
            &Owner {
                id: "owner-1".into(),
                display_name: None,
                created_at: Utc::now(),
            },
        )
        .unwrap();
        conn
    }

    fn make_item(name: &str, expiry: (i32, u32, u32)) -> PantryItem {
        PantryItem::from_validated(
            "owner-1",
            ValidatedPantryItem {
                name: name.into(),
                quantity: 1.5,
                unit: Unit::Grams,
                categories: vec!["Pantry".into(), "Snacks".into()],
                expiry_date: NaiveDate::from_ymd_opt(expiry.0, expiry.1, expiry.2).unwrap(),
                notes: Some("top shelf".into()),
                image_url: None,
            },
        )
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = test_db();
        let item = make_item("Crackers", (2026, 12, 1));
        insert_pantry_item(&conn, &item).unwrap();

        let loaded = get_pantry_item(&conn, &item.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Crackers");
        assert_eq!(loaded.quantity, 1.5);
        assert_eq!(loaded.unit, Unit::Grams);
        assert_eq!(loaded.categories, vec!["Pantry".to_string(), "Snacks".to_string()]);
        assert_eq!(loaded.notes.as_deref(), Some("top shelf"));
        assert_eq!(loaded.created_at.timestamp(), item.created_at.timestamp());
    }

    #[test]
    fn get_unknown_id_returns_none() {
        let conn = test_db();
        assert!(get_pantry_item(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn list_orders_by_expiry() {
        let conn = test_db();
        insert_pantry_item(&conn, &make_item("Late", (2027, 1, 1))).unwrap();
        insert_pantry_item(&conn, &make_item("Soon", (2026, 11, 1))).unwrap();

        let items = list_pantry_items_by_owner(&conn, "owner-1").unwrap();
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Soon", "Late"]);
    }

    #[test]
    fn update_overwrites_editable_columns() {
        let conn = test_db();
        let mut item = make_item("Rice", (2027, 3, 1));
        insert_pantry_item(&conn, &item).unwrap();

        item.quantity = 4.0;
        item.unit = Unit::Pieces;
        assert!(update_pantry_item(&conn, &item).unwrap());

        let loaded = get_pantry_item(&conn, &item.id).unwrap().unwrap();
        assert_eq!(loaded.quantity, 4.0);
        assert_eq!(loaded.unit, Unit::Pieces);
    }

    #[test]
    fn update_missing_row_reports_false() {
        let conn = test_db();
        let item = make_item("Ghost", (2027, 3, 1));
        assert!(!update_pantry_item(&conn, &item).unwrap());
    }

    #[test]
    fn delete_reports_whether_row_existed() {
        let conn = test_db();
        let item = make_item("Beans", (2027, 3, 1));
        insert_pantry_item(&conn, &item).unwrap();

        assert!(delete_pantry_item(&conn, &item.id).unwrap());
        assert!(!delete_pantry_item(&conn, &item.id).unwrap());
    }

    #[test]
    fn non_positive_quantity_rejected_by_schema() {
        let conn = test_db();
        let mut item = make_item("Broken", (2027, 3, 1));
        item.quantity = 0.0;
        assert!(insert_pantry_item(&conn, &item).is_err());
    }

    #[test]
    fn unknown_owner_rejected_by_foreign_key() {
        let conn = test_db();
        let mut item = make_item("Orphan", (2027, 3, 1));
        item.owner_id = "nobody".into();
        assert!(insert_pantry_item(&conn, &item).is_err());
    }
}
