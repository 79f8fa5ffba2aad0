use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Unit;

/// A draft that passed domain validation. Only the validator builds these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedPantryItem {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    pub categories: Vec<String>,
    pub expiry_date: NaiveDate,
    pub notes: Option<String>,
    pub image_url: Option<String>,
}

/// A pantry record as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryItem {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    pub categories: Vec<String>,
    pub expiry_date: NaiveDate,
    pub notes: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PantryItem {
    /// Assign a fresh id and timestamps to a validated item.
    pub fn from_validated(owner_id: &str, item: ValidatedPantryItem) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            name: item.name,
            quantity: item.quantity,
            unit: item.unit,
            categories: item.categories,
            expiry_date: item.expiry_date,
            notes: item.notes,
            image_url: item.image_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the user-editable fields, keeping identity and creation time.
    pub fn apply(&mut self, item: ValidatedPantryItem) {
        self.name = item.name;
        self.quantity = item.quantity;
        self.unit = item.unit;
        self.categories = item.categories;
        self.expiry_date = item.expiry_date;
        self.notes = item.notes;
        self.image_url = item.image_url;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ValidatedPantryItem {
        ValidatedPantryItem {
            name: "Milk".into(),
            quantity: 2.0,
            unit: Unit::Millilitres,
            categories: vec!["Dairy".into()],
            expiry_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            notes: None,
            image_url: None,
        }
    }

    #[test]
    fn from_validated_stamps_identity() {
        let item = PantryItem::from_validated("owner-1", sample());
        assert_eq!(item.owner_id, "owner-1");
        assert_eq!(item.created_at, item.updated_at);
        assert_eq!(item.quantity, 2.0);
    }

    #[test]
    fn apply_keeps_id_and_created_at() {
        let mut item = PantryItem::from_validated("owner-1", sample());
        let id = item.id;
        let created = item.created_at;
        let mut edited = sample();
        edited.quantity = 5.0;
        item.apply(edited);
        assert_eq!(item.id, id);
        assert_eq!(item.created_at, created);
        assert_eq!(item.quantity, 5.0);
    }

    #[test]
    fn serializes_camel_case() {
        let item = PantryItem::from_validated("owner-1", sample());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["expiryDate"], "2026-11-02");
        assert_eq!(json["unit"], "ml");
        assert!(json.get("ownerId").is_some());
    }
}
