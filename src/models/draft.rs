use serde::{Deserialize, Deserializer, Serialize};

/// Quantity recorded when the receipt shows none for an item.
pub const DEFAULT_QUANTITY: &str = "1";

/// An unconfirmed pantry line item awaiting human review.
///
/// Everything here is as loose as the sources that produce it: quantity is
/// kept as text, unit and categories are unchecked. The domain validator
/// turns a draft into a [`ValidatedPantryItem`](super::ValidatedPantryItem).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_quantity", deserialize_with = "quantity_text")]
    pub quantity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "optional_text")]
    pub amount: Option<String>,
    #[serde(default, alias = "expiry_date", skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, alias = "image_url", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl LineItemDraft {
    /// Draft with only a name; quantity defaults to one.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: default_quantity(),
            unit: None,
            categories: Vec::new(),
            amount: None,
            expiry_date: None,
            notes: None,
            image_url: None,
        }
    }

    pub fn has_expiry_date(&self) -> bool {
        self.expiry_date
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

/// The editable fields of a draft, by their wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftField {
    Name,
    Quantity,
    Unit,
    Categories,
    Amount,
    ExpiryDate,
    Notes,
    ImageUrl,
}

impl DraftField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Quantity => "quantity",
            Self::Unit => "unit",
            Self::Categories => "categories",
            Self::Amount => "amount",
            Self::ExpiryDate => "expiryDate",
            Self::Notes => "notes",
            Self::ImageUrl => "imageUrl",
        }
    }
}

impl std::fmt::Display for DraftField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DraftField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "quantity" => Ok(Self::Quantity),
            "unit" => Ok(Self::Unit),
            "categories" => Ok(Self::Categories),
            "amount" => Ok(Self::Amount),
            "expiryDate" | "expiry_date" => Ok(Self::ExpiryDate),
            "notes" => Ok(Self::Notes),
            "imageUrl" | "image_url" => Ok(Self::ImageUrl),
            other => Err(format!("unknown draft field '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoding shared by drafts and extraction payloads
// ---------------------------------------------------------------------------

pub(crate) fn default_quantity() -> String {
    DEFAULT_QUANTITY.to_string()
}

/// Render a JSON number or string as quantity text; `null` becomes the default.
pub(crate) fn quantity_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => default_quantity(),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => default_quantity(),
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "quantity must be a number or string, got {other}"
            )))
        }
    })
}

/// Accept a string or number; blank strings and `null` become `None`.
pub(crate) fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_quantity_becomes_text() {
        let draft: LineItemDraft =
            serde_json::from_str(r#"{"name":"Eggs","quantity":12,"categories":["Dairy"]}"#)
                .unwrap();
        assert_eq!(draft.quantity, "12");
    }

    #[test]
    fn missing_or_null_quantity_defaults_to_one() {
        let missing: LineItemDraft = serde_json::from_str(r#"{"name":"Milk"}"#).unwrap();
        assert_eq!(missing.quantity, DEFAULT_QUANTITY);

        let null: LineItemDraft =
            serde_json::from_str(r#"{"name":"Milk","quantity":null}"#).unwrap();
        assert_eq!(null.quantity, DEFAULT_QUANTITY);
    }

    #[test]
    fn null_categories_become_empty() {
        let draft: LineItemDraft =
            serde_json::from_str(r#"{"name":"Milk","categories":null}"#).unwrap();
        assert!(draft.categories.is_empty());
    }

    #[test]
    fn serializes_camel_case_and_skips_absent_fields() {
        let mut draft = LineItemDraft::named("Bread");
        draft.expiry_date = Some("2026-11-01".into());
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["expiryDate"], "2026-11-01");
        assert!(json.get("amount").is_none());
        assert!(json.get("imageUrl").is_none());
    }

    #[test]
    fn snake_case_aliases_are_accepted() {
        let draft: LineItemDraft = serde_json::from_str(
            r#"{"name":"Milk","expiry_date":"2026-11-01","image_url":"http://img/1.png"}"#,
        )
        .unwrap();
        assert_eq!(draft.expiry_date.as_deref(), Some("2026-11-01"));
        assert_eq!(draft.image_url.as_deref(), Some("http://img/1.png"));
    }

    #[test]
    fn blank_expiry_date_is_not_present() {
        let mut draft = LineItemDraft::named("Bread");
        assert!(!draft.has_expiry_date());
        draft.expiry_date = Some("   ".into());
        assert!(!draft.has_expiry_date());
        draft.expiry_date = Some("2026-11-01".into());
        assert!(draft.has_expiry_date());
    }

    #[test]
    fn draft_field_parses_wire_names() {
        use std::str::FromStr;
        assert_eq!(DraftField::from_str("expiryDate").unwrap(), DraftField::ExpiryDate);
        assert_eq!(DraftField::from_str("imageUrl").unwrap(), DraftField::ImageUrl);
        assert!(DraftField::from_str("price").is_err());
    }
}
