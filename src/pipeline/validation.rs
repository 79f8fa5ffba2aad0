//! Domain validation for pantry drafts.
//!
//! `validate_draft` is the only way to obtain a [`ValidatedPantryItem`].
//! `normalize_extracted_items` is a softer pass run on extraction output
//! before it reaches the buffer; it never replaces commit-time validation.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::enums::{BuiltinCategory, Unit};
use crate::models::{DraftField, LineItemDraft, ValidatedPantryItem};

/// Units and categories one owner may use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    custom_categories: Vec<String>,
}

impl Vocabulary {
    /// Fixed vocabulary only.
    pub fn fixed() -> Self {
        Self::default()
    }

    /// Fixed vocabulary plus an owner's registered categories.
    pub fn with_custom<I, S>(custom: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut custom_categories: Vec<String> = Vec::new();
        for name in custom {
            let name = name.into();
            let name = name.trim();
            if name.is_empty()
                || BuiltinCategory::from_str(name).is_ok()
                || custom_categories.iter().any(|c| c == name)
            {
                continue;
            }
            custom_categories.push(name.to_string());
        }
        Self { custom_categories }
    }

    pub fn allows_category(&self, category: &str) -> bool {
        BuiltinCategory::from_str(category).is_ok()
            || self.custom_categories.iter().any(|c| c == category)
    }

    /// Built-in categories in declaration order, then custom ones.
    pub fn categories(&self) -> Vec<String> {
        BuiltinCategory::allowed_values()
            .into_iter()
            .map(str::to_string)
            .chain(self.custom_categories.iter().cloned())
            .collect()
    }

    pub fn custom_categories(&self) -> &[String] {
        &self.custom_categories
    }

    pub fn units(&self) -> Vec<&'static str> {
        Unit::allowed_values()
    }
}

/// One problem with one field of a draft.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldIssue {
    #[error("name must not be empty")]
    EmptyName,

    #[error("quantity '{value}' is not a positive number")]
    InvalidQuantity { value: String },

    #[error("unit is required")]
    MissingUnit,

    #[error("unit '{value}' is not one of: {allowed}")]
    InvalidUnit { value: String, allowed: String },

    #[error("at least one category is required")]
    EmptyCategories,

    #[error("unknown categories: {}", .invalid.join(", "))]
    InvalidCategories { invalid: Vec<String> },

    #[error("expiry date is required")]
    MissingExpiryDate,

    #[error("expiry date '{value}' is not a valid date")]
    InvalidExpiryDate { value: String },
}

impl FieldIssue {
    pub fn field(&self) -> DraftField {
        match self {
            Self::EmptyName => DraftField::Name,
            Self::InvalidQuantity { .. } => DraftField::Quantity,
            Self::MissingUnit | Self::InvalidUnit { .. } => DraftField::Unit,
            Self::EmptyCategories | Self::InvalidCategories { .. } => DraftField::Categories,
            Self::MissingExpiryDate | Self::InvalidExpiryDate { .. } => DraftField::ExpiryDate,
        }
    }
}

/// Every issue found in one draft.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", describe(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

fn describe(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {i}", i.field()))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Serializable view of a field issue for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct IssueDetail {
    pub field: DraftField,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid: Option<Vec<String>>,
}

impl From<&FieldIssue> for IssueDetail {
    fn from(issue: &FieldIssue) -> Self {
        Self {
            field: issue.field(),
            message: issue.to_string(),
            invalid: match issue {
                FieldIssue::InvalidCategories { invalid } => Some(invalid.clone()),
                _ => None,
            },
        }
    }
}

/// A draft in a batch that did not validate.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub index: usize,
    pub draft_id: Option<Uuid>,
    pub name: String,
    pub error: ValidationError,
}

/// Check one draft against the vocabulary. All field issues are collected.
pub fn validate_draft(
    draft: &LineItemDraft,
    vocabulary: &Vocabulary,
) -> Result<ValidatedPantryItem, ValidationError> {
    let mut issues = Vec::new();

    let name = draft.name.trim();
    if name.is_empty() {
        issues.push(FieldIssue::EmptyName);
    }

    let quantity = parse_quantity(&draft.quantity);
    if quantity.is_none() {
        issues.push(FieldIssue::InvalidQuantity {
            value: draft.quantity.clone(),
        });
    }

    let unit = match non_blank(draft.unit.as_deref()) {
        None => {
            issues.push(FieldIssue::MissingUnit);
            None
        }
        Some(raw) => match Unit::from_str(raw) {
            Ok(unit) => Some(unit),
            Err(_) => {
                issues.push(FieldIssue::InvalidUnit {
                    value: raw.to_string(),
                    allowed: Unit::allowed_values().join(", "),
                });
                None
            }
        },
    };

    let categories = dedupe_categories(&draft.categories);
    if categories.is_empty() {
        issues.push(FieldIssue::EmptyCategories);
    } else {
        let invalid: Vec<String> = categories
            .iter()
            .filter(|c| !vocabulary.allows_category(c))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            issues.push(FieldIssue::InvalidCategories { invalid });
        }
    }

    let expiry_date = match non_blank(draft.expiry_date.as_deref()) {
        None => {
            issues.push(FieldIssue::MissingExpiryDate);
            None
        }
        Some(raw) => {
            let parsed = parse_expiry_date(raw);
            if parsed.is_none() {
                issues.push(FieldIssue::InvalidExpiryDate {
                    value: raw.to_string(),
                });
            }
            parsed
        }
    };

    match (quantity, unit, expiry_date) {
        (Some(quantity), Some(unit), Some(expiry_date)) if issues.is_empty() => {
            Ok(ValidatedPantryItem {
                name: name.to_string(),
                quantity,
                unit,
                categories,
                expiry_date,
                notes: non_blank(draft.notes.as_deref()).map(str::to_string),
                image_url: non_blank(draft.image_url.as_deref()).map(str::to_string),
            })
        }
        _ => Err(ValidationError { issues }),
    }
}

/// Validate every draft; either all pass or every failure is reported.
pub fn validate_batch<'a, I>(
    drafts: I,
    vocabulary: &Vocabulary,
) -> Result<Vec<ValidatedPantryItem>, Vec<ItemFailure>>
where
    I: IntoIterator<Item = (Option<Uuid>, &'a LineItemDraft)>,
{
    let mut items = Vec::new();
    let mut failures = Vec::new();

    for (index, (draft_id, draft)) in drafts.into_iter().enumerate() {
        match validate_draft(draft, vocabulary) {
            Ok(item) => items.push(item),
            Err(error) => failures.push(ItemFailure {
                index,
                draft_id,
                name: draft.name.clone(),
                error,
            }),
        }
    }

    if failures.is_empty() {
        Ok(items)
    } else {
        Err(failures)
    }
}

/// Pre-fill cleanup of extracted drafts.
///
/// Units are matched case-insensitively (unknown ones are cleared),
/// categories outside the vocabulary are dropped and nameless items are
/// removed. Each adjustment is reported as a warning.
pub fn normalize_extracted_items(
    items: Vec<LineItemDraft>,
    vocabulary: &Vocabulary,
) -> (Vec<LineItemDraft>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut drafts = Vec::with_capacity(items.len());

    for (index, mut draft) in items.into_iter().enumerate() {
        draft.name = draft.name.trim().to_string();
        if draft.name.is_empty() {
            warnings.push(format!("Item {index} has no name and was dropped"));
            continue;
        }

        if let Some(raw) = draft.unit.take() {
            match Unit::from_loose(&raw) {
                Some(unit) => draft.unit = Some(unit.as_str().to_string()),
                None if raw.trim().is_empty() => {}
                None => warnings.push(format!(
                    "'{}': unit '{}' is not recognised and was cleared",
                    draft.name,
                    raw.trim()
                )),
            }
        }

        let (kept, dropped): (Vec<String>, Vec<String>) = dedupe_categories(&draft.categories)
            .into_iter()
            .partition(|c| vocabulary.allows_category(c));
        if !dropped.is_empty() {
            warnings.push(format!(
                "'{}': dropped unknown categories {}",
                draft.name,
                dropped.join(", ")
            ));
        }
        draft.categories = kept;

        drafts.push(draft);
    }

    for warning in &warnings {
        tracing::warn!(%warning, "Extraction normalized");
    }

    (drafts, warnings)
}

/// Positive finite number, or `None`.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|q| q.is_finite() && *q > 0.0)
}

/// `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp.
pub fn parse_expiry_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn dedupe_categories(categories: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(categories.len());
    for category in categories {
        let category = category.trim();
        if !category.is_empty() && !out.iter().any(|c| c == category) {
            out.push(category.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_draft() -> LineItemDraft {
        let mut draft = LineItemDraft::named("Milk");
        draft.quantity = "2".into();
        draft.unit = Some("ml".into());
        draft.categories = vec!["Dairy".into()];
        draft.expiry_date = Some("2026-11-02".into());
        draft
    }

    #[test]
    fn complete_draft_validates() {
        let item = validate_draft(&complete_draft(), &Vocabulary::fixed()).unwrap();
        assert_eq!(item.name, "Milk");
        assert_eq!(item.quantity, 2.0);
        assert_eq!(item.unit, Unit::Millilitres);
        assert_eq!(item.categories, vec!["Dairy"]);
        assert_eq!(item.expiry_date, NaiveDate::from_ymd_opt(2026, 11, 2).unwrap());
        assert_eq!(item.notes, None);
    }

    #[test]
    fn bogus_category_is_named_exactly() {
        let mut draft = complete_draft();
        draft.categories = vec!["Dairy".into(), "Bogus".into()];
        let err = validate_draft(&draft, &Vocabulary::fixed()).unwrap_err();
        assert_eq!(
            err.issues,
            vec![FieldIssue::InvalidCategories {
                invalid: vec!["Bogus".into()]
            }]
        );
        assert!(err.to_string().contains("Bogus"));
        assert!(!err.to_string().contains("Dairy"));
    }

    #[test]
    fn custom_category_is_accepted_for_its_owner() {
        let mut draft = complete_draft();
        draft.categories = vec!["Spices".into()];
        assert!(validate_draft(&draft, &Vocabulary::fixed()).is_err());
        assert!(validate_draft(&draft, &Vocabulary::with_custom(["Spices"])).is_ok());
    }

    #[test]
    fn invalid_unit_lists_allowed_set() {
        let mut draft = complete_draft();
        draft.unit = Some("litres".into());
        let err = validate_draft(&draft, &Vocabulary::fixed()).unwrap_err();
        match &err.issues[0] {
            FieldIssue::InvalidUnit { value, allowed } => {
                assert_eq!(value, "litres");
                assert_eq!(allowed, "grams, ml, pieces, Dozen");
            }
            other => panic!("unexpected issue {other:?}"),
        }
    }

    #[test]
    fn unit_is_case_sensitive_at_commit() {
        let mut draft = complete_draft();
        draft.unit = Some("dozen".into());
        assert!(validate_draft(&draft, &Vocabulary::fixed()).is_err());
    }

    #[test]
    fn quantity_must_be_positive_number() {
        for bad in ["abc", "0", "-1", "", "NaN", "inf"] {
            let mut draft = complete_draft();
            draft.quantity = bad.into();
            let err = validate_draft(&draft, &Vocabulary::fixed()).unwrap_err();
            assert_eq!(err.issues[0].field(), DraftField::Quantity, "for {bad:?}");
        }
        let mut draft = complete_draft();
        draft.quantity = " 1.5 ".into();
        assert_eq!(validate_draft(&draft, &Vocabulary::fixed()).unwrap().quantity, 1.5);
    }

    #[test]
    fn every_issue_is_collected() {
        let draft = LineItemDraft {
            name: "  ".into(),
            quantity: "x".into(),
            unit: None,
            categories: vec![],
            amount: None,
            expiry_date: None,
            notes: None,
            image_url: None,
        };
        let err = validate_draft(&draft, &Vocabulary::fixed()).unwrap_err();
        let fields: Vec<DraftField> = err.issues.iter().map(FieldIssue::field).collect();
        assert_eq!(
            fields,
            vec![
                DraftField::Name,
                DraftField::Quantity,
                DraftField::Unit,
                DraftField::Categories,
                DraftField::ExpiryDate,
            ]
        );
    }

    #[test]
    fn expiry_accepts_plain_date_and_timestamp() {
        assert_eq!(
            parse_expiry_date("2026-11-02T00:00:00Z"),
            NaiveDate::from_ymd_opt(2026, 11, 2)
        );
        assert_eq!(parse_expiry_date("2026-11-02"), NaiveDate::from_ymd_opt(2026, 11, 2));
        assert_eq!(parse_expiry_date("next week"), None);

        let mut draft = complete_draft();
        draft.expiry_date = Some("02/11/2026".into());
        let err = validate_draft(&draft, &Vocabulary::fixed()).unwrap_err();
        assert!(matches!(err.issues[0], FieldIssue::InvalidExpiryDate { .. }));
    }

    #[test]
    fn duplicate_categories_collapse_and_blank_optionals_clear() {
        let mut draft = complete_draft();
        draft.categories = vec!["Dairy".into(), " Dairy ".into(), "Snacks".into()];
        draft.notes = Some("   ".into());
        draft.image_url = Some(" http://img/milk.png ".into());
        let item = validate_draft(&draft, &Vocabulary::fixed()).unwrap();
        assert_eq!(item.categories, vec!["Dairy", "Snacks"]);
        assert_eq!(item.notes, None);
        assert_eq!(item.image_url.as_deref(), Some("http://img/milk.png"));
    }

    #[test]
    fn batch_reports_each_failure_with_index_and_id() {
        let good = complete_draft();
        let mut bad = complete_draft();
        bad.name = "Cheese".into();
        bad.unit = Some("kg".into());
        let bad_id = Uuid::new_v4();

        let failures = validate_batch(
            [(None, &good), (Some(bad_id), &bad)],
            &Vocabulary::fixed(),
        )
        .unwrap_err();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[0].draft_id, Some(bad_id));
        assert_eq!(failures[0].name, "Cheese");
    }

    #[test]
    fn batch_of_valid_drafts_passes() {
        let a = complete_draft();
        let b = complete_draft();
        let items = validate_batch([(None, &a), (None, &b)], &Vocabulary::fixed()).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn normalization_fixes_units_and_drops_unknowns() {
        let mut eggs = LineItemDraft::named("Eggs");
        eggs.unit = Some("DOZEN".into());
        eggs.categories = vec!["Dairy".into(), "Breakfast".into()];
        let mut rice = LineItemDraft::named("Rice");
        rice.unit = Some("sack".into());
        let nameless = LineItemDraft::named("  ");

        let (drafts, warnings) =
            normalize_extracted_items(vec![eggs, nameless, rice], &Vocabulary::fixed());
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].unit.as_deref(), Some("Dozen"));
        assert_eq!(drafts[0].categories, vec!["Dairy"]);
        assert_eq!(drafts[1].unit, None);
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn vocabulary_merges_custom_without_duplicates() {
        let vocab = Vocabulary::with_custom(["Spices", "Dairy", "Spices", " "]);
        assert_eq!(vocab.custom_categories(), ["Spices".to_string()]);
        let all = vocab.categories();
        assert_eq!(all.len(), 10);
        assert_eq!(all.last().map(String::as_str), Some("Spices"));
        assert_eq!(vocab.units(), vec!["grams", "ml", "pieces", "Dozen"]);
    }

    #[test]
    fn issue_detail_carries_invalid_entries() {
        let issue = FieldIssue::InvalidCategories {
            invalid: vec!["Bogus".into()],
        };
        let detail = serde_json::to_value(IssueDetail::from(&issue)).unwrap();
        assert_eq!(detail["field"], "categories");
        assert_eq!(detail["invalid"][0], "Bogus");
    }
}
