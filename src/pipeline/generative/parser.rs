use serde::{Deserialize, Deserializer};

use super::types::{ExtractionResult, ParsedExtraction};
use crate::models::draft::{default_quantity, null_as_empty, optional_text, quantity_text};
use crate::models::LineItemDraft;
use crate::pipeline::ExtractionError;

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Parse a generated reply into an [`ExtractionResult`].
///
/// Only the first ```` ```json ```` block is read. Items that do not fit the
/// item shape are skipped and reported in `warnings`; the surrounding object
/// must fit.
pub fn parse_extraction_response(response: &str) -> Result<ParsedExtraction, ExtractionError> {
    let json = parse_json_block(response)?;
    let raw: RawExtraction =
        serde_json::from_value(json).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    let mut warnings = Vec::new();
    let items = raw
        .items
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<RawReceiptItem>(value) {
            Ok(item) => Some(item.into_draft()),
            Err(e) => {
                warnings.push(format!("Skipped item {index}: {e}"));
                None
            }
        })
        .collect();

    Ok(ParsedExtraction {
        result: ExtractionResult {
            vendor_name: raw.vendor_name,
            date: raw.date,
            items,
            subtotal: raw.subtotal,
            tax: raw.tax,
            total: raw.total,
        },
        warnings,
    })
}

/// Find the first fenced JSON block and parse it.
///
/// A missing or unterminated block is a format error; text inside the
/// block that is not JSON is a parse error.
pub fn parse_json_block(response: &str) -> Result<serde_json::Value, ExtractionError> {
    let json_str = locate_json_block(response)?;
    serde_json::from_str(json_str).map_err(|e| ExtractionError::Parse(e.to_string()))
}

/// Slice between the first open marker and the next close marker.
fn locate_json_block(response: &str) -> Result<&str, ExtractionError> {
    let open = response
        .find(FENCE_OPEN)
        .ok_or_else(|| ExtractionError::Format("no ```json marker".into()))?;
    let content_start = open + FENCE_OPEN.len();

    let close = response[content_start..]
        .find(FENCE_CLOSE)
        .ok_or_else(|| ExtractionError::Format("unclosed ```json block".into()))?;

    Ok(response[content_start..content_start + close].trim())
}

#[derive(Deserialize)]
struct RawExtraction {
    #[serde(default, deserialize_with = "optional_text")]
    vendor_name: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    date: Option<String>,
    #[serde(default)]
    items: Option<Vec<serde_json::Value>>,
    #[serde(default, deserialize_with = "lenient_money")]
    subtotal: Option<f64>,
    #[serde(default, deserialize_with = "lenient_money")]
    tax: Option<f64>,
    #[serde(default, deserialize_with = "lenient_money")]
    total: Option<f64>,
}

/// One element of `items` as the prompt asks for it.
#[derive(Deserialize)]
struct RawReceiptItem {
    name: String,
    #[serde(default = "default_quantity", deserialize_with = "quantity_text")]
    quantity: String,
    #[serde(default, deserialize_with = "optional_text")]
    unit: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    categories: Vec<String>,
    #[serde(default, deserialize_with = "optional_text")]
    price: Option<String>,
}

impl RawReceiptItem {
    fn into_draft(self) -> LineItemDraft {
        let mut draft = LineItemDraft::named(self.name.trim());
        draft.quantity = self.quantity;
        draft.unit = self.unit;
        draft.categories = self.categories;
        draft.amount = self.price;
        draft
    }
}

/// Numbers pass through; strings such as `"$4.00"` or `"1,299.50"` are
/// stripped to digits first. Anything unreadable becomes `None`.
fn lenient_money<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => parse_money(&s),
        _ => None,
    })
}

pub(crate) fn parse_money(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> String {
        r#"Sure! Here is what I can read on the receipt:

```json
{
  "vendor_name": "Green Grocer",
  "date": "2026-10-17",
  "items": [
    {"name": "Whole Milk", "quantity": 2, "unit": "ml", "categories": ["Dairy"], "price": 4.0},
    {"name": "Sourdough", "quantity": null, "unit": null, "categories": [], "price": "$5.25"},
    {"name": "Eggs", "quantity": "12", "unit": "Dozen", "categories": null, "price": null}
  ],
  "subtotal": "$13.25",
  "tax": 0.66,
  "total": 13.91
}
```

Let me know if anything looks off."#
            .to_string()
    }

    #[test]
    fn parse_full_response() {
        let parsed = parse_extraction_response(&sample_response()).unwrap();
        let result = parsed.result;

        assert_eq!(result.vendor_name.as_deref(), Some("Green Grocer"));
        assert_eq!(result.date.as_deref(), Some("2026-10-17"));
        assert_eq!(result.items.len(), 3);
        assert_eq!(result.items[0].name, "Whole Milk");
        assert_eq!(result.items[0].quantity, "2");
        assert_eq!(result.items[0].unit.as_deref(), Some("ml"));
        assert_eq!(result.items[0].amount.as_deref(), Some("4.0"));
        assert_eq!(result.items[1].quantity, "1");
        assert_eq!(result.items[1].amount.as_deref(), Some("$5.25"));
        assert!(result.items[2].categories.is_empty());
        assert_eq!(result.subtotal, Some(13.25));
        assert_eq!(result.tax, Some(0.66));
        assert_eq!(result.total, Some(13.91));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn minimal_wrapped_block_parses() {
        let response = "Here you go:\n```json\n{\"vendor_name\":null,\"items\":[]}\n```\nEnjoy!";
        let parsed = parse_extraction_response(response).unwrap();
        assert_eq!(parsed.result.vendor_name, None);
        assert!(parsed.result.items.is_empty());
        assert_eq!(parsed.result.total, None);
    }

    #[test]
    fn missing_block_is_format_error() {
        let result = parse_extraction_response("I could not read this receipt, sorry.");
        assert!(matches!(result, Err(ExtractionError::Format(_))));
    }

    #[test]
    fn bare_json_without_fence_is_format_error() {
        let result = parse_extraction_response(r#"{"vendor_name": null, "items": []}"#);
        assert!(matches!(result, Err(ExtractionError::Format(_))));
    }

    #[test]
    fn untagged_fence_is_format_error() {
        let result = parse_extraction_response("```\n{\"items\": []}\n```");
        assert!(matches!(result, Err(ExtractionError::Format(_))));
    }

    #[test]
    fn unclosed_block_is_format_error() {
        let result = parse_extraction_response("```json\n{\"items\": []}\n");
        assert!(matches!(result, Err(ExtractionError::Format(_))));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let result = parse_extraction_response("```json\n{items: [oops}\n```");
        assert!(matches!(result, Err(ExtractionError::Parse(_))));
    }

    #[test]
    fn empty_block_is_parse_error() {
        let result = parse_extraction_response("```json\n\n```");
        assert!(matches!(result, Err(ExtractionError::Parse(_))));
    }

    #[test]
    fn non_object_json_is_parse_error() {
        let result = parse_extraction_response("```json\n[1, 2, 3]\n```");
        assert!(matches!(result, Err(ExtractionError::Parse(_))));
    }

    #[test]
    fn first_block_wins_when_several_are_present() {
        let response = "```json\n{\"vendor_name\": \"First\", \"items\": []}\n```\n\
                        and again\n```json\n{\"vendor_name\": \"Second\", \"items\": []}\n```";
        let parsed = parse_extraction_response(response).unwrap();
        assert_eq!(parsed.result.vendor_name.as_deref(), Some("First"));
    }

    #[test]
    fn malformed_first_block_is_not_rescued_by_second() {
        let response = "```json\n{broken\n```\n```json\n{\"items\": []}\n```";
        let result = parse_extraction_response(response);
        assert!(matches!(result, Err(ExtractionError::Parse(_))));
    }

    #[test]
    fn nameless_items_are_skipped_with_warning() {
        let response = r#"```json
{"vendor_name": null, "items": [{"quantity": 1}, {"name": "Tea"}, "garbage"]}
```"#;
        let parsed = parse_extraction_response(response).unwrap();
        assert_eq!(parsed.result.items.len(), 1);
        assert_eq!(parsed.result.items[0].name, "Tea");
        assert_eq!(parsed.warnings.len(), 2);
        assert!(parsed.warnings[0].starts_with("Skipped item 0"));
    }

    #[test]
    fn parse_json_block_returns_raw_value() {
        let value = parse_json_block("text ```json {\"a\": 1} ``` more").unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn money_parsing_handles_symbols_and_separators() {
        assert_eq!(parse_money("$4.00"), Some(4.0));
        assert_eq!(parse_money("1,299.50"), Some(1299.5));
        assert_eq!(parse_money("free"), None);
        assert_eq!(parse_money(""), None);
    }
}
