/// System prompt for receipt extraction.
pub const RECEIPT_SYSTEM_PROMPT: &str = "\
You read photographed grocery receipts and transcribe them into structured data. \
You never invent items that are not printed on the receipt.";

/// User prompt fixing the exact output shape.
pub const RECEIPT_EXTRACTION_PROMPT: &str = r#"Extract the purchase from this grocery receipt.

Reply with a single fenced JSON block in exactly this shape:

```json
{
  "vendor_name": "store name or null",
  "date": "purchase date as printed, or null",
  "items": [
    {
      "name": "product name",
      "quantity": "number of units bought, or null",
      "unit": "one of grams, ml, pieces, Dozen, or null",
      "categories": ["zero or more of the allowed categories"],
      "price": "line price as printed, or null"
    }
  ],
  "subtotal": "number or null",
  "tax": "number or null",
  "total": "number or null"
}
```

Rules:
- Use null for any value you cannot read. Never omit a key.
- "categories" is always an array. Use [] when no category fits; never omit it and never use null.
- One entry in "items" per purchased product line. Skip discounts, deposits and payment lines."#;

/// Prompt with the owner's category list appended, so suggestions stay
/// inside the vocabulary the buffer will accept.
pub fn build_extraction_prompt(categories: &[String]) -> String {
    if categories.is_empty() {
        return RECEIPT_EXTRACTION_PROMPT.to_string();
    }
    format!(
        "{RECEIPT_EXTRACTION_PROMPT}\n- Allowed categories: {}.",
        categories.join(", ")
    )
}
