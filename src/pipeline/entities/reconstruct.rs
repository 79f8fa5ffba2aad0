use crate::models::LineItemDraft;

use super::types::{DocumentEntity, RawEntity};

/// Values observed since the last finalized item.
#[derive(Debug, Default, Clone, PartialEq)]
struct PendingItem {
    quantity: Option<String>,
    amount: Option<String>,
}

impl PendingItem {
    fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.amount.is_none()
    }

    fn finish(self, name: &str) -> LineItemDraft {
        let mut draft = LineItemDraft::named(name.trim());
        if let Some(quantity) = self.quantity {
            draft.quantity = quantity;
        }
        draft.amount = self.amount;
        draft
    }
}

/// Drafts rebuilt from one entity stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconstruction {
    pub drafts: Vec<LineItemDraft>,
    /// Entities of a type the reconstructor does not use.
    pub ignored_entities: usize,
    /// A quantity or amount arrived after the last item and was dropped.
    pub dropped_trailing: bool,
}

/// Fold an ordered entity stream into drafts.
///
/// `Quantity` and `Amount` set (and overwrite) the pending values; `Item`
/// emits a draft from them and resets. Pending values with no later `Item`
/// are dropped. Never fails.
pub fn reconstruct_line_items<I>(entities: I) -> Reconstruction
where
    I: IntoIterator<Item = DocumentEntity>,
{
    let (drafts, pending, ignored_entities) = entities.into_iter().fold(
        (Vec::new(), PendingItem::default(), 0usize),
        |(mut drafts, pending, ignored), entity| match entity {
            DocumentEntity::Quantity(text) => (
                drafts,
                PendingItem {
                    quantity: Some(text.trim().to_string()),
                    ..pending
                },
                ignored,
            ),
            DocumentEntity::Amount(text) => (
                drafts,
                PendingItem {
                    amount: Some(text.trim().to_string()),
                    ..pending
                },
                ignored,
            ),
            DocumentEntity::Item(text) => {
                drafts.push(pending.finish(&text));
                (drafts, PendingItem::default(), ignored)
            }
            DocumentEntity::Other { entity_type, text } => {
                tracing::debug!(%entity_type, text_len = text.len(), "Ignoring entity");
                (drafts, pending, ignored + 1)
            }
        },
    );

    Reconstruction {
        drafts,
        ignored_entities,
        dropped_trailing: !pending.is_empty(),
    }
}

/// Convenience for the raw wire form.
pub fn reconstruct_from_raw(entities: Vec<RawEntity>) -> Reconstruction {
    reconstruct_line_items(entities.into_iter().map(DocumentEntity::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> DocumentEntity {
        DocumentEntity::Quantity(s.into())
    }
    fn a(s: &str) -> DocumentEntity {
        DocumentEntity::Amount(s.into())
    }
    fn item(s: &str) -> DocumentEntity {
        DocumentEntity::Item(s.into())
    }

    #[test]
    fn milk_and_bread_receipt() {
        let result = reconstruct_line_items(vec![q("2"), a("$4.00"), item("Milk"), item("Bread")]);

        assert_eq!(result.drafts.len(), 2);
        assert_eq!(result.drafts[0].name, "Milk");
        assert_eq!(result.drafts[0].quantity, "2");
        assert_eq!(result.drafts[0].amount.as_deref(), Some("$4.00"));
        assert_eq!(result.drafts[1].name, "Bread");
        assert_eq!(result.drafts[1].quantity, "1");
        assert_eq!(result.drafts[1].amount, None);
    }

    #[test]
    fn item_without_quantity_defaults_to_one() {
        let result = reconstruct_line_items(vec![item("Apples")]);
        assert_eq!(result.drafts[0].quantity, "1");
    }

    #[test]
    fn repeated_quantity_keeps_latest() {
        let result = reconstruct_line_items(vec![q("3"), q("5"), item("Yogurt")]);
        assert_eq!(result.drafts.len(), 1);
        assert_eq!(result.drafts[0].quantity, "5");
    }

    #[test]
    fn repeated_amount_keeps_latest() {
        let result = reconstruct_line_items(vec![a("1.00"), a("2.50"), item("Tea")]);
        assert_eq!(result.drafts[0].amount.as_deref(), Some("2.50"));
    }

    #[test]
    fn trailing_quantity_and_amount_are_dropped() {
        let result = reconstruct_line_items(vec![item("Rice"), q("4"), a("$9.99")]);
        assert_eq!(result.drafts.len(), 1);
        assert_eq!(result.drafts[0].name, "Rice");
        assert_eq!(result.drafts[0].quantity, "1");
        assert!(result.dropped_trailing);
    }

    #[test]
    fn empty_stream_yields_no_drafts() {
        let result = reconstruct_line_items(Vec::new());
        assert!(result.drafts.is_empty());
        assert_eq!(result.ignored_entities, 0);
        assert!(!result.dropped_trailing);
    }

    #[test]
    fn builder_resets_after_each_item() {
        let result = reconstruct_line_items(vec![q("2"), a("$3"), item("Eggs"), item("Flour")]);
        assert_eq!(result.drafts[1].quantity, "1");
        assert_eq!(result.drafts[1].amount, None);
    }

    #[test]
    fn other_entities_are_ignored_and_counted() {
        let result = reconstruct_line_items(vec![
            q("2"),
            DocumentEntity::Other {
                entity_type: "total_amount".into(),
                text: "$12.00".into(),
            },
            item("Cheese"),
        ]);
        assert_eq!(result.drafts.len(), 1);
        assert_eq!(result.drafts[0].quantity, "2");
        assert_eq!(result.ignored_entities, 1);
    }

    #[test]
    fn text_is_trimmed() {
        let result = reconstruct_line_items(vec![q("  6 \n"), a(" $2 "), item("  Bananas\n")]);
        assert_eq!(result.drafts[0].name, "Bananas");
        assert_eq!(result.drafts[0].quantity, "6");
        assert_eq!(result.drafts[0].amount.as_deref(), Some("$2"));
    }

    #[test]
    fn raw_entities_are_classified_before_folding() {
        let result = reconstruct_from_raw(vec![
            RawEntity::new("Quantity", "2"),
            RawEntity::new("Item", "Butter"),
        ]);
        assert_eq!(result.drafts[0].name, "Butter");
        assert_eq!(result.drafts[0].quantity, "2");
    }

    #[test]
    fn drafts_start_without_review_fields() {
        let result = reconstruct_line_items(vec![item("Butter")]);
        let draft = &result.drafts[0];
        assert!(draft.categories.is_empty());
        assert!(draft.unit.is_none());
        assert!(draft.expiry_date.is_none());
    }
}
