//! ItemsMerged event applier
//!
//! Sums quantities into existing lines and appends new lines.

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// ItemsMerged applier
pub struct ItemsMergedApplier;

impl EventApplier for ItemsMergedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ItemsMerged {
            increments,
            added,
            notes,
        } = &event.payload
        {
            for inc in increments {
                if let Some(existing) = snapshot.find_item_mut(inc.item_id)
                    && !existing.is_removed()
                {
                    existing.quantity = existing.quantity.saturating_add(inc.added);
                }
            }
            snapshot.items.extend(added.iter().cloned());
            if notes.is_some() {
                snapshot.notes = notes.clone();
            }
            snapshot.recalculate_total();
            super::touch(snapshot, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::appliers::test_support::{event, item};
    use shared::order::{ItemIncrement, ItemRemoval};

    #[test]
    fn test_merge_sums_and_appends() {
        let mut snapshot = OrderSnapshot::new(1, "tenant-1".to_string(), 1, "s".to_string());
        snapshot.items.push(item(1, 10, 1000, 2));
        snapshot.recalculate_total();

        let event = event(
            2,
            1,
            EventPayload::ItemsMerged {
                increments: vec![ItemIncrement { item_id: 1, added: 3 }],
                added: vec![item(2, 11, 300, 1)],
                notes: None,
            },
        );
        ItemsMergedApplier.apply(&mut snapshot, &event);

        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.items[0].quantity, 5);
        assert_eq!(snapshot.items[1].quantity, 1);
        assert_eq!(snapshot.total, 5 * 1000 + 300);
        assert_eq!(snapshot.last_sequence, 2);
    }

    #[test]
    fn test_increment_never_touches_removed_line() {
        let mut snapshot = OrderSnapshot::new(1, "tenant-1".to_string(), 1, "s".to_string());
        let mut removed = item(1, 10, 1000, 2);
        removed.removal = Some(ItemRemoval {
            removed_by: "staff:u1".to_string(),
            removed_at: 1,
            reason: None,
        });
        snapshot.items.push(removed);

        let event = event(
            2,
            1,
            EventPayload::ItemsMerged {
                increments: vec![ItemIncrement { item_id: 1, added: 1 }],
                added: vec![],
                notes: None,
            },
        );
        ItemsMergedApplier.apply(&mut snapshot, &event);

        assert_eq!(snapshot.items[0].quantity, 2);
        assert_eq!(snapshot.total, 0);
    }
}
