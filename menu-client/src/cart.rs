//! Cart - local selection before submission
//!
//! Keyed by product id, so adding a product already in the cart increments
//! its quantity instead of duplicating the line. Prices shown here are a
//! display estimate only; the server prices every submission itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared::order::{CartItemInput, MAX_LINE_QUANTITY, ProductRef};

use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub product: ProductRef,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    entries: BTreeMap<i64, CartEntry>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` of a product; a `Some` note replaces the previous one
    pub fn add(&mut self, product: ProductRef, quantity: i32, note: Option<String>) -> ClientResult<()> {
        if quantity < 1 {
            return Err(ClientError::Validation(format!(
                "quantity must be positive, got {}",
                quantity
            )));
        }
        let current = self
            .entries
            .get(&product.product_id)
            .map_or(0, |entry| entry.quantity);
        if current
            .checked_add(quantity)
            .is_none_or(|total| total > MAX_LINE_QUANTITY)
        {
            return Err(ClientError::Validation(format!(
                "at most {} of one product per order",
                MAX_LINE_QUANTITY
            )));
        }
        match self.entries.get_mut(&product.product_id) {
            Some(entry) => {
                entry.quantity += quantity;
                if note.is_some() {
                    entry.note = note;
                }
            }
            None => {
                self.entries.insert(
                    product.product_id,
                    CartEntry {
                        product,
                        quantity,
                        note,
                    },
                );
            }
        }
        Ok(())
    }

    /// Decrease by one, dropping the entry at zero. Returns the remaining quantity.
    pub fn decrement(&mut self, product_id: i64) -> i32 {
        let Some(entry) = self.entries.get_mut(&product_id) else {
            return 0;
        };
        entry.quantity -= 1;
        let remaining = entry.quantity;
        if remaining <= 0 {
            self.entries.remove(&product_id);
        }
        remaining.max(0)
    }

    /// Set an absolute quantity, capped at [`MAX_LINE_QUANTITY`]; zero or less removes the entry
    pub fn set_quantity(&mut self, product_id: i64, quantity: i32) -> bool {
        if quantity <= 0 {
            return self.entries.remove(&product_id).is_some();
        }
        match self.entries.get_mut(&product_id) {
            Some(entry) => {
                entry.quantity = quantity.min(MAX_LINE_QUANTITY);
                true
            }
            None => false,
        }
    }

    pub fn set_note(&mut self, product_id: i64, note: Option<String>) -> bool {
        match self.entries.get_mut(&product_id) {
            Some(entry) => {
                entry.note = note;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, product_id: i64) -> Option<CartEntry> {
        self.entries.remove(&product_id)
    }

    pub fn get(&self, product_id: i64) -> Option<&CartEntry> {
        self.entries.get(&product_id)
    }

    pub fn items(&self) -> impl Iterator<Item = &CartEntry> {
        self.entries.values()
    }

    pub fn total_quantity(&self) -> i32 {
        self.entries.values().map(|e| e.quantity).sum()
    }

    /// Display estimate in minor units
    pub fn estimated_total(&self) -> i64 {
        self.entries
            .values()
            .map(|e| e.product.unit_price * i64::from(e.quantity))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Full cart snapshot in submission form
    pub fn to_submission(&self) -> Vec<CartItemInput> {
        self.entries
            .values()
            .map(|e| CartItemInput {
                product_id: e.product.product_id,
                quantity: e.quantity,
                note: e.note.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(product_id: i64, unit_price: i64) -> ProductRef {
        ProductRef {
            product_id,
            name: format!("P{}", product_id),
            unit_price,
        }
    }

    #[test]
    fn test_add_same_product_increments() {
        let mut cart = Cart::new();
        cart.add(product(1, 1000), 1, None).unwrap();
        cart.add(product(1, 1000), 2, Some("no onions".into())).unwrap();

        assert_eq!(cart.len(), 1);
        let entry = cart.get(1).unwrap();
        assert_eq!(entry.quantity, 3);
        assert_eq!(entry.note.as_deref(), Some("no onions"));
    }

    #[test]
    fn test_note_survives_add_without_note() {
        let mut cart = Cart::new();
        cart.add(product(1, 1000), 1, Some("rare".into())).unwrap();
        cart.add(product(1, 1000), 1, None).unwrap();
        assert_eq!(cart.get(1).unwrap().note.as_deref(), Some("rare"));
    }

    #[test]
    fn test_decrement_to_zero_removes() {
        let mut cart = Cart::new();
        cart.add(product(1, 1000), 2, None).unwrap();

        assert_eq!(cart.decrement(1), 1);
        assert_eq!(cart.decrement(1), 0);
        assert!(cart.is_empty());
        assert_eq!(cart.decrement(1), 0);
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let mut cart = Cart::new();
        assert!(cart.add(product(1, 1000), 0, None).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_line_quantity_is_capped() {
        let mut cart = Cart::new();
        cart.add(product(1, 1000), MAX_LINE_QUANTITY, None).unwrap();
        assert!(matches!(
            cart.add(product(1, 1000), 1, None),
            Err(ClientError::Validation(_))
        ));
        assert!(cart.add(product(2, 300), i32::MAX, None).is_err());
        assert_eq!(cart.total_quantity(), MAX_LINE_QUANTITY);

        cart.set_quantity(1, i32::MAX);
        assert_eq!(cart.get(1).unwrap().quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add(product(1, 1000), 2, None).unwrap();
        assert!(cart.set_quantity(1, 5));
        assert_eq!(cart.total_quantity(), 5);
        assert!(cart.set_quantity(1, 0));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity(9, 3));
    }

    #[test]
    fn test_submission_snapshot() {
        let mut cart = Cart::new();
        cart.add(product(2, 300), 1, None).unwrap();
        cart.add(product(1, 1000), 2, None).unwrap();

        let items = cart.to_submission();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_id, 1);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(cart.estimated_total(), 2300);
    }
}
