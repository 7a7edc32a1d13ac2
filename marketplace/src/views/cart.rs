// marketplace/src/views/cart.rs

use serde::Serialize;
use uuid::Uuid;

use crate::models::FoodItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartLine {
  pub item_id: Uuid,
  pub quantity: i32,
}

/// Local, unpersisted cart keyed by food item id. Lines keep the order in
/// which items were first added.
#[derive(Debug, Clone, Default)]
pub struct Cart {
  lines: Vec<CartLine>,
}

impl Cart {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds `quantity` to the item's line, keeping the line within `[1, max]`.
  /// Returns the line's new quantity.
  pub fn add(&mut self, item_id: Uuid, quantity: i32, max: i32) -> i32 {
    let upper = max.max(1);
    match self.lines.iter_mut().find(|l| l.item_id == item_id) {
      Some(line) => {
        line.quantity = line.quantity.saturating_add(quantity).clamp(1, upper);
        line.quantity
      }
      None => {
        let quantity = quantity.clamp(1, upper);
        self.lines.push(CartLine { item_id, quantity });
        quantity
      }
    }
  }

  /// Overwrites the quantity of an existing line. `false` if the item is not in the cart.
  pub fn set(&mut self, item_id: Uuid, quantity: i32) -> bool {
    match self.lines.iter_mut().find(|l| l.item_id == item_id) {
      Some(line) => {
        line.quantity = quantity.max(1);
        true
      }
      None => false,
    }
  }

  pub fn remove(&mut self, item_id: Uuid) -> bool {
    let before = self.lines.len();
    self.lines.retain(|l| l.item_id != item_id);
    self.lines.len() != before
  }

  pub fn clear(&mut self) {
    self.lines.clear();
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  pub fn contains(&self, item_id: Uuid) -> bool {
    self.lines.iter().any(|l| l.item_id == item_id)
  }

  pub fn quantity_of(&self, item_id: Uuid) -> Option<i32> {
    self.lines.iter().find(|l| l.item_id == item_id).map(|l| l.quantity)
  }

  /// Re-checks every line against freshly loaded listings. Lines whose item
  /// is gone or sold out are dropped; the rest are clamped to current stock.
  /// Returns the number of lines that were dropped or changed.
  pub fn reconcile(&mut self, items: &[FoodItem]) -> usize {
    let before = self.lines.len();
    let mut clamped = 0;
    self.lines.retain_mut(|line| match items.iter().find(|i| i.id == line.item_id) {
      Some(item) if !item.is_sold_out() => {
        let quantity = line.quantity.clamp(1, item.quantity);
        if quantity != line.quantity {
          line.quantity = quantity;
          clamped += 1;
        }
        true
      }
      _ => false,
    });
    clamped + (before - self.lines.len())
  }

  pub fn lines(&self) -> &[CartLine] {
    &self.lines
  }

  /// Total number of units, shown on the cart badge.
  pub fn count(&self) -> i32 {
    self.lines.iter().map(|l| l.quantity).sum()
  }

  /// Σ price × quantity. Lines whose item is no longer listed contribute nothing.
  pub fn total(&self, items: &[FoodItem]) -> f64 {
    self
      .lines
      .iter()
      .filter_map(|line| {
        let item = items.iter().find(|i| i.id == line.item_id)?;
        Some(item.price * f64::from(line.quantity))
      })
      .sum()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn item(price: f64, quantity: i32) -> FoodItem {
    FoodItem {
      id: Uuid::new_v4(),
      name: "Bagels".to_string(),
      description: "Half dozen".to_string(),
      price,
      original_price: price * 2.0,
      quantity,
      fresh_until: Utc::now(),
      seller_id: Uuid::new_v4(),
      created_at: Utc::now(),
    }
  }

  #[test]
  fn adding_accumulates_up_to_available_stock() {
    let mut cart = Cart::new();
    let id = Uuid::new_v4();
    assert_eq!(cart.add(id, 3, 10), 3);
    assert_eq!(cart.add(id, 4, 10), 7);
    assert_eq!(cart.add(id, 9, 10), 10);
    assert_eq!(cart.lines().len(), 1);
    assert_eq!(cart.count(), 10);
  }

  #[test]
  fn total_follows_quantity_changes() {
    let bagels = item(5.0, 10);
    let milk = item(1.25, 4);
    let items = vec![bagels.clone(), milk.clone()];

    let mut cart = Cart::new();
    cart.add(bagels.id, 3, bagels.quantity);
    assert_eq!(cart.total(&items), 15.0);

    cart.add(milk.id, 2, milk.quantity);
    assert_eq!(cart.total(&items), 17.5);

    cart.set(bagels.id, 1);
    assert_eq!(cart.total(&items), 7.5);

    // An item that disappeared from the listing no longer counts.
    assert_eq!(cart.total(&items[1..]), 2.5);
  }

  #[test]
  fn reconcile_follows_refreshed_stock() {
    let bagels = item(5.0, 10);
    let milk = item(1.25, 4);
    let mut cart = Cart::new();
    cart.add(bagels.id, 10, bagels.quantity);
    cart.add(milk.id, 2, milk.quantity);
    let gone = Uuid::new_v4();
    cart.add(gone, 1, 1);

    let mut low_bagels = bagels.clone();
    low_bagels.quantity = 2;
    assert_eq!(cart.reconcile(&[low_bagels.clone(), milk.clone()]), 2);
    assert_eq!(cart.quantity_of(bagels.id), Some(2));
    assert_eq!(cart.quantity_of(milk.id), Some(2));
    assert!(!cart.contains(gone));

    // Nothing to do the second time.
    assert_eq!(cart.reconcile(&[low_bagels.clone(), milk.clone()]), 0);

    let mut sold_out = low_bagels;
    sold_out.quantity = 0;
    assert_eq!(cart.reconcile(&[sold_out, milk]), 1);
    assert!(!cart.contains(bagels.id));
  }

  #[test]
  fn set_and_remove_only_touch_existing_lines() {
    let mut cart = Cart::new();
    let id = Uuid::new_v4();
    assert!(!cart.set(id, 2));
    cart.add(id, 1, 5);
    assert!(cart.set(id, 4));
    assert_eq!(cart.quantity_of(id), Some(4));
    assert!(cart.remove(id));
    assert!(cart.is_empty());
  }
}
