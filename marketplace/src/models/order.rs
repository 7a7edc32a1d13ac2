// marketplace/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

use super::FoodItem;

/// Lifecycle of a `cart_items` row: `pending → confirmed → received`.
/// Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Received,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::Received => "received",
    }
  }

  fn rank(&self) -> u8 {
    match self {
      OrderStatus::Pending => 0,
      OrderStatus::Confirmed => 1,
      OrderStatus::Received => 2,
    }
  }

  /// One step forward, or staying put (idempotent re-application).
  pub fn can_advance_to(&self, next: OrderStatus) -> bool {
    next.rank() == self.rank() || next.rank() == self.rank() + 1
  }
}

/// A buyer's reservation of a food item (`cart_items` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub food_item_id: Uuid,
  pub buyer_id: Uuid,
  pub quantity: i32,
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
}

/// An order with its food item embedded, as `food_item:food_items(*)` returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWithItem {
  #[serde(flatten)]
  pub order: Order,
  pub food_item: FoodItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
  pub food_item_id: Uuid,
  pub buyer_id: Uuid,
  pub quantity: i32,
  pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn order_status_only_moves_forward_one_step() {
    assert!(OrderStatus::Pending.can_advance_to(OrderStatus::Confirmed));
    assert!(OrderStatus::Confirmed.can_advance_to(OrderStatus::Received));
    assert!(OrderStatus::Received.can_advance_to(OrderStatus::Received));

    assert!(!OrderStatus::Pending.can_advance_to(OrderStatus::Received));
    assert!(!OrderStatus::Received.can_advance_to(OrderStatus::Confirmed));
    assert!(!OrderStatus::Confirmed.can_advance_to(OrderStatus::Pending));
  }

  #[test]
  fn embedded_food_item_deserializes_next_to_flattened_order() {
    let body = serde_json::json!({
      "id": "6f1c2f0e-4d6b-4b7a-9a59-3c1f0d1e2a01",
      "food_item_id": "0b7d1a52-2f7c-4a8e-8d9e-5e2f6a7b8c02",
      "buyer_id": "1c2d3e4f-5a6b-4c7d-8e9f-0a1b2c3d4e03",
      "quantity": 3,
      "status": "confirmed",
      "created_at": "2025-03-01T10:00:00+00:00",
      "food_item": {
        "id": "0b7d1a52-2f7c-4a8e-8d9e-5e2f6a7b8c02",
        "name": "Bagels",
        "description": "Half dozen",
        "price": 5.0,
        "original_price": 8.0,
        "quantity": 10,
        "fresh_until": "2025-03-02T10:00:00+00:00",
        "seller_id": "2d3e4f5a-6b7c-4d8e-9f0a-1b2c3d4e5f04",
        "created_at": "2025-03-01T09:00:00+00:00"
      }
    });
    let parsed: OrderWithItem = serde_json::from_value(body).unwrap();
    assert_eq!(parsed.order.status, OrderStatus::Confirmed);
    assert_eq!(parsed.order.quantity, 3);
    assert_eq!(parsed.food_item.name, "Bagels");
  }
}
