// marketplace/src/models/food_item.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A seller's discounted surplus listing (`food_items` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FoodItem {
  pub id: Uuid,
  pub name: String,
  pub description: String,
  pub price: f64,
  pub original_price: f64,
  pub quantity: i32,
  pub fresh_until: DateTime<Utc>,
  pub seller_id: Uuid,
  pub created_at: DateTime<Utc>,
}

impl FoodItem {
  /// Case-insensitive substring match over name or description.
  pub fn matches_search(&self, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
      return true;
    }
    self.name.to_lowercase().contains(&needle) || self.description.to_lowercase().contains(&needle)
  }

  pub fn is_sold_out(&self) -> bool {
    self.quantity < 1
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFoodItem {
  pub name: String,
  pub description: String,
  pub price: f64,
  pub original_price: f64,
  pub quantity: i32,
  pub fresh_until: DateTime<Utc>,
  pub seller_id: Uuid,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(name: &str, description: &str) -> FoodItem {
    FoodItem {
      id: Uuid::new_v4(),
      name: name.to_string(),
      description: description.to_string(),
      price: 5.0,
      original_price: 8.0,
      quantity: 10,
      fresh_until: Utc::now(),
      seller_id: Uuid::new_v4(),
      created_at: Utc::now(),
    }
  }

  #[test]
  fn search_is_case_insensitive_over_name_and_description() {
    let bread = item("Sourdough Loaf", "Baked this morning");
    assert!(bread.matches_search("sourDOUGH"));
    assert!(bread.matches_search("MORNING"));
    assert!(bread.matches_search(""));
    assert!(!bread.matches_search("bagel"));
  }
}
