// marketplace/src/models/campaign.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A buyer's request for a quantity of some needed item (`campaigns` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Campaign {
  pub id: Uuid,
  pub title: String,
  pub description: String,
  pub item_needed: String,
  pub quantity_needed: i32,
  pub quantity_received: i32,
  pub buyer_id: Uuid,
  pub created_at: DateTime<Utc>,
}

impl Campaign {
  /// How much more the campaign can accept. Never negative.
  pub fn remaining(&self) -> i32 {
    (self.quantity_needed - self.quantity_received).max(0)
  }

  pub fn accepts_donations(&self) -> bool {
    self.remaining() > 0
  }

  /// `quantity_received / quantity_needed`, or `None` when nothing is needed.
  pub fn progress_fraction(&self) -> Option<f64> {
    if self.quantity_needed <= 0 {
      return None;
    }
    Some(self.quantity_received as f64 / self.quantity_needed as f64)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCampaign {
  pub title: String,
  pub description: String,
  pub item_needed: String,
  pub quantity_needed: i32,
  pub buyer_id: Uuid,
}
