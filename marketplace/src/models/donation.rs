// marketplace/src/models/donation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

use super::Campaign;

/// Lifecycle of a `campaign_donations` row: `pending → received`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
  Pending,
  Received,
}

impl DonationStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      DonationStatus::Pending => "pending",
      DonationStatus::Received => "received",
    }
  }

  pub fn can_advance_to(&self, next: DonationStatus) -> bool {
    !matches!((self, next), (DonationStatus::Received, DonationStatus::Pending))
  }
}

/// A seller's contribution toward a campaign (`campaign_donations` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Donation {
  pub id: Uuid,
  pub campaign_id: Uuid,
  pub seller_id: Uuid,
  pub quantity: i32,
  pub status: DonationStatus,
  pub created_at: DateTime<Utc>,
}

/// A donation with its campaign embedded, as `campaign:campaigns(*)` returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationWithCampaign {
  #[serde(flatten)]
  pub donation: Donation,
  pub campaign: Campaign,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDonation {
  pub campaign_id: Uuid,
  pub seller_id: Uuid,
  pub quantity: i32,
}

/// Result of the atomic donate operation: the inserted donation and the
/// campaign with its incremented `quantity_received`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationReceipt {
  pub donation: Donation,
  pub campaign: Campaign,
}
