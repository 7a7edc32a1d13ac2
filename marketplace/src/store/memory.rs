// marketplace/src/store/memory.rs

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{DonationQuery, FoodItemQuery, OrderQuery, RemoteStore};
use crate::errors::{AppError, Result};
use crate::models::{
  Campaign, Donation, DonationReceipt, DonationStatus, DonationWithCampaign, FoodItem, NewCampaign, NewDonation,
  NewFoodItem, NewOrder, Order, OrderStatus, OrderWithItem,
};

#[derive(Debug, Default)]
struct Tables {
  food_items: Vec<FoodItem>,
  campaigns: Vec<Campaign>,
  donations: Vec<Donation>,
  orders: Vec<Order>,
}

/// Process-local tables behind one `RwLock`. Rows are kept in insertion
/// order; reads return them newest first.
///
/// Guards are never held across an `.await`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
  tables: RwLock<Tables>,
  unavailable: AtomicBool,
}

// Newest first. Rows are appended, so reversing insertion order breaks ties
// between equal timestamps the same way.
fn newest_first<T: Clone, K: Ord>(rows: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
  let mut out: Vec<T> = rows.iter().rev().cloned().collect();
  out.sort_by(|a, b| key(b).cmp(&key(a)));
  out
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// A store with a few demo listings and one campaign.
  pub fn seeded(buyer_id: Uuid, seller_id: Uuid) -> Self {
    let store = Self::new();
    let now = Utc::now();
    {
      let mut tables = store.tables.write();
      let listings = [
        ("Sourdough Loaves", "Day-old sourdough from the morning bake", 3.0, 6.5, 12, 1),
        ("Mixed Vegetable Box", "Slightly bruised but perfectly good produce", 5.0, 8.0, 10, 3),
        ("Greek Yogurt Cups", "Close to best-before, kept refrigerated", 0.75, 1.5, 40, 2),
      ];
      for (name, description, price, original_price, quantity, days) in listings {
        tables.food_items.push(FoodItem {
          id: Uuid::new_v4(),
          name: name.to_string(),
          description: description.to_string(),
          price,
          original_price,
          quantity,
          fresh_until: now + ChronoDuration::days(days),
          seller_id,
          created_at: now,
        });
      }
      tables.campaigns.push(Campaign {
        id: Uuid::new_v4(),
        title: "Community Pantry Restock".to_string(),
        description: "Shelf-stable food for the weekend pantry".to_string(),
        item_needed: "meals".to_string(),
        quantity_needed: 50,
        quantity_received: 0,
        buyer_id,
        created_at: now,
      });
    }
    debug!("In-memory store seeded with demo rows.");
    store
  }

  /// Makes every call fail as if the hosted store were down.
  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }

  pub fn order_rows(&self) -> Vec<Order> {
    self.tables.read().orders.clone()
  }

  pub fn donation_rows(&self) -> Vec<Donation> {
    self.tables.read().donations.clone()
  }

  pub fn campaign(&self, id: Uuid) -> Option<Campaign> {
    self.tables.read().campaigns.iter().find(|c| c.id == id).cloned()
  }

  pub fn put_food_item(&self, item: FoodItem) {
    self.tables.write().food_items.push(item);
  }

  /// Overwrites a listing's available quantity, as another buyer or the seller would.
  pub fn set_stock(&self, item_id: Uuid, quantity: i32) -> bool {
    let mut tables = self.tables.write();
    match tables.food_items.iter_mut().find(|i| i.id == item_id) {
      Some(item) => {
        item.quantity = quantity;
        true
      }
      None => false,
    }
  }

  pub fn remove_food_item(&self, item_id: Uuid) -> bool {
    let mut tables = self.tables.write();
    let before = tables.food_items.len();
    tables.food_items.retain(|i| i.id != item_id);
    tables.food_items.len() != before
  }

  pub fn put_campaign(&self, campaign: Campaign) {
    self.tables.write().campaigns.push(campaign);
  }

  pub fn put_order(&self, order: Order) {
    self.tables.write().orders.push(order);
  }

  pub fn put_donation(&self, donation: Donation) {
    self.tables.write().donations.push(donation);
  }

  fn check_available(&self) -> Result<()> {
    if self.unavailable.load(Ordering::SeqCst) {
      return Err(AppError::Remote { status: 503, message: "store unavailable".to_string() });
    }
    Ok(())
  }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
  #[instrument(name = "memory_store::list_food_items", skip(self))]
  async fn list_food_items(&self, query: &FoodItemQuery) -> Result<Vec<FoodItem>> {
    self.check_available()?;
    let tables = self.tables.read();
    let rows: Vec<FoodItem> = tables
      .food_items
      .iter()
      .filter(|i| query.seller_id.map_or(true, |s| i.seller_id == s))
      .cloned()
      .collect();
    Ok(newest_first(&rows, |i| i.created_at))
  }

  #[instrument(name = "memory_store::list_campaigns", skip(self))]
  async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
    self.check_available()?;
    let tables = self.tables.read();
    Ok(newest_first(&tables.campaigns, |c| c.created_at))
  }

  #[instrument(name = "memory_store::list_orders", skip(self))]
  async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<OrderWithItem>> {
    self.check_available()?;
    let tables = self.tables.read();
    let rows: Vec<OrderWithItem> = tables
      .orders
      .iter()
      .filter(|o| query.buyer_id.map_or(true, |b| o.buyer_id == b))
      .filter(|o| query.food_item_ids.as_ref().map_or(true, |ids| ids.contains(&o.food_item_id)))
      .filter(|o| query.statuses.is_empty() || query.statuses.contains(&o.status))
      .filter_map(|o| {
        let food_item = tables.food_items.iter().find(|i| i.id == o.food_item_id)?;
        Some(OrderWithItem { order: o.clone(), food_item: food_item.clone() })
      })
      .collect();
    Ok(newest_first(&rows, |o| o.order.created_at))
  }

  #[instrument(name = "memory_store::list_donations", skip(self))]
  async fn list_donations(&self, query: &DonationQuery) -> Result<Vec<DonationWithCampaign>> {
    self.check_available()?;
    let tables = self.tables.read();
    let rows: Vec<DonationWithCampaign> = tables
      .donations
      .iter()
      .filter(|d| query.seller_id.map_or(true, |s| d.seller_id == s))
      .filter_map(|d| {
        let campaign = tables.campaigns.iter().find(|c| c.id == d.campaign_id)?;
        if query.campaign_buyer_id.map_or(false, |b| campaign.buyer_id != b) {
          return None;
        }
        Some(DonationWithCampaign { donation: d.clone(), campaign: campaign.clone() })
      })
      .collect();
    Ok(newest_first(&rows, |d| d.donation.created_at))
  }

  #[instrument(name = "memory_store::insert_food_item", skip(self, item), fields(name = %item.name))]
  async fn insert_food_item(&self, item: &NewFoodItem) -> Result<FoodItem> {
    self.check_available()?;
    let row = FoodItem {
      id: Uuid::new_v4(),
      name: item.name.clone(),
      description: item.description.clone(),
      price: item.price,
      original_price: item.original_price,
      quantity: item.quantity,
      fresh_until: item.fresh_until,
      seller_id: item.seller_id,
      created_at: Utc::now(),
    };
    self.tables.write().food_items.push(row.clone());
    Ok(row)
  }

  #[instrument(name = "memory_store::insert_campaign", skip(self, campaign), fields(title = %campaign.title))]
  async fn insert_campaign(&self, campaign: &NewCampaign) -> Result<Campaign> {
    self.check_available()?;
    let row = Campaign {
      id: Uuid::new_v4(),
      title: campaign.title.clone(),
      description: campaign.description.clone(),
      item_needed: campaign.item_needed.clone(),
      quantity_needed: campaign.quantity_needed,
      quantity_received: 0,
      buyer_id: campaign.buyer_id,
      created_at: Utc::now(),
    };
    self.tables.write().campaigns.push(row.clone());
    Ok(row)
  }

  #[instrument(name = "memory_store::insert_orders", skip(self, orders), fields(rows = orders.len()))]
  async fn insert_orders(&self, orders: &[NewOrder]) -> Result<Vec<Order>> {
    self.check_available()?;
    let mut tables = self.tables.write();
    // Foreign key check before any row lands, so the batch is all-or-nothing.
    if let Some(missing) = orders.iter().find(|o| !tables.food_items.iter().any(|i| i.id == o.food_item_id)) {
      return Err(AppError::Remote {
        status: 409,
        message: format!("food item {} does not exist", missing.food_item_id),
      });
    }
    let now = Utc::now();
    let rows: Vec<Order> = orders
      .iter()
      .map(|o| Order {
        id: Uuid::new_v4(),
        food_item_id: o.food_item_id,
        buyer_id: o.buyer_id,
        quantity: o.quantity,
        status: o.status,
        created_at: now,
      })
      .collect();
    tables.orders.extend(rows.iter().cloned());
    Ok(rows)
  }

  #[instrument(name = "memory_store::set_order_status", skip(self))]
  async fn set_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order> {
    self.check_available()?;
    let mut tables = self.tables.write();
    let order = tables
      .orders
      .iter_mut()
      .find(|o| o.id == order_id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;
    order.status = status;
    Ok(order.clone())
  }

  #[instrument(name = "memory_store::set_donation_status", skip(self))]
  async fn set_donation_status(&self, donation_id: Uuid, status: DonationStatus) -> Result<Donation> {
    self.check_available()?;
    let mut tables = self.tables.write();
    let donation = tables
      .donations
      .iter_mut()
      .find(|d| d.id == donation_id)
      .ok_or_else(|| AppError::NotFound(format!("Donation {} not found.", donation_id)))?;
    donation.status = status;
    Ok(donation.clone())
  }

  #[instrument(name = "memory_store::donate", skip(self, donation), fields(campaign_id = %donation.campaign_id, quantity = donation.quantity))]
  async fn donate(&self, donation: &NewDonation) -> Result<DonationReceipt> {
    self.check_available()?;
    if donation.quantity < 1 {
      return Err(AppError::Validation("Donation quantity must be at least 1.".to_string()));
    }
    // Single write guard: the check, the insert and the increment are one step.
    let mut tables = self.tables.write();
    let campaign = tables
      .campaigns
      .iter_mut()
      .find(|c| c.id == donation.campaign_id)
      .ok_or_else(|| AppError::NotFound(format!("Campaign {} not found.", donation.campaign_id)))?;
    if donation.quantity > campaign.remaining() {
      return Err(AppError::Conflict(format!(
        "Campaign only needs {} more {}.",
        campaign.remaining(),
        campaign.item_needed
      )));
    }
    campaign.quantity_received += donation.quantity;
    let campaign = campaign.clone();

    let row = Donation {
      id: Uuid::new_v4(),
      campaign_id: donation.campaign_id,
      seller_id: donation.seller_id,
      quantity: donation.quantity,
      status: DonationStatus::Pending,
      created_at: Utc::now(),
    };
    tables.donations.push(row.clone());
    Ok(DonationReceipt { donation: row, campaign })
  }
}
