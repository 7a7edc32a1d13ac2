// tests/common/mod.rs
#![allow(dead_code)] // Not every test file uses every fixture

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use feeding_marketplace::models::{Campaign, Donation, DonationStatus, FoodItem, Order, OrderStatus};
use feeding_marketplace::session::Principal;
use feeding_marketplace::store::memory::InMemoryStore;
use feeding_marketplace::store::RemoteStore;
use feeding_marketplace::views::{BuyerView, SellerView};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub const NOTIFICATION_DURATION: Duration = Duration::from_millis(3000);

/// `minutes` after a fixed base time, so list order is predictable.
pub fn at(minutes: i64) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
    .expect("valid base timestamp")
    .with_timezone(&Utc)
    + ChronoDuration::minutes(minutes)
}

pub fn food_item(seller_id: Uuid, name: &str, price: f64, quantity: i32, created_minute: i64) -> FoodItem {
  FoodItem {
    id: Uuid::new_v4(),
    name: name.to_string(),
    description: format!("{} from the test bakery", name),
    price,
    original_price: price * 1.6,
    quantity,
    fresh_until: at(60 * 24),
    seller_id,
    created_at: at(created_minute),
  }
}

pub fn campaign(buyer_id: Uuid, title: &str, needed: i32, received: i32, created_minute: i64) -> Campaign {
  Campaign {
    id: Uuid::new_v4(),
    title: title.to_string(),
    description: format!("{} for the shelter", title),
    item_needed: "meals".to_string(),
    quantity_needed: needed,
    quantity_received: received,
    buyer_id,
    created_at: at(created_minute),
  }
}

pub fn order(item: &FoodItem, buyer_id: Uuid, quantity: i32, status: OrderStatus, created_minute: i64) -> Order {
  Order {
    id: Uuid::new_v4(),
    food_item_id: item.id,
    buyer_id,
    quantity,
    status,
    created_at: at(created_minute),
  }
}

pub fn donation(campaign: &Campaign, seller_id: Uuid, quantity: i32, created_minute: i64) -> Donation {
  Donation {
    id: Uuid::new_v4(),
    campaign_id: campaign.id,
    seller_id,
    quantity,
    status: DonationStatus::Pending,
    created_at: at(created_minute),
  }
}

/// An empty in-memory store plus one buyer and one seller.
pub struct Fixture {
  pub store: Arc<InMemoryStore>,
  pub buyer: Principal,
  pub seller: Principal,
}

impl Fixture {
  pub fn new() -> Self {
    setup_tracing();
    Self {
      store: Arc::new(InMemoryStore::new()),
      buyer: Principal::buyer(Uuid::new_v4()),
      seller: Principal::seller(Uuid::new_v4()),
    }
  }

  pub fn remote(&self) -> Arc<dyn RemoteStore> {
    self.store.clone()
  }

  /// The example listing: $5.00 (was $8.00), 10 available.
  pub fn list_bagels(&self) -> FoodItem {
    let mut item = food_item(self.seller.user_id, "Bagels", 5.0, 10, 0);
    item.original_price = 8.0;
    self.store.put_food_item(item.clone());
    item
  }

  pub fn open_campaign(&self, needed: i32, received: i32) -> Campaign {
    let c = campaign(self.buyer.user_id, "Weekend Meals", needed, received, 0);
    self.store.put_campaign(c.clone());
    c
  }

  pub fn buyer_view(&self) -> BuyerView {
    BuyerView::new(self.buyer, self.remote(), NOTIFICATION_DURATION)
  }

  pub fn seller_view(&self) -> SellerView {
    SellerView::new(self.seller, self.remote(), NOTIFICATION_DURATION)
  }
}
