// marketplace/src/views/seller.rs

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{clamp_quantity, parse_leading_int, surface, CampaignCard};
use crate::errors::{AppError, Result};
use crate::models::{
  Campaign, DonationReceipt, DonationWithCampaign, FoodItem, NewDonation, NewFoodItem, OrderStatus, OrderWithItem,
};
use crate::notification::{Notification, Notifier};
use crate::session::Principal;
use crate::store::{DonationQuery, FoodItemQuery, OrderQuery, RemoteStore};

/// Text fields of the "Add New Food Item" form, exactly as typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FoodItemForm {
  pub name: String,
  pub description: String,
  pub price: String,
  pub original_price: String,
  pub quantity: String,
  /// `datetime-local` value (`2025-03-01T18:30`) or RFC 3339.
  pub fresh_until: String,
}

fn parse_price(label: &str, raw: &str) -> Result<f64> {
  let value = raw
    .trim()
    .parse::<f64>()
    .map_err(|_| AppError::Validation(format!("{} must be a number.", label)))?;
  if !value.is_finite() {
    return Err(AppError::Validation(format!("{} must be a number.", label)));
  }
  if value < 0.0 {
    return Err(AppError::Validation(format!("{} cannot be negative.", label)));
  }
  Ok(value)
}

fn parse_fresh_until(raw: &str) -> Result<DateTime<Utc>> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Ok(dt.with_timezone(&Utc));
  }
  ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .map(|naive| naive.and_utc())
    .ok_or_else(|| AppError::Validation("Fresh until must be a date and time.".to_string()))
}

impl FoodItemForm {
  fn validate(&self, seller_id: Uuid) -> Result<NewFoodItem> {
    if self.name.trim().is_empty() {
      return Err(AppError::Validation("Item name is required.".to_string()));
    }
    if self.description.trim().is_empty() {
      return Err(AppError::Validation("Description is required.".to_string()));
    }
    let price = parse_price("Discounted price", &self.price)?;
    let original_price = parse_price("Original price", &self.original_price)?;
    let quantity = parse_leading_int(&self.quantity)
      .ok_or_else(|| AppError::Validation("Quantity available must be a whole number.".to_string()))?;
    if quantity < 0 {
      return Err(AppError::Validation("Quantity available cannot be negative.".to_string()));
    }
    let quantity = i32::try_from(quantity)
      .map_err(|_| AppError::Validation("Quantity available is too large.".to_string()))?;
    let fresh_until = parse_fresh_until(&self.fresh_until)?;

    if price > original_price {
      warn!(price, original_price, "Discounted price is above the original price.");
    }

    Ok(NewFoodItem {
      name: self.name.trim().to_string(),
      description: self.description.trim().to_string(),
      price,
      original_price,
      quantity,
      fresh_until,
      seller_id,
    })
  }
}

/// Everything the seller dashboard renders.
#[derive(Debug, Clone, Serialize)]
pub struct SellerSnapshot {
  pub principal: Principal,
  pub food_items: Vec<FoodItem>,
  pub campaigns: Vec<CampaignCard>,
  pub orders: Vec<OrderWithItem>,
  pub donations: Vec<DonationWithCampaign>,
  pub notification: Option<Notification>,
}

/// Orders for the seller's listings: own item ids first, then confirmed
/// `cart_items` rows for those ids.
async fn fetch_orders_for_seller(store: &dyn RemoteStore, seller_id: Uuid) -> Result<Vec<OrderWithItem>> {
  let own_items = store.list_food_items(&FoodItemQuery::for_seller(seller_id)).await?;
  if own_items.is_empty() {
    return Ok(Vec::new());
  }
  let query = OrderQuery {
    buyer_id: None,
    food_item_ids: Some(own_items.iter().map(|i| i.id).collect()),
    statuses: vec![OrderStatus::Confirmed],
  };
  store.list_orders(&query).await
}

/// Seller dashboard controller.
pub struct SellerView {
  principal: Principal,
  store: Arc<dyn RemoteStore>,
  food_items: Vec<FoodItem>,
  campaigns: Vec<Campaign>,
  orders: Vec<OrderWithItem>,
  donations: Vec<DonationWithCampaign>,
  donation_quantities: HashMap<Uuid, i32>,
  notifier: Notifier,
  mounted: bool,
}

impl SellerView {
  pub fn new(principal: Principal, store: Arc<dyn RemoteStore>, notification_duration: Duration) -> Self {
    Self {
      principal,
      store,
      food_items: Vec::new(),
      campaigns: Vec::new(),
      orders: Vec::new(),
      donations: Vec::new(),
      donation_quantities: HashMap::new(),
      notifier: Notifier::new(notification_duration),
      mounted: false,
    }
  }

  fn seller_id(&self) -> Uuid {
    self.principal.user_id
  }

  #[instrument(name = "seller_view::mount", skip(self), fields(seller_id = %self.principal.user_id))]
  pub async fn mount(&mut self) -> Result<()> {
    let store = Arc::clone(&self.store);
    let seller_id = self.seller_id();
    let items_q = FoodItemQuery::for_seller(seller_id);
    let donations_q = DonationQuery { seller_id: Some(seller_id), campaign_buyer_id: None };
    let (campaigns, items, orders, donations) = futures_util::join!(
      store.list_campaigns(),
      store.list_food_items(&items_q),
      fetch_orders_for_seller(store.as_ref(), seller_id),
      store.list_donations(&donations_q)
    );

    let outcomes = [
      self.apply_campaigns(campaigns),
      self.apply_food_items(items),
      self.apply_orders(orders),
      self.apply_donations(donations),
    ];
    outcomes.into_iter().collect::<Result<Vec<()>>>()?;
    self.mounted = true;
    info!(
      items = self.food_items.len(),
      campaigns = self.campaigns.len(),
      orders = self.orders.len(),
      donations = self.donations.len(),
      "Seller dashboard mounted."
    );
    Ok(())
  }

  fn apply_campaigns(&mut self, result: Result<Vec<Campaign>>) -> Result<()> {
    let campaigns = surface(&mut self.notifier, "Could not load campaigns", result)?;
    self.donation_quantities = campaigns.iter().map(|c| (c.id, 1)).collect();
    self.campaigns = campaigns;
    Ok(())
  }

  fn apply_food_items(&mut self, result: Result<Vec<FoodItem>>) -> Result<()> {
    self.food_items = surface(&mut self.notifier, "Could not load your food items", result)?;
    Ok(())
  }

  fn apply_orders(&mut self, result: Result<Vec<OrderWithItem>>) -> Result<()> {
    self.orders = surface(&mut self.notifier, "Could not load orders", result)?;
    Ok(())
  }

  fn apply_donations(&mut self, result: Result<Vec<DonationWithCampaign>>) -> Result<()> {
    self.donations = surface(&mut self.notifier, "Could not load your donations", result)?;
    Ok(())
  }

  pub async fn refresh_food_items(&mut self) -> Result<()> {
    let result = self.store.list_food_items(&FoodItemQuery::for_seller(self.seller_id())).await;
    self.apply_food_items(result)
  }

  pub async fn refresh_campaigns(&mut self) -> Result<()> {
    let result = self.store.list_campaigns().await;
    self.apply_campaigns(result)
  }

  pub async fn refresh_orders(&mut self) -> Result<()> {
    let result = fetch_orders_for_seller(self.store.as_ref(), self.seller_id()).await;
    self.apply_orders(result)
  }

  pub async fn refresh_donations(&mut self) -> Result<()> {
    let query = DonationQuery { seller_id: Some(self.seller_id()), campaign_buyer_id: None };
    let result = self.store.list_donations(&query).await;
    self.apply_donations(result)
  }

  // --- Listings ---

  #[instrument(name = "seller_view::add_food_item", skip(self, form), fields(name = %form.name))]
  pub async fn add_food_item(&mut self, form: &FoodItemForm) -> Result<FoodItem> {
    let validated = form.validate(self.seller_id());
    let new_item = surface(&mut self.notifier, "Could not add food item", validated)?;

    let result = self.store.insert_food_item(&new_item).await;
    let item = surface(&mut self.notifier, "Could not add food item", result)?;
    info!(item_id = %item.id, "Food item listed.");
    self.notifier.success("Food item added successfully");
    if let Err(e) = self.refresh_food_items().await {
      warn!(error = %e, "Item stored but the listing could not be reloaded.");
    }
    Ok(item)
  }

  pub fn is_own_item(&self, item: &FoodItem) -> bool {
    item.seller_id == self.seller_id()
  }

  // --- Donations ---

  fn find_campaign(&self, campaign_id: Uuid) -> Result<&Campaign> {
    self
      .campaigns
      .iter()
      .find(|c| c.id == campaign_id)
      .ok_or_else(|| AppError::NotFound(format!("Campaign {} not found.", campaign_id)))
  }

  fn open_campaign(&self, campaign_id: Uuid) -> Result<&Campaign> {
    let campaign = self.find_campaign(campaign_id)?;
    if !campaign.accepts_donations() {
      return Err(AppError::Conflict(format!("{} is already fully funded.", campaign.title)));
    }
    Ok(campaign)
  }

  pub fn donation_quantity(&self, campaign_id: Uuid) -> i32 {
    self.donation_quantities.get(&campaign_id).copied().unwrap_or(1)
  }

  /// Sets the donation selector from raw form input, clamped to what the
  /// campaign still needs.
  pub fn set_donation_quantity(&mut self, campaign_id: Uuid, raw: &str) -> Result<i32> {
    let result = self.open_campaign(campaign_id).map(|c| clamp_quantity(raw, c.remaining()));
    let quantity = surface(&mut self.notifier, "Could not set donation quantity", result)?;
    self.donation_quantities.insert(campaign_id, quantity);
    Ok(quantity)
  }

  /// Donates the selected quantity. The donation row and the campaign
  /// increment are written by one atomic store call.
  #[instrument(name = "seller_view::donate", skip(self), fields(seller_id = %self.principal.user_id))]
  pub async fn donate(&mut self, campaign_id: Uuid) -> Result<DonationReceipt> {
    let checked = self.open_campaign(campaign_id).map(|c| c.remaining());
    let remaining = surface(&mut self.notifier, "Could not donate", checked)?;
    let quantity = self.donation_quantity(campaign_id).clamp(1, remaining);

    let donation = NewDonation { campaign_id, seller_id: self.seller_id(), quantity };
    let result = self.store.donate(&donation).await;
    let receipt = surface(&mut self.notifier, "Could not donate", result)?;

    info!(
      donation_id = %receipt.donation.id,
      quantity,
      received = receipt.campaign.quantity_received,
      "Donation recorded."
    );
    self.notifier.success(format!("Donated {} items successfully", quantity));

    let (campaigns, donations) = futures_util::join!(self.store.list_campaigns(), async {
      let query = DonationQuery { seller_id: Some(donation.seller_id), campaign_buyer_id: None };
      self.store.list_donations(&query).await
    });
    for outcome in [self.apply_campaigns(campaigns), self.apply_donations(donations)] {
      if let Err(e) = outcome {
        warn!(error = %e, "Donation stored but a list could not be reloaded.");
      }
    }
    Ok(receipt)
  }

  // --- Read access ---

  /// Whether a full mount has succeeded at least once.
  pub fn is_mounted(&self) -> bool {
    self.mounted
  }

  pub fn principal(&self) -> Principal {
    self.principal
  }

  pub fn food_items(&self) -> &[FoodItem] {
    &self.food_items
  }

  pub fn campaigns(&self) -> &[Campaign] {
    &self.campaigns
  }

  pub fn orders(&self) -> &[OrderWithItem] {
    &self.orders
  }

  pub fn donations(&self) -> &[DonationWithCampaign] {
    &self.donations
  }

  pub fn notification(&self) -> Option<&Notification> {
    self.notifier.current()
  }

  pub fn dismiss_notification(&mut self, seq: u64) -> bool {
    self.notifier.dismiss(seq)
  }

  pub fn snapshot(&self) -> SellerSnapshot {
    SellerSnapshot {
      principal: self.principal,
      food_items: self.food_items.clone(),
      campaigns: self
        .campaigns
        .iter()
        .map(|c| {
          let selected = c.accepts_donations().then(|| self.donation_quantity(c.id));
          CampaignCard::new(c, false, selected)
        })
        .collect(),
      orders: self.orders.clone(),
      donations: self.donations.clone(),
      notification: self.notification().cloned(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Datelike, Timelike};

  fn form() -> FoodItemForm {
    FoodItemForm {
      name: "Bagels".to_string(),
      description: "Half dozen, baked yesterday".to_string(),
      price: "5.00".to_string(),
      original_price: "8".to_string(),
      quantity: "10".to_string(),
      fresh_until: "2025-03-01T18:30".to_string(),
    }
  }

  #[test]
  fn food_item_form_parses_numeric_text_fields() {
    let seller = Uuid::new_v4();
    let item = form().validate(seller).unwrap();
    assert_eq!(item.price, 5.0);
    assert_eq!(item.original_price, 8.0);
    assert_eq!(item.quantity, 10);
    assert_eq!(item.seller_id, seller);
    assert_eq!((item.fresh_until.day(), item.fresh_until.hour(), item.fresh_until.minute()), (1, 18, 30));
  }

  #[test]
  fn food_item_form_rejects_unparseable_or_negative_values() {
    let seller = Uuid::new_v4();
    let mut bad_price = form();
    bad_price.price = "five".to_string();
    assert!(matches!(bad_price.validate(seller), Err(AppError::Validation(_))));

    let mut negative_quantity = form();
    negative_quantity.quantity = "-1".to_string();
    assert!(matches!(negative_quantity.validate(seller), Err(AppError::Validation(_))));

    let mut bad_date = form();
    bad_date.fresh_until = "tomorrow".to_string();
    assert!(matches!(bad_date.validate(seller), Err(AppError::Validation(_))));
  }

  #[test]
  fn quantity_reads_leading_digits_like_other_forms() {
    let seller = Uuid::new_v4();
    let mut with_unit = form();
    with_unit.quantity = "3kg".to_string();
    assert_eq!(with_unit.validate(seller).unwrap().quantity, 3);

    let mut huge = form();
    huge.quantity = "99999999999".to_string();
    assert!(matches!(huge.validate(seller), Err(AppError::Validation(_))));
  }

  #[test]
  fn non_finite_prices_are_not_numbers() {
    for raw in ["NaN", "inf", "-inf"] {
      match parse_price("Discounted price", raw) {
        Err(AppError::Validation(m)) => assert_eq!(m, "Discounted price must be a number."),
        other => panic!("expected Validation for {:?}, got {:?}", raw, other),
      }
    }
    match parse_price("Original price", "-2") {
      Err(AppError::Validation(m)) => assert_eq!(m, "Original price cannot be negative."),
      other => panic!("expected Validation, got {:?}", other),
    }
  }

  #[test]
  fn fresh_until_accepts_rfc3339() {
    let parsed = parse_fresh_until("2025-03-01T18:30:00+02:00").unwrap();
    assert_eq!(parsed.hour(), 16);
  }
}
