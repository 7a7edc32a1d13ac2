// tests/seller_view_tests.rs
mod common;
use common::*;
use feeding_marketplace::errors::AppError;
use feeding_marketplace::models::OrderStatus;
use feeding_marketplace::notification::Level;
use feeding_marketplace::store::RemoteStore;
use feeding_marketplace::views::FoodItemForm;
use uuid::Uuid;

fn bread_form() -> FoodItemForm {
  FoodItemForm {
    name: "Rye Bread".to_string(),
    description: "Two loaves from this morning".to_string(),
    price: "2.50".to_string(),
    original_price: "4.00".to_string(),
    quantity: "6".to_string(),
    fresh_until: "2025-03-02T18:00".to_string(),
  }
}

#[tokio::test]
async fn test_add_food_item_lists_it_for_the_seller() {
  let fx = Fixture::new();
  let mut view = fx.seller_view();
  view.mount().await.unwrap();

  let item = view.add_food_item(&bread_form()).await.unwrap();
  assert_eq!(item.seller_id, fx.seller.user_id);
  assert_eq!(item.price, 2.5);
  assert_eq!(item.quantity, 6);
  assert_eq!(view.food_items().len(), 1);
  assert!(view.is_own_item(&view.food_items()[0]));
  assert_eq!(view.notification().unwrap().message, "Food item added successfully");
}

#[tokio::test]
async fn test_add_food_item_rejects_bad_numbers() {
  let fx = Fixture::new();
  let mut view = fx.seller_view();
  view.mount().await.unwrap();

  let mut form = bread_form();
  form.price = "-1".to_string();
  assert!(matches!(view.add_food_item(&form).await, Err(AppError::Validation(_))));
  assert_eq!(view.notification().unwrap().level, Level::Error);
  assert!(view.food_items().is_empty());
}

#[tokio::test]
async fn test_seller_only_sees_own_listings() {
  let fx = Fixture::new();
  fx.list_bagels();
  fx.store.put_food_item(food_item(Uuid::new_v4(), "Someone else's", 1.0, 3, 2));
  let mut view = fx.seller_view();
  view.mount().await.unwrap();

  assert_eq!(view.food_items().len(), 1);
  assert_eq!(view.food_items()[0].name, "Bagels");
}

#[tokio::test]
async fn test_orders_are_confirmed_orders_for_own_items() {
  let fx = Fixture::new();
  let bagels = fx.list_bagels();
  let foreign = food_item(Uuid::new_v4(), "Muffins", 1.0, 3, 2);
  fx.store.put_food_item(foreign.clone());

  let buyer = Uuid::new_v4();
  fx.store.put_order(order(&bagels, buyer, 2, OrderStatus::Confirmed, 3));
  fx.store.put_order(order(&bagels, buyer, 1, OrderStatus::Received, 4));
  fx.store.put_order(order(&foreign, buyer, 5, OrderStatus::Confirmed, 5));

  let mut view = fx.seller_view();
  view.mount().await.unwrap();

  assert_eq!(view.orders().len(), 1);
  assert_eq!(view.orders()[0].order.quantity, 2);
  assert_eq!(view.orders()[0].food_item.id, bagels.id);
}

#[tokio::test]
async fn test_seller_without_listings_has_no_orders() {
  let fx = Fixture::new();
  let foreign = food_item(Uuid::new_v4(), "Muffins", 1.0, 3, 2);
  fx.store.put_food_item(foreign.clone());
  fx.store.put_order(order(&foreign, Uuid::new_v4(), 5, OrderStatus::Confirmed, 5));

  let mut view = fx.seller_view();
  view.mount().await.unwrap();
  assert!(view.orders().is_empty());
}

#[tokio::test]
async fn test_donation_updates_campaign_atomically() {
  let fx = Fixture::new();
  let c = fx.open_campaign(10, 4);
  let mut view = fx.seller_view();
  view.mount().await.unwrap();

  assert_eq!(view.set_donation_quantity(c.id, "3").unwrap(), 3);
  let receipt = view.donate(c.id).await.unwrap();

  assert_eq!(receipt.donation.quantity, 3);
  assert_eq!(receipt.campaign.quantity_received, 7);
  assert_eq!(fx.store.campaign(c.id).unwrap().quantity_received, 7);
  assert_eq!(fx.store.donation_rows().len(), 1);
  assert_eq!(view.donations().len(), 1, "donations are reloaded");
  assert_eq!(view.campaigns()[0].quantity_received, 7, "campaigns are reloaded");
  assert_eq!(view.notification().unwrap().message, "Donated 3 items successfully");
}

#[tokio::test]
async fn test_donation_quantity_clamps_to_remaining() {
  let fx = Fixture::new();
  let c = fx.open_campaign(10, 7);
  let mut view = fx.seller_view();
  view.mount().await.unwrap();

  assert_eq!(view.donation_quantity(c.id), 1);
  assert_eq!(view.set_donation_quantity(c.id, "50").unwrap(), 3);
  assert_eq!(view.set_donation_quantity(c.id, "0").unwrap(), 1);
  assert_eq!(view.set_donation_quantity(c.id, "x").unwrap(), 1);
}

#[tokio::test]
async fn test_fully_funded_campaign_rejects_donations() {
  let fx = Fixture::new();
  let c = fx.open_campaign(5, 5);
  let mut view = fx.seller_view();
  view.mount().await.unwrap();

  assert!(matches!(view.set_donation_quantity(c.id, "1"), Err(AppError::Conflict(_))));
  assert!(matches!(view.donate(c.id).await, Err(AppError::Conflict(_))));
  assert!(fx.store.donation_rows().is_empty());

  let card = view.snapshot().campaigns.into_iter().find(|card| card.campaign.id == c.id).unwrap();
  assert_eq!(card.selected_quantity, None);
  assert_eq!(card.remaining, 0);
}

#[tokio::test]
async fn test_over_donation_leaves_no_row() {
  let fx = Fixture::new();
  let c = fx.open_campaign(10, 8);
  let mut view = fx.seller_view();
  view.mount().await.unwrap();
  view.set_donation_quantity(c.id, "2").unwrap();

  // Another seller takes the last units before this one submits.
  let other = feeding_marketplace::models::NewDonation { campaign_id: c.id, seller_id: Uuid::new_v4(), quantity: 2 };
  fx.remote().donate(&other).await.unwrap();

  let err = view.donate(c.id).await.unwrap_err();
  assert!(matches!(err, AppError::Conflict(_)));
  assert_eq!(fx.store.donation_rows().len(), 1);
  assert_eq!(fx.store.campaign(c.id).unwrap().quantity_received, 10);
  assert_eq!(view.notification().unwrap().level, Level::Error);
}

#[tokio::test]
async fn test_progress_is_not_computed_without_target() {
  let fx = Fixture::new();
  let empty = fx.open_campaign(0, 0);
  let half = campaign(fx.buyer.user_id, "Half", 10, 5, 3);
  fx.store.put_campaign(half.clone());
  let mut view = fx.seller_view();
  view.mount().await.unwrap();

  let snapshot = view.snapshot();
  let empty_card = snapshot.campaigns.iter().find(|card| card.campaign.id == empty.id).unwrap();
  let half_card = snapshot.campaigns.iter().find(|card| card.campaign.id == half.id).unwrap();
  assert_eq!(empty_card.progress, None);
  assert_eq!(half_card.progress, Some(0.5));
}

#[tokio::test]
async fn test_store_failure_surfaces_on_seller_dashboard() {
  let fx = Fixture::new();
  fx.store.set_unavailable(true);
  let mut view = fx.seller_view();

  let err = view.mount().await.unwrap_err();
  assert!(matches!(err, AppError::Remote { status: 503, .. }));
  assert_eq!(view.notification().unwrap().level, Level::Error);
  assert!(!view.is_mounted());
}
