// marketplace/src/models/mod.rs

//! Rows of the hosted store's tables, their status state machines and the
//! payloads used to insert them.

pub mod campaign;
pub mod donation;
pub mod food_item;
pub mod order;

pub use campaign::{Campaign, NewCampaign};
pub use donation::{Donation, DonationReceipt, DonationStatus, DonationWithCampaign, NewDonation};
pub use food_item::{FoodItem, NewFoodItem};
pub use order::{NewOrder, Order, OrderStatus, OrderWithItem};
