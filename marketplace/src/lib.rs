// marketplace/src/lib.rs

//! Surplus-food marketplace: sellers list discounted food and donate to
//! buyer-run campaigns, buyers reserve items through a cart and track
//! orders and donations.

pub mod config;
pub mod errors;
pub mod models;
pub mod notification;
pub mod session;
pub mod state;
pub mod store;
pub mod views;
pub mod web;
