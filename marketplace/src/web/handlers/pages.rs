// marketplace/src/web/handlers/pages.rs

//! Server-rendered dashboards. Every page load re-mounts the principal's
//! view, so the page always reflects the store. Mutations go through the
//! JSON API under `/api/v1`.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::fmt::Write as _;
use tracing::warn;

use crate::errors::AppError;
use crate::notification::{Level, Notification};
use crate::state::AppState;
use crate::views::{BuyerSnapshot, SellerSnapshot};
use crate::web::extractors::{BuyerSession, SellerSession};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
  #[default]
  Items,
  Campaigns,
  Orders,
  Donations,
}

impl Tab {
  const ALL: [Tab; 4] = [Tab::Items, Tab::Campaigns, Tab::Orders, Tab::Donations];

  fn slug(self) -> &'static str {
    match self {
      Tab::Items => "items",
      Tab::Campaigns => "campaigns",
      Tab::Orders => "orders",
      Tab::Donations => "donations",
    }
  }

  fn label(self) -> &'static str {
    match self {
      Tab::Items => "Food Items",
      Tab::Campaigns => "Campaigns",
      Tab::Orders => "Orders",
      Tab::Donations => "Donations",
    }
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
  #[serde(default)]
  pub tab: Tab,
  pub q: Option<String>,
}

pub fn escape_html(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for c in raw.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      other => out.push(other),
    }
  }
  out
}

fn layout(title: &str, body: &str) -> HttpResponse {
  let html = format!(
    "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body>\n</html>\n",
    escape_html(title),
    body
  );
  HttpResponse::Ok().content_type("text/html; charset=utf-8").body(html)
}

fn banner(notification: Option<&Notification>) -> String {
  match notification {
    Some(n) => {
      let class = match n.level {
        Level::Success => "success",
        Level::Error => "error",
      };
      format!(
        "<div class=\"notification {}\" data-seq=\"{}\">{}</div>\n",
        class,
        n.seq,
        escape_html(&n.message)
      )
    }
    None => String::new(),
  }
}

fn tab_bar(base: &str, active: Tab) -> String {
  let mut out = String::from("<nav class=\"tabs\">");
  for tab in Tab::ALL {
    let class = if tab == active { " class=\"active\"" } else { "" };
    let _ = write!(out, "<a href=\"{}?tab={}\"{}>{}</a>", base, tab.slug(), class, tab.label());
  }
  out.push_str("</nav>\n");
  out
}

fn progress_cell(progress: Option<f64>, received: i32, needed: i32) -> String {
  match progress {
    Some(p) => format!("{} / {} ({:.0}%)", received, needed, (p * 100.0).min(100.0)),
    None => format!("{} / {}", received, needed),
  }
}

pub async fn index_handler() -> HttpResponse {
  layout(
    "Surplus Food Marketplace",
    "<h1>Surplus Food Marketplace</h1>\n<p>Choose how you want to continue:</p>\n<ul>\n<li><a href=\"/buyer\">I'm a buyer</a></li>\n<li><a href=\"/seller\">I'm a seller</a></li>\n</ul>",
  )
}

fn render_buyer(snapshot: &BuyerSnapshot, tab: Tab) -> String {
  let mut body = String::from("<h1>Buyer Dashboard</h1>\n");
  body.push_str(&banner(snapshot.notification.as_ref()));
  let _ = writeln!(
    body,
    "<p class=\"cart-badge\">Cart: {} item(s), total ${:.2}</p>",
    snapshot.cart.count, snapshot.cart.total
  );
  body.push_str(&tab_bar("/buyer", tab));

  match tab {
    Tab::Items => {
      let _ = writeln!(
        body,
        "<form method=\"get\" action=\"/buyer\"><input type=\"hidden\" name=\"tab\" value=\"items\"><input type=\"search\" name=\"q\" value=\"{}\" placeholder=\"Search food items\"></form>",
        escape_html(&snapshot.search_term)
      );
      body.push_str("<ul class=\"food-items\">\n");
      for card in &snapshot.food_items {
        let item = &card.item;
        let _ = writeln!(
          body,
          "<li data-id=\"{}\"><strong>{}</strong> {} <span class=\"price\">${:.2}</span> <s>${:.2}</s> {} available, fresh until {}{}</li>",
          item.id,
          escape_html(&item.name),
          escape_html(&item.description),
          item.price,
          item.original_price,
          item.quantity,
          item.fresh_until.format("%Y-%m-%d %H:%M"),
          if item.is_sold_out() { " <em>Sold out</em>" } else { "" }
        );
      }
      body.push_str("</ul>\n<h2>Cart</h2>\n<ul class=\"cart\">\n");
      for line in &snapshot.cart.lines {
        let _ = writeln!(
          body,
          "<li>{} &times; {} = ${:.2}</li>",
          escape_html(&line.name),
          line.quantity,
          line.line_total
        );
      }
      body.push_str("</ul>\n");
    }
    Tab::Campaigns => {
      body.push_str("<ul class=\"campaigns\">\n");
      for card in &snapshot.campaigns {
        let c = &card.campaign;
        let _ = writeln!(
          body,
          "<li data-id=\"{}\"><strong>{}</strong>{} needs {}: {}</li>",
          c.id,
          escape_html(&c.title),
          if card.own { " <em>(yours)</em>" } else { "" },
          escape_html(&c.item_needed),
          progress_cell(card.progress, c.quantity_received, c.quantity_needed)
        );
      }
      body.push_str("</ul>\n");
    }
    Tab::Orders => {
      body.push_str("<ul class=\"orders\">\n");
      for o in &snapshot.orders {
        let _ = writeln!(
          body,
          "<li data-id=\"{}\">{} &times; {} ({})</li>",
          o.order.id,
          escape_html(&o.food_item.name),
          o.order.quantity,
          o.order.status.as_str()
        );
      }
      body.push_str("</ul>\n");
    }
    Tab::Donations => {
      body.push_str("<ul class=\"donations\">\n");
      for d in &snapshot.donations {
        let _ = writeln!(
          body,
          "<li data-id=\"{}\">{} &times; {} for {} ({})</li>",
          d.donation.id,
          d.donation.quantity,
          escape_html(&d.campaign.item_needed),
          escape_html(&d.campaign.title),
          d.donation.status.as_str()
        );
      }
      body.push_str("</ul>\n");
    }
  }
  body
}

fn render_seller(snapshot: &SellerSnapshot, tab: Tab) -> String {
  let mut body = String::from("<h1>Seller Dashboard</h1>\n");
  body.push_str(&banner(snapshot.notification.as_ref()));
  body.push_str(&tab_bar("/seller", tab));

  match tab {
    Tab::Items => {
      body.push_str("<ul class=\"food-items\">\n");
      for item in &snapshot.food_items {
        let _ = writeln!(
          body,
          "<li data-id=\"{}\"><strong>{}</strong> ${:.2} (was ${:.2}), {} left</li>",
          item.id,
          escape_html(&item.name),
          item.price,
          item.original_price,
          item.quantity
        );
      }
      body.push_str("</ul>\n");
    }
    Tab::Campaigns => {
      body.push_str("<ul class=\"campaigns\">\n");
      for card in &snapshot.campaigns {
        let c = &card.campaign;
        let action = match card.selected_quantity {
          Some(q) => format!(" donate up to {} (selected {})", card.remaining, q),
          None => " <em>Fully funded</em>".to_string(),
        };
        let _ = writeln!(
          body,
          "<li data-id=\"{}\"><strong>{}</strong> needs {}: {}{}</li>",
          c.id,
          escape_html(&c.title),
          escape_html(&c.item_needed),
          progress_cell(card.progress, c.quantity_received, c.quantity_needed),
          action
        );
      }
      body.push_str("</ul>\n");
    }
    Tab::Orders => {
      body.push_str("<ul class=\"orders\">\n");
      for o in &snapshot.orders {
        let _ = writeln!(
          body,
          "<li data-id=\"{}\">{} &times; {} for buyer {}</li>",
          o.order.id,
          escape_html(&o.food_item.name),
          o.order.quantity,
          o.order.buyer_id
        );
      }
      body.push_str("</ul>\n");
    }
    Tab::Donations => {
      body.push_str("<ul class=\"donations\">\n");
      for d in &snapshot.donations {
        let _ = writeln!(
          body,
          "<li data-id=\"{}\">{} to {} ({})</li>",
          d.donation.id,
          d.donation.quantity,
          escape_html(&d.campaign.title),
          d.donation.status.as_str()
        );
      }
      body.push_str("</ul>\n");
    }
  }
  body
}

pub async fn buyer_page_handler(
  app_state: web::Data<AppState>,
  session: BuyerSession,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let query = query.into_inner();
  let mut view = app_state.buyer_view(session.0).lock_owned().await;
  if let Err(e) = view.mount().await {
    // The banner already carries the failure; render whatever is cached.
    warn!(error = %e, "Buyer page rendered from a partial mount.");
  }
  if let Some(term) = query.q {
    view.set_search_term(term);
  }
  Ok(layout("Buyer Dashboard", &render_buyer(&view.snapshot(), query.tab)))
}

pub async fn seller_page_handler(
  app_state: web::Data<AppState>,
  session: SellerSession,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let mut view = app_state.seller_view(session.0).lock_owned().await;
  if let Err(e) = view.mount().await {
    warn!(error = %e, "Seller page rendered from a partial mount.");
  }
  Ok(layout("Seller Dashboard", &render_seller(&view.snapshot(), query.tab)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn escapes_markup() {
    assert_eq!(escape_html("<b>\"Fish & Chips\"</b>"), "&lt;b&gt;&quot;Fish &amp; Chips&quot;&lt;/b&gt;");
  }

  #[test]
  fn tab_bar_marks_active_tab() {
    let bar = tab_bar("/buyer", Tab::Orders);
    assert!(bar.contains("<a href=\"/buyer?tab=orders\" class=\"active\">Orders</a>"));
    assert!(bar.contains("<a href=\"/buyer?tab=items\">Food Items</a>"));
  }

  #[test]
  fn progress_without_target_has_no_percentage() {
    assert_eq!(progress_cell(None, 0, 0), "0 / 0");
    assert_eq!(progress_cell(Some(0.5), 5, 10), "5 / 10 (50%)");
  }
}
