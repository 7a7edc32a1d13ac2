// marketplace/src/web/extractors.rs

use actix_web::{web, FromRequest, HttpRequest};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::{Principal, Role};
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "X-User-ID";

/// Reads `X-User-ID`, falling back to the configured default id for `role`.
fn resolve_principal(req: &HttpRequest, role: Role) -> Result<Principal, AppError> {
  if let Some(header) = req.headers().get(USER_ID_HEADER) {
    let user_id = header
      .to_str()
      .ok()
      .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
      .ok_or_else(|| {
        warn!(%role, "Rejected malformed X-User-ID header.");
        AppError::Auth("X-User-ID must be a UUID.".to_string())
      })?;
    return Ok(Principal { user_id, role });
  }

  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;
  let fallback = match role {
    Role::Buyer => state.config.default_buyer_id,
    Role::Seller => state.config.default_seller_id,
  };
  fallback.map(|user_id| Principal { user_id, role }).ok_or_else(|| {
    warn!(%role, "No X-User-ID header and no default id configured.");
    AppError::Auth(format!("A {} identity is required. Send an X-User-ID header.", role))
  })
}

/// The buyer a request acts as.
#[derive(Debug, Clone, Copy)]
pub struct BuyerSession(pub Principal);

impl FromRequest for BuyerSession {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    futures_util::future::ready(resolve_principal(req, Role::Buyer).map(BuyerSession))
  }
}

/// The seller a request acts as.
#[derive(Debug, Clone, Copy)]
pub struct SellerSession(pub Principal);

impl FromRequest for SellerSession {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    futures_util::future::ready(resolve_principal(req, Role::Seller).map(SellerSession))
  }
}
