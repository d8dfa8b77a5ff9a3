use axum::{
    extract::{Path, State},
    routing::get,
    routing::put,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

use super::dto::{AddToCartRequest, RemoveFromCartRequest, UpdateQuantityRequest};
use super::repo::{self, CartLine};

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/cart",
            get(get_cart).post(add_to_cart).delete(remove_from_cart),
        )
        .route("/cart/:id", put(update_quantity))
}

#[instrument(skip_all, fields(user_id = %principal.id))]
async fn get_cart(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Vec<CartLine>>, ApiError> {
    Ok(Json(repo::list(&state.db, principal.id).await?))
}

#[instrument(skip_all, fields(user_id = %principal.id, product_id = %payload.product_id))]
async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> Result<Json<Vec<CartLine>>, ApiError> {
    match repo::add(&state.db, principal.id, payload.product_id).await {
        Ok(()) => {}
        Err(e) if e.as_database_error().is_some_and(|d| d.is_foreign_key_violation()) => {
            warn!("add to cart for unknown product");
            return Err(ApiError::NotFound("Product not found".into()));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Json(repo::list(&state.db, principal.id).await?))
}

/// Without a product id the whole cart is emptied; with one, only that line
/// is removed. A missing line is not an error.
#[instrument(skip_all, fields(user_id = %principal.id))]
async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    payload: Option<Json<RemoveFromCartRequest>>,
) -> Result<Json<Vec<CartLine>>, ApiError> {
    let product_id = payload.and_then(|Json(p)| p.product_id);
    repo::clear(&state.db, principal.id, product_id).await?;

    info!(product_id = ?product_id, "cart cleared");
    Ok(Json(repo::list(&state.db, principal.id).await?))
}

#[instrument(skip_all, fields(user_id = %principal.id, product_id = %product_id))]
async fn update_quantity(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<Json<Vec<CartLine>>, ApiError> {
    if payload.quantity < 0 {
        return Err(ApiError::Validation("Quantity must not be negative".into()));
    }

    let found =
        repo::update_quantity(&state.db, principal.id, product_id, payload.quantity).await?;
    if !found {
        return Err(ApiError::NotFound("Product not found in cart".into()));
    }

    Ok(Json(repo::list(&state.db, principal.id).await?))
}
