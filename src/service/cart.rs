//! Per-customer cart.

use crate::entity::cart_item::{self, CartItem};
use crate::entity::product;
use crate::error::ApiError;
use crate::executor::DbExecutor;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItem>,
    /// At current prices.
    pub total_cents: i64,
}

pub fn get_cart(executor: &dyn DbExecutor, user_id: Uuid) -> Result<CartView, ApiError> {
    let items = cart_item::list_for_user(executor, user_id)?;
    let total_cents = cart_item::total_cents(&items).ok_or_else(total_too_large)?;
    Ok(CartView { items, total_cents })
}

pub(crate) fn total_too_large() -> ApiError {
    ApiError::bad_request("Cart total is too large")
}

fn with_product(executor: &dyn DbExecutor, item: CartItem) -> Result<CartItem, ApiError> {
    let mut items = vec![item];
    cart_item::attach_products(executor, &mut items)?;
    items.pop().ok_or_else(ApiError::internal)
}

/// Add to the cart; only active products qualify.
pub fn add_item(
    executor: &dyn DbExecutor,
    user_id: Uuid,
    product_id: &str,
    quantity: i32,
) -> Result<CartItem, ApiError> {
    let invalid = || ApiError::bad_request("Invalid productId");
    let product_id = Uuid::parse_str(product_id.trim()).map_err(|_| invalid())?;
    let product = product::find_by_id(executor, product_id)?.ok_or_else(invalid)?;
    if !product.is_active {
        return Err(invalid());
    }
    let item = cart_item::upsert(executor, user_id, product_id, quantity).map_err(|e| {
        if e.is_out_of_range() {
            ApiError::bad_request("quantity is too large")
        } else {
            ApiError::from(e)
        }
    })?;
    with_product(executor, item)
}

pub fn update_quantity(
    executor: &dyn DbExecutor,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<CartItem, ApiError> {
    let item = cart_item::set_quantity(executor, user_id, product_id, quantity)?
        .ok_or_else(|| ApiError::not_found("Cart item not found"))?;
    with_product(executor, item)
}

pub fn remove_item(executor: &dyn DbExecutor, user_id: Uuid, product_id: Uuid) -> Result<(), ApiError> {
    if cart_item::delete(executor, user_id, product_id)? {
        Ok(())
    } else {
        Err(ApiError::not_found("Cart item not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RecordingExecutor;

    #[test]
    fn test_malformed_product_id_is_rejected_before_querying() {
        let recorder = RecordingExecutor::new();
        let err = add_item(&recorder, Uuid::nil(), "cm123", 1).unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.to_string(), "Invalid productId");
        assert!(recorder.statements().is_empty());
    }

    #[test]
    fn test_missing_product_is_invalid() {
        let recorder = RecordingExecutor::new();
        let err = add_item(&recorder, Uuid::nil(), &Uuid::new_v4().to_string(), 1).unwrap_err();
        assert_eq!(err.to_string(), "Invalid productId");
        assert_eq!(recorder.statements().len(), 1);
    }

    #[test]
    fn test_missing_line_is_404() {
        let recorder = RecordingExecutor::new();
        let err = update_quantity(&recorder, Uuid::nil(), Uuid::nil(), 3).unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(remove_item(&recorder, Uuid::nil(), Uuid::nil()).unwrap_err().status(), 404);
    }

    #[test]
    fn test_empty_cart_view() {
        let recorder = RecordingExecutor::new();
        let view = get_cart(&recorder, Uuid::nil()).unwrap();
        assert!(view.items.is_empty());
        assert_eq!(view.total_cents, 0);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["totalCents"], 0);
    }
}
