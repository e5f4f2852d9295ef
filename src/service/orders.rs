//! Checkout and order administration.

use crate::auth::AuthUser;
use crate::entity::cart_item;
use crate::entity::order::{self, Order, OrderItem, OrderStatus, Shipping};
use crate::entity::user::{self, Role};
use crate::error::ApiError;
use crate::executor::{DbExecutor, PgExecutor};
use crate::notify::Notifier;
use uuid::Uuid;

/// Turn the caller's cart into an order in one transaction, then queue the
/// notification.
pub fn create_from_cart(
    conn: &PgExecutor,
    notifier: &Notifier,
    user_id: Uuid,
    shipping: Shipping,
) -> Result<Order, ApiError> {
    let tx = conn.begin()?;

    let lines = cart_item::lock_for_user(&tx, user_id)?;
    if lines.is_empty() {
        tx.rollback()?;
        return Err(ApiError::bad_request("Cart is empty"));
    }

    let Some(total_cents) = cart_item::total_cents(&lines) else {
        tx.rollback()?;
        return Err(crate::service::cart::total_too_large());
    };
    let locked: Vec<Uuid> = lines.iter().map(|line| line.id).collect();
    let mut created = order::insert(&tx, user_id, total_cents, &shipping)?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for line in lines {
        let Some(product) = line.product else {
            // Products are never hard-deleted while referenced by a cart.
            log::warn!("cart line {} has no product, skipping", line.id);
            continue;
        };
        let mut item = order::insert_item(&tx, created.id, product.id, line.quantity, product.price_cents)?;
        item.product = Some(product);
        items.push(item);
    }

    cart_item::delete_lines(&tx, locked)?;
    let customer = user::find_by_id(&tx, user_id)?;
    tx.commit()?;

    created.items = items;
    created.user = customer;

    #[cfg(feature = "metrics")]
    crate::metrics::METRICS.record_order_created();
    log::info!(
        "order {} created for user {} ({} items, {} cents)",
        created.id,
        user_id,
        created.items.len(),
        created.total_cents
    );

    notifier.order_created(&created);
    Ok(created)
}

/// Admins see every order, customers their own.
pub fn list_orders(executor: &dyn DbExecutor, caller: &AuthUser) -> Result<Vec<Order>, ApiError> {
    let owner = match caller.role {
        Role::Admin => None,
        Role::Customer => Some(caller.id),
    };
    Ok(order::list(executor, owner)?)
}

/// Set any status; leaving a terminal state is allowed but logged.
pub fn update_status(
    executor: &dyn DbExecutor,
    id: Uuid,
    status: OrderStatus,
) -> Result<Order, ApiError> {
    let current = order::find_by_id(executor, id)?.ok_or_else(|| ApiError::not_found("Order not found"))?;
    if current.status.is_terminal() && current.status != status {
        log::warn!(
            "order {id} moved out of terminal status {} to {status}",
            current.status
        );
    }

    let updated = order::set_status(executor, id, status)?.ok_or_else(|| ApiError::not_found("Order not found"))?;
    let mut orders = vec![updated];
    order::attach_items(executor, &mut orders)?;
    orders.pop().ok_or_else(ApiError::internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RecordingExecutor;

    #[test]
    fn test_customer_listing_is_scoped_to_caller() {
        let recorder = RecordingExecutor::new();
        let caller = AuthUser {
            id: Uuid::new_v4(),
            email: "c@test.local".to_string(),
            role: Role::Customer,
        };
        assert!(list_orders(&recorder, &caller).unwrap().is_empty());
        assert!(recorder.statements()[0].contains(r#"WHERE "user_id" = $1"#));
    }

    #[test]
    fn test_admin_listing_is_unscoped() {
        let recorder = RecordingExecutor::new();
        let caller = AuthUser {
            id: Uuid::new_v4(),
            email: "a@test.local".to_string(),
            role: Role::Admin,
        };
        assert!(list_orders(&recorder, &caller).unwrap().is_empty());
        assert!(!recorder.statements()[0].contains("WHERE"));
    }

    #[test]
    fn test_status_update_of_missing_order_is_404() {
        let recorder = RecordingExecutor::new();
        let err = update_status(&recorder, Uuid::nil(), OrderStatus::Paid).unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(err.to_string(), "Order not found");
    }
}
