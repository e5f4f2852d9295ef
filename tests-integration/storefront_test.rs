//! End-to-end checks against a real PostgreSQL (`TEST_DATABASE_URL`).
//!
//! Every test creates its own users, categories and SKUs, so tests can run in
//! parallel against one database.

mod support;

use serde_json::{json, Value};
use storefront::{AppState, DbExecutor, PgExecutor};
use support::{app, call, login_as, raw_connection, unique, ADMIN_EMAIL, ADMIN_PASSWORD};

fn shipping() -> Value {
    json!({
        "shippingName": "  Jane Doe ",
        "shippingPhone": "+1 555-123-4567",
        "shippingStreet": "123 Main St",
        "shippingHouse": "",
        "shippingCityProvince": "Springfield / Illinois",
        "shippingDistrict": "Downtown",
    })
}

/// Category plus one product in it; returns the product id.
fn product(state: &AppState, admin: &str, price_cents: i64, active: bool) -> String {
    let res = call(state, "POST", "/categories", Some(admin), Some(json!({ "name": unique("Cat") })));
    assert_eq!(res.status, 201, "{}", res.json_body());
    let category_id = res.json_body()["id"].as_str().unwrap().to_string();

    let res = call(
        state,
        "POST",
        "/products",
        Some(admin),
        Some(json!({
            "title": "Test Product",
            "sku": unique("SKU"),
            "priceCents": price_cents,
            "stock": 5,
            "isActive": active,
            "categoryId": category_id,
        })),
    );
    assert_eq!(res.status, 201, "{}", res.json_body());
    assert_eq!(res.json_body()["category"]["id"], category_id.as_str());
    res.json_body()["id"].as_str().unwrap().to_string()
}

fn admin_and_customer(state: &AppState) -> (String, String) {
    let admin = login_as(state, &format!("{}@test.local", unique("admin")), "Pass1234!", Some("ADMIN"));
    let customer = login_as(state, &format!("{}@test.local", unique("cust")), "Pass1234!", Some("CUSTOMER"));
    (admin, customer)
}

#[test]
fn test_checkout_scenario() {
    let Some(state) = app() else { return };
    let (admin, customer) = admin_and_customer(&state);
    let product_id = product(&state, &admin, 1234, true);

    let res = call(
        &state,
        "POST",
        "/cart/items",
        Some(&customer),
        Some(json!({ "productId": product_id, "quantity": 2 })),
    );
    assert_eq!(res.status, 201, "{}", res.json_body());

    let cart = call(&state, "GET", "/cart", Some(&customer), None).json_body();
    assert_eq!(cart["totalCents"], 2468);
    assert_eq!(cart["items"][0]["product"]["id"], product_id.as_str());

    let res = call(&state, "POST", "/orders", Some(&customer), Some(shipping()));
    assert_eq!(res.status, 201, "{}", res.json_body());
    let order = res.json_body();
    let order_id = order["id"].as_str().unwrap().to_string();
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["totalCents"], 2468);
    assert_eq!(order["shippingName"], "Jane Doe");
    assert_eq!(order["shippingHouse"], Value::Null);
    assert_eq!(order["items"].as_array().unwrap().len(), 1);

    let cart = call(&state, "GET", "/cart", Some(&customer), None).json_body();
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);

    let all = call(&state, "GET", "/orders", Some(&admin), None).json_body();
    assert!(all.as_array().unwrap().iter().any(|o| o["id"] == order_id.as_str()));

    let res = call(
        &state,
        "PATCH",
        &format!("/orders/{order_id}/status"),
        Some(&admin),
        Some(json!({ "status": "PAID" })),
    );
    assert_eq!(res.status, 200);
    assert_eq!(res.json_body()["status"], "PAID");
}

#[test]
fn test_inactive_products_are_hidden_and_not_purchasable() {
    let Some(state) = app() else { return };
    let (admin, customer) = admin_and_customer(&state);
    let product_id = product(&state, &admin, 500, false);

    let listing = call(&state, "GET", "/products?limit=50", None, None).json_body();
    assert!(!listing.as_array().unwrap().iter().any(|p| p["id"] == product_id.as_str()));

    let res = call(
        &state,
        "POST",
        "/cart/items",
        Some(&customer),
        Some(json!({ "productId": product_id, "quantity": 1 })),
    );
    assert_eq!(res.status, 400);
    assert_eq!(res.json_body()["message"], "Invalid productId");

    // Soft delete on an active product has the same effect.
    let active_id = product(&state, &admin, 500, true);
    let res = call(&state, "DELETE", &format!("/products/{active_id}"), Some(&admin), None);
    assert_eq!(res.json_body(), json!({ "deleted": true, "soft": true }));
    let res = call(&state, "GET", &format!("/products/{active_id}"), None, None);
    assert_eq!(res.json_body()["isActive"], false);
}

#[test]
fn test_adding_twice_increments_one_line() {
    let Some(state) = app() else { return };
    let (admin, customer) = admin_and_customer(&state);
    let product_id = product(&state, &admin, 100, true);

    for _ in 0..2 {
        let res = call(
            &state,
            "POST",
            "/cart/items",
            Some(&customer),
            Some(json!({ "productId": product_id, "quantity": 1 })),
        );
        assert_eq!(res.status, 201);
    }
    let cart = call(&state, "GET", "/cart", Some(&customer), None).json_body();
    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 2);
}

#[test]
fn test_order_total_is_a_snapshot() {
    let Some(state) = app() else { return };
    let (admin, customer) = admin_and_customer(&state);
    let product_id = product(&state, &admin, 999, true);

    call(
        &state,
        "POST",
        "/cart/items",
        Some(&customer),
        Some(json!({ "productId": product_id, "quantity": 3 })),
    );
    let order = call(&state, "POST", "/orders", Some(&customer), Some(shipping())).json_body();
    assert_eq!(order["totalCents"], 2997);

    let res = call(
        &state,
        "PATCH",
        &format!("/products/{product_id}"),
        Some(&admin),
        Some(json!({ "priceCents": 1 })),
    );
    assert_eq!(res.status, 200);

    let mine = call(&state, "GET", "/orders", Some(&customer), None).json_body();
    let orders = mine.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    let items = orders[0]["items"].as_array().unwrap();
    let sum: i64 = items
        .iter()
        .map(|i| i["quantity"].as_i64().unwrap() * i["priceCents"].as_i64().unwrap())
        .sum();
    assert_eq!(orders[0]["totalCents"], 2997);
    assert_eq!(sum, 2997);
}

#[test]
fn test_empty_cart_checkout_creates_nothing() {
    let Some(state) = app() else { return };
    let (_, customer) = admin_and_customer(&state);

    let res = call(&state, "POST", "/orders", Some(&customer), Some(shipping()));
    assert_eq!(res.status, 400);
    assert_eq!(res.json_body()["message"], "Cart is empty");

    let mine = call(&state, "GET", "/orders", Some(&customer), None).json_body();
    assert_eq!(mine, json!([]));
}

#[test]
fn test_reserved_admin_is_always_admin() {
    let Some(state) = app() else { return };

    let res = call(
        &state,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "wrong-password" })),
    );
    assert_eq!(res.status, 401);

    let token = login_as(&state, ADMIN_EMAIL, ADMIN_PASSWORD, None);
    let me = call(&state, "GET", "/auth/me", Some(&token), None).json_body();
    assert_eq!(me["role"], "ADMIN");
    assert_eq!(me["email"], ADMIN_EMAIL);
    assert!(me.get("passwordHash").is_none());

    let res = call(
        &state,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": ADMIN_EMAIL.to_uppercase(), "password": ADMIN_PASSWORD, "role": "CUSTOMER" })),
    );
    assert_eq!(res.status, 201);
    assert_eq!(res.json_body()["role"], "ADMIN");
}

#[test]
fn test_duplicates_and_paging() {
    let Some(state) = app() else { return };
    let (admin, _) = admin_and_customer(&state);

    let email = format!("{}@test.local", unique("dup"));
    login_as(&state, &email, "Pass1234!", Some("CUSTOMER"));
    let res = call(
        &state,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": email, "password": "Pass1234!" })),
    );
    assert_eq!(res.status, 400);
    assert_eq!(res.json_body()["message"], "Email already exists");

    let name = unique("Dup");
    call(&state, "POST", "/categories", Some(&admin), Some(json!({ "name": name })));
    let res = call(&state, "POST", "/categories", Some(&admin), Some(json!({ "name": name })));
    assert_eq!(res.status, 400);
    assert_eq!(res.json_body()["message"], "name already exists");

    let page = call(&state, "GET", "/products?limit=500&page=-2", None, None).json_body();
    assert!(page.as_array().unwrap().len() <= 50);
}

/// Trigger that makes inserting an order item for one product fail.
struct RejectOrderItems {
    conn: PgExecutor,
    trigger: String,
}

impl RejectOrderItems {
    fn for_product(product_id: &str) -> Self {
        let conn = raw_connection();
        conn.execute(
            "CREATE OR REPLACE FUNCTION storefront_test_reject_item() RETURNS trigger AS $$ \
             BEGIN RAISE EXCEPTION 'order item rejected'; END; $$ LANGUAGE plpgsql",
            &[],
        )
        .unwrap();
        let trigger = format!("reject_{}", product_id.replace('-', ""));
        conn.execute(
            &format!(
                "CREATE TRIGGER {trigger} BEFORE INSERT ON order_items FOR EACH ROW \
                 WHEN (NEW.product_id = '{product_id}'::uuid) \
                 EXECUTE FUNCTION storefront_test_reject_item()"
            ),
            &[],
        )
        .unwrap();
        Self { conn, trigger }
    }
}

impl Drop for RejectOrderItems {
    fn drop(&mut self) {
        let _ = self.conn.execute(
            &format!("DROP TRIGGER IF EXISTS {} ON order_items", self.trigger),
            &[],
        );
    }
}

#[test]
fn test_failed_checkout_leaves_cart_untouched() {
    let Some(state) = app() else { return };
    let (admin, customer) = admin_and_customer(&state);
    let product_id = product(&state, &admin, 250, true);
    call(
        &state,
        "POST",
        "/cart/items",
        Some(&customer),
        Some(json!({ "productId": product_id, "quantity": 2 })),
    );

    let reject = RejectOrderItems::for_product(&product_id);
    let res = call(&state, "POST", "/orders", Some(&customer), Some(shipping()));
    assert_eq!(res.status, 500);

    let mine = call(&state, "GET", "/orders", Some(&customer), None).json_body();
    assert_eq!(mine, json!([]));
    let cart = call(&state, "GET", "/cart", Some(&customer), None).json_body();
    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 2);

    drop(reject);
    let res = call(&state, "POST", "/orders", Some(&customer), Some(shipping()));
    assert_eq!(res.status, 201, "{}", res.json_body());
    assert_eq!(res.json_body()["totalCents"], 500);
    assert_eq!(res.json_body()["user"]["role"], "CUSTOMER");
}

#[test]
fn test_quantity_overflow_is_a_bad_request() {
    let Some(state) = app() else { return };
    let (admin, customer) = admin_and_customer(&state);
    let product_id = product(&state, &admin, 1, true);

    let add = |quantity: i64| {
        call(
            &state,
            "POST",
            "/cart/items",
            Some(&customer),
            Some(json!({ "productId": product_id, "quantity": quantity })),
        )
    };
    assert_eq!(add(i64::from(i32::MAX)).status, 201);
    let res = add(1);
    assert_eq!(res.status, 400);
    assert_eq!(res.json_body()["message"], "quantity is too large");

    let cart = call(&state, "GET", "/cart", Some(&customer), None).json_body();
    assert_eq!(cart["items"][0]["quantity"], i32::MAX);
}

#[test]
fn test_cart_total_overflow_is_rejected() {
    let Some(state) = app() else { return };
    let (admin, customer) = admin_and_customer(&state);
    let product_id = product(&state, &admin, 4_611_686_018_427_387_904, true);
    call(
        &state,
        "POST",
        "/cart/items",
        Some(&customer),
        Some(json!({ "productId": product_id, "quantity": 2 })),
    );

    let res = call(&state, "GET", "/cart", Some(&customer), None);
    assert_eq!(res.status, 400);
    assert_eq!(res.json_body()["message"], "Cart total is too large");

    let res = call(&state, "POST", "/orders", Some(&customer), Some(shipping()));
    assert_eq!(res.status, 400);
    let mine = call(&state, "GET", "/orders", Some(&customer), None).json_body();
    assert_eq!(mine, json!([]));
}

#[test]
fn test_page_past_the_end_is_empty() {
    let Some(state) = app() else { return };
    let res = call(&state, "GET", "/products?page=9223372036854775807&limit=50", None, None);
    assert_eq!(res.status, 200);
    assert_eq!(res.json_body(), json!([]));
}
