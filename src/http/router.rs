//! Method + path to route. Path parameters are handed over raw; handlers parse them.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Health,
    Metrics,
    Preflight,

    Register,
    Login,
    Me,

    ListCategories,
    CreateCategory,
    GetCategory(&'a str),
    UpdateCategory(&'a str),
    DeleteCategory(&'a str),

    ListProducts,
    CreateProduct,
    GetProduct(&'a str),
    UpdateProduct(&'a str),
    DeleteProduct(&'a str),

    GetCart,
    AddCartItem,
    UpdateCartItem(&'a str),
    RemoveCartItem(&'a str),

    CreateOrder,
    ListOrders,
    UpdateOrderStatus(&'a str),

    Upload,

    NotFound,
}

pub fn route<'a>(method: &str, path: &'a str) -> Route<'a> {
    if method == "OPTIONS" {
        return Route::Preflight;
    }
    let segments: Vec<&'a str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        ("GET", ["health"]) => Route::Health,
        ("GET", ["metrics"]) => Route::Metrics,

        ("POST", ["auth", "register"]) => Route::Register,
        ("POST", ["auth", "login"]) => Route::Login,
        ("GET", ["auth", "me"]) => Route::Me,

        ("GET", ["categories"]) => Route::ListCategories,
        ("POST", ["categories"]) => Route::CreateCategory,
        ("GET", ["categories", id]) => Route::GetCategory(id),
        ("PATCH", ["categories", id]) => Route::UpdateCategory(id),
        ("DELETE", ["categories", id]) => Route::DeleteCategory(id),

        ("GET", ["products"]) => Route::ListProducts,
        ("POST", ["products"]) => Route::CreateProduct,
        ("GET", ["products", id]) => Route::GetProduct(id),
        ("PATCH", ["products", id]) => Route::UpdateProduct(id),
        ("DELETE", ["products", id]) => Route::DeleteProduct(id),

        ("GET", ["cart"]) => Route::GetCart,
        ("POST", ["cart", "items"]) => Route::AddCartItem,
        ("PATCH", ["cart", "items", product_id]) => Route::UpdateCartItem(product_id),
        ("DELETE", ["cart", "items", product_id]) => Route::RemoveCartItem(product_id),

        ("POST", ["orders"]) => Route::CreateOrder,
        ("GET", ["orders"]) => Route::ListOrders,
        ("PATCH", ["orders", id, "status"]) => Route::UpdateOrderStatus(id),

        ("POST", ["upload"]) => Route::Upload,

        _ => Route::NotFound,
    }
}
