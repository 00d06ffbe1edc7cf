//! Route definitions for the retail POS API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (register/login/refresh public, /me protected)
        .nest("/auth", auth_routes(state.clone()))
        // Protected routes - catalogue
        .nest("/products", product_routes(state.clone()))
        // Protected routes - customers
        .nest("/customers", customer_routes(state.clone()))
        // Protected routes - suppliers
        .nest("/suppliers", supplier_routes(state.clone()))
        // Protected routes - sales
        .nest("/sales", sale_routes(state.clone()))
        // Protected routes - expenses
        .nest("/expenses", expense_routes(state.clone()))
        // Protected routes - reports (admin/manager)
        .nest("/reports", report_routes(state))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .merge(protected)
}

/// Product routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/barcode/:barcode", get(handlers::get_product_by_barcode))
        .route("/low-stock", get(handlers::list_low_stock_products))
        .route("/expiring", get(handlers::list_expiring_products))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/stock", post(handlers::adjust_product_stock))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Customer routes (protected)
fn customer_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_customers).post(handlers::create_customer))
        .route(
            "/:customer_id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
        .route("/:customer_id/payments", post(handlers::record_customer_payment))
        .route("/:customer_id/sales", get(handlers::list_customer_sales))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Supplier routes (protected)
fn supplier_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
        .route("/:supplier_id/payments", post(handlers::record_supplier_payment))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Sale routes (protected)
fn sale_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route(
            "/:sale_id",
            get(handlers::get_sale).delete(handlers::delete_sale),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Expense routes (protected)
fn expense_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_expenses).post(handlers::create_expense))
        .route(
            "/:expense_id",
            get(handlers::get_expense)
                .put(handlers::update_expense)
                .delete(handlers::delete_expense),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Reporting routes (protected)
fn report_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/sales", get(handlers::get_sales_report))
        .route("/top-products", get(handlers::get_top_products_report))
        .route("/profit", get(handlers::get_profit_report))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
