//! Product catalogue HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::ApiResponse;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_manager, CurrentUser};
use crate::services::product::{
    CreateProductInput, Product, ProductFilter, ProductService, StockAdjustmentInput,
    UpdateProductInput,
};
use crate::AppState;

#[derive(Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<i64>,
}

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> AppResult<Json<ApiResponse<Vec<Product>>>> {
    let service = ProductService::new(state.db.clone());
    let products = service.list_products(filter).await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// Get a product by ID
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let service = ProductService::new(state.db.clone());
    let product = service.get_product(product_id).await?;
    Ok(Json(ApiResponse::ok(product)))
}

/// Look up a product by barcode (scanner / manual entry at checkout)
pub async fn get_product_by_barcode(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let service = ProductService::new(state.db.clone());
    let product = service.get_by_barcode(&barcode).await?;
    Ok(Json(ApiResponse::ok(product)))
}

/// Products at or below their low-stock threshold
pub async fn list_low_stock_products(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Product>>>> {
    let service = ProductService::new(state.db.clone());
    let products = service.low_stock().await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// Products expiring within `days` (default 30)
pub async fn list_expiring_products(
    State(state): State<AppState>,
    Query(query): Query<ExpiringQuery>,
) -> AppResult<Json<ApiResponse<Vec<Product>>>> {
    let service = ProductService::new(state.db.clone());
    let products = service.expiring(query.days).await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// Create a new product
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let service = ProductService::new(state.db.clone());
    let product = service.create_product(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(product).with_message("Product created")),
    ))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let service = ProductService::new(state.db.clone());
    let product = service.update_product(product_id, input).await?;
    Ok(Json(ApiResponse::ok(product).with_message("Product updated")))
}

/// Delete a product (admin/manager)
pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    require_manager(&user)?;

    let service = ProductService::new(state.db.clone());
    service.delete_product(product_id).await?;
    Ok(Json(ApiResponse::message("Product deleted")))
}

/// Adjust stock by a signed delta
pub async fn adjust_product_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<StockAdjustmentInput>,
) -> AppResult<Json<ApiResponse<Product>>> {
    tracing::debug!(user_id = %user.user_id, %product_id, "Stock adjustment requested");

    let service = ProductService::new(state.db.clone());
    let product = service.adjust_stock(product_id, input).await?;
    Ok(Json(ApiResponse::ok(product).with_message("Stock adjusted")))
}
