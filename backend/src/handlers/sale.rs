//! Sale HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{ApiResponse, Page};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_manager, CurrentUser};
use crate::services::sale::{CreateSaleInput, Sale, SaleFilter, SaleService, SaleWithItems};
use crate::AppState;

/// Record a sale for the authenticated cashier
pub async fn create_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<SaleWithItems>>)> {
    let service = SaleService::new(state.db.clone());
    let sale = service.create_sale(user.user_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(sale).with_message("Sale recorded")),
    ))
}

pub async fn list_sales(
    State(state): State<AppState>,
    Query(filter): Query<SaleFilter>,
) -> AppResult<Json<ApiResponse<Page<Sale>>>> {
    let service = SaleService::new(state.db.clone());
    let sales = service.list_sales(filter).await?;
    Ok(Json(ApiResponse::ok(sales)))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SaleWithItems>>> {
    let service = SaleService::new(state.db.clone());
    let sale = service.get_sale(sale_id).await?;
    Ok(Json(ApiResponse::ok(sale)))
}

/// Delete a sale and return its items to stock (admin/manager)
pub async fn delete_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    require_manager(&user)?;

    let service = SaleService::new(state.db.clone());
    service.delete_sale(sale_id).await?;
    Ok(Json(ApiResponse::message("Sale deleted")))
}
