//! Supplier HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::ApiResponse;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_manager, CurrentUser};
use crate::services::party::{PaymentInput, PaymentReceipt};
use crate::services::supplier::{
    CreateSupplierInput, Supplier, SupplierFilter, SupplierService, UpdateSupplierInput,
};
use crate::AppState;

pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(filter): Query<SupplierFilter>,
) -> AppResult<Json<ApiResponse<Vec<Supplier>>>> {
    let service = SupplierService::new(state.db.clone());
    let suppliers = service.list_suppliers(filter).await?;
    Ok(Json(ApiResponse::ok(suppliers)))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Supplier>>> {
    let service = SupplierService::new(state.db.clone());
    let supplier = service.get_supplier(supplier_id).await?;
    Ok(Json(ApiResponse::ok(supplier)))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Supplier>>)> {
    let service = SupplierService::new(state.db.clone());
    let supplier = service.create_supplier(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(supplier).with_message("Supplier created")),
    ))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<UpdateSupplierInput>,
) -> AppResult<Json<ApiResponse<Supplier>>> {
    let service = SupplierService::new(state.db.clone());
    let supplier = service.update_supplier(supplier_id, input).await?;
    Ok(Json(ApiResponse::ok(supplier).with_message("Supplier updated")))
}

/// Delete a supplier (admin/manager)
pub async fn delete_supplier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    require_manager(&user)?;

    let service = SupplierService::new(state.db.clone());
    service.delete_supplier(supplier_id).await?;
    Ok(Json(ApiResponse::message("Supplier deleted")))
}

/// Record a payment made to the supplier
pub async fn record_supplier_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<PaymentInput>,
) -> AppResult<Json<ApiResponse<PaymentReceipt>>> {
    // Money leaving the till is a back-office decision
    require_manager(&user)?;

    let service = SupplierService::new(state.db.clone());
    let receipt = service.record_payment(supplier_id, input).await?;
    Ok(Json(ApiResponse::ok(receipt).with_message("Payment recorded")))
}
