//! Customer HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{ApiResponse, Page};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_manager, CurrentUser};
use crate::services::customer::{
    CreateCustomerInput, Customer, CustomerFilter, CustomerService, UpdateCustomerInput,
};
use crate::services::party::{PaymentInput, PaymentReceipt};
use crate::services::sale::{Sale, SaleFilter, SaleService};
use crate::AppState;

pub async fn list_customers(
    State(state): State<AppState>,
    Query(filter): Query<CustomerFilter>,
) -> AppResult<Json<ApiResponse<Vec<Customer>>>> {
    let service = CustomerService::new(state.db.clone());
    let customers = service.list_customers(filter).await?;
    Ok(Json(ApiResponse::ok(customers)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let service = CustomerService::new(state.db.clone());
    let customer = service.get_customer(customer_id).await?;
    Ok(Json(ApiResponse::ok(customer)))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Json(input): Json<CreateCustomerInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Customer>>)> {
    let service = CustomerService::new(state.db.clone());
    let customer = service.create_customer(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(customer).with_message("Customer created")),
    ))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<UpdateCustomerInput>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let service = CustomerService::new(state.db.clone());
    let customer = service.update_customer(customer_id, input).await?;
    Ok(Json(ApiResponse::ok(customer).with_message("Customer updated")))
}

/// Delete a customer (admin/manager)
pub async fn delete_customer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    require_manager(&user)?;

    let service = CustomerService::new(state.db.clone());
    service.delete_customer(customer_id).await?;
    Ok(Json(ApiResponse::message("Customer deleted")))
}

/// Record a payment against the customer's balance
pub async fn record_customer_payment(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<PaymentInput>,
) -> AppResult<Json<ApiResponse<PaymentReceipt>>> {
    let service = CustomerService::new(state.db.clone());
    let receipt = service.record_payment(customer_id, input).await?;
    Ok(Json(ApiResponse::ok(receipt).with_message("Payment recorded")))
}

/// A customer's purchase history
pub async fn list_customer_sales(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Query(filter): Query<SaleFilter>,
) -> AppResult<Json<ApiResponse<Page<Sale>>>> {
    let service = SaleService::new(state.db.clone());
    let sales = service.customer_sales(customer_id, filter).await?;
    Ok(Json(ApiResponse::ok(sales)))
}
