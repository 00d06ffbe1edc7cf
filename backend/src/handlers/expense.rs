//! Expense HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::ApiResponse;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_manager, CurrentUser};
use crate::services::expense::{
    CreateExpenseInput, Expense, ExpenseFilter, ExpenseService, UpdateExpenseInput,
};
use crate::AppState;

pub async fn list_expenses(
    State(state): State<AppState>,
    Query(filter): Query<ExpenseFilter>,
) -> AppResult<Json<ApiResponse<Vec<Expense>>>> {
    let service = ExpenseService::new(state.db.clone());
    let expenses = service.list_expenses(filter).await?;
    Ok(Json(ApiResponse::ok(expenses)))
}

pub async fn get_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Expense>>> {
    let service = ExpenseService::new(state.db.clone());
    let expense = service.get_expense(expense_id).await?;
    Ok(Json(ApiResponse::ok(expense)))
}

pub async fn create_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateExpenseInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Expense>>)> {
    let service = ExpenseService::new(state.db.clone());
    let expense = service.create_expense(user.user_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(expense).with_message("Expense recorded")),
    ))
}

pub async fn update_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<Uuid>,
    Json(input): Json<UpdateExpenseInput>,
) -> AppResult<Json<ApiResponse<Expense>>> {
    let service = ExpenseService::new(state.db.clone());
    let expense = service.update_expense(expense_id, input).await?;
    Ok(Json(ApiResponse::ok(expense).with_message("Expense updated")))
}

/// Delete an expense (admin/manager)
pub async fn delete_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(expense_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    require_manager(&user)?;

    let service = ExpenseService::new(state.db.clone());
    service.delete_expense(expense_id).await?;
    Ok(Json(ApiResponse::message("Expense deleted")))
}
