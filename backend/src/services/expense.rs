//! Expense tracking service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{check_positive, normalize_category, normalize_required, round_money};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

const EXPENSE_COLUMNS: &str =
    "id, description, category, amount, expense_date, created_by, created_at, updated_at";

/// Expense service
#[derive(Clone)]
pub struct ExpenseService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub description: String,
    pub category: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpenseFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExpenseInput {
    #[validate(length(min = 1, max = 1000, message = "Description is required"))]
    pub description: String,
    pub category: Option<String>,
    #[validate(custom = "check_positive")]
    pub amount: Decimal,
    /// Defaults to today
    pub expense_date: Option<NaiveDate>,
}

impl CreateExpenseInput {
    fn normalized(self) -> Self {
        Self {
            description: normalize_required(&self.description),
            category: Some(normalize_category(self.category.as_deref())),
            amount: round_money(self.amount),
            expense_date: self.expense_date,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateExpenseInput {
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub expense_date: Option<NaiveDate>,
}

impl ExpenseService {
    /// Create a new ExpenseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List expenses, newest first
    pub async fn list_expenses(&self, filter: ExpenseFilter) -> AppResult<Vec<Expense>> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            if start > end {
                return Err(AppError::validation(
                    "start_date",
                    "start_date must not be after end_date",
                ));
            }
        }

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE TRUE"
        ));
        if let Some(start) = filter.start_date {
            qb.push(" AND expense_date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND expense_date <= ").push_bind(end);
        }
        if filter.category.is_some() {
            qb.push(" AND category = ")
                .push_bind(normalize_category(filter.category.as_deref()));
        }
        qb.push(" ORDER BY expense_date DESC, created_at DESC");

        let expenses = qb.build_query_as::<Expense>().fetch_all(&self.db).await?;
        Ok(expenses)
    }

    pub async fn get_expense(&self, expense_id: Uuid) -> AppResult<Expense> {
        sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1"
        ))
        .bind(expense_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Expense".to_string()))
    }

    /// Record an expense on behalf of the given user
    pub async fn create_expense(
        &self,
        created_by: Uuid,
        input: CreateExpenseInput,
    ) -> AppResult<Expense> {
        let input = input.normalized();
        input.validate()?;

        let expense = sqlx::query_as::<_, Expense>(&format!(
            r#"
            INSERT INTO expenses (description, category, amount, expense_date, created_by)
            VALUES ($1, $2, $3, COALESCE($4, CURRENT_DATE), $5)
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.amount)
        .bind(input.expense_date)
        .bind(created_by)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(expense_id = %expense.id, amount = %expense.amount, "Recorded expense");
        Ok(expense)
    }

    pub async fn update_expense(
        &self,
        expense_id: Uuid,
        input: UpdateExpenseInput,
    ) -> AppResult<Expense> {
        let existing = self.get_expense(expense_id).await?;

        let merged = CreateExpenseInput {
            description: input.description.unwrap_or(existing.description),
            category: Some(input.category.unwrap_or(existing.category)),
            amount: input.amount.unwrap_or(existing.amount),
            expense_date: Some(input.expense_date.unwrap_or(existing.expense_date)),
        }
        .normalized();
        merged.validate()?;

        sqlx::query_as::<_, Expense>(&format!(
            r#"
            UPDATE expenses
            SET description = $2, category = $3, amount = $4, expense_date = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(expense_id)
        .bind(&merged.description)
        .bind(&merged.category)
        .bind(merged.amount)
        .bind(merged.expense_date)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Expense".to_string()))
    }

    pub async fn delete_expense(&self, expense_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(expense_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Expense".to_string()));
        }

        tracing::info!(%expense_id, "Deleted expense");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_defaults_category() {
        let input = CreateExpenseInput {
            description: "  Electricity ".to_string(),
            category: None,
            amount: Decimal::new(123456, 3),
            expense_date: None,
        }
        .normalized();

        assert_eq!(input.description, "Electricity");
        assert_eq!(input.category.as_deref(), Some("general"));
        assert_eq!(input.amount, Decimal::new(12346, 2));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_invalid_expense_rejected() {
        let input = CreateExpenseInput {
            description: "   ".to_string(),
            category: Some("Utilities".to_string()),
            amount: Decimal::ZERO,
            expense_date: None,
        }
        .normalized();

        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("description"));
        assert!(errors.field_errors().contains_key("amount"));
    }
}
