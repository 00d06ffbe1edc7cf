//! Running-balance payments shared by customers and suppliers

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{check_positive, round_money, PartyKind};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// A payment against a running balance
#[derive(Debug, Deserialize, Validate)]
pub struct PaymentInput {
    #[validate(custom = "check_positive")]
    pub amount: Decimal,
    pub note: Option<String>,
}

/// Balance after a recorded payment
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PaymentReceipt {
    pub id: Uuid,
    pub name: String,
    pub amount: Decimal,
    pub previous_balance: Decimal,
    pub balance: Decimal,
}

/// Reduce a customer's or supplier's balance by the paid amount
pub async fn record_payment(
    db: &PgPool,
    kind: PartyKind,
    party_id: Uuid,
    input: PaymentInput,
) -> AppResult<PaymentReceipt> {
    input.validate()?;
    let amount = round_money(input.amount);

    // Table name comes from a closed enum, never from the request
    let receipt = sqlx::query_as::<_, PaymentReceipt>(&format!(
        r#"
        UPDATE {table}
        SET balance = balance - $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, $2 AS amount, balance + $2 AS previous_balance, balance
        "#,
        table = kind.table()
    ))
    .bind(party_id)
    .bind(amount)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(kind.label().to_string()))?;

    tracing::info!(
        party = kind.label(),
        id = %party_id,
        %amount,
        balance = %receipt.balance,
        note = input.note.as_deref().unwrap_or(""),
        "Recorded payment"
    );

    Ok(receipt)
}
