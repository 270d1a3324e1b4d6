//! Late-fee charges

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use super::page_request;
use crate::{
    error::{AppError, AppResult},
    filter::FilterGrammar,
    models::{
        charge::{Charge, CreateCharge, UpdateCharge},
        transaction::BookTransaction,
        ListQuery, Paginated,
    },
    repository::Repository,
};

/// Largest daily fee `NUMERIC(10, 2)` can store
pub const MAX_DAILY_LATE_FEE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Decimal places kept by the fee and total columns
pub const FEE_SCALE: u32 = 2;

/// Days late and the daily fee; the total is always derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LateFee {
    pub days_late: i32,
    pub daily_late_fee: Decimal,
    total: Decimal,
}

impl LateFee {
    /// Rejects values the charges table would round or refuse
    pub fn new(days_late: i32, daily_late_fee: Decimal) -> AppResult<Self> {
        if days_late < 0 {
            return Err(AppError::Validation("days_late cannot be negative".to_string()));
        }
        if daily_late_fee < Decimal::ZERO {
            return Err(AppError::Validation("daily_late_fee cannot be negative".to_string()));
        }
        if daily_late_fee > MAX_DAILY_LATE_FEE {
            return Err(AppError::Validation(format!(
                "daily_late_fee cannot exceed {}",
                MAX_DAILY_LATE_FEE
            )));
        }
        if daily_late_fee.normalize().scale() > FEE_SCALE {
            return Err(AppError::Validation(format!(
                "daily_late_fee cannot have more than {} decimal places",
                FEE_SCALE
            )));
        }

        let total = Decimal::from(days_late)
            .checked_mul(daily_late_fee)
            .ok_or_else(|| AppError::Validation("late fee total is out of range".to_string()))?;

        Ok(Self {
            days_late,
            daily_late_fee,
            total,
        })
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Whole days between the due date and the return (or `now`), never negative
    pub fn days_late_for(transaction: &BookTransaction, now: DateTime<Utc>) -> i32 {
        let end = transaction.return_at.unwrap_or(now);
        let days = (end - transaction.due_date).num_days().max(0);
        i32::try_from(days).unwrap_or(i32::MAX)
    }
}

#[derive(Clone)]
pub struct ChargesService {
    repository: Repository,
    grammar: FilterGrammar,
}

impl ChargesService {
    pub fn new(repository: Repository, grammar: FilterGrammar) -> Self {
        Self { repository, grammar }
    }

    /// Record a charge for a transaction on behalf of `user_id`
    pub async fn create(&self, user_id: Uuid, request: CreateCharge) -> AppResult<Charge> {
        request.validate()?;

        self.repository.users.find_by_id(user_id).await?;
        let transaction = self
            .repository
            .transactions
            .find_by_id(request.transaction_id)
            .await?;

        let now = Utc::now();
        let days_late = request
            .days_late
            .unwrap_or_else(|| LateFee::days_late_for(&transaction, now));
        let fee = LateFee::new(days_late, request.daily_late_fee)?;

        let charge = Charge {
            id: Uuid::new_v4(),
            transaction_id: transaction.id,
            user_id,
            days_late: fee.days_late,
            daily_late_fee: fee.daily_late_fee,
            total: fee.total(),
            created_at: now,
            updated_at: now,
        };

        let created = self.repository.charges.create(&charge).await?;
        tracing::info!(
            "Charge {} of {} recorded for transaction {}",
            created.id,
            created.total,
            created.transaction_id
        );
        Ok(created)
    }

    /// Partial update; the total is recomputed from the resulting values
    pub async fn update(&self, id: Uuid, request: UpdateCharge) -> AppResult<Charge> {
        request.validate()?;

        let mut charge = self.repository.charges.find_by_id(id).await?;
        let fee = LateFee::new(
            request.days_late.unwrap_or(charge.days_late),
            request.daily_late_fee.unwrap_or(charge.daily_late_fee),
        )?;

        charge.days_late = fee.days_late;
        charge.daily_late_fee = fee.daily_late_fee;
        charge.total = fee.total();

        self.repository.charges.update(&charge).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repository.charges.delete(id).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Charge> {
        self.repository.charges.find_by_id(id).await
    }

    pub async fn list(&self, query: &ListQuery) -> AppResult<Paginated<Charge>> {
        let request = page_request::<Charge>(&self.grammar, query, false)?;
        let (rows, total) = self.repository.charges.find_all(&request).await?;
        Ok(Paginated::new("Charges retrieved successfully", &request, rows, total))
    }

    pub async fn by_transaction(&self, transaction_id: Uuid) -> AppResult<Vec<Charge>> {
        self.repository.transactions.find_by_id(transaction_id).await?;
        self.repository.charges.find_by_transaction_id(transaction_id).await
    }

    pub async fn by_user(&self, user_id: Uuid) -> AppResult<Vec<Charge>> {
        self.repository.charges.find_by_user_id(user_id).await
    }
}
