use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{MySql, MySqlPool, Transaction};

use crate::core::{AppError, Currency, Result};
use crate::modules::installments::models::{InstallmentSchedule, InstallmentStatus};
use crate::modules::installments::repositories::InstallmentStore;

const SELECT_COLUMNS: &str = r#"
    id, order_reference, sequence_number, num_installments, amount, currency,
    due_date, status, attempt_count, token_reference, failed_at,
    failure_reason, transaction_reference, paid_at, created_at, updated_at
"#;

/// MySQL-backed installment schedule store
pub struct InstallmentRepository {
    pool: MySqlPool,
}

impl InstallmentRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn insert_with_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        entry: &InstallmentSchedule,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO installment_schedules (
                id, order_reference, sequence_number, num_installments, amount,
                currency, due_date, status, attempt_count, token_reference,
                failed_at, failure_reason, transaction_reference, paid_at,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.order_reference)
        .bind(entry.sequence_number)
        .bind(entry.num_installments)
        .bind(entry.amount)
        .bind(entry.currency.to_string())
        .bind(entry.due_date)
        .bind(entry.status.to_string())
        .bind(entry.attempt_count)
        .bind(&entry.token_reference)
        .bind(entry.failed_at)
        .bind(&entry.failure_reason)
        .bind(&entry.transaction_reference)
        .bind(entry.paid_at)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    fn fetch_query(filter: &str) -> String {
        format!(
            "SELECT {} FROM installment_schedules WHERE {}",
            SELECT_COLUMNS, filter
        )
    }
}

#[async_trait]
impl InstallmentStore for InstallmentRepository {
    async fn create_schedule(&self, entries: &[InstallmentSchedule]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for entry in entries {
            self.insert_with_tx(&mut tx, entry).await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn find_by_order(&self, order_reference: &str) -> Result<Vec<InstallmentSchedule>> {
        let rows = sqlx::query_as::<_, InstallmentScheduleRow>(&Self::fetch_query(
            "order_reference = ? ORDER BY sequence_number ASC",
        ))
        .bind(order_reference)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_entry(
        &self,
        order_reference: &str,
        sequence_number: i32,
    ) -> Result<Option<InstallmentSchedule>> {
        let row = sqlx::query_as::<_, InstallmentScheduleRow>(&Self::fetch_query(
            "order_reference = ? AND sequence_number = ?",
        ))
        .bind(order_reference)
        .bind(sequence_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_due(&self, today: NaiveDate) -> Result<Vec<InstallmentSchedule>> {
        let rows = sqlx::query_as::<_, InstallmentScheduleRow>(&Self::fetch_query(
            "status = 'scheduled' AND due_date <= ? \
             ORDER BY order_reference ASC, sequence_number ASC",
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_failed_since(&self, cutoff: NaiveDateTime) -> Result<Vec<InstallmentSchedule>> {
        let rows = sqlx::query_as::<_, InstallmentScheduleRow>(&Self::fetch_query(
            "status = 'failed' AND failed_at > ? \
             ORDER BY order_reference ASC, sequence_number ASC",
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_failed_until(&self, cutoff: NaiveDateTime) -> Result<Vec<InstallmentSchedule>> {
        let rows = sqlx::query_as::<_, InstallmentScheduleRow>(&Self::fetch_query(
            "status = 'failed' AND failed_at <= ? \
             ORDER BY order_reference ASC, sequence_number ASC",
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn claim_attempt(
        &self,
        id: &str,
        expected_status: InstallmentStatus,
        expected_attempts: i32,
    ) -> Result<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE installment_schedules
            SET attempt_count = attempt_count + 1, updated_at = UTC_TIMESTAMP()
            WHERE id = ? AND status = ? AND attempt_count = ?
            "#,
        )
        .bind(id)
        .bind(expected_status.to_string())
        .bind(expected_attempts)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn update(&self, entry: &InstallmentSchedule) -> Result<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE installment_schedules
            SET
                status = ?,
                attempt_count = ?,
                failed_at = ?,
                failure_reason = ?,
                transaction_reference = ?,
                paid_at = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(entry.status.to_string())
        .bind(entry.attempt_count)
        .bind(entry.failed_at)
        .bind(&entry.failure_reason)
        .bind(&entry.transaction_reference)
        .bind(entry.paid_at)
        .bind(entry.updated_at)
        .bind(&entry.id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::not_found(format!(
                "Installment {} not found",
                entry.id
            )));
        }

        Ok(())
    }

    async fn transition(
        &self,
        entry: &InstallmentSchedule,
        expected_status: InstallmentStatus,
    ) -> Result<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE installment_schedules
            SET
                status = ?,
                failed_at = ?,
                failure_reason = ?,
                transaction_reference = ?,
                paid_at = ?,
                updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(entry.status.to_string())
        .bind(entry.failed_at)
        .bind(&entry.failure_reason)
        .bind(&entry.transaction_reference)
        .bind(entry.paid_at)
        .bind(entry.updated_at)
        .bind(&entry.id)
        .bind(expected_status.to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }
}

/// Database row representation for the installment_schedules table
#[derive(sqlx::FromRow)]
struct InstallmentScheduleRow {
    id: String,
    order_reference: String,
    sequence_number: i32,
    num_installments: i32,
    amount: rust_decimal::Decimal,
    currency: String,
    due_date: NaiveDate,
    status: String,
    attempt_count: i32,
    token_reference: String,
    failed_at: Option<NaiveDateTime>,
    failure_reason: Option<String>,
    transaction_reference: Option<String>,
    paid_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<InstallmentScheduleRow> for InstallmentSchedule {
    type Error = AppError;

    fn try_from(row: InstallmentScheduleRow) -> Result<Self> {
        let status = InstallmentStatus::try_from(row.status).map_err(AppError::Internal)?;
        let currency: Currency = row.currency.parse().map_err(AppError::Internal)?;

        Ok(InstallmentSchedule {
            id: row.id,
            order_reference: row.order_reference,
            sequence_number: row.sequence_number,
            num_installments: row.num_installments,
            amount: row.amount,
            currency,
            due_date: row.due_date,
            status,
            attempt_count: row.attempt_count,
            token_reference: row.token_reference,
            failed_at: row.failed_at,
            failure_reason: row.failure_reason,
            transaction_reference: row.transaction_reference,
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
