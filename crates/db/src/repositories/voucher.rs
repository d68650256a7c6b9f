use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use tripdesk_core::domain::request::RequestId;
use tripdesk_core::domain::user::UserId;
use tripdesk_core::domain::voucher::{Voucher, VoucherId, VoucherStatus};

use super::{RepositoryError, VoucherRepository};
use crate::DbPool;

pub struct SqlVoucherRepository {
    pool: DbPool,
}

impl SqlVoucherRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T, E: std::fmt::Display>(result: Result<T, E>) -> Result<T, RepositoryError> {
    result.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_voucher(row: &SqliteRow) -> Result<Voucher, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;
    let request_id: String = decode(row.try_get("request_id"))?;
    let classification: String = decode(row.try_get("classification"))?;
    let amount: String = decode(row.try_get("amount"))?;
    let tax_type: String = decode(row.try_get("tax_type"))?;
    let currency: String = decode(row.try_get("currency"))?;
    let issued_on: String = decode(row.try_get("issued_on"))?;
    let file_url_pdf: Option<String> = decode(row.try_get("file_url_pdf"))?;
    let file_url_xml: Option<String> = decode(row.try_get("file_url_xml"))?;
    let status: String = decode(row.try_get("status"))?;
    let approver_id: String = decode(row.try_get("approver_id"))?;

    Ok(Voucher {
        id: VoucherId(id),
        request_id: RequestId(request_id),
        classification,
        amount: Decimal::from_str(&amount)
            .map_err(|e| RepositoryError::Decode(format!("bad decimal `{amount}`: {e}")))?,
        tax_type,
        currency,
        issued_on: NaiveDate::parse_from_str(&issued_on, "%Y-%m-%d")
            .map_err(|e| RepositoryError::Decode(format!("bad date `{issued_on}`: {e}")))?,
        file_url_pdf,
        file_url_xml,
        status: VoucherStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown voucher status `{status}`")))?,
        approver_id: UserId(approver_id),
    })
}

const VOUCHER_COLUMNS: &str = "id, request_id, classification, amount, tax_type, currency, \
     issued_on, file_url_pdf, file_url_xml, status, approver_id";

#[async_trait::async_trait]
impl VoucherRepository for SqlVoucherRepository {
    async fn find_by_id(&self, id: &VoucherId) -> Result<Option<Voucher>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE id = ?"))
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;
        row.as_ref().map(row_to_voucher).transpose()
    }

    async fn insert(&self, voucher: &Voucher) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO vouchers (id, request_id, classification, amount, tax_type, currency,
                 issued_on, file_url_pdf, file_url_xml, status, approver_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&voucher.id.0)
        .bind(&voucher.request_id.0)
        .bind(&voucher.classification)
        .bind(voucher.amount.to_string())
        .bind(&voucher.tax_type)
        .bind(&voucher.currency)
        .bind(voucher.issued_on.format("%Y-%m-%d").to_string())
        .bind(&voucher.file_url_pdf)
        .bind(&voucher.file_url_xml)
        .bind(voucher.status.as_str())
        .bind(&voucher.approver_id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save(&self, voucher: &Voucher) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE vouchers SET classification = ?, amount = ?, tax_type = ?, currency = ?,
                 issued_on = ?, file_url_pdf = ?, file_url_xml = ?, status = ?
             WHERE id = ?",
        )
        .bind(&voucher.classification)
        .bind(voucher.amount.to_string())
        .bind(&voucher.tax_type)
        .bind(&voucher.currency)
        .bind(voucher.issued_on.format("%Y-%m-%d").to_string())
        .bind(&voucher.file_url_pdf)
        .bind(&voucher.file_url_xml)
        .bind(voucher.status.as_str())
        .bind(&voucher.id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &VoucherId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM vouchers WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_status(
        &self,
        id: &VoucherId,
        status: VoucherStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE vouchers SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_request(
        &self,
        request: &RequestId,
    ) -> Result<Vec<Voucher>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE request_id = ? ORDER BY issued_on ASC"
        ))
        .bind(&request.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_voucher).collect()
    }
}
