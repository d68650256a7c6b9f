use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use tripdesk_core::domain::destination::RequestDestinationId;
use tripdesk_core::domain::reservation::{Reservation, ReservationId};

use super::{RepositoryError, ReservationRepository};
use crate::DbPool;

pub struct SqlReservationRepository {
    pool: DbPool,
}

impl SqlReservationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T, E: std::fmt::Display>(result: Result<T, E>) -> Result<T, RepositoryError> {
    result.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_reservation(row: &SqliteRow) -> Result<Reservation, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;
    let request_destination_id: String = decode(row.try_get("request_destination_id"))?;
    let title: String = decode(row.try_get("title"))?;
    let comments: String = decode(row.try_get("comments"))?;
    let price: String = decode(row.try_get("price"))?;
    let document_url: Option<String> = decode(row.try_get("document_url"))?;

    Ok(Reservation {
        id: ReservationId(id),
        request_destination_id: RequestDestinationId(request_destination_id),
        title,
        comments,
        price: Decimal::from_str(&price)
            .map_err(|e| RepositoryError::Decode(format!("bad decimal `{price}`: {e}")))?,
        document_url,
    })
}

#[async_trait::async_trait]
impl ReservationRepository for SqlReservationRepository {
    async fn find_by_id(
        &self,
        id: &ReservationId,
    ) -> Result<Option<Reservation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, request_destination_id, title, comments, price, document_url
             FROM reservations WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_reservation).transpose()
    }

    async fn insert(&self, reservation: &Reservation) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO reservations (id, request_destination_id, title, comments, price,
                 document_url)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&reservation.id.0)
        .bind(&reservation.request_destination_id.0)
        .bind(&reservation.title)
        .bind(&reservation.comments)
        .bind(reservation.price.to_string())
        .bind(&reservation.document_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save(&self, reservation: &Reservation) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE reservations SET title = ?, comments = ?, price = ?, document_url = ?
             WHERE id = ?",
        )
        .bind(&reservation.title)
        .bind(&reservation.comments)
        .bind(reservation.price.to_string())
        .bind(&reservation.document_url)
        .bind(&reservation.id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &ReservationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
