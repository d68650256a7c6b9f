use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use tripdesk_core::audit::{AuditAction, RequestLogEntry, RequestLogId};
use tripdesk_core::domain::destination::{
    DestinationId, RequestDestination, RequestDestinationId,
};
use tripdesk_core::domain::request::{Priority, Request, RequestId, RequestStatus};
use tripdesk_core::domain::user::{TravelAgencyId, UserId};

use super::{DestinationParent, RepositoryError, RequestRepository};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T, E: std::fmt::Display>(result: Result<T, E>) -> Result<T, RepositoryError> {
    result.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad timestamp `{raw}`: {e}")))
}

fn parse_status(raw: &str) -> Result<RequestStatus, RepositoryError> {
    RequestStatus::parse(raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown request status `{raw}`")))
}

fn parse_priority(raw: &str) -> Result<Priority, RepositoryError> {
    Priority::parse(raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown priority `{raw}`")))
}

fn parse_decimal(raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|e| RepositoryError::Decode(format!("bad decimal `{raw}`: {e}")))
}

const REQUEST_COLUMNS: &str = "id, owner_id, origin_id, admin_id, soi_id, travel_agency_id, \
     title, motive, advance_money, requirements, priority, status, created_at";

fn row_to_request(row: &SqliteRow) -> Result<Request, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;
    let owner_id: String = decode(row.try_get("owner_id"))?;
    let origin_id: String = decode(row.try_get("origin_id"))?;
    let admin_id: String = decode(row.try_get("admin_id"))?;
    let soi_id: String = decode(row.try_get("soi_id"))?;
    let travel_agency_id: Option<String> = decode(row.try_get("travel_agency_id"))?;
    let title: String = decode(row.try_get("title"))?;
    let motive: String = decode(row.try_get("motive"))?;
    let advance_money: String = decode(row.try_get("advance_money"))?;
    let requirements: Option<String> = decode(row.try_get("requirements"))?;
    let priority: String = decode(row.try_get("priority"))?;
    let status: String = decode(row.try_get("status"))?;
    let created_at: String = decode(row.try_get("created_at"))?;

    Ok(Request {
        id: RequestId(id),
        owner_id: UserId(owner_id),
        origin_id: DestinationId(origin_id),
        admin_id: UserId(admin_id),
        soi_id: UserId(soi_id),
        travel_agency_id: travel_agency_id.map(TravelAgencyId),
        title,
        motive,
        advance_money: parse_decimal(&advance_money)?,
        requirements,
        priority: parse_priority(&priority)?,
        status: parse_status(&status)?,
        created_at: parse_timestamp(&created_at)?,
        destinations: Vec::new(),
    })
}

fn row_to_destination(row: &SqliteRow) -> Result<RequestDestination, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;
    let request_id: String = decode(row.try_get("request_id"))?;
    let destination_id: String = decode(row.try_get("destination_id"))?;
    let order_index: i64 = decode(row.try_get("order_index"))?;
    let stay_days: i64 = decode(row.try_get("stay_days"))?;
    let arrival: String = decode(row.try_get("arrival"))?;
    let departure: String = decode(row.try_get("departure"))?;
    let hotel_required: bool = decode(row.try_get("hotel_required"))?;
    let plane_required: bool = decode(row.try_get("plane_required"))?;
    let is_last: bool = decode(row.try_get("is_last"))?;
    let details: Option<String> = decode(row.try_get("details"))?;

    Ok(RequestDestination {
        id: RequestDestinationId(id),
        request_id: RequestId(request_id),
        destination_id: DestinationId(destination_id),
        order_index: order_index as u32,
        stay_days: stay_days as u32,
        arrival: parse_timestamp(&arrival)?,
        departure: parse_timestamp(&departure)?,
        hotel_required,
        plane_required,
        is_last,
        details,
    })
}

fn row_to_log(row: &SqliteRow) -> Result<RequestLogEntry, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;
    let request_id: String = decode(row.try_get("request_id"))?;
    let actor_id: String = decode(row.try_get("actor_id"))?;
    let report: String = decode(row.try_get("report"))?;
    let resulting_status: String = decode(row.try_get("resulting_status"))?;
    let logged_at: String = decode(row.try_get("logged_at"))?;

    // Action kind is recoverable from the report template; it is not stored.
    let action = if report.starts_with("Request created") {
        AuditAction::Create
    } else if report.starts_with("Request updated") {
        AuditAction::Update
    } else {
        AuditAction::StatusChange
    };

    Ok(RequestLogEntry {
        id: RequestLogId(id),
        request_id: RequestId(request_id),
        actor_id: UserId(actor_id),
        action,
        report,
        resulting_status: parse_status(&resulting_status)?,
        logged_at: parse_timestamp(&logged_at)?,
    })
}

impl SqlRequestRepository {
    async fn attach_destinations(
        &self,
        mut request: Request,
    ) -> Result<Request, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, request_id, destination_id, order_index, stay_days, arrival, departure,
                    hotel_required, plane_required, is_last, details
             FROM request_destinations WHERE request_id = ? ORDER BY order_index ASC",
        )
        .bind(&request.id.0)
        .fetch_all(&self.pool)
        .await?;

        request.destinations =
            rows.iter().map(row_to_destination).collect::<Result<Vec<_>, _>>()?;
        Ok(request)
    }

    async fn attach_all(
        &self,
        rows: Vec<SqliteRow>,
    ) -> Result<Vec<Request>, RepositoryError> {
        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            let request = row_to_request(row)?;
            requests.push(self.attach_destinations(request).await?);
        }
        Ok(requests)
    }
}

async fn insert_destination(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    destination: &RequestDestination,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO request_destinations (id, request_id, destination_id, order_index,
             stay_days, arrival, departure, hotel_required, plane_required, is_last, details)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&destination.id.0)
    .bind(&destination.request_id.0)
    .bind(&destination.destination_id.0)
    .bind(destination.order_index as i64)
    .bind(destination.stay_days as i64)
    .bind(destination.arrival.to_rfc3339())
    .bind(destination.departure.to_rfc3339())
    .bind(destination.hotel_required)
    .bind(destination.plane_required)
    .bind(destination.is_last)
    .bind(&destination.details)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_log(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    log: &RequestLogEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO request_logs (id, request_id, actor_id, report, resulting_status, logged_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&log.id.0)
    .bind(&log.request_id.0)
    .bind(&log.actor_id.0)
    .bind(&log.report)
    .bind(log.resulting_status.as_str())
    .bind(log.logged_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?"))
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref row) => {
                let request = row_to_request(row)?;
                Ok(Some(self.attach_destinations(request).await?))
            }
            None => Ok(None),
        }
    }

    async fn insert_with_log(
        &self,
        request: &Request,
        log: &RequestLogEntry,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO requests (id, owner_id, origin_id, admin_id, soi_id, travel_agency_id,
                 title, motive, advance_money, requirements, priority, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.owner_id.0)
        .bind(&request.origin_id.0)
        .bind(&request.admin_id.0)
        .bind(&request.soi_id.0)
        .bind(request.travel_agency_id.as_ref().map(|agency| agency.0.clone()))
        .bind(&request.title)
        .bind(&request.motive)
        .bind(request.advance_money.to_string())
        .bind(&request.requirements)
        .bind(request.priority.as_str())
        .bind(request.status.as_str())
        .bind(request.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for destination in &request.destinations {
            insert_destination(&mut tx, destination).await?;
        }
        insert_log(&mut tx, log).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn replace_with_log(
        &self,
        request: &Request,
        log: &RequestLogEntry,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE requests SET origin_id = ?, motive = ?, advance_money = ?,
                 requirements = ?, priority = ?, status = ?
             WHERE id = ?",
        )
        .bind(&request.origin_id.0)
        .bind(&request.motive)
        .bind(request.advance_money.to_string())
        .bind(&request.requirements)
        .bind(request.priority.as_str())
        .bind(request.status.as_str())
        .bind(&request.id.0)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM request_destinations WHERE request_id = ?")
            .bind(&request.id.0)
            .execute(&mut *tx)
            .await?;
        for destination in &request.destinations {
            insert_destination(&mut tx, destination).await?;
        }
        insert_log(&mut tx, log).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_status_with_log(
        &self,
        id: &RequestId,
        new_status: RequestStatus,
        travel_agency_id: Option<&TravelAgencyId>,
        log: &RequestLogEntry,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        match travel_agency_id {
            Some(agency) => {
                sqlx::query("UPDATE requests SET status = ?, travel_agency_id = ? WHERE id = ?")
                    .bind(new_status.as_str())
                    .bind(&agency.0)
                    .bind(&id.0)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                sqlx::query("UPDATE requests SET status = ? WHERE id = ?")
                    .bind(new_status.as_str())
                    .bind(&id.0)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        insert_log(&mut tx, log).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Request>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE owner_id = ?"
        ))
        .bind(&owner.0)
        .fetch_all(&self.pool)
        .await?;
        self.attach_all(rows).await
    }

    async fn list_pending_review_for_admin(
        &self,
        admin: &UserId,
    ) -> Result<Vec<Request>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests
             WHERE admin_id = ? AND status = 'Pending Review'
             ORDER BY CASE priority
                 WHEN 'high' THEN 1
                 WHEN 'medium' THEN 2
                 WHEN 'low' THEN 3
             END ASC"
        ))
        .bind(&admin.0)
        .fetch_all(&self.pool)
        .await?;
        self.attach_all(rows).await
    }

    async fn list_by_soi(&self, soi: &UserId) -> Result<Vec<Request>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE soi_id = ?"
        ))
        .bind(&soi.0)
        .fetch_all(&self.pool)
        .await?;
        self.attach_all(rows).await
    }

    async fn list_pending_refund_for_soi(
        &self,
        soi: &UserId,
    ) -> Result<Vec<Request>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests
             WHERE soi_id = ? AND status = 'Pending Refund Approval'
             ORDER BY CASE priority
                 WHEN 'high' THEN 1
                 WHEN 'medium' THEN 2
                 WHEN 'low' THEN 3
             END ASC"
        ))
        .bind(&soi.0)
        .fetch_all(&self.pool)
        .await?;
        self.attach_all(rows).await
    }

    async fn list_pending_reservations_for_agency(
        &self,
        agency: &TravelAgencyId,
    ) -> Result<Vec<Request>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests
             WHERE travel_agency_id = ? AND status = 'Pending Reservations'
             ORDER BY CASE priority
                 WHEN 'high' THEN 1
                 WHEN 'medium' THEN 2
                 WHEN 'low' THEN 3
             END ASC"
        ))
        .bind(&agency.0)
        .fetch_all(&self.pool)
        .await?;
        self.attach_all(rows).await
    }

    async fn logs_for_request(
        &self,
        id: &RequestId,
    ) -> Result<Vec<RequestLogEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, request_id, actor_id, report, resulting_status, logged_at
             FROM request_logs WHERE request_id = ? ORDER BY logged_at ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_log).collect()
    }

    async fn find_destination_parent(
        &self,
        id: &RequestDestinationId,
    ) -> Result<Option<DestinationParent>, RepositoryError> {
        let row = sqlx::query(
            "SELECT r.id AS request_id, r.status, r.travel_agency_id
             FROM request_destinations rd
             JOIN requests r ON r.id = rd.request_id
             WHERE rd.id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let request_id: String = decode(row.try_get("request_id"))?;
                let status: String = decode(row.try_get("status"))?;
                let travel_agency_id: Option<String> =
                    decode(row.try_get("travel_agency_id"))?;
                Ok(Some(DestinationParent {
                    request_id: RequestId(request_id),
                    status: parse_status(&status)?,
                    travel_agency_id: travel_agency_id.map(TravelAgencyId),
                }))
            }
            None => Ok(None),
        }
    }
}
