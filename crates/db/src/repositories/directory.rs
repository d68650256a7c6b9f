use sqlx::Row;

use tripdesk_core::domain::destination::DestinationId;
use tripdesk_core::domain::user::{Contact, DepartmentId, TravelAgencyId, UserId};

use super::{DestinationDirectory, RepositoryError, TravelAgencyDirectory, UserDirectory};
use crate::DbPool;

/// Read-only lookups over the seeded directory tables (users, destinations,
/// travel agencies). One type covers all three because the queries share a
/// pool and none of them mutate.
pub struct SqlDirectory {
    pool: DbPool,
}

impl SqlDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T, E: std::fmt::Display>(result: Result<T, E>) -> Result<T, RepositoryError> {
    result.map_err(|e| RepositoryError::Decode(e.to_string()))
}

#[async_trait::async_trait]
impl DestinationDirectory for SqlDirectory {
    async fn is_valid(&self, id: &DestinationId) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT count(*) AS n FROM destinations WHERE id = ?")
            .bind(&id.0)
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = decode(row.try_get("n"))?;
        Ok(n > 0)
    }

    async fn city_name(&self, id: &DestinationId) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query("SELECT city FROM destinations WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| decode(row.try_get("city"))).transpose()
    }
}

#[async_trait::async_trait]
impl UserDirectory for SqlDirectory {
    async fn user_by_id(&self, id: &UserId) -> Result<Option<Contact>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, email FROM users WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let id: String = decode(row.try_get("id"))?;
                let name: String = decode(row.try_get("name"))?;
                let email: String = decode(row.try_get("email"))?;
                Ok(Some(Contact { id: UserId(id), name, email }))
            }
            None => Ok(None),
        }
    }

    async fn approvers_in_department(
        &self,
        department: &DepartmentId,
        exclude: &UserId,
    ) -> Result<Vec<UserId>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id FROM users
             WHERE role = 'approver' AND department_id = ? AND id <> ?",
        )
        .bind(&department.0)
        .bind(&exclude.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| decode(row.try_get::<String, _>("id")).map(UserId))
            .collect()
    }

    async fn accounting_officers(&self) -> Result<Vec<UserId>, RepositoryError> {
        let rows = sqlx::query("SELECT id FROM users WHERE role = 'accounting_officer'")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| decode(row.try_get::<String, _>("id")).map(UserId))
            .collect()
    }
}

#[async_trait::async_trait]
impl TravelAgencyDirectory for SqlDirectory {
    async fn exists(&self, id: &TravelAgencyId) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT count(*) AS n FROM travel_agencies WHERE id = ?")
            .bind(&id.0)
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = decode(row.try_get("n"))?;
        Ok(n > 0)
    }

    async fn members(&self, id: &TravelAgencyId) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, email FROM users
             WHERE role = 'agency_agent' AND travel_agency_id = ?",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                let id: String = decode(row.try_get("id"))?;
                let name: String = decode(row.try_get("name"))?;
                let email: String = decode(row.try_get("email"))?;
                Ok(Contact { id: UserId(id), name, email })
            })
            .collect()
    }
}
