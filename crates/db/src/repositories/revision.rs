use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use tripdesk_core::audit::RequestLogEntry;
use tripdesk_core::domain::request::RequestId;
use tripdesk_core::domain::revision::{Revision, RevisionId};
use tripdesk_core::domain::user::UserId;

use super::{RepositoryError, RevisionRepository};
use crate::DbPool;

pub struct SqlRevisionRepository {
    pool: DbPool,
}

impl SqlRevisionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T, E: std::fmt::Display>(result: Result<T, E>) -> Result<T, RepositoryError> {
    result.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_revision(row: &SqliteRow) -> Result<Revision, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;
    let request_id: String = decode(row.try_get("request_id"))?;
    let author_id: String = decode(row.try_get("author_id"))?;
    let comment: String = decode(row.try_get("comment"))?;
    let created_at: String = decode(row.try_get("created_at"))?;

    Ok(Revision {
        id: RevisionId(id),
        request_id: RequestId(request_id),
        author_id: UserId(author_id),
        comment,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| RepositoryError::Decode(format!("bad timestamp `{created_at}`: {e}")))?,
    })
}

#[async_trait::async_trait]
impl RevisionRepository for SqlRevisionRepository {
    async fn insert_with_status_change(
        &self,
        revision: &Revision,
        log: &RequestLogEntry,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO revisions (id, request_id, author_id, comment, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&revision.id.0)
        .bind(&revision.request_id.0)
        .bind(&revision.author_id.0)
        .bind(&revision.comment)
        .bind(revision.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE requests SET status = ? WHERE id = ?")
            .bind(log.resulting_status.as_str())
            .bind(&revision.request_id.0)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO request_logs (id, request_id, actor_id, report, resulting_status,
                 logged_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&log.id.0)
        .bind(&log.request_id.0)
        .bind(&log.actor_id.0)
        .bind(&log.report)
        .bind(log.resulting_status.as_str())
        .bind(log.logged_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_by_request(
        &self,
        request: &RequestId,
    ) -> Result<Vec<Revision>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, request_id, author_id, comment, created_at
             FROM revisions WHERE request_id = ? ORDER BY created_at ASC",
        )
        .bind(&request.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_revision).collect()
    }
}
