use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::connect_with_settings;

    const MANAGED_TABLES: &[&str] = &[
        "departments",
        "travel_agencies",
        "destinations",
        "users",
        "requests",
        "request_destinations",
        "request_logs",
        "reservations",
        "vouchers",
        "revisions",
    ];

    #[tokio::test]
    async fn migrations_create_all_managed_tables() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("in-memory pool");
        run_pending(&pool).await.expect("apply migrations");

        for table in MANAGED_TABLES {
            let row = sqlx::query(
                "SELECT count(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .expect("query sqlite_master");
            let n: i64 = row.get("n");
            assert_eq!(n, 1, "expected table `{table}` to exist");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("in-memory pool");
        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run");
    }
}
