use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical seed requests and the properties `verify` checks for each.
const SEED_REQUESTS: &[SeedRequestContract] = &[
    SeedRequestContract {
        request_id: "req-pending-001",
        status: "Pending Review",
        priority: "high",
        admin_id: "user-admin-001",
        expected_destination_count: 1,
        expected_log_count: 1,
        description: "Fresh request awaiting department review",
    },
    SeedRequestContract {
        request_id: "req-reservations-001",
        status: "Pending Reservations",
        priority: "medium",
        admin_id: "user-admin-001",
        expected_destination_count: 2,
        expected_log_count: 2,
        description: "Approved request assigned to the travel agency",
    },
];

const SEED_USER_IDS: &[&str] = &[
    "user-owner-001",
    "user-admin-001",
    "user-admin-002",
    "user-soi-001",
    "user-agent-001",
    "user-agent-002",
];

const SEED_REQUEST_IDS: &[&str] = &["req-pending-001", "req-reservations-001"];

/// Deterministic dataset covering both halves of the lifecycle: one request
/// still in review and one already handed to the agency.
pub struct SeedDataset;

impl SeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    /// Load the dataset. Safe to run repeatedly.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let requests_seeded = SEED_REQUESTS
            .iter()
            .map(|contract| RequestSeedInfo {
                request_id: contract.request_id,
                status: contract.status,
                description: contract.description,
            })
            .collect();
        Ok(SeedResult { requests_seeded })
    }

    /// Verify the seeded rows still match the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let user_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM users WHERE id IN {}",
            sql_array_from_ids(SEED_USER_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("seed-users", user_count == SEED_USER_IDS.len() as i64));

        for contract in SEED_REQUESTS {
            let request_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM requests
                     WHERE id = ?1 AND status = ?2 AND priority = ?3 AND admin_id = ?4)",
            )
            .bind(contract.request_id)
            .bind(contract.status)
            .bind(contract.priority)
            .bind(contract.admin_id)
            .fetch_one(pool)
            .await?;
            checks.push((contract.request_id, request_ok == 1));

            let destination_count: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM request_destinations WHERE request_id = ?1",
            )
            .bind(contract.request_id)
            .fetch_one(pool)
            .await?;
            checks.push((
                contract.destination_count_label(),
                destination_count == contract.expected_destination_count,
            ));

            let log_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM request_logs WHERE request_id = ?1")
                    .bind(contract.request_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((contract.log_count_label(), log_count == contract.expected_log_count));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the seeded rows from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_requests = sql_array_from_ids(SEED_REQUEST_IDS);
        sqlx::query(&format!("DELETE FROM request_logs WHERE request_id IN {quoted_requests}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM requests WHERE id IN {quoted_requests}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "DELETE FROM users WHERE id IN {}",
            sql_array_from_ids(SEED_USER_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM destinations WHERE id LIKE 'dest-%'")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM travel_agencies WHERE id LIKE 'agency-%'")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM departments WHERE id LIKE 'dept-%'")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedRequestContract {
    request_id: &'static str,
    status: &'static str,
    priority: &'static str,
    admin_id: &'static str,
    expected_destination_count: i64,
    expected_log_count: i64,
    description: &'static str,
}

impl SeedRequestContract {
    fn destination_count_label(&self) -> &'static str {
        match self.request_id {
            "req-pending-001" => "req-pending-destination-count",
            _ => "req-reservations-destination-count",
        }
    }

    fn log_count_label(&self) -> &'static str {
        match self.request_id {
            "req-pending-001" => "req-pending-log-count",
            _ => "req-reservations-log-count",
        }
    }
}

// Interpolation instead of binding: callers only pass the compile-time id
// constants above, and SQLite has no array bind for IN lists.
fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub requests_seeded: Vec<RequestSeedInfo>,
}

#[derive(Debug)]
pub struct RequestSeedInfo {
    pub request_id: &'static str,
    pub status: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
