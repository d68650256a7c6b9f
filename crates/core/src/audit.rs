use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::request::{RequestId, RequestStatus};
use crate::domain::user::UserId;

/// The three mutating action kinds the audit trail distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    StatusChange,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::StatusChange => "status_change",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestLogId(pub String);

/// One immutable audit row. Written in the same transaction as the mutation
/// it describes; never updated or deleted afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLogEntry {
    pub id: RequestLogId,
    pub request_id: RequestId,
    pub actor_id: UserId,
    pub action: AuditAction,
    pub report: String,
    pub resulting_status: RequestStatus,
    pub logged_at: DateTime<Utc>,
}

impl RequestLogEntry {
    fn new(
        request_id: RequestId,
        actor_id: UserId,
        action: AuditAction,
        report: String,
        resulting_status: RequestStatus,
    ) -> Self {
        Self {
            id: RequestLogId(Uuid::new_v4().to_string()),
            request_id,
            actor_id,
            action,
            report,
            resulting_status,
            logged_at: Utc::now(),
        }
    }

    pub fn created(
        request_id: RequestId,
        actor_id: UserId,
        origin_city: &str,
        destination_count: usize,
    ) -> Self {
        let report = format!(
            "Request created with origin in {origin_city} and {destination_count} destination(s)."
        );
        Self::new(request_id, actor_id, AuditAction::Create, report, RequestStatus::PendingReview)
    }

    pub fn updated(request_id: RequestId, actor_id: UserId, resulting: RequestStatus) -> Self {
        let report =
            "Request updated. Fields such as motive, origin city, or destinations were modified."
                .to_string();
        Self::new(request_id, actor_id, AuditAction::Update, report, resulting)
    }

    pub fn status_changed(
        request_id: RequestId,
        actor_id: UserId,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Self {
        let report = format!("Status changed from '{from}' to '{to}'.");
        Self::new(request_id, actor_id, AuditAction::StatusChange, report, to)
    }
}
