use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::RequestId;
use super::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevisionId(pub String);

impl RevisionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Formal change-request feedback from the assigned approver. Creating one
/// always moves the parent request to `Changes Needed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    pub request_id: RequestId,
    pub author_id: UserId,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Revision {
    pub fn new(request_id: RequestId, author_id: UserId, comment: String) -> Self {
        Self {
            id: RevisionId::generate(),
            request_id,
            author_id,
            comment,
            created_at: Utc::now(),
        }
    }
}
