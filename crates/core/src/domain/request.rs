use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::destination::{DestinationId, RequestDestination};
use super::user::{TravelAgencyId, UserId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Lifecycle status of a travel request.
///
/// The string literals are wire contract: existing consumers match on the
/// exact casing and spelling, so `as_str` must never drift.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "Pending Review")]
    PendingReview,
    #[serde(rename = "Changes Needed")]
    ChangesNeeded,
    #[serde(rename = "Denied")]
    Denied,
    #[serde(rename = "Cancelled")]
    Cancelled,
    #[serde(rename = "Pending Reservations")]
    PendingReservations,
    #[serde(rename = "Pending Accounting Approval")]
    PendingAccountingApproval,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Pending Vouchers Approval")]
    PendingVouchersApproval,
    #[serde(rename = "Pending Refund Approval")]
    PendingRefundApproval,
    #[serde(rename = "Completed")]
    Completed,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 10] = [
        Self::PendingReview,
        Self::ChangesNeeded,
        Self::Denied,
        Self::Cancelled,
        Self::PendingReservations,
        Self::PendingAccountingApproval,
        Self::InProgress,
        Self::PendingVouchersApproval,
        Self::PendingRefundApproval,
        Self::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "Pending Review",
            Self::ChangesNeeded => "Changes Needed",
            Self::Denied => "Denied",
            Self::Cancelled => "Cancelled",
            Self::PendingReservations => "Pending Reservations",
            Self::PendingAccountingApproval => "Pending Accounting Approval",
            Self::InProgress => "In Progress",
            Self::PendingVouchersApproval => "Pending Vouchers Approval",
            Self::PendingRefundApproval => "Pending Refund Approval",
            Self::Completed => "Completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.as_str() == value)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Denied | Self::Cancelled | Self::Completed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request urgency. High sorts before medium, medium before low.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// The travel request aggregate.
///
/// `admin_id` and `soi_id` are assigned once at creation and never change.
/// `travel_agency_id` stays `None` until the department approver approves the
/// request into `Pending Reservations`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub owner_id: UserId,
    pub origin_id: DestinationId,
    pub admin_id: UserId,
    pub soi_id: UserId,
    pub travel_agency_id: Option<TravelAgencyId>,
    pub title: String,
    pub motive: String,
    pub advance_money: Decimal,
    pub requirements: Option<String>,
    pub priority: Priority,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub destinations: Vec<RequestDestination>,
}

impl Request {
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self.status, next),
            (PendingReview, PendingReview)
                | (ChangesNeeded, PendingReview)
                | (PendingReview, PendingReservations)
                | (PendingReview, Denied)
                | (PendingReview, Cancelled)
                | (ChangesNeeded, Cancelled)
                | (PendingReview, ChangesNeeded)
                | (ChangesNeeded, ChangesNeeded)
                | (PendingReservations, PendingAccountingApproval)
                | (PendingAccountingApproval, InProgress)
                | (InProgress, PendingVouchersApproval)
                | (PendingVouchersApproval, PendingRefundApproval)
                | (PendingRefundApproval, Completed)
        )
    }

    pub fn transition_to(&mut self, next: RequestStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidTransition { from: self.status, to: next })
    }
}
