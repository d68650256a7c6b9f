//! Shared test world: every service wired over one in-memory backend with a
//! recording notifier and a seeded assigner.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use tripdesk_core::domain::destination::{DestinationDraft, DestinationId};
use tripdesk_core::domain::request::{Priority, Request, RequestId, RequestStatus};
use tripdesk_core::domain::user::{
    Actor, DepartmentId, DirectoryUser, Role, TravelAgencyId, UserId,
};
use tripdesk_core::notify::{Notifier, RecordingNotifier};
use tripdesk_core::RoleAssigner;
use tripdesk_db::repositories::InMemoryBackend;

use crate::requests::{NewRequest, RequestLifecycle};
use crate::reservations::ReservationService;
use crate::revisions::RevisionService;
use crate::vouchers::VoucherService;

pub const OWNER: &str = "u-owner";
pub const ADMIN: &str = "u-admin";
pub const SOI: &str = "u-soi";
pub const AGENT: &str = "u-agent";
pub const AGENCY: &str = "ag-norte";
pub const DEPT: &str = "d-sales";
pub const ORIGIN: &str = "loc-mty";
pub const STOP: &str = "loc-cdmx";

pub struct World {
    pub backend: InMemoryBackend,
    pub notifier: Arc<RecordingNotifier>,
    pub lifecycle: RequestLifecycle,
    pub vouchers: VoucherService,
    pub reservations: ReservationService,
    pub revisions: RevisionService,
}

impl World {
    pub async fn seeded() -> Self {
        Self::with_parts(Arc::new(RecordingNotifier::default()), RoleAssigner::seeded(7)).await
    }

    pub async fn with_parts(notifier: Arc<RecordingNotifier>, assigner: RoleAssigner) -> Self {
        let backend = InMemoryBackend::new();
        seed_directory(&backend).await;
        let lifecycle = build_lifecycle(&backend, notifier.clone(), assigner);
        Self {
            vouchers: VoucherService::new(
                Arc::new(backend.clone()),
                Arc::new(backend.clone()),
            ),
            reservations: ReservationService::new(
                Arc::new(backend.clone()),
                Arc::new(backend.clone()),
            ),
            revisions: RevisionService::new(
                Arc::new(backend.clone()),
                Arc::new(backend.clone()),
                Arc::new(backend.clone()),
                notifier.clone(),
            ),
            backend,
            notifier,
            lifecycle,
        }
    }

    pub fn owner(&self) -> Actor {
        Actor::in_department(UserId(OWNER.to_string()), DepartmentId(DEPT.to_string()))
    }

    pub fn admin(&self) -> Actor {
        Actor::new(UserId(ADMIN.to_string()))
    }

    pub fn soi(&self) -> Actor {
        Actor::new(UserId(SOI.to_string()))
    }

    pub fn agent(&self) -> Actor {
        Actor::agency_member(UserId(AGENT.to_string()), TravelAgencyId(AGENCY.to_string()))
    }

    pub async fn create_request(&self, priority: Priority) -> Request {
        self.lifecycle
            .create(&self.owner(), new_request(priority))
            .await
            .expect("create request")
    }

    /// Walks a fresh request forward through the happy path until it reaches
    /// `target`, using the right actor for each step.
    pub async fn request_in(&self, target: RequestStatus) -> Request {
        let request = self.create_request(Priority::Medium).await;
        let id = request.id.clone();
        let steps: &[RequestStatus] = &[
            RequestStatus::PendingReservations,
            RequestStatus::PendingAccountingApproval,
            RequestStatus::InProgress,
            RequestStatus::PendingVouchersApproval,
            RequestStatus::PendingRefundApproval,
            RequestStatus::Completed,
        ];
        let mut current = request;
        for step in steps {
            if current.status == target {
                break;
            }
            current = self.advance(&id, *step).await;
        }
        assert_eq!(current.status, target, "harness cannot reach the requested status");
        current
    }

    async fn advance(&self, id: &RequestId, to: RequestStatus) -> Request {
        match to {
            RequestStatus::PendingReservations => self
                .lifecycle
                .approve(&self.admin(), id, TravelAgencyId(AGENCY.to_string()))
                .await
                .expect("approve"),
            RequestStatus::PendingAccountingApproval => self
                .lifecycle
                .reservations_finished(&self.agent(), id)
                .await
                .expect("finish reservations"),
            RequestStatus::InProgress => self
                .lifecycle
                .accounting_approve(&self.soi(), id)
                .await
                .expect("accounting approval"),
            RequestStatus::PendingVouchersApproval => self
                .lifecycle
                .vouchers_uploaded(&self.owner(), id)
                .await
                .expect("vouchers uploaded"),
            RequestStatus::PendingRefundApproval => self
                .lifecycle
                .vouchers_approve(&self.admin(), id)
                .await
                .expect("vouchers approved"),
            RequestStatus::Completed => {
                self.lifecycle.complete(&self.soi(), id).await.expect("complete")
            }
            other => panic!("harness does not advance to {other}"),
        }
    }
}

pub fn build_lifecycle(
    backend: &InMemoryBackend,
    notifier: Arc<dyn Notifier>,
    assigner: RoleAssigner,
) -> RequestLifecycle {
    RequestLifecycle::new(
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        notifier,
        assigner,
    )
}

pub async fn seed_directory(backend: &InMemoryBackend) {
    backend
        .add_user(user(OWNER, "Ana Flores", Role::Employee, Some(DEPT), None))
        .await;
    backend
        .add_user(user(ADMIN, "Bruno Salas", Role::Approver, Some(DEPT), None))
        .await;
    backend
        .add_user(user(SOI, "Diego Mena", Role::AccountingOfficer, None, None))
        .await;
    backend
        .add_user(user(AGENT, "Elena Ruiz", Role::AgencyAgent, None, Some(AGENCY)))
        .await;
    backend.add_destination(DestinationId(ORIGIN.to_string()), "Monterrey").await;
    backend.add_destination(DestinationId(STOP.to_string()), "Mexico City").await;
    backend.add_agency(TravelAgencyId(AGENCY.to_string())).await;
}

pub fn user(
    id: &str,
    name: &str,
    role: Role,
    department: Option<&str>,
    agency: Option<&str>,
) -> DirectoryUser {
    DirectoryUser {
        id: UserId(id.to_string()),
        name: name.to_string(),
        email: format!("{id}@example.com"),
        role,
        department_id: department.map(|d| DepartmentId(d.to_string())),
        travel_agency_id: agency.map(|a| TravelAgencyId(a.to_string())),
    }
}

pub fn leg(order: u32, is_last: bool) -> DestinationDraft {
    let arrival = Utc::now() + Duration::days(7);
    DestinationDraft {
        destination_id: DestinationId(STOP.to_string()),
        order_index: order,
        stay_days: 3,
        arrival,
        departure: arrival + Duration::days(3),
        hotel_required: true,
        plane_required: true,
        is_last,
        details: None,
    }
}

pub fn new_request(priority: Priority) -> NewRequest {
    NewRequest {
        title: "Client onsite".to_string(),
        motive: "Quarterly review with the client.".to_string(),
        origin_id: DestinationId(ORIGIN.to_string()),
        advance_money: Decimal::new(500000, 2),
        requirements: None,
        priority,
        destinations: vec![leg(1, false), leg(2, true)],
    }
}
