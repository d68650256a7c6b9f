use tripdesk_core::audit::RequestLogEntry;
use tripdesk_core::domain::request::{Request, RequestId, RequestStatus};
use tripdesk_core::domain::user::{Actor, TravelAgencyId};
use tripdesk_core::notify::messages;

use crate::error::EngineError;
use crate::requests::RequestLifecycle;

/// Role-gated status transitions. Each method loads the request, checks the
/// caller's role, applies the state-machine rule, commits the status change
/// with its audit row, and then dispatches the transition's notifications.
impl RequestLifecycle {
    /// Admin approves: the request moves to `Pending Reservations` and the
    /// chosen travel agency is recorded on it. The owner and every agency
    /// member are notified.
    pub async fn approve(
        &self,
        actor: &Actor,
        id: &RequestId,
        agency_id: TravelAgencyId,
    ) -> Result<Request, EngineError> {
        let mut request = self.load(id).await?;
        require_admin(actor, &request)?;
        if !self.agencies.exists(&agency_id).await? {
            return Err(EngineError::BadInput("unknown travel agency".to_string()));
        }
        let members = self.agencies.members(&agency_id).await?;
        if members.is_empty() {
            return Err(EngineError::BadInput("travel agency has no members".to_string()));
        }

        let owner = self.contact(&request.owner_id).await?;
        self.commit(&mut request, actor, RequestStatus::PendingReservations, Some(&agency_id))
            .await?;
        request.travel_agency_id = Some(agency_id);

        self.dispatch(messages::request_approved(&owner, &request.title)).await;
        for member in &members {
            self.dispatch(messages::agency_assignment(member, &request.title)).await;
        }
        Ok(request)
    }

    pub async fn deny(&self, actor: &Actor, id: &RequestId) -> Result<Request, EngineError> {
        let mut request = self.load(id).await?;
        require_admin(actor, &request)?;
        let owner = self.contact(&request.owner_id).await?;
        self.commit(&mut request, actor, RequestStatus::Denied, None).await?;
        self.dispatch(messages::request_denied(&owner, &request.title)).await;
        Ok(request)
    }

    pub async fn cancel(&self, actor: &Actor, id: &RequestId) -> Result<Request, EngineError> {
        let mut request = self.load(id).await?;
        if request.owner_id != actor.user_id {
            return Err(EngineError::Unauthorized("only the owner may cancel a request"));
        }
        let owner = self.contact(&request.owner_id).await?;
        self.commit(&mut request, actor, RequestStatus::Cancelled, None).await?;
        self.dispatch(messages::request_cancelled(&owner, &request.title)).await;
        Ok(request)
    }

    /// Agency reports all bookings done: the request moves on to accounting.
    pub async fn reservations_finished(
        &self,
        actor: &Actor,
        id: &RequestId,
    ) -> Result<Request, EngineError> {
        let mut request = self.load(id).await?;
        require_agency_member(actor, &request)?;
        let soi = self.contact(&request.soi_id).await?;
        self.commit(&mut request, actor, RequestStatus::PendingAccountingApproval, None).await?;
        self.dispatch(messages::accounting_review_due(&soi, &request.title)).await;
        Ok(request)
    }

    pub async fn accounting_approve(
        &self,
        actor: &Actor,
        id: &RequestId,
    ) -> Result<Request, EngineError> {
        let mut request = self.load(id).await?;
        require_soi(actor, &request)?;
        let owner = self.contact(&request.owner_id).await?;
        self.commit(&mut request, actor, RequestStatus::InProgress, None).await?;
        self.dispatch(messages::accounting_approved(&owner, &request.title)).await;
        Ok(request)
    }

    /// Owner reports the trip done and all vouchers uploaded.
    pub async fn vouchers_uploaded(
        &self,
        actor: &Actor,
        id: &RequestId,
    ) -> Result<Request, EngineError> {
        let mut request = self.load(id).await?;
        if request.owner_id != actor.user_id {
            return Err(EngineError::Unauthorized("only the owner may close the trip"));
        }
        let admin = self.contact(&request.admin_id).await?;
        self.commit(&mut request, actor, RequestStatus::PendingVouchersApproval, None).await?;
        self.dispatch(messages::vouchers_review_due(&admin, &request.title)).await;
        Ok(request)
    }

    /// Admin signs off the expense report; both the owner and the accounting
    /// officer hear about it.
    pub async fn vouchers_approve(
        &self,
        actor: &Actor,
        id: &RequestId,
    ) -> Result<Request, EngineError> {
        let mut request = self.load(id).await?;
        require_admin(actor, &request)?;
        let owner = self.contact(&request.owner_id).await?;
        let soi = self.contact(&request.soi_id).await?;
        self.commit(&mut request, actor, RequestStatus::PendingRefundApproval, None).await?;
        self.dispatch(messages::vouchers_approved(&owner, &request.title)).await;
        self.dispatch(messages::refund_review_due(&soi, &request.title)).await;
        Ok(request)
    }

    pub async fn complete(&self, actor: &Actor, id: &RequestId) -> Result<Request, EngineError> {
        let mut request = self.load(id).await?;
        require_soi(actor, &request)?;
        let owner = self.contact(&request.owner_id).await?;
        self.commit(&mut request, actor, RequestStatus::Completed, None).await?;
        self.dispatch(messages::request_completed(&owner, &request.title)).await;
        Ok(request)
    }

    /// Applies the state-machine rule to the loaded copy, then persists the
    /// new status together with its audit row. The check runs against the
    /// copy read at the start of the call; two racing callers validated
    /// against the same snapshot both commit, and the last writer wins.
    async fn commit(
        &self,
        request: &mut Request,
        actor: &Actor,
        to: RequestStatus,
        agency: Option<&TravelAgencyId>,
    ) -> Result<(), EngineError> {
        let from = request.status;
        request.transition_to(to)?;
        let log =
            RequestLogEntry::status_changed(request.id.clone(), actor.user_id.clone(), from, to);
        self.requests.set_status_with_log(&request.id, to, agency, &log).await?;
        Ok(())
    }
}

fn require_admin(actor: &Actor, request: &Request) -> Result<(), EngineError> {
    if actor.user_id == request.admin_id {
        Ok(())
    } else {
        Err(EngineError::Unauthorized("only the assigned approver may do this"))
    }
}

fn require_soi(actor: &Actor, request: &Request) -> Result<(), EngineError> {
    if actor.user_id == request.soi_id {
        Ok(())
    } else {
        Err(EngineError::Unauthorized("only the assigned accounting officer may do this"))
    }
}

fn require_agency_member(actor: &Actor, request: &Request) -> Result<(), EngineError> {
    let assigned = request
        .travel_agency_id
        .as_ref()
        .ok_or(EngineError::Unauthorized("request has no assigned agency"))?;
    match &actor.travel_agency_id {
        Some(agency) if agency == assigned => Ok(()),
        _ => Err(EngineError::Unauthorized("only the assigned agency may do this")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tripdesk_core::audit::RequestLogEntry;
    use tripdesk_core::domain::request::{Priority, RequestStatus};
    use tripdesk_core::domain::user::TravelAgencyId;
    use tripdesk_core::notify::FailingNotifier;
    use tripdesk_core::RoleAssigner;
    use tripdesk_db::repositories::{InMemoryBackend, RequestRepository};

    use crate::error::EngineError;
    use crate::harness::{build_lifecycle, seed_directory, World, AGENCY};

    #[tokio::test]
    async fn happy_path_reaches_completed_with_a_full_audit_trail() {
        let world = World::seeded().await;
        let request = world.request_in(RequestStatus::Completed).await;

        assert_eq!(request.status, RequestStatus::Completed);
        let logs = world.backend.logs_for_request(&request.id).await.expect("logs");
        // create + six status changes
        assert_eq!(logs.len(), 7);
        assert_eq!(logs.last().expect("log").resulting_status, RequestStatus::Completed);
        assert!(logs
            .last()
            .expect("log")
            .report
            .ends_with("to 'Completed'."));

        let subjects: Vec<String> =
            world.notifier.sent().iter().map(|n| n.subject.clone()).collect();
        assert!(subjects.contains(&"Travel request approved".to_string()));
        assert!(subjects.contains(&"New approved travel request".to_string()));
        assert!(subjects.contains(&"Travel request completed".to_string()));
    }

    #[tokio::test]
    async fn approve_is_admin_only_and_validates_the_agency() {
        let world = World::seeded().await;
        let request = world.create_request(Priority::Medium).await;
        let agency = TravelAgencyId(AGENCY.to_string());

        let by_owner =
            world.lifecycle.approve(&world.owner(), &request.id, agency.clone()).await;
        assert!(matches!(by_owner, Err(EngineError::Unauthorized(_))));

        let bad_agency = world
            .lifecycle
            .approve(&world.admin(), &request.id, TravelAgencyId("ag-ghost".to_string()))
            .await;
        assert!(matches!(bad_agency, Err(EngineError::BadInput(_))));

        let approved =
            world.lifecycle.approve(&world.admin(), &request.id, agency.clone()).await.expect("approve");
        assert_eq!(approved.status, RequestStatus::PendingReservations);
        assert_eq!(approved.travel_agency_id, Some(agency));
    }

    #[tokio::test]
    async fn terminal_states_admit_no_further_transitions() {
        let world = World::seeded().await;
        let request = world.create_request(Priority::Medium).await;
        world.lifecycle.deny(&world.admin(), &request.id).await.expect("deny");

        let again = world
            .lifecycle
            .approve(&world.admin(), &request.id, TravelAgencyId(AGENCY.to_string()))
            .await;
        assert!(matches!(again, Err(EngineError::Conflict(_))));

        let stored = world.backend.request(&request.id).await.expect("stored");
        assert_eq!(stored.status, RequestStatus::Denied);
    }

    #[tokio::test]
    async fn owner_can_cancel_while_changes_are_needed() {
        let world = World::seeded().await;
        let request = world.create_request(Priority::Medium).await;
        world
            .revisions
            .create(&world.admin(), &request.id, "Split the trip.".to_string())
            .await
            .expect("revision");

        let cancelled =
            world.lifecycle.cancel(&world.owner(), &request.id).await.expect("cancel");
        assert_eq!(cancelled.status, RequestStatus::Cancelled);

        let by_admin = world.lifecycle.cancel(&world.admin(), &request.id).await;
        assert!(matches!(by_admin, Err(EngineError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn reservations_finished_requires_the_assigned_agency() {
        let world = World::seeded().await;
        let request = world.request_in(RequestStatus::PendingReservations).await;

        let by_owner = world.lifecycle.reservations_finished(&world.owner(), &request.id).await;
        assert!(matches!(by_owner, Err(EngineError::Unauthorized(_))));

        let foreign = tripdesk_core::domain::user::Actor::agency_member(
            tripdesk_core::domain::user::UserId("u-other-agent".to_string()),
            TravelAgencyId("ag-other".to_string()),
        );
        let by_foreign = world.lifecycle.reservations_finished(&foreign, &request.id).await;
        assert!(matches!(by_foreign, Err(EngineError::Unauthorized(_))));

        let moved = world
            .lifecycle
            .reservations_finished(&world.agent(), &request.id)
            .await
            .expect("finish");
        assert_eq!(moved.status, RequestStatus::PendingAccountingApproval);
    }

    #[tokio::test]
    async fn vouchers_approval_notifies_owner_and_accounting() {
        let world = World::seeded().await;
        let request = world.request_in(RequestStatus::PendingVouchersApproval).await;

        world.lifecycle.vouchers_approve(&world.admin(), &request.id).await.expect("approve");

        let sent = world.notifier.sent();
        let last_two: Vec<&str> =
            sent.iter().rev().take(2).map(|n| n.subject.as_str()).collect();
        assert!(last_two.contains(&"Trip expense report approved"));
        assert!(last_two.contains(&"Travel request awaiting refund approval"));
    }

    #[tokio::test]
    async fn notification_failure_never_fails_a_transition() {
        let backend = InMemoryBackend::new();
        seed_directory(&backend).await;
        let lifecycle =
            build_lifecycle(&backend, Arc::new(FailingNotifier), RoleAssigner::seeded(5));

        let owner = tripdesk_core::domain::user::Actor::in_department(
            tripdesk_core::domain::user::UserId(crate::harness::OWNER.to_string()),
            tripdesk_core::domain::user::DepartmentId(crate::harness::DEPT.to_string()),
        );
        let request = lifecycle
            .create(&owner, crate::harness::new_request(Priority::Medium))
            .await
            .expect("create despite failing notifier");

        let admin =
            tripdesk_core::domain::user::Actor::new(tripdesk_core::domain::user::UserId(
                crate::harness::ADMIN.to_string(),
            ));
        let denied = lifecycle.deny(&admin, &request.id).await.expect("deny");
        assert_eq!(denied.status, RequestStatus::Denied);
        assert_eq!(
            backend.request(&request.id).await.expect("stored").status,
            RequestStatus::Denied
        );
    }

    #[tokio::test]
    async fn racing_transitions_last_writer_wins() {
        let world = World::seeded().await;
        let request = world.create_request(Priority::Medium).await;

        // Two actors read the same snapshot; each validates its transition
        // against that stale copy before writing.
        let snapshot_a = world.backend.request(&request.id).await.expect("snapshot");
        let snapshot_b = snapshot_a.clone();
        assert!(snapshot_a.can_transition_to(RequestStatus::PendingReservations));
        assert!(snapshot_b.can_transition_to(RequestStatus::Denied));

        let agency = TravelAgencyId(AGENCY.to_string());
        let approve_log = RequestLogEntry::status_changed(
            request.id.clone(),
            snapshot_a.admin_id.clone(),
            snapshot_a.status,
            RequestStatus::PendingReservations,
        );
        world
            .backend
            .set_status_with_log(
                &request.id,
                RequestStatus::PendingReservations,
                Some(&agency),
                &approve_log,
            )
            .await
            .expect("first writer");

        let deny_log = RequestLogEntry::status_changed(
            request.id.clone(),
            snapshot_b.admin_id.clone(),
            snapshot_b.status,
            RequestStatus::Denied,
        );
        world
            .backend
            .set_status_with_log(&request.id, RequestStatus::Denied, None, &deny_log)
            .await
            .expect("second writer");

        // The second write lands even though Pending Reservations -> Denied
        // is not a legal edge; the stale validation is the accepted gap.
        let stored = world.backend.request(&request.id).await.expect("stored");
        assert_eq!(stored.status, RequestStatus::Denied);
        assert_eq!(world.backend.logs_for_request(&request.id).await.expect("logs").len(), 3);
    }
}
