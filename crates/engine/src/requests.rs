use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::warn;

use tripdesk_core::audit::RequestLogEntry;
use tripdesk_core::domain::destination::{validate_itinerary, DestinationDraft, DestinationId};
use tripdesk_core::domain::request::{Priority, Request, RequestId, RequestStatus};
use tripdesk_core::domain::user::{Actor, Contact, UserId};
use tripdesk_core::notify::{messages, Notification, Notifier};
use tripdesk_core::RoleAssigner;
use tripdesk_db::repositories::{
    DestinationDirectory, RequestRepository, TravelAgencyDirectory, UserDirectory,
};

use crate::error::EngineError;

/// Caller-supplied fields for a new request. Admin, accounting officer, and
/// status are never caller-supplied; they are assigned here.
#[derive(Clone, Debug)]
pub struct NewRequest {
    pub title: String,
    pub motive: String,
    pub origin_id: DestinationId,
    pub advance_money: Decimal,
    pub requirements: Option<String>,
    pub priority: Priority,
    pub destinations: Vec<DestinationDraft>,
}

/// Editable fields. The title and the assigned reviewers are fixed at
/// creation and cannot be changed by an edit.
#[derive(Clone, Debug)]
pub struct RequestEdit {
    pub motive: String,
    pub origin_id: DestinationId,
    pub advance_money: Decimal,
    pub requirements: Option<String>,
    pub priority: Priority,
    pub destinations: Vec<DestinationDraft>,
}

/// Lifecycle operations on the request aggregate. Status transitions live in
/// a second impl block alongside this one.
pub struct RequestLifecycle {
    pub(crate) requests: Arc<dyn RequestRepository>,
    pub(crate) users: Arc<dyn UserDirectory>,
    pub(crate) destinations: Arc<dyn DestinationDirectory>,
    pub(crate) agencies: Arc<dyn TravelAgencyDirectory>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) assigner: RoleAssigner,
}

impl RequestLifecycle {
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        users: Arc<dyn UserDirectory>,
        destinations: Arc<dyn DestinationDirectory>,
        agencies: Arc<dyn TravelAgencyDirectory>,
        notifier: Arc<dyn Notifier>,
        assigner: RoleAssigner,
    ) -> Self {
        Self { requests, users, destinations, agencies, notifier, assigner }
    }

    /// Validates the itinerary, assigns a department approver and an
    /// accounting officer at random from their eligible pools, and persists
    /// the request with its `create` audit row. The assigned approver is
    /// notified after the commit.
    pub async fn create(&self, actor: &Actor, input: NewRequest) -> Result<Request, EngineError> {
        validate_itinerary(&input.destinations)
            .map_err(|e| EngineError::BadInput(e.to_string()))?;
        self.check_locations(&input.origin_id, &input.destinations).await?;

        let department = actor.department_id.as_ref().ok_or_else(|| {
            EngineError::BadInput("requester has no department".to_string())
        })?;
        let approver_pool =
            self.users.approvers_in_department(department, &actor.user_id).await?;
        let admin_id = self.assigner.pick(&approver_pool).ok_or_else(|| {
            EngineError::BadInput("no eligible approver in the requester's department".to_string())
        })?;
        let officer_pool = self.users.accounting_officers().await?;
        let soi_id = self.assigner.pick(&officer_pool).ok_or_else(|| {
            EngineError::BadInput("no accounting officer available".to_string())
        })?;

        let origin_city = self
            .destinations
            .city_name(&input.origin_id)
            .await?
            .ok_or_else(|| EngineError::BadInput("unknown origin location".to_string()))?;

        let request_id = RequestId::generate();
        let request = Request {
            id: request_id.clone(),
            owner_id: actor.user_id.clone(),
            origin_id: input.origin_id,
            admin_id,
            soi_id,
            travel_agency_id: None,
            title: input.title,
            motive: input.motive,
            advance_money: input.advance_money,
            requirements: input.requirements,
            priority: input.priority,
            status: RequestStatus::PendingReview,
            created_at: Utc::now(),
            destinations: input
                .destinations
                .iter()
                .map(|draft| draft.materialize(&request_id))
                .collect(),
        };

        let admin = self.contact(&request.admin_id).await?;
        let log = RequestLogEntry::created(
            request.id.clone(),
            actor.user_id.clone(),
            &origin_city,
            request.destinations.len(),
        );
        self.requests.insert_with_log(&request, &log).await?;

        self.dispatch(messages::request_assigned(&admin, &request.id)).await;
        Ok(request)
    }

    /// Owner-only edit, allowed while the request is `Pending Review` or
    /// `Changes Needed`. The destination set is replaced wholesale and the
    /// request returns to `Pending Review`.
    pub async fn update(
        &self,
        actor: &Actor,
        id: &RequestId,
        edit: RequestEdit,
    ) -> Result<Request, EngineError> {
        let mut request = self.load(id).await?;
        if request.owner_id != actor.user_id {
            return Err(EngineError::Unauthorized("only the owner may edit a request"));
        }

        validate_itinerary(&edit.destinations)
            .map_err(|e| EngineError::BadInput(e.to_string()))?;
        self.check_locations(&edit.origin_id, &edit.destinations).await?;

        request.transition_to(RequestStatus::PendingReview)?;
        request.origin_id = edit.origin_id;
        request.motive = edit.motive;
        request.advance_money = edit.advance_money;
        request.requirements = edit.requirements;
        request.priority = edit.priority;
        request.destinations =
            edit.destinations.iter().map(|draft| draft.materialize(&request.id)).collect();

        let admin = self.contact(&request.admin_id).await?;
        let log =
            RequestLogEntry::updated(request.id.clone(), actor.user_id.clone(), request.status);
        self.requests.replace_with_log(&request, &log).await?;

        self.dispatch(messages::request_updated(&admin, &request.id)).await;
        Ok(request)
    }

    /// Fetch with access check: owner, assigned approver, assigned accounting
    /// officer, or a member of the assigned travel agency.
    pub async fn find_for_actor(
        &self,
        actor: &Actor,
        id: &RequestId,
    ) -> Result<Request, EngineError> {
        let request = self.load(id).await?;
        self.check_access(actor, &request)?;
        Ok(request)
    }

    pub async fn list_mine(&self, actor: &Actor) -> Result<Vec<Request>, EngineError> {
        Ok(self.requests.list_by_owner(&actor.user_id).await?)
    }

    /// The approver's review queue: `Pending Review` only, high priority
    /// first.
    pub async fn review_queue(&self, actor: &Actor) -> Result<Vec<Request>, EngineError> {
        Ok(self.requests.list_pending_review_for_admin(&actor.user_id).await?)
    }

    pub async fn soi_assignments(&self, actor: &Actor) -> Result<Vec<Request>, EngineError> {
        Ok(self.requests.list_by_soi(&actor.user_id).await?)
    }

    pub async fn refund_queue(&self, actor: &Actor) -> Result<Vec<Request>, EngineError> {
        Ok(self.requests.list_pending_refund_for_soi(&actor.user_id).await?)
    }

    /// The agency's booking queue. Callers without an agency affiliation get
    /// Unauthorized, not an empty list.
    pub async fn agency_queue(&self, actor: &Actor) -> Result<Vec<Request>, EngineError> {
        let agency = actor
            .travel_agency_id
            .as_ref()
            .ok_or(EngineError::Unauthorized("caller is not an agency member"))?;
        Ok(self.requests.list_pending_reservations_for_agency(agency).await?)
    }

    pub async fn audit_trail(
        &self,
        actor: &Actor,
        id: &RequestId,
    ) -> Result<Vec<RequestLogEntry>, EngineError> {
        let request = self.load(id).await?;
        self.check_access(actor, &request)?;
        Ok(self.requests.logs_for_request(id).await?)
    }

    pub(crate) async fn load(&self, id: &RequestId) -> Result<Request, EngineError> {
        self.requests.find_by_id(id).await?.ok_or(EngineError::NotFound("request"))
    }

    pub(crate) async fn contact(&self, id: &UserId) -> Result<Contact, EngineError> {
        self.users.user_by_id(id).await?.ok_or(EngineError::NotFound("user"))
    }

    pub(crate) fn check_access(
        &self,
        actor: &Actor,
        request: &Request,
    ) -> Result<(), EngineError> {
        let by_role = actor.user_id == request.owner_id
            || actor.user_id == request.admin_id
            || actor.user_id == request.soi_id;
        let by_agency = actor.travel_agency_id.is_some()
            && actor.travel_agency_id == request.travel_agency_id;
        if by_role || by_agency {
            Ok(())
        } else {
            Err(EngineError::Unauthorized("caller has no part in this request"))
        }
    }

    async fn check_locations(
        &self,
        origin: &DestinationId,
        legs: &[DestinationDraft],
    ) -> Result<(), EngineError> {
        if !self.destinations.is_valid(origin).await? {
            return Err(EngineError::BadInput("unknown origin location".to_string()));
        }
        for leg in legs {
            if !self.destinations.is_valid(&leg.destination_id).await? {
                return Err(EngineError::BadInput(format!(
                    "unknown destination location `{}`",
                    leg.destination_id.0
                )));
            }
        }
        Ok(())
    }

    /// Post-commit delivery. Failures are logged and swallowed; a committed
    /// transition never fails because a message could not be sent.
    pub(crate) async fn dispatch(&self, notification: Notification) {
        if let Err(error) = self.notifier.notify(&notification).await {
            warn!(to = %notification.to, %error, "notification delivery failed");
        }
    }
}
