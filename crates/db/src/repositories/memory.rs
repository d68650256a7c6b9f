use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use tripdesk_core::audit::RequestLogEntry;
use tripdesk_core::domain::destination::{DestinationId, RequestDestinationId};
use tripdesk_core::domain::request::{Request, RequestId, RequestStatus};
use tripdesk_core::domain::reservation::{Reservation, ReservationId};
use tripdesk_core::domain::revision::Revision;
use tripdesk_core::domain::user::{
    Contact, DepartmentId, DirectoryUser, Role, TravelAgencyId, UserId,
};
use tripdesk_core::domain::voucher::{Voucher, VoucherId, VoucherStatus};

use super::{
    DestinationDirectory, DestinationParent, RepositoryError, RequestRepository,
    ReservationRepository, RevisionRepository, TravelAgencyDirectory, UserDirectory,
    VoucherRepository,
};

#[derive(Default)]
struct State {
    requests: HashMap<String, Request>,
    logs: Vec<RequestLogEntry>,
    vouchers: HashMap<String, Voucher>,
    reservations: HashMap<String, Reservation>,
    revisions: Vec<Revision>,
    users: HashMap<String, DirectoryUser>,
    destinations: HashMap<String, String>,
    agencies: Vec<TravelAgencyId>,
}

/// Every repository and directory trait over one shared map, so a test can
/// wire a whole engine without a database. Cross-aggregate writes hold the
/// single lock for their duration, mirroring the SQL transactions.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<RwLock<State>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: DirectoryUser) {
        self.state.write().await.users.insert(user.id.0.clone(), user);
    }

    pub async fn add_destination(&self, id: DestinationId, city: &str) {
        self.state.write().await.destinations.insert(id.0, city.to_string());
    }

    pub async fn add_agency(&self, id: TravelAgencyId) {
        self.state.write().await.agencies.push(id);
    }

    /// Direct read of a stored request, for assertions.
    pub async fn request(&self, id: &RequestId) -> Option<Request> {
        self.state.read().await.requests.get(&id.0).cloned()
    }

    pub async fn log_count(&self) -> usize {
        self.state.read().await.logs.len()
    }
}

fn by_priority(requests: &mut [Request]) {
    requests.sort_by_key(|request| request.priority.rank());
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryBackend {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        Ok(self.state.read().await.requests.get(&id.0).cloned())
    }

    async fn insert_with_log(
        &self,
        request: &Request,
        log: &RequestLogEntry,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.requests.insert(request.id.0.clone(), request.clone());
        state.logs.push(log.clone());
        Ok(())
    }

    async fn replace_with_log(
        &self,
        request: &Request,
        log: &RequestLogEntry,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(stored) = state.requests.get_mut(&request.id.0) {
            stored.origin_id = request.origin_id.clone();
            stored.motive = request.motive.clone();
            stored.advance_money = request.advance_money;
            stored.requirements = request.requirements.clone();
            stored.priority = request.priority;
            stored.status = request.status;
            stored.destinations = request.destinations.clone();
        }
        state.logs.push(log.clone());
        Ok(())
    }

    async fn set_status_with_log(
        &self,
        id: &RequestId,
        new_status: RequestStatus,
        travel_agency_id: Option<&TravelAgencyId>,
        log: &RequestLogEntry,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(stored) = state.requests.get_mut(&id.0) {
            stored.status = new_status;
            if let Some(agency) = travel_agency_id {
                stored.travel_agency_id = Some(agency.clone());
            }
        }
        state.logs.push(log.clone());
        Ok(())
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Request>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .values()
            .filter(|request| request.owner_id == *owner)
            .cloned()
            .collect())
    }

    async fn list_pending_review_for_admin(
        &self,
        admin: &UserId,
    ) -> Result<Vec<Request>, RepositoryError> {
        let state = self.state.read().await;
        let mut requests: Vec<Request> = state
            .requests
            .values()
            .filter(|request| {
                request.admin_id == *admin && request.status == RequestStatus::PendingReview
            })
            .cloned()
            .collect();
        by_priority(&mut requests);
        Ok(requests)
    }

    async fn list_by_soi(&self, soi: &UserId) -> Result<Vec<Request>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .values()
            .filter(|request| request.soi_id == *soi)
            .cloned()
            .collect())
    }

    async fn list_pending_refund_for_soi(
        &self,
        soi: &UserId,
    ) -> Result<Vec<Request>, RepositoryError> {
        let state = self.state.read().await;
        let mut requests: Vec<Request> = state
            .requests
            .values()
            .filter(|request| {
                request.soi_id == *soi
                    && request.status == RequestStatus::PendingRefundApproval
            })
            .cloned()
            .collect();
        by_priority(&mut requests);
        Ok(requests)
    }

    async fn list_pending_reservations_for_agency(
        &self,
        agency: &TravelAgencyId,
    ) -> Result<Vec<Request>, RepositoryError> {
        let state = self.state.read().await;
        let mut requests: Vec<Request> = state
            .requests
            .values()
            .filter(|request| {
                request.travel_agency_id.as_ref() == Some(agency)
                    && request.status == RequestStatus::PendingReservations
            })
            .cloned()
            .collect();
        by_priority(&mut requests);
        Ok(requests)
    }

    async fn logs_for_request(
        &self,
        id: &RequestId,
    ) -> Result<Vec<RequestLogEntry>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .logs
            .iter()
            .filter(|log| log.request_id == *id)
            .cloned()
            .collect())
    }

    async fn find_destination_parent(
        &self,
        id: &RequestDestinationId,
    ) -> Result<Option<DestinationParent>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.requests.values().find_map(|request| {
            request
                .destinations
                .iter()
                .any(|destination| destination.id == *id)
                .then(|| DestinationParent {
                    request_id: request.id.clone(),
                    status: request.status,
                    travel_agency_id: request.travel_agency_id.clone(),
                })
        }))
    }
}

#[async_trait::async_trait]
impl VoucherRepository for InMemoryBackend {
    async fn find_by_id(&self, id: &VoucherId) -> Result<Option<Voucher>, RepositoryError> {
        Ok(self.state.read().await.vouchers.get(&id.0).cloned())
    }

    async fn insert(&self, voucher: &Voucher) -> Result<(), RepositoryError> {
        self.state.write().await.vouchers.insert(voucher.id.0.clone(), voucher.clone());
        Ok(())
    }

    async fn save(&self, voucher: &Voucher) -> Result<(), RepositoryError> {
        self.state.write().await.vouchers.insert(voucher.id.0.clone(), voucher.clone());
        Ok(())
    }

    async fn delete(&self, id: &VoucherId) -> Result<bool, RepositoryError> {
        Ok(self.state.write().await.vouchers.remove(&id.0).is_some())
    }

    async fn set_status(
        &self,
        id: &VoucherId,
        status: VoucherStatus,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        match state.vouchers.get_mut(&id.0) {
            Some(voucher) => {
                voucher.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_by_request(
        &self,
        request: &RequestId,
    ) -> Result<Vec<Voucher>, RepositoryError> {
        let state = self.state.read().await;
        let mut vouchers: Vec<Voucher> = state
            .vouchers
            .values()
            .filter(|voucher| voucher.request_id == *request)
            .cloned()
            .collect();
        vouchers.sort_by_key(|voucher| voucher.issued_on);
        Ok(vouchers)
    }
}

#[async_trait::async_trait]
impl ReservationRepository for InMemoryBackend {
    async fn find_by_id(
        &self,
        id: &ReservationId,
    ) -> Result<Option<Reservation>, RepositoryError> {
        Ok(self.state.read().await.reservations.get(&id.0).cloned())
    }

    async fn insert(&self, reservation: &Reservation) -> Result<(), RepositoryError> {
        self.state
            .write()
            .await
            .reservations
            .insert(reservation.id.0.clone(), reservation.clone());
        Ok(())
    }

    async fn save(&self, reservation: &Reservation) -> Result<(), RepositoryError> {
        self.state
            .write()
            .await
            .reservations
            .insert(reservation.id.0.clone(), reservation.clone());
        Ok(())
    }

    async fn delete(&self, id: &ReservationId) -> Result<bool, RepositoryError> {
        Ok(self.state.write().await.reservations.remove(&id.0).is_some())
    }
}

#[async_trait::async_trait]
impl RevisionRepository for InMemoryBackend {
    async fn insert_with_status_change(
        &self,
        revision: &Revision,
        log: &RequestLogEntry,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.revisions.push(revision.clone());
        if let Some(request) = state.requests.get_mut(&revision.request_id.0) {
            request.status = log.resulting_status;
        }
        state.logs.push(log.clone());
        Ok(())
    }

    async fn list_by_request(
        &self,
        request: &RequestId,
    ) -> Result<Vec<Revision>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .revisions
            .iter()
            .filter(|revision| revision.request_id == *request)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl DestinationDirectory for InMemoryBackend {
    async fn is_valid(&self, id: &DestinationId) -> Result<bool, RepositoryError> {
        Ok(self.state.read().await.destinations.contains_key(&id.0))
    }

    async fn city_name(&self, id: &DestinationId) -> Result<Option<String>, RepositoryError> {
        Ok(self.state.read().await.destinations.get(&id.0).cloned())
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryBackend {
    async fn user_by_id(&self, id: &UserId) -> Result<Option<Contact>, RepositoryError> {
        Ok(self.state.read().await.users.get(&id.0).map(DirectoryUser::contact))
    }

    async fn approvers_in_department(
        &self,
        department: &DepartmentId,
        exclude: &UserId,
    ) -> Result<Vec<UserId>, RepositoryError> {
        let state = self.state.read().await;
        let mut ids: Vec<UserId> = state
            .users
            .values()
            .filter(|user| {
                user.role == Role::Approver
                    && user.department_id.as_ref() == Some(department)
                    && user.id != *exclude
            })
            .map(|user| user.id.clone())
            .collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ids)
    }

    async fn accounting_officers(&self) -> Result<Vec<UserId>, RepositoryError> {
        let state = self.state.read().await;
        let mut ids: Vec<UserId> = state
            .users
            .values()
            .filter(|user| user.role == Role::AccountingOfficer)
            .map(|user| user.id.clone())
            .collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl TravelAgencyDirectory for InMemoryBackend {
    async fn exists(&self, id: &TravelAgencyId) -> Result<bool, RepositoryError> {
        Ok(self.state.read().await.agencies.contains(id))
    }

    async fn members(&self, id: &TravelAgencyId) -> Result<Vec<Contact>, RepositoryError> {
        let state = self.state.read().await;
        let mut members: Vec<Contact> = state
            .users
            .values()
            .filter(|user| {
                user.role == Role::AgencyAgent && user.travel_agency_id.as_ref() == Some(id)
            })
            .map(DirectoryUser::contact)
            .collect();
        members.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(members)
    }
}
