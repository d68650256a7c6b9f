use std::sync::Arc;

use tripdesk_core::domain::request::RequestId;
use tripdesk_core::domain::user::Actor;
use tripdesk_core::domain::voucher::{Voucher, VoucherDraft, VoucherId, VoucherPatch, VoucherStatus};
use tripdesk_db::repositories::{RequestRepository, VoucherRepository};

use crate::error::EngineError;

/// Expense-voucher operations. Vouchers hang off a request but carry their
/// own approval state; only approve/deny touches it.
pub struct VoucherService {
    vouchers: Arc<dyn VoucherRepository>,
    requests: Arc<dyn RequestRepository>,
}

impl VoucherService {
    pub fn new(
        vouchers: Arc<dyn VoucherRepository>,
        requests: Arc<dyn RequestRepository>,
    ) -> Self {
        Self { vouchers, requests }
    }

    /// Owner-only. The request's assigned approver is copied onto the voucher
    /// and gates approve/deny from then on.
    pub async fn create(
        &self,
        actor: &Actor,
        draft: VoucherDraft,
    ) -> Result<Voucher, EngineError> {
        let request = self
            .requests
            .find_by_id(&draft.request_id)
            .await?
            .ok_or(EngineError::NotFound("request"))?;
        if request.owner_id != actor.user_id {
            return Err(EngineError::Unauthorized("only the request owner may submit vouchers"));
        }

        let voucher = Voucher {
            id: VoucherId::generate(),
            request_id: draft.request_id,
            classification: draft.classification,
            amount: draft.amount,
            tax_type: draft.tax_type,
            currency: draft.currency,
            issued_on: draft.issued_on,
            file_url_pdf: draft.file_url_pdf,
            file_url_xml: draft.file_url_xml,
            status: VoucherStatus::Pending,
            approver_id: request.admin_id,
        };
        self.vouchers.insert(&voucher).await?;
        Ok(voucher)
    }

    /// Owner-only partial update, allowed while the voucher is still pending.
    pub async fn update(
        &self,
        actor: &Actor,
        id: &VoucherId,
        patch: VoucherPatch,
    ) -> Result<Voucher, EngineError> {
        let mut voucher = self.load(id).await?;
        self.require_owner(actor, &voucher).await?;
        if voucher.status != VoucherStatus::Pending {
            return Err(EngineError::Conflict("voucher has already been decided".to_string()));
        }

        voucher.apply(patch);
        self.vouchers.save(&voucher).await?;
        Ok(voucher)
    }

    pub async fn delete(&self, actor: &Actor, id: &VoucherId) -> Result<(), EngineError> {
        let voucher = self.load(id).await?;
        self.require_owner(actor, &voucher).await?;
        if voucher.status != VoucherStatus::Pending {
            return Err(EngineError::Conflict("voucher has already been decided".to_string()));
        }
        if !self.vouchers.delete(id).await? {
            return Err(EngineError::NotFound("voucher"));
        }
        Ok(())
    }

    pub async fn approve(&self, actor: &Actor, id: &VoucherId) -> Result<Voucher, EngineError> {
        self.decide(actor, id, VoucherStatus::Approved).await
    }

    pub async fn deny(&self, actor: &Actor, id: &VoucherId) -> Result<Voucher, EngineError> {
        self.decide(actor, id, VoucherStatus::Denied).await
    }

    /// All vouchers for a request, oldest issue date first. NotFound when the
    /// request has none.
    pub async fn list_by_request(
        &self,
        actor: &Actor,
        request_id: &RequestId,
    ) -> Result<Vec<Voucher>, EngineError> {
        let request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or(EngineError::NotFound("request"))?;
        let allowed = actor.user_id == request.owner_id
            || actor.user_id == request.admin_id
            || actor.user_id == request.soi_id;
        if !allowed {
            return Err(EngineError::Unauthorized("caller has no part in this request"));
        }

        let vouchers = self.vouchers.list_by_request(request_id).await?;
        if vouchers.is_empty() {
            return Err(EngineError::NotFound("vouchers"));
        }
        Ok(vouchers)
    }

    async fn decide(
        &self,
        actor: &Actor,
        id: &VoucherId,
        status: VoucherStatus,
    ) -> Result<Voucher, EngineError> {
        let mut voucher = self.load(id).await?;
        if voucher.approver_id != actor.user_id {
            return Err(EngineError::Unauthorized(
                "only the assigned approver may decide a voucher",
            ));
        }
        if voucher.status != VoucherStatus::Pending {
            return Err(EngineError::Conflict("voucher has already been decided".to_string()));
        }

        if !self.vouchers.set_status(id, status).await? {
            return Err(EngineError::NotFound("voucher"));
        }
        voucher.status = status;
        Ok(voucher)
    }

    async fn load(&self, id: &VoucherId) -> Result<Voucher, EngineError> {
        self.vouchers.find_by_id(id).await?.ok_or(EngineError::NotFound("voucher"))
    }

    async fn require_owner(&self, actor: &Actor, voucher: &Voucher) -> Result<(), EngineError> {
        let request = self
            .requests
            .find_by_id(&voucher.request_id)
            .await?
            .ok_or(EngineError::NotFound("request"))?;
        if request.owner_id != actor.user_id {
            return Err(EngineError::Unauthorized("only the request owner may do this"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use tripdesk_core::domain::request::{RequestId, RequestStatus};
    use tripdesk_core::domain::user::{Actor, UserId};
    use tripdesk_core::domain::voucher::{VoucherDraft, VoucherPatch, VoucherStatus};

    use crate::error::EngineError;
    use crate::harness::{World, ADMIN};

    fn draft(request_id: &RequestId) -> VoucherDraft {
        VoucherDraft {
            request_id: request_id.clone(),
            classification: "lodging".to_string(),
            amount: Decimal::new(180000, 2),
            tax_type: "vat".to_string(),
            currency: "MXN".to_string(),
            issued_on: NaiveDate::from_ymd_opt(2026, 4, 2).expect("valid date"),
            file_url_pdf: Some("https://files.example/v.pdf".to_string()),
            file_url_xml: None,
        }
    }

    #[tokio::test]
    async fn owner_submits_and_the_request_admin_becomes_approver() {
        let world = World::seeded().await;
        let request = world.request_in(RequestStatus::InProgress).await;

        let voucher = world
            .vouchers
            .create(&world.owner(), draft(&request.id))
            .await
            .expect("create voucher");
        assert_eq!(voucher.status, VoucherStatus::Pending);
        assert_eq!(voucher.approver_id.0, ADMIN);

        let by_admin = world.vouchers.create(&world.admin(), draft(&request.id)).await;
        assert!(matches!(by_admin, Err(EngineError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn approve_and_deny_are_gated_on_the_assigned_approver() {
        let world = World::seeded().await;
        let request = world.request_in(RequestStatus::InProgress).await;
        let voucher = world
            .vouchers
            .create(&world.owner(), draft(&request.id))
            .await
            .expect("create voucher");

        let by_soi = world.vouchers.approve(&world.soi(), &voucher.id).await;
        assert!(matches!(by_soi, Err(EngineError::Unauthorized(_))));

        let approved =
            world.vouchers.approve(&world.admin(), &voucher.id).await.expect("approve");
        assert_eq!(approved.status, VoucherStatus::Approved);

        // Already decided: a second decision conflicts, and the request's
        // own status never moved.
        let denied = world.vouchers.deny(&world.admin(), &voucher.id).await;
        assert!(matches!(denied, Err(EngineError::Conflict(_))));
        assert_eq!(
            world.backend.request(&request.id).await.expect("request").status,
            RequestStatus::InProgress
        );
    }

    #[tokio::test]
    async fn update_and_delete_only_while_pending() {
        let world = World::seeded().await;
        let request = world.request_in(RequestStatus::InProgress).await;
        let voucher = world
            .vouchers
            .create(&world.owner(), draft(&request.id))
            .await
            .expect("create voucher");

        let patched = world
            .vouchers
            .update(
                &world.owner(),
                &voucher.id,
                VoucherPatch {
                    amount: Some(Decimal::new(210000, 2)),
                    ..VoucherPatch::default()
                },
            )
            .await
            .expect("patch");
        assert_eq!(patched.amount, Decimal::new(210000, 2));
        assert_eq!(patched.classification, "lodging");

        world.vouchers.approve(&world.admin(), &voucher.id).await.expect("approve");

        let late_patch = world
            .vouchers
            .update(&world.owner(), &voucher.id, VoucherPatch::default())
            .await;
        assert!(matches!(late_patch, Err(EngineError::Conflict(_))));
        let late_delete = world.vouchers.delete(&world.owner(), &voucher.id).await;
        assert!(matches!(late_delete, Err(EngineError::Conflict(_))));
    }

    #[tokio::test]
    async fn listing_reports_not_found_when_a_request_has_no_vouchers() {
        let world = World::seeded().await;
        let request = world.request_in(RequestStatus::InProgress).await;

        let empty = world.vouchers.list_by_request(&world.owner(), &request.id).await;
        assert!(matches!(empty, Err(EngineError::NotFound("vouchers"))));

        world
            .vouchers
            .create(&world.owner(), draft(&request.id))
            .await
            .expect("create voucher");
        let listed = world
            .vouchers
            .list_by_request(&world.admin(), &request.id)
            .await
            .expect("list");
        assert_eq!(listed.len(), 1);

        let stranger = Actor::new(UserId("u-stranger".to_string()));
        let denied = world.vouchers.list_by_request(&stranger, &request.id).await;
        assert!(matches!(denied, Err(EngineError::Unauthorized(_))));
    }
}
