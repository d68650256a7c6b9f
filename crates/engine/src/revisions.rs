use std::sync::Arc;

use tracing::warn;

use tripdesk_core::audit::RequestLogEntry;
use tripdesk_core::domain::request::{RequestId, RequestStatus};
use tripdesk_core::domain::revision::Revision;
use tripdesk_core::domain::user::Actor;
use tripdesk_core::notify::{messages, Notifier};
use tripdesk_db::repositories::{RequestRepository, RevisionRepository, UserDirectory};

use crate::error::EngineError;

/// Change-request feedback. Creating a revision is itself a transition: the
/// request lands in `Changes Needed` in the same transaction as the revision
/// row and the audit entry.
pub struct RevisionService {
    revisions: Arc<dyn RevisionRepository>,
    requests: Arc<dyn RequestRepository>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl RevisionService {
    pub fn new(
        revisions: Arc<dyn RevisionRepository>,
        requests: Arc<dyn RequestRepository>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { revisions, requests, users, notifier }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        request_id: &RequestId,
        comment: String,
    ) -> Result<Revision, EngineError> {
        let mut request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or(EngineError::NotFound("request"))?;
        if request.admin_id != actor.user_id {
            return Err(EngineError::Unauthorized(
                "only the assigned approver may request changes",
            ));
        }

        let from = request.status;
        request.transition_to(RequestStatus::ChangesNeeded)?;
        let owner = self
            .users
            .user_by_id(&request.owner_id)
            .await?
            .ok_or(EngineError::NotFound("user"))?;

        let revision =
            Revision::new(request_id.clone(), actor.user_id.clone(), comment.clone());
        let log = RequestLogEntry::status_changed(
            request_id.clone(),
            actor.user_id.clone(),
            from,
            RequestStatus::ChangesNeeded,
        );
        self.revisions.insert_with_status_change(&revision, &log).await?;

        let message = messages::changes_requested(&owner, &request.title, &comment);
        if let Err(error) = self.notifier.notify(&message).await {
            warn!(to = %message.to, %error, "notification delivery failed");
        }
        Ok(revision)
    }

    pub async fn list(
        &self,
        actor: &Actor,
        request_id: &RequestId,
    ) -> Result<Vec<Revision>, EngineError> {
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
        Ok(self.revisions.list_by_request(request_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use tripdesk_core::domain::request::{Priority, RequestStatus};
    use tripdesk_db::repositories::RequestRepository;

    use crate::error::EngineError;
    use crate::harness::{World, OWNER};

    #[tokio::test]
    async fn admin_feedback_moves_the_request_to_changes_needed() {
        let world = World::seeded().await;
        let request = world.create_request(Priority::Medium).await;

        let revision = world
            .revisions
            .create(
                &world.admin(),
                &request.id,
                "Trim the stay to two nights.".to_string(),
            )
            .await
            .expect("create revision");
        assert_eq!(revision.comment, "Trim the stay to two nights.");

        let stored = world.backend.request(&request.id).await.expect("stored");
        assert_eq!(stored.status, RequestStatus::ChangesNeeded);

        let logs = world.backend.logs_for_request(&request.id).await.expect("logs");
        assert_eq!(logs.len(), 2);
        assert_eq!(
            logs[1].report,
            "Status changed from 'Pending Review' to 'Changes Needed'."
        );

        let sent = world.notifier.sent();
        let last = sent.last().expect("notification");
        assert_eq!(last.subject, "Changes requested on your travel request");
        assert_eq!(last.to, format!("{OWNER}@example.com"));
        assert!(last.text.contains("Trim the stay to two nights."));
    }

    #[tokio::test]
    async fn repeated_feedback_keeps_the_request_in_changes_needed() {
        let world = World::seeded().await;
        let request = world.create_request(Priority::Medium).await;

        world
            .revisions
            .create(&world.admin(), &request.id, "First pass.".to_string())
            .await
            .expect("first revision");
        world
            .revisions
            .create(&world.admin(), &request.id, "Second pass.".to_string())
            .await
            .expect("second revision");

        let listed = world
            .revisions
            .list(&world.owner(), &request.id)
            .await
            .expect("list revisions");
        assert_eq!(listed.len(), 2);
        assert_eq!(
            world.backend.request(&request.id).await.expect("stored").status,
            RequestStatus::ChangesNeeded
        );
    }

    #[tokio::test]
    async fn only_the_assigned_admin_may_request_changes() {
        let world = World::seeded().await;
        let request = world.create_request(Priority::Medium).await;

        let by_owner = world
            .revisions
            .create(&world.owner(), &request.id, "self-review".to_string())
            .await;
        assert!(matches!(by_owner, Err(EngineError::Unauthorized(_))));

        let by_soi = world
            .revisions
            .create(&world.soi(), &request.id, "not my call".to_string())
            .await;
        assert!(matches!(by_soi, Err(EngineError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn feedback_after_review_has_closed_is_a_conflict() {
        let world = World::seeded().await;
        let request = world.create_request(Priority::Medium).await;
        world.lifecycle.deny(&world.admin(), &request.id).await.expect("deny");

        let result = world
            .revisions
            .create(&world.admin(), &request.id, "too late".to_string())
            .await;
        assert!(matches!(result, Err(EngineError::Conflict(_))));
        assert_eq!(
            world.backend.request(&request.id).await.expect("stored").status,
            RequestStatus::Denied
        );
    }
}
