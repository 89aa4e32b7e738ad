//! Invite issuance, verification and guest capture

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use rand::Rng;
use std::sync::Arc;

use crate::{
    config::VisitsConfig,
    error::{AppError, AppResult},
    models::{
        invite::{CreateInvite, Invite, InviteQuery, ReinviteRequest, UpdateInvite},
        status::{InviteStatus, LifecycleStatus},
        timeline::TimelineOwner,
        user::UserClaims,
    },
    repository::Repository,
};

use super::{
    codes::{invite_payload, pass_payload, render_and_store, CodeRenderer},
    lifecycle::LifecycleService,
    notifier::NotificationService,
    storage::{object_key, ObjectStore},
};

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LENGTH: usize = 8;
const CODE_ATTEMPTS: usize = 5;

/// Random upper-case alphanumeric invite code
pub fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// Resolve the visit window, defaulting the expiry to `visit + validity`
pub fn visit_window(
    visit_time: DateTime<Utc>,
    expiry_time: Option<DateTime<Utc>>,
    validity_hours: i64,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let expiry = expiry_time.unwrap_or(visit_time + Duration::hours(validity_hours));
    if expiry < visit_time {
        return Err(AppError::Validation(
            "expiry_time must not be before visit_time".to_string(),
        ));
    }
    Ok((visit_time, expiry))
}

/// Check that an invite can still be used by its guest
pub fn ensure_usable(invite: &Invite, now: DateTime<Utc>) -> AppResult<()> {
    if invite.is_expired(now) {
        return Err(AppError::Expired(format!(
            "Invite {} expired at {}",
            invite.invite_code,
            invite.expiry_time.to_rfc3339()
        )));
    }
    if invite.status == InviteStatus::Rejected {
        return Err(AppError::BusinessRule(format!(
            "Invite {} has been rejected",
            invite.invite_code
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct InvitesService {
    repository: Repository,
    lifecycle: LifecycleService,
    notifier: NotificationService,
    store: Arc<dyn ObjectStore>,
    codes: Arc<dyn CodeRenderer>,
    config: VisitsConfig,
    tz: Tz,
}

impl InvitesService {
    pub fn new(
        repository: Repository,
        lifecycle: LifecycleService,
        notifier: NotificationService,
        store: Arc<dyn ObjectStore>,
        codes: Arc<dyn CodeRenderer>,
        config: VisitsConfig,
    ) -> Self {
        Self {
            repository,
            lifecycle,
            notifier,
            store,
            codes,
            tz: config.tz(),
            config,
        }
    }

    /// Issue an invite and email the guest
    pub async fn create(&self, data: &CreateInvite, actor: &UserClaims) -> AppResult<Invite> {
        let (_, expiry) = visit_window(
            data.visit_time,
            data.expiry_time,
            self.config.invite_validity_hours,
        )?;
        let code = self.unused_code().await?;

        let mut tx = self.repository.pool.begin().await?;
        let actor_id = self.lifecycle.sync_actor(&mut *tx, Some(actor)).await?;
        let invited_by = actor_id.unwrap_or(actor.user_id);
        let invite = self
            .repository
            .invites
            .insert(&mut *tx, data, invited_by, &code, expiry)
            .await?;
        self.lifecycle
            .record_initial(
                &mut *tx,
                TimelineOwner::Invite(invite.id),
                InviteStatus::Created.as_str(),
                actor_id,
            )
            .await?;
        tx.commit().await?;

        tracing::info!("Invite {} issued by user {}", invite.id, invited_by);

        let invite = self.attach_code_image(invite).await;
        self.notifier.notify_invite(&invite).await;
        Ok(invite)
    }

    /// Reissue an invite with a fresh code and optionally a new visit window
    pub async fn reinvite(
        &self,
        id: i32,
        actor: &UserClaims,
        request: &ReinviteRequest,
    ) -> AppResult<Invite> {
        let code = self.unused_code().await?;

        let mut tx = self.repository.pool.begin().await?;
        let actor_id = self.lifecycle.sync_actor(&mut *tx, Some(actor)).await?;
        let current = self.repository.invites.lock(&mut *tx, id).await?;

        let visit_time = request.visit_time.unwrap_or(current.visit_time);
        let expiry_time = match (request.visit_time, request.expiry_time) {
            (_, Some(expiry)) => Some(expiry),
            (Some(_), None) => None,
            (None, None) => Some(current.expiry_time.max(visit_time)),
        };
        let (visit_time, expiry_time) =
            visit_window(visit_time, expiry_time, self.config.invite_validity_hours)?;

        let reissued = self
            .repository
            .invites
            .reissue(&mut *tx, id, &code, visit_time, expiry_time)
            .await?;
        let (invite, _) = self
            .lifecycle
            .apply_invite(&mut *tx, reissued, InviteStatus::Reinvited, actor_id)
            .await?;
        tx.commit().await?;

        let invite = self.attach_code_image(invite).await;
        self.notifier.notify_invite(&invite).await;
        Ok(invite)
    }

    /// Look up an invite by code for its guest
    pub async fn verify(&self, code: &str) -> AppResult<Invite> {
        let invite = self.repository.invites.get_by_code(code).await?;
        ensure_usable(&invite, Utc::now())?;
        Ok(invite)
    }

    /// Guest capture: store the photo, issue a pass and move the invite to
    /// `pending` for staff review
    pub async fn capture(&self, code: &str, bytes: Vec<u8>) -> AppResult<Invite> {
        let invite = self.verify(code).await?;

        let key = object_key("invites", &bytes);
        let image_url = self.store.store(bytes, &key).await?;
        let pass = pass_payload(&invite);
        let pass_url =
            render_and_store(self.codes.as_ref(), self.store.as_ref(), &pass, "invites/pass").await;

        let mut tx = self.repository.pool.begin().await?;
        let locked = self.repository.invites.lock(&mut *tx, invite.id).await?;
        ensure_usable(&locked, Utc::now())?;
        let captured = self
            .repository
            .invites
            .set_capture(&mut *tx, invite.id, &image_url, pass_url.as_deref())
            .await?;
        let (invite, changed) = self
            .lifecycle
            .apply_invite(&mut *tx, captured, InviteStatus::Pending, None)
            .await?;
        tx.commit().await?;

        if changed {
            self.notifier.notify_invite(&invite).await;
        }
        Ok(invite)
    }

    /// List invites
    pub async fn list(&self, query: &InviteQuery) -> AppResult<(Vec<Invite>, i64)> {
        self.repository.invites.list(query, self.tz).await
    }

    /// Get invite by ID
    pub async fn get(&self, id: i32) -> AppResult<Invite> {
        self.repository.invites.get_by_id(id).await
    }

    /// Get invite by code (staff lookup, no expiry check)
    pub async fn get_by_code(&self, code: &str) -> AppResult<Invite> {
        self.repository.invites.get_by_code(code).await
    }

    /// Update contact fields and visit window
    pub async fn update(&self, id: i32, data: &UpdateInvite) -> AppResult<Invite> {
        let current = self.repository.invites.get_by_id(id).await?;
        let visit_time = data.visit_time.unwrap_or(current.visit_time);
        let expiry_time = data.expiry_time.unwrap_or(current.expiry_time);
        visit_window(visit_time, Some(expiry_time), self.config.invite_validity_hours)?;

        self.repository.invites.update(id, data).await
    }

    /// Delete an invite with its timeline and report
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.invites.delete(id).await
    }

    async fn unused_code(&self) -> AppResult<String> {
        for _ in 0..CODE_ATTEMPTS {
            let code = generate_invite_code();
            if !self.repository.invites.code_exists(&code).await? {
                return Ok(code);
            }
        }
        Err(AppError::Internal("Could not allocate a unique invite code".to_string()))
    }

    /// Render the invite code image and record it; failures leave the invite as is
    async fn attach_code_image(&self, invite: Invite) -> Invite {
        let payload = invite_payload(&invite);
        let Some(url) =
            render_and_store(self.codes.as_ref(), self.store.as_ref(), &payload, "invites/qr").await
        else {
            return invite;
        };
        match self.repository.invites.set_qr_code(invite.id, &url).await {
            Ok(updated) => updated,
            Err(e) => {
                tracing::warn!("Failed to record code image for invite {}: {}", invite.id, e);
                invite
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite(expiry_offset_hours: i64, status: InviteStatus) -> Invite {
        let now = Utc::now();
        Invite {
            id: 3,
            invited_by: 1,
            visitor_name: "Ana".to_string(),
            visitor_email: "ana@x.com".to_string(),
            visitor_phone: None,
            purpose: None,
            visit_time: now - Duration::hours(48),
            expiry_time: now + Duration::hours(expiry_offset_hours),
            invite_code: "ZXCV0987".to_string(),
            status,
            image: None,
            qr_code: None,
            pass_image: None,
            check_in: None,
            checked_out: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn invite_codes_are_eight_upper_case_alphanumerics() {
        for _ in 0..50 {
            let code = generate_invite_code();
            assert_eq!(code.len(), 8);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn expiry_defaults_to_validity_window() {
        let visit = Utc::now();
        let (_, expiry) = visit_window(visit, None, 24).unwrap();
        assert_eq!(expiry - visit, Duration::hours(24));
    }

    #[test]
    fn expiry_before_visit_is_rejected() {
        let visit = Utc::now();
        let err = visit_window(visit, Some(visit - Duration::minutes(1)), 24).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn elapsed_invite_is_expired_not_returned() {
        let err = ensure_usable(&invite(-1, InviteStatus::Created), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Expired(_)));
    }

    #[test]
    fn rejected_invite_cannot_be_used() {
        let err = ensure_usable(&invite(5, InviteStatus::Rejected), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert!(ensure_usable(&invite(5, InviteStatus::Reinvited), Utc::now()).is_ok());
    }
}
