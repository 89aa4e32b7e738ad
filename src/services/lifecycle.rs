//! Status transition engine
//!
//! The only path that changes a visitor's or invite's status. Each applied
//! transition writes the entity, appends one timeline row carrying the new
//! status and syncs the owner's report, all inside one transaction holding a
//! row lock on the entity. Notifications go out after commit.
//!
//! Setting the status an entity already has is a no-op: nothing is written,
//! no timeline row is appended and nobody is notified.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    error::AppResult,
    models::{
        invite::Invite,
        report::ReportOwner,
        status::{InviteStatus, LifecycleStatus, StatusChange, VisitorStatus},
        timeline::{TimelineEntry, TimelineOwner},
        user::UserClaims,
        visitor::Visitor,
    },
    repository::Repository,
};

use super::{
    notifier::NotificationService,
    reports::{CycleSignal, ReportsService},
};

/// Plan the field writes for moving from `current` to `target`.
///
/// Returns `None` when the status does not change. `check_in` is only set
/// when the entity has none yet; `deactivate` applies to entities that go
/// inactive on check-out.
pub fn plan_transition<S: LifecycleStatus>(
    current: S,
    current_check_in: Option<DateTime<Utc>>,
    target: S,
    deactivate_on_check_out: bool,
    now: DateTime<Utc>,
) -> Option<StatusChange<S>> {
    if current == target {
        return None;
    }

    Some(StatusChange {
        status: target,
        check_in: (target.is_checked_in() && current_check_in.is_none()).then_some(now),
        check_out: target.is_checked_out().then_some(now),
        deactivate: deactivate_on_check_out && target.is_checked_out(),
    })
}

/// Report signal implied by a status, if any
pub fn report_signal<S: LifecycleStatus>(status: S) -> Option<CycleSignal> {
    if status.is_checked_in() {
        Some(CycleSignal::CheckIn)
    } else if status.is_checked_out() {
        Some(CycleSignal::CheckOut)
    } else {
        None
    }
}

#[derive(Clone)]
pub struct LifecycleService {
    repository: Repository,
    reports: ReportsService,
    notifier: NotificationService,
}

impl LifecycleService {
    pub fn new(repository: Repository, reports: ReportsService, notifier: NotificationService) -> Self {
        Self {
            repository,
            reports,
            notifier,
        }
    }

    /// Change a visitor's status
    pub async fn transition_visitor(
        &self,
        id: i32,
        status: &str,
        actor: Option<&UserClaims>,
    ) -> AppResult<Visitor> {
        let target: VisitorStatus = status.parse()?;

        let mut tx = self.repository.pool.begin().await?;
        let actor_id = self.sync_actor(&mut *tx, actor).await?;
        let visitor = self.repository.visitors.lock(&mut *tx, id).await?;
        let (visitor, changed) = self.apply_visitor(&mut *tx, visitor, target, actor_id).await?;
        tx.commit().await?;

        if changed {
            self.notifier.notify_visitor(&visitor).await;
        }
        Ok(visitor)
    }

    /// Change an invite's status
    pub async fn transition_invite(
        &self,
        id: i32,
        status: &str,
        actor: Option<&UserClaims>,
    ) -> AppResult<Invite> {
        let target: InviteStatus = status.parse()?;

        let mut tx = self.repository.pool.begin().await?;
        let actor_id = self.sync_actor(&mut *tx, actor).await?;
        let invite = self.repository.invites.lock(&mut *tx, id).await?;
        let (invite, changed) = self.apply_invite(&mut *tx, invite, target, actor_id).await?;
        tx.commit().await?;

        if changed {
            self.notifier.notify_invite(&invite).await;
        }
        Ok(invite)
    }

    /// Apply a visitor transition inside the caller's transaction. The
    /// visitor row must already be locked. Returns whether anything changed.
    pub async fn apply_visitor(
        &self,
        conn: &mut PgConnection,
        visitor: Visitor,
        target: VisitorStatus,
        actor: Option<i32>,
    ) -> AppResult<(Visitor, bool)> {
        let now = Utc::now();
        let Some(change) = plan_transition(visitor.status, visitor.check_in, target, true, now) else {
            tracing::debug!("Visitor {} already {}, nothing to do", visitor.id, target);
            return Ok((visitor, false));
        };

        let from = visitor.status;
        let updated = self
            .repository
            .visitors
            .apply_status(&mut *conn, visitor.id, &change)
            .await?;
        let owner = TimelineOwner::Visitor(updated.id);
        self.repository
            .timeline
            .append(&mut *conn, owner, target.as_str(), actor)
            .await?;
        self.sync_report(&mut *conn, owner, target, now).await?;

        tracing::info!(
            "{} {} status {} -> {} (actor: {:?})",
            VisitorStatus::KIND,
            updated.id,
            from,
            target,
            actor
        );
        Ok((updated, true))
    }

    /// Apply an invite transition inside the caller's transaction. The
    /// invite row must already be locked. Returns whether anything changed.
    pub async fn apply_invite(
        &self,
        conn: &mut PgConnection,
        invite: Invite,
        target: InviteStatus,
        actor: Option<i32>,
    ) -> AppResult<(Invite, bool)> {
        let now = Utc::now();
        let Some(change) = plan_transition(invite.status, invite.check_in, target, false, now) else {
            tracing::debug!("Invite {} already {}, nothing to do", invite.id, target);
            return Ok((invite, false));
        };

        let from = invite.status;
        let updated = self
            .repository
            .invites
            .apply_status(&mut *conn, invite.id, &change)
            .await?;
        let owner = TimelineOwner::Invite(updated.id);
        self.repository
            .timeline
            .append(&mut *conn, owner, target.as_str(), actor)
            .await?;
        self.sync_report(&mut *conn, owner, target, now).await?;

        tracing::info!(
            "{} {} status {} -> {} (actor: {:?})",
            InviteStatus::KIND,
            updated.id,
            from,
            target,
            actor
        );
        Ok((updated, true))
    }

    /// Record the initial status of a newly created entity
    pub async fn record_initial(
        &self,
        conn: &mut PgConnection,
        owner: TimelineOwner,
        status: &str,
        actor: Option<i32>,
    ) -> AppResult<()> {
        self.repository.timeline.append(conn, owner, status, actor).await
    }

    /// Make sure the acting principal exists and return its id
    pub async fn sync_actor(
        &self,
        conn: &mut PgConnection,
        actor: Option<&UserClaims>,
    ) -> AppResult<Option<i32>> {
        match actor {
            Some(claims) => {
                let user = self.repository.users.sync_principal(conn, claims).await?;
                Ok(Some(user.id))
            }
            None => Ok(None),
        }
    }

    /// Status history of an entity, newest first
    pub async fn timeline(&self, owner: TimelineOwner) -> AppResult<Vec<TimelineEntry>> {
        match owner {
            TimelineOwner::Visitor(id) => {
                self.repository.visitors.get_by_id(id).await?;
            }
            TimelineOwner::Invite(id) => {
                self.repository.invites.get_by_id(id).await?;
            }
        }
        self.repository.timeline.list(owner).await
    }

    async fn sync_report<S: LifecycleStatus>(
        &self,
        conn: &mut PgConnection,
        owner: TimelineOwner,
        status: S,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Some(signal) = report_signal(status) {
            self.reports
                .sync(conn, ReportOwner::from(owner), signal, now)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn same_status_is_a_no_op() {
        let now = Utc::now();
        assert!(plan_transition(VisitorStatus::Approved, None, VisitorStatus::Approved, true, now).is_none());
        assert!(plan_transition(InviteStatus::CheckedIn, Some(now), InviteStatus::CheckedIn, false, now).is_none());
    }

    #[test]
    fn check_in_sets_timestamp_only_once() {
        let now = Utc::now();
        let first = plan_transition(VisitorStatus::Approved, None, VisitorStatus::CheckedIn, true, now).unwrap();
        assert_eq!(first.check_in, Some(now));
        assert_eq!(first.check_out, None);
        assert!(!first.deactivate);

        let earlier = now - Duration::hours(2);
        let again = plan_transition(InviteStatus::Approved, Some(earlier), InviteStatus::CheckedIn, false, now).unwrap();
        assert_eq!(again.check_in, None);
    }

    #[test]
    fn visitor_check_out_deactivates() {
        let now = Utc::now();
        let change = plan_transition(VisitorStatus::CheckedIn, Some(now), VisitorStatus::CheckedOut, true, now).unwrap();
        assert_eq!(change.status, VisitorStatus::CheckedOut);
        assert_eq!(change.check_out, Some(now));
        assert!(change.deactivate);
    }

    #[test]
    fn invite_check_out_keeps_no_active_flag() {
        let now = Utc::now();
        let change = plan_transition(InviteStatus::CheckedIn, Some(now), InviteStatus::CheckedOut, false, now).unwrap();
        assert_eq!(change.check_out, Some(now));
        assert!(!change.deactivate);
    }

    #[test]
    fn plain_transitions_touch_only_status() {
        let now = Utc::now();
        let change = plan_transition(InviteStatus::Created, None, InviteStatus::Rejected, false, now).unwrap();
        assert_eq!(
            change,
            StatusChange {
                status: InviteStatus::Rejected,
                check_in: None,
                check_out: None,
                deactivate: false,
            }
        );
    }

    #[test]
    fn only_check_in_and_check_out_reach_the_report() {
        assert_eq!(report_signal(VisitorStatus::CheckedIn), Some(CycleSignal::CheckIn));
        assert_eq!(report_signal(InviteStatus::CheckedOut), Some(CycleSignal::CheckOut));
        for status in [VisitorStatus::Pending, VisitorStatus::Approved, VisitorStatus::Revisit] {
            assert_eq!(report_signal(status), None);
        }
    }

    #[test]
    fn every_distinct_pair_produces_a_change_to_the_target() {
        let now = Utc::now();
        for from in InviteStatus::all() {
            for to in InviteStatus::all() {
                let plan = plan_transition(*from, None, *to, false, now);
                assert_eq!(plan.map(|c| c.status), (from != to).then_some(*to));
            }
        }
    }

    #[test]
    fn entity_and_report_share_the_transition_instant() {
        use super::super::reports::{plan_cycle, ReportChange};

        let now = Utc::now();
        let change = plan_transition(VisitorStatus::Approved, None, VisitorStatus::CheckedIn, true, now).unwrap();
        let signal = report_signal(change.status).unwrap();
        assert_eq!(plan_cycle(None, signal, now), ReportChange::Create { check_in: change.check_in });
    }
}
