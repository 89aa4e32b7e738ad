//! Visitor registration, capture and administration

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;

use crate::{
    error::AppResult,
    models::{
        report::ReportOwner,
        status::{LifecycleStatus, VisitorStatus},
        timeline::TimelineOwner,
        user::UserClaims,
        visitor::{RegisterVisitor, Registration, UpdateVisitor, Visitor, VisitorQuery},
    },
    repository::Repository,
};

use super::{
    codes::{render_and_store, visitor_pass_payload, CodeRenderer},
    lifecycle::LifecycleService,
    notifier::NotificationService,
    reports::ReportsService,
    storage::{object_key, ObjectStore},
};

#[derive(Clone)]
pub struct VisitorsService {
    repository: Repository,
    lifecycle: LifecycleService,
    reports: ReportsService,
    notifier: NotificationService,
    store: Arc<dyn ObjectStore>,
    codes: Arc<dyn CodeRenderer>,
    tz: Tz,
}

impl VisitorsService {
    pub fn new(
        repository: Repository,
        lifecycle: LifecycleService,
        reports: ReportsService,
        notifier: NotificationService,
        store: Arc<dyn ObjectStore>,
        codes: Arc<dyn CodeRenderer>,
        tz: Tz,
    ) -> Self {
        Self {
            repository,
            lifecycle,
            reports,
            notifier,
            store,
            codes,
            tz,
        }
    }

    /// Register a visitor.
    ///
    /// A new email creates a visitor (`pending` when self-registered,
    /// `created` when entered by staff). A known email marks the visitor as
    /// returning: contact fields are refreshed, the previous visit is cleared,
    /// the status moves to `revisit` and the report opens a new visit cycle.
    ///
    /// Registrations of the same email are serialized, so concurrent requests
    /// resolve to one new visitor and returning registrations.
    pub async fn register(
        &self,
        data: &RegisterVisitor,
        actor: Option<&UserClaims>,
    ) -> AppResult<Registration> {
        let mut tx = self.repository.pool.begin().await?;
        let actor_id = self.lifecycle.sync_actor(&mut *tx, actor).await?;

        let existing = self
            .repository
            .visitors
            .lock_by_email(&mut *tx, data.email.trim())
            .await?;

        let registration = match existing {
            Some(visitor) => {
                let refreshed = self
                    .repository
                    .visitors
                    .refresh_for_revisit(&mut *tx, visitor.id, data)
                    .await?;
                let (visitor, _) = self
                    .lifecycle
                    .apply_visitor(&mut *tx, refreshed, VisitorStatus::Revisit, actor_id)
                    .await?;
                self.reports
                    .open_cycle(&mut *tx, ReportOwner::Visitor(visitor.id), Utc::now())
                    .await?;
                tracing::info!("Returning visitor {} re-registered", visitor.id);
                Registration {
                    visitor,
                    returning: true,
                }
            }
            None => {
                let status = if actor.is_some() {
                    VisitorStatus::Created
                } else {
                    VisitorStatus::Pending
                };
                let visitor = self
                    .repository
                    .visitors
                    .insert(&mut *tx, data, status, actor_id)
                    .await?;
                self.lifecycle
                    .record_initial(&mut *tx, TimelineOwner::Visitor(visitor.id), status.as_str(), actor_id)
                    .await?;
                tracing::info!("Visitor {} registered as {}", visitor.id, status);
                Registration {
                    visitor,
                    returning: false,
                }
            }
        };

        tx.commit().await?;

        self.notifier.notify_visitor(&registration.visitor).await;
        Ok(registration)
    }

    /// Store a captured photo, issue the visitor's pass and open their report
    pub async fn capture_image(&self, id: i32, bytes: Vec<u8>) -> AppResult<Visitor> {
        // Fail fast on unknown visitors before writing anything
        let visitor = self.repository.visitors.get_by_id(id).await?;

        let key = object_key("visitors", &bytes);
        let url = self.store.store(bytes, &key).await?;
        let pass = visitor_pass_payload(&visitor);
        let pass_url =
            render_and_store(self.codes.as_ref(), self.store.as_ref(), &pass, "visitors/pass").await;

        let mut tx = self.repository.pool.begin().await?;
        self.repository.visitors.lock(&mut *tx, id).await?;
        let visitor = self
            .repository
            .visitors
            .set_capture(&mut *tx, id, &url, pass_url.as_deref())
            .await?;
        self.reports
            .open_cycle(&mut *tx, ReportOwner::Visitor(id), Utc::now())
            .await?;
        tx.commit().await?;

        Ok(visitor)
    }

    /// List visitors
    pub async fn list(&self, query: &VisitorQuery) -> AppResult<(Vec<Visitor>, i64)> {
        self.repository.visitors.list(query, self.tz).await
    }

    /// Get visitor by ID
    pub async fn get(&self, id: i32) -> AppResult<Visitor> {
        self.repository.visitors.get_by_id(id).await
    }

    /// Update contact fields
    pub async fn update(&self, id: i32, data: &UpdateVisitor) -> AppResult<Visitor> {
        self.repository.visitors.update(id, data).await
    }

    /// Delete a visitor with its timeline and report
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.visitors.delete(id).await
    }
}
