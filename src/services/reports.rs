//! Report aggregator: one report per visitor or invite, tracking the current
//! visit cycle and a cumulative visit counter.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sqlx::PgConnection;

use crate::{
    error::AppResult,
    models::report::{Report, ReportDetails, ReportOwner, ReportQuery, UpdateReport},
    repository::Repository,
};

/// Signal fed into the aggregator for an owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleSignal {
    /// Capture or re-registration: a visit is about to happen
    Open,
    CheckIn,
    CheckOut,
}

/// Write decided for one signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportChange {
    Nothing,
    Create {
        check_in: Option<DateTime<Utc>>,
    },
    Update {
        visit_count: i32,
        check_in: Option<DateTime<Utc>>,
        check_out: Option<DateTime<Utc>>,
    },
}

/// Decide how a report reacts to a signal.
///
/// A cycle whose `check_in` is still unset has already been counted, so the
/// first check-in fills it in without incrementing. A new check-in on a used
/// cycle starts the next one and clears the previous `check_out`.
pub fn plan_cycle(existing: Option<&Report>, signal: CycleSignal, now: DateTime<Utc>) -> ReportChange {
    match (existing, signal) {
        (None, CycleSignal::Open) => ReportChange::Create { check_in: None },
        (None, CycleSignal::CheckIn) => ReportChange::Create { check_in: Some(now) },
        (None, CycleSignal::CheckOut) => ReportChange::Nothing,

        (Some(r), CycleSignal::Open) => match r.check_in {
            None => ReportChange::Nothing,
            Some(_) => ReportChange::Update {
                visit_count: r.visit_count + 1,
                check_in: None,
                check_out: None,
            },
        },
        (Some(r), CycleSignal::CheckIn) => ReportChange::Update {
            visit_count: if r.check_in.is_some() {
                r.visit_count + 1
            } else {
                r.visit_count
            },
            check_in: Some(now),
            check_out: None,
        },
        (Some(r), CycleSignal::CheckOut) => match r.check_in {
            Some(check_in) => ReportChange::Update {
                visit_count: r.visit_count,
                check_in: Some(check_in),
                check_out: Some(now.max(check_in)),
            },
            None => ReportChange::Nothing,
        },
    }
}

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
    tz: Tz,
}

impl ReportsService {
    pub fn new(repository: Repository, tz: Tz) -> Self {
        Self { repository, tz }
    }

    /// Apply a signal to the owner's report inside the caller's transaction.
    /// The report row is locked before it is read.
    ///
    /// `now` is the instant of the transition that produced the signal, so the
    /// report and its owner record the same check-in and check-out times.
    pub async fn sync(
        &self,
        conn: &mut PgConnection,
        owner: ReportOwner,
        signal: CycleSignal,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Report>> {
        let existing = self.repository.reports.lock_by_owner(&mut *conn, owner).await?;
        let change = plan_cycle(existing.as_ref(), signal, now);

        let report = match (change, existing) {
            (ReportChange::Create { check_in }, _) => {
                Some(self.repository.reports.insert(&mut *conn, owner, check_in).await?)
            }
            (
                ReportChange::Update {
                    visit_count,
                    check_in,
                    check_out,
                },
                Some(current),
            ) => Some(
                self.repository
                    .reports
                    .update_cycle(&mut *conn, current.id, visit_count, check_in, check_out)
                    .await?,
            ),
            (_, existing) => existing,
        };

        tracing::debug!("Report sync {:?} for {}: {:?}", signal, owner, change);
        Ok(report)
    }

    /// Open a new visit cycle (capture, re-registration)
    pub async fn open_cycle(
        &self,
        conn: &mut PgConnection,
        owner: ReportOwner,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Report>> {
        self.sync(conn, owner, CycleSignal::Open, now).await
    }

    /// Record a check-in for the owner
    pub async fn sync_check_in(
        &self,
        conn: &mut PgConnection,
        owner: ReportOwner,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Report>> {
        self.sync(conn, owner, CycleSignal::CheckIn, now).await
    }

    /// Record a check-out for the owner; no-op when nothing was checked in
    pub async fn sync_check_out(
        &self,
        conn: &mut PgConnection,
        owner: ReportOwner,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Report>> {
        self.sync(conn, owner, CycleSignal::CheckOut, now).await
    }

    /// Get the report of an owner
    pub async fn get_by_owner(&self, owner: ReportOwner) -> AppResult<Option<Report>> {
        self.repository.reports.get_by_owner(owner).await
    }

    /// List reports with owner details
    pub async fn list(&self, query: &ReportQuery) -> AppResult<(Vec<ReportDetails>, i64)> {
        self.repository.reports.list(query, self.tz).await
    }

    /// Get report by ID
    pub async fn get(&self, id: i32) -> AppResult<ReportDetails> {
        self.repository.reports.get_details(id).await
    }

    /// Update report remarks
    pub async fn update(&self, id: i32, data: &UpdateReport) -> AppResult<ReportDetails> {
        let remarks = data.remarks.as_deref().map(str::trim).filter(|s| !s.is_empty());
        self.repository.reports.update_remarks(id, remarks).await?;
        self.repository.reports.get_details(id).await
    }

    /// Delete a report
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.reports.delete(id).await
    }
}
