//! Business logic services

pub mod codes;
pub mod employees;
pub mod invites;
pub mod lifecycle;
pub mod notifier;
pub mod qr_codes;
pub mod reports;
pub mod stats;
pub mod storage;
pub mod visitors;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

use self::{
    codes::{CodeRenderer, HttpCodeRenderer},
    notifier::{Mailer, NotificationService, SmtpMailer},
    storage::{LocalObjectStore, ObjectStore},
};

/// External collaborators the services talk to
#[derive(Clone)]
pub struct Collaborators {
    pub mailer: Arc<dyn Mailer>,
    pub store: Arc<dyn ObjectStore>,
    pub codes: Arc<dyn CodeRenderer>,
}

impl Collaborators {
    /// SMTP mailer, local media directory and HTTP code renderer
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            mailer: Arc::new(SmtpMailer::new(config.email.clone())),
            store: Arc::new(LocalObjectStore::new(&config.storage)),
            codes: Arc::new(HttpCodeRenderer::new(&config.codes)),
        }
    }
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub lifecycle: lifecycle::LifecycleService,
    pub reports: reports::ReportsService,
    pub visitors: visitors::VisitorsService,
    pub invites: invites::InvitesService,
    pub stats: stats::StatsService,
    pub employees: employees::EmployeesService,
    pub qr_codes: qr_codes::QrCodesService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the configured collaborators
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self::with_collaborators(repository, config, Collaborators::from_config(config))
    }

    /// Create all services around the given collaborators
    pub fn with_collaborators(
        repository: Repository,
        config: &AppConfig,
        collaborators: Collaborators,
    ) -> Self {
        let notifier = NotificationService::new(collaborators.mailer, &config.visits);
        let tz = config.visits.tz();
        let reports = reports::ReportsService::new(repository.clone(), tz);
        let lifecycle =
            lifecycle::LifecycleService::new(repository.clone(), reports.clone(), notifier.clone());

        Self {
            visitors: visitors::VisitorsService::new(
                repository.clone(),
                lifecycle.clone(),
                reports.clone(),
                notifier.clone(),
                collaborators.store.clone(),
                collaborators.codes.clone(),
                tz,
            ),
            invites: invites::InvitesService::new(
                repository.clone(),
                lifecycle.clone(),
                notifier,
                collaborators.store.clone(),
                collaborators.codes.clone(),
                config.visits.clone(),
            ),
            qr_codes: qr_codes::QrCodesService::new(
                repository.clone(),
                collaborators.codes,
                collaborators.store,
                &config.visits,
            ),
            employees: employees::EmployeesService::new(repository.clone()),
            stats: stats::StatsService::new(repository.clone(), &config.visits),
            lifecycle,
            reports,
            repository,
        }
    }
}
