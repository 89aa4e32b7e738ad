//! Gatepass visitor management server
//!
//! REST JSON API for registering visitors, issuing invites, tracking visit
//! status through check-in and check-out, and reporting on visits.

use std::sync::Arc;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use crate::config::AppConfig;
pub use error::{AppError, AppResult};

use crate::config::LoggingConfig;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

/// Install the global subscriber.
///
/// Stdout uses `logging.format` (`pretty` or `json`). When
/// `logging.directory` is set, JSON lines also go to a daily rolling file;
/// keep the returned guard alive for the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("gatepass_server={},tower_http=info", config.level).into()
        })
    };

    let mut layers = Vec::new();

    if config.format == "json" {
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_filter(filter())
                .boxed(),
        );
    } else {
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_filter(filter())
                .boxed(),
        );
    }

    let guard = config.directory.as_ref().map(|directory| {
        let appender = tracing_appender::rolling::daily(directory, "gatepass-server.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_writer(writer)
                .with_filter(filter())
                .boxed(),
        );
        guard
    });

    tracing_subscriber::registry().with(layers).init();

    guard
}
