pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod notifications;
pub mod routes;
pub mod scheduler;
pub mod schema;
pub mod services;
pub mod store;
pub mod validation;

use crate::config::{CascadeMode, LoggingConfig, SchedulerConfig};
use crate::middleware::auth::AuthService;
use crate::notifications::{NotificationTemplates, Notifier};
use crate::scheduler::{CompletionSweep, ReconciliationScheduler, ReminderSweep};
use crate::services::cascade::{CascadeDispatcher, CascadeEvaluator};
use crate::store::AssessmentStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub struct AppState {
    pub store: Arc<dyn AssessmentStore>,
    pub notifier: Arc<dyn Notifier>,
    pub templates: NotificationTemplates,
    pub cascade: CascadeDispatcher,
    pub scheduler: Arc<ReconciliationScheduler>,
    pub auth: AuthService,
}

impl AppState {
    /// Wires the cascade and the reconciliation jobs around one store and
    /// notifier. Must run inside a tokio runtime when `cascade_mode` is queued.
    pub fn new(
        store: Arc<dyn AssessmentStore>,
        notifier: Arc<dyn Notifier>,
        templates: NotificationTemplates,
        auth: AuthService,
        cascade_mode: CascadeMode,
        scheduler_config: &SchedulerConfig,
    ) -> Self {
        let evaluator = Arc::new(CascadeEvaluator::new(
            store.clone(),
            notifier.clone(),
            templates.clone(),
        ));

        let cascade = match cascade_mode {
            CascadeMode::Inline => CascadeDispatcher::inline(evaluator.clone()),
            CascadeMode::Queued => {
                // The worker stops by itself when the last sender goes away
                let (dispatcher, _worker) = CascadeDispatcher::queued(evaluator.clone());
                dispatcher
            }
        };

        let reminders = ReminderSweep::new(
            store.clone(),
            notifier.clone(),
            templates.clone(),
            scheduler_config.reminder_send_delay,
            scheduler_config.reminder_include_in_progress,
        );
        let completion = CompletionSweep::new(store.clone(), evaluator);
        let scheduler = Arc::new(ReconciliationScheduler::new(
            reminders,
            completion,
            scheduler_config,
        ));

        Self {
            store,
            notifier,
            templates,
            cascade,
            scheduler,
            auth,
        }
    }
}

pub fn init_tracing(config: &LoggingConfig) {
    let level_filter = match config.level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_filter));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .init();
        }
    }
}
