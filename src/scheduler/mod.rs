//! Reconciliation scheduler.
//!
//! Two periodic jobs, each on its own tokio task:
//!
//! | job | default period | purpose |
//! |-----|----------------|---------|
//! | `reminders` | 24h | remind evaluators who still owe answers |
//! | `completion_catch_up` | 1h | re-run the cascade for participants the inline path missed |
//!
//! A job never overlaps itself. Each sweep holds a per-job lock while it
//! runs: a scheduled tick that finds it taken is skipped, and an on-demand
//! run is refused with a conflict. Missed ticks are skipped. Every run is
//! isolated, so an error or panic is logged and counted and the schedule
//! keeps going.

pub mod completion;
pub mod reminders;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::db::models::error_codes;
use crate::error::{AppError, AppResult};

pub use completion::{CompletionReport, CompletionSweep};
pub use reminders::{ReminderReport, ReminderSweep};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Reminders,
    CompletionCatchUp,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::Reminders, JobKind::CompletionCatchUp];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Reminders => "reminders",
            JobKind::CompletionCatchUp => "completion_catch_up",
        }
    }

    /// Accepts the snake_case name and the short `completion` alias.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "reminders" => Some(JobKind::Reminders),
            "completion" | "completion_catch_up" | "completion-catch-up" => {
                Some(JobKind::CompletionCatchUp)
            }
            _ => None,
        }
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum SweepReport {
    Reminders(ReminderReport),
    CompletionCatchUp(CompletionReport),
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct JobStatus {
    pub job: JobKind,
    pub running: bool,
    pub interval_secs: u64,
    pub runs: u64,
    pub failures: u64,
    pub last_run_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct JobStats {
    runs: AtomicU64,
    failures: AtomicU64,
    last_run_at: Mutex<Option<DateTime<Utc>>>,
}

impl JobStats {
    fn record(&self, ok: bool) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        *self
            .last_run_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
    }
}

/// The sweeps plus their counters and run locks; shared with the spawned
/// job tasks.
struct Sweeps {
    reminders: ReminderSweep,
    completion: CompletionSweep,
    reminder_stats: JobStats,
    completion_stats: JobStats,
    reminder_lock: AsyncMutex<()>,
    completion_lock: AsyncMutex<()>,
}

impl Sweeps {
    fn stats(&self, kind: JobKind) -> &JobStats {
        match kind {
            JobKind::Reminders => &self.reminder_stats,
            JobKind::CompletionCatchUp => &self.completion_stats,
        }
    }

    fn lock(&self, kind: JobKind) -> &AsyncMutex<()> {
        match kind {
            JobKind::Reminders => &self.reminder_lock,
            JobKind::CompletionCatchUp => &self.completion_lock,
        }
    }

    async fn run(&self, kind: JobKind) -> AppResult<SweepReport> {
        match kind {
            JobKind::Reminders => self.reminders.run().await.map(SweepReport::Reminders),
            JobKind::CompletionCatchUp => self
                .completion
                .run()
                .await
                .map(SweepReport::CompletionCatchUp),
        }
    }

    /// One sweep with a panic turned into an error. The outcome is counted.
    /// The caller must hold the job's lock.
    async fn run_counted(&self, kind: JobKind) -> AppResult<SweepReport> {
        let result = match AssertUnwindSafe(self.run(kind)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!(job = kind.as_str(), "Sweep panicked");
                Err(AppError::Internal(format!("{} sweep panicked", kind.as_str())))
            }
        };
        self.stats(kind).record(result.is_ok());
        result
    }

    /// A scheduled tick. Skipped while an on-demand run of the same job holds
    /// the lock.
    async fn run_scheduled(&self, kind: JobKind) {
        let Ok(_guard) = self.lock(kind).try_lock() else {
            debug!(job = kind.as_str(), "Sweep already running; tick skipped");
            return;
        };
        if let Err(e) = self.run_counted(kind).await {
            error!(job = kind.as_str(), error = %e, "Scheduled sweep failed");
        }
    }
}

struct RunningJob {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the periodic reconciliation jobs. Built once at startup and shared
/// through `AppState`.
pub struct ReconciliationScheduler {
    sweeps: Arc<Sweeps>,
    reminder_interval: Duration,
    completion_interval: Duration,
    jobs: Mutex<HashMap<JobKind, RunningJob>>,
}

impl ReconciliationScheduler {
    pub fn new(reminders: ReminderSweep, completion: CompletionSweep, config: &SchedulerConfig) -> Self {
        Self {
            sweeps: Arc::new(Sweeps {
                reminders,
                completion,
                reminder_stats: JobStats::default(),
                completion_stats: JobStats::default(),
                reminder_lock: AsyncMutex::new(()),
                completion_lock: AsyncMutex::new(()),
            }),
            reminder_interval: config.reminder_interval,
            completion_interval: config.completion_sweep_interval,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<JobKind, RunningJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn interval(&self, kind: JobKind) -> Duration {
        match kind {
            JobKind::Reminders => self.reminder_interval,
            JobKind::CompletionCatchUp => self.completion_interval,
        }
    }

    /// Starts every job that is not already running.
    pub fn start(&self) {
        for kind in JobKind::ALL {
            self.start_job(kind);
        }
    }

    /// Returns false if the job was already running. Must be called from
    /// within a tokio runtime.
    pub fn start_job(&self, kind: JobKind) -> bool {
        let mut jobs = self.jobs();
        if jobs.get(&kind).is_some_and(|job| !job.handle.is_finished()) {
            return false;
        }

        let period = self.interval(kind);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_job(self.sweeps.clone(), kind, period, shutdown_rx));
        jobs.insert(kind, RunningJob { shutdown, handle });
        info!(job = kind.as_str(), interval_secs = period.as_secs(), "Scheduled job started");
        true
    }

    /// Signals the job to stop and waits for its current iteration to finish.
    /// Returns false if it was not running.
    pub async fn stop_job(&self, kind: JobKind) -> bool {
        let job = self.jobs().remove(&kind);
        let Some(job) = job else {
            return false;
        };
        let _ = job.shutdown.send(true);
        if let Err(e) = job.handle.await {
            warn!(job = kind.as_str(), error = %e, "Scheduled job ended abnormally");
        }
        info!(job = kind.as_str(), "Scheduled job stopped");
        true
    }

    pub async fn stop(&self) {
        for kind in JobKind::ALL {
            self.stop_job(kind).await;
        }
    }

    pub fn is_running(&self, kind: JobKind) -> bool {
        self.jobs()
            .get(&kind)
            .is_some_and(|job| !job.handle.is_finished())
    }

    pub fn status(&self) -> Vec<JobStatus> {
        JobKind::ALL
            .iter()
            .map(|&kind| {
                let stats = self.sweeps.stats(kind);
                JobStatus {
                    job: kind,
                    running: self.is_running(kind),
                    interval_secs: self.interval(kind).as_secs(),
                    runs: stats.runs.load(Ordering::Relaxed),
                    failures: stats.failures.load(Ordering::Relaxed),
                    last_run_at: *stats
                        .last_run_at
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner),
                }
            })
            .collect()
    }

    /// Runs one sweep now, outside the schedule. Counted and isolated like a
    /// scheduled run; refused while the same job is already sweeping.
    pub async fn run_once(&self, kind: JobKind) -> AppResult<SweepReport> {
        let Ok(_guard) = self.sweeps.lock(kind).try_lock() else {
            return Err(AppError::conflict_with_code(
                format!("The {} sweep is already running", kind.as_str()),
                None,
                error_codes::SCHEDULER_JOB_RUNNING,
            ));
        };
        self.sweeps.run_counted(kind).await
    }
}

async fn run_job(sweeps: Arc<Sweeps>, kind: JobKind, period: Duration, mut shutdown: watch::Receiver<bool>) {
    // First run after one full period, not at startup
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                sweeps.run_scheduled(kind).await;
            }
        }
    }
}
