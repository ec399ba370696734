use crate::common::{Harness, HookedStore};
use chrono::Utc;
use feedback_backend::{
    config::SchedulerConfig,
    db::enums::{CycleStatus, RespondentStatus, RespondentType, UserRole},
    db::models::CycleChanges,
    error::AppError,
    scheduler::{CompletionSweep, JobKind, ReconciliationScheduler, ReminderSweep, SweepReport},
    store::AssessmentStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn reminders(h: &Harness, include_in_progress: bool) -> ReminderSweep {
    ReminderSweep::new(
        h.dyn_store(),
        h.dyn_notifier(),
        h.templates.clone(),
        Duration::ZERO,
        include_in_progress,
    )
}

fn paced_reminders(store: Arc<dyn AssessmentStore>, h: &Harness, delay: Duration) -> ReminderSweep {
    ReminderSweep::new(store, h.dyn_notifier(), h.templates.clone(), delay, true)
}

fn scheduler(h: &Harness, config: &SchedulerConfig) -> ReconciliationScheduler {
    ReconciliationScheduler::new(
        reminders(h, true),
        CompletionSweep::new(h.dyn_store(), h.evaluator.clone()),
        config,
    )
}

#[tokio::test]
async fn reminders_go_to_outstanding_chat_bound_evaluators() {
    let h = Harness::new();
    let mila = h.employee("Mila", None);
    let oskar = h.employee("Oskar", None);
    let nora = h.employee("Nora", None);
    let silent = h.store.seed_user("Sam", "Quiet", UserRole::User, None, None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &mila);

    let outstanding = h.respondent(&participant, &oskar, RespondentType::Peer);
    let finished = h.respondent(&participant, &nora, RespondentType::Peer);
    h.respondent(&participant, &silent, RespondentType::Peer);
    h.store.force_respondent_status(finished.id, RespondentStatus::Completed);

    let report = reminders(&h, true).run().await.unwrap();
    assert_eq!(report.candidates, 2);
    assert_eq!(report.sent, 1);
    assert_eq!(report.skipped, 1);

    let sent = h.notifier.sent_to("oskar");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "Survey reminder");
    assert!(sent[0].action_url.as_deref().unwrap().ends_with(&format!("/survey/{}", outstanding.id)));
    assert!(h.notifier.sent_to("nora").is_empty());
}

#[tokio::test]
async fn reminders_repeat_every_run() {
    let h = Harness::new();
    let mila = h.employee("Mila", None);
    let oskar = h.employee("Oskar", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &mila);
    h.respondent(&participant, &oskar, RespondentType::Peer);

    let sweep = reminders(&h, true);
    sweep.run().await.unwrap();
    sweep.run().await.unwrap();
    assert_eq!(h.notifier.sent_to("oskar").len(), 2);
}

#[tokio::test]
async fn in_progress_reminders_can_be_switched_off() {
    let h = Harness::new();
    let mila = h.employee("Mila", None);
    let oskar = h.employee("Oskar", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &mila);
    let respondent = h.respondent(&participant, &oskar, RespondentType::Peer);
    h.store
        .force_respondent_status(respondent.id, RespondentStatus::InProgress);

    assert_eq!(reminders(&h, false).run().await.unwrap().candidates, 0);
    assert_eq!(reminders(&h, true).run().await.unwrap().sent, 1);
}

#[tokio::test]
async fn reminders_skip_cycles_that_are_not_running() {
    let h = Harness::new();
    let mila = h.employee("Mila", None);
    let oskar = h.employee("Oskar", None);
    let cycle = h.cycle(CycleStatus::Completed);
    let participant = h.participant(&cycle, &mila);
    h.respondent(&participant, &oskar, RespondentType::Peer);

    let report = reminders(&h, true).run().await.unwrap();
    assert_eq!(report.candidates, 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn reminders_skip_cycles_ending_today() {
    let h = Harness::new();
    let mila = h.employee("Mila", None);
    let oskar = h.employee("Oskar", None);
    let cycle = h.cycle(CycleStatus::Draft);
    let today = Utc::now().date_naive();
    h.store
        .update_draft_cycle(
            cycle.id,
            &CycleChanges {
                name: cycle.name.clone(),
                description: None,
                start_date: today,
                end_date: today,
            },
        )
        .unwrap();
    h.store.force_cycle_status(cycle.id, CycleStatus::Active);
    let participant = h.participant(&h.store.cycle(cycle.id).unwrap(), &mila);
    h.respondent(&participant, &oskar, RespondentType::Peer);

    let report = reminders(&h, true).run().await.unwrap();
    assert_eq!(report.candidates, 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn a_failed_reminder_does_not_stop_the_sweep() {
    let h = Harness::new();
    let mila = h.employee("Mila", None);
    let oskar = h.employee("Oskar", None);
    let nora = h.employee("Nora", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &mila);
    h.respondent(&participant, &oskar, RespondentType::Peer);
    h.respondent(&participant, &nora, RespondentType::Peer);
    h.notifier.fail_for("oskar");

    let report = reminders(&h, true).run().await.unwrap();
    assert_eq!(report.candidates, 2);
    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(h.notifier.sent_to("nora").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reminders_are_spaced_by_the_send_delay() {
    let h = Harness::new();
    let mila = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &mila);
    for name in ["Oskar", "Nora", "Ivo"] {
        let evaluator = h.employee(name, None);
        h.respondent(&participant, &evaluator, RespondentType::Peer);
    }

    let started = Instant::now();
    let report = paced_reminders(h.dyn_store(), &h, Duration::from_millis(500))
        .run()
        .await
        .unwrap();
    assert_eq!(report.sent, 3);
    // One pause between each pair of sends, none before the first
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1_000), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1_500), "{:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn on_demand_run_is_refused_while_the_job_is_sweeping() {
    let h = Harness::new();
    let mila = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &mila);
    for name in ["Oskar", "Nora"] {
        let evaluator = h.employee(name, None);
        h.respondent(&participant, &evaluator, RespondentType::Peer);
    }
    let scheduler = Arc::new(ReconciliationScheduler::new(
        paced_reminders(h.dyn_store(), &h, Duration::from_secs(10)),
        CompletionSweep::new(h.dyn_store(), h.evaluator.clone()),
        &SchedulerConfig::default(),
    ));

    let first = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run_once(JobKind::Reminders).await })
    };
    // Let the first sweep reach its inter-send pause
    tokio::time::sleep(Duration::from_millis(1)).await;

    let err = scheduler.run_once(JobKind::Reminders).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }));
    // The other job is independent
    assert!(scheduler.run_once(JobKind::CompletionCatchUp).await.is_ok());

    match first.await.unwrap().unwrap() {
        SweepReport::Reminders(report) => assert_eq!(report.sent, 2),
        other => panic!("unexpected report {:?}", other),
    }
    assert_eq!(h.notifier.titled("Survey reminder").len(), 2);

    // Free again once the first run is done
    assert!(scheduler.run_once(JobKind::Reminders).await.is_ok());
}

#[tokio::test]
async fn a_panicking_on_demand_sweep_is_contained_and_counted() {
    let h = Harness::new();
    let hooked = Arc::new(HookedStore::new(h.store.clone()));
    hooked.panic_on_outstanding(true);
    let scheduler = ReconciliationScheduler::new(
        paced_reminders(hooked.clone(), &h, Duration::ZERO),
        CompletionSweep::new(h.dyn_store(), h.evaluator.clone()),
        &SchedulerConfig::default(),
    );

    let err = scheduler.run_once(JobKind::Reminders).await.unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
    let status = scheduler
        .status()
        .into_iter()
        .find(|s| s.job == JobKind::Reminders)
        .unwrap();
    assert_eq!((status.runs, status.failures), (1, 1));

    hooked.panic_on_outstanding(false);
    assert!(scheduler.run_once(JobKind::Reminders).await.is_ok());
}

#[tokio::test]
async fn jobs_start_and_stop_individually() {
    let h = Harness::new();
    let scheduler = scheduler(&h, &SchedulerConfig::default());

    assert!(scheduler.start_job(JobKind::Reminders));
    assert!(!scheduler.start_job(JobKind::Reminders));
    assert!(scheduler.is_running(JobKind::Reminders));
    assert!(!scheduler.is_running(JobKind::CompletionCatchUp));

    scheduler.start();
    assert!(scheduler.is_running(JobKind::CompletionCatchUp));

    assert!(scheduler.stop_job(JobKind::Reminders).await);
    assert!(!scheduler.is_running(JobKind::Reminders));
    assert!(scheduler.is_running(JobKind::CompletionCatchUp));
    assert!(!scheduler.stop_job(JobKind::Reminders).await);

    scheduler.stop().await;
    assert!(scheduler.status().iter().all(|s| !s.running));
}

#[tokio::test]
async fn run_once_executes_and_counts() {
    let h = Harness::new();
    let mila = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &mila);
    let respondent = h.respondent(&participant, &mila, RespondentType::SelfReview);
    h.store
        .force_respondent_status(respondent.id, RespondentStatus::Completed);
    let scheduler = scheduler(&h, &SchedulerConfig::default());

    let report = scheduler.run_once(JobKind::CompletionCatchUp).await.unwrap();
    match report {
        SweepReport::CompletionCatchUp(report) => assert_eq!(report.notified, 1),
        other => panic!("unexpected report {:?}", other),
    }

    let status = scheduler.status();
    let completion = status
        .iter()
        .find(|s| s.job == JobKind::CompletionCatchUp)
        .unwrap();
    assert_eq!(completion.runs, 1);
    assert_eq!(completion.failures, 0);
    assert!(completion.last_run_at.is_some());
    assert_eq!(completion.interval_secs, 3_600);
}

#[tokio::test(start_paused = true)]
async fn scheduled_sweeps_run_after_each_period() {
    let h = Harness::new();
    let mila = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &mila);
    let respondent = h.respondent(&participant, &mila, RespondentType::SelfReview);
    h.store
        .force_respondent_status(respondent.id, RespondentStatus::Completed);

    let config = SchedulerConfig {
        completion_sweep_interval: Duration::from_secs(60),
        ..SchedulerConfig::default()
    };
    let scheduler = scheduler(&h, &config);
    scheduler.start_job(JobKind::CompletionCatchUp);

    // Nothing runs at startup
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(h.notifier.sent().is_empty());

    tokio::time::sleep(Duration::from_secs(45)).await;
    assert_eq!(h.notifier.sent_to("mila").len(), 1);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.notifier.sent_to("mila").len(), 1);
    let runs = scheduler
        .status()
        .into_iter()
        .find(|s| s.job == JobKind::CompletionCatchUp)
        .unwrap()
        .runs;
    assert!(runs >= 2);

    scheduler.stop().await;
}
