use crate::common::{Harness, HookedStore, ctx};
use feedback_backend::{
    db::enums::{CycleStatus, ParticipantStatus, RespondentStatus, RespondentType, UserRole},
    scheduler::CompletionSweep,
    services::{CascadeDispatcher, CascadeEvaluator, CascadeOutcome, RespondentsService},
    store::AssessmentStore,
};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_evaluations_notify_exactly_once() {
    let h = Harness::new();
    let subject = h.employee("Mila", None);
    let peer = h.employee("Oskar", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let r1 = h.respondent(&participant, &subject, RespondentType::SelfReview);
    let r2 = h.respondent(&participant, &peer, RespondentType::Peer);
    h.store.force_respondent_status(r1.id, RespondentStatus::Completed);
    h.store.force_respondent_status(r2.id, RespondentStatus::Completed);

    let mut handles = Vec::new();
    for i in 0..16 {
        let evaluator = h.evaluator.clone();
        let respondent_id = if i % 2 == 0 { r1.id } else { r2.id };
        handles.push(tokio::spawn(async move {
            evaluator.on_respondent_completed(respondent_id).await
        }));
    }

    let mut claimed = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        if outcome.claimed() {
            claimed += 1;
        } else {
            assert_eq!(outcome, CascadeOutcome::AlreadyNotified);
        }
    }

    assert_eq!(claimed, 1);
    assert_eq!(h.notifier.titled("Your assessment is complete").len(), 1);
    assert!(h.store.participant(participant.id).unwrap().completed_notification_sent);
}

#[tokio::test]
async fn manager_hears_about_the_finished_report() {
    let h = Harness::new();
    let manager = h.store.seed_user("Greta", "Boss", UserRole::Manager, None, Some("greta"));
    let subject = h.employee("Mila", Some(&manager));
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &manager, RespondentType::Manager);
    h.store
        .force_respondent_status(respondent.id, RespondentStatus::Completed);

    let outcome = h.evaluator.evaluate_participant(participant.id).await.unwrap();
    assert_eq!(
        outcome,
        CascadeOutcome::Notified {
            subject_notified: true,
            manager_notified: true
        }
    );
    let to_manager = h.notifier.sent_to("greta");
    assert_eq!(to_manager.len(), 1);
    assert_eq!(to_manager[0].title, "Team member assessment complete");
    assert!(to_manager[0].message.contains("Mila Tester"));
}

#[tokio::test]
async fn inactive_or_unbound_managers_are_skipped() {
    let h = Harness::new();
    let manager = h.store.seed_user("Greta", "Boss", UserRole::Manager, None, Some("greta"));
    h.store.set_user_active(manager.id, false);
    let subject = h.store.seed_user("Mila", "Tester", UserRole::User, Some(manager.id), None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &subject, RespondentType::SelfReview);
    h.store
        .force_respondent_status(respondent.id, RespondentStatus::Completed);

    let outcome = h.evaluator.evaluate_participant(participant.id).await.unwrap();
    assert_eq!(
        outcome,
        CascadeOutcome::Notified {
            subject_notified: false,
            manager_notified: false
        }
    );
    assert!(h.notifier.sent().is_empty());
    // The claim stands even though nobody could be told
    assert!(h.store.participant(participant.id).unwrap().completed_notification_sent);
}

#[tokio::test]
async fn delivery_failure_keeps_the_state_transition() {
    let h = Harness::new();
    let subject = h.employee("Mila", None);
    h.notifier.fail_for("mila");
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &subject, RespondentType::SelfReview);
    h.store
        .force_respondent_status(respondent.id, RespondentStatus::Completed);

    let outcome = h.evaluator.evaluate_participant(participant.id).await.unwrap();
    assert!(outcome.claimed());
    let stored = h.store.participant(participant.id).unwrap();
    assert_eq!(stored.status, ParticipantStatus::Completed);
    assert!(stored.completed_notification_sent);

    let again = h.evaluator.evaluate_participant(participant.id).await.unwrap();
    assert_eq!(again, CascadeOutcome::AlreadyNotified);
}

#[tokio::test]
async fn participants_without_respondents_never_complete() {
    let h = Harness::new();
    let subject = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);

    let outcome = h.evaluator.evaluate_participant(participant.id).await.unwrap();
    assert_eq!(
        outcome,
        CascadeOutcome::Incomplete {
            completed: 0,
            total: 0
        }
    );
    assert!(!h.store.participant(participant.id).unwrap().completed_notification_sent);
}

#[tokio::test]
async fn respondent_added_before_the_claim_keeps_the_participant_open() {
    let h = Harness::new();
    let subject = h.employee("Mila", None);
    let late_peer = h.employee("Oskar", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let own = h.respondent(&participant, &subject, RespondentType::SelfReview);
    h.store.force_respondent_status(own.id, RespondentStatus::Completed);

    let hooked = Arc::new(HookedStore::new(h.store.clone()));
    let (participant_id, peer_id) = (participant.id, late_peer.id);
    hooked.before_claim(move |store| {
        store.seed_respondent(
            participant_id,
            peer_id,
            RespondentType::Peer,
            RespondentStatus::Active,
        );
    });
    let evaluator = CascadeEvaluator::new(
        hooked.clone() as Arc<dyn AssessmentStore>,
        h.dyn_notifier(),
        h.templates.clone(),
    );

    let outcome = evaluator.evaluate_participant(participant.id).await.unwrap();
    assert_eq!(
        outcome,
        CascadeOutcome::Incomplete {
            completed: 1,
            total: 2
        }
    );
    let stored = h.store.participant(participant.id).unwrap();
    assert_eq!(stored.status, ParticipantStatus::Active);
    assert!(!stored.completed_notification_sent);
    assert!(h.notifier.sent().is_empty());

    // Once the late evaluator finishes, the participant completes normally
    let late = h
        .store
        .respondents_for_participants(&[participant.id])
        .unwrap()
        .into_iter()
        .find(|r| r.respondent_user_id == late_peer.id)
        .unwrap();
    h.store.force_respondent_status(late.id, RespondentStatus::Completed);
    assert!(evaluator.evaluate_participant(participant.id).await.unwrap().claimed());
    assert_eq!(h.notifier.sent_to("mila").len(), 1);
}

#[tokio::test]
async fn catch_up_sweep_closes_gaps_once() {
    let h = Harness::new();
    let subject = h.employee("Mila", None);
    let other = h.employee("Nora", None);
    let cycle = h.cycle(CycleStatus::Active);
    let gap = h.participant(&cycle, &subject);
    let pending = h.participant(&cycle, &other);
    let done = h.respondent(&gap, &subject, RespondentType::SelfReview);
    h.respondent(&pending, &other, RespondentType::SelfReview);

    // Completed without the cascade ever running
    h.store.force_respondent_status(done.id, RespondentStatus::Completed);

    let sweep = CompletionSweep::new(h.dyn_store(), h.evaluator.clone());
    let report = sweep.run().await.unwrap();
    assert_eq!(report.candidates, 1);
    assert_eq!(report.notified, 1);
    assert!(h.store.participant(gap.id).unwrap().completed_notification_sent);
    assert!(!h.store.participant(pending.id).unwrap().completed_notification_sent);
    assert_eq!(h.notifier.sent_to("mila").len(), 1);

    let second = sweep.run().await.unwrap();
    assert_eq!(second.candidates, 0);
    assert_eq!(h.notifier.sent_to("mila").len(), 1);
}

#[tokio::test]
async fn catch_up_sweep_ignores_cycles_that_are_not_running() {
    let h = Harness::new();
    let subject = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &subject, RespondentType::SelfReview);
    h.store
        .force_respondent_status(respondent.id, RespondentStatus::Completed);
    h.store.force_cycle_status(cycle.id, CycleStatus::Cancelled);

    let report = CompletionSweep::new(h.dyn_store(), h.evaluator.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(report.candidates, 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn inline_completion_and_sweep_do_not_double_notify() {
    let h = Harness::new();
    let questions = h.catalog(1);
    let subject = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &subject, RespondentType::SelfReview);
    let dispatcher = CascadeDispatcher::inline(h.evaluator.clone());

    h.answer_all(&subject, &respondent, &questions);
    RespondentsService::complete(h.store.as_ref(), &dispatcher, &ctx(&subject), respondent.id)
        .await
        .unwrap();
    let report = CompletionSweep::new(h.dyn_store(), Arc::clone(&h.evaluator))
        .run()
        .await
        .unwrap();

    assert_eq!(report.notified, 0);
    assert_eq!(h.notifier.sent().len(), 1);
}
