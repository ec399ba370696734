use crate::common::{Harness, ctx};
use feedback_backend::{
    db::enums::{CycleStatus, RespondentStatus, RespondentType},
    error::AppError,
    services::{ResponsesService, responses_service::RecordResponse},
    store::AssessmentStore,
};

fn rating(question_id: uuid::Uuid, score: i32, comment: Option<&str>) -> RecordResponse {
    RecordResponse {
        question_id,
        score,
        comment: comment.map(str::to_string),
    }
}

#[test]
fn recording_the_same_question_twice_overwrites() {
    let h = Harness::new();
    let questions = h.catalog(3);
    let subject = h.employee("Mila", None);
    let peer = h.employee("Oskar", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &peer, RespondentType::Peer);

    let first = ResponsesService::record(
        h.store.as_ref(),
        &ctx(&peer),
        respondent.id,
        &rating(questions[0].id, 2, Some("needs work")),
    )
    .unwrap();
    let second = ResponsesService::record(
        h.store.as_ref(),
        &ctx(&peer),
        respondent.id,
        &rating(questions[0].id, 5, None),
    )
    .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(h.store.response_count(), 1);
    let stored = h.store.responses_for(respondent.id).unwrap();
    assert_eq!(stored[0].score, 5);
    assert_eq!(stored[0].comment, None);
    // Recording never completes the respondent
    assert_eq!(
        h.store.respondent(respondent.id).unwrap().status,
        RespondentStatus::Active
    );
}

#[test]
fn out_of_range_scores_are_rejected() {
    let h = Harness::new();
    let questions = h.catalog(1);
    let subject = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &subject, RespondentType::SelfReview);

    for score in [0, 6, -1] {
        let err = ResponsesService::record(
            h.store.as_ref(),
            &ctx(&subject),
            respondent.id,
            &rating(questions[0].id, score, None),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }), "score {}", score);
    }
    assert_eq!(h.store.response_count(), 0);
}

#[test]
fn blank_comments_are_stored_as_none() {
    let h = Harness::new();
    let questions = h.catalog(1);
    let subject = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &subject, RespondentType::SelfReview);

    let saved = ResponsesService::record(
        h.store.as_ref(),
        &ctx(&subject),
        respondent.id,
        &rating(questions[0].id, 3, Some("   ")),
    )
    .unwrap();
    assert_eq!(saved.comment, None);
}

#[test]
fn other_evaluators_cannot_see_the_assessment() {
    let h = Harness::new();
    let questions = h.catalog(1);
    let subject = h.employee("Mila", None);
    let peer = h.employee("Oskar", None);
    let intruder = h.employee("Eve", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &peer, RespondentType::Peer);

    let err = ResponsesService::record(
        h.store.as_ref(),
        &ctx(&intruder),
        respondent.id,
        &rating(questions[0].id, 3, None),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[test]
fn inactive_questions_cannot_be_answered() {
    let h = Harness::new();
    let questions = h.catalog(2);
    h.store.set_question_active(questions[1].id, false);
    let subject = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &subject, RespondentType::SelfReview);

    let err = ResponsesService::record(
        h.store.as_ref(),
        &ctx(&subject),
        respondent.id,
        &rating(questions[1].id, 3, None),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[test]
fn answers_are_accepted_whatever_the_cycle_status() {
    let h = Harness::new();
    let questions = h.catalog(1);
    let subject = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &subject, RespondentType::SelfReview);

    h.store.force_cycle_status(cycle.id, CycleStatus::Completed);
    ResponsesService::record(
        h.store.as_ref(),
        &ctx(&subject),
        respondent.id,
        &rating(questions[0].id, 3, None),
    )
    .unwrap();

    h.store
        .force_respondent_status(respondent.id, RespondentStatus::Completed);
    let revised = ResponsesService::record(
        h.store.as_ref(),
        &ctx(&subject),
        respondent.id,
        &rating(questions[0].id, 5, Some("revised")),
    )
    .unwrap();
    assert_eq!(revised.score, 5);
    assert_eq!(h.store.response_count(), 1);
    // Status is left alone
    assert_eq!(
        h.store.respondent(respondent.id).unwrap().status,
        RespondentStatus::Completed
    );
}
