use crate::common::{Harness, ctx};
use feedback_backend::{
    db::enums::{CycleStatus, RespondentType},
    error::AppError,
    services::ProgressService,
};

#[test]
fn deactivated_answers_do_not_count() {
    let h = Harness::new();
    let questions = h.catalog(6);
    let subject = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &subject, RespondentType::SelfReview);

    // Four answers, then one of the answered questions is retired
    h.answer_all(&subject, &respondent, &questions[..4]);
    h.store.set_question_active(questions[3].id, false);

    let progress = ProgressService::get_progress(h.store.as_ref(), &ctx(&subject), respondent.id).unwrap();
    assert_eq!(progress.answered, 3);
    assert_eq!(progress.total, 5);
    assert_eq!(progress.percentage, 60);
    assert!(!progress.is_complete());

    let per_category_total: i64 = progress.per_category.iter().map(|c| c.total).sum();
    assert_eq!(per_category_total, 5);
    assert_eq!(progress.per_category[0].category_name, "Leadership");
}

#[test]
fn untouched_assessment_is_zero_percent() {
    let h = Harness::new();
    h.catalog(3);
    let subject = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &subject, RespondentType::SelfReview);

    let progress = ProgressService::get_progress(h.store.as_ref(), &ctx(&subject), respondent.id).unwrap();
    assert_eq!((progress.answered, progress.total, progress.percentage), (0, 3, 0));
}

#[test]
fn progress_is_private_to_the_evaluator() {
    let h = Harness::new();
    h.catalog(3);
    let subject = h.employee("Mila", None);
    let peer = h.employee("Oskar", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &peer, RespondentType::Peer);

    let err = ProgressService::get_progress(h.store.as_ref(), &ctx(&subject), respondent.id).unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}
