//! Completion cascade: respondent completed -> participant fully evaluated ->
//! "report ready" notification, sent exactly once per participant.
//!
//! The exactly-once guarantee comes from the conditional claim on
//! `completed_notification_sent`, which also re-checks that every respondent
//! is completed. The evaluator itself holds no locks and can be invoked any
//! number of times, concurrently, from requests and sweeps.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    db::models::{Participant, User},
    error::AppResult,
    notifications::{Notification, NotificationTemplates, Notifier},
    store::AssessmentStore,
};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CascadeOutcome {
    ParticipantMissing,
    Incomplete { completed: i64, total: i64 },
    AlreadyNotified,
    Notified { subject_notified: bool, manager_notified: bool },
}

impl CascadeOutcome {
    pub fn claimed(&self) -> bool {
        matches!(self, CascadeOutcome::Notified { .. })
    }
}

pub struct CascadeEvaluator {
    store: Arc<dyn AssessmentStore>,
    notifier: Arc<dyn Notifier>,
    templates: NotificationTemplates,
}

impl CascadeEvaluator {
    pub fn new(
        store: Arc<dyn AssessmentStore>,
        notifier: Arc<dyn Notifier>,
        templates: NotificationTemplates,
    ) -> Self {
        Self {
            store,
            notifier,
            templates,
        }
    }

    pub async fn on_respondent_completed(&self, respondent_id: Uuid) -> AppResult<CascadeOutcome> {
        match self.store.find_assignment(respondent_id)? {
            Some(assignment) => self.evaluate_participant(assignment.participant.id).await,
            None => Ok(CascadeOutcome::ParticipantMissing),
        }
    }

    pub async fn evaluate_participant(&self, participant_id: Uuid) -> AppResult<CascadeOutcome> {
        let Some(participant) = self.store.find_participant(participant_id)? else {
            return Ok(CascadeOutcome::ParticipantMissing);
        };
        if participant.completed_notification_sent {
            return Ok(CascadeOutcome::AlreadyNotified);
        }

        let counts = self.store.respondent_counts(participant_id)?;
        if !counts.all_completed() {
            debug!(
                participant_id = %participant_id,
                completed = counts.completed,
                total = counts.total,
                "Participant still has outstanding respondents"
            );
            return Ok(CascadeOutcome::Incomplete {
                completed: counts.completed,
                total: counts.total,
            });
        }

        // All reads happen before the claim; nothing after it may fail.
        let cycle_name = self
            .store
            .find_cycle(participant.cycle_id)?
            .map(|c| c.name)
            .unwrap_or_default();
        let subject = self.store.find_user(participant.user_id)?;
        let manager = match subject.as_ref().and_then(|s| s.manager_id) {
            Some(manager_id) => self.store.find_user(manager_id)?,
            None => None,
        };

        if !self
            .store
            .claim_completion_notification(participant_id, Utc::now())?
        {
            return self.explain_lost_claim(participant_id);
        }
        info!(
            participant_id = %participant_id,
            cycle_id = %participant.cycle_id,
            "Participant evaluation complete"
        );

        let subject_notified = match subject.as_ref().and_then(User::chat_username) {
            Some(recipient) => {
                let notification =
                    self.templates
                        .assessment_complete(recipient, participant_id, &cycle_name);
                self.deliver(&notification).await
            }
            None => false,
        };

        let manager_notified = match (&subject, &manager) {
            (Some(subject), Some(manager)) if manager.is_active => match manager.chat_username() {
                Some(recipient) => {
                    let notification = self.templates.manager_report_ready(
                        recipient,
                        participant_id,
                        &subject.full_name(),
                        &cycle_name,
                    );
                    self.deliver(&notification).await
                }
                None => false,
            },
            _ => false,
        };

        self.log_cycle_completion(&participant);

        Ok(CascadeOutcome::Notified {
            subject_notified,
            manager_notified,
        })
    }

    /// The claim refuses both an already-notified participant and one that
    /// gained an outstanding respondent since the counts were read.
    fn explain_lost_claim(&self, participant_id: Uuid) -> AppResult<CascadeOutcome> {
        let notified = self
            .store
            .find_participant(participant_id)?
            .is_some_and(|p| p.completed_notification_sent);
        if notified {
            return Ok(CascadeOutcome::AlreadyNotified);
        }
        let counts = self.store.respondent_counts(participant_id)?;
        debug!(
            participant_id = %participant_id,
            completed = counts.completed,
            total = counts.total,
            "Completion claim refused; respondents changed underneath"
        );
        Ok(CascadeOutcome::Incomplete {
            completed: counts.completed,
            total: counts.total,
        })
    }

    async fn deliver(&self, notification: &Notification) -> bool {
        match self.notifier.send_notification(notification).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    recipient = %notification.recipient,
                    error = %e,
                    "Failed to deliver completion notification"
                );
                false
            }
        }
    }

    fn log_cycle_completion(&self, participant: &Participant) {
        match self.store.participants_in_cycle(participant.cycle_id) {
            Ok(participants) => {
                if participants.iter().all(|p| p.completed_notification_sent) {
                    info!(
                        cycle_id = %participant.cycle_id,
                        participants = participants.len(),
                        "All participants in cycle are fully evaluated"
                    );
                }
            }
            Err(e) => debug!(error = %e, "Skipping cycle aggregate check"),
        }
    }
}

/// Work item handed to the queued cascade worker.
#[derive(Debug, Clone, Copy)]
pub struct CascadeTask {
    pub respondent_id: Uuid,
}

/// Decides where the cascade runs once a respondent's completion was written.
#[derive(Clone)]
pub enum CascadeDispatcher {
    Inline(Arc<CascadeEvaluator>),
    Queued(mpsc::UnboundedSender<CascadeTask>),
}

impl CascadeDispatcher {
    pub fn inline(evaluator: Arc<CascadeEvaluator>) -> Self {
        CascadeDispatcher::Inline(evaluator)
    }

    /// Spawns the worker; it exits once every dispatcher clone is dropped.
    pub fn queued(evaluator: Arc<CascadeEvaluator>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(evaluator, rx));
        (CascadeDispatcher::Queued(tx), handle)
    }

    /// Never fails the caller. Returns the outcome when the cascade ran inline.
    pub async fn dispatch(&self, respondent_id: Uuid) -> Option<CascadeOutcome> {
        match self {
            CascadeDispatcher::Inline(evaluator) => {
                match evaluator.on_respondent_completed(respondent_id).await {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        warn!(
                            respondent_id = %respondent_id,
                            error = %e,
                            "Completion cascade failed; catch-up sweep will retry"
                        );
                        None
                    }
                }
            }
            CascadeDispatcher::Queued(tx) => {
                if tx.send(CascadeTask { respondent_id }).is_err() {
                    warn!(
                        respondent_id = %respondent_id,
                        "Cascade queue closed; catch-up sweep will retry"
                    );
                }
                None
            }
        }
    }
}

async fn run_worker(evaluator: Arc<CascadeEvaluator>, mut rx: mpsc::UnboundedReceiver<CascadeTask>) {
    while let Some(task) = rx.recv().await {
        match evaluator.on_respondent_completed(task.respondent_id).await {
            Ok(outcome) => debug!(respondent_id = %task.respondent_id, ?outcome, "Cascade evaluated"),
            Err(e) => warn!(
                respondent_id = %task.respondent_id,
                error = %e,
                "Queued cascade failed; catch-up sweep will retry"
            ),
        }
    }
    info!("Cascade worker stopped");
}
