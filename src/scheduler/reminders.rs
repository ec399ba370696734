use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    db::enums::RespondentStatus,
    db::models::User,
    error::AppResult,
    notifications::{DeliveryTally, NotificationTemplates, Notifier},
    store::AssessmentStore,
};

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub candidates: usize,
    pub sent: usize,
    pub failed: usize,
    /// Outstanding evaluators without a chat binding (or deactivated).
    pub skipped: usize,
}

/// Reminds every evaluator who still owes answers in a running cycle.
/// There is no de-duplication: each run reminds everyone still outstanding.
pub struct ReminderSweep {
    store: Arc<dyn AssessmentStore>,
    notifier: Arc<dyn Notifier>,
    templates: NotificationTemplates,
    send_delay: Duration,
    include_in_progress: bool,
}

impl ReminderSweep {
    pub fn new(
        store: Arc<dyn AssessmentStore>,
        notifier: Arc<dyn Notifier>,
        templates: NotificationTemplates,
        send_delay: Duration,
        include_in_progress: bool,
    ) -> Self {
        Self {
            store,
            notifier,
            templates,
            send_delay,
            include_in_progress,
        }
    }

    fn statuses(&self) -> Vec<RespondentStatus> {
        let mut statuses = vec![RespondentStatus::Pending, RespondentStatus::Active];
        if self.include_in_progress {
            statuses.push(RespondentStatus::InProgress);
        }
        statuses
    }

    pub async fn run(&self) -> AppResult<ReminderReport> {
        let today = Utc::now().date_naive();
        let assignments = self
            .store
            .outstanding_assignments(today, &self.statuses())?;

        let user_ids: Vec<Uuid> = assignments
            .iter()
            .flat_map(|a| [a.respondent.respondent_user_id, a.participant.user_id])
            .collect();
        let users: HashMap<Uuid, User> = self
            .store
            .find_users(&user_ids)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut tally = DeliveryTally::default();
        let mut skipped = 0;
        for assignment in &assignments {
            let recipient = users
                .get(&assignment.respondent.respondent_user_id)
                .filter(|u| u.is_active)
                .and_then(User::chat_username);
            let Some(recipient) = recipient else {
                skipped += 1;
                continue;
            };

            if tally.sent + tally.failed > 0 && !self.send_delay.is_zero() {
                tokio::time::sleep(self.send_delay).await;
            }

            let participant_name = users
                .get(&assignment.participant.user_id)
                .map(User::full_name)
                .unwrap_or_default();
            let notification = self.templates.reminder(
                recipient,
                assignment.respondent.id,
                &participant_name,
                &assignment.cycle.name,
            );
            tally.deliver(self.notifier.as_ref(), &notification).await;
        }

        let report = ReminderReport {
            candidates: assignments.len(),
            sent: tally.sent,
            failed: tally.failed,
            skipped,
        };
        info!(
            candidates = report.candidates,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Reminder sweep finished"
        );
        Ok(report)
    }
}
