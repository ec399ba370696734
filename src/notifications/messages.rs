//! Message templates for every notification the service sends.

use url::Url;
use uuid::Uuid;

use crate::notifications::Notification;

#[derive(Debug, Clone)]
pub struct NotificationTemplates {
    frontend_url: Url,
}

impl NotificationTemplates {
    pub fn new(frontend_url: &str) -> Result<Self, url::ParseError> {
        let mut frontend_url = Url::parse(frontend_url)?;
        // Url::join drops the last path segment unless the base ends in '/'
        if !frontend_url.path().ends_with('/') {
            let path = format!("{}/", frontend_url.path());
            frontend_url.set_path(&path);
        }
        Ok(Self { frontend_url })
    }

    fn link(&self, path: &str) -> String {
        self.frontend_url
            .join(path)
            .map(String::from)
            .unwrap_or_else(|_| format!("{}{}", self.frontend_url, path))
    }

    fn build(&self, recipient: &str, title: &str, message: String, path: &str, action: &str) -> Notification {
        Notification {
            recipient: recipient.to_string(),
            title: title.to_string(),
            message,
            action_url: Some(self.link(path)),
            action_text: Some(action.to_string()),
        }
    }

    pub fn cycle_started(&self, recipient: &str, cycle_name: &str) -> Notification {
        self.build(
            recipient,
            "New assessment cycle started",
            format!(
                "The assessment cycle \"{}\" has started. You can review the surveys assigned to you and begin evaluating.",
                cycle_name
            ),
            "assessments",
            "Open assessments",
        )
    }

    pub fn evaluation_requested(
        &self,
        recipient: &str,
        respondent_id: Uuid,
        participant_name: &str,
        cycle_name: &str,
    ) -> Notification {
        self.build(
            recipient,
            "Your evaluation is requested",
            format!(
                "You have been asked to evaluate {} in the cycle \"{}\". Please complete the survey.",
                participant_name, cycle_name
            ),
            &format!("survey/{}", respondent_id),
            "Start survey",
        )
    }

    pub fn reminder(
        &self,
        recipient: &str,
        respondent_id: Uuid,
        participant_name: &str,
        cycle_name: &str,
    ) -> Notification {
        self.build(
            recipient,
            "Survey reminder",
            format!(
                "Don't forget to finish your evaluation of {} in the cycle \"{}\".",
                participant_name, cycle_name
            ),
            &format!("survey/{}", respondent_id),
            "Continue survey",
        )
    }

    pub fn assessment_complete(&self, recipient: &str, participant_id: Uuid, cycle_name: &str) -> Notification {
        self.build(
            recipient,
            "Your assessment is complete",
            format!(
                "All respondents have finished your evaluation in the cycle \"{}\". Your report is ready.",
                cycle_name
            ),
            &format!("reports/participant/{}", participant_id),
            "View report",
        )
    }

    pub fn manager_report_ready(
        &self,
        recipient: &str,
        participant_id: Uuid,
        participant_name: &str,
        cycle_name: &str,
    ) -> Notification {
        self.build(
            recipient,
            "Team member assessment complete",
            format!(
                "The evaluation of {} in the cycle \"{}\" is complete. The report is ready for review.",
                participant_name, cycle_name
            ),
            &format!("reports/participant/{}", participant_id),
            "View report",
        )
    }

    pub fn cycle_completed(&self, recipient: &str, cycle_id: Uuid, cycle_name: &str) -> Notification {
        self.build(
            recipient,
            "Assessment cycle completed",
            format!("The assessment cycle \"{}\" has been completed.", cycle_name),
            &format!("reports/cycle/{}", cycle_id),
            "View cycle report",
        )
    }
}
