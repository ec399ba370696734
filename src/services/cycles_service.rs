use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    db::enums::{CycleStatus, ParticipantStatus, RespondentStatus, RespondentType},
    db::models::{
        Cycle, CycleChanges, CycleProgress, CycleSummary, NewCycle, NewParticipant,
        NewRespondent, Participant, PendingRespondentSelection, Respondent, User, error_codes,
    },
    error::AppError,
    notifications::{DeliveryTally, NotificationTemplates, Notifier},
    services::context::RequestContext,
    store::AssessmentStore,
    validation::cycle::validate_create_cycle,
};

#[derive(Clone, Debug)]
pub struct CreateCycle {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Evaluators a subject is expected to pick before their cycle can be useful.
pub const MIN_RESPONDENTS: i64 = 4;

#[derive(Serialize, Clone, Debug)]
pub struct ParticipantDetails {
    #[serde(flatten)]
    pub participant: Participant,
    pub user_name: String,
    pub respondents: Vec<Respondent>,
}

#[derive(Serialize, Clone, Debug)]
pub struct CycleDetails {
    #[serde(flatten)]
    pub cycle: Cycle,
    pub participants: Vec<ParticipantDetails>,
}

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActivationReport {
    pub participants: usize,
    pub respondents: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddedRows {
    pub added: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

pub struct CyclesService;

impl CyclesService {
    fn load_cycle(store: &dyn AssessmentStore, cycle_id: Uuid) -> Result<Cycle, AppError> {
        store
            .find_cycle(cycle_id)?
            .ok_or_else(|| AppError::not_found("cycle"))
    }

    fn active_users(store: &dyn AssessmentStore, ids: &[Uuid]) -> Result<HashMap<Uuid, User>, AppError> {
        let users: HashMap<Uuid, User> = store
            .find_users(ids)?
            .into_iter()
            .filter(|u| u.is_active)
            .map(|u| (u.id, u))
            .collect();
        if let Some(missing) = ids.iter().find(|id| !users.contains_key(id)) {
            return Err(AppError::validation(format!(
                "User {} does not exist or is inactive",
                missing
            )));
        }
        Ok(users)
    }

    pub fn create(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
        req: &CreateCycle,
    ) -> Result<Cycle, AppError> {
        ctx.require_cycle_admin()?;
        validate_create_cycle(&req.name, req.start_date, req.end_date)?;

        let cycle = store.insert_cycle(&NewCycle {
            name: req.name.trim().to_string(),
            description: req.description.clone(),
            created_by: Some(ctx.user_id),
            start_date: req.start_date,
            end_date: req.end_date,
            status: CycleStatus::Draft,
        })?;
        info!(cycle_id = %cycle.id, created_by = %ctx.user_id, "Assessment cycle created");
        Ok(cycle)
    }

    pub fn list(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
    ) -> Result<Vec<CycleSummary>, AppError> {
        ctx.require_cycle_admin()?;
        store.list_cycles()
    }

    /// Edits a draft cycle. Running and finished cycles are frozen.
    pub fn update(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
        cycle_id: Uuid,
        req: &CreateCycle,
    ) -> Result<Cycle, AppError> {
        ctx.require_cycle_admin()?;
        let cycle = Self::load_cycle(store, cycle_id)?;
        require_draft(&cycle, "edited")?;
        validate_create_cycle(&req.name, req.start_date, req.end_date)?;

        let changes = CycleChanges {
            name: req.name.trim().to_string(),
            description: req.description.clone(),
            start_date: req.start_date,
            end_date: req.end_date,
        };
        let updated = store
            .update_draft_cycle(cycle_id, &changes)?
            .ok_or_else(|| AppError::precondition("Only draft cycles can be edited"))?;
        info!(cycle_id = %cycle_id, "Assessment cycle updated");
        Ok(updated)
    }

    /// Drops a participant, with its respondents and any answers, from a draft cycle.
    pub fn remove_participant(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
        cycle_id: Uuid,
        participant_id: Uuid,
    ) -> Result<(), AppError> {
        ctx.require_cycle_admin()?;
        let cycle = Self::load_cycle(store, cycle_id)?;
        require_draft(&cycle, "changed")?;
        store
            .find_participant(participant_id)?
            .filter(|p| p.cycle_id == cycle_id)
            .ok_or_else(|| AppError::not_found("participant"))?;

        if !store.remove_participant_from_draft(cycle_id, participant_id)? {
            return Err(AppError::precondition("Only draft cycles can be changed"));
        }
        info!(cycle_id = %cycle_id, participant_id = %participant_id, "Participant removed from cycle");
        Ok(())
    }

    /// The caller's running participations with fewer than [`MIN_RESPONDENTS`]
    /// evaluators chosen.
    pub fn pending_respondent_selection(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
    ) -> Result<Vec<PendingRespondentSelection>, AppError> {
        let participations: Vec<(Participant, Cycle)> = store
            .participations_in_active_cycles(ctx.user_id)?
            .into_iter()
            .filter(|(p, _)| p.status != ParticipantStatus::Completed)
            .collect();
        let participant_ids: Vec<Uuid> = participations.iter().map(|(p, _)| p.id).collect();

        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for respondent in store.respondents_for_participants(&participant_ids)? {
            *counts.entry(respondent.participant_id).or_default() += 1;
        }

        Ok(participations
            .into_iter()
            .filter_map(|(participant, cycle)| {
                let respondents_count = counts.get(&participant.id).copied().unwrap_or(0);
                (respondents_count < MIN_RESPONDENTS).then(|| PendingRespondentSelection {
                    participant_id: participant.id,
                    cycle_id: cycle.id,
                    cycle_name: cycle.name,
                    cycle_description: cycle.description,
                    respondents_count,
                    min_required: MIN_RESPONDENTS,
                })
            })
            .collect())
    }

    pub fn get(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
        cycle_id: Uuid,
    ) -> Result<CycleDetails, AppError> {
        ctx.require_cycle_admin()?;
        let cycle = Self::load_cycle(store, cycle_id)?;
        let participants = store.participants_in_cycle(cycle_id)?;

        let participant_ids: Vec<Uuid> = participants.iter().map(|p| p.id).collect();
        let mut respondents_by_participant: HashMap<Uuid, Vec<Respondent>> = HashMap::new();
        for respondent in store.respondents_for_participants(&participant_ids)? {
            respondents_by_participant
                .entry(respondent.participant_id)
                .or_default()
                .push(respondent);
        }

        let user_ids: Vec<Uuid> = participants.iter().map(|p| p.user_id).collect();
        let names: HashMap<Uuid, String> = store
            .find_users(&user_ids)?
            .into_iter()
            .map(|u| (u.id, u.full_name()))
            .collect();

        let participants = participants
            .into_iter()
            .map(|participant| ParticipantDetails {
                user_name: names.get(&participant.user_id).cloned().unwrap_or_default(),
                respondents: respondents_by_participant
                    .remove(&participant.id)
                    .unwrap_or_default(),
                participant,
            })
            .collect();

        Ok(CycleDetails {
            cycle,
            participants,
        })
    }

    /// Adds subjects to a draft cycle. Users already in the cycle are skipped.
    pub fn add_participants(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
        cycle_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<AddedRows, AppError> {
        ctx.require_cycle_admin()?;
        let cycle = Self::load_cycle(store, cycle_id)?;
        if cycle.status != CycleStatus::Draft {
            return Err(AppError::precondition(
                "Participants can only be added to a draft cycle",
            ));
        }

        let unique: Vec<Uuid> = {
            let mut seen = HashSet::new();
            user_ids.iter().copied().filter(|id| seen.insert(*id)).collect()
        };
        Self::active_users(store, &unique)?;

        let rows: Vec<NewParticipant> = unique
            .iter()
            .map(|user_id| NewParticipant {
                cycle_id,
                user_id: *user_id,
                status: ParticipantStatus::Pending,
            })
            .collect();
        let added = store.add_participants(&rows)?;
        info!(cycle_id = %cycle_id, added, "Participants added to cycle");
        Ok(AddedRows {
            added,
            ..AddedRows::default()
        })
    }

    /// Assigns evaluators to a participant. The subject's manager is always
    /// included. Rows added while the cycle is running start as `active` and
    /// the new evaluators are asked to evaluate right away.
    pub async fn add_respondents(
        store: &dyn AssessmentStore,
        notifier: &dyn Notifier,
        templates: &NotificationTemplates,
        ctx: &RequestContext,
        cycle_id: Uuid,
        participant_id: Uuid,
        respondent_user_ids: &[Uuid],
    ) -> Result<AddedRows, AppError> {
        let cycle = Self::load_cycle(store, cycle_id)?;
        let participant = store
            .find_participant(participant_id)?
            .filter(|p| p.cycle_id == cycle_id)
            .ok_or_else(|| AppError::not_found("participant"))?;

        if participant.user_id != ctx.user_id && !ctx.role.can_manage_cycles() {
            return Err(AppError::forbidden(
                "Only the participant or an administrator can choose respondents",
            ));
        }
        let initial_status = match cycle.status {
            CycleStatus::Draft => RespondentStatus::Pending,
            CycleStatus::Active => RespondentStatus::Active,
            _ => {
                return Err(AppError::precondition(
                    "Respondents can only be added to a draft or active cycle",
                ));
            }
        };
        if participant.completed_notification_sent {
            return Err(AppError::precondition(
                "Participant evaluation is already complete",
            ));
        }

        let subject = store
            .find_user(participant.user_id)?
            .ok_or_else(|| AppError::not_found("user"))?;
        let manager_id = match subject.manager_id {
            Some(id) => store.find_user(id)?.filter(|m| m.is_active).map(|m| m.id),
            None => None,
        };

        let mut requested: Vec<Uuid> = Vec::new();
        for id in respondent_user_ids.iter().copied().chain(manager_id) {
            if !requested.contains(&id) {
                requested.push(id);
            }
        }
        let users = Self::active_users(store, &requested)?;

        let existing: HashSet<Uuid> = store
            .respondents_for_participants(&[participant_id])?
            .into_iter()
            .map(|r| r.respondent_user_id)
            .collect();
        let fresh: Vec<Uuid> = requested
            .into_iter()
            .filter(|id| !existing.contains(id))
            .collect();

        let rows: Vec<NewRespondent> = fresh
            .iter()
            .map(|user_id| NewRespondent {
                participant_id,
                respondent_user_id: *user_id,
                respondent_type: if *user_id == subject.id {
                    RespondentType::SelfReview
                } else if Some(*user_id) == manager_id {
                    RespondentType::Manager
                } else {
                    RespondentType::Peer
                },
                status: initial_status,
            })
            .collect();
        let added = store.add_respondents(&rows)?;
        info!(participant_id = %participant_id, added, "Respondents assigned");

        let mut tally = DeliveryTally::default();
        if initial_status == RespondentStatus::Active && added > 0 {
            let created = store.respondents_for_participants(&[participant_id])?;
            for respondent in created.iter().filter(|r| fresh.contains(&r.respondent_user_id)) {
                if let Some(recipient) = users
                    .get(&respondent.respondent_user_id)
                    .and_then(User::chat_username)
                {
                    let notification = templates.evaluation_requested(
                        recipient,
                        respondent.id,
                        &subject.full_name(),
                        &cycle.name,
                    );
                    tally.deliver(notifier, &notification).await;
                }
            }
        }

        Ok(AddedRows {
            added,
            notifications_sent: tally.sent,
            notifications_failed: tally.failed,
        })
    }

    /// Draft -> active, then the "cycle started" / "please evaluate" fan-out.
    /// Delivery failures are counted, never raised.
    pub async fn activate(
        store: &dyn AssessmentStore,
        notifier: &dyn Notifier,
        templates: &NotificationTemplates,
        ctx: &RequestContext,
        cycle_id: Uuid,
    ) -> Result<ActivationReport, AppError> {
        ctx.require_cycle_admin()?;
        let cycle = Self::load_cycle(store, cycle_id)?;
        match cycle.status {
            CycleStatus::Draft => {}
            CycleStatus::Active => return Err(already_active()),
            CycleStatus::Completed | CycleStatus::Cancelled => {
                return Err(AppError::precondition(format!(
                    "Cycle is {} and cannot be started",
                    cycle.status.as_str()
                )));
            }
        }

        let participants = store.participants_in_cycle(cycle_id)?;
        if participants.is_empty() {
            return Err(AppError::precondition_with_code(
                "Cannot start a cycle without participants",
                error_codes::CYCLE_NO_PARTICIPANTS,
            ));
        }

        let today = Utc::now().date_naive();
        let counts = store
            .activate_cycle(cycle_id, today)?
            .ok_or_else(already_active)?;
        info!(
            cycle_id = %cycle_id,
            participants = counts.participants,
            respondents = counts.respondents,
            "Assessment cycle activated"
        );

        let participant_ids: Vec<Uuid> = participants.iter().map(|p| p.id).collect();
        let respondents = store.respondents_for_participants(&participant_ids)?;
        let user_ids: Vec<Uuid> = participants
            .iter()
            .map(|p| p.user_id)
            .chain(respondents.iter().map(|r| r.respondent_user_id))
            .collect();
        let users: HashMap<Uuid, User> = store
            .find_users(&user_ids)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut tally = DeliveryTally::default();
        for participant in &participants {
            if let Some(recipient) = users.get(&participant.user_id).and_then(User::chat_username) {
                let notification = templates.cycle_started(recipient, &cycle.name);
                tally.deliver(notifier, &notification).await;
            }
        }
        let subject_names: HashMap<Uuid, String> = participants
            .iter()
            .map(|p| {
                let name = users.get(&p.user_id).map(User::full_name).unwrap_or_default();
                (p.id, name)
            })
            .collect();
        for respondent in &respondents {
            let Some(recipient) = users
                .get(&respondent.respondent_user_id)
                .and_then(User::chat_username)
            else {
                continue;
            };
            let participant_name = subject_names
                .get(&respondent.participant_id)
                .map(String::as_str)
                .unwrap_or_default();
            let notification =
                templates.evaluation_requested(recipient, respondent.id, participant_name, &cycle.name);
            tally.deliver(notifier, &notification).await;
        }

        info!(
            cycle_id = %cycle_id,
            sent = tally.sent,
            failed = tally.failed,
            "Cycle start notifications processed"
        );
        Ok(ActivationReport {
            participants: counts.participants,
            respondents: counts.respondents,
            notifications_sent: tally.sent,
            notifications_failed: tally.failed,
        })
    }

    pub async fn complete(
        store: &dyn AssessmentStore,
        notifier: &dyn Notifier,
        templates: &NotificationTemplates,
        ctx: &RequestContext,
        cycle_id: Uuid,
    ) -> Result<Cycle, AppError> {
        ctx.require_cycle_admin()?;
        Self::load_cycle(store, cycle_id)?;
        if !store.transition_cycle(cycle_id, &[CycleStatus::Active], CycleStatus::Completed)? {
            return Err(AppError::precondition("Only active cycles can be completed"));
        }
        let cycle = Self::load_cycle(store, cycle_id)?;
        info!(cycle_id = %cycle_id, "Assessment cycle completed");

        if let Some(caller) = store.find_user(ctx.user_id)? {
            if let Some(recipient) = caller.chat_username() {
                let notification = templates.cycle_completed(recipient, cycle.id, &cycle.name);
                DeliveryTally::default().deliver(notifier, &notification).await;
            }
        }
        Ok(cycle)
    }

    pub fn cancel(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
        cycle_id: Uuid,
    ) -> Result<Cycle, AppError> {
        ctx.require_cycle_admin()?;
        Self::load_cycle(store, cycle_id)?;
        if !store.transition_cycle(
            cycle_id,
            &[CycleStatus::Draft, CycleStatus::Active],
            CycleStatus::Cancelled,
        )? {
            return Err(AppError::precondition(
                "Only draft or active cycles can be cancelled",
            ));
        }
        info!(cycle_id = %cycle_id, "Assessment cycle cancelled");
        Self::load_cycle(store, cycle_id)
    }

    /// Informational aggregate; never gates anything.
    pub fn progress(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
        cycle_id: Uuid,
    ) -> Result<CycleProgress, AppError> {
        ctx.require_cycle_admin()?;
        Self::load_cycle(store, cycle_id)?;
        let participants = store.participants_in_cycle(cycle_id)?;
        let participant_ids: Vec<Uuid> = participants.iter().map(|p| p.id).collect();
        let respondents = store.respondents_for_participants(&participant_ids)?;

        let respondents_total = respondents.len() as i64;
        let respondents_completed = respondents
            .iter()
            .filter(|r| r.status == RespondentStatus::Completed)
            .count() as i64;
        let percentage = if respondents_total == 0 {
            0
        } else {
            (respondents_completed as f64 * 100.0 / respondents_total as f64).round() as i64
        };

        Ok(CycleProgress {
            cycle_id,
            participants_total: participants.len() as i64,
            participants_completed: participants
                .iter()
                .filter(|p| p.status == ParticipantStatus::Completed)
                .count() as i64,
            respondents_total,
            respondents_completed,
            percentage,
        })
    }
}

fn require_draft(cycle: &Cycle, action: &str) -> Result<(), AppError> {
    match cycle.status {
        CycleStatus::Draft => Ok(()),
        CycleStatus::Active => Err(AppError::precondition(format!(
            "Active cycles cannot be {}",
            action
        ))),
        other => Err(AppError::precondition(format!(
            "Cycle is {} and cannot be {}",
            other.as_str(),
            action
        ))),
    }
}

fn already_active() -> AppError {
    AppError::conflict_with_code(
        "Cycle is already active",
        None,
        error_codes::CYCLE_ALREADY_ACTIVE,
    )
}
