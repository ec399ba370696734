use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::{error::AppResult, services::cascade::CascadeEvaluator, store::AssessmentStore};

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompletionReport {
    pub candidates: usize,
    pub notified: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Re-runs the cascade for fully evaluated participants whose notification
/// flag is still unset, e.g. after a crash between completion and cascade.
pub struct CompletionSweep {
    store: Arc<dyn AssessmentStore>,
    evaluator: Arc<CascadeEvaluator>,
}

impl CompletionSweep {
    pub fn new(store: Arc<dyn AssessmentStore>, evaluator: Arc<CascadeEvaluator>) -> Self {
        Self { store, evaluator }
    }

    pub async fn run(&self) -> AppResult<CompletionReport> {
        let candidates = self.store.participants_awaiting_notification()?;
        let mut report = CompletionReport {
            candidates: candidates.len(),
            ..CompletionReport::default()
        };

        for participant_id in candidates {
            match self.evaluator.evaluate_participant(participant_id).await {
                Ok(outcome) if outcome.claimed() => report.notified += 1,
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(participant_id = %participant_id, error = %e, "Catch-up evaluation failed");
                }
            }
        }

        if report.candidates > 0 {
            info!(
                candidates = report.candidates,
                notified = report.notified,
                skipped = report.skipped,
                failed = report.failed,
                "Completion catch-up sweep closed gaps"
            );
        }
        Ok(report)
    }
}
