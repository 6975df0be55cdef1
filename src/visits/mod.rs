//! Visit State Machine
//!
//! Owns every visit record for one agent and enforces the forward-only
//! lifecycle:
//!
//! ```text
//! Pending ──start──► InProgress ──complete──► Completed
//!    │                   │
//!    └───────skip────────┴──────────────────► Skipped
//! ```
//!
//! Invalid transitions return `InvalidTransition` and change nothing; the
//! caller is expected to re-sync from the latest snapshot rather than retry.
//! Terminal visits are never removed, only excluded from the active snapshot.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineError;
use crate::types::{GeoPoint, Target, TargetVisit, VisitStatus};

/// All visits for one agent, terminal history included.
#[derive(Debug, Default)]
pub struct VisitBook {
    visits: Vec<TargetVisit>,
}

impl VisitBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a target, creating a fresh `Pending` visit.
    ///
    /// At most one non-terminal visit may exist per target; a duplicate
    /// assignment returns the existing visit's id instead of creating a
    /// second one.
    pub fn assign(&mut self, agent_id: &str, company_id: &str, target: &Target) -> Uuid {
        if let Some(existing) = self
            .visits
            .iter()
            .find(|v| v.target_id == target.id && !v.status.is_terminal())
        {
            return existing.id;
        }

        let visit = TargetVisit::new(agent_id.to_string(), company_id.to_string(), target);
        let id = visit.id;
        info!(agent_id, target = %target.name, visit_id = %id, "visit assigned");
        self.visits.push(visit);
        id
    }

    /// `Pending → InProgress`. Starts the visit timer.
    pub fn start(&mut self, visit_id: Uuid) -> Result<&TargetVisit, EngineError> {
        let visit = self.get_mut(visit_id)?;
        if visit.status != VisitStatus::Pending {
            return Err(EngineError::InvalidTransition {
                from: visit.status,
                action: "start",
            });
        }
        visit.status = VisitStatus::InProgress;
        visit.timer_started_at = Some(Utc::now());
        info!(visit_id = %visit_id, "visit started");
        Ok(&*visit)
    }

    /// `InProgress → Completed`. Records the outcome, the agent's position at
    /// completion, and the elapsed duration in whole minutes.
    pub fn complete(
        &mut self,
        visit_id: Uuid,
        outcome: Option<String>,
        position: Option<GeoPoint>,
    ) -> Result<&TargetVisit, EngineError> {
        let visit = self.get_mut(visit_id)?;
        if visit.status != VisitStatus::InProgress {
            return Err(EngineError::InvalidTransition {
                from: visit.status,
                action: "complete",
            });
        }
        let now = Utc::now();
        visit.status = VisitStatus::Completed;
        visit.completed_at = Some(now);
        visit.outcome = outcome;
        visit.reached_location = position;
        visit.duration_minutes = visit
            .timer_started_at
            .map(|started| (now - started).num_minutes());
        info!(visit_id = %visit_id, duration_min = ?visit.duration_minutes, "visit completed");
        Ok(&*visit)
    }

    /// `Pending | InProgress → Skipped`.
    pub fn skip(
        &mut self,
        visit_id: Uuid,
        reason: Option<String>,
    ) -> Result<&TargetVisit, EngineError> {
        let visit = self.get_mut(visit_id)?;
        if visit.status.is_terminal() {
            return Err(EngineError::InvalidTransition {
                from: visit.status,
                action: "skip",
            });
        }
        visit.status = VisitStatus::Skipped;
        visit.skipped_at = Some(Utc::now());
        visit.skip_reason = reason;
        info!(visit_id = %visit_id, "visit skipped");
        Ok(&*visit)
    }

    /// Attach the distance of a finished navigation session to its visit.
    pub fn record_navigation_distance(
        &mut self,
        visit_id: Uuid,
        distance_km: f64,
    ) -> Result<(), EngineError> {
        let visit = self.get_mut(visit_id)?;
        visit.navigation_distance_km = Some(distance_km);
        Ok(())
    }

    pub fn get(&self, visit_id: Uuid) -> Option<&TargetVisit> {
        self.visits.iter().find(|v| v.id == visit_id)
    }

    /// Non-terminal visits, oldest assignment first.
    pub fn active(&self) -> Vec<&TargetVisit> {
        let mut active: Vec<&TargetVisit> = self
            .visits
            .iter()
            .filter(|v| !v.status.is_terminal())
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        active
    }

    /// Owned snapshot of the active list, for publication.
    pub fn active_snapshot(&self) -> Vec<TargetVisit> {
        self.active().into_iter().cloned().collect()
    }

    /// Pending visits only — the candidate pool for route optimization.
    pub fn pending(&self) -> Vec<&TargetVisit> {
        let mut pending: Vec<&TargetVisit> = self
            .visits
            .iter()
            .filter(|v| v.status == VisitStatus::Pending)
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending
    }

    pub fn all(&self) -> &[TargetVisit] {
        &self.visits
    }

    fn get_mut(&mut self, visit_id: Uuid) -> Result<&mut TargetVisit, EngineError> {
        let agent_id = self
            .visits
            .first()
            .map(|v| v.agent_id.clone())
            .unwrap_or_default();
        self.visits
            .iter_mut()
            .find(|v| v.id == visit_id)
            .ok_or(EngineError::VisitNotFound { agent_id, visit_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TargetLocation, TargetOrigin};

    fn target(id: &str) -> Target {
        Target {
            id: id.to_string(),
            name: format!("Target {id}"),
            location: TargetLocation {
                point: GeoPoint::new(12.97, 77.59),
                address: None,
            },
            created_by: "admin".to_string(),
            origin: TargetOrigin::SelfAssigned,
            archived: false,
            created_at: Utc::now(),
        }
    }

    fn book_with_one_visit() -> (VisitBook, Uuid) {
        let mut book = VisitBook::new();
        let id = book.assign("agent-1", "acme", &target("t1"));
        (book, id)
    }

    #[test]
    fn full_lifecycle_pending_to_completed() {
        let (mut book, id) = book_with_one_visit();
        assert_eq!(book.get(id).unwrap().status, VisitStatus::Pending);

        book.start(id).unwrap();
        let v = book.get(id).unwrap();
        assert_eq!(v.status, VisitStatus::InProgress);
        assert!(v.timer_started_at.is_some());

        book.complete(id, Some("met the manager".to_string()), None)
            .unwrap();
        let v = book.get(id).unwrap();
        assert_eq!(v.status, VisitStatus::Completed);
        assert!(v.completed_at.is_some());
        assert_eq!(v.duration_minutes, Some(0));
    }

    #[test]
    fn complete_requires_in_progress() {
        let (mut book, id) = book_with_one_visit();
        let err = book.complete(id, None, None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                from: VisitStatus::Pending,
                action: "complete"
            }
        ));
        // No-op on failure.
        assert_eq!(book.get(id).unwrap().status, VisitStatus::Pending);
    }

    #[test]
    fn double_complete_is_rejected() {
        let (mut book, id) = book_with_one_visit();
        book.start(id).unwrap();
        book.complete(id, None, None).unwrap();
        let first_completed_at = book.get(id).unwrap().completed_at;

        let err = book.complete(id, Some("again".to_string()), None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert_eq!(book.get(id).unwrap().completed_at, first_completed_at);
        assert!(book.get(id).unwrap().outcome.is_none());
    }

    #[test]
    fn skip_works_from_pending_and_in_progress_but_not_terminal() {
        let mut book = VisitBook::new();
        let a = book.assign("agent-1", "acme", &target("t1"));
        let b = book.assign("agent-1", "acme", &target("t2"));

        book.skip(a, Some("closed".to_string())).unwrap();
        assert_eq!(book.get(a).unwrap().status, VisitStatus::Skipped);

        book.start(b).unwrap();
        book.skip(b, None).unwrap();
        assert_eq!(book.get(b).unwrap().status, VisitStatus::Skipped);

        let err = book.skip(a, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[test]
    fn start_after_skip_is_rejected() {
        let (mut book, id) = book_with_one_visit();
        book.skip(id, None).unwrap();
        assert!(matches!(
            book.start(id),
            Err(EngineError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn duplicate_assignment_reuses_open_visit() {
        let mut book = VisitBook::new();
        let t = target("t1");
        let first = book.assign("agent-1", "acme", &t);
        let second = book.assign("agent-1", "acme", &t);
        assert_eq!(first, second);
        assert_eq!(book.all().len(), 1);

        // Once terminal, the target can be assigned again.
        book.skip(first, None).unwrap();
        let third = book.assign("agent-1", "acme", &t);
        assert_ne!(first, third);
        assert_eq!(book.all().len(), 2);
    }

    #[test]
    fn active_excludes_terminal_visits() {
        let mut book = VisitBook::new();
        let a = book.assign("agent-1", "acme", &target("t1"));
        let _b = book.assign("agent-1", "acme", &target("t2"));
        book.skip(a, None).unwrap();

        let active = book.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].target_id, "t2");
    }

    #[test]
    fn unknown_visit_id_is_not_found() {
        let (mut book, _) = book_with_one_visit();
        assert!(matches!(
            book.start(Uuid::new_v4()),
            Err(EngineError::VisitNotFound { .. })
        ));
    }
}
