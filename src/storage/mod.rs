//! Archive Storage
//!
//! Terminal visits and finished navigation sessions are appended to a local
//! sled database for history queries and daily reporting. Live state never
//! lives here; the engine's in-memory partitions are authoritative and the
//! archive is write-behind.
//!
//! Keys are `{agent_id}/{millis_be}/{id}` so a prefix scan over an agent
//! yields records in chronological order without a secondary index.

use std::path::Path;

use chrono::{DateTime, Utc};
use sled::Tree;
use tracing::info;

use crate::error::EngineError;
use crate::types::{NavigationStatus, NavigationTrackingEntry, TargetVisit};

const VISITS_TREE: &str = "visits";
const NAVIGATION_TREE: &str = "navigation";

pub struct Archive {
    #[allow(dead_code)]
    db: sled::Db,
    visits: Tree,
    navigation: Tree,
}

impl Archive {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let db = sled::open(path.as_ref())?;
        let archive = Self {
            visits: db.open_tree(VISITS_TREE)?,
            navigation: db.open_tree(NAVIGATION_TREE)?,
            db,
        };
        info!(path = %path.as_ref().display(), "archive opened");
        Ok(archive)
    }

    /// In-memory archive for tests and ephemeral deployments.
    pub fn temp() -> Result<Self, EngineError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            visits: db.open_tree(VISITS_TREE)?,
            navigation: db.open_tree(NAVIGATION_TREE)?,
            db,
        })
    }

    pub fn archive_visit(&self, visit: &TargetVisit) -> Result<(), EngineError> {
        let at = visit
            .completed_at
            .or(visit.skipped_at)
            .unwrap_or(visit.created_at);
        let key = record_key(&visit.agent_id, at, &visit.id.to_string());
        self.visits.insert(key, serde_json::to_vec(visit)?)?;
        Ok(())
    }

    pub fn archive_navigation(&self, entry: &NavigationTrackingEntry) -> Result<(), EngineError> {
        let at = entry.completed_at.unwrap_or(entry.started_at);
        let key = record_key(&entry.agent_id, at, &entry.id.to_string());
        self.navigation.insert(key, serde_json::to_vec(entry)?)?;
        Ok(())
    }

    /// All archived visits for an agent, oldest first.
    pub fn visits_for_agent(&self, agent_id: &str) -> Result<Vec<TargetVisit>, EngineError> {
        let mut out = Vec::new();
        for item in self.visits.scan_prefix(agent_prefix(agent_id)) {
            let (_, value) = item?;
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    /// Completed navigation sessions for an agent finished at or after
    /// `since`. Cancelled sessions are excluded from reporting totals.
    pub fn navigation_completed_since(
        &self,
        agent_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<NavigationTrackingEntry>, EngineError> {
        let mut out = Vec::new();
        let start = record_key(agent_id, since, "");
        let prefix = agent_prefix(agent_id);
        for item in self.navigation.range(start..) {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let entry: NavigationTrackingEntry = serde_json::from_slice(&value)?;
            if entry.status == NavigationStatus::Completed {
                out.push(entry);
            }
        }
        Ok(out)
    }
}

fn agent_prefix(agent_id: &str) -> String {
    format!("{agent_id}/")
}

fn record_key(agent_id: &str, at: DateTime<Utc>, id: &str) -> Vec<u8> {
    let mut key = agent_prefix(agent_id).into_bytes();
    key.extend_from_slice(&(at.timestamp_millis() as u64).to_be_bytes());
    key.push(b'/');
    key.extend_from_slice(id.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        GeoPoint, RoutePoint, Target, TargetLocation, TargetOrigin, VisitStatus,
    };
    use chrono::Duration;
    use uuid::Uuid;

    fn visit(agent: &str) -> TargetVisit {
        let target = Target {
            id: "t1".to_string(),
            name: "Depot".to_string(),
            location: TargetLocation {
                point: GeoPoint::new(0.0, 0.0),
                address: None,
            },
            created_by: "admin".to_string(),
            origin: TargetOrigin::SelfAssigned,
            archived: false,
            created_at: Utc::now(),
        };
        let mut v = TargetVisit::new(agent.to_string(), "acme".to_string(), &target);
        v.status = VisitStatus::Completed;
        v.completed_at = Some(Utc::now());
        v
    }

    fn navigation(agent: &str, km: f64, at: DateTime<Utc>, status: NavigationStatus) -> NavigationTrackingEntry {
        NavigationTrackingEntry {
            id: Uuid::new_v4(),
            agent_id: agent.to_string(),
            company_id: "acme".to_string(),
            visit_id: Uuid::new_v4(),
            target_id: "t1".to_string(),
            target_name: "Depot".to_string(),
            target_location: GeoPoint::new(0.0, 0.0),
            route_points: vec![RoutePoint {
                point: GeoPoint::new(0.0, 0.0),
                captured_at: at,
            }],
            total_distance_km: km,
            status,
            started_at: at - Duration::minutes(10),
            completed_at: Some(at),
        }
    }

    #[test]
    fn visits_round_trip_per_agent() {
        let archive = Archive::temp().unwrap();
        archive.archive_visit(&visit("agent-1")).unwrap();
        archive.archive_visit(&visit("agent-1")).unwrap();
        archive.archive_visit(&visit("agent-2")).unwrap();

        assert_eq!(archive.visits_for_agent("agent-1").unwrap().len(), 2);
        assert_eq!(archive.visits_for_agent("agent-2").unwrap().len(), 1);
        assert!(archive.visits_for_agent("agent-3").unwrap().is_empty());
    }

    #[test]
    fn navigation_query_filters_by_time_and_status() {
        let archive = Archive::temp().unwrap();
        let now = Utc::now();
        archive
            .archive_navigation(&navigation("agent-1", 5.0, now, NavigationStatus::Completed))
            .unwrap();
        archive
            .archive_navigation(&navigation(
                "agent-1",
                3.0,
                now - Duration::days(1),
                NavigationStatus::Completed,
            ))
            .unwrap();
        archive
            .archive_navigation(&navigation("agent-1", 2.0, now, NavigationStatus::Cancelled))
            .unwrap();

        let today = archive
            .navigation_completed_since("agent-1", now - Duration::hours(1))
            .unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].total_distance_km, 5.0);
    }

    #[test]
    fn archive_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive");
        {
            let archive = Archive::open(&path).unwrap();
            archive.archive_visit(&visit("agent-1")).unwrap();
        }
        let archive = Archive::open(&path).unwrap();
        let visits = archive.visits_for_agent("agent-1").unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].status, VisitStatus::Completed);
    }

    #[test]
    fn agent_prefixes_do_not_collide() {
        let archive = Archive::temp().unwrap();
        let now = Utc::now();
        archive
            .archive_navigation(&navigation("agent-1", 5.0, now, NavigationStatus::Completed))
            .unwrap();
        archive
            .archive_navigation(&navigation("agent-11", 7.0, now, NavigationStatus::Completed))
            .unwrap();

        let one = archive
            .navigation_completed_since("agent-1", now - Duration::hours(1))
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].total_distance_km, 5.0);
    }
}
