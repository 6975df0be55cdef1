//! Live Subscription Feed
//!
//! Fan-out of engine state changes to any number of observers. Three topic
//! families exist:
//!
//! - **Visits** (per agent): full snapshot of the agent's active visit list
//!   after every mutation.
//! - **Route** (per agent): snapshot of the agent's live route after every
//!   route mutation, or `None` when the route ends.
//! - **Positions** (per company): each accepted position sample for any agent
//!   in the company.
//!
//! Channels are bounded tokio broadcasts. A subscriber that stops polling
//! loses the oldest snapshots (`RecvError::Lagged`) rather than stalling the
//! engine write path; because every message is a full snapshot, a lagged
//! subscriber is consistent again after its next successful recv.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::trace;

use crate::types::{AgentId, AgentPosition, CompanyId, OptimizedRoute, TargetVisit};

/// Snapshot of an agent's non-terminal visits, ordered by creation time.
pub type VisitSnapshot = Vec<TargetVisit>;

/// The agent's live route, or `None` after completion/cancellation.
pub type RouteSnapshot = Option<OptimizedRoute>;

/// Central pub/sub hub for engine state changes.
///
/// Senders are created lazily on first publish or subscribe and kept for the
/// process lifetime; field teams are bounded so the maps stay small.
pub struct FeedHub {
    capacity: usize,
    visit_topics: Mutex<HashMap<AgentId, broadcast::Sender<VisitSnapshot>>>,
    route_topics: Mutex<HashMap<AgentId, broadcast::Sender<RouteSnapshot>>>,
    position_topics: Mutex<HashMap<CompanyId, broadcast::Sender<AgentPosition>>>,
}

impl FeedHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            visit_topics: Mutex::new(HashMap::new()),
            route_topics: Mutex::new(HashMap::new()),
            position_topics: Mutex::new(HashMap::new()),
        }
    }

    // ========================================================================
    // Subscribe
    // ========================================================================

    pub fn subscribe_visits(&self, agent_id: &str) -> broadcast::Receiver<VisitSnapshot> {
        let mut topics = self.visit_topics.lock().unwrap_or_else(|e| e.into_inner());
        Self::sender(&mut topics, agent_id, self.capacity).subscribe()
    }

    pub fn subscribe_route(&self, agent_id: &str) -> broadcast::Receiver<RouteSnapshot> {
        let mut topics = self.route_topics.lock().unwrap_or_else(|e| e.into_inner());
        Self::sender(&mut topics, agent_id, self.capacity).subscribe()
    }

    pub fn subscribe_positions(&self, company_id: &str) -> broadcast::Receiver<AgentPosition> {
        let mut topics = self
            .position_topics
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        Self::sender(&mut topics, company_id, self.capacity).subscribe()
    }

    // ========================================================================
    // Publish
    // ========================================================================

    /// Publish the agent's current visit snapshot. No-op without subscribers.
    pub fn publish_visits(&self, agent_id: &str, snapshot: VisitSnapshot) {
        let mut topics = self.visit_topics.lock().unwrap_or_else(|e| e.into_inner());
        let sender = Self::sender(&mut topics, agent_id, self.capacity);
        let delivered = sender.send(snapshot).unwrap_or(0);
        trace!(agent_id, delivered, "published visit snapshot");
    }

    /// Publish the agent's live route (or `None` when the route ended).
    pub fn publish_route(&self, agent_id: &str, snapshot: RouteSnapshot) {
        let mut topics = self.route_topics.lock().unwrap_or_else(|e| e.into_inner());
        let sender = Self::sender(&mut topics, agent_id, self.capacity);
        let delivered = sender.send(snapshot).unwrap_or(0);
        trace!(agent_id, delivered, "published route snapshot");
    }

    /// Publish an accepted position sample on the company topic.
    pub fn publish_position(&self, company_id: &str, position: AgentPosition) {
        let mut topics = self
            .position_topics
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let sender = Self::sender(&mut topics, company_id, self.capacity);
        let delivered = sender.send(position).unwrap_or(0);
        trace!(company_id, delivered, "published position");
    }

    fn sender<'a, T: Clone>(
        topics: &'a mut HashMap<String, broadcast::Sender<T>>,
        key: &str,
        capacity: usize,
    ) -> &'a broadcast::Sender<T> {
        topics
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(capacity).0)
    }
}
