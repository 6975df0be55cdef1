//! Position Ingestion
//!
//! Validates incoming GPS samples and maintains each agent's current position
//! plus a bounded per-day trail. Rejection rules:
//!
//! - Invalid coordinates fail hard (`InvalidCoordinate`).
//! - Accuracy above the configured ceiling is dropped (`LowAccuracySample`).
//! - A sample not strictly newer than the last accepted one is dropped
//!   (`StaleSample`); out-of-order deliveries cannot move the position
//!   backwards in time.
//!
//! Drops are sample-quality errors: the caller logs them and the last good
//! position stays in place. A backlog of offline samples is replayed in
//! `captured_at` order through the same rules, so reconnecting devices
//! converge to the same state as if they had streamed live.

use std::collections::VecDeque;

use chrono::{DateTime, Datelike, Utc};
use tracing::debug;

use crate::config::IngestConfig;
use crate::error::EngineError;
use crate::geo;
use crate::types::AgentPosition;

/// Per-agent position state: latest accepted sample plus today's trail.
#[derive(Debug)]
pub struct PositionLog {
    cfg: IngestConfig,
    current: Option<AgentPosition>,
    /// Today's accepted samples, oldest first, capped at `history_capacity`.
    history: VecDeque<AgentPosition>,
    /// Ordinal day of the newest history entry; a new day clears the trail.
    history_day: Option<i32>,
}

impl PositionLog {
    pub fn new(cfg: IngestConfig) -> Self {
        Self {
            cfg,
            current: None,
            history: VecDeque::new(),
            history_day: None,
        }
    }

    /// Latest accepted sample, if any.
    pub fn current(&self) -> Option<&AgentPosition> {
        self.current.as_ref()
    }

    /// Today's accepted trail, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &AgentPosition> {
        self.history.iter()
    }

    /// Validate and accept one sample.
    ///
    /// On success the sample becomes the current position and joins the
    /// day's trail. Errors leave all state untouched.
    pub fn accept(&mut self, sample: AgentPosition) -> Result<(), EngineError> {
        geo::validate(sample.point)?;

        if sample.accuracy_m > self.cfg.accuracy_ceiling_m {
            return Err(EngineError::LowAccuracySample {
                accuracy_m: sample.accuracy_m,
                ceiling_m: self.cfg.accuracy_ceiling_m,
            });
        }

        if let Some(current) = &self.current {
            if sample.captured_at <= current.captured_at {
                return Err(EngineError::StaleSample {
                    captured_at: sample.captured_at,
                });
            }
        }

        self.roll_day(sample.captured_at);
        if self.history.len() >= self.cfg.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(sample.clone());
        self.current = Some(sample);
        Ok(())
    }

    /// Replay a batch of buffered offline samples.
    ///
    /// Samples are sorted by `captured_at` before replay, so devices that
    /// buffered out of order still apply cleanly. Returns the number of
    /// samples accepted; individual rejections are logged and skipped.
    pub fn accept_backlog(&mut self, mut samples: Vec<AgentPosition>) -> usize {
        samples.sort_by_key(|s| s.captured_at);

        let mut accepted = 0;
        for sample in samples {
            match self.accept(sample) {
                Ok(()) => accepted += 1,
                Err(e) if e.is_sample_quality() => {
                    debug!(error = %e, "backlog sample dropped");
                }
                Err(e) => {
                    debug!(error = %e, "backlog sample rejected");
                }
            }
        }
        accepted
    }

    fn roll_day(&mut self, captured_at: DateTime<Utc>) {
        let day = captured_at.num_days_from_ce();
        if self.history_day != Some(day) {
            self.history.clear();
            self.history_day = Some(day);
        }
    }
}
