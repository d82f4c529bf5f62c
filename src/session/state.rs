use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{clock::SessionClock, seed::LeadSeed};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Idle,
    Arming,
    Running,
    Complete,
}

impl SessionState {
    /// Status pill text.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "IDLE",
            SessionState::Arming => "ARMING",
            SessionState::Running => "RUNNING",
            SessionState::Complete => "COMPLETE",
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Arming | SessionState::Running => "assembling",
            SessionState::Complete => "complete",
        }
    }
}

/// Integrity label for a running session at `pct` percent.
pub fn integrity_label(pct: u8) -> &'static str {
    match pct {
        0..=24 => "low",
        25..=59 => "medium",
        60..=89 => "high",
        _ => "almost",
    }
}

/// Everything minted when a session is armed. Dropped on reset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub lead_id: String,
    pub armed_at: DateTime<Utc>,
    pub seed: LeadSeed,
    /// Set when the session leaves Arming.
    pub clock: Option<SessionClock>,
}

impl SessionRecord {
    pub fn new(session_id: String, lead_id: String, seed: LeadSeed) -> Self {
        Self {
            session_id,
            lead_id,
            armed_at: Utc::now(),
            seed,
            clock: None,
        }
    }

    pub fn begin(&mut self, started_at_ms: u64, duration_ms: u64) {
        self.clock = Some(SessionClock::new(started_at_ms, duration_ms));
    }
}
