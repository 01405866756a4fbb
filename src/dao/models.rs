use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Phase of a session as persisted in the control document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SessionPhaseEntity {
    /// No countdown running, buzzers disarmed.
    Idle,
    /// Countdown in progress with the number of ticks left before the window opens.
    Countdown {
        /// Ticks remaining until the buzz window opens.
        remaining: u8,
    },
    /// Buzz window is open, buzzes are accepted.
    BuzzWindow,
}

/// Singleton control document holding the authoritative session lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionControlEntity {
    /// Current lifecycle phase.
    pub phase: SessionPhaseEntity,
    /// When the running countdown was started, if any.
    pub countdown_started_at: Option<SystemTime>,
    /// Reset generation; bumped on every reset to invalidate stale timers.
    pub generation: u64,
    /// Last time the control document was written.
    pub updated_at: SystemTime,
}

impl SessionControlEntity {
    /// Control document for a freshly created session.
    pub fn initial() -> Self {
        Self {
            phase: SessionPhaseEntity::Idle,
            countdown_started_at: None,
            generation: 0,
            updated_at: SystemTime::now(),
        }
    }
}

/// Participant record persisted per session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Unique identity within the session (chosen by the caller).
    pub identity: String,
    /// Whether this participant has buzzed in the current window.
    pub buzzed: bool,
    /// Rank assigned by the arbiter when the buzz was accepted.
    pub rank: Option<u32>,
    /// Wall-clock time of the accepted buzz, for display purposes only.
    pub buzzed_at: Option<SystemTime>,
    /// When the participant joined the session.
    pub joined_at: SystemTime,
    /// First generation in which this participant may buzz. Participants who
    /// join while a window is already open only become eligible after the
    /// next reset.
    pub eligible_generation: u64,
}

impl ParticipantEntity {
    /// Fresh participant record with no buzz state.
    pub fn new(identity: String, eligible_generation: u64) -> Self {
        Self {
            identity,
            buzzed: false,
            rank: None,
            buzzed_at: None,
            joined_at: SystemTime::now(),
            eligible_generation,
        }
    }

    /// Clear the buzz flag and rank while keeping the identity registered.
    pub fn clear_buzz(&mut self) {
        self.buzzed = false;
        self.rank = None;
        self.buzzed_at = None;
    }
}

/// Immutable entry of the per-session buzz history log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuzzRecordEntity {
    /// Identity of the participant whose buzz was accepted.
    pub identity: String,
    /// Rank assigned within the buzz window (1-based, strictly increasing).
    pub rank: u32,
    /// Wall-clock time the record was created.
    pub recorded_at: SystemTime,
}
