use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    BuzzRecordEntity, ParticipantEntity, SessionControlEntity, SessionPhaseEntity,
};
use crate::dao::storage::StorageError;

const PHASE_IDLE: &str = "idle";
const PHASE_COUNTDOWN: &str = "countdown";
const PHASE_BUZZ_WINDOW: &str = "buzz_window";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoControlDocument {
    #[serde(rename = "_id")]
    session_id: Uuid,
    phase: String,
    countdown_remaining: Option<i32>,
    countdown_started_at: Option<DateTime>,
    generation: i64,
    updated_at: DateTime,
}

impl MongoControlDocument {
    pub fn from_entity(session_id: Uuid, entity: SessionControlEntity) -> Self {
        let (phase, countdown_remaining) = match entity.phase {
            SessionPhaseEntity::Idle => (PHASE_IDLE.to_owned(), None),
            SessionPhaseEntity::Countdown { remaining } => {
                (PHASE_COUNTDOWN.to_owned(), Some(i32::from(remaining)))
            }
            SessionPhaseEntity::BuzzWindow => (PHASE_BUZZ_WINDOW.to_owned(), None),
        };

        Self {
            session_id,
            phase,
            countdown_remaining,
            countdown_started_at: entity.countdown_started_at.map(DateTime::from_system_time),
            generation: entity.generation as i64,
            updated_at: DateTime::from_system_time(entity.updated_at),
        }
    }
}

impl TryFrom<MongoControlDocument> for SessionControlEntity {
    type Error = StorageError;

    fn try_from(value: MongoControlDocument) -> Result<Self, Self::Error> {
        let phase = match (value.phase.as_str(), value.countdown_remaining) {
            (PHASE_IDLE, _) => SessionPhaseEntity::Idle,
            (PHASE_BUZZ_WINDOW, _) => SessionPhaseEntity::BuzzWindow,
            (PHASE_COUNTDOWN, Some(remaining)) if (1..=255).contains(&remaining) => {
                SessionPhaseEntity::Countdown {
                    remaining: remaining as u8,
                }
            }
            (phase, remaining) => {
                return Err(StorageError::corrupted(format!(
                    "control document of session `{}` holds unknown phase `{phase}` (remaining {remaining:?})",
                    value.session_id
                )));
            }
        };

        Ok(Self {
            phase,
            countdown_started_at: value.countdown_started_at.map(DateTime::to_system_time),
            generation: value.generation as u64,
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    pub session_id: Uuid,
    pub identity: String,
    buzzed: bool,
    rank: Option<i64>,
    buzzed_at: Option<DateTime>,
    joined_at: DateTime,
    eligible_generation: i64,
}

impl MongoParticipantDocument {
    pub fn from_entity(session_id: Uuid, entity: ParticipantEntity) -> Self {
        Self {
            session_id,
            identity: entity.identity,
            buzzed: entity.buzzed,
            rank: entity.rank.map(i64::from),
            buzzed_at: entity.buzzed_at.map(DateTime::from_system_time),
            joined_at: DateTime::from_system_time(entity.joined_at),
            eligible_generation: entity.eligible_generation as i64,
        }
    }
}

impl From<MongoParticipantDocument> for ParticipantEntity {
    fn from(value: MongoParticipantDocument) -> Self {
        Self {
            identity: value.identity,
            buzzed: value.buzzed,
            rank: value.rank.map(|rank| rank as u32),
            buzzed_at: value.buzzed_at.map(DateTime::to_system_time),
            joined_at: value.joined_at.to_system_time(),
            eligible_generation: value.eligible_generation as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoBuzzRecordDocument {
    pub session_id: Uuid,
    identity: String,
    rank: i64,
    recorded_at: DateTime,
}

impl MongoBuzzRecordDocument {
    pub fn from_entity(session_id: Uuid, entity: BuzzRecordEntity) -> Self {
        Self {
            session_id,
            identity: entity.identity,
            rank: i64::from(entity.rank),
            recorded_at: DateTime::from_system_time(entity.recorded_at),
        }
    }
}

impl From<MongoBuzzRecordDocument> for BuzzRecordEntity {
    fn from(value: MongoBuzzRecordDocument) -> Self {
        Self {
            identity: value.identity,
            rank: value.rank as u32,
            recorded_at: value.recorded_at.to_system_time(),
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! { "_id": uuid_as_binary(id) }
}
