use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save control document for session `{session_id}`")]
    SaveControl {
        session_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load control document for session `{session_id}`")]
    LoadControl {
        session_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save participant `{identity}` of session `{session_id}`")]
    SaveParticipant {
        session_id: Uuid,
        identity: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load participant `{identity}` of session `{session_id}`")]
    LoadParticipant {
        session_id: Uuid,
        identity: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list participants of session `{session_id}`")]
    ListParticipants {
        session_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to remove participants of session `{session_id}`")]
    RemoveParticipants {
        session_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to append buzz record for session `{session_id}`")]
    AppendBuzzRecord {
        session_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list buzz records of session `{session_id}`")]
    ListBuzzRecords {
        session_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to remove documents of session `{session_id}`")]
    RemoveSession {
        session_id: Uuid,
        #[source]
        source: MongoError,
    },
}
