//! Abstraction over the persistence backends holding session state.

pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{BuzzRecordEntity, ParticipantEntity, SessionControlEntity};
use crate::dao::storage::StorageResult;

/// Identifier of a buzzer session, used as the partition key for every store
/// operation.
pub type SessionId = Uuid;

/// Abstraction over the persistence layer for session control state,
/// participant records, and the buzz history log. Backends must provide
/// read-your-writes consistency within a single session.
pub trait SessionStore: Send + Sync {
    /// Fetch the control document for a session, if the session exists.
    fn get_control(
        &self,
        session_id: SessionId,
    ) -> BoxFuture<'static, StorageResult<Option<SessionControlEntity>>>;
    /// Upsert the control document for a session.
    fn set_control(
        &self,
        session_id: SessionId,
        control: SessionControlEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a single participant by identity.
    fn get_participant(
        &self,
        session_id: SessionId,
        identity: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Upsert a participant record.
    fn set_participant(
        &self,
        session_id: SessionId,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// List every participant of a session in join order.
    fn list_participants(
        &self,
        session_id: SessionId,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    /// Remove every participant of a session.
    fn remove_participants(&self, session_id: SessionId)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Append an immutable record to the buzz history log.
    fn append_buzz_record(
        &self,
        session_id: SessionId,
        record: BuzzRecordEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// List the most recent buzz records, newest first, up to `limit`.
    fn list_recent_buzz_records(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<BuzzRecordEntity>>>;
    /// Drop every document belonging to a session.
    fn remove_session(&self, session_id: SessionId) -> BoxFuture<'static, StorageResult<()>>;
    /// Probe backend connectivity.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a dropped backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
