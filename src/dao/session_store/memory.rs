//! In-process session store used when no external database is configured.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::dao::models::{BuzzRecordEntity, ParticipantEntity, SessionControlEntity};
use crate::dao::session_store::{SessionId, SessionStore};
use crate::dao::storage::StorageResult;

/// Per-session bucket of documents. Participants keep their join order so
/// listings are stable across calls.
#[derive(Debug, Default)]
struct SessionBucket {
    control: Option<SessionControlEntity>,
    participants: IndexMap<String, ParticipantEntity>,
    history: Vec<BuzzRecordEntity>,
}

/// Session store keeping everything in process memory.
///
/// Mutations go through the per-key `DashMap` entry guard, which is enough to
/// provide read-your-writes consistency per session; cross-operation atomicity
/// is the coordinator's job, not the store's.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<SessionId, SessionBucket>>,
}

impl MemorySessionStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_bucket<T>(&self, session_id: SessionId, f: impl FnOnce(&mut SessionBucket) -> T) -> T {
        let mut bucket = self.sessions.entry(session_id).or_default();
        f(&mut bucket)
    }
}

impl SessionStore for MemorySessionStore {
    fn get_control(
        &self,
        session_id: SessionId,
    ) -> BoxFuture<'static, StorageResult<Option<SessionControlEntity>>> {
        let control = self
            .sessions
            .get(&session_id)
            .and_then(|bucket| bucket.control.clone());
        Box::pin(async move { Ok(control) })
    }

    fn set_control(
        &self,
        session_id: SessionId,
        control: SessionControlEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.with_bucket(session_id, |bucket| bucket.control = Some(control));
        Box::pin(async move { Ok(()) })
    }

    fn get_participant(
        &self,
        session_id: SessionId,
        identity: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let participant = self
            .sessions
            .get(&session_id)
            .and_then(|bucket| bucket.participants.get(&identity).cloned());
        Box::pin(async move { Ok(participant) })
    }

    fn set_participant(
        &self,
        session_id: SessionId,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.with_bucket(session_id, |bucket| {
            bucket
                .participants
                .insert(participant.identity.clone(), participant);
        });
        Box::pin(async move { Ok(()) })
    }

    fn list_participants(
        &self,
        session_id: SessionId,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let participants = self
            .sessions
            .get(&session_id)
            .map(|bucket| bucket.participants.values().cloned().collect())
            .unwrap_or_default();
        Box::pin(async move { Ok(participants) })
    }

    fn remove_participants(
        &self,
        session_id: SessionId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.with_bucket(session_id, |bucket| bucket.participants.clear());
        Box::pin(async move { Ok(()) })
    }

    fn append_buzz_record(
        &self,
        session_id: SessionId,
        record: BuzzRecordEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.with_bucket(session_id, |bucket| bucket.history.push(record));
        Box::pin(async move { Ok(()) })
    }

    fn list_recent_buzz_records(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<BuzzRecordEntity>>> {
        let records = self
            .sessions
            .get(&session_id)
            .map(|bucket| bucket.history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default();
        Box::pin(async move { Ok(records) })
    }

    fn remove_session(&self, session_id: SessionId) -> BoxFuture<'static, StorageResult<()>> {
        self.sessions.remove(&session_id);
        Box::pin(async move { Ok(()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async move { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async move { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn participants_keep_join_order() {
        let store = MemorySessionStore::new();
        let session = Uuid::new_v4();

        for identity in ["carol", "alice", "bob"] {
            store
                .set_participant(session, ParticipantEntity::new(identity.into(), 0))
                .await
                .unwrap();
        }

        let listed = store.list_participants(session).await.unwrap();
        let identities: Vec<_> = listed.iter().map(|p| p.identity.as_str()).collect();
        assert_eq!(identities, vec!["carol", "alice", "bob"]);
    }

    #[tokio::test]
    async fn recent_records_are_newest_first_and_limited() {
        let store = MemorySessionStore::new();
        let session = Uuid::new_v4();

        for (rank, identity) in ["alice", "bob", "carol"].iter().enumerate() {
            store
                .append_buzz_record(
                    session,
                    BuzzRecordEntity {
                        identity: (*identity).into(),
                        rank: rank as u32 + 1,
                        recorded_at: std::time::SystemTime::now(),
                    },
                )
                .await
                .unwrap();
        }

        let recent = store.list_recent_buzz_records(session, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].identity, "carol");
        assert_eq!(recent[1].identity, "bob");
    }

    #[tokio::test]
    async fn remove_session_drops_every_document() {
        let store = MemorySessionStore::new();
        let session = Uuid::new_v4();

        store
            .set_control(session, SessionControlEntity::initial())
            .await
            .unwrap();
        store
            .set_participant(session, ParticipantEntity::new("alice".into(), 0))
            .await
            .unwrap();
        store.remove_session(session).await.unwrap();

        assert!(store.get_control(session).await.unwrap().is_none());
        assert!(store.list_participants(session).await.unwrap().is_empty());
    }
}
