use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoBuzzRecordDocument, MongoControlDocument, MongoParticipantDocument, doc_id,
        uuid_as_binary,
    },
};
use crate::dao::{
    models::{BuzzRecordEntity, ParticipantEntity, SessionControlEntity},
    session_store::{SessionId, SessionStore},
    storage::StorageResult,
};

const CONTROL_COLLECTION_NAME: &str = "session_control";
const PARTICIPANT_COLLECTION_NAME: &str = "participants";
const HISTORY_COLLECTION_NAME: &str = "buzz_history";

/// Session store backed by MongoDB collections, one document per control
/// record / participant / history entry.
#[derive(Clone)]
pub struct MongoSessionStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoSessionStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let participant_collection = self.participant_collection().await;
        let participant_index = mongodb::IndexModel::builder()
            .keys(doc! {"session_id": 1, "identity": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("participant_session_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        participant_collection
            .create_index(participant_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PARTICIPANT_COLLECTION_NAME,
                index: "session_id,identity",
                source,
            })?;

        let history_collection = self.history_collection().await;
        let history_index = mongodb::IndexModel::builder()
            .keys(doc! {"session_id": 1, "rank": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("history_session_idx".to_owned()))
                    .build(),
            )
            .build();

        history_collection
            .create_index(history_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: HISTORY_COLLECTION_NAME,
                index: "session_id,rank",
                source,
            })?;

        Ok(())
    }

    async fn control_collection(&self) -> Collection<MongoControlDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoControlDocument>(CONTROL_COLLECTION_NAME)
    }

    async fn participant_collection(&self) -> Collection<MongoParticipantDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoParticipantDocument>(PARTICIPANT_COLLECTION_NAME)
    }

    async fn history_collection(&self) -> Collection<MongoBuzzRecordDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoBuzzRecordDocument>(HISTORY_COLLECTION_NAME)
    }

    async fn load_control(
        &self,
        session_id: Uuid,
    ) -> StorageResult<Option<SessionControlEntity>> {
        let collection = self.control_collection().await;
        let document = collection
            .find_one(doc_id(session_id))
            .await
            .map_err(|source| MongoDaoError::LoadControl { session_id, source })?;

        document.map(SessionControlEntity::try_from).transpose()
    }

    async fn save_control(
        &self,
        session_id: Uuid,
        control: SessionControlEntity,
    ) -> MongoResult<()> {
        let collection = self.control_collection().await;
        let document = MongoControlDocument::from_entity(session_id, control);
        collection
            .replace_one(doc_id(session_id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveControl { session_id, source })?;
        Ok(())
    }

    async fn load_participant(
        &self,
        session_id: Uuid,
        identity: String,
    ) -> MongoResult<Option<ParticipantEntity>> {
        let collection = self.participant_collection().await;
        let document = collection
            .find_one(doc! { "session_id": uuid_as_binary(session_id), "identity": &identity })
            .await
            .map_err(|source| MongoDaoError::LoadParticipant {
                session_id,
                identity,
                source,
            })?;

        Ok(document.map(Into::into))
    }

    async fn save_participant(
        &self,
        session_id: Uuid,
        participant: ParticipantEntity,
    ) -> MongoResult<()> {
        let identity = participant.identity.clone();
        let collection = self.participant_collection().await;
        let document = MongoParticipantDocument::from_entity(session_id, participant);
        collection
            .replace_one(
                doc! { "session_id": uuid_as_binary(session_id), "identity": &document.identity },
                &document,
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveParticipant {
                session_id,
                identity,
                source,
            })?;
        Ok(())
    }

    async fn load_participants(&self, session_id: Uuid) -> MongoResult<Vec<ParticipantEntity>> {
        let collection = self.participant_collection().await;
        let documents: Vec<MongoParticipantDocument> = collection
            .find(doc! { "session_id": uuid_as_binary(session_id) })
            .sort(doc! { "joined_at": 1 })
            .await
            .map_err(|source| MongoDaoError::ListParticipants { session_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListParticipants { session_id, source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn delete_participants(&self, session_id: Uuid) -> MongoResult<()> {
        let collection = self.participant_collection().await;
        collection
            .delete_many(doc! { "session_id": uuid_as_binary(session_id) })
            .await
            .map_err(|source| MongoDaoError::RemoveParticipants { session_id, source })?;
        Ok(())
    }

    async fn insert_buzz_record(
        &self,
        session_id: Uuid,
        record: BuzzRecordEntity,
    ) -> MongoResult<()> {
        let collection = self.history_collection().await;
        let document = MongoBuzzRecordDocument::from_entity(session_id, record);
        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::AppendBuzzRecord { session_id, source })?;
        Ok(())
    }

    async fn load_recent_buzz_records(
        &self,
        session_id: Uuid,
        limit: usize,
    ) -> MongoResult<Vec<BuzzRecordEntity>> {
        let collection = self.history_collection().await;
        let documents: Vec<MongoBuzzRecordDocument> = collection
            .find(doc! { "session_id": uuid_as_binary(session_id) })
            .sort(doc! { "recorded_at": -1, "rank": -1 })
            .limit(limit as i64)
            .await
            .map_err(|source| MongoDaoError::ListBuzzRecords { session_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListBuzzRecords { session_id, source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn delete_session(&self, session_id: Uuid) -> MongoResult<()> {
        let control = self.control_collection().await;
        control
            .delete_one(doc_id(session_id))
            .await
            .map_err(|source| MongoDaoError::RemoveSession { session_id, source })?;

        self.delete_participants(session_id)
            .await
            .map_err(|err| match err {
                MongoDaoError::RemoveParticipants { session_id, source } => {
                    MongoDaoError::RemoveSession { session_id, source }
                }
                other => other,
            })?;

        let history = self.history_collection().await;
        history
            .delete_many(doc! { "session_id": uuid_as_binary(session_id) })
            .await
            .map_err(|source| MongoDaoError::RemoveSession { session_id, source })?;
        Ok(())
    }
}

impl SessionStore for MongoSessionStore {
    fn get_control(
        &self,
        session_id: SessionId,
    ) -> BoxFuture<'static, StorageResult<Option<SessionControlEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_control(session_id).await })
    }

    fn set_control(
        &self,
        session_id: SessionId,
        control: SessionControlEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .save_control(session_id, control)
                .await
                .map_err(Into::into)
        })
    }

    fn get_participant(
        &self,
        session_id: SessionId,
        identity: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .load_participant(session_id, identity)
                .await
                .map_err(Into::into)
        })
    }

    fn set_participant(
        &self,
        session_id: SessionId,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .save_participant(session_id, participant)
                .await
                .map_err(Into::into)
        })
    }

    fn list_participants(
        &self,
        session_id: SessionId,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_participants(session_id).await.map_err(Into::into) })
    }

    fn remove_participants(
        &self,
        session_id: SessionId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_participants(session_id)
                .await
                .map_err(Into::into)
        })
    }

    fn append_buzz_record(
        &self,
        session_id: SessionId,
        record: BuzzRecordEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_buzz_record(session_id, record)
                .await
                .map_err(Into::into)
        })
    }

    fn list_recent_buzz_records(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<BuzzRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .load_recent_buzz_records(session_id, limit)
                .await
                .map_err(Into::into)
        })
    }

    fn remove_session(&self, session_id: SessionId) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete_session(session_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
