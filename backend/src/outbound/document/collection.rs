//! MongoDB collection accessor and session.

use std::marker::PhantomData;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::{Client, ClientSession, Collection};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::ports::{DocumentCollection, DocumentSession, StoreError};
use crate::domain::{Entity, EntityId};

use super::error_mapping::map_mongo_error;

/// Filter matching the document stored under `id`.
///
/// Entities serialise their id as `_id`; [`EntityId`] is written as its
/// hyphenated string form.
pub fn id_filter(id: EntityId) -> Document {
    doc! { "_id": id.to_string() }
}

fn scoped(filter: Option<&Document>) -> Document {
    filter.cloned().unwrap_or_default()
}

/// Client session wrapping a driver [`ClientSession`].
///
/// The driver aborts an open transaction when the session is dropped.
pub struct MongoSession(ClientSession);

impl MongoSession {
    /// Borrow the driver session.
    pub fn inner_mut(&mut self) -> &mut ClientSession {
        &mut self.0
    }
}

#[async_trait]
impl DocumentSession for MongoSession {
    async fn start_transaction(&mut self) -> Result<(), StoreError> {
        self.0.start_transaction().await.map_err(map_mongo_error)
    }

    async fn commit_transaction(&mut self) -> Result<(), StoreError> {
        self.0.commit_transaction().await.map_err(map_mongo_error)
    }

    async fn abort_transaction(&mut self) -> Result<(), StoreError> {
        self.0.abort_transaction().await.map_err(map_mongo_error)
    }
}

/// Typed accessor for one named MongoDB collection.
///
/// `T` must serialise its [`Entity::id`] under `_id` as the hyphenated id
/// string (the default for an [`EntityId`] field renamed to `_id`). Lookups,
/// replaces and deletes filter with [`id_filter`]; a document keyed any other
/// way is never matched by them.
pub struct MongoCollection<T>
where
    T: Send + Sync,
{
    client: Client,
    inner: Collection<T>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for MongoCollection<T>
where
    T: Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            inner: self.inner.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> MongoCollection<T>
where
    T: Send + Sync,
{
    pub(super) fn new(client: Client, inner: Collection<T>) -> Self {
        Self {
            client,
            inner,
            _entity: PhantomData,
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }
}

#[async_trait]
impl<T> DocumentCollection<T> for MongoCollection<T>
where
    T: Entity + Serialize + DeserializeOwned + Unpin,
{
    type Filter = Document;
    type Session = MongoSession;

    async fn find_all(&self, filter: Option<&Self::Filter>) -> Result<Vec<T>, StoreError> {
        self.inner
            .find(scoped(filter))
            .sort(doc! { "_id": 1 })
            .await
            .map_err(map_mongo_error)?
            .try_collect()
            .await
            .map_err(map_mongo_error)
    }

    async fn find_one(&self, filter: &Self::Filter) -> Result<Option<T>, StoreError> {
        self.inner
            .find_one(filter.clone())
            .sort(doc! { "_id": 1 })
            .await
            .map_err(map_mongo_error)
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<T>, StoreError> {
        self.inner
            .find_one(id_filter(id))
            .await
            .map_err(map_mongo_error)
    }

    async fn count(&self, filter: Option<&Self::Filter>) -> Result<u64, StoreError> {
        self.inner
            .count_documents(scoped(filter))
            .await
            .map_err(map_mongo_error)
    }

    async fn find_page(
        &self,
        filter: Option<&Self::Filter>,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<T>, StoreError> {
        self.inner
            .find(scoped(filter))
            .sort(doc! { "_id": 1 })
            .skip(skip)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(map_mongo_error)?
            .try_collect()
            .await
            .map_err(map_mongo_error)
    }

    async fn insert_one(
        &self,
        entity: &T,
        session: Option<&mut Self::Session>,
    ) -> Result<(), StoreError> {
        let insert = self.inner.insert_one(entity);
        let outcome = match session {
            Some(session) => insert.session(session.inner_mut()).await,
            None => insert.await,
        };
        outcome.map(|_| ()).map_err(map_mongo_error)
    }

    async fn replace_one(
        &self,
        entity: &T,
        session: Option<&mut Self::Session>,
    ) -> Result<u64, StoreError> {
        let replace = self.inner.replace_one(id_filter(entity.id()), entity);
        let outcome = match session {
            Some(session) => replace.session(session.inner_mut()).await,
            None => replace.await,
        };
        outcome
            .map(|result| result.matched_count)
            .map_err(map_mongo_error)
    }

    async fn delete_one(&self, id: EntityId) -> Result<u64, StoreError> {
        self.inner
            .delete_one(id_filter(id))
            .await
            .map(|result| result.deleted_count)
            .map_err(map_mongo_error)
    }

    async fn start_session(&self) -> Result<Self::Session, StoreError> {
        self.client
            .start_session()
            .await
            .map(MongoSession)
            .map_err(map_mongo_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Card {
        #[serde(rename = "_id")]
        id: EntityId,
        title: String,
    }

    impl Entity for Card {
        fn id(&self) -> EntityId {
            self.id
        }
    }

    #[rstest]
    fn collection_handles_are_cloneable_document_stores() {
        fn document_store<C: DocumentCollection<Card> + Clone>() {}

        document_store::<MongoCollection<Card>>();
    }

    #[rstest]
    fn stored_documents_are_keyed_like_id_filter() {
        let card = Card {
            id: EntityId::random(),
            title: "draft".to_owned(),
        };

        let stored = mongodb::bson::to_document(&card).expect("card serialises");

        assert_eq!(stored.get("_id"), id_filter(card.id).get("_id"));
    }

    #[rstest]
    fn id_filter_targets_underscore_id() {
        let id = EntityId::random();

        let filter = id_filter(id);

        assert_eq!(filter.get_str("_id").ok(), Some(id.to_string().as_str()));
    }

    #[rstest]
    fn missing_filter_matches_everything() {
        assert!(scoped(None).is_empty());
        let only_open = doc! { "open": true };
        assert_eq!(scoped(Some(&only_open)), only_open);
    }
}
