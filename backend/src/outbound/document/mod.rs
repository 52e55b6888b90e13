//! MongoDB adapter for the document port.
//!
//! Transactions require a replica set or sharded cluster; standalone
//! servers reject `start_transaction`.

mod collection;
mod error_mapping;

use mongodb::{Client, Database};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::config::MongoSettings;
use crate::domain::ports::StoreError;

pub use collection::{MongoCollection, MongoSession, id_filter};
pub use error_mapping::map_mongo_error;

/// Handle on one MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoDatabase {
    client: Client,
    database: Database,
}

impl MongoDatabase {
    /// Connect using `settings`.
    ///
    /// The driver connects lazily; this only validates the connection string.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] or [`StoreError::Query`] when the
    /// connection string is rejected.
    pub async fn connect(settings: &MongoSettings) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(settings.connection_string())
            .await
            .map_err(map_mongo_error)?;
        info!(
            host = settings.host(),
            port = settings.port(),
            database = settings.database(),
            "mongodb client configured"
        );
        let database = client.database(settings.database());
        Ok(Self { client, database })
    }

    /// Typed accessor for the collection called `name`.
    ///
    /// `T` must serialise its id under `_id` as the hyphenated string that
    /// [`id_filter`] matches on, e.g. an [`EntityId`](crate::domain::EntityId)
    /// field with `#[serde(rename = "_id")]`.
    pub fn collection<T>(&self, name: &str) -> MongoCollection<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        MongoCollection::new(self.client.clone(), self.database.collection(name))
    }

    /// Database name.
    pub fn name(&self) -> &str {
        self.database.name()
    }
}
