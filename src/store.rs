//! # MongoDB
//!
//! Document store for diagnosis records.
//!
//! - One collection, one document per successful analysis
//! - `_id` is an ObjectId assigned on insert; documents are never updated or deleted
//! - History is a full scan in natural order, no filter and no paging

use futures::{
    future::{BoxFuture, FutureExt},
    TryStreamExt,
};
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    Client, Collection,
};
use thiserror::Error;
use tracing::info;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    #[error("inserted id is not an ObjectId: {0}")]
    UnexpectedId(Bson),
}

pub trait DiagnosisStore: Send + Sync {
    /// Inserts one document and returns the id the store assigned to it.
    fn insert(&self, document: Document) -> BoxFuture<'_, Result<ObjectId, StoreError>>;

    /// Every stored document, including its `_id`.
    fn all(&self) -> BoxFuture<'_, Result<Vec<Document>, StoreError>>;
}

pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    pub async fn connect(config: &Config) -> Result<Self, mongodb::error::Error> {
        let client = Client::with_uri_str(&config.mongodb_uri).await?;
        let collection = client
            .database(&config.mongodb_database)
            .collection::<Document>(&config.mongodb_collection);

        info!(
            database = %config.mongodb_database,
            collection = %config.mongodb_collection,
            "MongoDB collection ready"
        );

        Ok(Self { collection })
    }

    async fn insert_document(&self, document: Document) -> Result<ObjectId, StoreError> {
        let outcome = self.collection.insert_one(document).await?;

        match outcome.inserted_id {
            Bson::ObjectId(id) => Ok(id),
            other => Err(StoreError::UnexpectedId(other)),
        }
    }

    async fn find_all(&self) -> Result<Vec<Document>, StoreError> {
        let cursor = self.collection.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }
}

impl DiagnosisStore for MongoStore {
    fn insert(&self, document: Document) -> BoxFuture<'_, Result<ObjectId, StoreError>> {
        self.insert_document(document).boxed()
    }

    fn all(&self) -> BoxFuture<'_, Result<Vec<Document>, StoreError>> {
        self.find_all().boxed()
    }
}
