//! MongoDB adapter for [`DocumentStore`].
//!
//! Pipelines and documents cross the boundary as `serde_json::Value` and
//! are converted to BSON via serde. Document ids round-trip as 24-hex
//! strings: an incoming `$match` on `_id` is coerced to an `ObjectId` when
//! it parses as one, and outgoing `ObjectId`s are flattened back to hex so
//! the engine never sees extended JSON.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Collection, Database};
use serde_json::Value;

use super::{DocumentStore, PermissionRecord, StoreError};
use crate::config::GatewayConfig;

/// Collection holding [`PermissionRecord`]s.
const PERMISSIONS_COLLECTION: &str = "user_permissions";

/// The production document store, backed by the MongoDB driver's pooled
/// client.
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Connect using the gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the connection string cannot
    /// be parsed or the client cannot be constructed.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(&config.database_host)
            .await
            .map_err(database_error)?;

        if !config.database_auth.username.is_empty() {
            options.credential = Some(
                Credential::builder()
                    .username(config.database_auth.username.clone())
                    .password(config.database_auth.password.clone())
                    .source(config.database_auth.source.clone())
                    .build(),
            );
        }

        let client = Client::with_options(options).map_err(database_error)?;
        Ok(Self {
            database: client.database(&config.database_name),
        })
    }

    fn collection(&self, resource: &str) -> Collection<Document> {
        self.database.collection(resource)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn aggregate(
        &self,
        resource: &str,
        pipeline: Vec<Value>,
    ) -> Result<Vec<Value>, StoreError> {
        let mut stages = Vec::with_capacity(pipeline.len());
        for stage in &pipeline {
            let mut stage = mongodb::bson::to_document(stage).map_err(database_error)?;
            coerce_id_match(&mut stage);
            stages.push(stage);
        }

        let mut cursor = self
            .collection(resource)
            .aggregate(stages)
            .await
            .map_err(database_error)?;

        let mut results = Vec::new();
        while let Some(document) = cursor.try_next().await.map_err(database_error)? {
            let mut value = serde_json::to_value(&document).map_err(database_error)?;
            flatten_object_ids(&mut value);
            results.push(value);
        }
        Ok(results)
    }

    async fn insert(&self, resource: &str, document: Value) -> Result<String, StoreError> {
        let document = mongodb::bson::to_document(&document).map_err(database_error)?;
        let outcome = self
            .collection(resource)
            .insert_one(document)
            .await
            .map_err(database_error)?;

        Ok(match outcome.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        })
    }

    async fn update(&self, resource: &str, id: &str, changes: &Value) -> Result<(), StoreError> {
        let changes = mongodb::bson::to_document(changes).map_err(database_error)?;
        self.collection(resource)
            .update_one(id_filter(id), doc! {"$set": changes})
            .await
            .map_err(database_error)?;
        Ok(())
    }

    async fn delete(&self, resource: &str, id: &str) -> Result<(), StoreError> {
        self.collection(resource)
            .delete_one(id_filter(id))
            .await
            .map_err(database_error)?;
        Ok(())
    }

    async fn permissions(
        &self,
        username: &str,
    ) -> Result<Option<PermissionRecord>, StoreError> {
        let found = self
            .collection(PERMISSIONS_COLLECTION)
            .find_one(doc! {"username": username})
            .await
            .map_err(database_error)?;

        let Some(document) = found else {
            return Ok(None);
        };
        let record = mongodb::bson::from_document(document).map_err(database_error)?;
        Ok(Some(record))
    }
}

fn database_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::Database(err.to_string())
}

/// Filter on `_id`, as an `ObjectId` when the id parses as one.
fn id_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! {"_id": oid},
        Err(_) => doc! {"_id": id},
    }
}

/// Coerce a string `_id` constraint in a `$match` stage to an `ObjectId`.
///
/// The rewriter and probe builder speak hex strings; the collection stores
/// `ObjectId`s. Non-hex constraints (and the `$exists` wildcard document)
/// pass through untouched.
fn coerce_id_match(stage: &mut Document) {
    let Ok(constraints) = stage.get_document_mut("$match") else {
        return;
    };
    let id = match constraints.get_str("_id") {
        Ok(id) => id.to_string(),
        Err(_) => return,
    };
    if let Ok(oid) = ObjectId::parse_str(&id) {
        constraints.insert("_id", oid);
    }
}

/// Replace `{"$oid": "..."}` extended-JSON objects with their hex string.
fn flatten_object_ids(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(hex)) = map.get("$oid") {
                    *value = Value::String(hex.clone());
                    return;
                }
            }
            for entry in map.values_mut() {
                flatten_object_ids(entry);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten_object_ids(item);
            }
        }
        _ => {}
    }
}
