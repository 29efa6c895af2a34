//! Shared fixtures for the integration tests: an in-memory document store
//! that evaluates the gateway's aggregation stages, an in-memory blob
//! store, and the signature-resource fixture data the scenarios run
//! against.

#![allow(dead_code)] // each test binary uses a different slice of this module

pub mod agg;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use http::{Request, StatusCode};
use palisade::store::{BlobStore, DocumentStore, PermissionRecord, StoreError};
use palisade::{AttachmentMode, GatewayState};
use serde_json::{json, Value};
use tower::ServiceExt;

/// In-memory [`DocumentStore`] evaluating the stage subset the gateway
/// emits. Stands in for the database-backed store in tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    collections: BTreeMap<String, Vec<Value>>,
    permissions: BTreeMap<String, PermissionRecord>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a permission record for a subject.
    pub fn grant(&self, username: &str, cats: &[&str], diss: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.permissions.insert(
            username.to_string(),
            PermissionRecord {
                username: username.to_string(),
                cat: cats.iter().map(ToString::to_string).collect(),
                diss: diss.iter().map(ToString::to_string).collect(),
            },
        );
    }

    /// Insert fixture documents, assigning ids; returns the ids.
    pub fn seed(&self, resource: &str, documents: Vec<Value>) -> Vec<String> {
        let mut state = self.state.lock().unwrap();
        let mut ids = Vec::with_capacity(documents.len());
        for mut document in documents {
            state.next_id += 1;
            let id = format!("{:024x}", state.next_id);
            document["_id"] = Value::String(id.clone());
            state
                .collections
                .entry(resource.to_string())
                .or_default()
                .push(document);
            ids.push(id);
        }
        ids
    }

    /// Raw stored document by id, bypassing all enforcement.
    pub fn document(&self, resource: &str, id: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(resource)?
            .iter()
            .find(|doc| doc["_id"] == *id)
            .cloned()
    }

    /// Id of the fixture document whose `name` field matches.
    pub fn id_for_name(&self, resource: &str, name: &str) -> String {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(resource)
            .and_then(|docs| docs.iter().find(|doc| doc["name"] == *name))
            .and_then(|doc| doc["_id"].as_str())
            .map(ToString::to_string)
            .unwrap_or_else(|| panic!("no fixture named {name}"))
    }

    /// Raw stored document by `name`, bypassing all enforcement.
    pub fn document_by_name(&self, resource: &str, name: &str) -> Value {
        let id = self.id_for_name(resource, name);
        self.document(resource, &id)
            .unwrap_or_else(|| panic!("no document for {name}"))
    }

    pub fn count(&self, resource: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.collections.get(resource).map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn aggregate(
        &self,
        resource: &str,
        pipeline: Vec<Value>,
    ) -> Result<Vec<Value>, StoreError> {
        let documents = {
            let state = self.state.lock().unwrap();
            state.collections.get(resource).cloned().unwrap_or_default()
        };
        Ok(agg::run(documents, &pipeline))
    }

    async fn insert(&self, resource: &str, document: Value) -> Result<String, StoreError> {
        Ok(self.seed(resource, vec![document]).remove(0))
    }

    async fn update(&self, resource: &str, id: &str, changes: &Value) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let Some(documents) = state.collections.get_mut(resource) else {
            return Ok(());
        };
        let Some(document) = documents.iter_mut().find(|doc| doc["_id"] == *id) else {
            return Ok(());
        };
        if let Some(changes) = changes.as_object() {
            for (field, value) in changes {
                document[field] = value.clone();
            }
        }
        Ok(())
    }

    async fn delete(&self, resource: &str, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(documents) = state.collections.get_mut(resource) {
            documents.retain(|doc| doc["_id"] != *id);
        }
        Ok(())
    }

    async fn permissions(
        &self,
        username: &str,
    ) -> Result<Option<PermissionRecord>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.permissions.get(username).cloned())
    }
}

/// In-memory [`BlobStore`].
#[derive(Default)]
pub struct MemoryBlobs {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn presign_put(&self, key: &str) -> Result<String, StoreError> {
        Ok(format!(
            "https://blobs.test.invalid/attachments/{key}?X-Signature=fixture",
        ))
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::Blob(format!("no such key: {key}")))
    }
}

// ---------------------------------------------------------------------------
// Fixture data
// ---------------------------------------------------------------------------

pub const US_CITIZEN_DISS: &[&str] = &["usg_noforn", "usg_relfvey", "usg_relgbr"];
pub const GBR_CITIZEN_DISS: &[&str] = &["usg_relfvey", "usg_relgbr"];
pub const CAN_CITIZEN_DISS: &[&str] = &["usg_relfvey"];

fn sec_shape() -> Value {
    json!({
        "type": "dict",
        "schema": {
            "cat": {"type": "string"},
            "diss": {"type": "list", "schema": {"type": "string"}},
        },
    })
}

/// Schema catalog for the `signature` resource used across the scenarios.
pub fn signature_catalog() -> Value {
    json!({
        "signature": {
            "name": {"type": "string"},
            "date": {"type": "string"},
            "user_ref_id": {"type": "string"},
            "field_ref_id": {"type": "string"},
            "signature": {
                "type": "dict",
                "schema": {"value": {"type": "string"}, "_sec": sec_shape()},
            },
            "attachments": {
                "type": "dict",
                "schema": {"documents": {"type": "list"}, "_sec": sec_shape()},
            },
            "_sec": sec_shape(),
        },
        "fees": {
            "FeeID": {"type": "string"},
            "FeeAmount": {"type": "string"},
            "attachments": {
                "type": "dict",
                "schema": {"documents": {"type": "list"}, "_sec": sec_shape()},
            },
            "_sec": sec_shape(),
        },
    })
}

fn sec(cat: &str, diss: &[&str]) -> Value {
    json!({"cat": cat, "diss": diss})
}

/// Seed the `signature` collection with the standard scenario documents.
pub fn seed_signatures(store: &MemoryStore) {
    store.seed(
        "signature",
        vec![
            json!({
                "name": "all_unclassified",
                "user_ref_id": "user-1",
                "signature": {"value": "sig-1", "_sec": sec("usg_unclassified", &[])},
                "_sec": sec("usg_unclassified", &[]),
            }),
            json!({
                "name": "doc_confidential",
                "user_ref_id": "user-2",
                "signature": {"value": "sig-2", "_sec": sec("usg_unclassified", &[])},
                "_sec": sec("usg_confidential", &[]),
            }),
            json!({
                "name": "sig_confidential",
                "user_ref_id": "user-3",
                "signature": {"value": "sig-3", "_sec": sec("usg_confidential", &[])},
                "_sec": sec("usg_unclassified", &[]),
            }),
            json!({
                "name": "sig_diss_controlled",
                "user_ref_id": "user-4",
                "signature": {"value": "sig-4", "_sec": sec("usg_unclassified", &["usg_noforn"])},
                "_sec": sec("usg_unclassified", &[]),
            }),
        ],
    );
}

/// Register the standard scenario subjects.
pub fn seed_users(store: &MemoryStore) {
    store.grant("us_unclassified_only", &["usg_unclassified"], US_CITIZEN_DISS);
    store.grant(
        "us_secret_cumul",
        &["usg_unclassified", "usg_confidential", "usg_secret"],
        US_CITIZEN_DISS,
    );
    store.grant(
        "can_topsecret_cumul",
        &[
            "usg_unclassified",
            "usg_confidential",
            "usg_secret",
            "usg_topsecret",
        ],
        CAN_CITIZEN_DISS,
    );
    store.grant("us_unclassified_no_diss", &["usg_unclassified"], &[]);
}

/// Assemble a gateway router over fresh in-memory stores.
pub fn gateway(
    attachment_mode: AttachmentMode,
) -> (Router, Arc<MemoryStore>, Arc<MemoryBlobs>) {
    let store = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryBlobs::new());
    let registry = palisade_core::SchemaRegistry::from_catalog(&signature_catalog());
    let state = Arc::new(GatewayState::new(
        registry,
        store.clone(),
        blobs.clone(),
        attachment_mode,
    ));
    (palisade::routes::router(state), store, blobs)
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Standard headers: Basic authorization (password `password`) and JSON
/// content type.
pub fn basic_auth(username: &str) -> String {
    let encoded = BASE64_STANDARD.encode(format!("{username}:password"));
    format!("Basic {encoded}")
}

/// Drive one request through the router; returns status and parsed body
/// (`Value::Null` for empty bodies).
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<&Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header("authorization", basic_auth(user));
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Assert every returned item's root category is in the allowed list.
pub fn assert_cat_list(items: &[Value], allowed: &[&str]) {
    for item in items {
        let cat = item["_sec"]["cat"].as_str().unwrap();
        assert!(
            allowed.contains(&cat),
            "received document with forbidden security category: {cat}",
        );
    }
}

/// Assert every returned item's dissemination set is a subset of the
/// allowed list.
pub fn assert_diss_list(items: &[Value], allowed: &[&str]) {
    for item in items {
        let diss = item["_sec"]["diss"].as_array().unwrap();
        for token in diss {
            let token = token.as_str().unwrap();
            assert!(
                allowed.contains(&token),
                "received document with forbidden distribution rule: {token}",
            );
        }
    }
}
