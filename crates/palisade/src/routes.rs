//! The HTTP surface: one read endpoint and three write endpoints per
//! resource.
//!
//! - `GET /{R}` (optionally `?aggregate={"$id": "<oid>"}`) — read path.
//! - `POST /{R}_write` — create.
//! - `PATCH /{R}_write/{id}` — patch.
//! - `DELETE /{R}_write/{id}` — delete.
//!
//! Handlers run the middleware chain explicitly: admission → rewrite →
//! executor → post-filter, with the request context passed positionally.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::GatewayState;
use crate::write::WriteOp;
use crate::{attachments, auth, read, write, Error, RequestContext, Result};

/// Suffix distinguishing write endpoints from read endpoints.
const WRITE_SUFFIX: &str = "_write";

/// Build the gateway router.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/{resource}", get(read_collection).post(create))
        .route(
            "/{resource}/{id}",
            axum::routing::patch(update).delete(remove),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ReadQuery {
    aggregate: Option<String>,
}

/// Base plan for a read: a match on `_id`, bound from the `aggregate`
/// query or left as the `"$id"` placeholder for the wildcarding stage.
fn base_pipeline(aggregate: Option<&str>) -> Result<Vec<Value>> {
    let id = match aggregate {
        None => Value::String("$id".to_string()),
        Some(text) => {
            let spec: Value = serde_json::from_str(text)
                .map_err(|err| Error::BodyMalformed(format!("aggregate query: {err}")))?;
            spec.get("$id")
                .cloned()
                .unwrap_or_else(|| Value::String("$id".to_string()))
        }
    };
    Ok(vec![json!({"$match": {"_id": id}})])
}

fn parse_body(bytes: &Bytes) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(|err| Error::BodyMalformed(err.to_string()))
}

async fn read_collection(
    State(state): State<Arc<GatewayState>>,
    Path(resource): Path<String>,
    Query(query): Query<ReadQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let principal = auth::authenticate(state.store.as_ref(), &headers).await?;
    if resource.ends_with(WRITE_SUFFIX) {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    let mut pipeline = base_pipeline(query.aggregate.as_deref())?;
    read::before_aggregation(&state.registry, &principal, &resource, &mut pipeline);

    let mut items = state.store.aggregate(&resource, pipeline).await?;
    attachments::inline_attachment_data(state.blobs.as_ref(), &mut items, state.attachment_mode)
        .await;

    Ok(Json(json!({"_items": items})).into_response())
}

async fn create(
    State(state): State<Arc<GatewayState>>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<Response> {
    let principal = auth::authenticate(state.store.as_ref(), &headers).await?;
    let Some(target) = resource.strip_suffix(WRITE_SUFFIX) else {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    };

    let body = parse_body(&bytes)?;
    let mut ctx = RequestContext::new(principal);

    write::collect_body_labels(&mut ctx, &state.registry, target, &body)?;
    write::admit_body_labels(&ctx)?;
    attachments::presign_uploads(
        state.blobs.as_ref(),
        &mut ctx,
        &body,
        state.attachment_mode,
    )
    .await?;

    let id = state.store.insert(target, body).await?;
    tracing::info!(resource = target, %id, "document created");

    let mut envelope = json!({"_status": "OK", "_id": id});
    if !ctx.attachment_urls.is_empty() {
        envelope["_presigned_urls"] = json!(ctx.attachment_urls);
    }
    Ok((StatusCode::CREATED, Json(envelope)).into_response())
}

async fn update(
    State(state): State<Arc<GatewayState>>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<Response> {
    let principal = auth::authenticate(state.store.as_ref(), &headers).await?;
    let Some(target) = resource.strip_suffix(WRITE_SUFFIX) else {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    };

    let body = parse_body(&bytes)?;
    let mut ctx = RequestContext::new(principal);

    write::collect_body_labels(&mut ctx, &state.registry, target, &body)?;
    write::admit_body_labels(&ctx)?;
    write::admit_stored(
        state.store.as_ref(),
        &state.registry,
        &ctx.principal,
        target,
        &id,
        WriteOp::Patch { body: &body },
    )
    .await?;
    attachments::presign_uploads(
        state.blobs.as_ref(),
        &mut ctx,
        &body,
        state.attachment_mode,
    )
    .await?;

    state.store.update(target, &id, &body).await?;
    tracing::info!(resource = target, %id, "document patched");

    let mut envelope = json!({"_status": "OK"});
    if !ctx.attachment_urls.is_empty() {
        envelope["_presigned_urls"] = json!(ctx.attachment_urls);
    }
    Ok(Json(envelope).into_response())
}

async fn remove(
    State(state): State<Arc<GatewayState>>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response> {
    let principal = auth::authenticate(state.store.as_ref(), &headers).await?;
    let Some(target) = resource.strip_suffix(WRITE_SUFFIX) else {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    };

    write::admit_stored(
        state.store.as_ref(),
        &state.registry,
        &principal,
        target,
        &id,
        WriteOp::Delete,
    )
    .await?;

    state.store.delete(target, &id).await?;
    tracing::info!(resource = target, %id, "document deleted");

    Ok(StatusCode::NO_CONTENT.into_response())
}
