//! The attachment side-channel.
//!
//! On create/patch, each string in the body's `attachments.documents` array
//! is treated as a blob key and gets a presigned upload URL; on read, the
//! `attachments` field of each surviving document is replaced with the
//! decoded blob contents. The whole channel is behind a configuration flag
//! and runs strictly after redaction on the read side, so pruned sub-trees
//! never leak URLs or contents.

use serde_json::Value;

use crate::config::AttachmentMode;
use crate::context::RequestContext;
use crate::store::BlobStore;
use crate::Result;

/// JSON pointer to the attachment key array inside a document.
const DOCUMENTS_POINTER: &str = "/attachments/documents";

/// Mint a presigned upload URL for every attachment key declared in the
/// write body, stashing the URLs on the request context.
///
/// Pass-through when the side-channel is disabled or no keys are declared.
/// Non-string entries are skipped.
///
/// # Errors
///
/// Propagates [`StoreError`](crate::store::StoreError) from the blob
/// service unchanged.
pub async fn presign_uploads(
    blobs: &dyn BlobStore,
    ctx: &mut RequestContext,
    body: &Value,
    mode: AttachmentMode,
) -> Result<()> {
    if !mode.is_enabled() {
        return Ok(());
    }
    let Some(keys) = body.pointer(DOCUMENTS_POINTER).and_then(Value::as_array) else {
        return Ok(());
    };

    for key in keys {
        let Some(key) = key.as_str() else {
            continue;
        };
        ctx.attachment_urls.push(blobs.presign_put(key).await?);
    }

    if !ctx.attachment_urls.is_empty() {
        tracing::info!(count = ctx.attachment_urls.len(), "minted upload urls");
    }
    Ok(())
}

/// Replace each surviving document's `attachments` field with the decoded
/// contents of its declared blobs.
///
/// Runs after redaction. Documents without an `attachments.documents`
/// array are left untouched. A blob fetch failure logs once and leaves
/// that document's attachments as stored; the read still succeeds.
pub async fn inline_attachment_data(
    blobs: &dyn BlobStore,
    documents: &mut [Value],
    mode: AttachmentMode,
) {
    if !mode.is_enabled() {
        return;
    }

    for document in documents {
        let Some(keys) = document.pointer(DOCUMENTS_POINTER).and_then(Value::as_array) else {
            continue;
        };
        let keys: Vec<String> = keys
            .iter()
            .filter_map(Value::as_str)
            .map(ToString::to_string)
            .collect();

        let mut contents = Vec::with_capacity(keys.len());
        let mut fetched_all = true;
        for key in &keys {
            match blobs.fetch(key).await {
                Ok(bytes) => contents.push(Value::String(decode_blob(&bytes))),
                Err(err) => {
                    tracing::error!(%key, error = %err, "attachment fetch failed");
                    fetched_all = false;
                    break;
                }
            }
        }

        if fetched_all {
            document["attachments"] = Value::Array(contents);
        }
    }
}

/// Decode blob bytes for the response: UTF-8 first, then base64 (whose
/// decoded bytes must themselves be UTF-8), then a lossy rendering.
fn decode_blob(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    use base64::prelude::{Engine as _, BASE64_STANDARD};
    if let Ok(decoded) = BASE64_STANDARD.decode(bytes) {
        if let Ok(text) = String::from_utf8(decoded) {
            return text;
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}
