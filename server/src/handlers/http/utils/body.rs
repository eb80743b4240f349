//! Request body helpers.  Bodies are capped at [`MAX_BODY_BYTES`].

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Body;
use serde::de::DeserializeOwned;
use tracing::debug;

pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Collect the whole body, failing when it exceeds [`MAX_BODY_BYTES`].
pub async fn read_body<B>(body: B) -> Result<Bytes>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let collected = Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| anyhow!("Failed to read request body: {}", e))?;

    let bytes = collected.to_bytes();
    debug!("Read request body: {} bytes", bytes.len());
    Ok(bytes)
}

/// Read and deserialize a JSON body.  `None` on any read or parse failure.
pub async fn read_json<T, B>(body: B) -> Option<T>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = read_body(body).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Rejected JSON body: {}", e);
            None
        }
    }
}

/// Read an `application/x-www-form-urlencoded` body into a map.
pub async fn read_form<B>(body: B) -> Result<HashMap<String, String>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = read_body(body).await?;
    Ok(form_urlencoded::parse(bytes.as_ref())
        .into_owned()
        .collect::<HashMap<String, String>>())
}
