//! Object serving for the local storage backend.
//!
//! Public-bucket objects are served directly; private-bucket objects require
//! the signed query issued by the presigned-URL path, verified with the same
//! signer that produced it. With an S3-compatible backend these routes are
//! not mounted, since the provider serves objects itself.

use axum::{
    extract::{Path, RawQuery, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::HttpAppError;
use crate::state::AppState;
use depot_core::AppError;
use depot_storage::Storage;

/// Decode `a=1&b=2` into ordered pairs; signature verification depends on
/// URL order being preserved.
fn parse_query_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| {
            (
                urlencoding::decode(k).map(|s| s.into_owned()).unwrap_or_else(|_| k.to_string()),
                urlencoding::decode(v).map(|s| s.into_owned()).unwrap_or_else(|_| v.to_string()),
            )
        })
        .collect()
}

/// Serve one stored object
#[utoipa::path(
    get,
    path = "/objects/{bucket}/{key}",
    tag = "objects",
    params(
        ("bucket" = String, Path, description = "Bucket name"),
        ("key" = String, Path, description = "Object key")
    ),
    responses(
        (status = 200, description = "Object bytes"),
        (status = 403, description = "Missing, invalid, or expired signature"),
        (status = 404, description = "Object not found")
    )
)]
pub async fn serve_object(
    State(state): State<Arc<AppState>>,
    Path((bucket, key)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Result<Response, HttpAppError> {
    let local = state.local.as_ref().ok_or_else(|| {
        AppError::NotFound("Object serving is only available on the local backend".to_string())
    })?;

    if bucket == state.config.private_bucket {
        let pairs = parse_query_pairs(query.as_deref().unwrap_or(""));
        local.signer().verify(&bucket, &key, &pairs)?;
    }

    let data = local.get(&bucket, &key).await?;

    // Content type is not persisted by the local backend.
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        data,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_pairs_preserves_order_and_decodes() {
        let pairs = parse_query_pairs("expires=99&who=alice%20b&signature=ab");
        assert_eq!(
            pairs,
            vec![
                ("expires".to_string(), "99".to_string()),
                ("who".to_string(), "alice b".to_string()),
                ("signature".to_string(), "ab".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_query_pairs_skips_bare_keys() {
        assert_eq!(parse_query_pairs("flag&a=1").len(), 1);
        assert!(parse_query_pairs("").is_empty());
    }
}
