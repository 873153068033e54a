//! OpenAPI documentation.
//! API version is in `crate::constants::API_VERSION`.
//! Paths in handler annotations use placeholder /api/v0; they are transformed at runtime to the actual version.

use utoipa::OpenApi;

use crate::constants::API_VERSION;
use crate::error;
use crate::handlers;

/// Placeholder version used in handler path annotations (utoipa requires compile-time literals).
/// Replaced at runtime in the served OpenAPI spec with API_VERSION.
const OPENAPI_PATH_PLACEHOLDER: &str = "/api/v0";

/// Transforms path keys in the OpenAPI spec from placeholder to actual API version.
fn transform_openapi_paths(spec: &mut utoipa::openapi::OpenApi, version: &str) {
    let replacement = format!("/api/{}", version);
    if OPENAPI_PATH_PLACEHOLDER == replacement {
        return;
    }
    let path_map = std::mem::take(&mut spec.paths.paths);
    for (key, item) in path_map {
        let new_key = key.replacen(OPENAPI_PATH_PLACEHOLDER, &replacement, 1);
        spec.paths.paths.insert(new_key, item);
    }
}

/// Returns the OpenAPI spec with path placeholders replaced by the current API version.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();
    transform_openapi_paths(&mut spec, API_VERSION);
    spec
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Depot API",
        version = "0.1.0",
        description = "Resumable chunked-upload pipeline (v0): session initialization, chunk staging, asynchronous assembly into object storage, task status tracking, retry, and credential-gated download links. All endpoints are versioned under /api/v0/."
    ),
    paths(
        // Uploads
        handlers::uploads::init_upload,
        handlers::uploads::upload_chunk,
        handlers::uploads::complete_upload,
        // Files
        handlers::files::get_file,
        handlers::files::get_status,
        handlers::files::retry_file,
        handlers::files::delete_file,
        handlers::files::list_files,
        // Objects
        handlers::objects::serve_object,
    ),
    components(
        schemas(
            handlers::uploads::InitUploadResponse,
            handlers::uploads::ChunkAck,
            handlers::uploads::CompleteUploadRequest,
            handlers::files::FileResponse,
            handlers::files::StatusResponse,
            handlers::files::RetryRequest,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "uploads", description = "Chunked upload sessions: init, chunk staging, completion"),
        (name = "files", description = "File metadata, assembly status, retry, and deletion"),
        (name = "objects", description = "Object serving for the local storage backend")
    )
)]
pub struct ApiDoc;
