use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload of an assembly task.
///
/// Serialized into the task backend on submission and read back verbatim for
/// same-id retries, so it must stay self-contained: everything the worker
/// needs to concatenate the staged chunks and write the final object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssembleArgs {
    /// Destination bucket (public or private, decided at dispatch).
    pub bucket: String,
    /// Upload session whose staging directory holds the chunks.
    pub upload_id: Uuid,
    /// Number of chunks to concatenate, in index order `0..total_chunks`.
    pub total_chunks: u32,
    /// Object key within `bucket` for the assembled object.
    pub object_key: String,
    pub content_type: String,
}

impl AssembleArgs {
    pub fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(payload.clone())
    }
}
