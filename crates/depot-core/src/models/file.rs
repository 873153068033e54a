use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque ordered key-value map carried on a file record.
///
/// Used for both the access credential and the pass-through detail payload.
/// Values are arbitrary JSON primitives; ordering is stable (BTreeMap) so
/// exact-equality checks and signed query parameters are deterministic.
pub type MetaMap = std::collections::BTreeMap<String, serde_json::Value>;

/// Durable record of a completed (or in-flight) chunked upload.
///
/// Created synchronously when assembly is dispatched, before the object
/// exists; `path` is reserved deterministically from the upload id so the
/// record stays valid while the task is still running.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub id: Uuid,
    /// Upload session token. Unique: at most one record per session.
    pub upload_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    /// `bucket/object_key` composite locating the stored object.
    pub path: String,
    /// Non-empty credential marks the object as access-gated (private bucket).
    pub credential: Option<MetaMap>,
    /// Opaque caller metadata, passed through unchanged.
    pub detail: Option<MetaMap>,
    /// Assembly task that produced (or will produce) the object.
    pub task_id: Uuid,
    /// Externally-owned grouping entity.
    pub appointment_id: String,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Bucket component of `path`.
    pub fn bucket(&self) -> &str {
        self.path.split('/').next().unwrap_or_default()
    }

    /// Object key component of `path` (everything after the bucket).
    pub fn object_key(&self) -> &str {
        match self.path.split_once('/') {
            Some((_, key)) => key,
            None => "",
        }
    }

    /// Whether access to this file requires an exactly-matching credential.
    pub fn is_gated(&self) -> bool {
        self.credential.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// Fields for creating a new file record. The repository assigns `id` and
/// `created_at`.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub upload_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub path: String,
    pub credential: Option<MetaMap>,
    pub detail: Option<MetaMap>,
    pub task_id: Uuid,
    pub appointment_id: String,
}

/// Coerce a credential map into string query parameters for URL signing.
///
/// Presigned-URL query parameters must be strings; JSON strings are used
/// verbatim (no surrounding quotes), other primitives via their JSON text.
pub fn credential_query_params(credential: &MetaMap) -> Vec<(String, String)> {
    credential
        .iter()
        .map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(path: &str, credential: Option<MetaMap>) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            upload_id: Uuid::new_v4(),
            filename: "report.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size: 42,
            path: path.to_string(),
            credential,
            detail: None,
            task_id: Uuid::new_v4(),
            appointment_id: "appt-1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_path_components() {
        let r = record("private/abc.pdf", None);
        assert_eq!(r.bucket(), "private");
        assert_eq!(r.object_key(), "abc.pdf");

        // Object keys may themselves contain slashes
        let r = record("public/nested/key.bin", None);
        assert_eq!(r.bucket(), "public");
        assert_eq!(r.object_key(), "nested/key.bin");
    }

    #[test]
    fn test_gated_requires_non_empty_credential() {
        assert!(!record("public/a", None).is_gated());
        assert!(!record("public/a", Some(MetaMap::new())).is_gated());

        let mut cred = MetaMap::new();
        cred.insert("pin".to_string(), json!("1234"));
        assert!(record("private/a", Some(cred)).is_gated());
    }

    #[test]
    fn test_credential_query_params_coercion() {
        let mut cred = MetaMap::new();
        cred.insert("pin".to_string(), json!(1234));
        cred.insert("who".to_string(), json!("alice"));
        cred.insert("vip".to_string(), json!(true));

        let params = credential_query_params(&cred);
        assert_eq!(
            params,
            vec![
                ("pin".to_string(), "1234".to_string()),
                ("vip".to_string(), "true".to_string()),
                ("who".to_string(), "alice".to_string()),
            ]
        );
    }
}
