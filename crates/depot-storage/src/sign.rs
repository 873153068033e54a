//! HMAC signer for local-backend download URLs.
//!
//! Canonical string: `bucket \n key \n expires \n k1=v1&k2=v2` with the extra
//! parameters in the order they will appear on the URL. Signature =
//! hex(HMAC-SHA256(secret, canonical)). The query carries `expires`, the
//! extra parameters, and `signature` last.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::traits::{StorageError, StorageResult};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
}

impl UrlSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn canonical(bucket: &str, key: &str, expires: u64, extra_query: &[(String, String)]) -> String {
        let extras = extra_query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}\n{}\n{}\n{}", bucket, key, expires, extras)
    }

    fn tag(&self, canonical: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(canonical.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Build the signed query string for `bucket/key` expiring `expires_in`
    /// from now.
    pub fn signed_query(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        extra_query: &[(String, String)],
    ) -> String {
        let expires = SystemTime::now()
            .checked_add(expires_in)
            .unwrap_or(SystemTime::UNIX_EPOCH)
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.signed_query_at(bucket, key, expires, extra_query)
    }

    fn signed_query_at(
        &self,
        bucket: &str,
        key: &str,
        expires: u64,
        extra_query: &[(String, String)],
    ) -> String {
        let signature = self.tag(&Self::canonical(bucket, key, expires, extra_query));

        let mut query = format!("expires={}", expires);
        for (k, v) in extra_query {
            query.push('&');
            query.push_str(&urlencoding::encode(k));
            query.push('=');
            query.push_str(&urlencoding::encode(v));
        }
        query.push_str("&signature=");
        query.push_str(&signature);
        query
    }

    /// Verify a previously issued query. `query_pairs` are the decoded
    /// key-value pairs in URL order, including `expires` and `signature`.
    pub fn verify(
        &self,
        bucket: &str,
        key: &str,
        query_pairs: &[(String, String)],
    ) -> StorageResult<()> {
        let expires = query_pairs
            .iter()
            .find(|(k, _)| k == "expires")
            .and_then(|(_, v)| v.parse::<u64>().ok())
            .ok_or_else(|| {
                StorageError::InvalidSignature("missing or malformed expires".to_string())
            })?;
        let signature = query_pairs
            .iter()
            .find(|(k, _)| k == "signature")
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| StorageError::InvalidSignature("missing signature".to_string()))?;

        let extras: Vec<(String, String)> = query_pairs
            .iter()
            .filter(|(k, _)| k != "expires" && k != "signature")
            .cloned()
            .collect();

        let tag = hex::decode(signature)
            .map_err(|_| StorageError::InvalidSignature("malformed signature".to_string()))?;
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(Self::canonical(bucket, key, expires, &extras).as_bytes());
        mac.verify_slice(&tag)
            .map_err(|_| StorageError::InvalidSignature("signature mismatch".to_string()))?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        if now > expires {
            return Err(StorageError::InvalidSignature("URL expired".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(query: &str) -> Vec<(String, String)> {
        query
            .split('&')
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| {
                (
                    urlencoding::decode(k).unwrap().into_owned(),
                    urlencoding::decode(v).unwrap().into_owned(),
                )
            })
            .collect()
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = UrlSigner::new("secret");
        let extras = vec![("pin".to_string(), "1234".to_string())];
        let query = signer.signed_query("private", "a.pdf", Duration::from_secs(60), &extras);

        assert!(query.starts_with("expires="));
        assert!(query.contains("pin=1234"));
        assert!(signer.verify("private", "a.pdf", &pairs(&query)).is_ok());
    }

    #[test]
    fn test_verify_rejects_tampered_params() {
        let signer = UrlSigner::new("secret");
        let extras = vec![("pin".to_string(), "1234".to_string())];
        let query = signer.signed_query("private", "a.pdf", Duration::from_secs(60), &extras);

        let tampered = query.replace("pin=1234", "pin=9999");
        assert!(signer.verify("private", "a.pdf", &pairs(&tampered)).is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_object() {
        let signer = UrlSigner::new("secret");
        let query = signer.signed_query("private", "a.pdf", Duration::from_secs(60), &[]);
        assert!(signer.verify("private", "b.pdf", &pairs(&query)).is_err());
    }

    #[test]
    fn test_verify_rejects_expired() {
        let signer = UrlSigner::new("secret");
        // Correctly signed, but with an expiry far in the past
        let query = signer.signed_query_at("private", "a.pdf", 1, &[]);
        assert!(signer.verify("private", "a.pdf", &pairs(&query)).is_err());
    }

    #[test]
    fn test_different_secret_fails() {
        let signer = UrlSigner::new("secret");
        let other = UrlSigner::new("other");
        let query = signer.signed_query("public", "a.pdf", Duration::from_secs(60), &[]);
        assert!(other.verify("public", "a.pdf", &pairs(&query)).is_err());
    }
}
