//! Cloudinary request signing
//!
//! The signature is the SHA-1 hex digest of the signed parameters, sorted by
//! name and joined as `k=v&k=v`, with the API secret appended. `file`,
//! `api_key`, `cloud_name` and `resource_type` are never signed.

use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

/// Builder for signed upload parameters
#[derive(Debug, Default)]
pub struct Signer {
    params: BTreeMap<String, String>,
}

impl Signer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter; empty values are not signed
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.params.insert(key.into(), value);
        }
        self
    }

    /// The canonical `k=v&k=v` form, keys in ascending order
    pub fn string_to_sign(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn sign(&self, api_secret: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.string_to_sign().as_bytes());
        hasher.update(api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_sorted_and_empty_skipped() {
        let signer = Signer::new()
            .param("timestamp", "1315060510")
            .param("public_id", "sample")
            .param("folder", "");

        assert_eq!(signer.string_to_sign(), "public_id=sample&timestamp=1315060510");
    }

    #[test]
    fn test_documented_signature() {
        let signer = Signer::new()
            .param("timestamp", "1315060510")
            .param("public_id", "sample_image");

        assert_eq!(signer.sign("abcd"), "b4ad47fb4e25c7bf5f92a20089f9db59bc302313");
        assert_ne!(signer.sign("abce"), signer.sign("abcd"));
    }
}
