//! Credential encryption.
//!
//! Credentials travel as Fernet tokens over their JSON encoding, so a caller
//! can persist them without ever holding plaintext.

use fernet::Fernet;

use crate::error::{ConnectorError, Result};
use crate::traits::Credentials;

/// Symmetric cipher for credential maps.
pub struct CredentialCipher {
    fernet: Fernet,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}

impl CredentialCipher {
    /// Build a cipher from a URL-safe base64 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the key is malformed.
    pub fn new(key: &str) -> Result<Self> {
        let fernet = Fernet::new(key.trim())
            .ok_or_else(|| ConnectorError::Config("invalid fernet key".to_string()))?;
        Ok(Self { fernet })
    }

    /// Generate a fresh key suitable for `new`.
    pub fn generate_key() -> String {
        Fernet::generate_key()
    }

    /// Encrypt a credential map into a token.
    pub fn encrypt(&self, credentials: &Credentials) -> Result<String> {
        let plaintext = serde_json::to_vec(credentials)
            .map_err(|e| ConnectorError::Config(format!("unserializable credentials: {}", e)))?;
        Ok(self.fernet.encrypt(&plaintext))
    }

    /// Decrypt a token back into a credential map.
    ///
    /// # Errors
    ///
    /// Returns `DecryptionFailed` for a wrong key, a tampered token or a
    /// payload that is not a JSON object.
    pub fn decrypt(&self, token: &str) -> Result<Credentials> {
        let plaintext = self
            .fernet
            .decrypt(token.trim())
            .map_err(|_| ConnectorError::DecryptionFailed("invalid token".to_string()))?;

        match serde_json::from_slice::<serde_json::Value>(&plaintext) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(ConnectorError::DecryptionFailed(
                "payload is not a credential map".to_string(),
            )),
            Err(e) => Err(ConnectorError::DecryptionFailed(format!(
                "payload is not JSON: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credentials() -> Credentials {
        json!({"host": "db.internal", "port": 5432, "password": "s3cret", "read_only": true})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let cipher = CredentialCipher::new(&CredentialCipher::generate_key()).unwrap();
        let token = cipher.encrypt(&credentials()).unwrap();

        assert!(!token.contains("s3cret"));
        assert_eq!(cipher.decrypt(&token).unwrap(), credentials());
    }

    #[test]
    fn test_wrong_key_and_tampering() {
        let cipher = CredentialCipher::new(&CredentialCipher::generate_key()).unwrap();
        let other = CredentialCipher::new(&CredentialCipher::generate_key()).unwrap();
        let token = cipher.encrypt(&credentials()).unwrap();

        assert!(matches!(
            other.decrypt(&token).unwrap_err(),
            ConnectorError::DecryptionFailed(_)
        ));
        assert!(matches!(
            cipher.decrypt("not-a-token").unwrap_err(),
            ConnectorError::DecryptionFailed(_)
        ));
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let key = CredentialCipher::generate_key();
        let cipher = CredentialCipher::new(&key).unwrap();
        let token = Fernet::new(&key).unwrap().encrypt(b"[1, 2, 3]");

        let err = cipher.decrypt(&token).unwrap_err();
        assert!(matches!(err, ConnectorError::DecryptionFailed(ref m) if m.contains("credential map")));
    }

    #[test]
    fn test_invalid_key() {
        let err = CredentialCipher::new("short").unwrap_err();
        assert!(matches!(err, ConnectorError::Config(_)));
    }
}
