//! Manager settings.

use std::time::Duration;

use anyhow::{Context, Result};

/// Environment variable holding the credential cipher key
pub const FERNET_KEY_VAR: &str = "QUERYBRIDGE_FERNET_KEY";
/// Environment variable overriding the schema cache TTL, in seconds
pub const SCHEMA_TTL_VAR: &str = "QUERYBRIDGE_SCHEMA_TTL_S";

/// Default schema cache TTL (15 minutes)
pub const DEFAULT_SCHEMA_TTL: Duration = Duration::from_secs(900);

/// Settings for a `ConnectionManager`.
#[derive(Clone)]
pub struct ConnectorSettings {
    /// URL-safe base64 Fernet key
    pub fernet_key: String,
    /// How long an extracted schema is served from cache
    pub schema_ttl: Duration,
}

impl std::fmt::Debug for ConnectorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorSettings")
            .field("fernet_key", &"<redacted>")
            .field("schema_ttl", &self.schema_ttl)
            .finish()
    }
}

impl ConnectorSettings {
    pub fn new(fernet_key: impl Into<String>) -> Self {
        Self {
            fernet_key: fernet_key.into(),
            schema_ttl: DEFAULT_SCHEMA_TTL,
        }
    }

    pub fn with_schema_ttl(mut self, schema_ttl: Duration) -> Self {
        self.schema_ttl = schema_ttl;
        self
    }

    /// Load settings from `QUERYBRIDGE_FERNET_KEY` and the optional
    /// `QUERYBRIDGE_SCHEMA_TTL_S`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let fernet_key = lookup(FERNET_KEY_VAR)
            .with_context(|| format!("{} is not set", FERNET_KEY_VAR))?;

        let mut settings = Self::new(fernet_key);
        if let Some(raw) = lookup(SCHEMA_TTL_VAR) {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds, got {:?}", SCHEMA_TTL_VAR, raw))?;
            settings = settings.with_schema_ttl(Duration::from_secs(secs));
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = ConnectorSettings::from_lookup(lookup(&[(FERNET_KEY_VAR, "k")])).unwrap();
        assert_eq!(settings.fernet_key, "k");
        assert_eq!(settings.schema_ttl, DEFAULT_SCHEMA_TTL);
        assert!(!format!("{:?}", settings).contains("\"k\""));
    }

    #[test]
    fn test_ttl_override() {
        let settings = ConnectorSettings::from_lookup(lookup(&[
            (FERNET_KEY_VAR, "k"),
            (SCHEMA_TTL_VAR, "60"),
        ]))
        .unwrap();
        assert_eq!(settings.schema_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_missing_key_and_bad_ttl() {
        let err = ConnectorSettings::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains(FERNET_KEY_VAR));

        let err = ConnectorSettings::from_lookup(lookup(&[
            (FERNET_KEY_VAR, "k"),
            (SCHEMA_TTL_VAR, "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(SCHEMA_TTL_VAR));
    }
}
