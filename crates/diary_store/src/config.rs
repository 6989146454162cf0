use crate::StoreError;
use secrecy::SecretString;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function, so tests never touch the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, StoreError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let base_url = get("DIARY_STORE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| StoreError::Config("DIARY_STORE_URL missing".into()))?;
        let api_key = get("DIARY_STORE_API_KEY")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| StoreError::Config("DIARY_STORE_API_KEY missing".into()))?;
        let timeout_secs = get("DIARY_STORE_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);
        Ok(Self {
            base_url,
            api_key: SecretString::new(api_key.into()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_missing_api_key() {
        let get = |k: &str| match k {
            "DIARY_STORE_URL" => Some("http://localhost".into()),
            _ => None,
        };
        let res = Config::from_env_with(get);
        assert!(matches!(res, Err(StoreError::Config(_))));
    }

    #[test]
    fn from_env_reads_values() {
        let get = |k: &str| match k {
            "DIARY_STORE_URL" => Some("http://localhost".into()),
            "DIARY_STORE_API_KEY" => Some("sekrit".into()),
            "DIARY_STORE_TIMEOUT_SECS" => Some("3".into()),
            _ => None,
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.base_url, "http://localhost");
        assert_eq!(cfg.timeout, Duration::from_secs(3));
    }

    #[test]
    fn from_env_ignores_garbage_timeout() {
        let get = |k: &str| match k {
            "DIARY_STORE_URL" => Some("http://localhost".into()),
            "DIARY_STORE_API_KEY" => Some("sekrit".into()),
            "DIARY_STORE_TIMEOUT_SECS" => Some("soon".into()),
            _ => None,
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.timeout, Duration::from_secs(10));
    }
}
