//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use diary_store::UserId;
use secrecy::SecretString;
use uuid::Uuid;

use crate::error::ReportError;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Berlin;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddr,
    /// Zone that defines the user's local calendar dates.
    pub timezone: Tz,
    pub session_secret: Option<SecretString>,
    pub demo_user: Option<UserId>,
    pub uploads_dir: PathBuf,
    pub photo_timeout: Duration,
    pub request_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ReportError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, ReportError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let address = get("ADDRESS")
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));

        let timezone = match non_empty(get("DIARY_TIMEZONE")) {
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|_| ReportError::Config(format!("unknown DIARY_TIMEZONE {name}")))?,
            None => DEFAULT_TIMEZONE,
        };

        let session_secret = non_empty(get("DIARY_SESSION_SECRET")).map(|s| SecretString::new(s.into()));

        let demo_user = match non_empty(get("DIARY_DEMO_USER_ID")) {
            Some(raw) => Some(
                Uuid::parse_str(raw.trim())
                    .map_err(|e| ReportError::Config(format!("DIARY_DEMO_USER_ID: {e}")))?,
            ),
            None => None,
        };

        let uploads_dir = non_empty(get("DIARY_UPLOADS_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./uploads"));

        let secs = |v: Option<String>, default: u64| {
            Duration::from_secs(v.and_then(|s| s.parse::<u64>().ok()).unwrap_or(default))
        };
        let photo_timeout = secs(get("DIARY_PHOTO_TIMEOUT_SECS"), 5);
        let request_timeout = secs(get("DIARY_REQUEST_TIMEOUT_SECS"), 60);

        Ok(Self {
            address,
            timezone,
            session_secret,
            demo_user,
            uploads_dir,
            photo_timeout,
            request_timeout,
        })
    }
}
