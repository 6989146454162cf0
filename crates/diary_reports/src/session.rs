//! Resolution of the already-issued session cookie to a user id.
//!
//! The cookie value is `<user uuid>.<hex hmac-sha256 of the uuid>`. Sessions
//! are issued elsewhere; this module only verifies them.

use axum::http::{HeaderMap, header};
use diary_store::UserId;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{ReportError, ReportResult};

pub const SESSION_COOKIE: &str = "diary_session";

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &SecretString) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC can take key of any size")
}

/// Cookie value for `user` under `secret`.
pub fn sign(secret: &SecretString, user: UserId) -> String {
    let id = user.to_string();
    let mut m = mac(secret);
    m.update(id.as_bytes());
    format!("{id}.{}", hex::encode(m.finalize().into_bytes()))
}

/// The user id of a correctly signed cookie value.
pub fn verify(secret: &SecretString, value: &str) -> Option<UserId> {
    let (id, signature) = value.split_once('.')?;
    let user = Uuid::parse_str(id).ok()?;
    let signature = hex::decode(signature).ok()?;
    let mut m = mac(secret);
    m.update(id.as_bytes());
    m.verify_slice(&signature).ok()?;
    Some(user)
}

/// Value of cookie `name` across all `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"'))
}

/// Session cookie first, then the configured demo account.
#[derive(Clone, Debug, Default)]
pub struct SessionResolver {
    secret: Option<SecretString>,
    demo_user: Option<UserId>,
}

impl SessionResolver {
    pub fn new(secret: Option<SecretString>, demo_user: Option<UserId>) -> Self {
        Self { secret, demo_user }
    }

    pub fn resolve(&self, headers: &HeaderMap) -> ReportResult<UserId> {
        let from_cookie = self.secret.as_ref().and_then(|secret| {
            let value = cookie_value(headers, SESSION_COOKIE)?;
            let user = verify(secret, value);
            if user.is_none() {
                tracing::debug!("ignoring session cookie with a bad signature");
            }
            user
        });
        from_cookie
            .or(self.demo_user)
            .ok_or(ReportError::Unauthorized)
    }
}
