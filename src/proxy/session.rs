//! Credential store
//!
//! The upstream API key lives only in an httpOnly cookie. Everything that
//! touches that cookie goes through [`CredentialStore`].

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::fmt;

pub const SESSION_COOKIE_NAME: &str = "deliverant_session";

/// Session lifetime in days
pub const SESSION_TTL_DAYS: i64 = 7;

/// Upstream API key read from the session cookie
///
/// Not `Serialize`; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CredentialStore {
    secure: bool,
}

impl CredentialStore {
    /// `secure` sets the cookie's `Secure` flag (production deployments)
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    pub fn set_session(&self, jar: CookieJar, credential: &Credential) -> CookieJar {
        let cookie = Cookie::build((SESSION_COOKIE_NAME, credential.expose().to_string()))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::days(SESSION_TTL_DAYS))
            .build();
        jar.add(cookie)
    }

    pub fn get_credential(&self, jar: &CookieJar) -> Option<Credential> {
        jar.get(SESSION_COOKIE_NAME)
            .map(|cookie| cookie.value())
            .filter(|value| !value.is_empty())
            .map(Credential::new)
    }

    pub fn clear_session(&self, jar: CookieJar) -> CookieJar {
        let cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::ZERO)
            .build();
        jar.add(cookie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    fn jar_with(cookie_header: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie_header).unwrap());
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn test_set_session_cookie_flags() {
        let store = CredentialStore::new(false);
        let jar = store.set_session(CookieJar::new(), &Credential::new("dk_live_123"));
        let cookie = jar.get(SESSION_COOKIE_NAME).unwrap();

        assert_eq!(cookie.value(), "dk_live_123");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
        assert_eq!(cookie.secure(), Some(false));
    }

    #[test]
    fn test_secure_flag_in_production() {
        let store = CredentialStore::new(true);
        let jar = store.set_session(CookieJar::new(), &Credential::new("k"));
        assert_eq!(jar.get(SESSION_COOKIE_NAME).unwrap().secure(), Some(true));
    }

    #[test]
    fn test_get_credential_from_request_cookies() {
        let store = CredentialStore::new(false);
        let jar = jar_with("theme=dark; deliverant_session=dk_test_abc");
        assert_eq!(
            store.get_credential(&jar).map(|c| c.expose().to_string()),
            Some("dk_test_abc".to_string())
        );
        assert!(store.get_credential(&jar_with("theme=dark")).is_none());
        assert!(store.get_credential(&jar_with("deliverant_session=")).is_none());
    }

    #[test]
    fn test_clear_session_is_idempotent() {
        let store = CredentialStore::new(false);
        let jar = store.clear_session(jar_with("deliverant_session=dk_test_abc"));
        let jar = store.clear_session(jar);
        let cookie = jar.get(SESSION_COOKIE_NAME).unwrap();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        assert!(store.get_credential(&jar).is_none());
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("dk_live_secret");
        assert_eq!(format!("{:?}", credential), "Credential(***)");
        assert_eq!(credential.bearer(), "Bearer dk_live_secret");
    }
}
