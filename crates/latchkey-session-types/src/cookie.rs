//! Session cookie builders.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name carrying the session transport token.
pub const SESSION_COOKIE: &str = "latchkey_session";

/// Attributes shared by every session cookie this deployment emits.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// `Domain` attribute; `None` makes it a host-only cookie.
    pub domain: Option<String>,
    /// `Secure` attribute. Only switch off for plain-http local development.
    pub secure: bool,
}

fn base_cookie(value: String, settings: &CookieSettings) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .build();
    if let Some(domain) = &settings.domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}

/// Set the session cookie with a `Max-Age` matching the session lifetime.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use latchkey_session_types::cookie::{CookieSettings, SESSION_COOKIE, set_session_cookie};
///
/// let settings = CookieSettings { domain: Some("example.com".into()), secure: true };
/// let jar = set_session_cookie(CookieJar::new(), "token".to_string(), 600, &settings);
/// let cookie = jar.get(SESSION_COOKIE).unwrap();
/// assert_eq!(cookie.value(), "token");
/// assert_eq!(cookie.path(), Some("/"));
/// assert_eq!(cookie.domain(), Some("example.com"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(600)));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_session_cookie(
    jar: CookieJar,
    token: String,
    max_age_secs: i64,
    settings: &CookieSettings,
) -> CookieJar {
    let mut cookie = base_cookie(token, settings);
    cookie.set_max_age(Duration::seconds(max_age_secs));
    jar.add(cookie)
}

/// Expire the session cookie on the client.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use latchkey_session_types::cookie::{CookieSettings, SESSION_COOKIE, clear_session_cookie};
///
/// let settings = CookieSettings { domain: None, secure: false };
/// let jar = clear_session_cookie(CookieJar::new(), &settings);
/// let cookie = jar.get(SESSION_COOKIE).unwrap();
/// assert_eq!(cookie.value(), "");
/// assert_eq!(cookie.domain(), None);
/// assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_session_cookie(jar: CookieJar, settings: &CookieSettings) -> CookieJar {
    let mut cookie = base_cookie(String::new(), settings);
    cookie.set_max_age(Duration::ZERO);
    jar.add(cookie)
}
