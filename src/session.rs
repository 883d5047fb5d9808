//! The acting user is a bare username kept in a cookie. There is no
//! password or token behind it; whoever presents the name acts as that
//! user.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderMap},
    response::Redirect,
};

pub const SESSION_COOKIE: &str = "username";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Session {
    username: String,
}

impl Session {
    /// Returns `None` when the name is blank after trimming.
    pub fn new(username: &str) -> Option<Self> {
        let username = username.trim();
        if username.is_empty() {
            return None;
        }
        Some(Self {
            username: username.to_owned(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Visitors without a session are sent back to the login page.
#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        read_session(&parts.headers).ok_or_else(|| Redirect::to("/"))
    }
}

pub fn read_session(headers: &HeaderMap) -> Option<Session> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| decode(value))
        .and_then(|username| Session::new(&username))
}

pub fn session_cookie(session: &Session) -> String {
    format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
        encode(session.username())
    )
}

pub fn expired_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn decode(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = value.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn blank_username_is_rejected() {
        assert!(Session::new("   ").is_none());
        assert_eq!(Session::new("  ana ").unwrap().username(), "ana");
    }

    #[test]
    fn cookie_round_trips_unusual_names() {
        let session = Session::new("José; admin=1").unwrap();
        let cookie = session_cookie(&session);
        let value = cookie.split(';').next().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&format!("theme=dark; {value}")).unwrap());
        assert_eq!(read_session(&headers), Some(session));
    }

    #[test]
    fn missing_or_empty_cookie_means_no_session() {
        let mut headers = HeaderMap::new();
        assert!(read_session(&headers).is_none());

        headers.insert(COOKIE, HeaderValue::from_static("username="));
        assert!(read_session(&headers).is_none());

        headers.insert(COOKIE, HeaderValue::from_static("username=%zz"));
        assert!(read_session(&headers).is_none());
    }
}
