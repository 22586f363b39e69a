use crate::models::auth::Claims;
use crate::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use thiserror::Error;

pub const SESSION_COOKIE: &str = "chat_session";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Malformed session subject: {0}")]
    BadSubject(String),
}

/// The logged-in user, passed explicitly to every page handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: i32,
    pub username: String,
}

/// Signs and verifies session tokens.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, session: &Session) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = Claims {
            sub: session.user_id.to_string(),
            username: session.username.clone(),
            exp: (now + self.ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Session, SessionError> {
        let claims = decode::<Claims>(token, &self.decoding, &Validation::default())?.claims;
        let user_id = claims
            .sub
            .parse::<i32>()
            .map_err(|_| SessionError::BadSubject(claims.sub.clone()))?;
        Ok(Session { user_id, username: claims.username })
    }

    /// Session cookie carrying a freshly issued token.
    pub fn cookie(&self, token: &str) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.ttl.num_seconds()))
            .build()
    }
}

/// Cookie to pass to [`CookieJar::remove`] to end the session.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").http_only(true).same_site(SameSite::Lax).build()
}

/// The session token from the request cookies, if any.
pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

// Login gates every page: anything without a valid session goes to /login
#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(state) = parts.extensions.get::<Arc<AppState>>() else {
            tracing::error!("AppState extension missing; cannot resolve session");
            return Err(Redirect::to("/login"));
        };

        let jar = CookieJar::from_headers(&parts.headers);
        let token = session_token(&jar).ok_or_else(|| Redirect::to("/login"))?;

        state.sessions.verify(&token).map_err(|e| {
            tracing::warn!("Session verification failed: {}", e);
            Redirect::to("/login")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    fn alice() -> Session {
        Session { user_id: 1, username: "alice".to_string() }
    }

    #[test]
    fn test_issued_token_verifies() {
        let keys = SessionKeys::new("secret", 24);
        let token = keys.issue(&alice()).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), alice());
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let token = SessionKeys::new("one", 24).issue(&alice()).unwrap();
        assert!(SessionKeys::new("two", 24).verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Well past the default validation leeway
        let keys = SessionKeys::new("secret", -1);
        let token = keys.issue(&alice()).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_session_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; chat_session=abc.def.ghi; other=1"),
        );
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(session_token(&jar).as_deref(), Some("abc.def.ghi"));

        let mut cleared = HeaderMap::new();
        cleared.insert(header::COOKIE, HeaderValue::from_static("chat_session="));
        assert_eq!(session_token(&CookieJar::from_headers(&cleared)), None);
        assert_eq!(session_token(&CookieJar::new()), None);
    }

    #[test]
    fn test_issued_cookie_attributes() {
        let keys = SessionKeys::new("secret", 24);
        let cookie = keys.cookie("abc.def.ghi");

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc.def.ghi");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(24)));
    }
}
