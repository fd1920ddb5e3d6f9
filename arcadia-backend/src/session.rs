//! Login sessions and the request-scoped actor.
//!
//! A session token travels in the `arcadia_session` cookie, or as a bearer token for
//! clients that don't keep cookies. Sessions live in process memory only, so a restart
//! logs everyone out.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use arcadia_db::User;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use dashmap::DashMap;
use headers::authorization::Bearer;
use headers::{Authorization, HeaderMapExt};
use tracing::debug;

use crate::AppState;
use crate::error::AppError;
use crate::helpers::{generate_session_token, now};

pub const SESSION_COOKIE: &str = "arcadia_session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  pub user_id: u64,
  pub username: String,
  /// Unix seconds
  pub expires_at: i64,
}

/// Token -> session map with a fixed time to live.
pub struct SessionStore {
  sessions: DashMap<String, Session>,
  ttl: Duration,
}

impl SessionStore {
  pub fn new(ttl: Duration) -> Self {
    Self {
      sessions: DashMap::new(),
      ttl,
    }
  }

  /// Start a session for `user` and return its token.
  pub fn open(&self, user: &User) -> String {
    self.purge_expired();

    let token = generate_session_token();
    let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
    let expires_at = now().saturating_add(ttl);
    self.sessions.insert(
      token.clone(),
      Session {
        user_id: user.id,
        username: user.username.clone(),
        expires_at,
      },
    );
    debug!(user_id = user.id, "opened session");
    token
  }

  /// Look up a live session. Expired sessions are dropped on sight.
  pub fn resolve(&self, token: &str) -> Option<Session> {
    let session = self.sessions.get(token)?.value().clone();
    if session.expires_at <= now() {
      self.sessions.remove(token);
      return None;
    }
    Some(session)
  }

  /// End a session. Returns whether it existed.
  pub fn close(&self, token: &str) -> bool {
    self.sessions.remove(token).is_some()
  }

  /// Drop every expired session and return how many were dropped.
  pub fn purge_expired(&self) -> usize {
    let before = self.sessions.len();
    let current = now();
    self.sessions.retain(|_, s| s.expires_at > current);
    before - self.sessions.len()
  }

  pub fn len(&self) -> usize {
    self.sessions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.sessions.is_empty()
  }
}

/// Cookie carrying a freshly opened session.
pub fn session_cookie(token: String) -> Cookie<'static> {
  Cookie::build((SESSION_COOKIE, token))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .build()
}

/// Cookie that clears the session cookie in the browser.
pub fn removal_cookie() -> Cookie<'static> {
  Cookie::build(SESSION_COOKIE).path("/").build()
}

/// The cookie wins over the bearer header when both are present.
pub fn request_token(parts: &Parts) -> Option<String> {
  let jar = CookieJar::from_headers(&parts.headers);
  if let Some(cookie) = jar.get(SESSION_COOKIE) {
    return Some(cookie.value().to_string());
  }
  parts
    .headers
    .typed_get::<Authorization<Bearer>>()
    .map(|auth| auth.token().to_string())
}

/// The logged-in user making the request. Rejects with 401 when there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
  pub user_id: u64,
  pub username: String,
  pub token: String,
}

impl FromRequestParts<Arc<AppState>> for Actor {
  type Rejection = AppError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &Arc<AppState>,
  ) -> Result<Self, Self::Rejection> {
    let token = request_token(parts).ok_or(AppError::Unauthorized("Please log in first"))?;
    let session = state
      .sessions
      .resolve(&token)
      .ok_or(AppError::Unauthorized("Session expired. Please log in again"))?;

    Ok(Actor {
      user_id: session.user_id,
      username: session.username,
      token,
    })
  }
}

/// Like [`Actor`] but never rejects.
#[derive(Debug, Clone)]
pub struct MaybeActor(pub Option<Actor>);

impl FromRequestParts<Arc<AppState>> for MaybeActor {
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &Arc<AppState>,
  ) -> Result<Self, Self::Rejection> {
    Ok(MaybeActor(Actor::from_request_parts(parts, state).await.ok()))
  }
}
