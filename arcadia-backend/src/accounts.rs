use arcadia_db::{NewUser, Timestamp, User};
use serde::Serialize;
use tracing::{info, warn};

use crate::AppState;
use crate::error::AppError;
use crate::helpers::{hash_password, is_legacy_password, timestamp, verify_password};
use crate::validation::{validate_password, validate_username};

const BAD_CREDENTIALS: &str = "Invalid username or password";

/// Public view of a user. Never carries the password.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Account {
  pub id: u64,
  pub username: String,
  pub created_at: Timestamp,
  pub last_login: Timestamp,
}

impl From<&User> for Account {
  fn from(user: &User) -> Self {
    Self {
      id: user.id,
      username: user.username.clone(),
      created_at: user.created_at,
      last_login: user.last_login,
    }
  }
}

/// A user together with the session just opened for them.
#[derive(Debug, Clone, Serialize)]
pub struct SignedIn {
  pub user: Account,
  pub token: String,
}

pub async fn register(state: &AppState, username: &str, password: &str) -> Result<SignedIn, AppError> {
  let username = validate_username(username)?;
  let password = validate_password(password)?;

  let user = state
    .db
    .create_user(
      NewUser {
        username,
        password: hash_password(&password)?,
      },
      timestamp(),
    )
    .await?;
  info!(user.id, %user.username, "user registered");

  let token = state.sessions.open(&user);
  Ok(SignedIn {
    user: Account::from(&user),
    token,
  })
}

/// Unknown users and wrong passwords get the same answer. A password still stored in
/// plaintext is replaced by its digest on a successful login.
pub async fn login(state: &AppState, username: &str, password: &str) -> Result<SignedIn, AppError> {
  let username = username.trim();
  let password = password.trim();

  let Some(user) = state.db.find_user_by_username(username).await? else {
    warn!(%username, "login for unknown user");
    return Err(AppError::Unauthorized(BAD_CREDENTIALS));
  };
  if !verify_password(&user.password, password) {
    warn!(user.id, "login with wrong password");
    return Err(AppError::Unauthorized(BAD_CREDENTIALS));
  }

  let upgraded = if is_legacy_password(&user.password) {
    info!(user.id, "upgrading plaintext password");
    Some(hash_password(password)?)
  } else {
    None
  };
  let at = timestamp();
  let user = state
    .db
    .update_user(user.id, |u| {
      u.last_login = at;
      if let Some(digest) = upgraded {
        u.password = digest;
      }
    })
    .await?;

  let token = state.sessions.open(&user);
  Ok(SignedIn {
    user: Account::from(&user),
    token,
  })
}

/// Returns whether a session was actually closed.
pub fn logout(state: &AppState, token: Option<&str>) -> bool {
  token.is_some_and(|t| state.sessions.close(t))
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use arcadia_db::Database;

  use super::*;
  use crate::media::MediaStore;

  async fn setup() -> AppState {
    let db = Database::open_in_memory().await.unwrap();
    AppState::new(db, MediaStore::new("unused-static"), Duration::from_secs(60))
  }

  #[tokio::test]
  async fn test_register_then_login() {
    let state = setup().await;

    let registered = register(&state, " alice ", "hunter2").await.unwrap();
    assert_eq!(registered.user.username, "alice");
    assert!(state.sessions.resolve(&registered.token).is_some());

    let stored = state.db.find_user_by_username("alice").await.unwrap().unwrap();
    assert_ne!(stored.password, "hunter2");

    let logged_in = login(&state, "alice", " hunter2 ").await.unwrap();
    assert_eq!(logged_in.user.id, registered.user.id);
    assert_ne!(logged_in.token, registered.token);
  }

  #[tokio::test]
  async fn test_duplicate_registration() {
    let state = setup().await;
    register(&state, "alice", "one").await.unwrap();

    let err = register(&state, "alice", "two").await.unwrap_err();

    assert!(matches!(err, AppError::Database(arcadia_db::DbError::UsernameTaken)));
  }

  #[tokio::test]
  async fn test_bad_credentials_look_the_same() {
    let state = setup().await;
    register(&state, "alice", "hunter2").await.unwrap();

    let wrong_password = login(&state, "alice", "nope").await.unwrap_err();
    let unknown_user = login(&state, "mallory", "hunter2").await.unwrap_err();

    assert!(matches!(wrong_password, AppError::Unauthorized(BAD_CREDENTIALS)));
    assert!(matches!(unknown_user, AppError::Unauthorized(BAD_CREDENTIALS)));
  }

  #[tokio::test]
  async fn test_legacy_password_is_upgraded() {
    let state = setup().await;
    let user = state
      .db
      .create_user(
        NewUser {
          username: "old".to_string(),
          password: "plain".to_string(),
        },
        timestamp(),
      )
      .await
      .unwrap();

    login(&state, "old", "plain").await.unwrap();

    let stored = state.db.find_user_by_id(user.id).await.unwrap().unwrap();
    assert!(stored.password.starts_with("$argon2"));
    assert!(verify_password(&stored.password, "plain"));
    assert!(stored.last_login >= user.last_login);
    // And the upgraded digest keeps working
    login(&state, "old", "plain").await.unwrap();
  }

  #[tokio::test]
  async fn test_logout() {
    let state = setup().await;
    let signed_in = register(&state, "alice", "pw").await.unwrap();

    assert!(logout(&state, Some(&signed_in.token)));
    assert!(!logout(&state, Some(&signed_in.token)));
    assert!(!logout(&state, None));
  }
}
