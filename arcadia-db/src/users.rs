use tracing::debug;

use crate::models::{NewUser, Timestamp, User};
use crate::{Database, DbError, Result, USERS};

impl Database {
  /// Register a new user. Fails with [`DbError::UsernameTaken`] if the name exists.
  pub async fn create_user(&self, new: NewUser, now: Timestamp) -> Result<User> {
    let _guard = self.users_gate.lock().await;
    let mut users: Vec<User> = self.store.load(USERS).await?;

    if users.iter().any(|u| u.username == new.username) {
      return Err(DbError::UsernameTaken);
    }

    let existing_max = users.iter().map(|u| u.id).max().unwrap_or(0);
    let id = self.next_id(USERS, existing_max).await?;
    let user = User {
      id,
      username: new.username,
      password: new.password,
      created_at: now,
      last_login: now,
    };
    users.push(user.clone());
    self.store.save(USERS, &users).await?;

    debug!(user.id, %user.username, "created user");
    Ok(user)
  }

  pub async fn find_user_by_id(&self, id: u64) -> Result<Option<User>> {
    let _guard = self.users_gate.lock().await;
    let users: Vec<User> = self.store.load(USERS).await?;
    Ok(users.into_iter().find(|u| u.id == id))
  }

  /// Exact, case-sensitive match.
  pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
    let _guard = self.users_gate.lock().await;
    let users: Vec<User> = self.store.load(USERS).await?;
    Ok(users.into_iter().find(|u| u.username == username))
  }

  /// Apply `update` to one user and save the collection.
  pub async fn update_user<F>(&self, id: u64, update: F) -> Result<User>
  where
    F: FnOnce(&mut User),
  {
    let _guard = self.users_gate.lock().await;
    let mut users: Vec<User> = self.store.load(USERS).await?;

    let user = users
      .iter_mut()
      .find(|u| u.id == id)
      .ok_or(DbError::UserNotFound)?;
    update(user);
    let updated = user.clone();

    self.store.save(USERS, &users).await?;
    Ok(updated)
  }

  pub async fn count_users(&self) -> Result<usize> {
    let _guard = self.users_gate.lock().await;
    let users: Vec<User> = self.store.load(USERS).await?;
    Ok(users.len())
  }
}
