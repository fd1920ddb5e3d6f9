mod error;
mod games;
mod models;
mod sequence;
pub mod store;
mod users;

pub use error::{DbError, Result};
pub use models::{Category, Comment, Game, NewGame, NewUser, Timestamp, UnknownCategory, User};
pub use store::{Backend, DiskBackend, FlatFileStore, MemoryBackend};

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

pub(crate) const USERS: &str = "users";
pub(crate) const GAMES: &str = "games";

/// Catalog storage: the users and games collections over a flat-file store.
///
/// Every operation reloads the affected collection and every mutation rewrites it. Each
/// collection has a gate held for the whole load-mutate-save cycle, so concurrent
/// requests within one process never lose each other's updates. Several processes
/// sharing one data directory are not coordinated.
#[derive(Clone)]
pub struct Database {
  store: FlatFileStore,
  users_gate: Arc<Mutex<()>>,
  games_gate: Arc<Mutex<()>>,
  sequence_gate: Arc<Mutex<()>>,
}

impl Database {
  /// Open or create the documents in the given data directory.
  pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
    Self::with_backend(Arc::new(DiskBackend::new(dir.as_ref()))).await
  }

  /// Create an in-memory database (useful for testing).
  pub async fn open_in_memory() -> Result<Self> {
    Self::with_backend(Arc::new(MemoryBackend::new())).await
  }

  /// Build a database over any document backend.
  pub async fn with_backend(backend: Arc<dyn Backend>) -> Result<Self> {
    let db = Self {
      store: FlatFileStore::new(backend),
      users_gate: Arc::new(Mutex::new(())),
      games_gate: Arc::new(Mutex::new(())),
      sequence_gate: Arc::new(Mutex::new(())),
    };
    db.initialize().await?;
    Ok(db)
  }

  /// Make sure both collection documents exist and are readable.
  async fn initialize(&self) -> Result<()> {
    let users: Vec<User> = self.store.load(USERS).await?;
    let games: Vec<Game> = self.store.load(GAMES).await?;

    info!(users = users.len(), games = games.len(), "database initialized");
    Ok(())
  }
}
