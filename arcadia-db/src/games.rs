use tracing::debug;

use crate::models::{Game, NewGame, Timestamp};
use crate::{Database, DbError, GAMES, Result};

impl Database {
  /// Every game, in stored order.
  pub async fn list_games(&self) -> Result<Vec<Game>> {
    let _guard = self.games_gate.lock().await;
    self.store.load(GAMES).await
  }

  pub async fn find_game(&self, id: u64) -> Result<Option<Game>> {
    let _guard = self.games_gate.lock().await;
    let games: Vec<Game> = self.store.load(GAMES).await?;
    Ok(games.into_iter().find(|g| g.id == id))
  }

  /// Append a new game with zeroed counters.
  pub async fn insert_game(&self, new: NewGame, now: Timestamp) -> Result<Game> {
    let _guard = self.games_gate.lock().await;
    let mut games: Vec<Game> = self.store.load(GAMES).await?;

    let existing_max = games.iter().map(|g| g.id).max().unwrap_or(0);
    let id = self.next_id(GAMES, existing_max).await?;
    let game = Game::from_new(id, new, now);
    games.push(game.clone());
    self.store.save(GAMES, &games).await?;

    debug!(game.id, %game.title, game.creator_id, "inserted game");
    Ok(game)
  }

  /// Read-modify-write one game.
  ///
  /// `apply` runs while the games collection is locked. If it returns an error the
  /// collection is left untouched; otherwise the whole collection is saved and the
  /// updated game is returned alongside `apply`'s output.
  pub async fn modify_game<F, R, E>(&self, id: u64, apply: F) -> std::result::Result<(Game, R), E>
  where
    F: FnOnce(&mut Game) -> std::result::Result<R, E>,
    E: From<DbError>,
  {
    let _guard = self.games_gate.lock().await;
    let mut games: Vec<Game> = self.store.load(GAMES).await?;

    let game = games
      .iter_mut()
      .find(|g| g.id == id)
      .ok_or(DbError::GameNotFound)?;
    let output = apply(game)?;
    let updated = game.clone();

    self.store.save(GAMES, &games).await?;
    Ok((updated, output))
  }

  /// Remove one game after `check` approves it. Returns the removed record.
  pub async fn remove_game<F, E>(&self, id: u64, check: F) -> std::result::Result<Game, E>
  where
    F: FnOnce(&Game) -> std::result::Result<(), E>,
    E: From<DbError>,
  {
    let _guard = self.games_gate.lock().await;
    let mut games: Vec<Game> = self.store.load(GAMES).await?;

    let idx = games
      .iter()
      .position(|g| g.id == id)
      .ok_or(DbError::GameNotFound)?;
    check(&games[idx])?;
    let removed = games.remove(idx);

    self.store.save(GAMES, &games).await?;
    debug!(removed.id, "removed game");
    Ok(removed)
  }

  /// Sum of play counters across the catalog.
  pub async fn total_plays(&self) -> Result<u64> {
    let _guard = self.games_gate.lock().await;
    let games: Vec<Game> = self.store.load(GAMES).await?;
    Ok(games.iter().map(|g| g.plays).sum())
  }
}
