use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// ISO-8601 timestamp without offset, as stored in the JSON documents. Always UTC.
pub type Timestamp = NaiveDateTime;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: u64,
  /// Unique, case-sensitive
  pub username: String,
  /// Argon2 PHC string, or a legacy plaintext value
  pub password: String,
  pub created_at: Timestamp,
  pub last_login: Timestamp,
}

/// Fields supplied when registering a user. The id and timestamps are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username: String,
  pub password: String,
}

/// Fixed set of game categories. Serialized by their display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
  #[serde(rename = "Аркады")]
  Arcade,
  #[serde(rename = "Головоломки")]
  Puzzle,
  #[serde(rename = "Стратегии")]
  Strategy,
  #[serde(rename = "Экшен")]
  Action,
  #[serde(rename = "Приключения")]
  Adventure,
  #[serde(rename = "Гонки")]
  Racing,
  #[serde(rename = "Спортивные")]
  Sports,
  #[serde(rename = "Симуляторы")]
  Simulation,
  #[serde(rename = "Хоррор")]
  Horror,
  #[serde(rename = "РПГ")]
  Rpg,
  #[serde(rename = "Казуальные")]
  Casual,
  #[serde(rename = "Образовательные")]
  Educational,
  #[serde(rename = "Другие")]
  Other,
}

impl Category {
  pub const ALL: [Category; 13] = [
    Category::Arcade,
    Category::Puzzle,
    Category::Strategy,
    Category::Action,
    Category::Adventure,
    Category::Racing,
    Category::Sports,
    Category::Simulation,
    Category::Horror,
    Category::Rpg,
    Category::Casual,
    Category::Educational,
    Category::Other,
  ];

  pub fn label(self) -> &'static str {
    match self {
      Category::Arcade => "Аркады",
      Category::Puzzle => "Головоломки",
      Category::Strategy => "Стратегии",
      Category::Action => "Экшен",
      Category::Adventure => "Приключения",
      Category::Racing => "Гонки",
      Category::Sports => "Спортивные",
      Category::Simulation => "Симуляторы",
      Category::Horror => "Хоррор",
      Category::Rpg => "РПГ",
      Category::Casual => "Казуальные",
      Category::Educational => "Образовательные",
      Category::Other => "Другие",
    }
  }

  /// Labels of every category, in display order.
  pub fn labels() -> Vec<&'static str> {
    Self::ALL.iter().map(|c| c.label()).collect()
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory;

impl fmt::Display for UnknownCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("unknown category")
  }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
  type Err = UnknownCategory;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|c| c.label() == s)
      .ok_or(UnknownCategory)
  }
}

/// A comment embedded in its game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
  /// Unique within the parent game only
  pub id: u64,
  /// Author's username at the time of writing
  pub user: String,
  pub user_id: u64,
  pub text: String,
  pub timestamp: Timestamp,
}

/// A published game and everything embedded in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
  pub id: u64,
  pub title: String,
  /// Creator's username snapshot
  pub creator: String,
  pub creator_id: u64,
  #[serde(default)]
  pub description: String,
  pub category: Category,
  /// Path relative to the static root, e.g. `games/alice_20250101_120000_snake.html`
  pub html_file: String,
  /// Path relative to the static root, e.g. `images/alice_20250101_120000_cover.png`
  pub cover_image: String,
  #[serde(default)]
  pub likes: u64,
  #[serde(default)]
  pub plays: u64,
  pub created_at: Timestamp,
  pub updated_at: Timestamp,
  #[serde(default)]
  pub comments: Vec<Comment>,
  #[serde(default)]
  pub liked_by: Vec<u64>,
}

/// Fields supplied when publishing a game. Counters start at zero.
#[derive(Debug, Clone)]
pub struct NewGame {
  pub title: String,
  pub creator: String,
  pub creator_id: u64,
  pub description: String,
  pub category: Category,
  pub html_file: String,
  pub cover_image: String,
}

impl Game {
  pub(crate) fn from_new(id: u64, new: NewGame, now: Timestamp) -> Self {
    Self {
      id,
      title: new.title,
      creator: new.creator,
      creator_id: new.creator_id,
      description: new.description,
      category: new.category,
      html_file: new.html_file,
      cover_image: new.cover_image,
      likes: 0,
      plays: 0,
      created_at: now,
      updated_at: now,
      comments: Vec::new(),
      liked_by: Vec::new(),
    }
  }

  pub fn is_owned_by(&self, user_id: u64) -> bool {
    self.creator_id == user_id
  }

  pub fn is_liked_by(&self, user_id: u64) -> bool {
    self.liked_by.contains(&user_id)
  }

  /// Count one more play.
  pub fn record_play(&mut self, now: Timestamp) {
    self.plays = self.plays.saturating_add(1);
    self.updated_at = now;
  }

  /// Flip the user's like. Returns whether the user likes the game afterwards.
  ///
  /// `likes` is recomputed from `liked_by`, so documents written with a drifted
  /// counter heal on the next toggle.
  pub fn toggle_like(&mut self, user_id: u64, now: Timestamp) -> bool {
    let liked = if self.is_liked_by(user_id) {
      self.liked_by.retain(|id| *id != user_id);
      false
    } else {
      self.liked_by.push(user_id);
      true
    };
    self.likes = self.liked_by.len() as u64;
    self.updated_at = now;
    liked
  }

  pub fn find_comment(&self, comment_id: u64) -> Option<&Comment> {
    self.comments.iter().find(|c| c.id == comment_id)
  }

  /// Append a comment. Ids continue from the highest id present so that a deletion
  /// never leads to two comments sharing an id.
  pub fn add_comment(
    &mut self,
    user: String,
    user_id: u64,
    text: String,
    now: Timestamp,
  ) -> Comment {
    let id = self.comments.iter().map(|c| c.id).max().unwrap_or(0) + 1;
    let comment = Comment {
      id,
      user,
      user_id,
      text,
      timestamp: now,
    };
    self.comments.push(comment.clone());
    self.updated_at = now;
    comment
  }

  /// Remove a comment by id, returning it if it existed.
  pub fn remove_comment(&mut self, comment_id: u64, now: Timestamp) -> Option<Comment> {
    let idx = self.comments.iter().position(|c| c.id == comment_id)?;
    let removed = self.comments.remove(idx);
    self.updated_at = now;
    Some(removed)
  }
}
