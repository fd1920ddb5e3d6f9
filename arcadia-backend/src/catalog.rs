//! Catalog operations: publishing, playing, liking, commenting, editing and deleting
//! games. Each mutation is one read-modify-write of the games collection.

use arcadia_db::{Category, Comment, Game, NewGame, Timestamp};
use axum::body::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::content_filter::ContentFilter;
use crate::error::AppError;
use crate::helpers::{generate_name_suffix, stored_filename, timestamp, with_name_suffix};
use crate::media::{MediaError, MediaKind};
use crate::session::Actor;
use crate::validation::{
    ValidationError, validate_category, validate_comment, validate_cover_image,
    validate_description, validate_game_file_name, validate_game_source, validate_title,
};

const GAME_NOT_FOUND: &str = "Game not found";

/// A file part of a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Fields of the upload and edit forms, as submitted.
#[derive(Debug, Clone, Default)]
pub struct GameForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub html_file: Option<UploadedFile>,
    pub cover_image: Option<UploadedFile>,
}

#[derive(Debug, Serialize)]
pub struct Listing {
    pub games: Vec<Game>,
    pub active_users: usize,
    pub categories: Vec<&'static str>,
    pub current_category: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Stats {
    pub total_games: usize,
    pub total_users: usize,
    pub total_plays: u64,
}

#[derive(Debug, Serialize)]
pub struct PlayView {
    pub game: Game,
    /// Public URL of the game file
    pub play_url: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LikeOutcome {
    pub likes: u64,
    pub is_liked: bool,
}

/// All games, most liked first. An empty `category` means no filter; an unknown one
/// simply matches nothing.
pub async fn list(state: &AppState, category: &str) -> Result<Listing, AppError> {
    let mut games = state.db.list_games().await?;
    if !category.is_empty() {
        games.retain(|g| g.category.label() == category);
    }
    // Stable, so equally liked games keep their stored order
    games.sort_by(|a, b| b.likes.cmp(&a.likes));

    Ok(Listing {
        games,
        active_users: state.db.count_users().await?,
        categories: Category::labels(),
        current_category: category.to_string(),
    })
}

pub async fn stats(state: &AppState) -> Result<Stats, AppError> {
    Ok(Stats {
        total_games: state.db.list_games().await?.len(),
        total_users: state.db.count_users().await?,
        total_plays: state.db.total_plays().await?,
    })
}

/// Publish a game. Everything is validated before the first byte is written.
pub async fn upload(state: &AppState, actor: &Actor, form: GameForm) -> Result<Game, AppError> {
    let title = validate_title(&form.title)?;
    let description = validate_description(&form.description)?;
    let html = form.html_file.ok_or(ValidationError::GameFileMissing)?;
    let cover = form.cover_image.ok_or(ValidationError::CoverMissing)?;
    let category = validate_category(&form.category)?;
    check_game_file(state.filter.as_ref(), &html)?;
    validate_cover_image(&cover.bytes)?;

    let at = timestamp();
    let html_path = state
        .media
        .save(
            MediaKind::Game,
            &stored_filename(&actor.username, at, &html.file_name),
            &html.bytes,
        )
        .await?;
    let cover_path = match state
        .media
        .save(
            MediaKind::Cover,
            &stored_filename(&actor.username, at, &cover.file_name),
            &cover.bytes,
        )
        .await
    {
        Ok(path) => path,
        Err(err) => {
            state.media.remove(&html_path).await;
            return Err(err.into());
        }
    };

    let new_game = NewGame {
        title,
        creator: actor.username.clone(),
        creator_id: actor.user_id,
        description,
        category,
        html_file: html_path.clone(),
        cover_image: cover_path.clone(),
    };
    match state.db.insert_game(new_game, at).await {
        Ok(game) => {
            info!(game.id, %game.title, creator_id = actor.user_id, "game published");
            Ok(game)
        }
        Err(err) => {
            state.media.remove(&html_path).await;
            state.media.remove(&cover_path).await;
            Err(err.into())
        }
    }
}

/// Count a play. A game whose file has gone missing is reported as not found and its
/// counter is left alone.
pub async fn play(state: &AppState, game_id: u64) -> Result<PlayView, AppError> {
    let game = state
        .db
        .find_game(game_id)
        .await?
        .ok_or(AppError::NotFound(GAME_NOT_FOUND))?;

    if !state.media.exists(&game.html_file).await {
        warn!(game.id, path = %game.html_file, "game file is missing");
        return Err(AppError::NotFound("Game file not found"));
    }

    let (game, ()) = state
        .db
        .modify_game::<_, _, AppError>(game_id, |g| {
            g.record_play(timestamp());
            Ok(())
        })
        .await?;

    let play_url = format!("/{}", game.html_file);
    Ok(PlayView { game, play_url })
}

pub async fn toggle_like(
    state: &AppState,
    actor: &Actor,
    game_id: u64,
) -> Result<LikeOutcome, AppError> {
    let (game, is_liked) = state
        .db
        .modify_game::<_, _, AppError>(game_id, |g| Ok(g.toggle_like(actor.user_id, timestamp())))
        .await?;

    Ok(LikeOutcome {
        likes: game.likes,
        is_liked,
    })
}

pub async fn add_comment(
    state: &AppState,
    actor: &Actor,
    game_id: u64,
    text: &str,
) -> Result<Comment, AppError> {
    let text = validate_comment(text)?;

    let (_, comment) = state
        .db
        .modify_game::<_, _, AppError>(game_id, |g| {
            Ok(g.add_comment(actor.username.clone(), actor.user_id, text, timestamp()))
        })
        .await?;

    Ok(comment)
}

/// The comment's author and the game's creator may delete a comment.
pub async fn delete_comment(
    state: &AppState,
    actor: &Actor,
    game_id: u64,
    comment_id: u64,
) -> Result<(), AppError> {
    state
        .db
        .modify_game(game_id, |g| {
            let comment = g
                .find_comment(comment_id)
                .ok_or(AppError::NotFound("Comment not found"))?;
            if comment.user_id != actor.user_id && !g.is_owned_by(actor.user_id) {
                return Err(AppError::Forbidden("You cannot delete this comment"));
            }
            g.remove_comment(comment_id, timestamp());
            Ok(())
        })
        .await?;

    Ok(())
}

/// The game as its creator sees it before editing.
pub async fn edit_form(state: &AppState, actor: &Actor, game_id: u64) -> Result<Game, AppError> {
    owned_game(state, actor, game_id).await
}

/// Update a game's metadata and optionally replace its files. Replaced files are
/// deleted once the updated record is saved.
pub async fn edit(
    state: &AppState,
    actor: &Actor,
    game_id: u64,
    form: GameForm,
) -> Result<Game, AppError> {
    let title = validate_title(&form.title)?;
    let description = validate_description(&form.description)?;
    let category = validate_category(&form.category)?;
    if let Some(html) = &form.html_file {
        check_game_file(state.filter.as_ref(), html)?;
    }
    if let Some(cover) = &form.cover_image {
        validate_cover_image(&cover.bytes)?;
    }
    owned_game(state, actor, game_id).await?;

    let at = timestamp();
    let mut written = Vec::new();
    let mut new_html = None;
    let mut new_cover = None;
    for (kind, file, slot) in [
        (MediaKind::Game, &form.html_file, &mut new_html),
        (MediaKind::Cover, &form.cover_image, &mut new_cover),
    ] {
        let Some(file) = file else { continue };
        match save_replacement(state, kind, &actor.username, at, file).await {
            Ok(path) => {
                written.push(path.clone());
                *slot = Some(path);
            }
            Err(err) => {
                remove_all(state, &written).await;
                return Err(err.into());
            }
        }
    }

    let result = state
        .db
        .modify_game(game_id, |g| {
            if !g.is_owned_by(actor.user_id) {
                return Err(AppError::Forbidden("Only the creator can edit this game"));
            }
            g.title = title;
            g.description = description;
            g.category = category;
            g.updated_at = at;

            let mut superseded = Vec::new();
            if let Some(path) = new_html {
                superseded.push(std::mem::replace(&mut g.html_file, path));
            }
            if let Some(path) = new_cover {
                superseded.push(std::mem::replace(&mut g.cover_image, path));
            }
            Ok(superseded)
        })
        .await;

    match result {
        Ok((game, superseded)) => {
            remove_all(state, &superseded).await;
            info!(game.id, replaced = superseded.len(), "game updated");
            Ok(game)
        }
        Err(err) => {
            remove_all(state, &written).await;
            Err(err)
        }
    }
}

/// Delete a game and, best effort, its files.
pub async fn delete(state: &AppState, actor: &Actor, game_id: u64) -> Result<Game, AppError> {
    let game = owned_game(state, actor, game_id).await?;

    state.media.remove(&game.html_file).await;
    state.media.remove(&game.cover_image).await;

    let removed = state
        .db
        .remove_game(game_id, |g| {
            if g.is_owned_by(actor.user_id) {
                Ok(())
            } else {
                Err(AppError::Forbidden("Only the creator can delete this game"))
            }
        })
        .await?;

    info!(removed.id, "game deleted");
    Ok(removed)
}

async fn owned_game(state: &AppState, actor: &Actor, game_id: u64) -> Result<Game, AppError> {
    let game = state
        .db
        .find_game(game_id)
        .await?
        .ok_or(AppError::NotFound(GAME_NOT_FOUND))?;
    if !game.is_owned_by(actor.user_id) {
        return Err(AppError::Forbidden("Only the creator can change this game"));
    }
    Ok(game)
}

fn check_game_file(filter: &dyn ContentFilter, file: &UploadedFile) -> Result<(), AppError> {
    validate_game_file_name(&file.file_name)?;
    let source = validate_game_source(&file.bytes)?;
    filter.check(source)?;
    Ok(())
}

/// Store a replacement file for an edit. Names are stamped to the second, so resending
/// the file a game already uses can collide with it; one retry goes to a suffixed name.
async fn save_replacement(
    state: &AppState,
    kind: MediaKind,
    username: &str,
    at: Timestamp,
    file: &UploadedFile,
) -> Result<String, MediaError> {
    let name = stored_filename(username, at, &file.file_name);
    match state.media.save(kind, &name, &file.bytes).await {
        Err(MediaError::AlreadyExists(existing)) => {
            debug!(%existing, "replacement name taken, retrying with a suffix");
            let name = with_name_suffix(&name, &generate_name_suffix());
            state.media.save(kind, &name, &file.bytes).await
        }
        other => other,
    }
}

async fn remove_all(state: &AppState, paths: &[String]) {
    for path in paths {
        state.media.remove(path).await;
    }
}
