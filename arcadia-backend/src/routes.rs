use crate::catalog::{self, GameForm, UploadedFile};
use crate::error::AppError;
use crate::session::{Actor, MaybeActor, removal_cookie, session_cookie};
use crate::{AppState, accounts};

use arcadia_db::{Category, Game};
use axum::{
    Form, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use axum_macros::debug_handler;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    category: String,
}

#[derive(Deserialize)]
pub(crate) struct Credentials {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
pub(crate) struct CommentRequest {
    #[serde(default)]
    comment: String,
}

#[debug_handler]
pub(crate) async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let listing = catalog::list(&state, &query.category).await?;
    Ok(Json(listing))
}

#[debug_handler]
pub(crate) async fn about(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let stats = catalog::stats(&state).await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

/// Answers GET on /login and /register with who is logged in, if anyone.
#[debug_handler(state = Arc<AppState>)]
pub(crate) async fn session_status(MaybeActor(actor): MaybeActor) -> impl IntoResponse {
    match actor {
        Some(actor) => Json(json!({
            "logged_in": true,
            "user_id": actor.user_id,
            "username": actor.username,
        })),
        None => Json(json!({ "logged_in": false })),
    }
}

#[debug_handler]
pub(crate) async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(credentials): Form<Credentials>,
) -> Result<impl IntoResponse, AppError> {
    let signed_in =
        accounts::register(&state, &credentials.username, &credentials.password).await?;

    let jar = jar.add(session_cookie(signed_in.token.clone()));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(json!({ "success": true, "user": signed_in.user, "token": signed_in.token })),
    ))
}

#[debug_handler]
pub(crate) async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(credentials): Form<Credentials>,
) -> Result<impl IntoResponse, AppError> {
    let signed_in = accounts::login(&state, &credentials.username, &credentials.password).await?;

    let jar = jar.add(session_cookie(signed_in.token.clone()));
    Ok((
        jar,
        Json(json!({ "success": true, "user": signed_in.user, "token": signed_in.token })),
    ))
}

#[debug_handler]
pub(crate) async fn logout(
    State(state): State<Arc<AppState>>,
    MaybeActor(actor): MaybeActor,
    jar: CookieJar,
) -> impl IntoResponse {
    accounts::logout(&state, actor.as_ref().map(|a| a.token.as_str()));
    (jar.remove(removal_cookie()), Json(json!({ "success": true })))
}

#[debug_handler(state = Arc<AppState>)]
pub(crate) async fn upload_form(_actor: Actor) -> impl IntoResponse {
    Json(json!({ "success": true, "categories": Category::labels() }))
}

#[debug_handler]
pub(crate) async fn upload(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_game_form(multipart).await?;
    let game = catalog::upload(&state, &actor, form).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "game": game })),
    ))
}

#[debug_handler]
pub(crate) async fn play(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    let view = catalog::play(&state, game_id).await?;
    Ok(Json(json!({
        "success": true,
        "game": view.game,
        "play_url": view.play_url,
    })))
}

#[debug_handler]
pub(crate) async fn like(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(game_id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = catalog::toggle_like(&state, &actor, game_id).await?;
    Ok(Json(json!({
        "success": true,
        "likes": outcome.likes,
        "is_liked": outcome.is_liked,
    })))
}

#[debug_handler]
pub(crate) async fn comment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(game_id): Path<u64>,
    Form(request): Form<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = catalog::add_comment(&state, &actor, game_id, &request.comment).await?;
    Ok(Json(json!({ "success": true, "comment": comment })))
}

#[debug_handler]
pub(crate) async fn delete_comment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path((game_id, comment_id)): Path<(u64, u64)>,
) -> Result<impl IntoResponse, AppError> {
    catalog::delete_comment(&state, &actor, game_id, comment_id).await?;
    Ok(Json(json!({ "success": true })))
}

#[debug_handler]
pub(crate) async fn delete_game(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(game_id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    catalog::delete(&state, &actor, game_id).await?;
    Ok(Json(json!({ "success": true })))
}

#[debug_handler]
pub(crate) async fn update_form(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(game_id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    let game = catalog::edit_form(&state, &actor, game_id).await?;
    Ok(Json(json!({
        "success": true,
        "game": game,
        "categories": Category::labels(),
    })))
}

#[debug_handler]
pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(game_id): Path<u64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_game_form(multipart).await?;
    let game = catalog::edit(&state, &actor, game_id, form).await?;
    Ok(Json(json!({ "success": true, "game": game })))
}

#[debug_handler]
pub(crate) async fn api_games(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Game>>, AppError> {
    Ok(Json(state.db.list_games().await?))
}

/// Collect the upload/edit form. File parts without a file name are what browsers send
/// for an empty file input, so they count as absent.
async fn read_game_form(mut multipart: Multipart) -> Result<GameForm, AppError> {
    let mut form = GameForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => form.title = field.text().await?,
            "description" => form.description = field.text().await?,
            "category" => form.category = field.text().await?,
            "html_file" | "cover_image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if file_name.is_empty() {
                    continue;
                }
                let file = Some(UploadedFile { file_name, bytes });
                if name == "html_file" {
                    form.html_file = file;
                } else {
                    form.cover_image = file;
                }
            }
            _ => {}
        }
    }

    Ok(form)
}
