use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::db::models::Comment;
use crate::error::AppResult;
use crate::extractors::{ApiJson, CurrentUser};
use crate::response::{message, ApiResponse, Message};
use crate::services::comments;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Serialize)]
pub struct CommentList {
    pub comments: Vec<Comment>,
}

#[derive(Serialize)]
pub struct SingleComment {
    pub comment: Comment,
}

/// GET and POST take a post id; PUT and DELETE take a comment id.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/comments/{id}",
        get(list_comments)
            .post(add_comment)
            .put(edit_comment)
            .delete(delete_comment),
    )
}

async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    ApiJson(req): ApiJson<CommentRequest>,
) -> AppResult<ApiResponse<SingleComment>> {
    let conn = state.db.get()?;
    let comment = comments::add_comment(&conn, &user.id, &post_id, &req.text)?;
    Ok(ApiResponse::created(SingleComment { comment }))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<ApiResponse<CommentList>> {
    let conn = state.db.get()?;
    let comments = comments::list_for_post(&conn, &post_id)?;
    Ok(ApiResponse::ok(CommentList { comments }))
}

async fn edit_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<String>,
    ApiJson(req): ApiJson<CommentRequest>,
) -> AppResult<ApiResponse<SingleComment>> {
    let conn = state.db.get()?;
    let comment = comments::edit_comment(&conn, &user.identity(), &comment_id, &req.text)?;
    Ok(ApiResponse::ok(SingleComment { comment }))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<String>,
) -> AppResult<ApiResponse<Message>> {
    let conn = state.db.get()?;
    comments::delete_comment(&conn, &user.identity(), &comment_id)?;
    Ok(message("Comment deleted successfully"))
}
