use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::db::models::{ModerationComment, Post, User};
use crate::error::AppResult;
use crate::extractors::{AdminUser, ApiJson};
use crate::response::{message, ApiResponse, Message};
use crate::services::admin::{self, Stats};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RoleRequest {
    #[serde(default)]
    pub role: String,
}

#[derive(Serialize)]
pub struct UserList {
    pub users: Vec<User>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedUser {
    pub updated_user: User,
}

#[derive(Serialize)]
pub struct PostList {
    pub posts: Vec<Post>,
}

#[derive(Serialize)]
pub struct CommentList {
    pub comments: Vec<ModerationComment>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/users", get(list_users))
        .route(
            "/api/admin/users/{user_id}",
            axum::routing::put(update_user_role).delete(delete_user),
        )
        .route("/api/admin/posts", get(list_posts))
        .route("/api/admin/posts/{post_id}", delete(delete_post))
        .route("/api/admin/comments", get(list_comments))
        .route("/api/admin/comments/{comment_id}", delete(delete_comment))
}

async fn stats(State(state): State<AppState>, _admin: AdminUser) -> AppResult<ApiResponse<Stats>> {
    let conn = state.db.get()?;
    Ok(ApiResponse::ok(admin::stats(&conn)?))
}

async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<ApiResponse<UserList>> {
    let conn = state.db.get()?;
    let users = admin::list_users(&conn)?;
    Ok(ApiResponse::ok(UserList { users }))
}

async fn update_user_role(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Path(user_id): Path<String>,
    ApiJson(req): ApiJson<RoleRequest>,
) -> AppResult<ApiResponse<UpdatedUser>> {
    let conn = state.db.get()?;
    let updated_user = admin::update_user_role(&conn, &user_id, &req.role)?;
    tracing::info!(admin = %actor.id, user_id = %user_id, "Role change applied");
    Ok(ApiResponse::ok(UpdatedUser { updated_user }))
}

async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<Message>> {
    let conn = state.db.get()?;
    admin::delete_user(&conn, &user_id)?;
    Ok(message("User deleted successfully"))
}

async fn list_posts(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<ApiResponse<PostList>> {
    let conn = state.db.get()?;
    let posts = admin::list_posts(&conn)?;
    Ok(ApiResponse::ok(PostList { posts }))
}

async fn delete_post(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(post_id): Path<String>,
) -> AppResult<ApiResponse<Message>> {
    let conn = state.db.get()?;
    admin::delete_post(&conn, &post_id)?;
    Ok(message("Post deleted by admin"))
}

async fn list_comments(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<ApiResponse<CommentList>> {
    let conn = state.db.get()?;
    let comments = admin::list_comments(&conn)?;
    Ok(ApiResponse::ok(CommentList { comments }))
}

async fn delete_comment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(comment_id): Path<String>,
) -> AppResult<ApiResponse<Message>> {
    let conn = state.db.get()?;
    admin::delete_comment(&conn, &comment_id)?;
    Ok(message("Comment deleted by admin"))
}
