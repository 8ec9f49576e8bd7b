use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::db::models::{Post, VoteTally};
use crate::error::AppResult;
use crate::extractors::{ApiJson, ApiQuery, CurrentUser};
use crate::response::{message, ApiResponse, Message};
use crate::services::posts::{self, ListQuery, DEFAULT_LIMIT, DEFAULT_PAGE};
use crate::services::votes;
use crate::state::AppState;

// --- Requests ---

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub value: String,
}

// --- Responses ---

#[derive(Serialize)]
pub struct PostList {
    pub posts: Vec<Post>,
}

#[derive(Serialize)]
pub struct SinglePost {
    pub post: Post,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/{post_id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/api/posts/{post_id}/helpful", post(vote_helpful))
}

// --- Handlers ---

async fn list_posts(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<ApiResponse<PostList>> {
    let query = ListQuery {
        page: params.page.unwrap_or(DEFAULT_PAGE),
        limit: params.limit.unwrap_or(DEFAULT_LIMIT),
        search: params.search,
    };

    let conn = state.db.get()?;
    let posts = posts::list_posts(&conn, &query)?;
    Ok(ApiResponse::ok(PostList { posts }))
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> AppResult<ApiResponse<SinglePost>> {
    let conn = state.db.get()?;
    let post = posts::create_post(&conn, &user.id, &req.title, &req.content)?;
    Ok(ApiResponse::created(SinglePost { post }))
}

async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<ApiResponse<SinglePost>> {
    let conn = state.db.get()?;
    let post = posts::get_post(&conn, &post_id)?;
    Ok(ApiResponse::ok(SinglePost { post }))
}

async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    ApiJson(req): ApiJson<UpdatePostRequest>,
) -> AppResult<ApiResponse<SinglePost>> {
    let conn = state.db.get()?;
    let post = posts::update_post(
        &conn,
        &user.identity(),
        &post_id,
        req.title.as_deref(),
        req.content.as_deref(),
    )?;
    Ok(ApiResponse::ok(SinglePost { post }))
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
) -> AppResult<ApiResponse<Message>> {
    let conn = state.db.get()?;
    posts::delete_post(&conn, &user.identity(), &post_id)?;
    Ok(message("Post deleted successfully"))
}

async fn vote_helpful(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> AppResult<ApiResponse<VoteTally>> {
    let conn = state.db.get()?;
    let tally = votes::cast_vote(&conn, &post_id, &user.id, &req.value)?;
    Ok(ApiResponse::ok(tally))
}
