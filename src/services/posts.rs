use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::auth::gate::{ensure_author, ensure_can_mutate};
use crate::auth::token::Identity;
use crate::db::models::{Post, UserRef, VoteTally};
use crate::db::now_timestamp;
use crate::error::{AppError, AppResult};
use crate::services::votes;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 9;
pub const MAX_LIMIT: u32 = 100;

const POST_SELECT: &str = "SELECT p.id, p.title, p.content, p.author_id, u.username, \
     p.created_at, p.updated_at \
     FROM posts p JOIN users u ON u.id = p.author_id";

/// Maps the `POST_SELECT` columns. Votes are attached separately.
fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author: UserRef {
            id: row.get(3)?,
            username: row.get(4)?,
        },
        helpful_votes: Vec::new(),
        tally: VoteTally::default(),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn with_votes(conn: &Connection, mut post: Post) -> AppResult<Post> {
    post.helpful_votes = votes::load_votes(conn, &post.id)?;
    post.tally = VoteTally::count(&post.helpful_votes);
    Ok(post)
}

fn query_posts<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> AppResult<Vec<Post>> {
    let mut stmt = conn.prepare(sql)?;
    let posts = stmt
        .query_map(params, post_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    posts.into_iter().map(|p| with_votes(conn, p)).collect()
}

#[derive(Debug, Clone)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: None,
        }
    }
}

/// Newest-first page of posts whose title or content contains `search`,
/// ignoring case.
pub fn list_posts(conn: &Connection, query: &ListQuery) -> AppResult<Vec<Post>> {
    if query.page < 1 {
        return Err(AppError::Validation("page must be at least 1".into()));
    }
    if query.limit < 1 || query.limit > MAX_LIMIT {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    let search = query.search.as_deref().unwrap_or("");
    let offset = i64::from(query.page - 1) * i64::from(query.limit);
    let sql = format!(
        "{} WHERE ?1 = '' \
            OR instr(lower(p.title), lower(?1)) > 0 \
            OR instr(lower(p.content), lower(?1)) > 0 \
         ORDER BY p.created_at DESC, p.rowid DESC \
         LIMIT ?2 OFFSET ?3",
        POST_SELECT
    );
    query_posts(conn, &sql, params![search, query.limit, offset])
}

/// Every post, newest first.
pub fn list_all(conn: &Connection) -> AppResult<Vec<Post>> {
    let sql = format!("{} ORDER BY p.created_at DESC, p.rowid DESC", POST_SELECT);
    query_posts(conn, &sql, [])
}

pub fn list_by_author(conn: &Connection, author_id: &str) -> AppResult<Vec<Post>> {
    let sql = format!(
        "{} WHERE p.author_id = ?1 ORDER BY p.created_at DESC, p.rowid DESC",
        POST_SELECT
    );
    query_posts(conn, &sql, params![author_id])
}

pub fn get_post(conn: &Connection, post_id: &str) -> AppResult<Post> {
    let sql = format!("{} WHERE p.id = ?1", POST_SELECT);
    let post = conn
        .query_row(&sql, params![post_id], post_from_row)
        .optional()?
        .ok_or(AppError::NotFound("Post"))?;
    with_votes(conn, post)
}

pub(crate) fn post_author(conn: &Connection, post_id: &str) -> AppResult<String> {
    conn.query_row(
        "SELECT author_id FROM posts WHERE id = ?1",
        params![post_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(AppError::NotFound("Post"))
}

pub fn create_post(conn: &Connection, author_id: &str, title: &str, content: &str) -> AppResult<Post> {
    let title = title.trim();
    let content = content.trim();
    if title.is_empty() || content.is_empty() {
        return Err(AppError::Validation("Title and content are required".into()));
    }

    let post_id = uuid::Uuid::now_v7().to_string();
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO posts (id, title, content, author_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![post_id, title, content, author_id, now],
    )?;

    tracing::info!(post_id = %post_id, author = author_id, "Post created");
    get_post(conn, &post_id)
}

/// Replace title and/or content. Only the author may do this; admins can
/// delete a post but not rewrite it. Missing or blank fields keep their
/// current value.
pub fn update_post(
    conn: &Connection,
    actor: &Identity,
    post_id: &str,
    title: Option<&str>,
    content: Option<&str>,
) -> AppResult<Post> {
    let author_id = post_author(conn, post_id)?;
    ensure_author(&actor.id, &author_id)?;

    let title = title.map(str::trim).filter(|s| !s.is_empty());
    let content = content.map(str::trim).filter(|s| !s.is_empty());

    conn.execute(
        "UPDATE posts SET
            title = COALESCE(?2, title),
            content = COALESCE(?3, content),
            updated_at = ?4
         WHERE id = ?1",
        params![post_id, title, content, now_timestamp()],
    )?;

    get_post(conn, post_id)
}

pub fn delete_post(conn: &Connection, actor: &Identity, post_id: &str) -> AppResult<()> {
    let author_id = post_author(conn, post_id)?;
    ensure_can_mutate(&actor.id, actor.role, &author_id)?;
    remove_post(conn, post_id)?;
    tracing::info!(post_id, actor = %actor.id, "Post deleted");
    Ok(())
}

/// Unconditional delete; comments and votes go with the post.
pub(crate) fn remove_post(conn: &Connection, post_id: &str) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![post_id])?;
    if rows == 0 {
        return Err(AppError::NotFound("Post"));
    }
    Ok(())
}
