//! Moderation dashboard operations. Callers are already known to be admins.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::auth::credentials::{find_user, user_from_row};
use crate::db::models::{ModerationComment, Post, Role, User};
use crate::error::{AppError, AppResult};
use crate::services::{comments, posts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub users: i64,
    pub posts: i64,
    pub comments: i64,
}

pub fn stats(conn: &Connection) -> AppResult<Stats> {
    let count = |table: &str| -> AppResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        Ok(conn.query_row(&sql, [], |row| row.get(0))?)
    };

    Ok(Stats {
        users: count("users")?,
        posts: count("posts")?,
        comments: count("comments")?,
    })
}

pub fn list_users(conn: &Connection) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, email, password_hash, role, created_at
         FROM users ORDER BY created_at, rowid",
    )?;
    let users = stmt
        .query_map([], user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn update_user_role(conn: &Connection, user_id: &str, role: &str) -> AppResult<User> {
    let role: Role = role
        .parse()
        .map_err(|_| AppError::Validation("Invalid role".into()))?;

    let rows = conn.execute(
        "UPDATE users SET role = ?2 WHERE id = ?1",
        params![user_id, role],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound("User"));
    }

    tracing::info!(user_id, role = role.as_str(), "User role updated");
    find_user(conn, user_id)?.ok_or(AppError::NotFound("User"))
}

/// Removes the user together with their posts, comments and votes.
pub fn delete_user(conn: &Connection, user_id: &str) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
    if rows == 0 {
        return Err(AppError::NotFound("User"));
    }
    tracing::info!(user_id, "User deleted");
    Ok(())
}

pub fn list_posts(conn: &Connection) -> AppResult<Vec<Post>> {
    posts::list_all(conn)
}

pub fn delete_post(conn: &Connection, post_id: &str) -> AppResult<()> {
    posts::remove_post(conn, post_id)?;
    tracing::info!(post_id, "Post deleted by admin");
    Ok(())
}

pub fn list_comments(conn: &Connection) -> AppResult<Vec<ModerationComment>> {
    comments::list_for_moderation(conn)
}

pub fn delete_comment(conn: &Connection, comment_id: &str) -> AppResult<()> {
    comments::remove_comment(conn, comment_id)?;
    tracing::info!(comment_id, "Comment deleted by admin");
    Ok(())
}
