use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::auth::gate::ensure_can_mutate;
use crate::auth::token::Identity;
use crate::db::models::{Comment, ModerationComment, PostRef, UserRef};
use crate::db::now_timestamp;
use crate::error::{AppError, AppResult};
use crate::services::posts::post_author;

pub const MAX_COMMENT_CHARS: usize = 200;

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.text, c.author_id, u.username, \
     c.created_at, c.updated_at \
     FROM comments c JOIN users u ON u.id = c.author_id";

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post: row.get(1)?,
        text: row.get(2)?,
        author: UserRef {
            id: row.get(3)?,
            username: row.get(4)?,
        },
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn query_comments<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> AppResult<Vec<Comment>> {
    let mut stmt = conn.prepare(sql)?;
    let comments = stmt
        .query_map(params, comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

/// Text must be 1 to 200 characters, counted as chars rather than bytes.
pub fn validate_text(text: &str) -> AppResult<()> {
    let len = text.chars().count();
    if !(1..=MAX_COMMENT_CHARS).contains(&len) {
        return Err(AppError::Validation(format!(
            "Comment text must be between 1 and {} characters",
            MAX_COMMENT_CHARS
        )));
    }
    Ok(())
}

pub fn get_comment(conn: &Connection, comment_id: &str) -> AppResult<Comment> {
    let sql = format!("{} WHERE c.id = ?1", COMMENT_SELECT);
    conn.query_row(&sql, params![comment_id], comment_from_row)
        .optional()?
        .ok_or(AppError::NotFound("Comment"))
}

fn comment_author(conn: &Connection, comment_id: &str) -> AppResult<String> {
    conn.query_row(
        "SELECT author_id FROM comments WHERE id = ?1",
        params![comment_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(AppError::NotFound("Comment"))
}

pub fn add_comment(conn: &Connection, author_id: &str, post_id: &str, text: &str) -> AppResult<Comment> {
    validate_text(text)?;
    post_author(conn, post_id)?;

    let comment_id = uuid::Uuid::now_v7().to_string();
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO comments (id, post_id, text, author_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![comment_id, post_id, text, author_id, now],
    )?;

    tracing::info!(comment_id = %comment_id, post_id, "Comment added");
    get_comment(conn, &comment_id)
}

/// Comments on a post, oldest first. An unknown post simply has none.
pub fn list_for_post(conn: &Connection, post_id: &str) -> AppResult<Vec<Comment>> {
    let sql = format!(
        "{} WHERE c.post_id = ?1 ORDER BY c.created_at, c.rowid",
        COMMENT_SELECT
    );
    query_comments(conn, &sql, params![post_id])
}

pub fn list_by_author(conn: &Connection, author_id: &str) -> AppResult<Vec<Comment>> {
    let sql = format!(
        "{} WHERE c.author_id = ?1 ORDER BY c.created_at DESC, c.rowid DESC",
        COMMENT_SELECT
    );
    query_comments(conn, &sql, params![author_id])
}

/// Every comment with its post title resolved, newest first.
pub fn list_for_moderation(conn: &Connection) -> AppResult<Vec<ModerationComment>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, p.id, p.title, c.text, u.id, u.username, c.created_at, c.updated_at
         FROM comments c
         JOIN posts p ON p.id = c.post_id
         JOIN users u ON u.id = c.author_id
         ORDER BY c.created_at DESC, c.rowid DESC",
    )?;
    let comments = stmt
        .query_map([], |row| {
            Ok(ModerationComment {
                id: row.get(0)?,
                post: PostRef {
                    id: row.get(1)?,
                    title: row.get(2)?,
                },
                text: row.get(3)?,
                author: UserRef {
                    id: row.get(4)?,
                    username: row.get(5)?,
                },
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

pub fn edit_comment(
    conn: &Connection,
    actor: &Identity,
    comment_id: &str,
    text: &str,
) -> AppResult<Comment> {
    validate_text(text)?;
    let author_id = comment_author(conn, comment_id)?;
    ensure_can_mutate(&actor.id, actor.role, &author_id)?;

    conn.execute(
        "UPDATE comments SET text = ?2, updated_at = ?3 WHERE id = ?1",
        params![comment_id, text, now_timestamp()],
    )?;

    get_comment(conn, comment_id)
}

pub fn delete_comment(conn: &Connection, actor: &Identity, comment_id: &str) -> AppResult<()> {
    let author_id = comment_author(conn, comment_id)?;
    ensure_can_mutate(&actor.id, actor.role, &author_id)?;
    remove_comment(conn, comment_id)?;
    tracing::info!(comment_id, actor = %actor.id, "Comment deleted");
    Ok(())
}

pub(crate) fn remove_comment(conn: &Connection, comment_id: &str) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![comment_id])?;
    if rows == 0 {
        return Err(AppError::NotFound("Comment"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::db::test_pool;
    use crate::services::posts::{create_post, remove_post};
    use crate::services::testing::insert_user;

    fn identity(id: &str, role: Role) -> Identity {
        Identity {
            id: id.to_string(),
            role,
        }
    }

    #[test]
    fn text_bounds() {
        assert!(validate_text("").is_err());
        assert!(validate_text("x").is_ok());
        assert!(validate_text(&"x".repeat(200)).is_ok());
        assert!(validate_text(&"x".repeat(201)).is_err());
        // 200 multi-byte characters are still 200 characters.
        assert!(validate_text(&"é".repeat(200)).is_ok());
    }

    #[test]
    fn add_comment_requires_existing_post() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = insert_user(&conn, "alice", Role::User);

        assert!(matches!(
            add_comment(&conn, &alice, "missing", "hi"),
            Err(AppError::NotFound("Post"))
        ));
    }

    #[test]
    fn comment_lengths_at_the_boundaries() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = insert_user(&conn, "alice", Role::User);
        let post = create_post(&conn, &alice, "Title", "Body").unwrap();

        assert!(add_comment(&conn, &alice, &post.id, "x").is_ok());
        assert!(add_comment(&conn, &alice, &post.id, &"x".repeat(200)).is_ok());
        assert!(matches!(
            add_comment(&conn, &alice, &post.id, ""),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            add_comment(&conn, &alice, &post.id, &"x".repeat(201)),
            Err(AppError::Validation(_))
        ));
        assert_eq!(list_for_post(&conn, &post.id).unwrap().len(), 2);
    }

    #[test]
    fn edit_and_delete_follow_owner_or_admin() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = insert_user(&conn, "alice", Role::User);
        let bob = insert_user(&conn, "bob", Role::User);
        let root = insert_user(&conn, "root", Role::Admin);
        let post = create_post(&conn, &alice, "Title", "Body").unwrap();
        let comment = add_comment(&conn, &bob, &post.id, "first").unwrap();

        // The post author does not own other people's comments.
        assert!(matches!(
            edit_comment(&conn, &identity(&alice, Role::User), &comment.id, "edited"),
            Err(AppError::Forbidden)
        ));

        let edited = edit_comment(&conn, &identity(&bob, Role::User), &comment.id, "edited").unwrap();
        assert_eq!(edited.text, "edited");
        assert!(matches!(
            edit_comment(&conn, &identity(&bob, Role::User), &comment.id, ""),
            Err(AppError::Validation(_))
        ));

        delete_comment(&conn, &identity(&root, Role::Admin), &comment.id).unwrap();
        assert!(matches!(
            delete_comment(&conn, &identity(&root, Role::Admin), &comment.id),
            Err(AppError::NotFound("Comment"))
        ));
    }

    #[test]
    fn deleting_post_removes_its_comments() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = insert_user(&conn, "alice", Role::User);
        let post = create_post(&conn, &alice, "Title", "Body").unwrap();
        add_comment(&conn, &alice, &post.id, "hello").unwrap();

        remove_post(&conn, &post.id).unwrap();
        assert!(list_by_author(&conn, &alice).unwrap().is_empty());
    }

    #[test]
    fn moderation_view_resolves_post_title() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = insert_user(&conn, "alice", Role::User);
        let post = create_post(&conn, &alice, "Title", "Body").unwrap();
        add_comment(&conn, &alice, &post.id, "hello").unwrap();

        let listed = list_for_moderation(&conn).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].post.title, "Title");
        assert_eq!(listed[0].author.username, "alice");
    }
}
