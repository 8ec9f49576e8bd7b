//! Helpful votes on posts.
//!
//! One row per (post, user) in `post_votes`. Casting a vote is a single
//! upsert, so a repeat vote overwrites the earlier value instead of adding a
//! second entry, and two users voting at once cannot clobber each other's
//! rows. Tallies are never stored; they are recounted from the full vote list
//! after every write.

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::db::models::{Vote, VoteTally, VoteValue};
use crate::db::now_timestamp;
use crate::error::{AppError, AppResult};

pub fn load_votes(conn: &Connection, post_id: &str) -> AppResult<Vec<Vote>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, value FROM post_votes WHERE post_id = ?1 ORDER BY created_at, rowid",
    )?;
    let votes = stmt
        .query_map(params![post_id], |row| {
            Ok(Vote {
                user: row.get(0)?,
                value: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(votes)
}

pub fn cast_vote(conn: &Connection, post_id: &str, user_id: &str, value: &str) -> AppResult<VoteTally> {
    let value: VoteValue = value
        .parse()
        .map_err(|_| AppError::Validation("Invalid vote value".into()))?;

    // Write lock up front; upgrading a deferred read fails with SQLITE_BUSY.
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let exists = tx
        .query_row("SELECT 1 FROM posts WHERE id = ?1", params![post_id], |_| Ok(()))
        .optional()?
        .is_some();
    if !exists {
        return Err(AppError::NotFound("Post"));
    }

    let now = now_timestamp();
    tx.execute(
        "INSERT INTO post_votes (post_id, user_id, value, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)
         ON CONFLICT(post_id, user_id) DO UPDATE SET
           value = excluded.value,
           updated_at = excluded.updated_at",
        params![post_id, user_id, value, now],
    )?;

    let tally = VoteTally::count(&load_votes(&tx, post_id)?);
    tx.commit()?;

    tracing::debug!(post_id, user_id, value = value.as_str(), "Vote recorded");
    Ok(tally)
}
