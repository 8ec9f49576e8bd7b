//! Credential store: registration, login and profile lookup.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::Serialize;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::TokenService;
use crate::db::models::{Comment, Post, Role, User};
use crate::db::now_timestamp;
use crate::error::{AppError, AppResult};
use crate::services::{comments, posts};
use crate::state::DbPool;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn find_user(conn: &Connection, user_id: &str) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    Ok(conn
        .query_row(&sql, params![user_id], user_from_row)
        .optional()?)
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
    Ok(conn
        .query_row(&sql, params![normalize_email(email)], user_from_row)
        .optional()?)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create a user with role `user`. The email must not already be registered.
pub async fn register(
    pool: &DbPool,
    bcrypt_cost: u32,
    username: &str,
    email: &str,
    password: &str,
) -> AppResult<User> {
    let username = username.trim();
    let email = normalize_email(email);
    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AppError::Validation("Please provide all fields".into()));
    }

    {
        let conn = pool.get()?;
        if find_user_by_email(&conn, &email)?.is_some() {
            return Err(AppError::DuplicateEmail);
        }
    }

    let password_hash = hash_password(password.to_string(), bcrypt_cost).await?;

    let user = User {
        id: uuid::Uuid::now_v7().to_string(),
        username: username.to_string(),
        email,
        password_hash,
        role: Role::User,
        created_at: now_timestamp(),
    };

    let conn = pool.get()?;
    let inserted = conn.execute(
        "INSERT INTO users (id, username, email, password_hash, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id,
            user.username,
            user.email,
            user.password_hash,
            user.role,
            user.created_at
        ],
    );

    match inserted {
        Ok(_) => {
            tracing::info!(user_id = %user.id, "Registered user {}", user.username);
            Ok(user)
        }
        // Lost a race with a concurrent registration for the same email.
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(AppError::DuplicateEmail)
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

/// Check credentials and issue a token. Unknown email and wrong password
/// produce the same error.
pub async fn login(
    pool: &DbPool,
    tokens: &TokenService,
    email: &str,
    password: &str,
) -> AppResult<LoginOutcome> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::Validation("Please provide all fields".into()));
    }

    let user = {
        let conn = pool.get()?;
        find_user_by_email(&conn, email)?
    };

    let Some(user) = user else {
        tracing::warn!("Login failed: invalid credentials");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(password.to_string(), user.password_hash.clone()).await? {
        tracing::warn!(user_id = %user.id, "Login failed: invalid credentials");
        return Err(AppError::InvalidCredentials);
    }

    let token = tokens.issue(&user.id, user.role)?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(LoginOutcome { token, user })
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub user: User,
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
}

pub fn get_profile(conn: &Connection, user_id: &str) -> AppResult<Profile> {
    let user = find_user(conn, user_id)?.ok_or(AppError::NotFound("User"))?;
    let posts = posts::list_by_author(conn, user_id)?;
    let comments = comments::list_by_author(conn, user_id)?;
    Ok(Profile {
        user,
        posts,
        comments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::MIN_BCRYPT_COST;
    use crate::db::test_pool;
    use chrono::Duration;

    fn tokens() -> TokenService {
        TokenService::new("test-secret", Duration::days(1)).unwrap()
    }

    #[tokio::test]
    async fn register_succeeds_once_per_email() {
        let pool = test_pool();
        let user = register(&pool, MIN_BCRYPT_COST, "alice", "alice@example.com", "pw")
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);
        assert_ne!(user.password_hash, "pw");

        let again = register(&pool, MIN_BCRYPT_COST, "other", "alice@example.com", "different").await;
        assert!(matches!(again, Err(AppError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn register_treats_email_case_insensitively() {
        let pool = test_pool();
        register(&pool, MIN_BCRYPT_COST, "alice", "Alice@Example.com", "pw")
            .await
            .unwrap();
        let again = register(&pool, MIN_BCRYPT_COST, "alice2", " alice@example.com ", "pw").await;
        assert!(matches!(again, Err(AppError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn register_rejects_empty_fields() {
        let pool = test_pool();
        for (username, email, password) in [
            ("", "a@example.com", "pw"),
            ("alice", "  ", "pw"),
            ("alice", "a@example.com", ""),
        ] {
            let result = register(&pool, MIN_BCRYPT_COST, username, email, password).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn login_issues_verifiable_token() {
        let pool = test_pool();
        let tokens = tokens();
        let user = register(&pool, MIN_BCRYPT_COST, "alice", "alice@example.com", "pw")
            .await
            .unwrap();

        let outcome = login(&pool, &tokens, "alice@example.com", "pw").await.unwrap();
        let identity = tokens.verify(&outcome.token).unwrap();
        assert_eq!(identity.id, user.id);
        assert_eq!(identity.role, Role::User);
        assert_eq!(outcome.user.username, "alice");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_identically() {
        let pool = test_pool();
        let tokens = tokens();
        register(&pool, MIN_BCRYPT_COST, "alice", "alice@example.com", "pw")
            .await
            .unwrap();

        let wrong = login(&pool, &tokens, "alice@example.com", "nope")
            .await
            .unwrap_err();
        let unknown = login(&pool, &tokens, "bob@example.com", "pw")
            .await
            .unwrap_err();

        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn profile_of_deleted_user_is_not_found() {
        let pool = test_pool();
        let user = register(&pool, MIN_BCRYPT_COST, "alice", "alice@example.com", "pw")
            .await
            .unwrap();

        let conn = pool.get().unwrap();
        let profile = get_profile(&conn, &user.id).unwrap();
        assert_eq!(profile.user.id, user.id);
        assert!(profile.posts.is_empty());
        assert!(profile.comments.is_empty());

        conn.execute("DELETE FROM users WHERE id = ?1", params![user.id])
            .unwrap();
        assert!(matches!(
            get_profile(&conn, &user.id),
            Err(AppError::NotFound("User"))
        ));
    }
}
