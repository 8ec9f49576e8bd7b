use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Account role. Closed set: anything else is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A helpful/not-helpful vote on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteValue::Up => "up",
            VoteValue::Down => "down",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown vote value: {0}")]
pub struct UnknownVoteValue(pub String);

impl FromStr for VoteValue {
    type Err = UnknownVoteValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteValue::Up),
            "down" => Ok(VoteValue::Down),
            other => Err(UnknownVoteValue(other.to_string())),
        }
    }
}

impl ToSql for VoteValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for VoteValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Stored user record. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: String,
}

/// A user reference resolved to its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vote {
    pub user: String,
    pub value: VoteValue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub up_votes: usize,
    pub down_votes: usize,
}

impl VoteTally {
    /// Full re-scan of a vote list.
    pub fn count(votes: &[Vote]) -> Self {
        votes.iter().fold(VoteTally::default(), |mut tally, vote| {
            match vote.value {
                VoteValue::Up => tally.up_votes += 1,
                VoteValue::Down => tally.down_votes += 1,
            }
            tally
        })
    }

    pub fn voters(&self) -> usize {
        self.up_votes + self.down_votes
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: UserRef,
    pub helpful_votes: Vec<Vote>,
    #[serde(flatten)]
    pub tally: VoteTally,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post: String,
    pub text: String,
    pub author: UserRef,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRef {
    pub id: String,
    pub title: String,
}

/// Moderation view of a comment: the post is resolved to its title.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationComment {
    pub id: String,
    pub post: PostRef,
    pub text: String,
    pub author: UserRef,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_only_known_values() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("Admin".parse::<Role>().is_err());
        assert!("moderator".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn vote_value_parses_only_up_and_down() {
        assert_eq!("up".parse::<VoteValue>().unwrap(), VoteValue::Up);
        assert_eq!("down".parse::<VoteValue>().unwrap(), VoteValue::Down);
        assert!("sideways".parse::<VoteValue>().is_err());
    }

    #[test]
    fn tally_counts_each_value() {
        let votes = vec![
            Vote { user: "a".into(), value: VoteValue::Up },
            Vote { user: "b".into(), value: VoteValue::Down },
            Vote { user: "c".into(), value: VoteValue::Up },
        ];
        let tally = VoteTally::count(&votes);
        assert_eq!(tally.up_votes, 2);
        assert_eq!(tally.down_votes, 1);
        assert_eq!(tally.voters(), 3);
        assert_eq!(VoteTally::count(&[]), VoteTally::default());
    }

    #[test]
    fn user_serialization_omits_password_hash() {
        let user = User {
            id: "u1".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$2b$10$secret".into(),
            role: Role::User,
            created_at: "2024-01-01T00:00:00.000Z".into(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn post_serializes_tally_inline() {
        let post = Post {
            id: "p1".into(),
            title: "t".into(),
            content: "c".into(),
            author: UserRef { id: "u1".into(), username: "alice".into() },
            helpful_votes: vec![Vote { user: "u2".into(), value: VoteValue::Down }],
            tally: VoteTally { up_votes: 0, down_votes: 1 },
            created_at: "now".into(),
            updated_at: "now".into(),
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["upVotes"], 0);
        assert_eq!(json["downVotes"], 1);
        assert_eq!(json["helpfulVotes"][0]["value"], "down");
        assert_eq!(json["author"]["username"], "alice");
    }
}
