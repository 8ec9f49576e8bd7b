use crate::db::models::Role;
use crate::error::{AppError, AppResult};

/// Owner-or-admin rule for mutating a post or comment.
pub fn can_mutate(actor_id: &str, actor_role: Role, resource_author_id: &str) -> bool {
    match actor_role {
        Role::Admin => true,
        Role::User => actor_id == resource_author_id,
    }
}

pub fn ensure_can_mutate(
    actor_id: &str,
    actor_role: Role,
    resource_author_id: &str,
) -> AppResult<()> {
    if can_mutate(actor_id, actor_role, resource_author_id) {
        Ok(())
    } else {
        tracing::warn!(actor = actor_id, "Mutation denied: not owner or admin");
        Err(AppError::Forbidden)
    }
}

/// Author-only rule for rewriting a post. Admins get no exception here.
pub fn ensure_author(actor_id: &str, resource_author_id: &str) -> AppResult<()> {
    if actor_id == resource_author_id {
        Ok(())
    } else {
        tracing::warn!(actor = actor_id, "Edit denied: not the author");
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_may_mutate() {
        assert!(can_mutate("u", Role::User, "u"));
    }

    #[test]
    fn other_user_may_not_mutate() {
        assert!(!can_mutate("v", Role::User, "u"));
        assert!(matches!(
            ensure_can_mutate("v", Role::User, "u"),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn admin_may_mutate_anything() {
        assert!(can_mutate("v", Role::Admin, "u"));
        assert!(can_mutate("u", Role::Admin, "u"));
        assert!(ensure_can_mutate("anyone", Role::Admin, "u").is_ok());
    }

    #[test]
    fn only_the_author_passes_author_check() {
        assert!(ensure_author("u", "u").is_ok());
        assert!(matches!(ensure_author("v", "u"), Err(AppError::Forbidden)));
    }
}
