//! # Authorization context
//!
//! Every handler receives an explicit [`AuthzContext`] built by the API
//! layer from the request's session token; authorization never reads
//! ambient/global state.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Community, User};

/// Who is calling, and what standing do they have right now.
#[derive(Debug, Clone)]
pub struct AuthzContext {
    pub user_id: Uuid,
    pub is_global_moderator: bool,
    pub banned_until: Option<DateTime<Utc>>,
}

impl AuthzContext {
    pub fn for_user(user: &User) -> Self {
        AuthzContext {
            user_id: user.id,
            is_global_moderator: user.is_global_moderator,
            banned_until: user.banned_until,
        }
    }

    pub fn is_banned_at(&self, now: DateTime<Utc>) -> bool {
        self.banned_until.is_some_and(|until| until > now)
    }

    /// Mutations are rejected for the whole ban window.
    pub fn ensure_not_banned(&self, now: DateTime<Utc>) -> Result<()> {
        if self.is_banned_at(now) {
            return Err(AppError::Unauthorized(format!(
                "banned until {}",
                self.banned_until.unwrap_or(now)
            )));
        }
        Ok(())
    }

    /// Moderator-class: community owner, community moderator, or global
    /// moderator.
    pub fn can_moderate(&self, community: &Community) -> bool {
        self.is_global_moderator
            || community.owner_id == self.user_id
            || community.moderators.contains(&self.user_id)
    }

    pub fn ensure_can_moderate(&self, community: &Community) -> Result<()> {
        if !self.can_moderate(community) {
            return Err(AppError::Unauthorized(format!(
                "not a moderator of {}",
                community.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::RuleList;
    use chrono::Duration;

    fn community(owner: Uuid, moderators: Vec<Uuid>) -> Community {
        Community {
            id: Uuid::now_v7(),
            name: "cats".to_string(),
            description: None,
            image_url: None,
            logo_url: None,
            rules: RuleList::new(),
            owner_id: owner,
            moderators,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_ban_window_is_temporal() {
        let now = Utc::now();
        let ctx = AuthzContext {
            user_id: Uuid::now_v7(),
            is_global_moderator: false,
            banned_until: Some(now + Duration::hours(1)),
        };
        assert!(ctx.ensure_not_banned(now).is_err());
        // Once the window passes, the same context is clean again.
        assert!(ctx.ensure_not_banned(now + Duration::hours(2)).is_ok());
    }

    #[test]
    fn test_moderator_classes() {
        let owner = Uuid::now_v7();
        let moderator = Uuid::now_v7();
        let outsider = Uuid::now_v7();
        let c = community(owner, vec![moderator]);

        let ctx = |user_id, global| AuthzContext {
            user_id,
            is_global_moderator: global,
            banned_until: None,
        };

        assert!(ctx(owner, false).can_moderate(&c));
        assert!(ctx(moderator, false).can_moderate(&c));
        assert!(ctx(outsider, true).can_moderate(&c));
        assert!(!ctx(outsider, false).can_moderate(&c));
        assert!(ctx(outsider, false).ensure_can_moderate(&c).is_err());
    }
}
