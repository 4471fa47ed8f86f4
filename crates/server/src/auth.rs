//! Bearer tokens issued by the identity service.
//!
//! The server only reads this table; issuing and revoking tokens happens
//! elsewhere.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: Option<DateTimeUtc>,
    pub revoked: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A token is usable until it is revoked or its expiry has passed.
    pub fn is_valid_at(&self, now: DateTimeUtc) -> bool {
        !self.revoked && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn token(expires_at: Option<DateTimeUtc>, revoked: bool) -> Model {
        Model {
            token: "t".to_string(),
            user_id: Uuid::nil(),
            expires_at,
            revoked,
        }
    }

    #[test]
    fn tokens_without_expiry_stay_valid() {
        assert!(token(None, false).is_valid_at(Utc::now()));
    }

    #[test]
    fn expired_or_revoked_tokens_are_rejected() {
        let now = Utc::now();
        assert!(!token(Some(now - Duration::minutes(1)), false).is_valid_at(now));
        assert!(!token(Some(now), false).is_valid_at(now));
        assert!(!token(None, true).is_valid_at(now));
        assert!(token(Some(now + Duration::hours(1)), false).is_valid_at(now));
    }
}
