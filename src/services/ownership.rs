//! Ownership checks for videos and comments
//!
//! A pure predicate: the acting account must be the resource owner. Applied
//! before any mutation or storage call so a denial never leaves partial
//! writes. Deliberately distinct from NotFound so clients can tell "doesn't
//! exist" from "exists but not yours".

use super::error::ApiError;

/// Allowed iff the actor is the owner. Only the verified token's embedded
/// account id is ever passed as `actor`; client-supplied identifiers are
/// never consulted.
pub fn authorize(actor_account_id: i64, owner_account_id: i64) -> Result<(), ApiError> {
    if actor_account_id == owner_account_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "you do not own this resource".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_allowed() {
        assert!(authorize(1, 1).is_ok());
        assert!(authorize(i64::MAX, i64::MAX).is_ok());
    }

    #[test]
    fn test_non_owner_denied() {
        assert!(matches!(authorize(1, 2), Err(ApiError::Forbidden(_))));
        assert!(matches!(authorize(2, 1), Err(ApiError::Forbidden(_))));
    }
}
