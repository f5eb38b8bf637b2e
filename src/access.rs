//! Single-owner access check applied to every incoming interaction.

use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessGuard {
    owner_id: Option<u64>,
}

impl AccessGuard {
    /// `owner_id` of `None` or `Some(0)` leaves the bot open to everyone
    pub fn new(owner_id: Option<u64>) -> Self {
        Self {
            owner_id: owner_id.filter(|id| *id != 0),
        }
    }

    pub fn is_allowed(&self, user_id: u64) -> bool {
        match self.owner_id {
            Some(owner) if owner != user_id => {
                debug!(user_id, "Access denied");
                false
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_guard_allows_everyone() {
        assert!(AccessGuard::new(None).is_allowed(42));
        assert!(AccessGuard::new(Some(0)).is_allowed(42));
    }

    #[test]
    fn test_owner_only() {
        let guard = AccessGuard::new(Some(1001));
        assert!(guard.is_allowed(1001));
        assert!(!guard.is_allowed(1002));
    }
}
