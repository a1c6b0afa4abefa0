/// Access policy: which Telegram users may drive the bot.
use std::collections::HashSet;

use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    /// Allowed user ids. Empty means everyone is allowed.
    pub allowlist: HashSet<u64>,
}

impl AccessPolicy {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn only(users: impl IntoIterator<Item = u64>) -> Self {
        Self { allowlist: users.into_iter().collect() }
    }

    pub fn is_open(&self) -> bool {
        self.allowlist.is_empty()
    }

    /// Same answer as [`AccessPolicy::is_allowed`] without logging.
    pub fn permits(&self, user: u64) -> bool {
        self.is_open() || self.allowlist.contains(&user)
    }

    pub fn is_allowed(&self, user: u64) -> bool {
        let allowed = self.permits(user);
        if !allowed {
            warn!(user, "User not in allowlist");
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_policy_allows_anyone() {
        assert!(AccessPolicy::open().is_allowed(42));
    }

    #[test]
    fn allowlist_enforced() {
        let policy = AccessPolicy::only([7, 8]);
        assert!(policy.is_allowed(7));
        assert!(!policy.is_allowed(9));
    }
}
