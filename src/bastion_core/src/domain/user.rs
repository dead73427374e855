use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

pub const ROLE_ROOT: &str = "ROOT";
pub const ROLE_ADMINISTRATOR: &str = "ROOT.ADMIN";

/// A verified principal resolved by a [`UserProvider`](crate::ports::repositories::UserProvider).
pub trait User: Send + Sync + fmt::Debug {
    fn username(&self) -> &str;

    /// Stored credentials, compared by a password encoder against the claimed ones.
    fn credentials(&self) -> Secret<String>;

    fn roles(&self) -> &[String];

    /// Drops the stored credentials once verification is done.
    ///
    /// Returns `false` for user types that cannot erase them.
    fn erase_credentials(&self) -> bool {
        false
    }

    /// Administrative status flags, `None` for users without them.
    fn account_status(&self) -> Option<AccountStatus> {
        None
    }
}

pub type SharedUser = Arc<dyn User>;

/// Reason an existing account is refused, in evaluation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountRestriction {
    Blocked,
    Hidden,
    Deactivated,
}

impl fmt::Display for AccountRestriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRestriction::Blocked => write!(f, "blocked"),
            AccountRestriction::Hidden => write!(f, "hidden"),
            AccountRestriction::Deactivated => write!(f, "deactivated"),
        }
    }
}

/// Account status flag set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountStatus(u8);

impl AccountStatus {
    pub const NONE: Self = Self(0);
    pub const INTERNAL: Self = Self(1);
    pub const HIDDEN: Self = Self(2);
    pub const BLOCKED: Self = Self(4);
    pub const DEACTIVATED: Self = Self(8);

    const ALL: u8 = 1 | 2 | 4 | 8;

    /// Unknown bits are dropped.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parses a single flag name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "INTERNAL" => Some(Self::INTERNAL),
            "HIDDEN" => Some(Self::HIDDEN),
            "BLOCKED" => Some(Self::BLOCKED),
            "DEACTIVATED" => Some(Self::DEACTIVATED),
            _ => None,
        }
    }

    /// The restriction that applies, checking blocked, then hidden, then deactivated.
    pub fn restriction(self) -> Option<AccountRestriction> {
        if self.contains(Self::BLOCKED) {
            Some(AccountRestriction::Blocked)
        } else if self.contains(Self::HIDDEN) {
            Some(AccountRestriction::Hidden)
        } else if self.contains(Self::DEACTIVATED) {
            Some(AccountRestriction::Deactivated)
        } else {
            None
        }
    }
}

impl BitOr for AccountStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Username, credentials and roles.
pub struct SimpleUser {
    username: String,
    credentials: Secret<String>,
    roles: Vec<String>,
}

impl SimpleUser {
    pub fn new<R, S>(username: impl Into<String>, credentials: impl Into<String>, roles: R) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            credentials: Secret::new(credentials.into()),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Debug for SimpleUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleUser")
            .field("username", &self.username)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

impl User for SimpleUser {
    fn username(&self) -> &str {
        &self.username
    }

    fn credentials(&self) -> Secret<String> {
        Secret::new(self.credentials.expose_secret().clone())
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }
}

/// A [`SimpleUser`] carrying account status flags.
#[derive(Debug)]
pub struct AdvancedUser {
    user: SimpleUser,
    status: AccountStatus,
}

impl AdvancedUser {
    pub fn new(user: SimpleUser, status: AccountStatus) -> Self {
        Self { user, status }
    }
}

impl User for AdvancedUser {
    fn username(&self) -> &str {
        self.user.username()
    }

    fn credentials(&self) -> Secret<String> {
        self.user.credentials()
    }

    fn roles(&self) -> &[String] {
        self.user.roles()
    }

    fn account_status(&self) -> Option<AccountStatus> {
        Some(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restriction_follows_priority_order() {
        assert_eq!(AccountStatus::NONE.restriction(), None);
        assert_eq!(AccountStatus::INTERNAL.restriction(), None);
        assert_eq!(
            AccountStatus::BLOCKED.restriction(),
            Some(AccountRestriction::Blocked)
        );
        assert_eq!(
            AccountStatus::HIDDEN.restriction(),
            Some(AccountRestriction::Hidden)
        );
        assert_eq!(
            AccountStatus::DEACTIVATED.restriction(),
            Some(AccountRestriction::Deactivated)
        );
        assert_eq!(
            (AccountStatus::BLOCKED | AccountStatus::HIDDEN).restriction(),
            Some(AccountRestriction::Blocked)
        );
        assert_eq!(
            (AccountStatus::HIDDEN | AccountStatus::DEACTIVATED).restriction(),
            Some(AccountRestriction::Hidden)
        );
    }

    #[test]
    fn unknown_bits_are_dropped() {
        let status = AccountStatus::from_bits_truncate(0xF4);
        assert_eq!(status, AccountStatus::BLOCKED);
    }

    #[test]
    fn flag_names_parse_case_insensitively() {
        assert_eq!(AccountStatus::from_name("blocked"), Some(AccountStatus::BLOCKED));
        assert_eq!(AccountStatus::from_name(" Hidden "), Some(AccountStatus::HIDDEN));
        assert_eq!(AccountStatus::from_name("banned"), None);
    }

    #[test]
    fn simple_user_cannot_erase_credentials() {
        let user = SimpleUser::new("admin", "12345", ["ROOT"]);
        assert!(!user.erase_credentials());
        assert_eq!(user.credentials().expose_secret(), "12345");
        assert_eq!(user.account_status(), None);
    }

    #[test]
    fn debug_output_omits_credentials() {
        let user = SimpleUser::new("admin", "12345", Vec::<String>::new());
        assert!(!format!("{user:?}").contains("12345"));
    }
}
