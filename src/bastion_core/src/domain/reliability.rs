use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ordered trust tier attached to an [`Identity`](super::identity::Identity).
///
/// The value reflects how the claim reached the server: a bare anonymous cookie
/// is worth less than an HTTP header, which is worth less than a freshly
/// submitted login form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reliability(u16);

impl Reliability {
    pub const MINIMUM: Self = Self(0);
    pub const ANONYMOUS: Self = Self(10);
    pub const HTTP: Self = Self(100);
    pub const REMEMBER_ME: Self = Self(150);
    pub const SESSION: Self = Self(200);
    pub const HTML_FORM: Self = Self(500);
    pub const MAXIMUM: Self = Self(1000);

    /// Values above [`Reliability::MAXIMUM`] saturate.
    pub fn new(value: u16) -> Self {
        Self(value.min(Self::MAXIMUM.0))
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    /// Lowers the value to `ceiling` if it exceeds it. Never raises.
    pub fn clamp_to(self, ceiling: Reliability) -> Self {
        self.min(ceiling)
    }

    pub fn is_anonymous(self) -> bool {
        self <= Self::ANONYMOUS
    }
}

impl Default for Reliability {
    fn default() -> Self {
        Self::MINIMUM
    }
}

impl fmt::Display for Reliability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Reliability {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u16>().map(Self::new)
    }
}
