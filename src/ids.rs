//! User identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A seat's identity, whether human or bot.
///
/// The empty string is reserved for the dealer (§3: "Belongs to a user (or
/// the dealer, user-id \"\")").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// The dealer's reserved id.
    pub const DEALER: &'static str = "";

    /// Returns the dealer id.
    #[must_use]
    pub fn dealer() -> Self {
        Self(String::new())
    }

    /// Whether this id is the dealer's.
    #[must_use]
    pub fn is_dealer(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
