//! Role Model

use serde::{Deserialize, Serialize};

/// Acting role resolved by the external authentication layer
///
/// The lifecycle state machine consumes this as an opaque capability input;
/// it never performs authentication itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Kitchen,
    Waiter,
    Manager,
    /// Automated policies (timeouts, abandonment cleanup)
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Kitchen => write!(f, "KITCHEN"),
            Role::Waiter => write!(f, "WAITER"),
            Role::Manager => write!(f, "MANAGER"),
            Role::System => write!(f, "SYSTEM"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "KITCHEN" => Ok(Role::Kitchen),
            "WAITER" => Ok(Role::Waiter),
            "MANAGER" => Ok(Role::Manager),
            "SYSTEM" => Ok(Role::System),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}
