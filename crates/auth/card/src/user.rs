//! Users and roles

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Role of a card holder
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Configures machines and programs cards
    #[display("system_administrator")]
    SystemAdministrator,
    /// Runs an election on configured machines
    #[display("election_manager")]
    ElectionManager,
    /// Opens and closes polls
    #[display("poll_worker")]
    PollWorker,
}

impl UserRole {
    /// All roles
    pub const ALL: [Self; 3] = [
        Self::SystemAdministrator,
        Self::ElectionManager,
        Self::PollWorker,
    ];

    /// Wire name stored on the card
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SystemAdministrator => "system_administrator",
            Self::ElectionManager => "election_manager",
            Self::PollWorker => "poll_worker",
        }
    }

    /// Parse a wire name
    pub fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == value)
    }
}

/// A system administrator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SystemAdministratorUser {
    /// Card holder id
    pub user_id: String,
}

/// An election manager, bound to one election
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElectionManagerUser {
    /// Card holder id
    pub user_id: String,
    /// Hash of the election the card was programmed for
    pub election_hash: String,
}

/// A poll worker, bound to one election
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollWorkerUser {
    /// Card holder id
    pub user_id: String,
    /// Hash of the election the card was programmed for
    pub election_hash: String,
}

/// A card holder of any role
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum User {
    /// A system administrator
    SystemAdministrator(SystemAdministratorUser),
    /// An election manager
    ElectionManager(ElectionManagerUser),
    /// A poll worker
    PollWorker(PollWorkerUser),
}

impl User {
    /// Role of this user
    pub const fn role(&self) -> UserRole {
        match self {
            Self::SystemAdministrator(_) => UserRole::SystemAdministrator,
            Self::ElectionManager(_) => UserRole::ElectionManager,
            Self::PollWorker(_) => UserRole::PollWorker,
        }
    }

    /// Card holder id
    pub fn user_id(&self) -> &str {
        match self {
            Self::SystemAdministrator(user) => &user.user_id,
            Self::ElectionManager(user) => &user.user_id,
            Self::PollWorker(user) => &user.user_id,
        }
    }

    /// Election the user is bound to, if the role has one
    pub fn election_hash(&self) -> Option<&str> {
        match self {
            Self::SystemAdministrator(_) => None,
            Self::ElectionManager(user) => Some(&user.election_hash),
            Self::PollWorker(user) => Some(&user.election_hash),
        }
    }
}

/// Generate a fresh card holder id
pub fn generate_user_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes)
}
