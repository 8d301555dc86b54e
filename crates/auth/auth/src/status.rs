//! Auth status

use std::time::SystemTime;

use serde::Serialize;
use vxauth_card::{
    CardStatus, ElectionManagerUser, PollWorkerUser, SystemAdministratorUser, User, UserRole,
};

/// Why nobody is logged in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggedOutReason {
    /// The machine is locked and waiting for a card
    MachineLocked,
    /// The previous session ran past its time limit
    MachineLockedBySessionExpiry,
    /// The card in the reader could not be read
    CardError,
    /// The card holds no usable identity
    InvalidUserOnCard,
    /// The card's role is not allowed on this machine
    UserRoleNotAllowed,
    /// The card needs an election and the machine has none
    MachineNotConfigured,
    /// The election manager card is for another election
    ElectionManagerWrongElection,
    /// The poll worker card is for another election
    PollWorkerWrongElection,
}

impl LoggedOutReason {
    /// Whether this reason came from rejecting a readable card
    pub const fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidUserOnCard
                | Self::UserRoleNotAllowed
                | Self::MachineNotConfigured
                | Self::ElectionManagerWrongElection
                | Self::PollWorkerWrongElection
        )
    }
}

/// The card in the reader as seen by a logged-in system administrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgrammableCard {
    /// No reader is attached
    NoCardReader,
    /// The driver reported an error
    UnknownError,
    /// The reader is empty
    NoCard,
    /// A card is present but could not be read
    CardError,
    /// A card is ready to be programmed
    Ready {
        /// Who the card is currently programmed for
        programmed_user: Option<User>,
    },
}

impl From<&CardStatus> for ProgrammableCard {
    fn from(status: &CardStatus) -> Self {
        match status {
            CardStatus::NoCardReader => Self::NoCardReader,
            CardStatus::UnknownError => Self::UnknownError,
            CardStatus::NoCard => Self::NoCard,
            CardStatus::CardError => Self::CardError,
            CardStatus::Ready(details) => Self::Ready {
                programmed_user: details.as_ref().map(|details| details.user()),
            },
        }
    }
}

/// A logged-in session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum LoggedIn {
    /// A system administrator, who can program the card in the reader
    SystemAdministrator {
        /// The user
        user: SystemAdministratorUser,
        /// When the session ends
        session_expires_at: SystemTime,
        /// The card in the reader
        programmable_card: ProgrammableCard,
    },
    /// An election manager
    ElectionManager {
        /// The user
        user: ElectionManagerUser,
        /// When the session ends
        session_expires_at: SystemTime,
    },
    /// A poll worker
    PollWorker {
        /// The user
        user: PollWorkerUser,
        /// When the session ends
        session_expires_at: SystemTime,
    },
}

impl LoggedIn {
    /// Start a session for `user`
    ///
    /// The card was just removed, so a system administrator starts with an
    /// empty reader.
    pub fn new(user: User, session_expires_at: SystemTime) -> Self {
        match user {
            User::SystemAdministrator(user) => Self::SystemAdministrator {
                user,
                session_expires_at,
                programmable_card: ProgrammableCard::NoCard,
            },
            User::ElectionManager(user) => Self::ElectionManager {
                user,
                session_expires_at,
            },
            User::PollWorker(user) => Self::PollWorker {
                user,
                session_expires_at,
            },
        }
    }

    /// The logged-in user
    pub fn user(&self) -> User {
        match self {
            Self::SystemAdministrator { user, .. } => User::SystemAdministrator(user.clone()),
            Self::ElectionManager { user, .. } => User::ElectionManager(user.clone()),
            Self::PollWorker { user, .. } => User::PollWorker(user.clone()),
        }
    }

    /// When the session ends
    pub const fn session_expires_at(&self) -> SystemTime {
        match self {
            Self::SystemAdministrator {
                session_expires_at, ..
            }
            | Self::ElectionManager {
                session_expires_at, ..
            }
            | Self::PollWorker {
                session_expires_at, ..
            } => *session_expires_at,
        }
    }
}

/// Where the machine is in the login flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthStatus {
    /// Nobody is logged in
    LoggedOut {
        /// Why
        reason: LoggedOutReason,
        /// Role on the rejected card, when one was read
        card_user_role: Option<UserRole>,
    },
    /// A valid card is in the reader and its PIN is being asked for
    CheckingPin {
        /// The card holder
        user: User,
        /// When the last wrong PIN was entered
        wrong_pin_entered_at: Option<SystemTime>,
        /// PIN checks are ignored until this time
        locked_out_until: Option<SystemTime>,
    },
    /// Authenticated, waiting for the card to be taken out
    RemoveCard {
        /// The card holder
        user: User,
        /// When the session will end
        session_expires_at: SystemTime,
    },
    /// A session is active
    LoggedIn(LoggedIn),
}

impl Default for AuthStatus {
    fn default() -> Self {
        Self::logged_out(LoggedOutReason::MachineLocked)
    }
}

impl AuthStatus {
    /// Logged out for `reason`
    pub const fn logged_out(reason: LoggedOutReason) -> Self {
        Self::LoggedOut {
            reason,
            card_user_role: None,
        }
    }

    /// Short name of the status, for logs
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LoggedOut { .. } => "logged_out",
            Self::CheckingPin { .. } => "checking_pin",
            Self::RemoveCard { .. } => "remove_card",
            Self::LoggedIn(_) => "logged_in",
        }
    }

    /// Whether a session is active
    pub const fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn(_))
    }

    /// Whether a system administrator session is active
    pub const fn is_logged_in_as_system_administrator(&self) -> bool {
        matches!(self, Self::LoggedIn(LoggedIn::SystemAdministrator { .. }))
    }

    /// The user this status is about, if any
    pub fn user(&self) -> Option<User> {
        match self {
            Self::LoggedOut { .. } => None,
            Self::CheckingPin { user, .. } | Self::RemoveCard { user, .. } => Some(user.clone()),
            Self::LoggedIn(logged_in) => Some(logged_in.user()),
        }
    }

    /// Whether PIN checks are being ignored at `now`
    pub fn is_locked_out(&self, now: SystemTime) -> bool {
        match self {
            Self::CheckingPin {
                locked_out_until: Some(until),
                ..
            } => now < *until,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use vxauth_card::CardDetails;

    use super::*;

    fn admin() -> User {
        User::SystemAdministrator(SystemAdministratorUser {
            user_id: "admin".into(),
        })
    }

    #[test]
    fn test_programmable_card_from_card_status() {
        assert_eq!(
            ProgrammableCard::from(&CardStatus::NoCard),
            ProgrammableCard::NoCard
        );
        assert_eq!(
            ProgrammableCard::from(&CardStatus::Ready(None)),
            ProgrammableCard::Ready {
                programmed_user: None
            }
        );
        let details = CardDetails::new(admin(), true, 0);
        assert_eq!(
            ProgrammableCard::from(&CardStatus::Ready(Some(details))),
            ProgrammableCard::Ready {
                programmed_user: Some(admin())
            }
        );
    }

    #[test]
    fn test_locked_out_window() {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let status = AuthStatus::CheckingPin {
            user: admin(),
            wrong_pin_entered_at: Some(at),
            locked_out_until: Some(at + Duration::from_secs(15)),
        };
        assert!(status.is_locked_out(at));
        assert!(status.is_locked_out(at + Duration::from_secs(14)));
        assert!(!status.is_locked_out(at + Duration::from_secs(15)));
        assert!(!AuthStatus::default().is_locked_out(at));
    }

    #[test]
    fn test_logged_in_round_trips_user() {
        let expires = SystemTime::UNIX_EPOCH;
        let logged_in = LoggedIn::new(admin(), expires);
        assert_eq!(logged_in.user(), admin());
        assert_eq!(logged_in.session_expires_at(), expires);
        assert!(AuthStatus::LoggedIn(logged_in).is_logged_in_as_system_administrator());
    }
}
