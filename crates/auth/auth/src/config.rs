//! Auth configuration and machine state

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vxauth_card::UserRole;

/// Tunables for the auth state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Milliseconds between reader polls
    pub poll_interval_ms: u64,
    /// Hours a session lasts before the machine locks itself
    pub overall_session_time_limit_hours: u64,
    /// Wrong PIN entries tolerated before lockouts start
    pub num_incorrect_pin_attempts_allowed_before_card_lockout: u8,
    /// Length of the first lockout; each further wrong PIN doubles it
    pub starting_card_lockout_duration_seconds: u64,
    /// Whether poll worker cards are programmed with a PIN
    pub enable_poll_worker_pins: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            overall_session_time_limit_hours: 12,
            num_incorrect_pin_attempts_allowed_before_card_lockout: 5,
            starting_card_lockout_duration_seconds: 15,
            enable_poll_worker_pins: false,
        }
    }
}

impl AuthConfig {
    /// Interval between reader polls
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// How long a session lasts, saturating for absurdly large limits
    pub const fn overall_session_time_limit(&self) -> Duration {
        Duration::from_secs(self.overall_session_time_limit_hours.saturating_mul(60 * 60))
    }

    /// Length of the first lockout
    pub const fn starting_card_lockout_duration(&self) -> Duration {
        Duration::from_secs(self.starting_card_lockout_duration_seconds)
    }

    /// Lockout after `num_incorrect_pin_attempts` wrong PINs, if any
    pub fn lockout_duration(&self, num_incorrect_pin_attempts: u8) -> Option<Duration> {
        let allowed = self.num_incorrect_pin_attempts_allowed_before_card_lockout;
        if num_incorrect_pin_attempts < allowed {
            return None;
        }
        let doublings = u32::from(num_incorrect_pin_attempts - allowed).min(16);
        Some(
            self.starting_card_lockout_duration()
                .saturating_mul(2u32.pow(doublings)),
        )
    }
}

/// What the machine is configured for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineState {
    /// Hash of the configured election, if any
    pub election_hash: Option<String>,
    /// Roles this application lets in
    pub allowed_user_roles: Vec<UserRole>,
    /// Let election managers in before an election is configured
    pub allow_election_managers_to_access_unconfigured_machines: bool,
    /// Let election managers in when their card is for another election
    pub allow_election_managers_to_access_machines_configured_for_other_elections: bool,
}

impl Default for MachineState {
    fn default() -> Self {
        Self {
            election_hash: None,
            allowed_user_roles: UserRole::ALL.to_vec(),
            allow_election_managers_to_access_unconfigured_machines: false,
            allow_election_managers_to_access_machines_configured_for_other_elections: false,
        }
    }
}

impl MachineState {
    /// Machine configured for `election_hash`
    pub fn configured_for(election_hash: impl Into<String>) -> Self {
        Self {
            election_hash: Some(election_hash.into()),
            ..Self::default()
        }
    }

    /// Restrict the roles this application lets in
    pub fn with_allowed_user_roles(mut self, roles: impl IntoIterator<Item = UserRole>) -> Self {
        self.allowed_user_roles = roles.into_iter().collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lockout_doubles() {
        let config = AuthConfig::default();
        assert_eq!(config.lockout_duration(4), None);
        assert_eq!(config.lockout_duration(5), Some(Duration::from_secs(15)));
        assert_eq!(config.lockout_duration(6), Some(Duration::from_secs(30)));
        assert_eq!(config.lockout_duration(8), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_lockout_is_bounded() {
        let config = AuthConfig::default();
        assert_eq!(config.lockout_duration(u8::MAX), config.lockout_duration(21));
    }

    #[test]
    fn test_extreme_values_saturate() {
        let config = AuthConfig {
            overall_session_time_limit_hours: u64::MAX,
            starting_card_lockout_duration_seconds: u64::MAX,
            ..AuthConfig::default()
        };
        assert_eq!(
            config.overall_session_time_limit(),
            Duration::from_secs(u64::MAX)
        );
        assert_eq!(config.lockout_duration(u8::MAX), Some(Duration::MAX));
    }

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(
            config.overall_session_time_limit(),
            Duration::from_secs(12 * 3600)
        );
        assert_eq!(MachineState::default().allowed_user_roles.len(), 3);
    }
}
