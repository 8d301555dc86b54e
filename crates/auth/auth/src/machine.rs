//! The auth transition function
//!
//! [`transition`] is a pure, total fold of [`AuthEvent`]s over
//! [`AuthStatus`]. It never fails: card problems arrive as card statuses and
//! events that make no sense in the current status leave it unchanged.

use std::time::{Duration, SystemTime};

use vxauth_card::{CardDetails, CardStatus, CheckPinResponse, User};

use crate::config::{AuthConfig, MachineState};
use crate::status::{AuthStatus, LoggedIn, LoggedOutReason, ProgrammableCard};

/// Something that happened to the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// The reader was polled
    CheckCardReader(CardStatus),
    /// A PIN was checked against the card
    CheckPin(CheckPinResponse),
    /// The user asked to log out
    LogOut,
    /// The card in the reader was programmed for a user
    ProgramCard(User),
    /// The card in the reader was cleared
    UnprogramCard,
}

/// Everything besides the status that a transition depends on
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
    /// What the machine is configured for
    pub machine: &'a MachineState,
    /// Auth tunables
    pub config: &'a AuthConfig,
    /// The current time
    pub now: SystemTime,
}

/// Compute the status following `event`
pub fn transition(
    current: &AuthStatus,
    event: &AuthEvent,
    ctx: &TransitionContext<'_>,
) -> AuthStatus {
    match event {
        AuthEvent::CheckCardReader(card) => check_card_reader(current, card, ctx),
        AuthEvent::CheckPin(response) => check_pin(current, *response, ctx),
        AuthEvent::LogOut => match current {
            AuthStatus::LoggedOut { .. } => current.clone(),
            _ => AuthStatus::logged_out(LoggedOutReason::MachineLocked),
        },
        AuthEvent::ProgramCard(user) => programmed(current, Some(user.clone())),
        AuthEvent::UnprogramCard => programmed(current, None),
    }
}

fn check_card_reader(
    current: &AuthStatus,
    card: &CardStatus,
    ctx: &TransitionContext<'_>,
) -> AuthStatus {
    match current {
        AuthStatus::LoggedOut { reason, .. } => match card {
            CardStatus::NoCard | CardStatus::NoCardReader | CardStatus::UnknownError => {
                // keep the expiry notice up until the next card arrives
                if *reason == LoggedOutReason::MachineLockedBySessionExpiry {
                    current.clone()
                } else {
                    AuthStatus::logged_out(LoggedOutReason::MachineLocked)
                }
            }
            CardStatus::CardError => AuthStatus::logged_out(LoggedOutReason::CardError),
            // a rejected card stays rejected until it is removed
            CardStatus::Ready(_) if reason.is_validation_failure() => current.clone(),
            CardStatus::Ready(details) => present_card(details.as_ref(), ctx),
        },

        AuthStatus::CheckingPin { .. } => match card {
            CardStatus::Ready(_) => current.clone(),
            _ => AuthStatus::logged_out(LoggedOutReason::MachineLocked),
        },

        AuthStatus::RemoveCard {
            user,
            session_expires_at,
        } => {
            if ctx.now >= *session_expires_at {
                return AuthStatus::logged_out(LoggedOutReason::MachineLockedBySessionExpiry);
            }
            match card {
                CardStatus::NoCard => {
                    AuthStatus::LoggedIn(LoggedIn::new(user.clone(), *session_expires_at))
                }
                _ => current.clone(),
            }
        }

        AuthStatus::LoggedIn(logged_in) => {
            if ctx.now >= logged_in.session_expires_at() {
                return AuthStatus::logged_out(LoggedOutReason::MachineLockedBySessionExpiry);
            }
            match logged_in {
                LoggedIn::SystemAdministrator {
                    user,
                    session_expires_at,
                    ..
                } => AuthStatus::LoggedIn(LoggedIn::SystemAdministrator {
                    user: user.clone(),
                    session_expires_at: *session_expires_at,
                    programmable_card: ProgrammableCard::from(card),
                }),
                _ => current.clone(),
            }
        }
    }
}

fn present_card(details: Option<&CardDetails>, ctx: &TransitionContext<'_>) -> AuthStatus {
    let Some(details) = details else {
        return AuthStatus::logged_out(LoggedOutReason::InvalidUserOnCard);
    };

    if let Err(reason) = validate_card(details, ctx.machine) {
        return AuthStatus::LoggedOut {
            reason,
            card_user_role: Some(details.role()),
        };
    }

    if details.requires_pin() {
        let attempts = details.num_incorrect_pin_attempts();
        AuthStatus::CheckingPin {
            user: details.user(),
            wrong_pin_entered_at: None,
            locked_out_until: lockout_until(attempts, ctx.now, ctx.config),
        }
    } else {
        AuthStatus::RemoveCard {
            user: details.user(),
            session_expires_at: session_expires_at(ctx),
        }
    }
}

/// Decide whether the card in the reader may log in on this machine
pub fn validate_card(details: &CardDetails, machine: &MachineState) -> Result<(), LoggedOutReason> {
    if !machine.allowed_user_roles.contains(&details.role()) {
        return Err(LoggedOutReason::UserRoleNotAllowed);
    }

    match details {
        CardDetails::SystemAdministrator { .. } => Ok(()),
        CardDetails::ElectionManager { user, .. } => match &machine.election_hash {
            None if machine.allow_election_managers_to_access_unconfigured_machines => Ok(()),
            None => Err(LoggedOutReason::MachineNotConfigured),
            Some(hash)
                if *hash == user.election_hash
                    || machine
                        .allow_election_managers_to_access_machines_configured_for_other_elections =>
            {
                Ok(())
            }
            Some(_) => Err(LoggedOutReason::ElectionManagerWrongElection),
        },
        CardDetails::PollWorker { user, .. } => match &machine.election_hash {
            None => Err(LoggedOutReason::MachineNotConfigured),
            Some(hash) if *hash == user.election_hash => Ok(()),
            Some(_) => Err(LoggedOutReason::PollWorkerWrongElection),
        },
    }
}

fn check_pin(
    current: &AuthStatus,
    response: CheckPinResponse,
    ctx: &TransitionContext<'_>,
) -> AuthStatus {
    let AuthStatus::CheckingPin {
        user,
        wrong_pin_entered_at,
        ..
    } = current
    else {
        return current.clone();
    };
    if current.is_locked_out(ctx.now) {
        return current.clone();
    }

    match response {
        CheckPinResponse::Correct => AuthStatus::RemoveCard {
            user: user.clone(),
            session_expires_at: session_expires_at(ctx),
        },
        CheckPinResponse::Incorrect {
            num_incorrect_pin_attempts,
        } => {
            // two wrong entries within the same tick must still differ
            let entered_at = match wrong_pin_entered_at {
                Some(previous) if *previous >= ctx.now => {
                    saturating_add(*previous, Duration::from_millis(1))
                }
                _ => ctx.now,
            };
            AuthStatus::CheckingPin {
                user: user.clone(),
                wrong_pin_entered_at: Some(entered_at),
                locked_out_until: lockout_until(num_incorrect_pin_attempts, entered_at, ctx.config),
            }
        }
        CheckPinResponse::Error => current.clone(),
    }
}

fn programmed(current: &AuthStatus, programmed_user: Option<User>) -> AuthStatus {
    match current {
        AuthStatus::LoggedIn(LoggedIn::SystemAdministrator {
            user,
            session_expires_at,
            ..
        }) => AuthStatus::LoggedIn(LoggedIn::SystemAdministrator {
            user: user.clone(),
            session_expires_at: *session_expires_at,
            programmable_card: ProgrammableCard::Ready { programmed_user },
        }),
        _ => current.clone(),
    }
}

fn lockout_until(attempts: u8, from: SystemTime, config: &AuthConfig) -> Option<SystemTime> {
    config
        .lockout_duration(attempts)
        .map(|duration| saturating_add(from, duration))
}

fn session_expires_at(ctx: &TransitionContext<'_>) -> SystemTime {
    saturating_add(ctx.now, ctx.config.overall_session_time_limit())
}

/// `time + duration`, pinned to the latest representable instant on overflow
fn saturating_add(time: SystemTime, duration: Duration) -> SystemTime {
    if let Some(sum) = time.checked_add(duration) {
        return sum;
    }
    let mut latest = time;
    let mut step = duration;
    while !step.is_zero() {
        match latest.checked_add(step) {
            Some(sum) => latest = sum,
            None => step /= 2,
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use vxauth_card::{
        ElectionManagerUser, PollWorkerUser, SystemAdministratorUser, UserRole,
    };

    use super::*;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    fn admin() -> User {
        User::SystemAdministrator(SystemAdministratorUser {
            user_id: "admin".into(),
        })
    }

    fn manager(hash: &str) -> User {
        User::ElectionManager(ElectionManagerUser {
            user_id: "manager".into(),
            election_hash: hash.into(),
        })
    }

    fn poll_worker(hash: &str) -> User {
        User::PollWorker(PollWorkerUser {
            user_id: "worker".into(),
            election_hash: hash.into(),
        })
    }

    fn ready(user: User, has_pin: bool) -> AuthEvent {
        AuthEvent::CheckCardReader(CardStatus::Ready(Some(CardDetails::new(user, has_pin, 0))))
    }

    fn run(machine: &MachineState, now: SystemTime, status: &AuthStatus, event: AuthEvent) -> AuthStatus {
        let config = AuthConfig::default();
        transition(
            status,
            &event,
            &TransitionContext {
                machine,
                config: &config,
                now,
            },
        )
    }

    fn logged_out_reason(status: &AuthStatus) -> Option<LoggedOutReason> {
        match status {
            AuthStatus::LoggedOut { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    #[test]
    fn test_reader_states_lock_the_machine() {
        let machine = MachineState::configured_for("ABC123");
        for card in [CardStatus::NoCard, CardStatus::NoCardReader, CardStatus::UnknownError] {
            let next = run(
                &machine,
                at(0),
                &AuthStatus::logged_out(LoggedOutReason::CardError),
                AuthEvent::CheckCardReader(card),
            );
            assert_eq!(next, AuthStatus::logged_out(LoggedOutReason::MachineLocked));
        }
        let next = run(
            &machine,
            at(0),
            &AuthStatus::default(),
            AuthEvent::CheckCardReader(CardStatus::CardError),
        );
        assert_eq!(next, AuthStatus::logged_out(LoggedOutReason::CardError));
    }

    #[test]
    fn test_unprogrammed_card_is_invalid() {
        let next = run(
            &MachineState::default(),
            at(0),
            &AuthStatus::default(),
            AuthEvent::CheckCardReader(CardStatus::Ready(None)),
        );
        assert_eq!(next, AuthStatus::logged_out(LoggedOutReason::InvalidUserOnCard));
    }

    #[test]
    fn test_wrong_election_manager_rejected_with_role() {
        let machine = MachineState::configured_for("ABC123");
        let next = run(&machine, at(0), &AuthStatus::default(), ready(manager("XYZ999"), true));
        assert_eq!(
            next,
            AuthStatus::LoggedOut {
                reason: LoggedOutReason::ElectionManagerWrongElection,
                card_user_role: Some(UserRole::ElectionManager),
            }
        );
    }

    #[test]
    fn test_election_manager_access_flags() {
        let mut machine = MachineState::default();
        let details = CardDetails::new(manager("XYZ999"), true, 0);
        assert_eq!(
            validate_card(&details, &machine),
            Err(LoggedOutReason::MachineNotConfigured)
        );
        machine.allow_election_managers_to_access_unconfigured_machines = true;
        assert_eq!(validate_card(&details, &machine), Ok(()));

        let mut machine = MachineState::configured_for("ABC123");
        assert_eq!(
            validate_card(&details, &machine),
            Err(LoggedOutReason::ElectionManagerWrongElection)
        );
        machine.allow_election_managers_to_access_machines_configured_for_other_elections = true;
        assert_eq!(validate_card(&details, &machine), Ok(()));
    }

    #[test]
    fn test_poll_worker_validation() {
        let details = CardDetails::new(poll_worker("ABC123"), false, 0);
        assert_eq!(
            validate_card(&details, &MachineState::default()),
            Err(LoggedOutReason::MachineNotConfigured)
        );
        assert_eq!(
            validate_card(&details, &MachineState::configured_for("XYZ999")),
            Err(LoggedOutReason::PollWorkerWrongElection)
        );
        assert_eq!(
            validate_card(&details, &MachineState::configured_for("ABC123")),
            Ok(())
        );
    }

    #[test]
    fn test_role_not_allowed() {
        let machine = MachineState::configured_for("ABC123")
            .with_allowed_user_roles([UserRole::SystemAdministrator, UserRole::ElectionManager]);
        let next = run(&machine, at(0), &AuthStatus::default(), ready(poll_worker("ABC123"), false));
        assert_eq!(logged_out_reason(&next), Some(LoggedOutReason::UserRoleNotAllowed));
    }

    #[test]
    fn test_rejection_is_terminal_until_removal() {
        let machine = MachineState::configured_for("ABC123");
        let rejected = run(&machine, at(0), &AuthStatus::default(), ready(manager("XYZ999"), true));

        // even a valid card reported without an intervening removal is ignored
        let again = run(&machine, at(1), &rejected, ready(admin(), true));
        assert_eq!(again, rejected);

        let removed = run(
            &machine,
            at(2),
            &rejected,
            AuthEvent::CheckCardReader(CardStatus::NoCard),
        );
        assert_eq!(removed, AuthStatus::logged_out(LoggedOutReason::MachineLocked));
        let next = run(&machine, at(3), &removed, ready(admin(), true));
        assert!(matches!(next, AuthStatus::CheckingPin { .. }));
    }

    #[test]
    fn test_pin_flow_to_logged_in() {
        let machine = MachineState::configured_for("ABC123");
        let checking = run(&machine, at(0), &AuthStatus::default(), ready(manager("ABC123"), true));
        assert_eq!(
            checking,
            AuthStatus::CheckingPin {
                user: manager("ABC123"),
                wrong_pin_entered_at: None,
                locked_out_until: None,
            }
        );

        let remove = run(&machine, at(5), &checking, AuthEvent::CheckPin(CheckPinResponse::Correct));
        let expires = at(5) + Duration::from_secs(12 * 3600);
        assert_eq!(
            remove,
            AuthStatus::RemoveCard {
                user: manager("ABC123"),
                session_expires_at: expires,
            }
        );

        // card still in the reader
        let still = run(&machine, at(6), &remove, ready(manager("ABC123"), true));
        assert_eq!(still, remove);

        let logged_in = run(
            &machine,
            at(7),
            &remove,
            AuthEvent::CheckCardReader(CardStatus::NoCard),
        );
        assert_eq!(
            logged_in,
            AuthStatus::LoggedIn(LoggedIn::new(manager("ABC123"), expires))
        );

        let out = run(&machine, at(8), &logged_in, AuthEvent::LogOut);
        assert_eq!(out, AuthStatus::logged_out(LoggedOutReason::MachineLocked));
    }

    #[test]
    fn test_poll_worker_without_pin_skips_checking() {
        let machine = MachineState::configured_for("ABC123");
        let next = run(&machine, at(0), &AuthStatus::default(), ready(poll_worker("ABC123"), false));
        assert!(matches!(next, AuthStatus::RemoveCard { .. }));
    }

    #[test]
    fn test_removing_card_while_checking_pin_locks() {
        let machine = MachineState::configured_for("ABC123");
        let checking = run(&machine, at(0), &AuthStatus::default(), ready(admin(), true));
        let next = run(
            &machine,
            at(1),
            &checking,
            AuthEvent::CheckCardReader(CardStatus::NoCard),
        );
        assert_eq!(next, AuthStatus::logged_out(LoggedOutReason::MachineLocked));

        // a late PIN result cannot log anyone in
        let late = run(&machine, at(2), &next, AuthEvent::CheckPin(CheckPinResponse::Correct));
        assert_eq!(late, next);
    }

    #[test]
    fn test_wrong_pin_timestamps_strictly_increase() {
        let machine = MachineState::default();
        let mut status = run(&machine, at(0), &AuthStatus::default(), ready(admin(), true));
        let mut previous = None;
        for attempt in 1..=3u8 {
            status = run(
                &machine,
                at(10),
                &status,
                AuthEvent::CheckPin(CheckPinResponse::Incorrect {
                    num_incorrect_pin_attempts: attempt,
                }),
            );
            let AuthStatus::CheckingPin {
                wrong_pin_entered_at: Some(entered_at),
                ..
            } = status
            else {
                panic!("expected checking_pin, got {status:?}");
            };
            if let Some(previous) = previous {
                assert!(entered_at > previous);
            }
            previous = Some(entered_at);
        }
    }

    #[test]
    fn test_lockout_after_allowed_attempts() {
        let machine = MachineState::default();
        let checking = run(&machine, at(0), &AuthStatus::default(), ready(admin(), true));
        let locked = run(
            &machine,
            at(10),
            &checking,
            AuthEvent::CheckPin(CheckPinResponse::Incorrect {
                num_incorrect_pin_attempts: 5,
            }),
        );
        let AuthStatus::CheckingPin {
            locked_out_until, ..
        } = &locked
        else {
            panic!("expected checking_pin");
        };
        assert_eq!(*locked_out_until, Some(at(25)));

        // ignored while locked out
        let ignored = run(&machine, at(20), &locked, AuthEvent::CheckPin(CheckPinResponse::Correct));
        assert_eq!(ignored, locked);

        let accepted = run(&machine, at(25), &locked, AuthEvent::CheckPin(CheckPinResponse::Correct));
        assert!(matches!(accepted, AuthStatus::RemoveCard { .. }));
    }

    #[test]
    fn test_extreme_config_never_panics() {
        let machine = MachineState::default();
        let config = AuthConfig {
            overall_session_time_limit_hours: u64::MAX / 3600,
            starting_card_lockout_duration_seconds: u64::MAX,
            ..AuthConfig::default()
        };
        let step = |status: &AuthStatus, event: AuthEvent, now: SystemTime| {
            transition(
                status,
                &event,
                &TransitionContext {
                    machine: &machine,
                    config: &config,
                    now,
                },
            )
        };

        let checking = step(&AuthStatus::default(), ready(admin(), true), at(0));
        let locked = step(
            &checking,
            AuthEvent::CheckPin(CheckPinResponse::Incorrect {
                num_incorrect_pin_attempts: u8::MAX,
            }),
            at(1),
        );
        assert!(locked.is_locked_out(at(1_000_000_000)));

        let remove = step(&checking, AuthEvent::CheckPin(CheckPinResponse::Correct), at(1));
        let AuthStatus::RemoveCard {
            session_expires_at, ..
        } = &remove
        else {
            panic!("expected remove_card");
        };
        assert!(*session_expires_at > at(1_000_000_000));

        let logged_in = step(
            &remove,
            AuthEvent::CheckCardReader(CardStatus::NoCard),
            at(2),
        );
        assert!(logged_in.is_logged_in());
    }

    #[test]
    fn test_saturating_add_pins_to_latest_instant() {
        let latest = saturating_add(at(0), Duration::MAX);
        assert!(latest > at(0));
        assert_eq!(saturating_add(latest, Duration::from_millis(1)), latest);
        assert_eq!(saturating_add(at(0), Duration::from_secs(5)), at(5));
    }

    #[test]
    fn test_exhausted_card_starts_locked_out() {
        let machine = MachineState::default();
        let details = CardDetails::new(admin(), true, 6);
        let next = run(
            &machine,
            at(0),
            &AuthStatus::default(),
            AuthEvent::CheckCardReader(CardStatus::Ready(Some(details))),
        );
        assert_eq!(
            next,
            AuthStatus::CheckingPin {
                user: admin(),
                wrong_pin_entered_at: None,
                locked_out_until: Some(at(30)),
            }
        );
    }

    #[test]
    fn test_session_expiry() {
        let machine = MachineState::default();
        let logged_in = AuthStatus::LoggedIn(LoggedIn::new(admin(), at(100)));
        let before = run(
            &machine,
            at(99),
            &logged_in,
            AuthEvent::CheckCardReader(CardStatus::NoCard),
        );
        assert!(before.is_logged_in());

        let expired = run(
            &machine,
            at(100),
            &logged_in,
            AuthEvent::CheckCardReader(CardStatus::NoCard),
        );
        assert_eq!(
            expired,
            AuthStatus::logged_out(LoggedOutReason::MachineLockedBySessionExpiry)
        );

        // the notice survives an empty reader
        let still = run(
            &machine,
            at(101),
            &expired,
            AuthEvent::CheckCardReader(CardStatus::NoCard),
        );
        assert_eq!(still, expired);
    }

    #[test]
    fn test_system_administrator_tracks_programmable_card() {
        let machine = MachineState::default();
        let logged_in = AuthStatus::LoggedIn(LoggedIn::new(admin(), at(1000)));
        let with_card = run(&machine, at(1), &logged_in, ready(poll_worker("ABC123"), false));
        assert_eq!(
            with_card,
            AuthStatus::LoggedIn(LoggedIn::SystemAdministrator {
                user: SystemAdministratorUser {
                    user_id: "admin".into()
                },
                session_expires_at: at(1000),
                programmable_card: ProgrammableCard::Ready {
                    programmed_user: Some(poll_worker("ABC123"))
                },
            })
        );

        let unprogrammed = run(&machine, at(2), &with_card, AuthEvent::UnprogramCard);
        assert!(matches!(
            unprogrammed,
            AuthStatus::LoggedIn(LoggedIn::SystemAdministrator {
                programmable_card: ProgrammableCard::Ready {
                    programmed_user: None
                },
                ..
            })
        ));
    }

    #[test]
    fn test_non_admin_ignores_reader_changes() {
        let machine = MachineState::configured_for("ABC123");
        let logged_in = AuthStatus::LoggedIn(LoggedIn::new(manager("ABC123"), at(1000)));
        for event in [
            ready(admin(), true),
            AuthEvent::CheckCardReader(CardStatus::CardError),
            AuthEvent::ProgramCard(admin()),
        ] {
            assert_eq!(run(&machine, at(1), &logged_in, event), logged_in);
        }
    }

    fn arb_user() -> impl Strategy<Value = User> {
        prop_oneof![
            Just(admin()),
            prop_oneof![Just("ABC123"), Just("XYZ999")].prop_map(manager),
            prop_oneof![Just("ABC123"), Just("XYZ999")].prop_map(poll_worker),
        ]
    }

    fn arb_card_status() -> impl Strategy<Value = CardStatus> {
        prop_oneof![
            Just(CardStatus::NoCardReader),
            Just(CardStatus::UnknownError),
            Just(CardStatus::NoCard),
            Just(CardStatus::CardError),
            Just(CardStatus::Ready(None)),
            (arb_user(), any::<bool>(), 0u8..16).prop_map(|(user, has_pin, attempts)| {
                CardStatus::Ready(Some(CardDetails::new(user, has_pin, attempts)))
            }),
        ]
    }

    fn arb_event() -> impl Strategy<Value = AuthEvent> {
        prop_oneof![
            arb_card_status().prop_map(AuthEvent::CheckCardReader),
            Just(AuthEvent::CheckPin(CheckPinResponse::Correct)),
            Just(AuthEvent::CheckPin(CheckPinResponse::Error)),
            (1u8..16).prop_map(|n| AuthEvent::CheckPin(CheckPinResponse::Incorrect {
                num_incorrect_pin_attempts: n
            })),
            Just(AuthEvent::LogOut),
            arb_user().prop_map(AuthEvent::ProgramCard),
            Just(AuthEvent::UnprogramCard),
        ]
    }

    proptest! {
        #[test]
        fn prop_login_requires_valid_card(
            events in prop::collection::vec((arb_event(), 0u64..60), 0..40)
        ) {
            let machine = MachineState::configured_for("ABC123");
            let mut status = AuthStatus::default();
            let mut now = at(0);
            for (event, step) in events {
                now += Duration::from_secs(step);
                let next = run(&machine, now, &status, event.clone());

                // entering a session needs a prior remove_card for the same user
                if let AuthStatus::LoggedIn(logged_in) = &next {
                    match &status {
                        AuthStatus::LoggedIn(previous) => {
                            prop_assert_eq!(previous.user(), logged_in.user());
                        }
                        AuthStatus::RemoveCard { user, .. } => {
                            prop_assert_eq!(user, &logged_in.user());
                        }
                        other => prop_assert!(false, "logged in from {other:?}"),
                    }
                }
                // wrong election cards never get past validation
                if let Some(user) = next.user() {
                    if let Some(hash) = match &user {
                        User::ElectionManager(user) => Some(&user.election_hash),
                        User::PollWorker(user) => Some(&user.election_hash),
                        User::SystemAdministrator(_) => None,
                    } {
                        prop_assert_eq!(hash.as_str(), "ABC123");
                    }
                }
                status = next;
            }
        }
    }
}
