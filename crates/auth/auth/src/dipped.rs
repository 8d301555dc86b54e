//! Dipped smart card auth
//!
//! [`DippedSmartCardAuth`] owns the card and the current [`AuthStatus`]. A
//! card is dipped to log in and then removed; while logged in, a system
//! administrator can program other cards inserted into the same reader.
//!
//! The card lock is held across every card exchange together with the fold
//! of its result into the status, so a reader poll can never interleave with
//! a PIN check or a programming operation.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};
use vxauth_card::{
    Card, ElectionManagerUser, Pin, PollWorkerUser, SystemAdministratorUser, User, UserRole,
    generate_user_id,
};

use crate::clock::{Clock, SystemClock};
use crate::config::{AuthConfig, MachineState};
use crate::machine::{AuthEvent, TransitionContext, transition};
use crate::status::AuthStatus;
use crate::{Error, Result};

/// Hash identifying an election definition
pub fn election_hash(election_definition: &[u8]) -> String {
    hex::encode(Sha256::digest(election_definition))
}

/// Who to program the card in the reader for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramCardRequest {
    /// A new system administrator
    SystemAdministrator,
    /// An election manager for the given election definition
    ElectionManager {
        /// Election definition stored on the card
        election_definition: Vec<u8>,
    },
    /// A poll worker for the machine's election
    PollWorker,
}

impl ProgramCardRequest {
    /// Role the card will carry
    pub const fn role(&self) -> UserRole {
        match self {
            Self::SystemAdministrator => UserRole::SystemAdministrator,
            Self::ElectionManager { .. } => UserRole::ElectionManager,
            Self::PollWorker => UserRole::PollWorker,
        }
    }
}

#[derive(Debug)]
struct State {
    status: AuthStatus,
    machine: MachineState,
    subscribers: Vec<Sender<AuthStatus>>,
}

/// Card-driven login for a single-reader machine
#[derive(Debug)]
pub struct DippedSmartCardAuth<C: Card> {
    card: Mutex<C>,
    state: Mutex<State>,
    config: AuthConfig,
    clock: Arc<dyn Clock>,
}

impl<C: Card> DippedSmartCardAuth<C> {
    /// Auth over `card` using the system clock
    pub fn new(card: C, config: AuthConfig, machine: MachineState) -> Self {
        Self::with_clock(card, config, machine, Arc::new(SystemClock))
    }

    /// Auth over `card` using `clock`
    pub fn with_clock(
        card: C,
        config: AuthConfig,
        machine: MachineState,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            card: Mutex::new(card),
            state: Mutex::new(State {
                status: AuthStatus::default(),
                machine,
                subscribers: Vec::new(),
            }),
            config,
            clock,
        }
    }

    /// The auth configuration
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// The current status
    pub fn status(&self) -> AuthStatus {
        self.state.lock().status.clone()
    }

    /// The current machine state
    pub fn machine_state(&self) -> MachineState {
        self.state.lock().machine.clone()
    }

    /// Replace the machine state, e.g. after an election is configured
    ///
    /// Takes effect at the next card validation.
    pub fn set_machine_state(&self, machine: MachineState) {
        self.state.lock().machine = machine;
    }

    /// Receive every status change from now on
    pub fn subscribe(&self) -> Receiver<AuthStatus> {
        let (sender, receiver) = unbounded();
        self.state.lock().subscribers.push(sender);
        receiver
    }

    /// Poll the reader and fold the result
    pub fn check_card_reader(&self) -> AuthStatus {
        let mut card = self.card.lock();
        let card_status = card.status();
        self.apply(&AuthEvent::CheckCardReader(card_status))
    }

    /// Check a PIN entered for the card in the reader
    ///
    /// Ignored without touching the card unless the status is
    /// `checking_pin` and no lockout is running.
    #[instrument(level = "debug", skip_all)]
    pub fn check_pin(&self, pin: &Pin) -> AuthStatus {
        let mut card = self.card.lock();
        let status = self.status();
        if !matches!(status, AuthStatus::CheckingPin { .. }) {
            debug!(status = status.name(), "Ignoring PIN outside of PIN entry");
            return status;
        }
        if status.is_locked_out(self.clock.now()) {
            debug!("Ignoring PIN during lockout");
            return status;
        }

        let response = card.check_pin(pin);
        self.apply(&AuthEvent::CheckPin(response))
    }

    /// End the session
    pub fn log_out(&self) -> AuthStatus {
        let _card = self.card.lock();
        self.apply(&AuthEvent::LogOut)
    }

    /// Program the card in the reader
    ///
    /// Returns the PIN assigned to the card, if any. Election manager cards
    /// carry the hash of the supplied definition and the definition itself.
    ///
    /// # Panics
    ///
    /// Panics unless a system administrator is logged in.
    pub fn program_card(&self, request: &ProgramCardRequest) -> Result<Option<Pin>> {
        let mut card = self.card.lock();
        self.assert_system_administrator("program a card");

        let user_id = generate_user_id();
        let (user, election_definition) = match request {
            ProgramCardRequest::SystemAdministrator => (
                User::SystemAdministrator(SystemAdministratorUser { user_id }),
                None,
            ),
            ProgramCardRequest::ElectionManager {
                election_definition,
            } => (
                User::ElectionManager(ElectionManagerUser {
                    user_id,
                    election_hash: election_hash(election_definition),
                }),
                Some(election_definition.as_slice()),
            ),
            ProgramCardRequest::PollWorker => {
                let election_hash = self
                    .state
                    .lock()
                    .machine
                    .election_hash
                    .clone()
                    .ok_or(Error::MachineNotConfigured)?;
                (
                    User::PollWorker(PollWorkerUser {
                        user_id,
                        election_hash,
                    }),
                    None,
                )
            }
        };

        let pin = match request {
            ProgramCardRequest::PollWorker if !self.config.enable_poll_worker_pins => None,
            _ => Some(Pin::generate()),
        };

        if let Err(err) = card.program(&user, pin.as_ref(), election_definition) {
            warn!(role = %request.role(), %err, "Failed to program card");
            return Err(err.into());
        }
        self.apply(&AuthEvent::ProgramCard(user));
        Ok(pin)
    }

    /// Clear the card in the reader
    ///
    /// # Panics
    ///
    /// Panics unless a system administrator is logged in.
    pub fn unprogram_card(&self) -> Result<()> {
        let mut card = self.card.lock();
        self.assert_system_administrator("unprogram a card");

        if let Err(err) = card.unprogram() {
            warn!(%err, "Failed to unprogram card");
            return Err(err.into());
        }
        self.apply(&AuthEvent::UnprogramCard);
        Ok(())
    }

    /// Read the election definition stored on the card in the reader
    pub fn read_card_election_definition(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.card.lock().read_election_definition()?)
    }

    /// Release the reader
    pub fn disconnect(&self) {
        self.card.lock().disconnect();
    }

    fn assert_system_administrator(&self, action: &str) {
        let status = self.status();
        assert!(
            status.is_logged_in_as_system_administrator(),
            "only a logged-in system administrator can {action}, status is {}",
            status.name()
        );
    }

    /// Fold `event` into the status; callers hold the card lock
    fn apply(&self, event: &AuthEvent) -> AuthStatus {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let next = transition(
            &state.status,
            event,
            &TransitionContext {
                machine: &state.machine,
                config: &self.config,
                now,
            },
        );

        if next != state.status {
            info!(from = state.status.name(), to = next.name(), "Auth status changed");
            state
                .subscribers
                .retain(|subscriber| subscriber.send(next.clone()).is_ok());
            state.status = next.clone();
        }
        next
    }
}
