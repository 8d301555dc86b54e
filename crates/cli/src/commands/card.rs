//! Card commands, driven through the auth state machine

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use clap::ValueEnum;
use eyre::{WrapErr, bail};
use tracing::info;
use vxauth::{
    AuthPoller, AuthStatus, DippedSmartCardAuth, LoggedIn, ProgramCardRequest, ProgrammableCard,
};
use vxauth_apdu_transport_pcsc::{PcscDeviceManager, PcscTransport};
use vxauth_card::{Pin, SmartCard};

use crate::config::Config;

type Auth = DippedSmartCardAuth<SmartCard<PcscTransport>>;

/// Role to program a card for
#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum RoleArg {
    SystemAdministrator,
    ElectionManager,
    PollWorker,
}

fn open_auth(config: &Config) -> eyre::Result<Auth> {
    let manager = PcscDeviceManager::new()?;
    let transport = manager.open(config.reader.pcsc_config());
    Ok(DippedSmartCardAuth::new(
        SmartCard::new(transport),
        config.auth.clone(),
        config.machine.clone(),
    ))
}

fn describe(status: &AuthStatus) -> String {
    match status {
        AuthStatus::LoggedOut {
            reason,
            card_user_role,
        } => match card_user_role {
            Some(role) => format!("Logged out ({reason:?}, card role {role})"),
            None => format!("Logged out ({reason:?})"),
        },
        AuthStatus::CheckingPin { user, .. } => format!("Enter PIN for {}", user.role()),
        AuthStatus::RemoveCard { user, .. } => format!("Remove card to log in as {}", user.role()),
        AuthStatus::LoggedIn(logged_in) => match logged_in {
            LoggedIn::SystemAdministrator {
                programmable_card, ..
            } => format!("Logged in as system_administrator, card: {programmable_card:?}"),
            other => format!("Logged in as {}", other.user().role()),
        },
    }
}

/// Print auth status changes until interrupted
pub(crate) fn watch(config: &Config, json: bool) -> eyre::Result<()> {
    let auth = Arc::new(open_auth(config)?);
    let updates = auth.subscribe();
    let _poller = AuthPoller::spawn(auth.clone());

    println!("{}", describe(&auth.status()));
    for status in updates.iter() {
        if json {
            println!("{}", serde_json::to_string(&status)?);
        } else {
            println!("{}", describe(&status));
        }
    }
    Ok(())
}

fn prompt_pin() -> eyre::Result<Pin> {
    print!("PIN: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().parse()?)
}

/// Poll until a system administrator is logged in, asking for the PIN
fn log_in_system_administrator(auth: &Auth) -> eyre::Result<()> {
    let interval = auth.config().poll_interval();
    let mut last = None;
    loop {
        let status = auth.check_card_reader();
        if last.as_ref() != Some(&status) {
            println!("{}", describe(&status));
        }

        match &status {
            AuthStatus::LoggedIn(LoggedIn::SystemAdministrator { .. }) => return Ok(()),
            AuthStatus::LoggedIn(_) => bail!("logged in, but not as a system administrator"),
            AuthStatus::CheckingPin { .. } if !status.is_locked_out(std::time::SystemTime::now()) => {
                match prompt_pin() {
                    Ok(pin) => {
                        auth.check_pin(&pin);
                    }
                    Err(err) => println!("{err}"),
                }
            }
            _ => thread::sleep(interval),
        }
        last = Some(status);
    }
}

/// Poll until a card is ready to be programmed
fn wait_for_programmable_card(auth: &Auth) -> eyre::Result<()> {
    println!("Insert the card to program");
    let interval = auth.config().poll_interval();
    loop {
        match auth.check_card_reader() {
            AuthStatus::LoggedIn(LoggedIn::SystemAdministrator {
                programmable_card: ProgrammableCard::Ready { programmed_user },
                ..
            }) => {
                if let Some(user) = programmed_user {
                    println!("Card is programmed for {}, overwriting", user.role());
                }
                return Ok(());
            }
            AuthStatus::LoggedIn(LoggedIn::SystemAdministrator { .. }) => thread::sleep(interval),
            other => bail!("session ended: {}", describe(&other)),
        }
    }
}

pub(crate) fn program_card(
    config: &Config,
    role: RoleArg,
    election_definition: Option<&Path>,
) -> eyre::Result<()> {
    let request = match role {
        RoleArg::SystemAdministrator => ProgramCardRequest::SystemAdministrator,
        RoleArg::ElectionManager => {
            let path = election_definition
                .ok_or_else(|| eyre::eyre!("--election-definition is required"))?;
            ProgramCardRequest::ElectionManager {
                election_definition: std::fs::read(path)
                    .wrap_err_with(|| format!("reading {}", path.display()))?,
            }
        }
        RoleArg::PollWorker => ProgramCardRequest::PollWorker,
    };

    let auth = open_auth(config)?;
    log_in_system_administrator(&auth)?;
    wait_for_programmable_card(&auth)?;

    let pin = auth.program_card(&request)?;
    info!(role = %request.role(), "Card programmed");
    match pin {
        Some(pin) => println!("Card programmed. PIN: {}", pin.as_str()),
        None => println!("Card programmed without a PIN"),
    }
    auth.log_out();
    auth.disconnect();
    Ok(())
}

pub(crate) fn unprogram_card(config: &Config) -> eyre::Result<()> {
    let auth = open_auth(config)?;
    log_in_system_administrator(&auth)?;
    wait_for_programmable_card(&auth)?;

    auth.unprogram_card()?;
    println!("Card unprogrammed");
    auth.log_out();
    auth.disconnect();
    Ok(())
}
