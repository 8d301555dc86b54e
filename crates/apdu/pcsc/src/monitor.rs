//! Reader observation for PC/SC
//!
//! [`ReaderMonitor`] samples the PC/SC subsystem once per poll and turns the
//! difference from the previous sample into raw [`ReaderEvent`]s. The diff
//! itself is a pure function so the event stream can be tested without a
//! reader.

use std::ffi::CString;
use std::time::Duration;

use pcsc::{Context, ReaderState, State};
use tracing::{debug, trace};
use vxauth_apdu_core::ReaderEvent;

use crate::config::PcscConfig;
use crate::reader::card_present;

/// One sample of the hardware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The PC/SC service reported an error
    Error,
    /// No matching reader is attached
    NoReader,
    /// A matching reader is attached
    Reader {
        /// Name of the reader
        name: String,
        /// Whether a card sits in the slot
        card_present: bool,
    },
}

/// Turn two consecutive samples into reader events
pub fn diff(previous: &Observation, current: &Observation) -> Vec<ReaderEvent> {
    use Observation::*;

    match (previous, current) {
        (_, Error) => vec![ReaderEvent::HardwareError],
        (Reader { .. }, NoReader) => vec![ReaderEvent::ReaderDetached],
        (Error | NoReader, NoReader) => Vec::new(),
        (Error | NoReader, Reader { card_present, .. }) => {
            let mut events = vec![ReaderEvent::ReaderAttached];
            if *card_present {
                events.push(ReaderEvent::CardPresent);
            }
            events
        }
        (
            Reader {
                name: prev_name,
                card_present: was_present,
            },
            Reader { name, card_present },
        ) => {
            if prev_name != name {
                let mut events = vec![ReaderEvent::ReaderDetached, ReaderEvent::ReaderAttached];
                if *card_present {
                    events.push(ReaderEvent::CardPresent);
                }
                return events;
            }
            match (was_present, card_present) {
                (false, true) => vec![ReaderEvent::CardPresent],
                (true, false) => vec![ReaderEvent::CardAbsent],
                _ => Vec::new(),
            }
        }
    }
}

/// Samples the PC/SC subsystem and reports raw reader events
#[derive(Debug)]
pub struct ReaderMonitor {
    last: Observation,
}

impl Default for ReaderMonitor {
    fn default() -> Self {
        Self {
            last: Observation::NoReader,
        }
    }
}

impl ReaderMonitor {
    /// Last sample taken
    pub const fn last(&self) -> &Observation {
        &self.last
    }

    /// Name of the reader seen in the last sample
    pub fn reader_name(&self) -> Option<&str> {
        match &self.last {
            Observation::Reader { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Forget that a card was present so the next sample re-reports it
    pub fn forget_card(&mut self) {
        if let Observation::Reader { card_present, .. } = &mut self.last {
            *card_present = false;
        }
    }

    /// Take a sample and return the events since the previous one
    pub fn poll(&mut self, context: &Context, config: &PcscConfig) -> Vec<ReaderEvent> {
        let current = observe(context, config);
        let events = diff(&self.last, &current);
        if !events.is_empty() {
            debug!(?events, ?current, "Reader events");
        }
        self.last = current;
        events
    }
}

/// Sample the first reader matching `config`
fn observe(context: &Context, config: &PcscConfig) -> Observation {
    let readers = match context.list_readers_owned() {
        Ok(readers) => readers,
        Err(pcsc::Error::NoReadersAvailable) => return Observation::NoReader,
        Err(e) => {
            debug!("Failed to list readers: {e}");
            return Observation::Error;
        }
    };

    let Some(reader) = readers
        .into_iter()
        .find(|r| config.matches_reader(&r.to_string_lossy()))
    else {
        return Observation::NoReader;
    };

    let name = reader.to_string_lossy().into_owned();
    match query_card_present(context, reader) {
        Ok(card_present) => Observation::Reader { name, card_present },
        Err(pcsc::Error::UnknownReader | pcsc::Error::ReaderUnavailable) => Observation::NoReader,
        Err(e) => {
            debug!(reader = %name, "Failed to read reader state: {e}");
            Observation::Error
        }
    }
}

fn query_card_present(context: &Context, reader: CString) -> Result<bool, pcsc::Error> {
    let mut states = [ReaderState::new(reader, State::UNAWARE)];
    context.get_status_change(Some(Duration::ZERO), &mut states)?;
    trace!(state = ?states[0].event_state(), "Reader state");
    Ok(card_present(states[0].event_state()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(card_present: bool) -> Observation {
        Observation::Reader {
            name: "Reader 0".into(),
            card_present,
        }
    }

    #[test]
    fn test_attach_with_card() {
        assert_eq!(
            diff(&Observation::NoReader, &reader(true)),
            vec![ReaderEvent::ReaderAttached, ReaderEvent::CardPresent]
        );
    }

    #[test]
    fn test_card_insert_and_remove() {
        assert_eq!(
            diff(&reader(false), &reader(true)),
            vec![ReaderEvent::CardPresent]
        );
        assert_eq!(
            diff(&reader(true), &reader(false)),
            vec![ReaderEvent::CardAbsent]
        );
        assert!(diff(&reader(true), &reader(true)).is_empty());
    }

    #[test]
    fn test_error_and_recovery() {
        assert_eq!(
            diff(&reader(true), &Observation::Error),
            vec![ReaderEvent::HardwareError]
        );
        assert_eq!(
            diff(&Observation::Error, &reader(true)),
            vec![ReaderEvent::ReaderAttached, ReaderEvent::CardPresent]
        );
    }

    #[test]
    fn test_detach() {
        assert_eq!(
            diff(&reader(true), &Observation::NoReader),
            vec![ReaderEvent::ReaderDetached]
        );
        assert!(diff(&Observation::NoReader, &Observation::NoReader).is_empty());
    }

    #[test]
    fn test_forget_card_rereports_presence() {
        let mut monitor = ReaderMonitor {
            last: reader(true),
        };
        monitor.forget_card();
        assert_eq!(diff(monitor.last(), &reader(true)), vec![ReaderEvent::CardPresent]);
    }
}
