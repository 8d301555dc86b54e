//! Reader representation for PC/SC devices

use pcsc::{ReaderState, State};
use serde::Serialize;

/// Representation of a PC/SC card reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PcscReader {
    /// Name of the reader
    name: String,

    /// Whether a card is present
    has_card: bool,

    /// Answer To Reset of the card (if present)
    atr: Option<Vec<u8>>,
}

impl PcscReader {
    /// Create a new reader
    pub const fn new(name: String, has_card: bool, atr: Option<Vec<u8>>) -> Self {
        Self {
            name,
            has_card,
            atr,
        }
    }

    /// Get the reader name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if a card is present in the reader
    pub const fn has_card(&self) -> bool {
        self.has_card
    }

    /// Get the ATR of the card if present
    pub fn atr(&self) -> Option<&[u8]> {
        self.atr.as_deref()
    }

    /// Create a reader from a reader state
    pub(crate) fn from_reader_state(reader_state: &ReaderState) -> Self {
        let has_card = card_present(reader_state.event_state());
        let atr = has_card.then(|| reader_state.atr().to_vec());

        Self {
            name: reader_state.name().to_string_lossy().into_owned(),
            has_card,
            atr,
        }
    }
}

/// Whether a reader state reports a card in the slot
pub(crate) fn card_present(state: State) -> bool {
    state.contains(State::PRESENT) && !state.contains(State::EMPTY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_present_bits() {
        assert!(card_present(State::PRESENT));
        assert!(card_present(State::PRESENT | State::EXCLUSIVE));
        assert!(!card_present(State::EMPTY));
        assert!(!card_present(State::PRESENT | State::EMPTY));
        assert!(!card_present(State::UNAWARE));
    }
}
