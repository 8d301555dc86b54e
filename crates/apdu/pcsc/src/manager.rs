//! Device manager for PC/SC operations

use std::fmt;

use pcsc::{Context, ReaderState, Scope, State};

use crate::config::PcscConfig;
use crate::error::PcscError;
use crate::reader::PcscReader;
use crate::transport::PcscTransport;

/// Manager for PC/SC device operations
pub struct PcscDeviceManager {
    /// PC/SC context
    context: Context,
}

impl fmt::Debug for PcscDeviceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscDeviceManager").finish_non_exhaustive()
    }
}

impl PcscDeviceManager {
    /// Create a new PC/SC device manager
    pub fn new() -> Result<Self, PcscError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }

    /// List all attached card readers with card presence
    ///
    /// An empty list means no reader is attached.
    pub fn list_readers(&self) -> Result<Vec<PcscReader>, PcscError> {
        let readers = match self.context.list_readers_owned() {
            Ok(readers) => readers,
            Err(pcsc::Error::NoReadersAvailable) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reader_states: Vec<ReaderState> = readers
            .into_iter()
            .map(|name| ReaderState::new(name, State::UNAWARE))
            .collect();
        if reader_states.is_empty() {
            return Ok(Vec::new());
        }

        self.context.get_status_change(None, &mut reader_states)?;
        Ok(reader_states
            .iter()
            .map(PcscReader::from_reader_state)
            .collect())
    }

    /// Open a transport that watches the first reader matching `config`
    pub fn open(&self, config: PcscConfig) -> PcscTransport {
        PcscTransport::new(self.context.clone(), config)
    }

    /// Open a transport bound to the reader called `reader_name`
    pub fn open_reader(&self, reader_name: &str) -> Result<PcscTransport, PcscError> {
        let found = self
            .list_readers()?
            .into_iter()
            .any(|reader| reader.name() == reader_name);
        if !found {
            return Err(PcscError::ReaderNotFound(reader_name.to_string()));
        }
        Ok(self.open(PcscConfig::default().with_reader_name(reader_name)))
    }
}
