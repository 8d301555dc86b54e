//! Background reader polling

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use tracing::{debug, warn};
use vxauth_card::Card;

use crate::dipped::DippedSmartCardAuth;

/// Polls the reader on a fixed interval until stopped
///
/// Polls never overlap: each one runs to completion on the polling thread
/// before the next interval starts. Stopping or dropping the poller joins
/// the thread and releases the reader.
#[derive(Debug)]
pub struct AuthPoller {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl AuthPoller {
    /// Start polling with the interval from the auth configuration
    pub fn spawn<C: Card + 'static>(auth: Arc<DippedSmartCardAuth<C>>) -> Self {
        let interval = auth.config().poll_interval();
        Self::spawn_with_interval(auth, interval)
    }

    /// Start polling every `interval`
    pub fn spawn_with_interval<C: Card + 'static>(
        auth: Arc<DippedSmartCardAuth<C>>,
        interval: Duration,
    ) -> Self {
        let (stop, stopped) = bounded::<()>(1);
        let handle = thread::spawn(move || {
            debug!(?interval, "Reader polling started");
            loop {
                auth.check_card_reader();
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            auth.disconnect();
            debug!("Reader polling stopped");
        });

        Self {
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    /// Stop polling and wait for the last poll to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // dropping the sender wakes the thread
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Reader polling thread panicked");
            }
        }
    }
}

impl Drop for AuthPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
