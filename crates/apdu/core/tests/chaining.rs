//! Command and response chaining against a simulated card

use std::collections::VecDeque;

use bytes::Bytes;
use proptest::prelude::*;
use vxauth_apdu_core::command::{CLA_CHAINING_BIT, MAX_SHORT_DATA_LEN};
use vxauth_apdu_core::executor::INS_GET_RESPONSE;
use vxauth_apdu_core::prelude::*;

/// A card that reassembles chained commands and echoes the data back,
/// releasing at most `segment` bytes per response.
#[derive(Debug)]
struct EchoCard {
    segment: usize,
    received: Vec<u8>,
    pending: VecDeque<u8>,
    sent: Vec<Bytes>,
}

impl EchoCard {
    fn new(segment: usize) -> Self {
        Self {
            segment,
            received: Vec::new(),
            pending: VecDeque::new(),
            sent: Vec::new(),
        }
    }

    fn command_fragments(&self) -> usize {
        self.sent.iter().filter(|c| c[1] != INS_GET_RESPONSE).count()
    }

    fn next_segment(&mut self, le: usize) -> Bytes {
        let n = le.min(self.segment).min(self.pending.len());
        let mut out: Vec<u8> = self.pending.drain(..n).collect();
        match self.pending.len() {
            0 => out.extend_from_slice(&[0x90, 0x00]),
            rest if rest >= 256 => out.extend_from_slice(&[0x61, 0x00]),
            rest => out.extend_from_slice(&[0x61, rest as u8]),
        }
        Bytes::from(out)
    }
}

impl CardTransport for EchoCard {
    fn do_transmit_raw(&mut self, raw: &[u8]) -> Result<Bytes> {
        self.sent.push(Bytes::copy_from_slice(raw));
        let command = Command::from_bytes(raw)?;

        if command.ins == INS_GET_RESPONSE {
            let le = match command.le {
                Some(0) | None => 256,
                Some(n) => n as usize,
            };
            return Ok(self.next_segment(le));
        }

        self.received.extend_from_slice(&command.data);
        if command.cla & CLA_CHAINING_BIT != 0 {
            return Ok(Bytes::from_static(&[0x90, 0x00]));
        }

        self.pending = std::mem::take(&mut self.received).into();
        Ok(self.next_segment(256))
    }

    fn reader_status(&self) -> ReaderStatus {
        ReaderStatus::Ready
    }

    fn disconnect(&mut self) {}
}

fn expected_fragments(len: usize) -> usize {
    len.div_ceil(MAX_SHORT_DATA_LEN).max(1)
}

proptest! {
    #[test]
    fn chained_command_round_trips(data in proptest::collection::vec(any::<u8>(), 0..2000)) {
        let mut executor = CardExecutor::new(EchoCard::new(256));
        let command = Command::new_with_data(0x00, 0xDB, 0x3F, 0xFF, data.clone());

        let response = executor.transmit(&command).unwrap();

        prop_assert_eq!(response.as_ref(), data.as_slice());
        prop_assert_eq!(
            executor.transport().command_fragments(),
            expected_fragments(data.len())
        );
    }

    #[test]
    fn reassembly_matches_unchained_response(
        data in proptest::collection::vec(any::<u8>(), 1..1200),
        segment in 1usize..=256,
    ) {
        let mut chained = CardExecutor::new(EchoCard::new(segment));
        let mut single = CardExecutor::new(EchoCard::new(usize::MAX));
        let command = Command::new_with_data(0x00, 0xDB, 0x3F, 0xFF, data);

        prop_assert_eq!(
            chained.transmit(&command).unwrap(),
            single.transmit(&command).unwrap()
        );
    }
}

#[test]
fn fragment_count_at_chunk_boundaries() {
    for (len, fragments) in [(0, 1), (1, 1), (255, 1), (256, 2), (510, 2), (511, 3)] {
        let mut executor = CardExecutor::new(EchoCard::new(256));
        let command = Command::new_with_data(0x00, 0xDB, 0x3F, 0xFF, vec![0x5A; len]);
        executor.transmit(&command).unwrap();
        assert_eq!(
            executor.transport().command_fragments(),
            fragments,
            "data length {len}"
        );
    }
}

#[test]
fn intermediate_fragments_carry_chaining_bit() {
    let mut executor = CardExecutor::new(EchoCard::new(256));
    let command = Command::new_with_data(0x00, 0xDB, 0x3F, 0xFF, vec![0x11; 600]);
    executor.transmit(&command).unwrap();

    let sent = &executor.transport().sent;
    assert_eq!(sent[0][0], 0x10);
    assert_eq!(sent[1][0], 0x10);
    assert_eq!(sent[2][0], 0x00);
    assert!(sent[3..].iter().all(|c| c[1] == INS_GET_RESPONSE));
}
