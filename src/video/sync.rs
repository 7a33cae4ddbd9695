//! Timing reference detection inside the video substream

use crate::types::Trc;
use crate::types::wire::trc::{PREAMBLE_00, PREAMBLE_FF};

/// Position of the scanner relative to a `ff 00 00 XY` sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Searching,
    /// Seen `ff`
    Prefix1,
    /// Seen `ff 00`
    Prefix2,
    /// Seen `ff 00 00`, next byte is the TRC
    MarkerByte,
}

/// Consumer of the demultiplexed video substream.
pub trait VideoSink {
    /// One byte of video payload.
    fn payload(&mut self, byte: u8);

    /// A timing reference code.
    fn trc(&mut self, trc: Trc);
}

/// Byte scanner separating timing reference codes from video payload.
///
/// State survives between calls, so a preamble split across chunks is still
/// recognised. Bytes consumed by a preamble that turns out to be payload are
/// replayed to the sink in their original order.
#[derive(Debug, Clone, Default)]
pub struct SyncEngine {
    state: SyncState,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = SyncState::Searching;
    }

    /// Scan one video chunk payload.
    pub fn scan<S: VideoSink + ?Sized>(&mut self, data: &[u8], sink: &mut S) {
        for &byte in data {
            self.state = match self.state {
                SyncState::Searching => {
                    if byte == PREAMBLE_FF {
                        SyncState::Prefix1
                    } else {
                        sink.payload(byte);
                        SyncState::Searching
                    }
                }
                SyncState::Prefix1 => {
                    if byte == PREAMBLE_00 {
                        SyncState::Prefix2
                    } else {
                        sink.payload(PREAMBLE_FF);
                        sink.payload(byte);
                        SyncState::Searching
                    }
                }
                SyncState::Prefix2 => {
                    if byte == PREAMBLE_00 {
                        SyncState::MarkerByte
                    } else {
                        sink.payload(PREAMBLE_FF);
                        sink.payload(PREAMBLE_00);
                        sink.payload(byte);
                        SyncState::Searching
                    }
                }
                SyncState::MarkerByte => {
                    sink.trc(Trc::new(byte));
                    SyncState::Searching
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Default)]
    struct Recorder {
        payload: Vec<u8>,
        codes: Vec<u8>,
        /// Payload and TRC bytes in emission order
        merged: Vec<u8>,
    }

    impl VideoSink for Recorder {
        fn payload(&mut self, byte: u8) {
            self.payload.push(byte);
            self.merged.push(byte);
        }

        fn trc(&mut self, trc: Trc) {
            self.codes.push(trc.value());
            self.merged.push(trc.value());
        }
    }

    /// Lookahead formulation of the scanner: a preamble byte claims the
    /// byte after it, whatever it is.
    fn strip_preambles(input: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len());
        let mut i = 0;
        while i < input.len() {
            if input[i] != 0xff {
                out.push(input[i]);
                i += 1;
                continue;
            }
            match input.get(i + 1) {
                None => break,
                Some(&b) if b != 0x00 => {
                    out.extend([0xff, b]);
                    i += 2;
                    continue;
                }
                Some(_) => {}
            }
            match input.get(i + 2) {
                None => break,
                Some(&b) if b != 0x00 => {
                    out.extend([0xff, 0x00, b]);
                    i += 3;
                    continue;
                }
                Some(_) => {}
            }
            match input.get(i + 3) {
                None => break,
                Some(&code) => {
                    out.push(code);
                    i += 4;
                }
            }
        }
        out
    }

    #[test]
    fn detects_trc_after_preamble() {
        let mut engine = SyncEngine::new();
        let mut sink = Recorder::default();
        engine.scan(&[0x10, 0xff, 0x00, 0x00, 0x80, 0x20], &mut sink);
        assert_eq!(sink.payload, vec![0x10, 0x20]);
        assert_eq!(sink.codes, vec![0x80]);
        assert_eq!(engine.state(), SyncState::Searching);
    }

    #[test]
    fn false_prefix_is_replayed() {
        let mut engine = SyncEngine::new();
        let mut sink = Recorder::default();
        engine.scan(&[0xff, 0x12, 0xff, 0x00, 0x34, 0xff, 0x00, 0xff], &mut sink);
        assert_eq!(sink.payload, vec![0xff, 0x12, 0xff, 0x00, 0x34, 0xff, 0x00, 0xff]);
        assert!(sink.codes.is_empty());
        assert_eq!(engine.state(), SyncState::Searching);
    }

    #[test]
    fn preamble_split_across_chunks() {
        let mut engine = SyncEngine::new();
        let mut sink = Recorder::default();
        engine.scan(&[0x01, 0xff], &mut sink);
        assert_eq!(engine.state(), SyncState::Prefix1);
        engine.scan(&[0x00], &mut sink);
        assert_eq!(engine.state(), SyncState::Prefix2);
        engine.scan(&[0x00], &mut sink);
        assert_eq!(engine.state(), SyncState::MarkerByte);
        engine.scan(&[0x9d, 0x02], &mut sink);
        assert_eq!(sink.payload, vec![0x01, 0x02]);
        assert_eq!(sink.codes, vec![0x9d]);
    }

    #[test]
    fn reset_drops_pending_prefix() {
        let mut engine = SyncEngine::new();
        let mut sink = Recorder::default();
        engine.scan(&[0xff, 0x00], &mut sink);
        engine.reset();
        assert_eq!(engine.state(), SyncState::Searching);
        engine.scan(&[0x00, 0x80], &mut sink);
        assert_eq!(sink.payload, vec![0x00, 0x80]);
        assert!(sink.codes.is_empty());
    }

    proptest! {
        #[test]
        fn prop_only_genuine_preambles_are_removed(
            input in prop::collection::vec(prop_oneof![Just(0xffu8), Just(0x00u8), any::<u8>()], 0..512)
        ) {
            let mut engine = SyncEngine::new();
            let mut sink = Recorder::default();
            engine.scan(&input, &mut sink);
            prop_assert_eq!(sink.merged, strip_preambles(&input));
        }

        #[test]
        fn prop_chunking_does_not_change_output(
            input in prop::collection::vec(prop_oneof![Just(0xffu8), Just(0x00u8), any::<u8>()], 0..512),
            split in 1usize..64
        ) {
            let mut whole = Recorder::default();
            SyncEngine::new().scan(&input, &mut whole);

            let mut engine = SyncEngine::new();
            let mut pieces = Recorder::default();
            for chunk in input.chunks(split) {
                engine.scan(chunk, &mut pieces);
            }
            prop_assert_eq!(whole.merged, pieces.merged);
        }
    }
}
