//! Incremental decoder from raw terminal bytes to `KeyCommand`s.
//!
//! Reads may split an escape sequence or a multi-byte UTF-8 character at any
//! byte; incomplete tails are kept in `pending` and completed by the next
//! `feed`. Anything that does not map to a command is dropped.

use core_events::KeyCommand;

const ESC: u8 = 0x1b;
/// Longest CSI sequence we are willing to buffer before giving up on it.
const MAX_SEQUENCE_LEN: usize = 16;

pub const PAGE: isize = 10;

#[derive(Debug, Default)]
pub struct KeyDecoder {
    pending: Vec<u8>,
}

/// Outcome of decoding one complete unit at the front of the buffer.
enum Step {
    Command(KeyCommand, usize),
    Discard(usize),
    Incomplete,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes held back waiting for the rest of a sequence.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Decode `bytes`, appending recognised commands to `out`. Returns the
    /// number of bytes discarded as unrecognised.
    pub fn feed(&mut self, bytes: &[u8], out: &mut Vec<KeyCommand>) -> usize {
        self.pending.extend_from_slice(bytes);
        let mut pos = 0;
        let mut discarded = 0;
        while pos < self.pending.len() {
            match decode_one(&self.pending[pos..]) {
                Step::Command(cmd, used) => {
                    out.push(cmd);
                    pos += used;
                }
                Step::Discard(used) => {
                    discarded += used;
                    pos += used;
                }
                Step::Incomplete => break,
            }
        }
        self.pending.drain(..pos);
        discarded
    }
}

fn decode_one(buf: &[u8]) -> Step {
    let lead = buf[0];
    if lead == ESC {
        return decode_escape(buf);
    }
    let len = utf8_char_len(lead);
    if len == 0 {
        return Step::Discard(1);
    }
    // Bad lead byte: drop it alone so the byte after it still decodes.
    if buf[1..].iter().take(len - 1).any(|&b| b & 0xc0 != 0x80) {
        return Step::Discard(1);
    }
    if buf.len() < len {
        return Step::Incomplete;
    }
    match std::str::from_utf8(&buf[..len]) {
        Ok(s) => match s.chars().next().and_then(map_char) {
            Some(cmd) => Step::Command(cmd, len),
            None => Step::Discard(len),
        },
        Err(_) => Step::Discard(1),
    }
}

fn decode_escape(buf: &[u8]) -> Step {
    let Some(&intro) = buf.get(1) else {
        return Step::Incomplete;
    };
    match intro {
        // SS3 arrows, sent when the terminal is in application cursor mode.
        b'O' => match buf.get(2) {
            None => Step::Incomplete,
            Some(b'A') => Step::Command(KeyCommand::Scroll(-1), 3),
            Some(b'B') => Step::Command(KeyCommand::Scroll(1), 3),
            Some(_) => Step::Discard(3),
        },
        b'[' => decode_csi(buf),
        // Lone ESC (or Alt+key): drop the ESC and decode what follows on its own.
        _ => Step::Discard(1),
    }
}

fn decode_csi(buf: &[u8]) -> Step {
    // Parameter and intermediate bytes are 0x20..=0x3F; the final byte is 0x40..=0x7E.
    for (i, &b) in buf.iter().enumerate().skip(2) {
        if i >= MAX_SEQUENCE_LEN {
            return Step::Discard(i);
        }
        match b {
            0x20..=0x3f => continue,
            0x40..=0x7e => {
                let used = i + 1;
                return match &buf[2..used] {
                    b"A" => Step::Command(KeyCommand::Scroll(-1), used),
                    b"B" => Step::Command(KeyCommand::Scroll(1), used),
                    b"5~" => Step::Command(KeyCommand::Scroll(-PAGE), used),
                    b"6~" => Step::Command(KeyCommand::Scroll(PAGE), used),
                    _ => Step::Discard(used),
                };
            }
            // Not a CSI body after all; drop the introducer and resync.
            _ => return Step::Discard(i),
        }
    }
    Step::Incomplete
}

/// Byte length of a UTF-8 character from its leading byte; 0 for bytes that
/// cannot start a character.
pub fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 0,
    }
}

fn map_char(ch: char) -> Option<KeyCommand> {
    Some(match ch {
        'q' | '\u{3}' => KeyCommand::Quit,
        'w' | ' ' => KeyCommand::PauseToggle,
        'r' => KeyCommand::Refresh,
        'k' => KeyCommand::Scroll(-1),
        'j' => KeyCommand::Scroll(1),
        // Ctrl-B / Ctrl-U
        '\u{2}' | '\u{15}' => KeyCommand::Scroll(-PAGE),
        // Ctrl-F / Ctrl-D
        '\u{6}' | '\u{4}' => KeyCommand::Scroll(PAGE),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode(bytes: &[u8]) -> (Vec<KeyCommand>, usize) {
        let mut d = KeyDecoder::new();
        let mut out = Vec::new();
        let discarded = d.feed(bytes, &mut out);
        (out, discarded)
    }

    #[test]
    fn single_keys() {
        let (cmds, dropped) = decode(b"qwr jk");
        assert_eq!(
            cmds,
            vec![
                KeyCommand::Quit,
                KeyCommand::PauseToggle,
                KeyCommand::Refresh,
                KeyCommand::PauseToggle,
                KeyCommand::Scroll(1),
                KeyCommand::Scroll(-1),
            ]
        );
        assert_eq!(dropped, 0);
    }

    #[test]
    fn ctrl_c_quits() {
        assert_eq!(decode(&[0x03]).0, vec![KeyCommand::Quit]);
    }

    #[test]
    fn arrows_and_pages() {
        let (cmds, _) = decode(b"\x1b[A\x1b[B\x1b[5~\x1b[6~\x1bOA");
        assert_eq!(
            cmds,
            vec![
                KeyCommand::Scroll(-1),
                KeyCommand::Scroll(1),
                KeyCommand::Scroll(-10),
                KeyCommand::Scroll(10),
                KeyCommand::Scroll(-1),
            ]
        );
    }

    #[test]
    fn control_byte_pages() {
        let (cmds, _) = decode(&[0x02, 0x15, 0x06, 0x04]);
        assert_eq!(
            cmds,
            vec![
                KeyCommand::Scroll(-10),
                KeyCommand::Scroll(-10),
                KeyCommand::Scroll(10),
                KeyCommand::Scroll(10),
            ]
        );
    }

    #[test]
    fn unknown_input_is_discarded() {
        let (cmds, dropped) = decode(b"x\x1b[C\xc3\xa9\x1b[1;5Dq");
        assert_eq!(cmds, vec![KeyCommand::Quit]);
        // x + ESC[C + é (2 bytes) + ESC[1;5D
        assert_eq!(dropped, 1 + 3 + 2 + 6);
    }

    #[test]
    fn invalid_utf8_lead_does_not_swallow_next_key() {
        let (cmds, dropped) = decode(b"\xc3q");
        assert_eq!(cmds, vec![KeyCommand::Quit]);
        assert_eq!(dropped, 1);

        let mut d = KeyDecoder::new();
        let mut cmds = Vec::new();
        assert_eq!(d.feed(b"\xe2", &mut cmds), 0);
        assert_eq!(d.feed(b"r", &mut cmds), 1);
        assert_eq!(d.feed(b"x", &mut cmds), 1);
        assert_eq!(cmds, vec![KeyCommand::Refresh]);
        assert!(d.pending().is_empty());
    }

    #[test]
    fn sequence_split_across_reads() {
        let mut d = KeyDecoder::new();
        let mut out = Vec::new();
        d.feed(b"\x1b", &mut out);
        d.feed(b"[", &mut out);
        assert!(out.is_empty());
        assert_eq!(d.pending(), b"\x1b[");
        d.feed(b"6", &mut out);
        d.feed(b"~q", &mut out);
        assert_eq!(out, vec![KeyCommand::Scroll(10), KeyCommand::Quit]);
        assert!(d.pending().is_empty());
    }

    #[test]
    fn utf8_split_across_reads_is_consumed_whole() {
        let mut d = KeyDecoder::new();
        let mut out = Vec::new();
        let bytes = "日".as_bytes();
        assert_eq!(d.feed(&bytes[..1], &mut out), 0);
        assert_eq!(d.feed(&bytes[1..], &mut out), 3);
        assert!(d.pending().is_empty());
    }

    #[test]
    fn esc_followed_by_key_keeps_the_key() {
        assert_eq!(decode(b"\x1bq").0, vec![KeyCommand::Quit]);
    }

    #[test]
    fn stray_continuation_byte_dropped() {
        let (cmds, dropped) = decode(&[0x80, b'r']);
        assert_eq!(cmds, vec![KeyCommand::Refresh]);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn utf8_lengths() {
        assert_eq!(utf8_char_len(b'a'), 1);
        assert_eq!(utf8_char_len(0xc3), 2);
        assert_eq!(utf8_char_len(0xe6), 3);
        assert_eq!(utf8_char_len(0xf0), 4);
        assert_eq!(utf8_char_len(0x80), 0);
        assert_eq!(utf8_char_len(0xff), 0);
    }

    proptest! {
        // Splitting a byte stream across reads never changes what it decodes to.
        #[test]
        fn chunking_is_transparent(bytes in proptest::collection::vec(any::<u8>(), 0..64), cut in 0usize..64) {
            let cut = cut.min(bytes.len());
            let (whole, _) = decode(&bytes);
            let mut d = KeyDecoder::new();
            let mut split = Vec::new();
            d.feed(&bytes[..cut], &mut split);
            d.feed(&bytes[cut..], &mut split);
            prop_assert_eq!(whole, split);
        }
    }
}
