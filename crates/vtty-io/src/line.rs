//! Line protocol decoder.
//!
//! Turns a chunked byte stream into classified command lines:
//!
//! - `\r` or `\n` ends a line unless it is inside a `"` quoted region.
//!   A complementary terminator right behind it (`\r\n`, `\n\r`) belongs
//!   to the same line end.
//! - Terminated text is right-trimmed; empty lines are dropped.
//! - Unterminated text reaching `max_len` bytes is cut and emitted as
//!   [`InputState::OutOfRange`].
//! - [`LineDecoder::expire`] abandons a stalled partial line as
//!   [`InputState::Timeout`].
//!
//! The decoder is not thread-aware; [`crate::VttyIo`] drives it from its
//! input unit.

use std::io;

use crate::transport::Transport;

/// Classification of a command line handed to the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    /// Nothing was read.
    Nil,
    /// A complete, terminated line.
    Valid,
    /// The line hit the length limit and was cut.
    OutOfRange,
    /// The transport went silent while a line was partially received.
    Timeout,
    /// `read` gave up waiting for a line.
    ReadTimeout,
}

/// One decoded command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub text: String,
    pub state: InputState,
}

impl CommandLine {
    pub fn new(text: impl Into<String>, state: InputState) -> Self {
        Self {
            text: text.into(),
            state,
        }
    }

    /// A line with no text, used for `Nil` and `ReadTimeout`.
    pub fn empty(state: InputState) -> Self {
        Self::new(String::new(), state)
    }
}

/// Whitespace removed from the end of every emitted line.
fn is_trailing_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

fn rtrim(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| !is_trailing_space(b))
        .map_or(0, |i| i + 1);
    &bytes[..end]
}

/// Byte stream to command line state machine.
#[derive(Debug)]
pub struct LineDecoder {
    /// Bytes received but not yet scanned.
    buffer: Vec<u8>,
    /// Unterminated line being accumulated.
    current: Vec<u8>,
    in_quote: bool,
    max_len: usize,
}

impl LineDecoder {
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(256),
            current: Vec::with_capacity(max_len.min(1024)),
            in_quote: false,
            max_len: max_len.max(1),
        }
    }

    /// Append raw bytes to the receive buffer.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pull every byte the transport currently has into the receive buffer.
    ///
    /// Returns whether anything arrived.
    pub fn feed(&mut self, transport: &mut dyn Transport) -> io::Result<bool> {
        let available = transport.available();
        if available == 0 {
            return Ok(false);
        }
        let start = self.buffer.len();
        self.buffer.resize(start + available, 0);
        let read = match transport.read(&mut self.buffer[start..]) {
            Ok(n) => n.min(available),
            Err(e) => {
                self.buffer.truncate(start);
                return Err(e);
            },
        };
        self.buffer.truncate(start + read);
        Ok(read != 0)
    }

    /// Scan the receive buffer and return the lines it completes.
    ///
    /// An unterminated tail stays in the decoder for the next call.
    pub fn consume(&mut self) -> Vec<CommandLine> {
        let mut lines = Vec::new();
        let mut pos = 0;

        while pos < self.buffer.len() {
            let ch = self.buffer[pos];
            match ch {
                b'"' => {
                    self.in_quote = !self.in_quote;
                    self.current.push(ch);
                },
                b'\r' | b'\n' if !self.in_quote => {
                    let trimmed = rtrim(&self.current);
                    if !trimmed.is_empty() {
                        lines.push(Self::emit(trimmed, InputState::Valid));
                    }
                    self.current.clear();

                    let complement = if ch == b'\r' { b'\n' } else { b'\r' };
                    if self.buffer.get(pos + 1) == Some(&complement) {
                        pos += 1;
                    }
                },
                _ => self.current.push(ch),
            }

            if self.current.len() >= self.max_len {
                lines.push(Self::emit(rtrim(&self.current), InputState::OutOfRange));
                self.current.clear();
            }

            pos += 1;
        }

        self.buffer.clear();
        lines
    }

    /// Whether a partial line is pending.
    pub fn has_partial(&self) -> bool {
        !self.current.is_empty() || !self.buffer.is_empty()
    }

    /// Abandon the pending partial line.
    ///
    /// Returns it tagged `Timeout` (if there was one) and resets all
    /// in-progress state.
    pub fn expire(&mut self) -> Option<CommandLine> {
        let line = (!self.current.is_empty())
            .then(|| Self::emit(rtrim(&self.current), InputState::Timeout));
        self.reset();
        line
    }

    /// Consume what is buffered and terminate the partial tail as if a
    /// line end had arrived.
    ///
    /// Used when the transport closes with an unterminated line.
    pub fn finish(&mut self) -> Vec<CommandLine> {
        let mut lines = self.consume();
        let trimmed = rtrim(&self.current);
        if !trimmed.is_empty() {
            lines.push(Self::emit(trimmed, InputState::Valid));
        }
        self.reset();
        lines
    }

    /// Discard buffered bytes, the partial line and the quote state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.current.clear();
        self.in_quote = false;
    }

    fn emit(bytes: &[u8], state: InputState) -> CommandLine {
        CommandLine::new(String::from_utf8_lossy(bytes), state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;

    fn decode(decoder: &mut LineDecoder, bytes: &[u8]) -> Vec<CommandLine> {
        decoder.extend(bytes);
        decoder.consume()
    }

    fn texts(lines: &[CommandLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn splits_on_each_terminator_style() {
        let mut d = LineDecoder::new(1024);
        let lines = decode(&mut d, b"one\ntwo\rthree\r\nfour\n\rfive\n");
        assert_eq!(texts(&lines), vec!["one", "two", "three", "four", "five"]);
        assert!(lines.iter().all(|l| l.state == InputState::Valid));
    }

    #[test]
    fn double_terminator_of_same_kind_is_two_line_ends() {
        let mut d = LineDecoder::new(1024);
        // "\n\n" is two (empty) line ends, so nothing extra is emitted.
        let lines = decode(&mut d, b"a\n\nb\n");
        assert_eq!(texts(&lines), vec!["a", "b"]);
    }

    #[test]
    fn trailing_whitespace_is_trimmed_and_blank_lines_dropped() {
        let mut d = LineDecoder::new(1024);
        let lines = decode(&mut d, b"ps  \t\n   \n\x0b\n");
        assert_eq!(texts(&lines), vec!["ps"]);
    }

    #[test]
    fn leading_whitespace_is_kept() {
        let mut d = LineDecoder::new(1024);
        let lines = decode(&mut d, b"  echo\n");
        assert_eq!(texts(&lines), vec!["  echo"]);
    }

    #[test]
    fn partial_line_survives_across_chunks() {
        let mut d = LineDecoder::new(1024);
        assert!(decode(&mut d, b"ec").is_empty());
        assert!(d.has_partial());
        let lines = decode(&mut d, b"ho hi\r\n");
        assert_eq!(texts(&lines), vec!["echo hi"]);
        assert!(!d.has_partial());
    }

    #[test]
    fn terminators_inside_quotes_are_literal() {
        let mut d = LineDecoder::new(1024);
        let lines = decode(&mut d, b"echo \"a\nb\"\n");
        assert_eq!(texts(&lines), vec!["echo \"a\nb\""]);
    }

    #[test]
    fn unterminated_quote_keeps_accumulating() {
        let mut d = LineDecoder::new(1024);
        assert!(decode(&mut d, b"echo \"open\n").is_empty());
        assert!(decode(&mut d, b"still\r\n").is_empty());
        let lines = decode(&mut d, b"closed\"\n");
        assert_eq!(texts(&lines), vec!["echo \"open\nstill\r\nclosed\""]);
    }

    #[test]
    fn single_quotes_do_not_protect_terminators() {
        let mut d = LineDecoder::new(1024);
        let lines = decode(&mut d, b"echo 'a\nb'\n");
        assert_eq!(texts(&lines), vec!["echo 'a", "b'"]);
    }

    #[test]
    fn overlong_line_is_cut_once_then_resumes() {
        let mut d = LineDecoder::new(8);
        let lines = decode(&mut d, b"0123456789ab\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CommandLine::new("01234567", InputState::OutOfRange));
        assert_eq!(lines[1], CommandLine::new("89ab", InputState::Valid));
    }

    #[test]
    fn line_exactly_below_limit_is_valid() {
        let mut d = LineDecoder::new(8);
        let lines = decode(&mut d, b"0123456\n");
        assert_eq!(lines, vec![CommandLine::new("0123456", InputState::Valid)]);
    }

    #[test]
    fn expire_emits_partial_and_resets() {
        let mut d = LineDecoder::new(1024);
        decode(&mut d, b"echo \"half ");
        let line = d.expire().expect("partial line");
        assert_eq!(line, CommandLine::new("echo \"half", InputState::Timeout));
        assert!(!d.has_partial());
        // Quote state was reset too: the next newline terminates normally.
        let lines = decode(&mut d, b"ps\n");
        assert_eq!(texts(&lines), vec!["ps"]);
    }

    #[test]
    fn expire_without_partial_is_none() {
        let mut d = LineDecoder::new(1024);
        assert!(d.expire().is_none());
    }

    #[test]
    fn finish_terminates_tail() {
        let mut d = LineDecoder::new(1024);
        d.extend(b"help\nps");
        let lines = d.finish();
        assert_eq!(texts(&lines), vec!["help", "ps"]);
        assert!(d.finish().is_empty());
    }

    #[test]
    fn utf8_split_across_chunks_is_preserved() {
        let mut d = LineDecoder::new(1024);
        let bytes = "echo héllo\n".as_bytes();
        let split = 7; // inside the two-byte 'é'
        assert!(decode(&mut d, &bytes[..split]).is_empty());
        let lines = decode(&mut d, &bytes[split..]);
        assert_eq!(texts(&lines), vec!["echo héllo"]);
    }

    #[test]
    fn feed_pulls_from_transport() {
        let mut t = MemoryTransport::new();
        let mut d = LineDecoder::new(1024);
        assert!(!d.feed(&mut t).unwrap());
        t.push_input("help\n");
        assert!(d.feed(&mut t).unwrap());
        assert_eq!(texts(&d.consume()), vec!["help"]);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn valid_lines(chunks: &[&[u8]]) -> Vec<String> {
            let mut d = LineDecoder::new(1024);
            let mut out = Vec::new();
            for chunk in chunks {
                d.extend(chunk);
                out.extend(
                    d.consume()
                        .into_iter()
                        .filter(|l| l.state == InputState::Valid)
                        .map(|l| l.text),
                );
            }
            out
        }

        proptest! {
            #[test]
            fn chunk_boundaries_do_not_change_lines(
                input in proptest::collection::vec(
                    prop_oneof![
                        Just(b'\n'), Just(b'\r'), Just(b'"'), Just(b' '),
                        b'a'..=b'z',
                    ],
                    0..200,
                ),
                cuts in proptest::collection::vec(any::<proptest::sample::Index>(), 0..8),
            ) {
                let mut points: Vec<usize> = cuts.iter().map(|c| c.index(input.len() + 1)).collect();
                points.sort_unstable();
                points.dedup();

                let mut chunks = Vec::new();
                let mut start = 0;
                for p in points {
                    chunks.push(&input[start..p]);
                    start = p;
                }
                chunks.push(&input[start..]);

                prop_assert_eq!(valid_lines(&chunks), valid_lines(&[&input[..]]));
            }
        }
    }
}
