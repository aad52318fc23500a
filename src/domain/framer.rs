//! Line framer - splits a raw byte stream into newline-terminated lines
//!
//! Bytes arrive from the source in arbitrary chunks. The framer accumulates
//! them and hands out complete lines as soon as a terminator is seen,
//! keeping any trailing partial line until the next chunk arrives.

/// Line terminator byte
pub const LINE_TERMINATOR: u8 = b'\n';

/// Accumulating line framer
///
/// There is no line length limit: a source that never sends a terminator
/// grows the buffer without bound. Sensor telemetry is low-rate and trusted,
/// so this is accepted.
#[derive(Clone, Debug, Default)]
pub struct LineFramer {
    /// Bytes received but not yet emitted as part of a line
    buffer: Vec<u8>,
}

impl LineFramer {
    /// Create an empty framer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create an empty framer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Append a chunk of raw bytes
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Extract the next complete line, terminator included
    ///
    /// Returns `None` once no terminator remains; the leftover bytes stay
    /// buffered for the next [`feed`](Self::feed).
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buffer.iter().position(|&b| b == LINE_TERMINATOR)?;
        let rest = self.buffer.split_off(pos + 1);
        Some(std::mem::replace(&mut self.buffer, rest))
    }

    /// Drain every complete line currently buffered, in order
    pub fn lines(&mut self) -> Lines<'_> {
        Lines { framer: self }
    }

    /// Bytes waiting for a terminator
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether no bytes are waiting
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Iterator returned by [`LineFramer::lines`]
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_line() {
        let mut framer = LineFramer::new();
        framer.feed(b"23.5\n");
        assert_eq!(framer.next_line().as_deref(), Some(&b"23.5\n"[..]));
        assert_eq!(framer.next_line(), None);
        assert!(framer.is_empty());
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut framer = LineFramer::new();
        framer.feed(b"1\n2\n3\n");
        let lines: Vec<Vec<u8>> = framer.lines().collect();
        assert_eq!(lines, vec![b"1\n".to_vec(), b"2\n".to_vec(), b"3\n".to_vec()]);
    }

    #[test]
    fn test_partial_line_is_retained() {
        let mut framer = LineFramer::new();
        framer.feed(b"12.");
        assert_eq!(framer.next_line(), None);
        assert_eq!(framer.buffered(), b"12.");

        framer.feed(b"3\n4");
        assert_eq!(framer.next_line().as_deref(), Some(&b"12.3\n"[..]));
        assert_eq!(framer.next_line(), None);
        assert_eq!(framer.buffered(), b"4");
    }

    #[test]
    fn test_crlf_terminator_split_across_feeds() {
        let mut framer = LineFramer::new();
        framer.feed(b"42\r");
        assert_eq!(framer.next_line(), None);
        framer.feed(b"\n");
        assert_eq!(framer.next_line().as_deref(), Some(&b"42\r\n"[..]));
    }

    #[test]
    fn test_empty_lines_are_emitted() {
        let mut framer = LineFramer::with_capacity(16);
        framer.feed(b"\n\n");
        assert_eq!(framer.lines().count(), 2);
    }

    proptest! {
        /// Emitted lines concatenate back to the input, minus the unterminated tail.
        #[test]
        fn prop_lines_reassemble_input(
            data in prop::collection::vec(prop_oneof![Just(b'\n'), any::<u8>()], 0..512),
            cuts in prop::collection::vec(0usize..512, 0..16),
        ) {
            let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c.min(data.len())).collect();
            cuts.push(0);
            cuts.push(data.len());
            cuts.sort_unstable();

            let mut framer = LineFramer::new();
            let mut emitted = Vec::new();
            for window in cuts.windows(2) {
                framer.feed(&data[window[0]..window[1]]);
                for line in framer.lines() {
                    prop_assert_eq!(line.last(), Some(&LINE_TERMINATOR));
                    prop_assert_eq!(line.iter().filter(|&&b| b == LINE_TERMINATOR).count(), 1);
                    emitted.extend_from_slice(&line);
                }
                prop_assert!(!framer.buffered().contains(&LINE_TERMINATOR));
            }

            let terminated = data
                .iter()
                .rposition(|&b| b == LINE_TERMINATOR)
                .map_or(0, |pos| pos + 1);
            prop_assert_eq!(&emitted[..], &data[..terminated]);
            prop_assert_eq!(framer.buffered(), &data[terminated..]);
        }
    }
}
