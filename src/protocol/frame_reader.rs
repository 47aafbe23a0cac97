//! Frame reader for `]]>]]>`-delimited NETCONF 1.0 messages.
//!
//! Uses `bytes::BytesMut` as the accumulation buffer. The buffer, not line
//! boundaries, decides where a message ends, so a delimiter split across two
//! socket reads is still found.
//!
//! Each emitted frame is the text before the delimiter plus a trailing `\n`.
//! The line break that follows a delimiter on the wire belongs to it and is
//! dropped, even if it only shows up in the next read.
//!
//! # Example
//!
//! ```
//! use netconf_emu::protocol::FrameReader;
//!
//! let mut reader = FrameReader::new();
//!
//! assert!(reader.push(b"<hello/>]]").unwrap().is_empty());
//! let frames = reader.push(b">]]>\n").unwrap();
//! assert_eq!(frames, vec!["<hello/>\n".to_string()]);
//! ```

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{NetconfError, Result};

/// End-of-message marker.
pub const DELIMITER: &[u8] = b"]]>]]>";

/// Default upper bound for a single frame: 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

const READ_CHUNK: usize = 8 * 1024;

/// Splits an incoming byte stream into message texts.
pub struct FrameReader {
    /// Accumulated bytes not yet emitted.
    buffer: BytesMut,
    /// Offset from which the next delimiter search starts.
    scan_from: usize,
    /// A delimiter was just consumed; a following line break is dropped.
    after_delimiter: bool,
    /// Maximum bytes buffered without seeing a delimiter.
    max_frame_size: usize,
}

impl FrameReader {
    /// Create a new frame reader with default settings.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a new frame reader with a custom frame size limit.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(READ_CHUNK),
            scan_from: 0,
            after_delimiter: false,
            max_frame_size,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Partial data stays buffered for the next push.
    ///
    /// # Errors
    ///
    /// Fails when the buffered message exceeds the size limit or a complete
    /// frame is not valid UTF-8.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }

        if self.buffer.len() > self.max_frame_size {
            return Err(NetconfError::framing(format!(
                "Frame size {} exceeds maximum {} without delimiter",
                self.buffer.len(),
                self.max_frame_size
            )));
        }

        Ok(frames)
    }

    /// Read from `reader` until one frame is complete.
    ///
    /// Returns `Ok(None)` at end of stream; a partial message pending at that
    /// point is discarded.
    pub async fn next_frame<R>(&mut self, reader: &mut R) -> Result<Option<String>>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Some(frame) = self.try_extract_one()? {
                return Ok(Some(frame));
            }
            // Only the unterminated remainder counts against the limit
            if self.buffer.len() > self.max_frame_size {
                return Err(NetconfError::framing(format!(
                    "Frame size {} exceeds maximum {} without delimiter",
                    self.buffer.len(),
                    self.max_frame_size
                )));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                if !self.is_empty() {
                    tracing::debug!(
                        "Stream ended with {} bytes of unterminated message",
                        self.buffer.len()
                    );
                }
                return Ok(None);
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    fn try_extract_one(&mut self) -> Result<Option<String>> {
        self.skip_delimiter_line_break();

        let haystack = &self.buffer[self.scan_from..];
        let Some(pos) = haystack
            .windows(DELIMITER.len())
            .position(|window| window == DELIMITER)
        else {
            // The delimiter may straddle the end of the buffer.
            self.scan_from = self.buffer.len().saturating_sub(DELIMITER.len() - 1);
            return Ok(None);
        };

        let end = self.scan_from + pos;
        let message = self.buffer.split_to(end);
        self.buffer.advance(DELIMITER.len());
        self.scan_from = 0;
        self.after_delimiter = true;

        let mut text = String::from_utf8(message.to_vec())
            .map_err(|e| NetconfError::framing(format!("Frame is not valid UTF-8: {e}")))?;
        text.push('\n');

        tracing::trace!("Frame complete ({} bytes)", text.len());
        Ok(Some(text))
    }

    /// Drop the `\n` or `\r\n` following the previous delimiter.
    fn skip_delimiter_line_break(&mut self) {
        while self.after_delimiter {
            match self.buffer.first() {
                Some(b'\r') => self.buffer.advance(1),
                Some(b'\n') => {
                    self.buffer.advance(1);
                    self.after_delimiter = false;
                }
                Some(_) => self.after_delimiter = false,
                None => break,
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scan_from = 0;
        self.after_delimiter = false;
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = "<hello><capabilities><capability>urn:ietf:params:netconf:base:1.0</capability></capabilities></hello>";

    fn framed(body: &str) -> Vec<u8> {
        let mut bytes = body.as_bytes().to_vec();
        bytes.extend_from_slice(DELIMITER);
        bytes.push(b'\n');
        bytes
    }

    #[test]
    fn test_single_complete_frame() {
        let mut reader = FrameReader::new();

        let frames = reader.push(&framed(HELLO)).unwrap();

        assert_eq!(frames, vec![format!("{HELLO}\n")]);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut reader = FrameReader::new();
        let mut data = framed("<a/>");
        data.extend(framed("<b/>"));
        data.extend(framed("<c/>"));

        let frames = reader.push(&data).unwrap();

        assert_eq!(frames, vec!["<a/>\n", "<b/>\n", "<c/>\n"]);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_multiline_message_keeps_inner_newlines() {
        let mut reader = FrameReader::new();

        let frames = reader.push(b"<rpc message-id=\"1\">\n  <get/>\n</rpc>]]>]]>\n").unwrap();

        assert_eq!(frames, vec!["<rpc message-id=\"1\">\n  <get/>\n</rpc>\n"]);
    }

    #[test]
    fn test_delimiter_split_across_pushes() {
        let mut reader = FrameReader::new();

        assert!(reader.push(b"<a/>]]>").unwrap().is_empty());
        assert!(reader.push(b"]]").unwrap().is_empty());
        let frames = reader.push(b">\n<b/>").unwrap();

        assert_eq!(frames, vec!["<a/>\n"]);
        assert_eq!(reader.len(), 4);
    }

    #[test]
    fn test_line_break_after_delimiter_in_next_push() {
        let mut reader = FrameReader::new();

        let frames = reader.push(b"<a/>]]>]]>").unwrap();
        assert_eq!(frames, vec!["<a/>\n"]);

        let frames = reader.push(b"\r\n<b/>]]>]]>\n").unwrap();
        assert_eq!(frames, vec!["<b/>\n"]);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut reader = FrameReader::new();
        let mut data = framed(HELLO);
        data.extend(framed("<rpc message-id=\"1\"><get/></rpc>"));

        let mut all_frames = Vec::new();
        for byte in &data {
            all_frames.extend(reader.push(&[*byte]).unwrap());
        }

        assert_eq!(
            all_frames,
            vec![
                format!("{HELLO}\n"),
                "<rpc message-id=\"1\"><get/></rpc>\n".to_string()
            ]
        );
    }

    #[test]
    fn test_utf8_split_inside_character() {
        let mut reader = FrameReader::new();
        let data = framed("<x>caf\u{e9}</x>");
        let split = data.iter().position(|&b| b == 0xC3).unwrap() + 1;

        assert!(reader.push(&data[..split]).unwrap().is_empty());
        let frames = reader.push(&data[split..]).unwrap();

        assert_eq!(frames, vec!["<x>caf\u{e9}</x>\n"]);
    }

    #[test]
    fn test_invalid_utf8_is_framing_error() {
        let mut reader = FrameReader::new();
        let result = reader.push(b"<x>\xff</x>]]>]]>\n");

        assert!(matches!(result, Err(NetconfError::Framing(_))));
    }

    #[test]
    fn test_max_frame_size_validation() {
        let mut reader = FrameReader::with_max_frame_size(16);

        let result = reader.push(&[b'a'; 32]);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_clear_resets_state() {
        let mut reader = FrameReader::new();
        reader.push(b"<a/>]]>").unwrap();
        assert!(!reader.is_empty());

        reader.clear();

        assert!(reader.is_empty());
        assert_eq!(reader.push(&framed("<b/>")).unwrap(), vec!["<b/>\n"]);
    }

    #[tokio::test]
    async fn test_next_frame_reads_until_delimiter() {
        let mut data = framed("<a/>");
        data.extend(framed("<b/>"));
        data.extend_from_slice(b"<partial");
        let mut stream = &data[..];

        let mut reader = FrameReader::new();
        assert_eq!(reader.next_frame(&mut stream).await.unwrap().as_deref(), Some("<a/>\n"));
        assert_eq!(reader.next_frame(&mut stream).await.unwrap().as_deref(), Some("<b/>\n"));
        assert_eq!(reader.next_frame(&mut stream).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_next_frame_allows_pipelined_frames_under_limit() {
        let body = format!("<x>{}</x>", "a".repeat(110));
        let mut data = Vec::new();
        for _ in 0..3 {
            data.extend(framed(&body));
        }
        assert_eq!(data.len(), 375);
        let mut stream = &data[..];

        let mut reader = FrameReader::with_max_frame_size(133);
        for _ in 0..3 {
            let frame = reader.next_frame(&mut stream).await.unwrap();
            assert_eq!(frame, Some(format!("{body}\n")));
        }
        assert_eq!(reader.next_frame(&mut stream).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_next_frame_rejects_oversized_partial() {
        let mut data = framed("<a/>");
        data.extend_from_slice(&[b'a'; 64]);
        let mut stream = &data[..];

        let mut reader = FrameReader::with_max_frame_size(32);
        assert_eq!(reader.next_frame(&mut stream).await.unwrap().as_deref(), Some("<a/>\n"));
        let result = reader.next_frame(&mut stream).await;
        assert!(matches!(result, Err(NetconfError::Framing(_))));
    }

    #[tokio::test]
    async fn test_next_frame_over_duplex_chunks() {
        use tokio::io::AsyncWriteExt;

        let (mut client, mut server) = tokio::io::duplex(8);
        tokio::spawn(async move {
            client.write_all(&framed(HELLO)).await.unwrap();
        });

        let mut reader = FrameReader::new();
        let frame = reader.next_frame(&mut server).await.unwrap();
        assert_eq!(frame, Some(format!("{HELLO}\n")));
        assert_eq!(reader.next_frame(&mut server).await.unwrap(), None);
    }
}
