//! SSE frame decoder.
//!
//! Turns the raw byte stream of an event-stream response into discrete
//! [`StreamFrame`]s. Records are delimited by blank lines; `data:` lines
//! within a record are concatenated with newlines. The `[DONE]` sentinel is
//! translated into natural termination and never passed through; every
//! other payload is forwarded verbatim, including empty ones (a message may
//! legitimately contain blank lines).

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use scribe_protocol::StreamFrame;

use crate::error::{Result, ScribeError};

/// End-of-stream sentinel sent by the chat backend as a whole data payload.
const END_SENTINEL: &str = "[DONE]";

/// Incremental push parser for event-stream framing.
///
/// Bytes are buffered until a complete line is observed; a record is
/// emitted at the blank-line boundary. Lines are only cut at ASCII
/// newlines, so multi-byte UTF-8 sequences split across reads survive
/// intact. A partial record still buffered when the transport closes is
/// discarded, matching event-stream conventions.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    data_lines: Vec<String>,
    saw_data: bool,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the end sentinel has been observed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes from the transport, returning any frames completed by
    /// this read. After the sentinel, further input is ignored.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamFrame> {
        if self.done {
            return Vec::new();
        }
        self.buf.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);

            if line.is_empty() {
                if let Some(frame) = self.flush_record() {
                    let is_end = frame == StreamFrame::End;
                    frames.push(frame);
                    if is_end {
                        self.buf.clear();
                        break;
                    }
                }
            } else if let Some(payload) = line.strip_prefix("data:") {
                self.data_lines
                    .push(payload.strip_prefix(' ').unwrap_or(payload).to_string());
                self.saw_data = true;
            }
            // Other fields (event:, id:, retry:) and comments are ignored.
        }
        frames
    }

    /// Emit the buffered record, if it carried a data field.
    fn flush_record(&mut self) -> Option<StreamFrame> {
        if !self.saw_data {
            return None;
        }
        let payload = self.data_lines.join("\n");
        self.data_lines.clear();
        self.saw_data = false;

        if payload == END_SENTINEL {
            self.done = true;
            Some(StreamFrame::End)
        } else {
            Some(StreamFrame::Delta(payload))
        }
    }
}

/// Adapt a transport byte stream into a lazy, finite, non-restartable
/// stream of decoded frames.
///
/// The returned stream suspends once per decoded frame. A transport error
/// surfaces as the final `Err` item; end-of-stream without a sentinel
/// terminates naturally with a trailing [`StreamFrame::End`]. Nothing is
/// retried here; dropping the stream releases the transport.
pub fn frame_stream<S, B, E>(bytes: S) -> impl Stream<Item = Result<StreamFrame>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    try_stream! {
        let mut decoder = SseDecoder::new();
        let mut bytes = std::pin::pin!(bytes);
        'transport: while let Some(chunk) = bytes.next().await {
            let chunk =
                chunk.map_err(|e| ScribeError::Transport(format!("stream error: {e}")))?;
            for frame in decoder.feed(chunk.as_ref()) {
                let is_end = frame == StreamFrame::End;
                yield frame;
                if is_end {
                    break 'transport;
                }
            }
        }
        if !decoder.is_done() {
            yield StreamFrame::End;
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use pretty_assertions::assert_eq;

    use super::*;

    fn ok_chunks(
        chunks: Vec<&'static [u8]>,
    ) -> impl Stream<Item = std::result::Result<&'static [u8], String>> {
        stream::iter(chunks.into_iter().map(Ok))
    }

    #[test]
    fn test_basic_deltas() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: Hel\n\ndata: lo\n\n");
        assert_eq!(
            frames,
            vec![
                StreamFrame::Delta("Hel".to_string()),
                StreamFrame::Delta("lo".to_string()),
            ]
        );
    }

    #[test]
    fn test_record_split_across_reads() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed(b"data: hel"), vec![]);
        assert_eq!(
            decoder.feed(b"lo\n\n"),
            vec![StreamFrame::Delta("hello".to_string())]
        );
    }

    #[test]
    fn test_empty_data_line_then_sentinel() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: \n\ndata: [DONE]\n\n");
        assert_eq!(
            frames,
            vec![StreamFrame::Delta(String::new()), StreamFrame::End]
        );
        assert!(decoder.is_done());
    }

    #[test]
    fn test_multiple_data_lines_join_with_newline() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: first\ndata: second\n\n");
        assert_eq!(
            frames,
            vec![StreamFrame::Delta("first\nsecond".to_string())]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: hi\r\n\r\n");
        assert_eq!(frames, vec![StreamFrame::Delta("hi".to_string())]);
    }

    #[test]
    fn test_record_without_data_field_is_skipped() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed(b"event: ping\n\n: comment\n\n"), vec![]);
    }

    #[test]
    fn test_input_after_sentinel_is_ignored() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"data: [DONE]\n\n");
        assert_eq!(decoder.feed(b"data: late\n\n"), vec![]);
    }

    #[test]
    fn test_multibyte_split_across_reads() {
        let mut decoder = SseDecoder::new();
        let text = "héllo".as_bytes();
        // Cut inside the two-byte 'é' sequence.
        let mut first = b"data: ".to_vec();
        first.extend_from_slice(&text[..2]);
        assert_eq!(decoder.feed(&first), vec![]);
        let mut second = text[2..].to_vec();
        second.extend_from_slice(b"\n\n");
        assert_eq!(
            decoder.feed(&second),
            vec![StreamFrame::Delta("héllo".to_string())]
        );
    }

    #[tokio::test]
    async fn test_frame_stream_terminates_on_sentinel() {
        let chunks = ok_chunks(vec![b"data: Hel\n\nda", b"ta: lo\n\ndata: [DONE]\n\n"]);
        let frames: Vec<_> = frame_stream(chunks).collect().await;
        let frames: Vec<_> = frames.into_iter().map(|f| f.expect("frame")).collect();
        assert_eq!(
            frames,
            vec![
                StreamFrame::Delta("Hel".to_string()),
                StreamFrame::Delta("lo".to_string()),
                StreamFrame::End,
            ]
        );
    }

    #[tokio::test]
    async fn test_frame_stream_eof_without_sentinel_ends_naturally() {
        let chunks = ok_chunks(vec![b"data: only\n\n"]);
        let frames: Vec<_> = frame_stream(chunks).collect().await;
        let frames: Vec<_> = frames.into_iter().map(|f| f.expect("frame")).collect();
        assert_eq!(
            frames,
            vec![StreamFrame::Delta("only".to_string()), StreamFrame::End]
        );
    }

    #[tokio::test]
    async fn test_frame_stream_surfaces_transport_error() {
        let chunks = stream::iter(vec![
            Ok(b"data: Par\n\ndata: tial\n\n" as &[u8]),
            Err("connection reset".to_string()),
        ]);
        let mut frames = std::pin::pin!(frame_stream(chunks));

        assert_eq!(
            frames.next().await.unwrap().unwrap(),
            StreamFrame::Delta("Par".to_string())
        );
        assert_eq!(
            frames.next().await.unwrap().unwrap(),
            StreamFrame::Delta("tial".to_string())
        );
        let err = frames.next().await.unwrap().unwrap_err();
        assert!(matches!(err, ScribeError::Transport(_)));
        assert!(frames.next().await.is_none());
    }
}
