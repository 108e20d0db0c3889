//! SSE frame splitting and frame-to-event decoding.
//!
//! The server streams blank-line-delimited frames, each carrying one JSON
//! envelope `{event, data, channel_type?}`. Chunks arrive arbitrarily
//! fragmented, including mid-frame and mid-UTF-8-character, so the splitter
//! buffers raw bytes and only converts to text once a full frame is present.

use std::collections::VecDeque;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::StreamExt as _;
use futures::stream;
use tracing::{debug, warn};

use crate::errors::TransportError;
use crate::event::{BuddyEvent, CompletePayload};
use crate::transport::ByteStream;

/// Incremental splitter from raw bytes to complete frame strings.
#[derive(Default)]
pub(crate) struct SseSplitter {
    buf: Vec<u8>,
}

impl SseSplitter {
    /// Appends a chunk and drains every complete frame it unlocked, in order.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf) {
            let frame = String::from_utf8_lossy(&self.buf[..idx]).into_owned();
            self.buf.drain(..idx + delim_len);
            if !frame.trim().is_empty() {
                frames.push(frame);
            }
        }
        frames
    }

    /// Returns any leftover buffered text as a best-effort final frame.
    ///
    /// Servers have been observed to omit the trailing blank line on the last
    /// frame of a stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let tail = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        if tail.trim().is_empty() { None } else { Some(tail) }
    }
}

fn find_frame_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        i += 1;
    }
    None
}

/// Result of decoding one frame string.
pub(crate) enum FrameOutcome {
    /// Well-formed envelope with a recognized event kind.
    Event(BuddyEvent),
    /// Valid JSON that is not a usable envelope (missing `event`/`data`).
    ///
    /// Not surfaced to the consumer, but the end-of-stream path may still pull
    /// a final answer fragment out of it.
    Inconclusive(serde_json::Value),
    /// Not valid JSON, or a recognized kind whose payload could not be used.
    Malformed,
}

/// Decodes one frame. Never fails the stream; bad frames are skipped.
pub(crate) fn decode_frame(frame: &str) -> FrameOutcome {
    let body = frame.trim();
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "skipping non-JSON frame");
            return FrameOutcome::Malformed;
        }
    };

    let kind = match value.get("event").and_then(|v| v.as_str()) {
        Some(kind) => kind.to_string(),
        None => return FrameOutcome::Inconclusive(value),
    };
    let data = match value.get("data").filter(|v| !v.is_null()) {
        Some(data) => data.clone(),
        None => return FrameOutcome::Inconclusive(value),
    };
    let channel = value
        .get("channel_type")
        .and_then(|v| v.as_str())
        .map(ToOwned::to_owned);

    match event_from_envelope(&kind, &data, channel) {
        Some(event) => FrameOutcome::Event(event),
        None => FrameOutcome::Malformed,
    }
}

fn event_from_envelope(
    kind: &str,
    data: &serde_json::Value,
    channel: Option<String>,
) -> Option<BuddyEvent> {
    match kind {
        "reasoning" => decode_response_text(data).map(|text| BuddyEvent::Reasoning { text }),
        "retrieving" => decode_response_text(data).map(|text| BuddyEvent::Retrieving { text }),
        "answering" => decode_response_text(data).map(|text| BuddyEvent::Answering { text }),
        "complete" => {
            let payload: CompletePayload =
                serde_json::from_value(data.clone()).unwrap_or_default();
            Some(BuddyEvent::Complete {
                session_id: payload.session_id,
                images: payload.images,
                sources: payload.sources,
                suggestions: payload.suggestions,
            })
        }
        "done" => Some(BuddyEvent::Done),
        "error" => {
            let message = data
                .get("error")
                .and_then(|v| v.as_str())
                .or_else(|| data.get("response").and_then(|v| v.as_str()))
                .unwrap_or("upstream stream error")
                .to_string();
            Some(BuddyEvent::Error { message, channel })
        }
        other => {
            debug!(kind = other, "skipping unrecognized event kind");
            None
        }
    }
}

/// Decodes the base64 UTF-8 `response` field carried by text-bearing events.
///
/// Each event's `response` is independently encoded, so decoding happens on
/// the whole string here, never byte-by-byte across events. A fragment that
/// fails to decode is dropped without failing the turn.
fn decode_response_text(data: &serde_json::Value) -> Option<String> {
    let encoded = data.get("response").and_then(|v| v.as_str())?;
    let bytes = match BASE64.decode(encoded) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "dropping fragment with invalid base64 response");
            return None;
        }
    };
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(error = %err, "dropping fragment with non-UTF-8 response");
            None
        }
    }
}

/// Last-resort interpretation of an unterminated trailing frame.
///
/// A trailing JSON object that is not a full envelope but still carries a
/// decodable `response` string is treated as one final answer fragment.
fn tail_event(value: serde_json::Value) -> Option<BuddyEvent> {
    let candidate = value.get("data").filter(|v| !v.is_null()).unwrap_or(&value);
    decode_response_text(candidate).map(|text| BuddyEvent::Answering { text })
}

/// Adapts a transport byte stream into a stream of decoded events.
///
/// Malformed frames are skipped; a read error ends the stream with that error
/// and discards whatever partial frame was buffered.
pub(crate) fn event_stream(
    bytes: ByteStream,
) -> impl futures::Stream<Item = Result<BuddyEvent, TransportError>> + Send {
    struct State {
        bytes: ByteStream,
        splitter: SseSplitter,
        pending: VecDeque<BuddyEvent>,
        done: bool,
    }

    stream::try_unfold(
        State {
            bytes,
            splitter: SseSplitter::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        for frame in state.splitter.push_chunk(&chunk) {
                            match decode_frame(&frame) {
                                FrameOutcome::Event(event) => state.pending.push_back(event),
                                FrameOutcome::Inconclusive(_) => {
                                    debug!("skipping frame without event/data envelope");
                                }
                                FrameOutcome::Malformed => {}
                            }
                        }
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        state.done = true;
                        if let Some(tail) = state.splitter.finish() {
                            match decode_frame(&tail) {
                                FrameOutcome::Event(event) => state.pending.push_back(event),
                                FrameOutcome::Inconclusive(value) => {
                                    if let Some(event) = tail_event(value) {
                                        state.pending.push_back(event);
                                    }
                                }
                                FrameOutcome::Malformed => {
                                    debug!("discarding undecodable trailing frame");
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(text: &str) -> String {
        BASE64.encode(text.as_bytes())
    }

    fn answering_frame(text: &str) -> String {
        format!(
            "{{\"event\":\"answering\",\"data\":{{\"response\":\"{}\"}}}}",
            b64(text)
        )
    }

    fn collect_frames(input: &[u8], chunk_size: usize) -> Vec<String> {
        let mut splitter = SseSplitter::default();
        let mut frames = Vec::new();
        for chunk in input.chunks(chunk_size) {
            frames.extend(splitter.push_chunk(chunk));
        }
        frames.extend(splitter.finish());
        frames
    }

    #[test]
    fn splitter_handles_partial_chunk_boundaries() {
        let mut splitter = SseSplitter::default();
        let part1 = b"{\"event\":\"answering\",\"data\":{\"respon";
        let part2 = b"se\":\"aGk=\"}}\n\n";
        assert!(splitter.push_chunk(part1).is_empty());
        let frames = splitter.push_chunk(part2);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("answering"));
    }

    #[test]
    fn splitter_is_chunking_invariant() {
        let wire = format!(
            "{}\n\n{}\n\n{}\n\n",
            answering_frame("xin "),
            answering_frame("chào"),
            answering_frame("!")
        );
        let whole = collect_frames(wire.as_bytes(), wire.len());
        for chunk_size in [1, 2, 3, 7, 16] {
            assert_eq!(collect_frames(wire.as_bytes(), chunk_size), whole);
        }
    }

    #[test]
    fn splitter_carries_split_multibyte_utf8_across_chunks() {
        // Error messages travel as plain UTF-8, so "Hà Nội" puts multi-byte
        // characters directly on the wire; deliver one byte at a time.
        let wire = "{\"event\":\"error\",\"data\":{\"error\":\"Hà Nội unavailable\"}}\n\n";
        let frames = collect_frames(wire.as_bytes(), 1);
        assert_eq!(frames.len(), 1);
        match decode_frame(&frames[0]) {
            FrameOutcome::Event(BuddyEvent::Error { message, .. }) => {
                assert_eq!(message, "Hà Nội unavailable");
            }
            _ => panic!("expected error event"),
        }
    }

    #[test]
    fn splitter_accepts_crlf_delimiters() {
        let wire = format!("{}\r\n\r\n{}\r\n\r\n", answering_frame("a"), answering_frame("b"));
        let frames = collect_frames(wire.as_bytes(), 5);
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn splitter_finish_returns_unterminated_tail() {
        let mut splitter = SseSplitter::default();
        let frame = answering_frame("tail");
        assert!(splitter.push_chunk(frame.as_bytes()).is_empty());
        assert_eq!(splitter.finish(), Some(frame));
    }

    #[test]
    fn decode_frame_rejects_non_json() {
        assert!(matches!(decode_frame("not json"), FrameOutcome::Malformed));
    }

    #[test]
    fn decode_frame_treats_missing_event_or_data_as_inconclusive() {
        assert!(matches!(
            decode_frame("{\"data\":{\"response\":\"aGk=\"}}"),
            FrameOutcome::Inconclusive(_)
        ));
        assert!(matches!(
            decode_frame("{\"event\":\"answering\"}"),
            FrameOutcome::Inconclusive(_)
        ));
        assert!(matches!(
            decode_frame("{\"event\":\"answering\",\"data\":null}"),
            FrameOutcome::Inconclusive(_)
        ));
    }

    #[test]
    fn decode_frame_decodes_text_events() {
        let frame = format!(
            "{{\"event\":\"reasoning\",\"data\":{{\"response\":\"{}\"}}}}",
            b64("Thinking...")
        );
        match decode_frame(&frame) {
            FrameOutcome::Event(BuddyEvent::Reasoning { text }) => {
                assert_eq!(text, "Thinking...");
            }
            _ => panic!("expected reasoning event"),
        }
    }

    #[test]
    fn decode_frame_drops_fragment_with_invalid_base64() {
        let frame = "{\"event\":\"answering\",\"data\":{\"response\":\"%%%\"}}";
        assert!(matches!(decode_frame(frame), FrameOutcome::Malformed));
    }

    #[test]
    fn decode_frame_reads_complete_metadata() {
        let frame = serde_json::json!({
            "event": "complete",
            "data": {
                "session_id": "abc123",
                "images": ["https://example.com/1.jpg"],
                "sources": [{"title": "Hanoi", "url": "https://example.com"}],
                "suggestions": ["What about Hue?"],
            }
        })
        .to_string();
        match decode_frame(&frame) {
            FrameOutcome::Event(BuddyEvent::Complete {
                session_id,
                images,
                sources,
                suggestions,
            }) => {
                assert_eq!(session_id.as_deref(), Some("abc123"));
                assert_eq!(images.len(), 1);
                assert_eq!(sources.len(), 1);
                assert_eq!(suggestions, vec!["What about Hue?".to_string()]);
            }
            _ => panic!("expected complete event"),
        }
    }

    #[test]
    fn decode_frame_reads_error_with_channel() {
        let frame = "{\"event\":\"error\",\"data\":{\"error\":\"quota exceeded\"},\
                     \"channel_type\":\"billing\"}";
        match decode_frame(frame) {
            FrameOutcome::Event(BuddyEvent::Error { message, channel }) => {
                assert_eq!(message, "quota exceeded");
                assert_eq!(channel.as_deref(), Some("billing"));
            }
            _ => panic!("expected error event"),
        }
    }

    #[test]
    fn tail_event_recovers_fragment_from_partial_envelope() {
        let value = serde_json::json!({"data": {"response": b64("leftover")}});
        assert_eq!(
            tail_event(value),
            Some(BuddyEvent::Answering {
                text: "leftover".into()
            })
        );
        assert_eq!(tail_event(serde_json::json!({"other": 1})), None);
    }

    fn scripted_bytes(chunks: Vec<Result<String, TransportError>>) -> ByteStream {
        Box::pin(stream::iter(
            chunks.into_iter().map(|r| r.map(bytes::Bytes::from)),
        ))
    }

    async fn drain(
        stream: impl futures::Stream<Item = Result<BuddyEvent, TransportError>>,
    ) -> (Vec<BuddyEvent>, Option<TransportError>) {
        futures::pin_mut!(stream);
        let mut events = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => events.push(event),
                Err(err) => return (events, Some(err)),
            }
        }
        (events, None)
    }

    #[tokio::test]
    async fn event_stream_skips_malformed_frames_between_valid_ones() {
        let wire = format!(
            "{}\n\ngarbage not json\n\n{}\n\n",
            answering_frame("a"),
            answering_frame("b")
        );
        let (events, err) = drain(event_stream(scripted_bytes(vec![Ok(wire)]))).await;
        assert!(err.is_none());
        assert_eq!(
            events,
            vec![
                BuddyEvent::Answering { text: "a".into() },
                BuddyEvent::Answering { text: "b".into() },
            ]
        );
    }

    #[tokio::test]
    async fn event_stream_emits_unterminated_final_frame() {
        let wire = answering_frame("no trailing delimiter");
        let (events, err) = drain(event_stream(scripted_bytes(vec![Ok(wire)]))).await;
        assert!(err.is_none());
        assert_eq!(
            events,
            vec![BuddyEvent::Answering {
                text: "no trailing delimiter".into()
            }]
        );
    }

    #[tokio::test]
    async fn event_stream_propagates_read_errors() {
        let wire = format!("{}\n\n", answering_frame("first"));
        let (events, err) = drain(event_stream(scripted_bytes(vec![
            Ok(wire),
            Err(TransportError::read("connection reset")),
        ])))
        .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(err, Some(TransportError::Read { .. })));
    }
}
