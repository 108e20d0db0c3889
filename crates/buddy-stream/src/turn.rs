use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::accumulator::{Applied, TurnAccumulator};
use crate::assistant::AssistantInner;
use crate::errors::{BuddyError, TransportError, TurnFailure, turn_failure_from_transport_error};
use crate::event::BuddyEvent;
use crate::model::{Feature, TurnOptions};
use crate::outcome::TurnOutcome;
use crate::stream::TurnEvent;
use crate::transport::{StreamTransport, TurnRequest};
use crate::wire::event_stream;

/// Handle used to request cancellation of a running turn.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// Cancellation is best-effort and becomes visible as a terminal
    /// `TurnEvent::Error` with `TurnFailure::Cancelled`. Events already
    /// delivered stay delivered.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Builder for configuring and starting a single turn.
///
/// This is the main user-facing API for providing the query, attachments, and
/// runtime options before either streaming events or collecting the final
/// outcome.
pub struct TurnBuilder {
    inner: Arc<AssistantInner>,
    conversation_id: uuid::Uuid,
    conversation_name: String,
    feature: Feature,
    session_id: Option<String>,
    query: Option<String>,
    images: Vec<String>,
    filters: HashMap<String, String>,
    options: TurnOptions,
}

impl TurnBuilder {
    pub(crate) fn new(
        inner: Arc<AssistantInner>,
        conversation_id: uuid::Uuid,
        conversation_name: String,
        session_id: Option<String>,
        feature: Feature,
    ) -> Self {
        Self {
            inner,
            conversation_id,
            conversation_name,
            feature,
            session_id,
            query: None,
            images: Vec::new(),
            filters: HashMap::new(),
            options: TurnOptions::default(),
        }
    }

    /// Sets the free-text user query.
    pub fn query(mut self, text: impl Into<String>) -> Self {
        self.query = Some(text.into());
        self
    }

    /// Attaches one image (URL or base64 payload).
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.images.push(image.into());
        self
    }

    /// Replaces all image attachments with the provided list.
    pub fn images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// Adds one scoping filter (for example `experience_id`).
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Sets the maximum allowed gap between received chunks.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.options.idle_timeout = Some(timeout);
        self
    }

    /// Sets the bounded stream buffer size used between the turn task and the
    /// consumer.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.options.stream_buffer_capacity = capacity;
        self
    }

    /// Validates the builder state and starts a streaming turn.
    ///
    /// The returned `TurnStream` yields normalized events (`TurnStarted`,
    /// `Progress`, `AnswerDelta`, and a terminal `Completed`/`Error` event).
    pub async fn start_stream(self) -> Result<TurnStream, BuddyError> {
        let transport = self.inner.transport.clone();
        debug!(
            conversation = %self.conversation_name,
            feature = %self.feature,
            "starting turn"
        );
        let request = self.validate_and_build_request()?;

        let (tx, rx) = mpsc::channel(request.options.stream_buffer_capacity);
        let (final_tx, final_rx) = oneshot::channel();
        let (abort_tx, abort_rx) = watch::channel(false);

        let abort_handle = AbortHandle { tx: abort_tx };
        let turn_id = request.turn_id;
        let conversation_id = request.conversation_id;
        tokio::spawn(turn_task(transport, request, tx, final_tx, abort_rx));

        Ok(TurnStream {
            turn_id,
            conversation_id,
            rx,
            final_rx,
            abort_handle,
            saw_terminal: false,
        })
    }

    /// Runs to completion and returns the final aggregated outcome.
    pub async fn collect_outcome(self) -> Result<TurnOutcome, BuddyError> {
        let stream = self.start_stream().await?;
        stream.finish().await
    }

    /// Runs to completion and returns only the assistant answer text.
    pub async fn collect_answer(self) -> Result<String, BuddyError> {
        Ok(self.collect_outcome().await?.answer)
    }

    fn validate_and_build_request(self) -> Result<TurnRequest, BuddyError> {
        let query = self
            .query
            .ok_or_else(|| BuddyError::Validation("a query is required".into()))?;
        if query.trim().is_empty() {
            return Err(BuddyError::Validation("query must not be empty".into()));
        }
        if self.options.stream_buffer_capacity == 0 {
            return Err(BuddyError::Validation(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }

        Ok(TurnRequest {
            turn_id: uuid::Uuid::new_v4(),
            conversation_id: self.conversation_id,
            feature: self.feature,
            query,
            images: self.images,
            filters: self.filters,
            session_id: self.session_id,
            options: self.options,
        })
    }
}

/// Streaming handle returned by `TurnBuilder::start_stream`.
///
/// Use `next_event()` to consume events as they arrive and `finish()` to
/// obtain the final result after the terminal event.
pub struct TurnStream {
    turn_id: uuid::Uuid,
    conversation_id: uuid::Uuid,
    rx: mpsc::Receiver<TurnEvent>,
    final_rx: oneshot::Receiver<Result<TurnOutcome, BuddyError>>,
    abort_handle: AbortHandle,
    saw_terminal: bool,
}

impl TurnStream {
    /// Returns the turn id for this stream.
    pub fn turn_id(&self) -> uuid::Uuid {
        self.turn_id
    }

    /// Returns the conversation id that owns this turn.
    pub fn conversation_id(&self) -> uuid::Uuid {
        self.conversation_id
    }

    /// Returns a handle that can cancel the turn.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for and returns the next normalized turn event.
    ///
    /// Returns `None` after the stream channel is closed.
    pub async fn next_event(&mut self) -> Option<TurnEvent> {
        let event = self.rx.recv().await;
        if let Some(TurnEvent::Completed { .. } | TurnEvent::Error { .. }) = &event {
            self.saw_terminal = true;
        }
        event
    }

    /// Drains the stream (if needed) and returns the terminal turn result.
    ///
    /// This is safe to call after consuming events manually with
    /// `next_event()`.
    pub async fn finish(mut self) -> Result<TurnOutcome, BuddyError> {
        while !self.saw_terminal {
            match self.rx.recv().await {
                Some(TurnEvent::Completed { .. } | TurnEvent::Error { .. }) => {
                    self.saw_terminal = true;
                }
                Some(_) => {}
                None => break,
            }
        }

        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(BuddyError::protocol_msg(format!(
                "turn task ended without final result (turn={})",
                self.turn_id
            ))),
        }
    }
}

async fn turn_task(
    transport: Arc<dyn StreamTransport>,
    request: TurnRequest,
    tx: mpsc::Sender<TurnEvent>,
    final_tx: oneshot::Sender<Result<TurnOutcome, BuddyError>>,
    mut abort_rx: watch::Receiver<bool>,
) {
    let turn_id = request.turn_id;
    let conversation_id = request.conversation_id;
    let feature = request.feature;
    let idle_timeout = request.options.idle_timeout;

    if !send_event(
        &tx,
        TurnEvent::TurnStarted {
            turn_id,
            conversation_id,
            session_id: request.session_id.clone(),
        },
    )
    .await
    {
        let _ = final_tx.send(Err(BuddyError::protocol_msg(
            "turn stream receiver dropped before TurnStarted",
        )));
        return;
    }

    let handle = match transport.open(request).await {
        Ok(handle) => handle,
        Err(err) => {
            // A failed request surfaces as a synthetic terminal error event
            // so consumers see it on the same channel as stream errors.
            let failure = turn_failure_from_transport_error(&err);
            let _ = send_event(
                &tx,
                TurnEvent::Error {
                    turn_id,
                    failure: failure.clone(),
                },
            )
            .await;
            let _ = final_tx.send(Err(BuddyError::turn_failed(failure)));
            return;
        }
    };

    let events = event_stream(handle.bytes);
    futures::pin_mut!(events);

    let mut acc = TurnAccumulator::default();
    let mut seq = 0_u64;
    loop {
        tokio::select! {
            changed = abort_rx.changed() => {
                match changed {
                    Ok(_) if *abort_rx.borrow() => {
                        let failure = TurnFailure::Cancelled;
                        let _ = send_event(&tx, TurnEvent::Error { turn_id, failure: failure.clone() }).await;
                        let _ = final_tx.send(Err(BuddyError::turn_failed(failure)));
                        return;
                    }
                    Ok(_) => {}
                    // The sender lives in the AbortHandle; an error means the
                    // TurnStream and every handle clone are gone, so nobody
                    // can receive events or the final result anymore.
                    Err(_) => return,
                }
            }
            next = next_with_idle(&mut events, idle_timeout) => {
                match next {
                    Ok(Some(Ok(event))) => {
                        match acc.apply(event) {
                            Applied::Progress { stage, text } => {
                                if !send_event(&tx, TurnEvent::Progress { turn_id, stage, text }).await {
                                    let _ = final_tx.send(Err(BuddyError::protocol_msg("turn stream receiver dropped during progress")));
                                    return;
                                }
                            }
                            Applied::Answer { fragment, answer } => {
                                debug!(turn_id = %turn_id, feature = %feature, seq, "answer fragment");
                                let sent = send_event(&tx, TurnEvent::AnswerDelta { turn_id, seq, fragment, answer }).await;
                                seq = seq.saturating_add(1);
                                if !sent {
                                    let _ = final_tx.send(Err(BuddyError::protocol_msg("turn stream receiver dropped during answer")));
                                    return;
                                }
                            }
                            Applied::Finished(outcome) => {
                                let sent = send_event(&tx, TurnEvent::Completed { turn_id, outcome: outcome.clone() }).await;
                                let _ = final_tx.send(if sent { Ok(outcome) } else { Err(BuddyError::protocol_msg("turn stream receiver dropped before completion")) });
                                return;
                            }
                            Applied::Failed { message, channel } => {
                                let failure = TurnFailure::Upstream { message, channel };
                                let _ = send_event(&tx, TurnEvent::Error { turn_id, failure: failure.clone() }).await;
                                let _ = final_tx.send(Err(BuddyError::turn_failed(failure)));
                                return;
                            }
                        }
                    }
                    Ok(Some(Err(err))) => {
                        let failure = turn_failure_from_transport_error(&err);
                        let _ = send_event(&tx, TurnEvent::Error { turn_id, failure: failure.clone() }).await;
                        let _ = final_tx.send(Err(BuddyError::turn_failed(failure)));
                        return;
                    }
                    Ok(None) => {
                        // Stream ended without a terminal frame; fall back to
                        // whatever the accumulated state can conclude.
                        match std::mem::take(&mut acc).settle() {
                            Some(outcome) => {
                                let sent = send_event(&tx, TurnEvent::Completed { turn_id, outcome: outcome.clone() }).await;
                                let _ = final_tx.send(if sent { Ok(outcome) } else { Err(BuddyError::protocol_msg("turn stream receiver dropped before completion")) });
                            }
                            None => {
                                let failure = TurnFailure::Inconclusive {
                                    message: "stream ended without a conclusive event".into(),
                                };
                                let _ = send_event(&tx, TurnEvent::Error { turn_id, failure: failure.clone() }).await;
                                let _ = final_tx.send(Err(BuddyError::turn_failed(failure)));
                            }
                        }
                        return;
                    }
                    Err(idle_ms) => {
                        let failure = TurnFailure::Stalled { idle_ms };
                        let _ = send_event(&tx, TurnEvent::Error { turn_id, failure: failure.clone() }).await;
                        let _ = final_tx.send(Err(BuddyError::turn_failed(failure)));
                        return;
                    }
                }
            }
        }
    }
}

/// Awaits the next decoded event, bounded by the idle timeout when one is
/// configured. The error value is the expired timeout in milliseconds.
async fn next_with_idle<S>(
    events: &mut S,
    idle_timeout: Option<Duration>,
) -> Result<Option<Result<BuddyEvent, TransportError>>, u64>
where
    S: futures::Stream<Item = Result<BuddyEvent, TransportError>> + Unpin,
{
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, events.next())
            .await
            .map_err(|_| limit.as_millis() as u64),
        None => Ok(events.next().await),
    }
}

async fn send_event(tx: &mpsc::Sender<TurnEvent>, event: TurnEvent) -> bool {
    tx.send(event).await.is_ok()
}
