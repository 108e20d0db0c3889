//! Transport seam between the turn pipeline and the network layer.
//!
//! Production code uses the reqwest-backed [`crate::http::BuddyApiClient`];
//! tests drive the pipeline with scripted byte streams behind the same trait.

use std::collections::HashMap;
use std::pin::Pin;

use crate::errors::TransportError;
use crate::model::{Feature, TurnOptions};

/// Raw response bytes as delivered by the transport, arbitrarily fragmented.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, TransportError>> + Send + 'static>>;

/// Open byte stream for one turn.
pub struct ByteStreamHandle {
    /// The response body chunks.
    pub bytes: ByteStream,
}

/// Wire request for one turn, built by `TurnBuilder`.
#[derive(Clone, Debug)]
pub struct TurnRequest {
    /// Unique id for this turn.
    pub turn_id: uuid::Uuid,
    /// Conversation that owns the turn.
    pub conversation_id: uuid::Uuid,
    /// Endpoint the request targets.
    pub feature: Feature,
    /// Free-text user query.
    pub query: String,
    /// Image attachments (URLs or base64 payloads).
    pub images: Vec<String>,
    /// Scoping filters (conversation/experience/company and similar).
    pub filters: HashMap<String, String>,
    /// Server session to continue, if one was assigned earlier.
    pub session_id: Option<String>,
    /// Generic turn behavior options.
    pub options: TurnOptions,
}

impl TurnRequest {
    /// JSON body sent to the streaming endpoint.
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({
            "query": self.query,
            "images": self.images,
            "filters": self.filters,
            "session_id": self.session_id,
        })
    }
}

/// Opens streaming responses for turn requests.
///
/// Implementations must return the response body as-is; frame splitting and
/// event decoding happen inside the turn pipeline.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    /// Issues the request and returns the response byte stream.
    ///
    /// A non-success HTTP status must surface as `TransportError::Http` here
    /// rather than as bytes on the stream.
    async fn open(&self, request: TurnRequest) -> Result<ByteStreamHandle, TransportError>;
}
