//! Typed wire events decoded from the Buddy event stream.
//!
//! The server tags every frame with an `event` string; this module turns that
//! loose envelope into one variant per event kind so downstream code never
//! indexes into untyped JSON.

/// One decoded server event.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum BuddyEvent {
    /// Model narration while it is thinking about the query.
    Reasoning { text: String },
    /// Narration while the server is fetching supporting content.
    Retrieving { text: String },
    /// One fragment of the assistant answer, in send order.
    Answering { text: String },
    /// Terminal success with trailing metadata for the finished answer.
    Complete {
        session_id: Option<String>,
        images: Vec<String>,
        sources: Vec<SourceRef>,
        suggestions: Vec<String>,
    },
    /// Bare terminal marker without metadata.
    Done,
    /// Terminal upstream failure. `message` is plain text, never base64.
    Error {
        message: String,
        channel: Option<String>,
    },
}

impl BuddyEvent {
    /// Returns true for event kinds that end the turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Done | Self::Error { .. })
    }
}

/// Citation record attached to a completed answer.
///
/// All fields are optional; backends have been observed to omit any of them.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceRef {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Metadata payload of a `complete` frame.
///
/// One backend path still emits the misspelled `souces` key, hence the alias.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub(crate) struct CompletePayload {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, alias = "souces")]
    pub sources: Vec<SourceRef>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}
