use std::fmt;
use std::time::Duration;

/// Streaming endpoint a turn targets.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    /// The Buddy chat assistant.
    Chat,
    /// Story generation for an experience listing.
    Story,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Chat => f.write_str("chat"),
            Feature::Story => f.write_str("story"),
        }
    }
}

/// Generic turn behavior options.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TurnOptions {
    /// Maximum gap between received chunks before the turn fails as stalled.
    ///
    /// `None` (the default) keeps the original behavior of waiting forever on
    /// a hung connection.
    pub idle_timeout: Option<Duration>,
    /// Bounded event buffer size used by the streaming channel.
    pub stream_buffer_capacity: usize,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            stream_buffer_capacity: 128,
        }
    }
}
