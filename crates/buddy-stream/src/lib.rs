//! Streaming client for the Buddy travel assistant and story generation.
//!
//! The platform streams blank-line-delimited JSON frames over HTTP; this crate
//! turns that byte stream into typed events, folds them into a per-turn answer,
//! and resolves each turn exactly once. The same pipeline serves both the chat
//! and the story endpoints, selected via [`Feature`].
//!
//! # Builder-first usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use buddy_stream::http::{BuddyApiClient, BuddyApiConfig};
//! use buddy_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), BuddyError> {
//! let assistant = Assistant::builder()
//!     .transport(Arc::new(BuddyApiClient::new(
//!         BuddyApiConfig::new("https://api.example.travel").auth_token("token"),
//!     )?))
//!     .build()?;
//!
//! let mut conversation = assistant.conversation(ConversationConfig::named("trip-planning"));
//! let outcome = conversation
//!     .turn(Feature::Chat)
//!     .query("Tell me about Hanoi")
//!     .collect_outcome()
//!     .await?;
//! conversation.resume_from(&outcome);
//!
//! println!("{}", outcome.answer);
//! # Ok(())
//! # }
//! ```

/// Per-turn fold of decoded events into answer state.
mod accumulator;
/// Assistant entry point and builder.
pub mod assistant;
/// Public error types used by the client API.
pub mod errors;
/// Typed wire events decoded from the stream.
pub mod event;
/// reqwest-backed production transport.
pub mod http;
/// Feature selection and generic turn options.
pub mod model;
/// Final aggregated turn result.
pub mod outcome;
/// Common imports for typical usage.
pub mod prelude;
/// Conversation handle carrying the server session id between turns.
pub mod session;
/// Normalized public turn events.
pub mod stream;
/// Transport trait and wire request types.
pub mod transport;
/// Turn builder, streaming handle, and cancellation handle.
pub mod turn;
/// SSE frame splitting and frame decoding.
mod wire;

pub use assistant::{Assistant, AssistantBuilder};
pub use errors::{BuddyError, TransportError, TurnFailure};
pub use event::{BuddyEvent, SourceRef};
pub use model::{Feature, TurnOptions};
pub use outcome::TurnOutcome;
pub use session::{Conversation, ConversationConfig};
pub use stream::{ProgressStage, TurnEvent};
pub use transport::{ByteStream, ByteStreamHandle, StreamTransport, TurnRequest};
pub use turn::{AbortHandle, TurnBuilder, TurnStream};
