//! Common imports for typical client usage.
//!
//! This module intentionally exports the most frequently used builder/runtime
//! types so examples and application code need fewer import lines.
pub use crate::{
    AbortHandle, Assistant, AssistantBuilder, BuddyError, Conversation, ConversationConfig,
    Feature, ProgressStage, SourceRef, TurnBuilder, TurnEvent, TurnFailure, TurnOptions,
    TurnOutcome, TurnStream,
};
