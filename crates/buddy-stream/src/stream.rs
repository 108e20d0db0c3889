use crate::errors::TurnFailure;
use crate::outcome::TurnOutcome;

/// Normalized events exposed by `TurnStream`.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnEvent {
    /// First event for every turn.
    TurnStarted {
        turn_id: uuid::Uuid,
        conversation_id: uuid::Uuid,
        /// Server session being continued, if any.
        session_id: Option<String>,
    },
    /// Current progress narration while the server thinks or retrieves.
    ///
    /// `text` is the full narration to display, not a delta; a new burst of a
    /// different stage replaces the previous narration.
    Progress {
        turn_id: uuid::Uuid,
        stage: ProgressStage,
        text: String,
    },
    /// Incremental answer fragment plus the cumulative answer so far.
    AnswerDelta {
        turn_id: uuid::Uuid,
        seq: u64,
        fragment: String,
        answer: String,
    },
    /// Terminal success event with the aggregated outcome.
    Completed {
        turn_id: uuid::Uuid,
        outcome: TurnOutcome,
    },
    /// Terminal failure event.
    Error {
        turn_id: uuid::Uuid,
        failure: TurnFailure,
    },
}

/// Which kind of progress narration is currently streaming.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressStage {
    /// The model is reasoning about the query.
    Reasoning,
    /// The server is fetching supporting content.
    Retrieving,
}
