use crate::event::SourceRef;

/// Final aggregated result for a resolved turn.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TurnOutcome {
    /// Complete assistant answer, fragments concatenated in arrival order.
    pub answer: String,
    /// Session assigned (or confirmed) by the server for continuation.
    pub session_id: Option<String>,
    /// Image URLs attached to the finished answer.
    pub images: Vec<String>,
    /// Citations attached to the finished answer.
    pub sources: Vec<SourceRef>,
    /// Suggested follow-up prompts.
    pub suggestions: Vec<String>,
}

impl TurnOutcome {
    /// Returns true when the turn produced neither text nor metadata.
    pub fn is_empty(&self) -> bool {
        self.answer.is_empty()
            && self.session_id.is_none()
            && self.images.is_empty()
            && self.sources.is_empty()
            && self.suggestions.is_empty()
    }
}
