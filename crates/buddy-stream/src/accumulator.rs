//! Per-turn fold of decoded events into running answer state.

use crate::event::BuddyEvent;
use crate::outcome::TurnOutcome;
use crate::stream::ProgressStage;

/// What one accepted event did to the turn state.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Applied {
    /// Progress narration changed; `text` is the narration to display now.
    Progress { stage: ProgressStage, text: String },
    /// An answer fragment arrived; `answer` is the cumulative text so far.
    Answer { fragment: String, answer: String },
    /// Terminal success.
    Finished(TurnOutcome),
    /// Terminal upstream failure. Partial answer already delivered stays put.
    Failed {
        message: String,
        channel: Option<String>,
    },
}

/// Folds the ordered event sequence of one turn.
///
/// Owned exclusively by that turn's task; a new turn always starts from a
/// fresh accumulator.
#[derive(Default)]
pub(crate) struct TurnAccumulator {
    progress: String,
    progress_stage: Option<ProgressStage>,
    answer: String,
    accepted: bool,
}

impl TurnAccumulator {
    /// Applies the next event in arrival order.
    pub fn apply(&mut self, event: BuddyEvent) -> Applied {
        self.accepted = true;
        match event {
            BuddyEvent::Reasoning { text } => self.apply_progress(ProgressStage::Reasoning, text),
            BuddyEvent::Retrieving { text } => {
                self.apply_progress(ProgressStage::Retrieving, text)
            }
            BuddyEvent::Answering { text } => {
                self.progress.clear();
                self.progress_stage = None;
                self.answer.push_str(&text);
                Applied::Answer {
                    fragment: text,
                    answer: self.answer.clone(),
                }
            }
            BuddyEvent::Complete {
                session_id,
                images,
                sources,
                suggestions,
            } => Applied::Finished(TurnOutcome {
                answer: std::mem::take(&mut self.answer),
                session_id,
                images,
                sources,
                suggestions,
            }),
            BuddyEvent::Done => Applied::Finished(TurnOutcome {
                answer: std::mem::take(&mut self.answer),
                ..TurnOutcome::default()
            }),
            BuddyEvent::Error { message, channel } => Applied::Failed { message, channel },
        }
    }

    /// Progress narration replaces across bursts and newline-joins within a
    /// contiguous run of the same stage. A later burst wipes the earlier one,
    /// matching the long-observed UI behavior of showing only the latest
    /// narration.
    fn apply_progress(&mut self, stage: ProgressStage, text: String) -> Applied {
        if self.progress_stage == Some(stage) && !self.progress.is_empty() {
            self.progress.push('\n');
            self.progress.push_str(&text);
        } else {
            self.progress = text;
            self.progress_stage = Some(stage);
        }
        Applied::Progress {
            stage,
            text: self.progress.clone(),
        }
    }

    /// Resolves a turn whose stream ended without a terminal event.
    ///
    /// Any previously accepted event is enough to settle successfully with the
    /// accumulated state; otherwise the turn has nothing conclusive.
    pub fn settle(self) -> Option<TurnOutcome> {
        if !self.accepted {
            return None;
        }
        Some(TurnOutcome {
            answer: self.answer,
            ..TurnOutcome::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SourceRef;

    #[test]
    fn answer_fragments_concatenate_in_arrival_order() {
        let mut acc = TurnAccumulator::default();
        let first = acc.apply(BuddyEvent::Answering {
            text: "Hanoi is".into(),
        });
        let second = acc.apply(BuddyEvent::Answering {
            text: " great.".into(),
        });
        assert_eq!(
            first,
            Applied::Answer {
                fragment: "Hanoi is".into(),
                answer: "Hanoi is".into()
            }
        );
        assert_eq!(
            second,
            Applied::Answer {
                fragment: " great.".into(),
                answer: "Hanoi is great.".into()
            }
        );
    }

    #[test]
    fn progress_joins_within_a_burst_with_newlines() {
        let mut acc = TurnAccumulator::default();
        acc.apply(BuddyEvent::Reasoning {
            text: "Looking at dates".into(),
        });
        let applied = acc.apply(BuddyEvent::Reasoning {
            text: "Checking weather".into(),
        });
        assert_eq!(
            applied,
            Applied::Progress {
                stage: ProgressStage::Reasoning,
                text: "Looking at dates\nChecking weather".into()
            }
        );
    }

    #[test]
    fn progress_keeps_only_latest_burst() {
        // Deliberately pins the replace-across-bursts behavior; whether a new
        // burst should wipe earlier narration is a product question, not a
        // decoding one.
        let mut acc = TurnAccumulator::default();
        acc.apply(BuddyEvent::Reasoning {
            text: "Thinking".into(),
        });
        let applied = acc.apply(BuddyEvent::Retrieving {
            text: "Fetching listings".into(),
        });
        assert_eq!(
            applied,
            Applied::Progress {
                stage: ProgressStage::Retrieving,
                text: "Fetching listings".into()
            }
        );
    }

    #[test]
    fn answering_clears_progress_narration() {
        let mut acc = TurnAccumulator::default();
        acc.apply(BuddyEvent::Reasoning {
            text: "Thinking".into(),
        });
        acc.apply(BuddyEvent::Answering { text: "Hi".into() });
        // A reasoning event after answering starts a fresh burst.
        let applied = acc.apply(BuddyEvent::Reasoning {
            text: "More thinking".into(),
        });
        assert_eq!(
            applied,
            Applied::Progress {
                stage: ProgressStage::Reasoning,
                text: "More thinking".into()
            }
        );
    }

    #[test]
    fn complete_carries_answer_and_metadata() {
        let mut acc = TurnAccumulator::default();
        acc.apply(BuddyEvent::Answering {
            text: "Hanoi is great.".into(),
        });
        let applied = acc.apply(BuddyEvent::Complete {
            session_id: Some("abc123".into()),
            images: vec!["https://example.com/1.jpg".into()],
            sources: vec![SourceRef {
                title: Some("Hanoi".into()),
                ..SourceRef::default()
            }],
            suggestions: vec!["What about Hue?".into()],
        });
        match applied {
            Applied::Finished(outcome) => {
                assert_eq!(outcome.answer, "Hanoi is great.");
                assert_eq!(outcome.session_id.as_deref(), Some("abc123"));
                assert_eq!(outcome.images.len(), 1);
                assert_eq!(outcome.sources.len(), 1);
                assert_eq!(outcome.suggestions.len(), 1);
            }
            other => panic!("expected finished, got {other:?}"),
        }
    }

    #[test]
    fn done_finishes_without_metadata() {
        let mut acc = TurnAccumulator::default();
        acc.apply(BuddyEvent::Answering { text: "hi".into() });
        match acc.apply(BuddyEvent::Done) {
            Applied::Finished(outcome) => {
                assert_eq!(outcome.answer, "hi");
                assert!(outcome.session_id.is_none());
            }
            other => panic!("expected finished, got {other:?}"),
        }
    }

    #[test]
    fn settle_resolves_from_last_accepted_event() {
        let mut acc = TurnAccumulator::default();
        acc.apply(BuddyEvent::Answering {
            text: "partial".into(),
        });
        let outcome = acc.settle().expect("settled");
        assert_eq!(outcome.answer, "partial");
    }

    #[test]
    fn settle_without_any_event_is_inconclusive() {
        assert!(TurnAccumulator::default().settle().is_none());
    }
}
