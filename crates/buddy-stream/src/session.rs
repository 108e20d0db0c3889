use std::sync::Arc;

use crate::assistant::AssistantInner;
use crate::model::Feature;
use crate::outcome::TurnOutcome;
use crate::turn::TurnBuilder;

/// Configuration used to create a `Conversation`.
#[derive(Clone, Debug)]
pub struct ConversationConfig {
    /// Human-readable conversation name (useful for logs).
    pub name: String,
}

impl ConversationConfig {
    /// Creates a named conversation config.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Client-side conversation that threads the server session id through turns.
///
/// The server assigns a session id on the first completed turn; adopting it
/// via [`Conversation::resume_from`] lets later turns continue the same
/// server-side conversation memory. The id lives on this explicit object, not
/// in any shared mutable state, so concurrent conversations never interfere.
pub struct Conversation {
    pub(crate) inner: Arc<AssistantInner>,
    pub(crate) conversation_id: uuid::Uuid,
    pub(crate) config: ConversationConfig,
    session_id: Option<String>,
}

impl Conversation {
    pub(crate) fn new(inner: Arc<AssistantInner>, config: ConversationConfig) -> Self {
        Self {
            inner,
            conversation_id: uuid::Uuid::new_v4(),
            config,
            session_id: None,
        }
    }

    /// Returns the client-side conversation id.
    pub fn conversation_id(&self) -> uuid::Uuid {
        self.conversation_id
    }

    /// Returns the server session currently being continued, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Adopts the session id assigned by a completed turn.
    ///
    /// An outcome without a session id leaves the current one untouched.
    pub fn resume_from(&mut self, outcome: &TurnOutcome) {
        if outcome.session_id.is_some() {
            self.session_id = outcome.session_id.clone();
        }
    }

    /// Starts building a turn against the given streaming endpoint.
    ///
    /// Each turn gets its own decoder and accumulator; nothing is shared
    /// between in-flight turns.
    pub fn turn(&self, feature: Feature) -> TurnBuilder {
        TurnBuilder::new(
            self.inner.clone(),
            self.conversation_id,
            self.config.name.clone(),
            self.session_id.clone(),
            feature,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_from_adopts_assigned_session() {
        let assistant = crate::assistant::Assistant::builder()
            .transport(Arc::new(
                crate::http::BuddyApiClient::new(crate::http::BuddyApiConfig::new(
                    "https://example.test",
                ))
                .expect("client"),
            ))
            .build()
            .expect("assistant");
        let mut conversation = assistant.conversation(ConversationConfig::named("trip"));
        assert!(conversation.session_id().is_none());

        let outcome = TurnOutcome {
            session_id: Some("abc123".into()),
            ..TurnOutcome::default()
        };
        conversation.resume_from(&outcome);
        assert_eq!(conversation.session_id(), Some("abc123"));

        // A later outcome without an id keeps the existing session.
        conversation.resume_from(&TurnOutcome::default());
        assert_eq!(conversation.session_id(), Some("abc123"));
    }
}
