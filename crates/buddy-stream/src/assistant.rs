use std::sync::Arc;

use crate::errors::BuddyError;
use crate::session::{Conversation, ConversationConfig};
use crate::transport::StreamTransport;

pub(crate) struct AssistantInner {
    pub(crate) transport: Arc<dyn StreamTransport>,
}

/// Entry point for creating conversations and running turns.
#[derive(Clone)]
pub struct Assistant {
    pub(crate) inner: Arc<AssistantInner>,
}

impl Assistant {
    /// Starts a builder for wiring a transport and creating an `Assistant`.
    pub fn builder() -> AssistantBuilder {
        AssistantBuilder::default()
    }

    /// Creates a conversation for grouping related turns.
    pub fn conversation(&self, config: ConversationConfig) -> Conversation {
        Conversation::new(self.inner.clone(), config)
    }
}

/// Builder used to configure an `Assistant`.
#[derive(Default)]
pub struct AssistantBuilder {
    transport: Option<Arc<dyn StreamTransport>>,
}

impl AssistantBuilder {
    /// Sets the transport used to open streaming responses.
    pub fn transport(mut self, transport: Arc<dyn StreamTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the assistant, validating that a transport was provided.
    pub fn build(self) -> Result<Assistant, BuddyError> {
        let transport = self
            .transport
            .ok_or_else(|| BuddyError::Config("a stream transport is required".into()))?;
        Ok(Assistant {
            inner: Arc::new(AssistantInner { transport }),
        })
    }
}
