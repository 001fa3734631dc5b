//! Effects produced by step transitions

/// Effects to be executed after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send plain text back to the conversation
    Reply(String),

    /// Collection is complete: write the draft for this flow kind
    Persist,
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply(text.into())
    }
}
