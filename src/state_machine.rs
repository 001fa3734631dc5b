//! Conversation step machine
//!
//! Multi-message flows are a pure `transition(state, input)` that returns the
//! next state plus effects. The runtime executes the effects.

mod effect;
pub mod field;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use field::{Field, FieldError, FieldKind, FieldValue};
pub use state::{ConversationState, Draft, FlowKind, Step};
pub use transition::{transition, Transition};
