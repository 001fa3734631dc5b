//! Pure step transition function

use super::{ConversationState, Effect, Step};

/// Result of a step transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Feed one text input to a session.
///
/// Invalid input leaves step and draft unchanged and replies with the retry
/// prompt. A complete session asks for persistence again on any input; an
/// update flow waiting for a button ignores free text.
pub fn transition(state: &ConversationState, input: &str) -> Transition {
    match state.step {
        Step::Complete => Transition::new(state.clone()).with_effect(Effect::Persist),
        Step::AwaitingChoice => Transition::new(state.clone()),
        Step::Collect(n) => {
            let Some(field) = state.current_field() else {
                // Step pointer past the field table: nothing left to collect
                let mut next = state.clone();
                next.step = Step::Complete;
                return Transition::new(next).with_effect(Effect::Persist);
            };
            let value = match field.validate(input, &state.draft) {
                Ok(value) => value,
                Err(err) => {
                    return Transition::new(state.clone()).with_effect(Effect::reply(err.to_string()))
                }
            };

            let mut next = state.clone();
            field.apply(&mut next.draft, value);
            match state.kind.fields().get(n) {
                Some(following) => {
                    next.step = Step::Collect(n + 1);
                    let prompt = following.prompt(state.kind);
                    Transition::new(next).with_effect(Effect::Reply(prompt))
                }
                None => {
                    next.step = Step::Complete;
                    Transition::new(next).with_effect(Effect::Persist)
                }
            }
        }
        Step::Edit(field) => match field.validate(input, &state.draft) {
            Ok(value) => {
                let mut next = state.clone();
                field.apply(&mut next.draft, value);
                next.step = Step::Complete;
                next.last_edit = Some(field);
                Transition::new(next).with_effect(Effect::Persist)
            }
            Err(err) => Transition::new(state.clone()).with_effect(Effect::reply(err.to_string())),
        },
    }
}
