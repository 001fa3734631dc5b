//! Property-based tests for the step machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::db::{Activity, Event};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_collect_kind() -> impl Strategy<Value = FlowKind> {
    prop_oneof![
        Just(FlowKind::CreateEvent),
        Just(FlowKind::AddActivity),
        Just(FlowKind::UpdateActivity),
        Just(FlowKind::DeleteActivity),
    ]
}

/// Mix of well-formed and malformed inputs for every validator
fn arb_input() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z ]{0,20}",
        Just("skip".to_string()),
        Just("SKIP".to_string()),
        Just("2024-03-15 19:30".to_string()),
        Just("2024-13-40 25:61".to_string()),
        Just("cc".to_string()),
        Just("PEAK".to_string()),
        "[0-9]{1,4}",
        Just("-3".to_string()),
        "[a-z]{1,8}(;[a-z]{0,8}){0,3}",
        Just("a|b".to_string()),
        Just(String::new()),
    ]
}

/// A session somewhere inside its collect sequence
fn arb_collecting_state() -> impl Strategy<Value = ConversationState> {
    (arb_collect_kind(), any::<prop::sample::Index>()).prop_map(|(kind, idx)| {
        let mut state = ConversationState::start(kind);
        let n = idx.index(kind.fields().len()) + 1;
        state.step = Step::Collect(n);
        state
    })
}

fn arb_edit_state() -> impl Strategy<Value = ConversationState> {
    prop_oneof![
        prop_oneof![
            Just(Field::Description),
            Just(Field::StartTime),
            Just(Field::NewOption),
        ]
        .prop_map(|field| ConversationState::edit_event(Event::draft(), field)),
        prop_oneof![
            Just(Field::ActivityName),
            Just(Field::ActivityStart),
            Just(Field::Org),
            Just(Field::Lead),
            Just(Field::CoLeads),
        ]
        .prop_map(|field| ConversationState::edit_activity(Activity::draft(), field)),
    ]
}

/// Copy of `draft` with `field` reset to the value it holds in `reference`
fn without_field(draft: &Draft, reference: &Draft, field: Field) -> Draft {
    let mut out = draft.clone();
    match (&mut out, reference) {
        (Draft::Event(e), Draft::Event(r)) => match field {
            Field::Description => e.description.clone_from(&r.description),
            Field::StartTime => e.started_at = r.started_at,
            Field::Options | Field::NewOption => e.options.clone_from(&r.options),
            _ => {}
        },
        (Draft::Activity(a), Draft::Activity(r)) => match field {
            Field::ActivityId => a.id = r.id,
            Field::ActivityName => a.name.clone_from(&r.name),
            Field::ActivityStart => a.started_at = r.started_at,
            Field::Org => a.org = r.org,
            Field::Lead => a.lead.clone_from(&r.lead),
            Field::CoLeads => a.co_leads.clone_from(&r.co_leads),
            _ => {}
        },
        _ => {}
    }
    out
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_collect_advances_by_one_or_completes(
        state in arb_collecting_state(),
        input in arb_input()
    ) {
        let Step::Collect(n) = state.step else { unreachable!() };
        let field = state.current_field().unwrap();
        let result = transition(&state, &input);

        if field.validate(&input, &state.draft).is_err() {
            prop_assert_eq!(&result.new_state, &state);
            prop_assert!(matches!(result.effects.as_slice(), [Effect::Reply(_)]));
        } else if n == state.kind.fields().len() {
            prop_assert_eq!(result.new_state.step, Step::Complete);
            prop_assert_eq!(result.effects, vec![Effect::Persist]);
        } else {
            prop_assert_eq!(result.new_state.step, Step::Collect(n + 1));
            prop_assert!(matches!(result.effects.as_slice(), [Effect::Reply(_)]));
        }
    }

    #[test]
    fn prop_collect_mutates_only_current_field(
        state in arb_collecting_state(),
        input in arb_input()
    ) {
        let field = state.current_field().unwrap();
        let result = transition(&state, &input);
        prop_assert_eq!(
            without_field(&result.new_state.draft, &state.draft, field),
            state.draft.clone()
        );
        prop_assert_eq!(result.new_state.kind, state.kind);
    }

    #[test]
    fn prop_edit_completes_or_stays(state in arb_edit_state(), input in arb_input()) {
        let Step::Edit(field) = state.step else { unreachable!() };
        let result = transition(&state, &input);
        if result.new_state.step == Step::Complete {
            prop_assert_eq!(result.new_state.last_edit, Some(field));
            prop_assert_eq!(result.effects, vec![Effect::Persist]);
        } else {
            prop_assert_eq!(&result.new_state, &state);
        }
        prop_assert_eq!(
            without_field(&result.new_state.draft, &state.draft, field),
            state.draft.clone()
        );
    }

    #[test]
    fn prop_step_number_never_decreases_while_collecting(
        kind in arb_collect_kind(),
        inputs in proptest::collection::vec(arb_input(), 0..12)
    ) {
        let mut state = ConversationState::start(kind);
        let mut last = state.step.number();
        for input in inputs {
            state = transition(&state, &input).new_state;
            let number = state.step.number();
            if number == -1 {
                break;
            }
            prop_assert!(number >= last);
            last = number;
        }
    }

    #[test]
    fn prop_terminal_states_are_stable(kind in arb_collect_kind(), input in arb_input()) {
        let mut complete = ConversationState::start(kind);
        complete.step = Step::Complete;
        let result = transition(&complete, &input);
        prop_assert_eq!(&result.new_state, &complete);
        prop_assert_eq!(result.effects, vec![Effect::Persist]);

        let mut waiting = complete.clone();
        waiting.step = Step::AwaitingChoice;
        let result = transition(&waiting, &input);
        prop_assert_eq!(&result.new_state, &waiting);
        prop_assert!(result.effects.is_empty());
    }
}
