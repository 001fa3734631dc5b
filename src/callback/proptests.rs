//! Property-based tests for the callback codec

use super::route::*;
use super::*;
use proptest::prelude::*;

fn arb_segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _@#:;,.-]{0,12}"
}

fn arb_option() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,32}"
}

fn arb_route() -> impl Strategy<Value = Route> {
    prop_oneof![
        (proptest::sample::select(PollField::ALL), 1i64..i64::MAX)
            .prop_map(|(field, event_id)| Route::PollEdit { field, event_id }),
        (1i64..i64::MAX, arb_option())
            .prop_map(|(event_id, option)| Route::DeleteOption { event_id, option }),
        (arb_option(), proptest::sample::select(VoteIntent::ALL))
            .prop_map(|(option, intent)| Route::Vote { option, intent }),
        proptest::sample::select(WorkplanAction::ALL).prop_map(Route::Workplan),
        (1000i32..9999, 1u32..=12).prop_map(|(year, month)| {
            Route::MonthPicker(MonthChoice::Month { year, month })
        }),
        Just(Route::MonthPicker(MonthChoice::All)),
        Just(Route::MonthPicker(MonthChoice::Back)),
        (proptest::sample::select(ActivityField::ALL), 1i64..i64::MAX)
            .prop_map(|(field, activity_id)| Route::ActivityEdit { field, activity_id }),
    ]
}

proptest! {
    #[test]
    fn prop_token_round_trip(
        prefix in "[a-zA-Z]{1,16}",
        args in proptest::collection::vec(arb_segment(), 0..5)
    ) {
        let token = decode(&encode(&prefix, &args));
        prop_assert_eq!(token.prefix, prefix);
        prop_assert_eq!(token.args, args);
    }

    #[test]
    fn prop_route_round_trip(route in arb_route()) {
        let encoded = route.encode();
        prop_assert!(encoded.len() <= MAX_TOKEN_BYTES);
        prop_assert_eq!(Route::parse(&encoded).unwrap(), route);
    }

    #[test]
    fn prop_parse_never_panics(data in ".{0,80}") {
        let _ = Route::parse(&data);
    }
}
