//! Property-based tests for the scalar codec and the dynamic bridge.
//!
//! For random inputs, pushing a value and fetching it back with the
//! matching kind must reproduce it, and lists must survive a trip through
//! the runtime unchanged.

use luaglue_sdk::{codec, dynamic};
use luaglue_sdk::{Arg, DynamicValue, IntegerWidth, ParamKind, Scalar, ScriptStack};
use luaglue_state::MemoryState;
use proptest::prelude::*;

// ============================================================================
// Helpers
// ============================================================================

fn round_trip(width: IntegerWidth, value: Scalar, kind: ParamKind) -> Arg {
    let mut state = MemoryState::with_width(width);
    codec::push(&mut state, value);
    let arg = codec::fetch(&mut state, -1, kind).unwrap();
    assert_eq!(state.top(), 1);
    arg
}

/// Strategy: JSON scalars that convert without loss
fn json_scalar() -> impl Strategy<Value = DynamicValue> {
    prop_oneof![
        any::<i32>().prop_map(DynamicValue::from),
        any::<bool>().prop_map(DynamicValue::from),
        "[a-z0-9 ]{0,12}".prop_map(DynamicValue::from),
        (-1.0e6f64..1.0e6).prop_map(DynamicValue::from),
    ]
}

// ============================================================================
// Scalars
// ============================================================================

proptest! {
    #[test]
    fn prop_i32_round_trips_in_both_widths(x in any::<i32>()) {
        for width in [IntegerWidth::Bits32, IntegerWidth::Bits64] {
            prop_assert_eq!(
                round_trip(width, Scalar::Int32(x), ParamKind::Int32),
                Arg::Int32(x)
            );
        }
    }

    #[test]
    fn prop_i64_round_trips_in_64_bit_state(x in any::<i64>()) {
        prop_assert_eq!(
            round_trip(IntegerWidth::Bits64, Scalar::Int64(x), ParamKind::Int64),
            Arg::Int64(x)
        );
    }

    #[test]
    fn prop_wide_i64_becomes_float_in_32_bit_state(
        x in prop_oneof![i64::MIN..(i32::MIN as i64), (i32::MAX as i64 + 1)..i64::MAX]
    ) {
        let mut state = MemoryState::with_width(IntegerWidth::Bits32);
        codec::push(&mut state, Scalar::Int64(x));
        prop_assert!(!state.is_integer(-1));
        prop_assert_eq!(state.to_number(-1), Some(x as f64));
    }

    #[test]
    fn prop_u32_round_trips_in_64_bit_state(x in any::<u32>()) {
        prop_assert_eq!(
            round_trip(IntegerWidth::Bits64, Scalar::UInt32(x), ParamKind::UInt32),
            Arg::UInt32(x)
        );
    }

    #[test]
    fn prop_finite_floats_round_trip(x in any::<f64>().prop_filter("finite", |x| x.is_finite())) {
        prop_assert_eq!(
            round_trip(IntegerWidth::Bits64, Scalar::Number(x), ParamKind::Number),
            Arg::Number(x)
        );
    }

    #[test]
    fn prop_bools_round_trip(b in any::<bool>()) {
        prop_assert_eq!(
            round_trip(IntegerWidth::Bits64, Scalar::Bool(b), ParamKind::Bool),
            Arg::Bool(b)
        );
    }

    #[test]
    fn prop_strings_round_trip(s in ".{0,32}") {
        prop_assert_eq!(
            round_trip(IntegerWidth::Bits64, Scalar::Str(s.clone()), ParamKind::Str),
            Arg::Str(s)
        );
    }
}

// ============================================================================
// Dynamic values
// ============================================================================

proptest! {
    #[test]
    fn prop_non_empty_lists_round_trip(items in prop::collection::vec(json_scalar(), 1..40)) {
        let list = DynamicValue::Array(items);
        for width in [IntegerWidth::Bits32, IntegerWidth::Bits64] {
            let mut state = MemoryState::with_width(width);
            dynamic::from_dynamic(&mut state, &list);
            prop_assert_eq!(dynamic::to_dynamic(&mut state, -1), list.clone());
        }
    }

    #[test]
    fn prop_string_keyed_maps_round_trip(
        entries in prop::collection::btree_map("[a-z]{1,8}", json_scalar(), 1..20)
    ) {
        let map = DynamicValue::Object(entries.into_iter().collect());
        let mut state = MemoryState::default();
        dynamic::from_dynamic(&mut state, &map);
        prop_assert_eq!(dynamic::to_dynamic(&mut state, -1), map);
    }
}
