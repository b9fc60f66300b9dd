//! Property tests for output-shape hints.

use proptest::prelude::*;
use quarry_core::models::{FieldSpec, FieldType, FormatHint};
use serde_json::Value;

fn field_type() -> impl Strategy<Value = FieldType> {
    prop_oneof![Just(FieldType::Int), Just(FieldType::Float), Just(FieldType::Str)]
}

fn fields() -> impl Strategy<Value = Vec<FieldSpec>> {
    prop::collection::btree_map("[a-z][a-z_]{0,8}", field_type(), 1..5).prop_map(|m| {
        m.into_iter()
            .map(|(name, field_type)| FieldSpec { name, field_type })
            .collect()
    })
}

fn hint() -> impl Strategy<Value = FormatHint> {
    prop_oneof![
        Just(FormatHint::Int),
        Just(FormatHint::Float),
        Just(FormatHint::Text),
        fields().prop_map(FormatHint::Object),
        fields().prop_map(FormatHint::List),
    ]
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(Value::from),
        (-1e6f64..1e6).prop_map(Value::from),
        "[a-z0-9 .$,]{0,12}".prop_map(Value::from),
        Just(Value::Null),
    ]
}

proptest! {
    #[test]
    fn zero_value_always_conforms(h in hint()) {
        prop_assert!(h.conforms(&h.zero_value()));
    }

    #[test]
    fn display_parses_back_to_the_same_hint(h in hint()) {
        prop_assert_eq!(FormatHint::parse(&h.to_string()), h);
    }

    #[test]
    fn parse_never_panics(raw in ".{0,40}") {
        let _ = FormatHint::parse(&raw);
    }

    #[test]
    fn shaped_records_conform(
        fs in fields(),
        record in prop::collection::vec(("[a-z_]{1,8}", scalar()), 0..6),
    ) {
        let shaped = FormatHint::shape_record(&fs, &record);
        prop_assert!(FormatHint::Object(fs).conforms(&shaped));
    }

    #[test]
    fn coercion_result_matches_its_type(t in field_type(), v in scalar()) {
        if let Some(out) = t.coerce(&v) {
            prop_assert!(t.matches(&out));
        }
    }
}
