//! Property tests for answer validation and confidence estimation.

use proptest::prelude::*;
use quarry_core::models::{Answer, FieldSpec, FieldType, FormatHint};
use quarry_pipeline::{ConfidenceEstimator, ResponseValidator, Signals};
use serde_json::{json, Value};

fn field_type() -> impl Strategy<Value = FieldType> + Clone {
    prop_oneof![Just(FieldType::Int), Just(FieldType::Float), Just(FieldType::Str)]
}

fn hint() -> impl Strategy<Value = FormatHint> {
    let fields = prop::collection::btree_map("[a-z][a-z_]{0,6}", field_type(), 1..4).prop_map(|m| {
        m.into_iter()
            .map(|(name, field_type)| FieldSpec { name, field_type })
            .collect::<Vec<_>>()
    });
    prop_oneof![
        Just(FormatHint::Int),
        Just(FormatHint::Float),
        Just(FormatHint::Text),
        fields.clone().prop_map(FormatHint::Object),
        fields.prop_map(FormatHint::List),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        (-1e9f64..1e9).prop_map(Value::from),
        "[a-z0-9 .]{0,10}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn confidence() -> impl Strategy<Value = f64> {
    prop_oneof![
        0.0f64..=1.0,
        -5.0f64..5.0,
        Just(f64::NAN),
        Just(f64::INFINITY),
    ]
}

fn unit() -> impl Strategy<Value = f64> {
    prop_oneof![0.0f64..=1.0, Just(f64::NAN), -1.0f64..2.0]
}

proptest! {
    #[test]
    fn validated_answers_conform_and_stay_in_range(
        h in hint(),
        v in value(),
        c in confidence(),
        cited in any::<bool>(),
        stages_ran in any::<bool>(),
    ) {
        let citations = if cited { vec!["Orders".to_string()] } else { Vec::new() };
        let answer = Answer::new(v, c, "x", citations);
        let out = ResponseValidator::new().validate(answer, &h, stages_ran).answer;

        prop_assert!(h.conforms(&out.value), "{} does not conform to {}", out.value, h);
        prop_assert!((0.0..=1.0).contains(&out.confidence));
    }

    #[test]
    fn uncited_answers_lose_confidence_when_stages_ran(h in hint(), c in 0.0f64..=1.0) {
        let validator = ResponseValidator::new();
        let cited = validator
            .validate(Answer::new(h.zero_value(), c, "x", vec!["Orders".into()]), &h, true)
            .answer;
        let uncited = validator
            .validate(Answer::new(h.zero_value(), c, "x", Vec::new()), &h, true)
            .answer;

        prop_assert_eq!(cited.confidence, c);
        prop_assert!(uncited.confidence <= c / 2.0 + f64::EPSILON);
    }

    #[test]
    fn estimates_are_bounded(
        retrieval in prop::option::of(unit()),
        execution in prop::option::of(unit()),
        completeness in unit(),
        degraded in any::<bool>(),
    ) {
        let score = ConfidenceEstimator::default().estimate(Signals {
            retrieval,
            execution,
            completeness,
            degraded,
        });
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn more_repairs_never_raise_the_execution_signal(repairs in 0usize..6) {
        let est = ConfidenceEstimator::default();
        prop_assert!(est.execution_signal(true, repairs + 1) <= est.execution_signal(true, repairs));
        prop_assert_eq!(est.execution_signal(false, repairs), 0.0);
    }
}

#[test]
fn integral_float_is_accepted_for_int() {
    let out = ResponseValidator::new()
        .validate(Answer::new(json!({"n": 14.0}), 0.9, "x", vec!["Orders".into()]), &FormatHint::Int, true)
        .answer;
    assert_eq!(out.value, json!(14));
    assert!(out.valid);
}
