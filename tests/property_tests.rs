/// Property-based tests using proptest
/// Tests invariants and properties that should hold for all inputs
use proptest::prelude::*;
use serde_json::{json, Value};

use survey_export_api::aggregate::{
    aggregate_boolean, aggregate_nps, aggregate_satisfaction, calculate_median,
    group_answers_by_dimension, UNKNOWN_GROUP,
};
use survey_export_api::models::{AnswerEntry, Dimension, ProcessedResponse};
use survey_export_api::schema::QuestionType;

fn refs(values: &[Value]) -> Vec<&Value> {
    values.iter().collect()
}

/// Arbitrary answer values of the shapes real submissions produce.
fn answer_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        (-5i64..20).prop_map(Value::from),
        "[a-z0-9]{0,8}".prop_map(Value::from),
        Just(Value::Null),
    ]
}

// Property: boolean aggregation conserves its input
proptest! {
    #[test]
    fn boolean_counts_conserve_input(values in prop::collection::vec(answer_value(), 0..60)) {
        let stat = aggregate_boolean(&refs(&values));
        // Every answer lands in exactly one bucket
        prop_assert_eq!(stat.yes + stat.no, values.len());
    }

    #[test]
    fn boolean_yes_matches_true_count(values in prop::collection::vec(any::<bool>(), 0..60)) {
        let json_values: Vec<Value> = values.iter().map(|b| json!(b)).collect();
        let stat = aggregate_boolean(&refs(&json_values));
        prop_assert_eq!(stat.yes, values.iter().filter(|b| **b).count());
        prop_assert_eq!(stat.no, values.iter().filter(|b| !**b).count());
    }
}

// Property: NPS bucketing never double-counts and never panics
proptest! {
    #[test]
    fn nps_never_panics(values in prop::collection::vec(answer_value(), 0..60)) {
        let _ = aggregate_nps(&refs(&values));
    }

    #[test]
    fn nps_buckets_sum_to_total(values in prop::collection::vec(-5i64..20, 0..60)) {
        let json_values: Vec<Value> = values.iter().map(|v| json!(v)).collect();
        let stat = aggregate_nps(&refs(&json_values));
        // Invalid values are dropped, never double-counted
        prop_assert_eq!(stat.detractors + stat.passives + stat.promoters, stat.total);
        prop_assert!(stat.total <= values.len());
        prop_assert_eq!(stat.total, values.iter().filter(|v| (0..=10).contains(*v)).count());
    }

    #[test]
    fn nps_score_is_bounded(values in prop::collection::vec(0i64..=10, 1..60)) {
        let json_values: Vec<Value> = values.iter().map(|v| json!(v)).collect();
        let stat = aggregate_nps(&refs(&json_values));
        prop_assert!(stat.score >= -100.0 && stat.score <= 100.0);
        prop_assert!(stat.average >= 0.0 && stat.average <= 10.0);
    }
}

// Property: satisfaction bucketing mirrors the NPS conservation rules
proptest! {
    #[test]
    fn satisfaction_buckets_sum_to_total(values in prop::collection::vec(-3i64..10, 0..60)) {
        let json_values: Vec<Value> = values.iter().map(|v| json!(v)).collect();
        let stat = aggregate_satisfaction(&refs(&json_values));
        prop_assert_eq!(stat.unsatisfied + stat.neutral + stat.satisfied, stat.total);
        prop_assert!(stat.total <= values.len());
    }

    #[test]
    fn satisfaction_median_is_bounded(values in prop::collection::vec(1i64..=5, 1..60)) {
        let json_values: Vec<Value> = values.iter().map(|v| json!(v)).collect();
        let stat = aggregate_satisfaction(&refs(&json_values));
        let min = *values.iter().min().unwrap() as f64;
        let max = *values.iter().max().unwrap() as f64;
        prop_assert!(stat.median >= min && stat.median <= max);
    }
}

// Property: the median is order-independent
proptest! {
    #[test]
    fn median_ignores_input_order(mut values in prop::collection::vec(-100i64..100, 0..40)) {
        let forward = calculate_median(&values);
        values.reverse();
        let reversed = calculate_median(&values);
        values.sort_unstable();
        let sorted = calculate_median(&values);
        prop_assert_eq!(forward, reversed);
        prop_assert_eq!(forward, sorted);
    }
}

fn grouped_response(dimension_value: Option<String>, answered: bool) -> ProcessedResponse {
    let mut answers = std::collections::HashMap::new();
    if answered {
        answers.insert(
            "q".to_string(),
            AnswerEntry {
                question_title: "q".to_string(),
                value: json!(true),
                question_type: QuestionType::Boolean,
                rate_max: 5,
            },
        );
    }
    ProcessedResponse {
        response_id: uuid::Uuid::new_v4(),
        respondent_name: "Unknown".to_string(),
        respondent_email: None,
        submitted_at: chrono::Utc::now(),
        sbu: None,
        gender: dimension_value,
        location: None,
        employment_type: None,
        level: None,
        employee_type: None,
        employee_role: None,
        supervisor: None,
        answers,
    }
}

// Property: dimension grouping drops no response and invents no label
proptest! {
    #[test]
    fn grouping_conserves_answers_and_labels(
        rows in prop::collection::vec((prop::option::of("[A-C]"), any::<bool>()), 0..40)
    ) {
        let responses: Vec<ProcessedResponse> = rows
            .iter()
            .map(|(dim, answered)| grouped_response(dim.clone(), *answered))
            .collect();

        let groups = group_answers_by_dimension(&responses, "q", Dimension::Gender);

        // Summed group answer counts equal the flat answer count
        let grouped_total: usize = groups.values().map(Vec::len).sum();
        let flat_total = rows.iter().filter(|(_, answered)| *answered).count();
        prop_assert_eq!(grouped_total, flat_total);

        // Labels are exactly the observed values, plus Unknown iff any
        // response lacks the dimension
        let mut expected: std::collections::BTreeSet<String> = rows
            .iter()
            .filter_map(|(dim, _)| dim.clone())
            .collect();
        if rows.iter().any(|(dim, _)| dim.is_none()) {
            expected.insert(UNKNOWN_GROUP.to_string());
        }
        let actual: std::collections::BTreeSet<String> = groups.keys().cloned().collect();
        prop_assert_eq!(actual, expected);
    }
}
