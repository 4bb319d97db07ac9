//! Pure aggregation functions over processed responses.
//!
//! Every aggregator is a total function from answer slices to a statistic:
//! no I/O, no side effects. Invalid or out-of-range values are dropped from
//! the denominator rather than coerced, and empty inputs produce zeroed
//! statistics instead of errors.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::{Dimension, ProcessedResponse};
use crate::schema::Question;

/// Group label substituted for a missing dimension value.
pub const UNKNOWN_GROUP: &str = "Unknown";

/// Yes/no split for a boolean question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BooleanStat {
    pub yes: usize,
    pub no: usize,
}

impl BooleanStat {
    pub fn total(&self) -> usize {
        self.yes + self.no
    }

    /// Yes percentage; 0 when there are no answers.
    pub fn yes_pct(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.yes as f64 / self.total() as f64 * 100.0
        }
    }

    pub fn no_pct(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.no as f64 / self.total() as f64 * 100.0
        }
    }
}

/// Detractor/passive/promoter buckets for a 0-10 likelihood question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NpsStat {
    pub detractors: usize,
    pub passives: usize,
    pub promoters: usize,
    /// Count of answers that coerced into [0, 10].
    pub total: usize,
    /// `(promoters - detractors) / total * 100`, in [-100, 100].
    pub score: f64,
    /// Mean of the valid answer values.
    pub average: f64,
}

/// Unsatisfied/neutral/satisfied buckets for a 1-5 satisfaction question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SatisfactionStat {
    pub unsatisfied: usize,
    pub neutral: usize,
    pub satisfied: usize,
    /// Count of answers that coerced into [1, 5].
    pub total: usize,
    /// Median of the valid answer values.
    pub median: f64,
    /// `satisfied / total * 100`.
    pub rate: f64,
}

/// One question's aggregate statistic, tagged by aggregation kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionStat {
    Boolean(BooleanStat),
    Nps(NpsStat),
    Satisfaction(SatisfactionStat),
}

/// Recognizes truthy answer values: `true`, `1`, `"1"`, and
/// case-insensitive `"true"`/`"yes"`. Everything else counts as no.
pub fn coerce_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1) || n.as_f64() == Some(1.0),
        Value::String(s) => {
            let s = s.trim();
            s == "1" || s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes")
        }
        _ => false,
    }
}

/// Coerces an answer value to an integer rating.
///
/// Accepts JSON integers, whole-number floats, and numeric strings.
pub fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else {
                n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Counts recognized-true values against everything else.
pub fn aggregate_boolean(answers: &[&Value]) -> BooleanStat {
    let mut stat = BooleanStat::default();
    for answer in answers {
        if coerce_boolean(answer) {
            stat.yes += 1;
        } else {
            stat.no += 1;
        }
    }
    stat
}

/// Buckets 0-10 answers into detractors (<=6), passives (7-8) and
/// promoters (>=9). Values outside [0, 10] are dropped from the total.
pub fn aggregate_nps(answers: &[&Value]) -> NpsStat {
    let valid: Vec<i64> = answers
        .iter()
        .filter_map(|a| coerce_integer(a))
        .filter(|v| (0..=10).contains(v))
        .collect();

    let mut stat = NpsStat {
        total: valid.len(),
        ..NpsStat::default()
    };
    if valid.is_empty() {
        return stat;
    }

    for value in &valid {
        match value {
            0..=6 => stat.detractors += 1,
            7..=8 => stat.passives += 1,
            _ => stat.promoters += 1,
        }
    }

    let total = stat.total as f64;
    stat.score = (stat.promoters as f64 / total - stat.detractors as f64 / total) * 100.0;
    stat.average = valid.iter().sum::<i64>() as f64 / total;
    stat
}

/// Buckets 1-5 answers into unsatisfied (<=2), neutral (=3) and
/// satisfied (>=4). Values outside [1, 5] are dropped from the total.
pub fn aggregate_satisfaction(answers: &[&Value]) -> SatisfactionStat {
    let valid: Vec<i64> = answers
        .iter()
        .filter_map(|a| coerce_integer(a))
        .filter(|v| (1..=5).contains(v))
        .collect();

    let mut stat = SatisfactionStat {
        total: valid.len(),
        ..SatisfactionStat::default()
    };
    if valid.is_empty() {
        return stat;
    }

    for value in &valid {
        match value {
            1..=2 => stat.unsatisfied += 1,
            3 => stat.neutral += 1,
            _ => stat.satisfied += 1,
        }
    }

    stat.median = calculate_median(&valid);
    stat.rate = stat.satisfied as f64 / stat.total as f64 * 100.0;
    stat
}

/// Median of a value set, order-independent.
///
/// Odd counts take the middle element; even counts average the two middle
/// elements; an empty set yields 0.
pub fn calculate_median(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid] as f64
    } else {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    }
}

/// Applies the aggregator matching a question's type and intent.
///
/// Returns `None` for question types with no chart aggregation (text,
/// comment, unrecognized).
pub fn aggregate_question(question: &Question, answers: &[&Value]) -> Option<QuestionStat> {
    use crate::schema::QuestionType;

    match question.question_type {
        QuestionType::Boolean => Some(QuestionStat::Boolean(aggregate_boolean(answers))),
        QuestionType::Rating if question.is_nps() => {
            Some(QuestionStat::Nps(aggregate_nps(answers)))
        }
        QuestionType::Rating => Some(QuestionStat::Satisfaction(aggregate_satisfaction(answers))),
        _ => None,
    }
}

/// Collects the present answers for one question across all responses.
///
/// Responses without an entry for the question contribute nothing (they
/// are excluded from that question's denominator).
pub fn answers_for<'a>(
    responses: &'a [ProcessedResponse],
    question_name: &str,
) -> Vec<&'a Value> {
    responses
        .iter()
        .filter_map(|r| r.answers.get(question_name).map(|a| &a.value))
        .collect()
}

/// Partitions one question's answers by a demographic dimension.
///
/// Every respondent contributes a group entry even when they skipped the
/// question, so groups with zero answers are retained (comparison charts
/// render an explicit empty bar instead of omitting the category). Missing
/// dimension values land in the "Unknown" group. The map is ordered for
/// deterministic slide output.
pub fn group_answers_by_dimension<'a>(
    responses: &'a [ProcessedResponse],
    question_name: &str,
    dimension: Dimension,
) -> BTreeMap<String, Vec<&'a Value>> {
    let mut groups: BTreeMap<String, Vec<&Value>> = BTreeMap::new();

    for response in responses {
        let label = dimension
            .value_of(response)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(UNKNOWN_GROUP)
            .to_string();
        let entry = groups.entry(label).or_default();
        if let Some(answer) = response.answers.get(question_name) {
            entry.push(&answer.value);
        }
    }

    groups
}

/// Dimension-grouped variant of the question aggregator.
pub fn aggregate_question_by_dimension(
    question: &Question,
    responses: &[ProcessedResponse],
    dimension: Dimension,
) -> Option<BTreeMap<String, QuestionStat>> {
    let groups = group_answers_by_dimension(responses, &question.name, dimension);
    let mut stats = BTreeMap::new();
    for (label, answers) in groups {
        stats.insert(label, aggregate_question(question, &answers)?);
    }
    Some(stats)
}
