use serde::{Deserialize, Serialize};

/// Question types recognized by the export pipeline.
///
/// Unrecognized questionnaire element types map to `Other` and are ignored
/// for chart purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Rating,
    Boolean,
    Text,
    Comment,
    Other,
}

impl QuestionType {
    /// Whether this question type produces a chart slide.
    pub fn is_chartable(&self) -> bool {
        matches!(self, QuestionType::Rating | QuestionType::Boolean)
    }

    /// Whether this question type is eligible for the sample-responses slide.
    pub fn is_text(&self) -> bool {
        matches!(self, QuestionType::Text | QuestionType::Comment)
    }
}

/// Explicit rating intent, set at survey-authoring time.
///
/// The legacy decks inferred NPS-style questions from `rateMax == 10`
/// plus a "recommend" substring in the title; that heuristic is retained
/// below only as a fallback decoder for schemas authored before the
/// explicit tag existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingIntent {
    Likelihood,
    Satisfaction,
    Generic,
}

/// One parsed question definition.
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    /// Stable name, used as the answer-map key.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Parsed question type.
    pub question_type: QuestionType,
    /// Rating scale maximum (10 for likelihood, 5 otherwise).
    pub rate_max: u8,
    /// Rating intent; meaningful only for rating questions.
    pub intent: RatingIntent,
}

impl Question {
    /// Whether this rating question aggregates as NPS.
    pub fn is_nps(&self) -> bool {
        self.question_type == QuestionType::Rating && self.intent == RatingIntent::Likelihood
    }
}

/// Parsed survey schema: the flattened, page-ordered question list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SurveySchema {
    pub questions: Vec<Question>,
}

// Raw questionnaire shapes. Every field is optional so that partially
// authored schemas still parse; elements without a name are skipped.

#[derive(Debug, Deserialize)]
struct RawQuestionnaire {
    #[serde(default)]
    pages: Vec<RawPage>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    elements: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    name: Option<String>,
    title: Option<String>,
    #[serde(rename = "type")]
    element_type: Option<String>,
    #[serde(rename = "rateMax")]
    rate_max: Option<u8>,
    #[serde(rename = "ratingIntent")]
    rating_intent: Option<String>,
}

/// Parses a raw questionnaire definition into a survey schema.
///
/// Parsing failure must not abort an export: malformed JSON yields an
/// empty question list, and downstream slides report "no data" instead.
pub fn parse_questionnaire(raw: &str) -> SurveySchema {
    let parsed: RawQuestionnaire = match serde_json::from_str(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Malformed questionnaire JSON, treating as empty schema: {}", e);
            return SurveySchema::default();
        }
    };

    let mut questions = Vec::new();
    for page in parsed.pages {
        for element in page.elements {
            let Some(name) = element.name.filter(|n| !n.trim().is_empty()) else {
                tracing::warn!("Skipping questionnaire element without a name");
                continue;
            };

            let question_type = match element.element_type.as_deref() {
                Some("rating") => QuestionType::Rating,
                Some("boolean") => QuestionType::Boolean,
                Some("text") => QuestionType::Text,
                Some("comment") => QuestionType::Comment,
                _ => QuestionType::Other,
            };

            let title = element.title.unwrap_or_else(|| name.clone());
            let intent = resolve_intent(
                question_type,
                element.rating_intent.as_deref(),
                element.rate_max,
                &title,
            );
            let rate_max = match element.rate_max {
                Some(max) if max > 0 => max,
                _ if intent == RatingIntent::Likelihood => 10,
                _ => 5,
            };

            questions.push(Question {
                name,
                title,
                question_type,
                rate_max,
                intent,
            });
        }
    }

    SurveySchema { questions }
}

/// Resolves the rating intent for a question.
///
/// The explicit `ratingIntent` tag wins; schemas without one fall back to
/// the migration-era heuristic (`rateMax == 10` and a "recommend" title).
fn resolve_intent(
    question_type: QuestionType,
    explicit: Option<&str>,
    rate_max: Option<u8>,
    title: &str,
) -> RatingIntent {
    if question_type != QuestionType::Rating {
        return RatingIntent::Generic;
    }

    match explicit {
        Some("likelihood") => RatingIntent::Likelihood,
        Some("satisfaction") => RatingIntent::Satisfaction,
        Some("generic") => RatingIntent::Generic,
        Some(other) => {
            tracing::warn!("Unrecognized ratingIntent '{}', falling back to heuristic", other);
            heuristic_intent(rate_max, title)
        }
        None => heuristic_intent(rate_max, title),
    }
}

fn heuristic_intent(rate_max: Option<u8>, title: &str) -> RatingIntent {
    if rate_max == Some(10) && title.to_lowercase().contains("recommend") {
        RatingIntent::Likelihood
    } else {
        RatingIntent::Satisfaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pages_in_order() {
        let raw = r#"{
            "pages": [
                {"elements": [
                    {"name": "q1", "title": "Happy at work?", "type": "rating"},
                    {"name": "q2", "title": "Remote?", "type": "boolean"}
                ]},
                {"elements": [
                    {"name": "q3", "title": "Anything else?", "type": "comment"}
                ]}
            ]
        }"#;

        let schema = parse_questionnaire(raw);
        let names: Vec<&str> = schema.questions.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["q1", "q2", "q3"]);
        assert_eq!(schema.questions[0].question_type, QuestionType::Rating);
        assert_eq!(schema.questions[0].rate_max, 5);
        assert_eq!(schema.questions[1].question_type, QuestionType::Boolean);
        assert_eq!(schema.questions[2].question_type, QuestionType::Comment);
    }

    #[test]
    fn malformed_json_yields_empty_schema() {
        let schema = parse_questionnaire("this is not a questionnaire");
        assert!(schema.questions.is_empty());

        let schema = parse_questionnaire("{\"pages\": 42}");
        assert!(schema.questions.is_empty());
    }

    #[test]
    fn heuristic_detects_nps_questions() {
        let raw = r#"{
            "pages": [{"elements": [
                {"name": "nps", "title": "How likely are you to recommend us?", "type": "rating", "rateMax": 10},
                {"name": "sat", "title": "How satisfied are you?", "type": "rating", "rateMax": 10}
            ]}]
        }"#;

        let schema = parse_questionnaire(raw);
        assert!(schema.questions[0].is_nps());
        assert_eq!(schema.questions[0].rate_max, 10);
        // rateMax 10 alone is not enough without the title match
        assert!(!schema.questions[1].is_nps());
        assert_eq!(schema.questions[1].intent, RatingIntent::Satisfaction);
    }

    #[test]
    fn explicit_intent_overrides_heuristic() {
        let raw = r#"{
            "pages": [{"elements": [
                {"name": "q1", "title": "Would you recommend our canteen?", "type": "rating",
                 "rateMax": 10, "ratingIntent": "satisfaction"},
                {"name": "q2", "title": "Growth outlook", "type": "rating",
                 "rateMax": 10, "ratingIntent": "likelihood"}
            ]}]
        }"#;

        let schema = parse_questionnaire(raw);
        assert_eq!(schema.questions[0].intent, RatingIntent::Satisfaction);
        assert!(schema.questions[1].is_nps());
    }

    #[test]
    fn unnamed_and_unknown_elements_are_tolerated() {
        let raw = r#"{
            "pages": [{"elements": [
                {"title": "No name"},
                {"name": "matrix1", "title": "Grid", "type": "matrix"}
            ]}]
        }"#;

        let schema = parse_questionnaire(raw);
        assert_eq!(schema.questions.len(), 1);
        assert_eq!(schema.questions[0].question_type, QuestionType::Other);
        assert!(!schema.questions[0].question_type.is_chartable());
    }
}
