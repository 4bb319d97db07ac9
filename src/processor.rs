//! Joins raw response rows with demographic lookups into normalized
//! per-respondent records.

use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{AnswerEntry, ProcessedResponse, RespondentProfile, ResponseRow};
use crate::schema::Question;

/// Produces one normalized record per response row.
///
/// Tolerates responses whose answer map lacks entries for some questions
/// (treated as "no answer") and respondents with no profile row (all
/// demographic fields null, grouped as "Unknown" downstream).
pub fn process_responses(
    rows: &[ResponseRow],
    questions: &[Question],
    profiles: &HashMap<Uuid, RespondentProfile>,
    business_units: &HashMap<Uuid, String>,
    supervisors: &HashMap<Uuid, String>,
) -> Vec<ProcessedResponse> {
    rows.iter()
        .map(|row| {
            let profile = row.user_id.and_then(|id| profiles.get(&id));
            let (respondent_name, respondent_email) = display_identity(profile);

            let mut answers = HashMap::new();
            if let Some(answer_map) = row.answers.as_object() {
                for question in questions {
                    let Some(value) = answer_map.get(&question.name) else {
                        continue;
                    };
                    if value.is_null() {
                        continue;
                    }
                    answers.insert(
                        question.name.clone(),
                        AnswerEntry {
                            question_title: question.title.clone(),
                            value: value.clone(),
                            question_type: question.question_type,
                            rate_max: question.rate_max,
                        },
                    );
                }
            } else if !row.answers.is_null() {
                tracing::warn!(
                    "Response {} carries a non-object answer map, treating as empty",
                    row.id
                );
            }

            ProcessedResponse {
                response_id: row.id,
                respondent_name,
                respondent_email,
                submitted_at: row.submitted_at,
                sbu: row.user_id.and_then(|id| business_units.get(&id).cloned()),
                gender: profile.and_then(|p| p.gender.clone()),
                location: profile.and_then(|p| p.location.clone()),
                employment_type: profile.and_then(|p| p.employment_type.clone()),
                level: profile.and_then(|p| p.level.clone()),
                employee_type: profile.and_then(|p| p.employee_type.clone()),
                employee_role: profile.and_then(|p| p.employee_role.clone()),
                supervisor: row.user_id.and_then(|id| supervisors.get(&id).cloned()),
                answers,
            }
        })
        .collect()
}

/// Builds a respondent display name from profile name parts, falling back
/// to the email address, then to a generic label.
pub fn display_identity(profile: Option<&RespondentProfile>) -> (String, Option<String>) {
    let Some(profile) = profile else {
        return ("Unknown".to_string(), None);
    };

    let name = format!(
        "{} {}",
        profile.first_name.as_deref().unwrap_or(""),
        profile.last_name.as_deref().unwrap_or(""),
    )
    .trim()
    .to_string();

    let display = if !name.is_empty() {
        name
    } else if let Some(email) = profile.email.as_deref().filter(|e| !e.trim().is_empty()) {
        email.to_string()
    } else {
        "Unknown".to_string()
    };

    (display, profile.email.clone())
}
