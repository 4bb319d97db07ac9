use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

use crate::schema::QuestionType;

// ============ Database Models ============

/// Represents a feedback campaign.
///
/// This is the root entity of an export: it owns a survey and zero-or-more
/// time-boxed instances. The export pipeline is a read-only consumer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    /// Unique identifier for the campaign.
    pub id: Uuid,
    /// Display name of the campaign.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Start of the campaign window.
    pub start_date: Option<DateTime<Utc>>,
    /// End of the campaign window.
    pub end_date: Option<DateTime<Utc>>,
    /// Overall completion rate (0-100).
    pub completion_rate: Option<f64>,
    /// Whether respondent identities are withheld.
    pub is_anonymous: bool,
    /// The survey (question schema) attached to this campaign.
    pub survey_id: Uuid,
}

/// One time-boxed iteration ("period") of a campaign.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CampaignInstance {
    /// Unique identifier for the instance.
    pub id: Uuid,
    /// Owning campaign.
    pub campaign_id: Uuid,
    /// Ordinal period number.
    pub period: i32,
    /// Start of the instance window.
    pub start_date: Option<DateTime<Utc>>,
    /// End of the instance window.
    pub end_date: Option<DateTime<Utc>>,
    /// Lifecycle status (draft, active, completed, archived).
    pub status: String,
    /// Completion rate for this instance (0-100).
    pub completion_rate: Option<f64>,
}

/// A survey row holding the raw questionnaire definition.
#[derive(Debug, Clone, FromRow)]
pub struct SurveyRow {
    /// Unique identifier for the survey.
    pub id: Uuid,
    /// Raw JSON questionnaire definition (pages of question elements).
    pub questionnaire: String,
}

/// One respondent's submission against an instance.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ResponseRow {
    /// Unique identifier for the response.
    pub id: Uuid,
    /// Owning campaign.
    pub campaign_id: Uuid,
    /// Owning instance, when the submission was instance-scoped.
    pub instance_id: Option<Uuid>,
    /// Respondent identity; absent for anonymous campaigns.
    pub user_id: Option<Uuid>,
    /// Submission status (submitted, in_progress, expired).
    pub status: String,
    /// Free-form answer map keyed by question name.
    pub answers: Value,
    /// Submission timestamp.
    pub submitted_at: DateTime<Utc>,
}

/// Denormalized demographic facts for one respondent.
///
/// Every field except `user_id` is nullable; missing values are bucketed
/// under "Unknown" during dimension grouping, never excluded.
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct RespondentProfile {
    /// Respondent identity.
    pub user_id: Uuid,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Email address, used as the display-name fallback.
    pub email: Option<String>,
    /// Gender.
    pub gender: Option<String>,
    /// Work location.
    pub location: Option<String>,
    /// Employment type (e.g. full-time, contractor).
    pub employment_type: Option<String>,
    /// Seniority level.
    pub level: Option<String>,
    /// Employee type.
    pub employee_type: Option<String>,
    /// Employee role.
    pub employee_role: Option<String>,
}

// ============ Processed Models ============

/// One answer within a processed response, carrying the question metadata
/// needed by the aggregators and slide builders.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerEntry {
    /// Display title of the question.
    pub question_title: String,
    /// Raw answer value as submitted.
    pub value: Value,
    /// Question type from the parsed schema.
    pub question_type: QuestionType,
    /// Rating scale maximum (5 for satisfaction scales, 10 for NPS).
    pub rate_max: u8,
}

/// Normalized record for one submitted response, joined with the
/// respondent's demographic lookups.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedResponse {
    /// Source response id.
    pub response_id: Uuid,
    /// Respondent display name ("first last", email fallback, else "Unknown").
    pub respondent_name: String,
    /// Respondent email, when known.
    pub respondent_email: Option<String>,
    /// Submission timestamp.
    pub submitted_at: DateTime<Utc>,
    /// Primary business unit.
    pub sbu: Option<String>,
    /// Gender.
    pub gender: Option<String>,
    /// Work location.
    pub location: Option<String>,
    /// Employment type.
    pub employment_type: Option<String>,
    /// Seniority level.
    pub level: Option<String>,
    /// Employee type.
    pub employee_type: Option<String>,
    /// Employee role.
    pub employee_role: Option<String>,
    /// Primary supervisor display name.
    pub supervisor: Option<String>,
    /// Answer map keyed by question name; questions the respondent skipped
    /// have no entry here.
    pub answers: HashMap<String, AnswerEntry>,
}

/// A demographic axis used to group responses for comparison charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Sbu,
    Gender,
    Location,
    EmploymentType,
    Level,
    EmployeeType,
    EmployeeRole,
    Supervisor,
}

impl Dimension {
    /// The default comparison set, in slide order.
    pub fn default_set() -> Vec<Dimension> {
        vec![
            Dimension::Sbu,
            Dimension::Gender,
            Dimension::Location,
            Dimension::EmploymentType,
            Dimension::Level,
            Dimension::EmployeeType,
            Dimension::EmployeeRole,
            Dimension::Supervisor,
        ]
    }

    /// Human-readable axis label for slide titles.
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Sbu => "Business Unit",
            Dimension::Gender => "Gender",
            Dimension::Location => "Location",
            Dimension::EmploymentType => "Employment Type",
            Dimension::Level => "Level",
            Dimension::EmployeeType => "Employee Type",
            Dimension::EmployeeRole => "Employee Role",
            Dimension::Supervisor => "Supervisor",
        }
    }

    /// Reads this dimension's value off a processed response.
    pub fn value_of<'a>(&self, response: &'a ProcessedResponse) -> Option<&'a str> {
        let value = match self {
            Dimension::Sbu => &response.sbu,
            Dimension::Gender => &response.gender,
            Dimension::Location => &response.location,
            Dimension::EmploymentType => &response.employment_type,
            Dimension::Level => &response.level,
            Dimension::EmployeeType => &response.employee_type,
            Dimension::EmployeeRole => &response.employee_role,
            Dimension::Supervisor => &response.supervisor,
        };
        value.as_deref()
    }
}

// ============ API Request/Response Models ============

/// Options accepted by the export endpoint.
///
/// All booleans default to true; `dimensions` defaults to the full
/// comparison set.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    /// Restrict the export to one campaign instance; campaign-wide when absent.
    pub instance_id: Option<Uuid>,
    /// Demographic axes to compare, in slide order.
    pub dimensions: Option<Vec<Dimension>>,
    /// Include the title slide.
    #[serde(default = "default_true")]
    pub include_title: bool,
    /// Include the completion-rate slide.
    #[serde(default = "default_true")]
    pub include_completion_rate: bool,
    /// Include the response-trend slide.
    #[serde(default = "default_true")]
    pub include_response_trends: bool,
    /// Include the sample text-responses slide.
    #[serde(default = "default_true")]
    pub include_text_responses: bool,
    /// Override the generated filename.
    pub file_name: Option<String>,
    /// Company name shown on the title slide.
    pub company: Option<String>,
    /// Author shown on the title slide.
    pub author: Option<String>,
    /// Color palette overrides.
    pub theme: Option<ThemeOverrides>,
}

fn default_true() -> bool {
    true
}

impl Default for ExportRequest {
    /// Matches the serde defaults: all slides included, full dimension set.
    fn default() -> Self {
        Self {
            instance_id: None,
            dimensions: None,
            include_title: true,
            include_completion_rate: true,
            include_response_trends: true,
            include_text_responses: true,
            file_name: None,
            company: None,
            author: None,
            theme: None,
        }
    }
}

/// Hex color overrides for the deck theme.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeOverrides {
    /// Heading/accent color, e.g. "#1F4E79".
    pub accent: Option<String>,
    /// Caption text color.
    pub caption: Option<String>,
}

/// Query parameters for the aggregate-summary endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    /// Restrict aggregation to one campaign instance.
    pub instance_id: Option<Uuid>,
}
