//! Data-source abstraction for the export pipeline.
//!
//! The orchestrator is parameterized by `ResponseDataSource` so the same
//! pipeline serves the interactive HTTP path, the CLI path and the test
//! suite; `PgDataSource` is the production implementation.

use moka::future::Cache;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use uuid::Uuid;

use crate::cache_validator::ValidatedCacheEntry;
use crate::errors::AppError;
use crate::models::{Campaign, CampaignInstance, RespondentProfile, ResponseRow, SurveyRow};
use crate::processor::display_identity;

/// Read-only source of campaign, survey and response data.
///
/// All operations are side-effect free; any failure here is fatal for the
/// whole export.
#[allow(async_fn_in_trait)]
pub trait ResponseDataSource {
    /// Fetches campaign metadata.
    async fn fetch_campaign(&self, campaign_id: Uuid) -> Result<Campaign, AppError>;

    /// Fetches instance metadata.
    async fn fetch_instance(&self, instance_id: Uuid) -> Result<CampaignInstance, AppError>;

    /// Fetches the raw questionnaire text for a survey.
    async fn fetch_questionnaire(&self, survey_id: Uuid) -> Result<String, AppError>;

    /// Fetches export-eligible responses: always `status = submitted`,
    /// scoped to the instance when one is given, else campaign-wide.
    async fn fetch_submitted_responses(
        &self,
        campaign_id: Uuid,
        instance_id: Option<Uuid>,
    ) -> Result<Vec<ResponseRow>, AppError>;

    /// Fetches respondent profiles keyed by user id.
    async fn fetch_profiles(
        &self,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, RespondentProfile>, AppError>;

    /// Fetches each respondent's primary business-unit name.
    async fn fetch_primary_business_units(
        &self,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, AppError>;

    /// Fetches each respondent's primary supervisor display name.
    async fn fetch_primary_supervisors(
        &self,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, AppError>;
}

/// Postgres-backed data source.
pub struct PgDataSource {
    pool: PgPool,
    /// Questionnaire text cache, keyed per survey. Entries carry a checksum
    /// and are refetched when validation fails.
    questionnaire_cache: Cache<String, String>,
}

impl PgDataSource {
    pub fn new(pool: PgPool, questionnaire_cache: Cache<String, String>) -> Self {
        Self {
            pool,
            questionnaire_cache,
        }
    }
}

impl ResponseDataSource for PgDataSource {
    async fn fetch_campaign(&self, campaign_id: Uuid) -> Result<Campaign, AppError> {
        sqlx::query_as::<_, Campaign>(
            "SELECT id, name, description, start_date, end_date, completion_rate, is_anonymous, survey_id \
             FROM feedback.campaigns WHERE id = $1",
        )
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign with id {} not found", campaign_id)))
    }

    async fn fetch_instance(&self, instance_id: Uuid) -> Result<CampaignInstance, AppError> {
        sqlx::query_as::<_, CampaignInstance>(
            "SELECT id, campaign_id, period, start_date, end_date, status, completion_rate \
             FROM feedback.campaign_instances WHERE id = $1",
        )
        .bind(instance_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Instance with id {} not found", instance_id)))
    }

    async fn fetch_questionnaire(&self, survey_id: Uuid) -> Result<String, AppError> {
        let cache_key = format!("questionnaire:{}", survey_id);

        // Check cache first with validation
        if let Some(cached) = self.questionnaire_cache.get(&cache_key).await {
            if let Some(valid_data) = ValidatedCacheEntry::deserialize_and_validate(&cached) {
                tracing::debug!("Questionnaire cache HIT (validated) for survey {}", survey_id);
                return Ok(valid_data);
            }
            tracing::warn!(
                "Questionnaire cache validation failed for survey {}, refetching",
                survey_id
            );
        }

        let survey = sqlx::query_as::<_, SurveyRow>(
            "SELECT id, questionnaire FROM feedback.surveys WHERE id = $1",
        )
        .bind(survey_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Survey with id {} not found", survey_id)))?;

        let validated_entry = ValidatedCacheEntry::new(survey.questionnaire.clone());
        self.questionnaire_cache
            .insert(cache_key, validated_entry.serialize())
            .await;

        Ok(survey.questionnaire)
    }

    async fn fetch_submitted_responses(
        &self,
        campaign_id: Uuid,
        instance_id: Option<Uuid>,
    ) -> Result<Vec<ResponseRow>, AppError> {
        let rows = if let Some(instance_id) = instance_id {
            sqlx::query_as::<_, ResponseRow>(
                "SELECT id, campaign_id, instance_id, user_id, status, answers, submitted_at \
                 FROM feedback.survey_responses \
                 WHERE status = 'submitted' AND instance_id = $1 \
                 ORDER BY submitted_at ASC",
            )
            .bind(instance_id)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, ResponseRow>(
                "SELECT id, campaign_id, instance_id, user_id, status, answers, submitted_at \
                 FROM feedback.survey_responses \
                 WHERE status = 'submitted' AND campaign_id = $1 \
                 ORDER BY submitted_at ASC",
            )
            .bind(campaign_id)
            .fetch_all(&self.pool)
            .await?
        };

        tracing::debug!(
            "Fetched {} submitted responses for campaign {}",
            rows.len(),
            campaign_id
        );
        Ok(rows)
    }

    async fn fetch_profiles(
        &self,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, RespondentProfile>, AppError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let profiles = sqlx::query_as::<_, RespondentProfile>(
            "SELECT user_id, first_name, last_name, email, gender, location, \
                    employment_type, level, employee_type, employee_role \
             FROM feedback.user_profiles WHERE user_id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles.into_iter().map(|p| (p.user_id, p)).collect())
    }

    async fn fetch_primary_business_units(
        &self,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, AppError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            "SELECT m.user_id, b.name \
             FROM feedback.business_unit_members m \
             JOIN feedback.business_units b ON b.id = m.business_unit_id \
             WHERE m.is_primary AND m.user_id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut units = HashMap::new();
        for row in rows {
            units.insert(row.get("user_id"), row.get("name"));
        }
        Ok(units)
    }

    async fn fetch_primary_supervisors(
        &self,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, AppError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            "SELECT a.user_id, p.user_id AS supervisor_id, p.first_name, p.last_name, p.email \
             FROM feedback.supervisor_assignments a \
             JOIN feedback.user_profiles p ON p.user_id = a.supervisor_id \
             WHERE a.is_primary AND a.user_id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut supervisors = HashMap::new();
        for row in rows {
            // Supervisors are labeled by display name, never raw id; the
            // same name/email fallback as respondents applies.
            let profile = RespondentProfile {
                user_id: row.get("supervisor_id"),
                first_name: row.get("first_name"),
                last_name: row.get("last_name"),
                email: row.get("email"),
                ..RespondentProfile::default()
            };
            let (label, _) = display_identity(Some(&profile));
            supervisors.insert(row.get("user_id"), label);
        }
        Ok(supervisors)
    }
}
