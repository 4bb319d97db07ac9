/// End-to-end export tests against an in-memory data source
/// The pipeline is exercised through the same `ResponseDataSource` seam the
/// Postgres implementation uses; no database required
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use survey_export_api::errors::AppError;
use survey_export_api::export::{fetch_dataset, run_export, ExportOptions};
use survey_export_api::fetcher::ResponseDataSource;
use survey_export_api::models::{
    Campaign, CampaignInstance, Dimension, RespondentProfile, ResponseRow,
};

/// In-memory stand-in for the Postgres data source.
struct MemoryDataSource {
    campaign: Campaign,
    instances: HashMap<Uuid, CampaignInstance>,
    questionnaire: String,
    responses: Vec<ResponseRow>,
    profiles: HashMap<Uuid, RespondentProfile>,
    business_units: HashMap<Uuid, String>,
    supervisors: HashMap<Uuid, String>,
    fail_campaign_fetch: bool,
}

impl ResponseDataSource for MemoryDataSource {
    async fn fetch_campaign(&self, campaign_id: Uuid) -> Result<Campaign, AppError> {
        if self.fail_campaign_fetch {
            return Err(AppError::DatabaseError(sqlx::Error::PoolClosed));
        }
        if campaign_id == self.campaign.id {
            Ok(self.campaign.clone())
        } else {
            Err(AppError::NotFound(format!(
                "Campaign with id {} not found",
                campaign_id
            )))
        }
    }

    async fn fetch_instance(&self, instance_id: Uuid) -> Result<CampaignInstance, AppError> {
        self.instances
            .get(&instance_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Instance with id {} not found", instance_id)))
    }

    async fn fetch_questionnaire(&self, _survey_id: Uuid) -> Result<String, AppError> {
        Ok(self.questionnaire.clone())
    }

    async fn fetch_submitted_responses(
        &self,
        campaign_id: Uuid,
        instance_id: Option<Uuid>,
    ) -> Result<Vec<ResponseRow>, AppError> {
        Ok(self
            .responses
            .iter()
            .filter(|r| r.status == "submitted")
            .filter(|r| match instance_id {
                Some(instance_id) => r.instance_id == Some(instance_id),
                None => r.campaign_id == campaign_id,
            })
            .cloned()
            .collect())
    }

    async fn fetch_profiles(
        &self,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, RespondentProfile>, AppError> {
        Ok(self
            .profiles
            .iter()
            .filter(|(id, _)| user_ids.contains(id))
            .map(|(id, p)| (*id, p.clone()))
            .collect())
    }

    async fn fetch_primary_business_units(
        &self,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, AppError> {
        Ok(self
            .business_units
            .iter()
            .filter(|(id, _)| user_ids.contains(id))
            .map(|(id, u)| (*id, u.clone()))
            .collect())
    }

    async fn fetch_primary_supervisors(
        &self,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, AppError> {
        Ok(self
            .supervisors
            .iter()
            .filter(|(id, _)| user_ids.contains(id))
            .map(|(id, s)| (*id, s.clone()))
            .collect())
    }
}

const QUESTIONNAIRE: &str = r#"{
    "pages": [
        {"elements": [
            {"name": "happy", "title": "Are you happy at work?", "type": "boolean"},
            {"name": "recommend", "title": "How likely are you to recommend us?", "type": "rating", "rateMax": 10},
            {"name": "satisfaction", "title": "How satisfied are you with your team?", "type": "rating"}
        ]},
        {"elements": [
            {"name": "feedback", "title": "Anything else?", "type": "comment"}
        ]}
    ]
}"#;

fn campaign(survey_id: Uuid) -> Campaign {
    Campaign {
        id: Uuid::new_v4(),
        name: "Q3 Pulse 2026!".to_string(),
        description: Some("Quarterly engagement pulse".to_string()),
        start_date: Some(Utc::now() - Duration::days(14)),
        end_date: Some(Utc::now()),
        completion_rate: Some(82.0),
        is_anonymous: false,
        survey_id,
    }
}

fn response(
    campaign_id: Uuid,
    instance_id: Option<Uuid>,
    user_id: Option<Uuid>,
    status: &str,
    answers: Value,
    days_ago: i64,
) -> ResponseRow {
    ResponseRow {
        id: Uuid::new_v4(),
        campaign_id,
        instance_id,
        user_id,
        status: status.to_string(),
        answers,
        submitted_at: Utc::now() - Duration::days(days_ago),
    }
}

/// Ten submitted responses: boolean 7/3, NPS [9,9,8,3,10], satisfaction
/// [1,2,3,4,5,5], a couple of comments, plus one in-progress row that must
/// be filtered out.
fn build_source() -> MemoryDataSource {
    let survey_id = Uuid::new_v4();
    let campaign = campaign(survey_id);
    let campaign_id = campaign.id;

    let nps_values = [Some(9), Some(9), Some(8), Some(3), Some(10), None, None, None, None, None];
    let sat_values = [Some(1), Some(2), Some(3), Some(4), Some(5), Some(5), None, None, None, None];

    let mut responses = Vec::new();
    let mut profiles = HashMap::new();
    let mut business_units = HashMap::new();
    let mut supervisors = HashMap::new();

    for i in 0..10 {
        let user_id = Uuid::new_v4();
        let mut answers = serde_json::Map::new();
        answers.insert("happy".to_string(), json!(i < 7));
        if let Some(v) = nps_values[i] {
            answers.insert("recommend".to_string(), json!(v));
        }
        if let Some(v) = sat_values[i] {
            answers.insert("satisfaction".to_string(), json!(v));
        }
        if i < 3 {
            answers.insert("feedback".to_string(), json!(format!("free-text note {}", i)));
        }

        responses.push(response(
            campaign_id,
            None,
            Some(user_id),
            "submitted",
            Value::Object(answers),
            (i % 4) as i64,
        ));

        profiles.insert(
            user_id,
            RespondentProfile {
                user_id,
                first_name: Some(format!("User{}", i)),
                last_name: Some("Example".to_string()),
                email: Some(format!("user{}@example.com", i)),
                gender: if i % 3 == 0 {
                    None
                } else if i % 2 == 0 {
                    Some("Female".to_string())
                } else {
                    Some("Male".to_string())
                },
                location: Some("Berlin".to_string()),
                ..RespondentProfile::default()
            },
        );
        business_units.insert(
            user_id,
            if i < 5 { "Engineering" } else { "Sales" }.to_string(),
        );
        supervisors.insert(user_id, "Kim Ortiz".to_string());
    }

    // Ineligible row: not submitted
    responses.push(response(
        campaign_id,
        None,
        None,
        "in_progress",
        json!({"happy": true}),
        0,
    ));

    MemoryDataSource {
        campaign,
        instances: HashMap::new(),
        questionnaire: QUESTIONNAIRE.to_string(),
        responses,
        profiles,
        business_units,
        supervisors,
        fail_campaign_fetch: false,
    }
}

fn options_with_dimensions(dimensions: Vec<Dimension>) -> ExportOptions {
    ExportOptions {
        dimensions,
        ..ExportOptions::default()
    }
}

#[tokio::test]
async fn full_export_produces_expected_slides_and_progress() {
    let source = build_source();
    let campaign_id = source.campaign.id;
    let options = options_with_dimensions(vec![Dimension::Gender, Dimension::Sbu]);

    let mut reported = Vec::new();
    let artifact = run_export(&source, campaign_id, &options, |pct| reported.push(pct))
        .await
        .expect("export should succeed");

    // 3 frame slides + 3 chartable questions x (1 main + 2 dimensions) + 1
    // sample-responses slide
    assert_eq!(artifact.slide_count, 13);
    assert_eq!(artifact.file_name, "Q3_Pulse_2026_presentation.xlsx");
    assert_eq!(&artifact.bytes[..2], b"PK");

    // Progress: fetch tick, one tick per frame and question unit, final 100
    assert!(reported.len() >= 13);
    assert!((reported[0] - 10.0).abs() < 1e-9);
    assert_eq!(*reported.last().unwrap(), 100.0);
    assert!(reported.windows(2).all(|w| w[0] <= w[1]));
    // 100 is only reached by the final write tick
    assert!(reported[reported.len() - 2] < 100.0);
}

#[tokio::test]
async fn invalid_questionnaire_exports_frame_slides_only() {
    let mut source = build_source();
    source.questionnaire = "not a questionnaire at all".to_string();
    let campaign_id = source.campaign.id;

    let artifact = run_export(
        &source,
        campaign_id,
        &ExportOptions::default(),
        |_| {},
    )
    .await
    .expect("malformed schema must not abort the export");

    // Title, completion and trend slides only; no question slides, no
    // sample-responses slide
    assert_eq!(artifact.slide_count, 3);
}

#[tokio::test]
async fn frame_slides_can_be_disabled() {
    let source = build_source();
    let campaign_id = source.campaign.id;
    let options = ExportOptions {
        include_title: false,
        include_completion_rate: false,
        include_response_trends: false,
        include_text_responses: false,
        dimensions: vec![Dimension::Gender],
        ..ExportOptions::default()
    };

    let artifact = run_export(&source, campaign_id, &options, |_| {})
        .await
        .expect("export should succeed");

    // 3 chartable questions x (1 main + 1 dimension)
    assert_eq!(artifact.slide_count, 6);
}

#[tokio::test]
async fn fetch_failure_is_fatal() {
    let mut source = build_source();
    source.fail_campaign_fetch = true;
    let campaign_id = source.campaign.id;

    let mut reported = Vec::new();
    let result = run_export(
        &source,
        campaign_id,
        &ExportOptions::default(),
        |pct| reported.push(pct),
    )
    .await;

    assert!(result.is_err());
    // No file, and 100% was never reported
    assert!(reported.iter().all(|p| *p < 100.0));
}

#[tokio::test]
async fn unknown_campaign_is_not_found() {
    let source = build_source();
    let result = run_export(&source, Uuid::new_v4(), &ExportOptions::default(), |_| {}).await;
    match result {
        Err(AppError::WithContext { source, .. }) => {
            assert!(matches!(*source, AppError::NotFound(_)))
        }
        other => panic!("expected NotFound under context, got {:?}", other.is_ok()),
    }
}

#[tokio::test]
async fn instance_scope_filters_responses() {
    let mut source = build_source();
    let campaign_id = source.campaign.id;
    let instance_id = Uuid::new_v4();
    source.instances.insert(
        instance_id,
        CampaignInstance {
            id: instance_id,
            campaign_id,
            period: 2,
            start_date: None,
            end_date: None,
            status: "completed".to_string(),
            completion_rate: Some(64.0),
        },
    );
    // Rescope four responses to the instance
    for row in source.responses.iter_mut().take(4) {
        row.instance_id = Some(instance_id);
    }

    let dataset = fetch_dataset(&source, campaign_id, Some(instance_id))
        .await
        .expect("fetch should succeed");
    assert_eq!(dataset.responses.len(), 4);
    assert_eq!(dataset.instance.as_ref().map(|i| i.period), Some(2));

    // Campaign-wide fallback sees all ten submitted rows
    let dataset = fetch_dataset(&source, campaign_id, None)
        .await
        .expect("fetch should succeed");
    assert_eq!(dataset.responses.len(), 10);
}

#[tokio::test]
async fn repeated_exports_are_deterministic() {
    let source = build_source();
    let campaign_id = source.campaign.id;
    let options = options_with_dimensions(Dimension::default_set());

    let first = run_export(&source, campaign_id, &options, |_| {})
        .await
        .expect("export should succeed");
    let second = run_export(&source, campaign_id, &options, |_| {})
        .await
        .expect("export should succeed");

    assert_eq!(first.slide_count, second.slide_count);
    assert_eq!(first.file_name, second.file_name);

    // Chart data must match bit-for-bit across runs: compare the aggregate
    // statistics the slides are built from
    use survey_export_api::aggregate::{aggregate_question, answers_for};

    let dataset_a = fetch_dataset(&source, campaign_id, None).await.unwrap();
    let dataset_b = fetch_dataset(&source, campaign_id, None).await.unwrap();
    for question in dataset_a
        .schema
        .questions
        .iter()
        .filter(|q| q.question_type.is_chartable())
    {
        let stat_a = aggregate_question(question, &answers_for(&dataset_a.responses, &question.name));
        let stat_b = aggregate_question(question, &answers_for(&dataset_b.responses, &question.name));
        assert_eq!(
            serde_json::to_value(&stat_a).unwrap(),
            serde_json::to_value(&stat_b).unwrap()
        );
    }
}

#[tokio::test]
async fn non_submitted_responses_are_excluded() {
    let source = build_source();
    let campaign_id = source.campaign.id;

    let dataset = fetch_dataset(&source, campaign_id, None).await.unwrap();
    // The in-progress row is filtered out by the data source contract
    assert_eq!(dataset.responses.len(), 10);
}
