//! Export orchestrator.
//!
//! Sequences the pipeline: fetch -> process -> frame slides -> per-question
//! and per-dimension slides -> document write, reporting monotonic progress
//! after each unit of work. Fetch failures abort the export; per-question
//! failures become placeholder slides and the export continues.

use regex::Regex;
use uuid::Uuid;

use crate::config::Config;
use crate::deck::{Deck, Theme};
use crate::errors::{AppError, ResultExt};
use crate::fetcher::ResponseDataSource;
use crate::models::{Campaign, CampaignInstance, Dimension, ExportRequest, ProcessedResponse};
use crate::processor::process_responses;
use crate::schema::{parse_questionnaire, Question, SurveySchema};
use crate::slides;

/// Progress weighting: fetch, frame slides (title/completion/trend) and the
/// per-question units. Pre-write progress is capped below 100; exactly 100
/// is emitted once, after the document write completes.
const FETCH_WEIGHT: f64 = 10.0;
const FRAME_WEIGHT: f64 = 20.0;
const QUESTION_WEIGHT: f64 = 70.0;
const PRE_WRITE_CAP: f64 = 99.0;

/// Export pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    Fetching,
    BuildingTitle,
    BuildingCompletion,
    BuildingTrend,
    BuildingQuestions,
    Writing,
    Done,
}

impl std::fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportPhase::Fetching => "fetching",
            ExportPhase::BuildingTitle => "building(title)",
            ExportPhase::BuildingCompletion => "building(completion)",
            ExportPhase::BuildingTrend => "building(trend)",
            ExportPhase::BuildingQuestions => "building(questions)",
            ExportPhase::Writing => "writing",
            ExportPhase::Done => "done",
        };
        write!(f, "{}", name)
    }
}

fn transition(phase: ExportPhase) {
    tracing::info!("Export phase: {}", phase);
}

/// Resolved export options: request options merged with config defaults.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub instance_id: Option<Uuid>,
    pub dimensions: Vec<Dimension>,
    pub include_title: bool,
    pub include_completion_rate: bool,
    pub include_response_trends: bool,
    pub include_text_responses: bool,
    pub file_name: Option<String>,
    pub company: String,
    pub author: String,
    pub theme: Theme,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            instance_id: None,
            dimensions: Dimension::default_set(),
            include_title: true,
            include_completion_rate: true,
            include_response_trends: true,
            include_text_responses: true,
            file_name: None,
            company: "Pulse Feedback".to_string(),
            author: "Survey Export Service".to_string(),
            theme: Theme::default(),
        }
    }
}

impl ExportOptions {
    /// Merges an API request with the service configuration defaults.
    pub fn from_request(request: ExportRequest, config: &Config) -> Self {
        Self {
            instance_id: request.instance_id,
            dimensions: request.dimensions.unwrap_or_else(Dimension::default_set),
            include_title: request.include_title,
            include_completion_rate: request.include_completion_rate,
            include_response_trends: request.include_response_trends,
            include_text_responses: request.include_text_responses,
            file_name: request.file_name,
            company: request.company.unwrap_or_else(|| config.company_name.clone()),
            author: request.author.unwrap_or_else(|| config.report_author.clone()),
            theme: Theme::with_overrides(request.theme.as_ref()),
        }
    }
}

/// The finished export: deck bytes plus the filename to serve them under.
pub struct ExportArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub slide_count: usize,
}

/// Everything the pipeline consumes, fetched and joined.
///
/// Shared by the deck export and the JSON aggregate-summary path so the two
/// never diverge in scope or eligibility rules.
pub struct Dataset {
    pub campaign: Campaign,
    pub instance: Option<CampaignInstance>,
    pub schema: SurveySchema,
    pub responses: Vec<ProcessedResponse>,
}

/// Fetches and processes the full dataset for one campaign scope.
///
/// Any failure here is fatal for the caller's export; there is no partial
/// dataset.
pub async fn fetch_dataset<D: ResponseDataSource>(
    source: &D,
    campaign_id: Uuid,
    instance_id: Option<Uuid>,
) -> Result<Dataset, AppError> {
    let campaign = source
        .fetch_campaign(campaign_id)
        .await
        .context("fetching campaign metadata")?;
    let instance = match instance_id {
        Some(instance_id) => Some(
            source
                .fetch_instance(instance_id)
                .await
                .context("fetching instance metadata")?,
        ),
        None => None,
    };

    let questionnaire = source.fetch_questionnaire(campaign.survey_id).await?;
    let schema = parse_questionnaire(&questionnaire);

    let rows = source
        .fetch_submitted_responses(campaign_id, instance_id)
        .await
        .context("fetching responses")?;

    let mut user_ids: Vec<Uuid> = rows.iter().filter_map(|r| r.user_id).collect();
    user_ids.sort_unstable();
    user_ids.dedup();

    let (profiles, business_units, supervisors) = if campaign.is_anonymous || user_ids.is_empty() {
        Default::default()
    } else {
        (
            source.fetch_profiles(&user_ids).await?,
            source.fetch_primary_business_units(&user_ids).await?,
            source.fetch_primary_supervisors(&user_ids).await?,
        )
    };

    let responses =
        process_responses(&rows, &schema.questions, &profiles, &business_units, &supervisors);
    tracing::info!(
        "Fetched campaign '{}': {} questions, {} submitted responses",
        campaign.name,
        schema.questions.len(),
        responses.len()
    );

    Ok(Dataset {
        campaign,
        instance,
        schema,
        responses,
    })
}

/// Monotonic progress reporter. Values only move forward; regressions are
/// clamped to the last reported value.
struct ProgressTracker<F: FnMut(f64)> {
    callback: F,
    last: f64,
}

impl<F: FnMut(f64)> ProgressTracker<F> {
    fn new(callback: F) -> Self {
        Self {
            callback,
            last: 0.0,
        }
    }

    fn report(&mut self, pct: f64) {
        let pct = pct.clamp(0.0, 100.0);
        if pct > self.last {
            self.last = pct;
        }
        (self.callback)(self.last);
    }
}

/// Runs a full export against a data source.
///
/// Slide order is deterministic: frame slides, then questions in schema
/// order, each followed by its dimension comparisons in option order. The
/// deck is exclusively owned here; slide builders only ever receive a
/// mutable borrow.
pub async fn run_export<D: ResponseDataSource>(
    source: &D,
    campaign_id: Uuid,
    options: &ExportOptions,
    on_progress: impl FnMut(f64),
) -> Result<ExportArtifact, AppError> {
    let mut progress = ProgressTracker::new(on_progress);

    transition(ExportPhase::Fetching);
    let Dataset {
        campaign,
        instance,
        schema,
        responses,
    } = fetch_dataset(source, campaign_id, options.instance_id).await?;
    progress.report(FETCH_WEIGHT);

    let chartable: Vec<&Question> = schema
        .questions
        .iter()
        .filter(|q| q.question_type.is_chartable())
        .collect();
    let question_units = chartable.len() * (1 + options.dimensions.len());

    let mut deck = Deck::new(options.theme);

    // Frame slides. Excluded slides still complete their progress unit so
    // the weighting stays stable across option combinations.
    let frame_step = FRAME_WEIGHT / 3.0;

    transition(ExportPhase::BuildingTitle);
    if options.include_title {
        slides::build_title_slide(
            &mut deck,
            &campaign,
            instance.as_ref(),
            &options.company,
            &options.author,
        )?;
    }
    progress.report(FETCH_WEIGHT + frame_step);

    transition(ExportPhase::BuildingCompletion);
    if options.include_completion_rate {
        slides::build_completion_slide(&mut deck, &campaign, instance.as_ref())?;
    }
    progress.report(FETCH_WEIGHT + 2.0 * frame_step);

    transition(ExportPhase::BuildingTrend);
    if options.include_response_trends {
        slides::build_trend_slide(&mut deck, &responses)?;
    }
    progress.report(FETCH_WEIGHT + FRAME_WEIGHT);

    transition(ExportPhase::BuildingQuestions);
    let mut completed_units = 0usize;
    for question in &chartable {
        completed_units += 1;
        if let Err(e) = slides::build_question_slide(&mut deck, question, &responses) {
            tracing::warn!(
                "Failed to build slide for question '{}', adding placeholder: {}",
                question.name,
                e
            );
            deck.add_placeholder_slide(&question.title)?;
        }
        progress.report(question_progress(completed_units, question_units));

        for dimension in &options.dimensions {
            completed_units += 1;
            if let Err(e) = slides::build_dimension_slide(&mut deck, question, &responses, *dimension)
            {
                tracing::warn!(
                    "Failed to build {} comparison for question '{}', adding placeholder: {}",
                    dimension.label(),
                    question.name,
                    e
                );
                deck.add_placeholder_slide(&format!(
                    "{} by {}",
                    question.title,
                    dimension.label()
                ))?;
            }
            progress.report(question_progress(completed_units, question_units));
        }
    }

    if options.include_text_responses {
        if let Err(e) = slides::build_text_samples_slide(&mut deck, &schema.questions, &responses) {
            tracing::warn!("Failed to build sample-responses slide, skipping: {}", e);
        }
    }

    transition(ExportPhase::Writing);
    let slide_count = deck.slide_count();
    let bytes = deck.save_to_buffer().context("writing deck document")?;
    let file_name = resolve_file_name(options.file_name.as_deref(), &campaign.name);
    progress.report(100.0);

    transition(ExportPhase::Done);
    tracing::info!(
        "Export complete: {} slides, {} bytes, file '{}'",
        slide_count,
        bytes.len(),
        file_name
    );

    Ok(ExportArtifact {
        file_name,
        bytes,
        slide_count,
    })
}

fn question_progress(completed_units: usize, total_units: usize) -> f64 {
    if total_units == 0 {
        return FETCH_WEIGHT + FRAME_WEIGHT;
    }
    let pct = FETCH_WEIGHT
        + FRAME_WEIGHT
        + QUESTION_WEIGHT * completed_units as f64 / total_units as f64;
    pct.min(PRE_WRITE_CAP)
}

/// Strips non-alphanumeric runs from a campaign name for use in filenames.
pub fn sanitize_campaign_name(name: &str) -> String {
    let re = Regex::new(r"[^A-Za-z0-9]+").unwrap();
    let sanitized = re.replace_all(name, "_");
    let trimmed = sanitized.trim_matches('_');
    if trimmed.is_empty() {
        "campaign".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Resolves the output filename: an explicit override wins (extension
/// appended when missing), else `<sanitized-campaign-name>_presentation.xlsx`.
pub fn resolve_file_name(override_name: Option<&str>, campaign_name: &str) -> String {
    match override_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) if name.ends_with(".xlsx") => name.to_string(),
        Some(name) => format!("{}.xlsx", name),
        None => format!("{}_presentation.xlsx", sanitize_campaign_name(campaign_name)),
    }
}
