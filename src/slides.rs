//! Slide builders: map aggregate statistics and question metadata onto
//! deck slides. Every builder appends to the orchestrator-owned `Deck`.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::aggregate::{
    aggregate_question, aggregate_question_by_dimension, answers_for, QuestionStat,
};
use crate::deck::{ChartKind, Deck};
use crate::errors::AppError;
use crate::models::{Campaign, CampaignInstance, Dimension, ProcessedResponse};
use crate::schema::{Question, QuestionType};

/// Sample-responses slide caps, bounding slide size.
const TEXT_QUESTION_CAP: usize = 2;
const TEXT_RESPONSE_CAP: usize = 5;
const TEXT_EXCERPT_CHARS: usize = 160;

/// Title slide: campaign name, period subtitle, campaign metadata.
pub fn build_title_slide(
    deck: &mut Deck,
    campaign: &Campaign,
    instance: Option<&CampaignInstance>,
    company: &str,
    author: &str,
) -> Result<(), AppError> {
    let subtitle = match instance {
        Some(instance) => format!("Period {}", instance.period),
        None => "All periods".to_string(),
    };

    let mut lines = Vec::new();
    if let Some(description) = campaign.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(description.to_string());
    }
    if let (Some(start), Some(end)) = (campaign.start_date, campaign.end_date) {
        lines.push(format!(
            "{} to {}",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        ));
    }
    lines.push(company.to_string());
    lines.push(format!("Prepared by {}", author));

    deck.add_title_slide(&campaign.name, &subtitle, &lines)
}

/// Completion-rate slide: doughnut of completed vs remaining.
pub fn build_completion_slide(
    deck: &mut Deck,
    campaign: &Campaign,
    instance: Option<&CampaignInstance>,
) -> Result<(), AppError> {
    let rate = instance
        .and_then(|i| i.completion_rate)
        .or(campaign.completion_rate)
        .unwrap_or(0.0)
        .clamp(0.0, 100.0);

    deck.add_chart_slide(
        "Completion Rate",
        ChartKind::Doughnut,
        &["Completed".to_string(), "Remaining".to_string()],
        &[rate, 100.0 - rate],
        &format!("{:.0}% of invited respondents submitted", rate),
    )
}

/// Response-trend slide: submissions per day as a column chart.
pub fn build_trend_slide(
    deck: &mut Deck,
    responses: &[ProcessedResponse],
) -> Result<(), AppError> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for response in responses {
        *per_day.entry(response.submitted_at.date_naive()).or_default() += 1;
    }

    let categories: Vec<String> = per_day.keys().map(|d| d.format("%Y-%m-%d").to_string()).collect();
    let counts: Vec<f64> = per_day.values().map(|c| *c as f64).collect();
    let caption = format!("{} submissions across {} days", responses.len(), per_day.len());

    deck.add_column_slide(
        "Response Trend",
        &categories,
        &[("Responses".to_string(), counts)],
        &caption,
    )
}

/// Main chart slide for one question.
pub fn build_question_slide(
    deck: &mut Deck,
    question: &Question,
    responses: &[ProcessedResponse],
) -> Result<(), AppError> {
    let answers = answers_for(responses, &question.name);
    let Some(stat) = aggregate_question(question, &answers) else {
        return Ok(());
    };

    let (labels, values, caption) = describe_stat(&stat);
    deck.add_chart_slide(&question.title, ChartKind::Pie, &labels, &values, &caption)
}

/// Dimension-comparison slide for one question: clustered columns with one
/// series per outcome category and one tick per group label.
pub fn build_dimension_slide(
    deck: &mut Deck,
    question: &Question,
    responses: &[ProcessedResponse],
    dimension: Dimension,
) -> Result<(), AppError> {
    let Some(groups) = aggregate_question_by_dimension(question, responses, dimension) else {
        return Ok(());
    };

    let categories: Vec<String> = groups.keys().cloned().collect();
    let series = grouped_series(question, &groups);
    let title = format!("{} by {}", question.title, dimension.label());
    let caption = format!("Compared across {} {} groups", groups.len(), dimension.label());

    deck.add_column_slide(&title, &categories, &series, &caption)
}

/// Sample text-responses slide, capped to a small number of excerpts.
///
/// Returns whether a slide was added (no text questions or no text answers
/// means no slide).
pub fn build_text_samples_slide(
    deck: &mut Deck,
    questions: &[Question],
    responses: &[ProcessedResponse],
) -> Result<bool, AppError> {
    let mut lines = Vec::new();

    for question in questions
        .iter()
        .filter(|q| q.question_type.is_text())
        .take(TEXT_QUESTION_CAP)
    {
        let mut excerpts = Vec::new();
        for response in responses {
            if excerpts.len() >= TEXT_RESPONSE_CAP {
                break;
            }
            let Some(answer) = response.answers.get(&question.name) else {
                continue;
            };
            let Some(text) = answer.value.as_str() else {
                continue;
            };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            excerpts.push(format!("- {}", truncate_excerpt(text)));
        }

        if !excerpts.is_empty() {
            lines.push(question.title.clone());
            lines.append(&mut excerpts);
            lines.push(String::new());
        }
    }

    if lines.is_empty() {
        return Ok(false);
    }

    deck.add_text_slide("Sample Responses", &lines)?;
    Ok(true)
}

fn truncate_excerpt(text: &str) -> String {
    if text.chars().count() <= TEXT_EXCERPT_CHARS {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(TEXT_EXCERPT_CHARS).collect();
        format!("{}...", truncated.trim_end())
    }
}

/// Labels, values and caption text for a scalar statistic.
fn describe_stat(stat: &QuestionStat) -> (Vec<String>, Vec<f64>, String) {
    match stat {
        QuestionStat::Boolean(b) => (
            vec!["Yes".to_string(), "No".to_string()],
            vec![b.yes as f64, b.no as f64],
            format!(
                "{} responses - {} yes ({:.0}%), {} no ({:.0}%)",
                b.total(),
                b.yes,
                b.yes_pct(),
                b.no,
                b.no_pct()
            ),
        ),
        QuestionStat::Nps(n) => (
            vec![
                "Detractors".to_string(),
                "Passives".to_string(),
                "Promoters".to_string(),
            ],
            vec![n.detractors as f64, n.passives as f64, n.promoters as f64],
            format!(
                "NPS score {:.0}, average {:.1} across {} responses",
                n.score, n.average, n.total
            ),
        ),
        QuestionStat::Satisfaction(s) => (
            vec![
                "Unsatisfied".to_string(),
                "Neutral".to_string(),
                "Satisfied".to_string(),
            ],
            vec![s.unsatisfied as f64, s.neutral as f64, s.satisfied as f64],
            format!(
                "Median {:.1}, {:.0}% satisfied across {} responses",
                s.median, s.rate, s.total
            ),
        ),
    }
}

/// Outcome-category series for a grouped statistic, aligned with the
/// ordered group labels.
fn grouped_series(
    question: &Question,
    groups: &BTreeMap<String, QuestionStat>,
) -> Vec<(String, Vec<f64>)> {
    if question.question_type == QuestionType::Boolean {
        vec![
            (
                "Yes".to_string(),
                groups
                    .values()
                    .map(|s| match s {
                        QuestionStat::Boolean(b) => b.yes as f64,
                        _ => 0.0,
                    })
                    .collect(),
            ),
            (
                "No".to_string(),
                groups
                    .values()
                    .map(|s| match s {
                        QuestionStat::Boolean(b) => b.no as f64,
                        _ => 0.0,
                    })
                    .collect(),
            ),
        ]
    } else if question.is_nps() {
        vec![
            (
                "Detractors".to_string(),
                groups
                    .values()
                    .map(|s| match s {
                        QuestionStat::Nps(n) => n.detractors as f64,
                        _ => 0.0,
                    })
                    .collect(),
            ),
            (
                "Passives".to_string(),
                groups
                    .values()
                    .map(|s| match s {
                        QuestionStat::Nps(n) => n.passives as f64,
                        _ => 0.0,
                    })
                    .collect(),
            ),
            (
                "Promoters".to_string(),
                groups
                    .values()
                    .map(|s| match s {
                        QuestionStat::Nps(n) => n.promoters as f64,
                        _ => 0.0,
                    })
                    .collect(),
            ),
        ]
    } else {
        vec![
            (
                "Unsatisfied".to_string(),
                groups
                    .values()
                    .map(|s| match s {
                        QuestionStat::Satisfaction(sat) => sat.unsatisfied as f64,
                        _ => 0.0,
                    })
                    .collect(),
            ),
            (
                "Neutral".to_string(),
                groups
                    .values()
                    .map(|s| match s {
                        QuestionStat::Satisfaction(sat) => sat.neutral as f64,
                        _ => 0.0,
                    })
                    .collect(),
            ),
            (
                "Satisfied".to_string(),
                groups
                    .values()
                    .map(|s| match s {
                        QuestionStat::Satisfaction(sat) => sat.satisfied as f64,
                        _ => 0.0,
                    })
                    .collect(),
            ),
        ]
    }
}
