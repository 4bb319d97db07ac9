//! CLI export path: runs the full pipeline for one campaign and writes
//! `<sanitized-campaign-name>_presentation.xlsx` to disk (or to EXPORT_DIR
//! when configured), printing progress as it goes.

use anyhow::Context;
use dotenvy::dotenv;
use moka::future::Cache;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::path::PathBuf;
use uuid::Uuid;

use survey_export_api::config::Config;
use survey_export_api::export::{run_export, ExportOptions};
use survey_export_api::fetcher::PgDataSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let campaign_id: Uuid = args
        .next()
        .context("usage: export_campaign <campaign-id> [instance-id]")?
        .parse()
        .context("campaign-id must be a UUID")?;
    let instance_id: Option<Uuid> = match args.next() {
        Some(raw) => Some(raw.parse().context("instance-id must be a UUID")?),
        None => None,
    };

    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let questionnaire_cache = Cache::builder().max_capacity(16).build();
    let source = PgDataSource::new(pool, questionnaire_cache);

    let options = ExportOptions {
        instance_id,
        company: config.company_name.clone(),
        author: config.report_author.clone(),
        ..ExportOptions::default()
    };

    println!("Exporting campaign {}...", campaign_id);
    let mut last_printed = -5.0_f64;
    let artifact = run_export(&source, campaign_id, &options, |pct| {
        // Print every 5 points; the callback fires once per slide
        if pct - last_printed >= 5.0 || pct >= 100.0 {
            println!("  {:>5.1}%", pct);
            last_printed = pct;
        }
    })
    .await
    .map_err(|e| anyhow::anyhow!("export failed: {}", e))?;

    let output_path = match config.export_dir {
        Some(dir) => PathBuf::from(dir).join(&artifact.file_name),
        None => PathBuf::from(&artifact.file_name),
    };
    std::fs::write(&output_path, &artifact.bytes)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    println!(
        "Wrote {} ({} slides, {} bytes).",
        output_path.display(),
        artifact.slide_count,
        artifact.bytes.len()
    );
    Ok(())
}
