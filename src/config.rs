use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub company_name: String,
    pub report_author: String,
    pub export_dir: Option<String>, // Optional; server path streams decks when unset
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            company_name: std::env::var("COMPANY_NAME")
                .unwrap_or_else(|_| "Pulse Feedback".to_string()),
            report_author: std::env::var("REPORT_AUTHOR")
                .unwrap_or_else(|_| "Survey Export Service".to_string()),
            export_dir: std::env::var("EXPORT_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Company name: {}", config.company_name);
        if let Some(ref dir) = config.export_dir {
            tracing::info!("Export directory configured: {}", dir);
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
