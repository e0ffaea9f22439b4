use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Value bound to the report's `createdBy` parameter.
    pub created_by: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub report: ReportConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok();
        let report = ReportConfig {
            created_by: std::env::var("REPORT_CREATED_BY")
                .unwrap_or_else(|_| "User Directory".into()),
        };
        Ok(Self {
            database_url,
            report,
        })
    }
}
