use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub api_token: Option<String>,
    pub course_section_id: String,
    pub log_dir: PathBuf,
}

#[cfg(feature = "cli")]
#[derive(Debug, clap::Parser)]
#[command(name = "gradebook_grid", about = "Edit grades for one course section")]
pub struct Args {
    /// Course section to open (overrides COURSE_SECTION_ID)
    #[arg(long)]
    pub section: Option<String>,

    /// Backend root URL (overrides SIS_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let base_url = env::var("SIS_BASE_URL").unwrap_or_default();
        let course_section_id = env::var("COURSE_SECTION_ID").unwrap_or_default();

        let config = Self::from_parts(
            base_url,
            env::var("SIS_API_TOKEN").ok(),
            course_section_id,
            env::var("GRADEBOOK_LOG_DIR").ok(),
        );

        #[cfg(feature = "cli")]
        let config = {
            use clap::Parser;
            config.with_args(Args::parse())
        };

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn from_parts(
        base_url: String,
        api_token: Option<String>,
        course_section_id: String,
        log_dir: Option<String>,
    ) -> Self {
        Self {
            base_url: normalize_base_url(&base_url),
            api_token: api_token.filter(|t| !t.trim().is_empty()),
            course_section_id: course_section_id.trim().to_string(),
            log_dir: log_dir
                .filter(|d| !d.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    #[cfg(feature = "cli")]
    fn with_args(mut self, args: Args) -> Self {
        if let Some(section) = args.section {
            self.course_section_id = section.trim().to_string();
        }
        if let Some(base_url) = args.base_url {
            self.base_url = normalize_base_url(&base_url);
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("SIS_BASE_URL not found. Please set it in .env file or environment");
        }
        if self.course_section_id.is_empty() {
            anyhow::bail!("No course section given. Set COURSE_SECTION_ID or pass --section");
        }
        Ok(())
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
