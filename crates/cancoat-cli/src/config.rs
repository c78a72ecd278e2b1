//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use cancoat_ai::classify::{DEFAULT_MAX_RETRIES, DEFAULT_MODEL};
use cancoat_ai::transport::DEFAULT_TITLE;
use cancoat_ai::{ClassifierSettings, OpenRouterConfig};
use cancoat_core::YearRange;
use cancoat_store::PatentQuery;
use cancoat_store::query::{DEFAULT_DESCRIPTION_WORD_LIMIT, DEFAULT_LIMIT};
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// `critical` has no tracing counterpart and collapses into ERROR.
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warning => tracing::Level::WARN,
            Self::Error | Self::Critical => tracing::Level::ERROR,
        }
    }
}

/// Fetch candidate can-coating patents from BigQuery, classify their coating
/// chemistry with an LLM, and export both stages to CSV.
#[derive(Parser)]
#[command(name = "cancoat", version, about)]
pub struct Args {
    /// Billing project for BigQuery jobs [default: the key file's project_id]
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    pub project_id: Option<String>,

    /// Service-account key file; `$VAR` references and a leading `~` are expanded
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials: Option<String>,

    /// First publication year [default: current year - 3]
    #[arg(long, env = "CANCOAT_START_YEAR")]
    pub start_year: Option<i32>,

    /// Last publication year [default: current year]
    #[arg(long, env = "CANCOAT_END_YEAR")]
    pub end_year: Option<i32>,

    /// Maximum number of patents to retrieve
    #[arg(
        long,
        env = "CANCOAT_LIMIT",
        default_value_t = DEFAULT_LIMIT,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub limit: u32,

    /// Words of description kept per patent
    #[arg(
        long,
        env = "CANCOAT_DESCRIPTION_WORD_LIMIT",
        default_value_t = DEFAULT_DESCRIPTION_WORD_LIMIT
    )]
    pub description_word_limit: u32,

    #[arg(long, default_value = "data/patents_raw.csv")]
    pub output_raw: PathBuf,

    #[arg(long, default_value = "data/patents_classified.csv")]
    pub output_classified: PathBuf,

    #[arg(long, env = "OPENROUTER_MODEL", default_value = DEFAULT_MODEL)]
    pub openrouter_model: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "OPENROUTER_TIMEOUT", default_value = "30.0", value_parser = parse_seconds)]
    pub openrouter_timeout: Duration,

    /// Pause between records in seconds
    #[arg(long, env = "OPENROUTER_DELAY", default_value = "1.0", value_parser = parse_seconds)]
    pub openrouter_delay: Duration,

    /// Attempts per record before giving up
    #[arg(
        long,
        env = "OPENROUTER_MAX_RETRIES",
        default_value_t = DEFAULT_MAX_RETRIES,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_retries: u32,

    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true, hide = true)]
    pub openrouter_api_key: Option<String>,

    #[arg(long, env = "OPENROUTER_APP_URL", hide = true)]
    pub openrouter_app_url: Option<String>,

    #[arg(long, env = "OPENROUTER_TITLE", default_value = DEFAULT_TITLE, hide = true)]
    pub openrouter_title: String,

    /// Export without calling the model
    #[arg(long)]
    pub skip_llm: bool,

    /// Add an era column derived from year and coating type
    #[arg(long)]
    pub era_column: bool,

    #[arg(long, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}` is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("`{raw}` must be finite and non-negative"))
}

impl Args {
    pub fn classifier_settings(&self) -> ClassifierSettings {
        ClassifierSettings {
            model: self.openrouter_model.clone(),
            max_retries: self.max_retries,
            delay: self.openrouter_delay,
            include_era: self.era_column,
        }
    }

    pub fn openrouter_config(&self, api_key: String) -> OpenRouterConfig {
        let mut config = OpenRouterConfig::new(api_key, self.openrouter_timeout);
        config.app_url = self
            .openrouter_app_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        config.title = self.openrouter_title.clone();
        config
    }

    pub fn patent_query(&self, years: YearRange) -> PatentQuery {
        PatentQuery {
            limit: self.limit,
            years,
            description_word_limit: self.description_word_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("cancoat").chain(args.iter().copied()))
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&[
            "--start-year",
            "2010",
            "--end-year",
            "2012",
            "--limit",
            "5",
            "--max-retries",
            "4",
            "--openrouter-delay",
            "0",
            "--openrouter-timeout",
            "2.5",
            "--output-raw",
            "out/raw.csv",
            "--skip-llm",
            "--era-column",
            "--log-level",
            "critical",
        ])
        .unwrap();

        assert_eq!(args.start_year, Some(2010));
        assert_eq!(args.end_year, Some(2012));
        assert_eq!(args.limit, 5);
        assert_eq!(args.max_retries, 4);
        assert_eq!(args.openrouter_delay, Duration::ZERO);
        assert_eq!(args.openrouter_timeout, Duration::from_millis(2500));
        assert_eq!(args.output_raw, PathBuf::from("out/raw.csv"));
        assert!(args.skip_llm);
        assert!(args.era_column);
        assert_eq!(args.log_level, LogLevel::Critical);

        let settings = args.classifier_settings();
        assert_eq!(settings.max_retries, 4);
        assert!(settings.include_era);
    }

    #[test]
    fn zero_retries_rejected() {
        assert!(parse(&["--max-retries", "0"]).is_err());
    }

    #[test]
    fn negative_delay_rejected() {
        assert!(parse(&["--openrouter-delay", "-1"]).is_err());
        assert!(parse(&["--openrouter-delay", "soon"]).is_err());
    }

    #[test]
    fn unknown_log_level_rejected() {
        assert!(parse(&["--log-level", "verbose"]).is_err());
    }

    #[test]
    fn log_level_is_case_insensitive() {
        assert_eq!(parse(&["--log-level", "DEBUG"]).unwrap().log_level, LogLevel::Debug);
        assert_eq!(parse(&["--log-level", "Warning"]).unwrap().log_level, LogLevel::Warning);
    }

    #[test]
    fn log_levels_map_onto_tracing() {
        assert_eq!(LogLevel::Debug.as_tracing(), tracing::Level::DEBUG);
        assert_eq!(LogLevel::Warning.as_tracing(), tracing::Level::WARN);
        assert_eq!(LogLevel::Critical.as_tracing(), tracing::Level::ERROR);
    }

    #[test]
    fn blank_app_url_omitted() {
        let mut args = parse(&[]).unwrap();
        args.openrouter_app_url = Some("  ".into());
        assert_eq!(args.openrouter_config("k".into()).app_url, None);

        args.openrouter_app_url = Some("https://example.org".into());
        let config = args.openrouter_config("k".into());
        assert_eq!(config.app_url.as_deref(), Some("https://example.org"));
        assert_eq!(config.timeout, args.openrouter_timeout);
    }

    #[test]
    fn query_carries_limits() {
        let args = parse(&["--limit", "7", "--description-word-limit", "50"]).unwrap();
        let years = YearRange::new(2020, 2021, 2024).unwrap();
        let q = args.patent_query(years);
        assert_eq!(q.limit, 7);
        assert_eq!(q.description_word_limit, 50);
        assert_eq!(q.years, years);
    }
}
