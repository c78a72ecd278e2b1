//! One end-to-end run: retrieve, export raw, classify, export classified.

use std::time::Instant;

use anyhow::{Context, Result, bail};
use cancoat_ai::{
    CoatingClassifier, OpenRouterClient, TokioPause, classify_records, skip_classification,
};
use cancoat_core::YearRange;
use cancoat_store::{BigQueryClient, ServiceAccountKey, expand_path, write_classified, write_raw};
use tracing::{debug, error, info};

use crate::config::Args;

/// Everything that must hold before the first remote call.
pub struct Preconditions {
    pub key: ServiceAccountKey,
    pub project_id: String,
    pub years: YearRange,
    /// `None` only when classification is skipped.
    pub api_key: Option<String>,
}

pub fn check_preconditions(args: &Args) -> Result<Preconditions> {
    let api_key = require_api_key(args.openrouter_api_key.as_deref(), args.skip_llm)?;

    let raw_path = args
        .credentials
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .context("GOOGLE_APPLICATION_CREDENTIALS is not set and --credentials was not given")?;
    let key_path = expand_path(raw_path);
    let key = ServiceAccountKey::load(&key_path).context("loading BigQuery credentials")?;

    let project_id = resolve_project_id(args.project_id.as_deref(), &key).context(
        "no BigQuery project: set GOOGLE_CLOUD_PROJECT or use a key file with project_id",
    )?;

    let years =
        YearRange::resolve(args.start_year, args.end_year).context("invalid year range")?;

    Ok(Preconditions {
        key,
        project_id,
        years,
        api_key,
    })
}

fn require_api_key(raw: Option<&str>, skip_llm: bool) -> Result<Option<String>> {
    if skip_llm {
        return Ok(None);
    }
    match raw.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => Ok(Some(key.to_string())),
        None => bail!("OPENROUTER_API_KEY is not set; export it or pass --skip-llm"),
    }
}

/// Explicit project id first, then the key file's own project.
fn resolve_project_id(flag: Option<&str>, key: &ServiceAccountKey) -> Option<String> {
    [flag, key.project_id.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|p| !p.is_empty())
        .map(str::to_string)
}

pub async fn run(args: &Args) -> Result<()> {
    let started = Instant::now();

    debug!(
        project_id = args.project_id.as_deref().unwrap_or("<from key file>"),
        credentials = args.credentials.as_deref().unwrap_or("<unset>"),
        start_year = args.start_year,
        end_year = args.end_year,
        limit = args.limit,
        description_word_limit = args.description_word_limit,
        model = %args.openrouter_model,
        timeout = ?args.openrouter_timeout,
        delay = ?args.openrouter_delay,
        max_retries = args.max_retries,
        api_key = if args.openrouter_api_key.is_some() { "<redacted>" } else { "<unset>" },
        skip_llm = args.skip_llm,
        era_column = args.era_column,
        "effective configuration"
    );

    let pre = check_preconditions(args).inspect_err(|e| error!("{e:#}"))?;
    info!(
        project_id = %pre.project_id,
        start_year = pre.years.start,
        end_year = pre.years.end,
        "preconditions satisfied"
    );

    let bigquery = BigQueryClient::connect(pre.project_id.clone(), &pre.key)
        .await
        .context("authenticating with BigQuery")?;
    let records = bigquery
        .fetch_patents(&args.patent_query(pre.years))
        .await
        .context("fetching patents from BigQuery")?;
    info!(count = records.len(), "fetched patents");

    write_raw(&args.output_raw, &records)
        .with_context(|| format!("writing {}", args.output_raw.display()))?;

    let classified = match pre.api_key {
        Some(api_key) => {
            let transport = OpenRouterClient::new(args.openrouter_config(api_key))
                .context("building OpenRouter client")?;
            let classifier = CoatingClassifier::new(
                Box::new(transport),
                Box::new(TokioPause),
                args.classifier_settings(),
            );
            classify_records(&classifier, records).await
        }
        None => {
            info!("skipping LLM classification");
            skip_classification(records, args.era_column)
        }
    };

    write_classified(&args.output_classified, &classified, args.era_column)
        .with_context(|| format!("writing {}", args.output_classified.display()))?;

    info!(
        raw = %args.output_raw.display(),
        classified = %args.output_classified.display(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "pipeline complete"
    );
    Ok(())
}
