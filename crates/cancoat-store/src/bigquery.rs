//! BigQuery REST client for patent retrieval.
//!
//! Runs one `jobs.query`, polls `getQueryResults` until the job completes,
//! then follows `pageToken` until every row is read. Rows arrive in
//! BigQuery's `f`/`v` cell encoding and are decoded by schema field name.

use std::collections::HashMap;

use cancoat_core::PatentRecord;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::StoreError;
use crate::credentials::{BIGQUERY_SCOPE, ServiceAccountKey};
use crate::query::{PatentQuery, QueryRequest};

pub const BIGQUERY_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

const POLL_TIMEOUT_MS: &str = "10000";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<Row>,
    page_token: Option<String>,
    total_rows: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TableSchema {
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldSchema {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Row {
    f: Vec<Cell>,
}

#[derive(Debug, Clone, Deserialize)]
struct Cell {
    #[serde(default)]
    v: Value,
}

/// Authenticated BigQuery client bound to one billing project.
pub struct BigQueryClient {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    token: String,
}

impl BigQueryClient {
    /// Authenticate with a service-account key and bind to `project_id`.
    pub async fn connect(project_id: String, key: &ServiceAccountKey) -> Result<Self, StoreError> {
        let client = reqwest::Client::new();
        let token = key.access_token(&client, BIGQUERY_SCOPE).await?;
        Ok(Self::with_token(client, BIGQUERY_BASE_URL, project_id, token))
    }

    pub fn with_token(
        client: reqwest::Client,
        base_url: &str,
        project_id: String,
        token: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            token,
        }
    }

    /// Run the patent query and return every row as a [`PatentRecord`].
    pub async fn fetch_patents(&self, query: &PatentQuery) -> Result<Vec<PatentRecord>, StoreError> {
        info!(
            project = %self.project_id,
            start_year = query.years.start,
            end_year = query.years.end,
            limit = query.limit,
            "submitting BigQuery job"
        );
        let mut resp = self.submit(&query.request()).await?;
        let job = resp
            .job_reference
            .clone()
            .ok_or_else(|| StoreError::Response("missing jobReference".into()))?;

        while !resp.job_complete {
            debug!(job_id = %job.job_id, "waiting for job completion");
            resp = self.results(&job, None).await?;
        }

        let schema = resp
            .schema
            .clone()
            .ok_or_else(|| StoreError::Response("completed job has no schema".into()))?;
        info!(total_rows = resp.total_rows.as_deref().unwrap_or("0"), "query complete");

        let mut records = decode_rows(&schema, &resp.rows)?;
        let mut page_token = resp.page_token;
        while let Some(token) = page_token {
            debug!(fetched = records.len(), "fetching next page");
            let page = self.results(&job, Some(&token)).await?;
            records.extend(decode_rows(&schema, &page.rows)?);
            page_token = page.page_token;
        }

        info!(count = records.len(), "retrieved patent records");
        Ok(records)
    }

    async fn submit(&self, body: &QueryRequest) -> Result<QueryResponse, StoreError> {
        let url = format!("{}/projects/{}/queries", self.base_url, self.project_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, StoreError> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.base_url, self.project_id, job.job_id
        );
        let mut params = vec![("timeoutMs", POLL_TIMEOUT_MS)];
        if let Some(location) = job.location.as_deref() {
            params.push(("location", location));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&params)
            .send()
            .await?;
        read_json(resp).await
    }
}

async fn read_json(resp: reqwest::Response) -> Result<QueryResponse, StoreError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(StoreError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json().await?)
}

// ── Row decoding ──

struct Columns(HashMap<String, usize>);

impl Columns {
    fn new(schema: &TableSchema) -> Self {
        Self(
            schema
                .fields
                .iter()
                .enumerate()
                .map(|(i, f)| (f.name.clone(), i))
                .collect(),
        )
    }

    fn cell<'a>(&self, row: &'a Row, name: &str) -> Option<&'a Value> {
        self.0.get(name).and_then(|&i| row.f.get(i)).map(|c| &c.v)
    }

    fn string(&self, row: &Row, name: &str) -> Option<String> {
        match self.cell(row, name)? {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn int(&self, row: &Row, name: &str) -> Result<Option<i32>, StoreError> {
        match self.string(row, name) {
            None => Ok(None),
            Some(s) => s
                .parse()
                .map(Some)
                .map_err(|_| StoreError::Response(format!("{name} is not an integer: {s}"))),
        }
    }

    /// A REPEATED STRING column: `[{"v": "..."}, ...]`.
    fn strings(&self, row: &Row, name: &str) -> Vec<String> {
        match self.cell(row, name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.get("v").and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn decode_rows(schema: &TableSchema, rows: &[Row]) -> Result<Vec<PatentRecord>, StoreError> {
    let cols = Columns::new(schema);
    if !cols.0.contains_key("publication_number") {
        return Err(StoreError::Response(
            "schema lacks publication_number".into(),
        ));
    }

    rows.iter()
        .map(|row| {
            let publication_number = cols
                .string(row, "publication_number")
                .ok_or_else(|| StoreError::Response("null publication_number".into()))?;
            Ok(PatentRecord {
                publication_number,
                publication_date: cols.string(row, "publication_date"),
                publication_year: cols.int(row, "publication_year")?,
                title: cols.string(row, "title"),
                abstract_text: cols.string(row, "abstract"),
                description: cols.string(row, "description"),
                first_claim: cols.string(row, "first_claim"),
                assignee: cols.string(row, "assignee"),
                cpc_codes: cols.strings(row, "cpc_codes"),
            })
        })
        .collect()
}
