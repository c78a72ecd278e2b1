//! Parameterised GoogleSQL for candidate can-coating patents.

use cancoat_core::YearRange;
use cancoat_core::filters::{CPC_PREFIXES, KEYWORD_PHRASES, cpc_condition, keyword_pattern};
use serde::Serialize;

pub const PATENTS_TABLE: &str = "patents-public-data.patents.publications";
pub const DEFAULT_LIMIT: u32 = 100;
pub const DEFAULT_DESCRIPTION_WORD_LIMIT: u32 = 800;

/// Server-side wait per `jobs.query` / `getQueryResults` call.
const QUERY_TIMEOUT_MS: u64 = 30_000;

/// What to fetch: at most `limit` US publications in `years`, with the
/// description cut to its first `description_word_limit` words.
#[derive(Debug, Clone, Copy)]
pub struct PatentQuery {
    pub limit: u32,
    pub years: YearRange,
    pub description_word_limit: u32,
}

/// One named query parameter in BigQuery's REST encoding.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameter {
    pub name: &'static str,
    pub parameter_type: ParameterType,
    pub parameter_value: ParameterValue,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParameterType {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParameterValue {
    pub value: String,
}

impl QueryParameter {
    fn int64(name: &'static str, value: i64) -> Self {
        Self {
            name,
            parameter_type: ParameterType { kind: "INT64" },
            parameter_value: ParameterValue {
                value: value.to_string(),
            },
        }
    }

    fn string(name: &'static str, value: String) -> Self {
        Self {
            name,
            parameter_type: ParameterType { kind: "STRING" },
            parameter_value: ParameterValue { value },
        }
    }
}

/// Body of a `jobs.query` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub use_legacy_sql: bool,
    pub parameter_mode: &'static str,
    pub query_parameters: Vec<QueryParameter>,
    pub timeout_ms: u64,
}

impl PatentQuery {
    pub fn sql(&self) -> String {
        let cpc = cpc_condition(CPC_PREFIXES);
        let limit = self.limit;
        format!(
            "WITH base AS (
  SELECT
    publication_number,
    SAFE.PARSE_DATE('%Y%m%d', CAST(publication_date AS STRING)) AS publication_date,
    {title},
    {abstract_text},
    {description},
    {first_claim},
    (
      SELECT ARRAY_AGG(DISTINCT REPLACE(c.code, ' ', '') ORDER BY REPLACE(c.code, ' ', ''))
      FROM UNNEST(cpc) AS c
      WHERE c.code IS NOT NULL
    ) AS cpc_codes,
    (
      SELECT STRING_AGG(DISTINCT a.name, '; ' ORDER BY a.name)
      FROM UNNEST(assignee_harmonized) AS a
      WHERE a.name IS NOT NULL
    ) AS assignee_orgs
  FROM `{PATENTS_TABLE}`
  WHERE
    publication_date BETWEEN @start_date AND @end_date
    AND country_code = 'US'
    AND EXISTS (SELECT 1 FROM UNNEST(cpc) AS c WHERE {cpc})
)
SELECT
  publication_number,
  FORMAT_DATE('%Y-%m-%d', publication_date) AS publication_date,
  EXTRACT(YEAR FROM publication_date) AS publication_year,
  title_en AS title,
  abstract_en AS abstract,
  assignee_orgs AS assignee,
  cpc_codes,
  CASE
    WHEN description_en IS NULL THEN NULL
    ELSE ARRAY_TO_STRING(ARRAY(
      SELECT word
      FROM UNNEST(SPLIT(description_en, ' ')) AS word WITH OFFSET AS pos
      WHERE pos < @description_word_limit
      ORDER BY pos
    ), ' ')
  END AS description,
  first_claim_en AS first_claim
FROM base
WHERE
  (title_en IS NOT NULL AND REGEXP_CONTAINS(LOWER(title_en), @keyword_pattern))
  OR (abstract_en IS NOT NULL AND REGEXP_CONTAINS(LOWER(abstract_en), @keyword_pattern))
  OR (description_en IS NOT NULL AND REGEXP_CONTAINS(LOWER(description_en), @keyword_pattern))
ORDER BY publication_date DESC
LIMIT {limit}",
            title = english_first("title_localized", "title_en"),
            abstract_text = english_first("abstract_localized", "abstract_en"),
            description = english_first("description_localized", "description_en"),
            first_claim = english_first("claims_localized", "first_claim_en"),
        )
    }

    pub fn parameters(&self) -> Vec<QueryParameter> {
        vec![
            QueryParameter::int64("start_date", self.years.start_date()),
            QueryParameter::int64("end_date", self.years.end_date()),
            QueryParameter::string("keyword_pattern", keyword_pattern(KEYWORD_PHRASES)),
            QueryParameter::int64(
                "description_word_limit",
                i64::from(self.description_word_limit),
            ),
        ]
    }

    pub fn request(&self) -> QueryRequest {
        QueryRequest {
            query: self.sql(),
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters: self.parameters(),
            timeout_ms: QUERY_TIMEOUT_MS,
        }
    }
}

/// English text from a localized array, else the first entry of any language.
fn english_first(column: &str, alias: &str) -> String {
    format!(
        "COALESCE(
      (SELECT x.text FROM UNNEST({column}) AS x WHERE x.language = 'en' LIMIT 1),
      (SELECT x.text FROM UNNEST({column}) AS x LIMIT 1)
    ) AS {alias}"
    )
}
