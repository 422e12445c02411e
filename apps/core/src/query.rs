use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::config::Config;
use crate::model::PackageRow;

const SEARCH_PATH: &str = "fcomm_connector/xapian/query/search_packages";

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("package search request failed: {message}")]
    Http { message: String },
    #[error("malformed package search response: {message}")]
    Malformed { message: String },
    #[error("invalid package search url '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// Remote package-search backend.
pub trait PackageSource: Send + Sync {
    fn source_name(&self) -> &'static str;
    fn search(&self, term: &str) -> Result<Vec<PackageRow>, QueryError>;
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SearchResponse {
    rows: Vec<RawRow>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawRow {
    name: Option<String>,
    icon: Option<String>,
}

/// Queries the packages web app's search connector over HTTP(S).
pub struct HttpPackageSource {
    agent: ureq::Agent,
    base_url: String,
    rows_per_page: u16,
}

impl HttpPackageSource {
    pub fn new(base_url: &str, rows_per_page: u16, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            rows_per_page,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            &cfg.api_base_url,
            cfg.rows_per_page,
            Duration::from_secs(cfg.http_timeout_secs),
        )
    }

    /// The connector takes its query as one JSON document in the last path
    /// segment.
    pub fn search_url(&self, term: &str) -> Result<Url, QueryError> {
        let invalid = |message: String| QueryError::InvalidUrl {
            url: self.base_url.clone(),
            message,
        };
        let query = serde_json::json!({
            "filters": { "search": term },
            "rows_per_page": self.rows_per_page,
            "start_row": 0,
        });

        let mut url = Url::parse(&self.base_url).map_err(|err| invalid(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(SEARCH_PATH.split('/'))
            .push(&query.to_string());
        Ok(url)
    }
}

impl PackageSource for HttpPackageSource {
    fn source_name(&self) -> &'static str {
        "fedora-packages"
    }

    fn search(&self, term: &str) -> Result<Vec<PackageRow>, QueryError> {
        let url = self.search_url(term)?;
        let response = self.agent.get(url.as_str()).call().map_err(|err| {
            let message = match err {
                ureq::Error::Status(code, _response) => format!("server returned status {code}"),
                ureq::Error::Transport(transport) => format!("transport error: {transport}"),
            };
            QueryError::Http { message }
        })?;

        let body = response.into_string().map_err(|err| QueryError::Http {
            message: format!("failed to read response body: {err}"),
        })?;
        parse_rows(&body)
    }
}

/// Extracts rows from a search payload. A missing `rows` field is an empty
/// result; rows without a name are skipped and a missing icon becomes an
/// empty token.
pub fn parse_rows(body: &str) -> Result<Vec<PackageRow>, QueryError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|err| QueryError::Malformed {
            message: err.to_string(),
        })?;

    let rows = response
        .rows
        .into_iter()
        .filter_map(|raw| {
            let name = strip_markup(raw.name.as_deref()?);
            if name.is_empty() || name.contains(':') {
                log::debug!("skipping package row with unusable name '{name}'");
                return None;
            }
            let icon = raw.icon.as_deref().map(strip_markup).unwrap_or_default();
            Some(PackageRow {
                name,
                icon_token: icon,
            })
        })
        .collect();
    Ok(rows)
}

/// The search connector wraps matched substrings in highlight tags.
fn strip_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}
