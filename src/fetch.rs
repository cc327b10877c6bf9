use crate::config::SourcesConfig;
use crate::types::{RegionStat, RegionTestStat};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, info};

/// Any failure while loading the two datasets. Callers treat every variant alike.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("malformed payload from {url}")]
    Payload {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Both datasets from one load, already filtered.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub stats: Vec<RegionStat>,
    pub tests: Vec<RegionTestStat>,
}

#[derive(Deserialize)]
struct StatewiseResponse {
    statewise: Vec<StatewiseRecord>,
}

#[derive(Deserialize)]
struct StatewiseRecord {
    statecode: String,
    state: String,
    #[serde(default, deserialize_with = "de_count")]
    active: Option<u64>,
    #[serde(default, deserialize_with = "de_count")]
    confirmed: Option<u64>,
    #[serde(default, deserialize_with = "de_count")]
    deaths: Option<u64>,
    #[serde(default, deserialize_with = "de_count")]
    recovered: Option<u64>,
}

#[derive(Deserialize)]
struct StateTestResponse {
    states_tested_data: Vec<StateTestRecord>,
}

#[derive(Deserialize)]
struct StateTestRecord {
    state: String,
    #[serde(default)]
    totaltested: Option<String>,
}

/// The API reports counts as decimal strings; plain numbers are accepted as well.
/// An empty string counts as 0, anything else that is not a number as `None`.
fn de_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Float(f64),
        Text(String),
    }

    Ok(match Count::deserialize(deserializer)? {
        Count::Number(n) => Some(n),
        Count::Float(f) if f.is_finite() && f >= 0.0 => Some(f as u64),
        Count::Float(_) => None,
        Count::Text(s) if s.trim().is_empty() => Some(0),
        Count::Text(s) => s.trim().parse().ok(),
    })
}

pub fn parse_statewise(url: &str, body: &[u8]) -> Result<Vec<RegionStat>, FetchError> {
    let response: StatewiseResponse =
        serde_json::from_slice(body).map_err(|source| FetchError::Payload {
            url: url.to_string(),
            source,
        })?;

    Ok(response
        .statewise
        .into_iter()
        .map(|r| RegionStat {
            code: r.statecode,
            name: r.state,
            active: r.active,
            confirmed: r.confirmed,
            deaths: r.deaths,
            recovered: r.recovered,
        })
        .collect())
}

/// Drops every record whose `totaltested` is empty or missing.
pub fn parse_state_tests(url: &str, body: &[u8]) -> Result<Vec<RegionTestStat>, FetchError> {
    let response: StateTestResponse =
        serde_json::from_slice(body).map_err(|source| FetchError::Payload {
            url: url.to_string(),
            source,
        })?;

    Ok(response
        .states_tested_data
        .into_iter()
        .filter_map(|r| match r.totaltested {
            Some(tested) if !tested.is_empty() => Some(RegionTestStat {
                name: r.state,
                total_tested: tested,
            }),
            _ => None,
        })
        .collect())
}

pub struct Fetcher {
    client: reqwest::Client,
    sources: SourcesConfig,
}

impl Fetcher {
    pub fn new(sources: SourcesConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            sources,
        }
    }

    /// Issues both GETs concurrently. Either failing fails the whole load.
    pub async fn fetch(&self) -> Result<Datasets, FetchError> {
        info!(
            stats = %self.sources.stats_url,
            tests = %self.sources.tests_url,
            "fetching regional datasets"
        );

        let (stats_body, tests_body) = tokio::try_join!(
            self.get(&self.sources.stats_url),
            self.get(&self.sources.tests_url)
        )?;

        let stats = parse_statewise(&self.sources.stats_url, &stats_body)?;
        let tests = parse_state_tests(&self.sources.tests_url, &tests_body)?;
        info!(stats = stats.len(), tests = tests.len(), "datasets loaded");

        Ok(Datasets { stats, tests })
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let request_error = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(request_error)?;
        debug!(url, bytes = body.len(), "response received");
        Ok(body.to_vec())
    }
}
