use std::{collections::HashMap, sync::Mutex, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors emitted while calling the match endpoint.
///
/// Callers treat every variant the same way: the batch yielded zero
/// candidates. No variant aborts a run.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Network or transport failure, including timeouts.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-success HTTP status, with whatever body the service returned.
    #[error("service returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for the log.
        body: String,
    },
    /// Response body that was not the expected JSON shape.
    #[error("unparseable response body: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Request body for the TNRS match endpoint. Approximate matching is always
/// requested and verbose output always suppressed.
#[derive(Debug, Serialize)]
struct MatchRequest<'a> {
    names: &'a [String],
    do_approximate_matching: bool,
    verbose: bool,
}

impl<'a> MatchRequest<'a> {
    fn new(names: &'a [String]) -> Self {
        Self {
            names,
            do_approximate_matching: true,
            verbose: false,
        }
    }
}

/// Taxon payload of a single match candidate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonRecord {
    /// Canonical unique name of the taxon.
    #[serde(default)]
    pub unique_name: Option<String>,
    /// Alternate names recorded for the taxon.
    #[serde(default)]
    pub synonyms: Vec<String>,
    /// Stable Open Tree identifier.
    #[serde(default)]
    pub ott_id: Option<u64>,
    /// Taxonomic rank, e.g. "species" or "genus".
    #[serde(default)]
    pub rank: Option<String>,
}

/// One ranked match candidate for a queried name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchCandidate {
    /// Whether the service flagged this as a fuzzy match.
    #[serde(default)]
    pub is_approximate_match: bool,
    /// Whether the query matched via a known synonym.
    #[serde(default)]
    pub is_synonym: bool,
    /// The matched taxon.
    #[serde(default)]
    pub taxon: TaxonRecord,
}

/// Candidates returned for a single queried name.
#[derive(Debug, Clone, Deserialize)]
pub struct NameResult {
    /// The query string exactly as submitted.
    pub name: String,
    /// Candidates ranked by the service; the first is the best.
    #[serde(default)]
    pub matches: Vec<MatchCandidate>,
}

/// Parsed response for one batch of names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchResponse {
    /// One entry per submitted name the service recognized.
    #[serde(default)]
    pub results: Vec<NameResult>,
}

/// Seam between the cascade and the external matching service.
#[async_trait]
pub trait MatchService: Send + Sync {
    /// Submits one batch of distinct names and returns the parsed candidates.
    async fn resolve_batch(&self, names: &[String]) -> Result<BatchResponse, ServiceError>;
}

/// HTTP client for the live TNRS endpoint.
pub struct HttpMatchService {
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl HttpMatchService {
    /// Builds a client for the given endpoint, with a per-call timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder().user_agent("taxo-resolve/0.1").build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
            timeout,
        })
    }
}

#[async_trait]
impl MatchService for HttpMatchService {
    async fn resolve_batch(&self, names: &[String]) -> Result<BatchResponse, ServiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&MatchRequest::new(names))
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(ServiceError::Decode)
    }
}

/// Scripted service used by cascade tests and offline runs.
///
/// Candidates are keyed by exact query string; unknown queries yield zero
/// candidates. Every submitted batch is recorded so tests can assert how
/// many queries were actually issued.
#[derive(Default)]
pub struct ScriptedMatchService {
    responses: HashMap<String, Vec<MatchCandidate>>,
    batches: Mutex<Vec<Vec<String>>>,
    failing: bool,
}

impl ScriptedMatchService {
    /// Creates an empty script: every query misses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Registers the candidate list returned for a query string.
    #[must_use]
    pub fn with_candidates(
        mut self,
        query: impl Into<String>,
        candidates: Vec<MatchCandidate>,
    ) -> Self {
        self.responses.insert(query.into(), candidates);
        self
    }

    /// Returns every batch submitted so far, in call order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MatchService for ScriptedMatchService {
    async fn resolve_batch(&self, names: &[String]) -> Result<BatchResponse, ServiceError> {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(names.to_vec());
        }
        if self.failing {
            return Err(ServiceError::Status {
                status: 503,
                body: "scripted failure".into(),
            });
        }
        let results = names
            .iter()
            .map(|name| NameResult {
                name: name.clone(),
                matches: self.responses.get(name).cloned().unwrap_or_default(),
            })
            .collect();
        Ok(BatchResponse { results })
    }
}
