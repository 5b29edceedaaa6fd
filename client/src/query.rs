use crate::service::{ClientError, ClientResult};
use crate::types::{Analysis, Outcome, Resolution};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A filter specification for existing tests. Every field is independently
/// optional; an absent field imposes no constraint, so the empty query
/// matches everything. Multiple values within one list OR together, multiple
/// fields AND together (both enforced by the results service).
///
/// The `docs` matchers partially match against each record's doc bag.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summaries: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<Vec<Outcome>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyses: Option<Vec<Analysis>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolutions: Option<Vec<Resolution>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_before: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_after: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<Vec<Map<String, Value>>>,
}

impl TestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(mut self, ids: Vec<u64>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_summaries(mut self, summaries: Vec<String>) -> Self {
        self.summaries = Some(summaries);
        self
    }

    pub fn with_outcomes(mut self, outcomes: Vec<Outcome>) -> Self {
        self.outcomes = Some(outcomes);
        self
    }

    pub fn with_analyses(mut self, analyses: Vec<Analysis>) -> Self {
        self.analyses = Some(analyses);
        self
    }

    pub fn with_resolutions(mut self, resolutions: Vec<Resolution>) -> Self {
        self.resolutions = Some(resolutions);
        self
    }

    pub fn with_doc_matcher(mut self, matcher: Map<String, Value>) -> Self {
        self.docs.get_or_insert_with(Vec::new).push(matcher);
        self
    }

    /// True when no constraint is set at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Encodes the query into the opaque token the bulk endpoints take as
    /// their `query` parameter: the JSON serialization, base64-encoded with
    /// the standard alphabet.
    ///
    /// The token is deterministic for a fixed field ordering. The `docs`
    /// matcher maps keep whatever key order they were built with, so two
    /// logically-equal queries assembled in different orders may encode to
    /// different tokens. The token contract only guarantees interop for
    /// ASCII payloads.
    pub fn encode(&self) -> ClientResult<String> {
        let json = serde_json::to_string(self)?;
        Ok(BASE64.encode(json))
    }

    /// Decodes a token produced by [`TestQuery::encode`] or by the service's
    /// `/query` endpoint.
    pub fn decode(token: &str) -> ClientResult<Self> {
        let bytes = BASE64
            .decode(token)
            .map_err(|e| ClientError::InvalidToken(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
