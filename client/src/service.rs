use crate::query::TestQuery;
use crate::types::{Test, TestQueryResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire shape of a results-service failure. Every non-success response
/// carries this body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum ClientError {
    /// Error body returned by the results service, carried as-is.
    #[error("{message}")]
    Service { message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid query token: {0}")]
    InvalidToken(String),

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl ClientError {
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    /// Collapses any failure into the uniform `{error}` shape callers of
    /// the original frontend see. Transport and application failures are
    /// indistinguishable here on purpose.
    pub fn error_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// The single point of contact with the results service.
///
/// Implementations never panic on a failed request: every outcome is either
/// the operation's success payload or a [`ClientError`]. The bulk update and
/// delete operations surface the raw status code because 200 (changes
/// applied) and 304 (nothing to change) are both non-error outcomes the
/// caller must distinguish.
#[async_trait]
pub trait ResultsService: Send + Sync {
    /// Creates one new test record; returns its server-assigned id. At most
    /// one creation attempt is made per call.
    async fn add_test(&self, test: &Test) -> ClientResult<u64>;

    /// True iff the health endpoint answers with a success status. Never
    /// errors; an unreachable service is simply unhealthy.
    async fn health(&self) -> bool;

    /// Asks the service to encode `query` into its canonical token.
    async fn query_token(&self, query: &TestQuery) -> ClientResult<String>;

    /// Retrieves one page of matching tests with their doc bags merged into
    /// the top level. Callers wanting more than one page call again with a
    /// new offset; no pagination loop happens client-side.
    async fn get_tests(
        &self,
        query: Option<&TestQuery>,
        offset: u32,
        limit: u32,
    ) -> ClientResult<TestQueryResult>;

    /// Right-merges `patch` onto every record matching `query`. 200 means at
    /// least one record was modified, 304 means none were.
    async fn enrich_tests(&self, patch: &Test, query: &TestQuery) -> ClientResult<u16>;

    /// Deletes every record matching `query`. Same 200/304 contract as
    /// [`ResultsService::enrich_tests`].
    async fn delete_tests(&self, query: &TestQuery) -> ClientResult<u16>;
}
