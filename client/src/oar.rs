use crate::config::ServiceConfig;
use crate::query::TestQuery;
use crate::service::{ClientError, ClientResult, ErrorBody, ResultsService};
use crate::types::{Test, TestQueryResult, TestRecord};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

const TEST_ENDPOINT: &str = "/test";
const TESTS_ENDPOINT: &str = "/tests";
const QUERY_ENDPOINT: &str = "/query";
const HEALTH_ENDPOINT: &str = "/health";

/// List response as it comes off the wire, before the doc bags are merged
/// into the top level.
#[derive(Deserialize)]
struct RawQueryResult {
    count: u64,
    tests: Vec<Test>,
}

/// HTTP client for the OAR results service.
///
/// Requests deliberately carry no timeout and are never retried; a hung
/// request hangs its caller. Operations triggered concurrently may complete
/// out of order, and nothing here guards against that.
pub struct OarClient {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl OarClient {
    pub fn new(config: ServiceConfig) -> ClientResult<Self> {
        config
            .validate()
            .map_err(|msg| ClientError::InvalidConfig { message: msg })?;

        let client = reqwest::Client::builder().build()?;

        Ok(Self { client, config })
    }

    pub fn with_default_config() -> ClientResult<Self> {
        Self::new(ServiceConfig::default())
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn default_limit(&self) -> u32 {
        self.config.default_limit
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url, endpoint)
    }

    /// Decodes the `{error}` body the service attaches to every non-success
    /// response, falling back to the status line when the body is not
    /// decodable.
    async fn error_from_response(response: reqwest::Response) -> ClientError {
        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(body) => ClientError::service(body.error),
            Err(_) => ClientError::service(format!("service returned {}", status)),
        }
    }

    /// Shared tail of the bulk enrich/delete operations: 200 and 304 are
    /// both surfaced as the raw status code, everything else is an error.
    async fn bulk_status(response: reqwest::Response) -> ClientResult<u16> {
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_MODIFIED {
            Ok(status.as_u16())
        } else {
            Err(Self::error_from_response(response).await)
        }
    }
}

#[async_trait]
impl ResultsService for OarClient {
    async fn add_test(&self, test: &Test) -> ClientResult<u64> {
        debug!("adding test: {}", test.summary);

        let response = self
            .client
            .post(self.url(TEST_ENDPOINT))
            .json(test)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            error!("error occurred when adding test: {}", err);
            return Err(err);
        }

        let test_id = response.json::<u64>().await?;
        info!("added test {}", test_id);
        Ok(test_id)
    }

    async fn health(&self) -> bool {
        debug!("performing health check");

        match self.client.get(self.url(HEALTH_ENDPOINT)).send().await {
            Ok(response) => {
                let healthy = response.status().is_success();
                if healthy {
                    info!("health check passed");
                } else {
                    warn!("health check failed with status: {}", response.status());
                }
                healthy
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                false
            }
        }
    }

    async fn query_token(&self, query: &TestQuery) -> ClientResult<String> {
        debug!("requesting query token from service");

        let response = self
            .client
            .post(self.url(QUERY_ENDPOINT))
            .json(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            error!("error occurred when querying: {}", err);
            return Err(err);
        }

        let token = response.json::<String>().await?;
        info!("obtained query token");
        Ok(token)
    }

    async fn get_tests(
        &self,
        query: Option<&TestQuery>,
        offset: u32,
        limit: u32,
    ) -> ClientResult<TestQueryResult> {
        debug!("getting tests (offset: {}, limit: {})", offset, limit);

        let mut request = self
            .client
            .get(self.url(TESTS_ENDPOINT))
            .query(&[("offset", offset.to_string()), ("limit", limit.to_string())]);

        if let Some(query) = query {
            request = request.query(&[("query", query.encode()?)]);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            error!("error occurred when getting tests: {}", err);
            return Err(err);
        }

        let raw: RawQueryResult = response.json().await?;
        info!("retrieved {} of {} matching tests", raw.tests.len(), raw.count);

        let tests = raw.tests.into_iter().map(TestRecord::from).collect();
        Ok(TestQueryResult {
            count: raw.count,
            tests,
        })
    }

    async fn enrich_tests(&self, patch: &Test, query: &TestQuery) -> ClientResult<u16> {
        debug!("enriching tests matching query");

        let response = self
            .client
            .patch(self.url(TESTS_ENDPOINT))
            .query(&[("query", query.encode()?)])
            .json(patch)
            .send()
            .await?;

        let status = Self::bulk_status(response).await.map_err(|e| {
            error!("error occurred when enriching tests: {}", e);
            e
        })?;

        info!("enrich completed with status {}", status);
        Ok(status)
    }

    async fn delete_tests(&self, query: &TestQuery) -> ClientResult<u16> {
        debug!("deleting tests matching query");

        let response = self
            .client
            .delete(self.url(TESTS_ENDPOINT))
            .query(&[("query", query.encode()?)])
            .send()
            .await?;

        let status = Self::bulk_status(response).await.map_err(|e| {
            error!("error occurred when deleting tests: {}", e);
            e
        })?;

        info!("delete completed with status {}", status);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OarClient::with_default_config();
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = ServiceConfig::new().with_base_url("");
        assert!(matches!(
            OarClient::new(config),
            Err(ClientError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_url_joining() {
        let client =
            OarClient::new(ServiceConfig::new().with_base_url("http://oar.internal:8080/"))
                .unwrap();
        assert_eq!(client.url(TESTS_ENDPOINT), "http://oar.internal:8080/tests");
    }

    #[test]
    fn test_raw_result_decodes_without_doc() {
        let raw: RawQueryResult = serde_json::from_str(
            r#"{"count": 1, "tests": [{"id": 5, "summary": "s", "outcome": "Passed"}]}"#,
        )
        .unwrap();
        assert_eq!(raw.count, 1);
        assert_eq!(raw.tests[0].id, 5);
    }
}
