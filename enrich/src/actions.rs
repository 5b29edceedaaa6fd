use crate::notify::Notifier;
use crate::state::SessionState;
use client::{ResultsService, Test, TestQuery};
use tracing::debug;

const NOT_MODIFIED: u16 = 304;

/// Deletes every currently selected test. With nothing selected the user is
/// warned and no request is made. On success the table is marked stale so
/// the next render re-fetches.
pub async fn delete_selected<S: ResultsService>(
    service: &S,
    notifier: &dyn Notifier,
    state: &mut SessionState,
) -> bool {
    let selected = state.selected_ids().to_vec();
    if selected.is_empty() {
        notifier.warning("No selected tests to delete!");
        return false;
    }

    debug!("deleting {} selected tests", selected.len());
    match service
        .delete_tests(&TestQuery::new().with_ids(selected))
        .await
    {
        Ok(status) if status == NOT_MODIFIED => {
            notifier.warning("No tests were deleted");
            state.request_refresh();
            false
        }
        Ok(_) => {
            notifier.success("Tests deleted successfully");
            state.request_refresh();
            true
        }
        Err(e) => {
            notifier.warning(&format!("Failed to delete tests: {}", e));
            false
        }
    }
}

/// Applies an enrichment patch to every currently selected test. The 304
/// outcome ("nothing needed changing") is surfaced distinctly from both
/// success and failure.
pub async fn enrich_selected<S: ResultsService>(
    service: &S,
    notifier: &dyn Notifier,
    state: &mut SessionState,
    patch: &Test,
) -> bool {
    let selected = state.selected_ids().to_vec();
    if selected.is_empty() {
        notifier.warning("No selected tests to enrich!");
        return false;
    }

    debug!("enriching {} selected tests", selected.len());
    match service
        .enrich_tests(patch, &TestQuery::new().with_ids(selected))
        .await
    {
        Ok(status) if status == NOT_MODIFIED => {
            notifier.warning("No tests were modified");
            false
        }
        Ok(_) => {
            notifier.success("Tests enriched successfully");
            state.request_refresh();
            true
        }
        Err(e) => {
            notifier.warning(&format!("Failed to enrich tests: {}", e));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::RecordingNotifier;
    use async_trait::async_trait;
    use client::{ClientError, ClientResult, Outcome, TestQueryResult};
    use std::sync::Mutex;

    /// Scripted service that records the queries it receives.
    struct ScriptedService {
        bulk_status: Result<u16, String>,
        queries: Mutex<Vec<TestQuery>>,
    }

    impl ScriptedService {
        fn returning(bulk_status: Result<u16, String>) -> Self {
            Self {
                bulk_status,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn bulk_result(&self, query: &TestQuery) -> ClientResult<u16> {
            self.queries.lock().unwrap().push(query.clone());
            self.bulk_status.clone().map_err(ClientError::service)
        }
    }

    #[async_trait]
    impl ResultsService for ScriptedService {
        async fn add_test(&self, _test: &Test) -> ClientResult<u64> {
            Ok(1)
        }

        async fn health(&self) -> bool {
            true
        }

        async fn query_token(&self, query: &TestQuery) -> ClientResult<String> {
            query.encode()
        }

        async fn get_tests(
            &self,
            _query: Option<&TestQuery>,
            _offset: u32,
            _limit: u32,
        ) -> ClientResult<TestQueryResult> {
            Ok(TestQueryResult {
                count: 0,
                tests: Vec::new(),
            })
        }

        async fn enrich_tests(&self, _patch: &Test, query: &TestQuery) -> ClientResult<u16> {
            self.bulk_result(query)
        }

        async fn delete_tests(&self, query: &TestQuery) -> ClientResult<u16> {
            self.bulk_result(query)
        }
    }

    #[tokio::test]
    async fn test_delete_with_empty_selection_sends_nothing() {
        let service = ScriptedService::returning(Ok(200));
        let notifier = RecordingNotifier::default();
        let mut state = SessionState::new();

        assert!(!delete_selected(&service, &notifier, &mut state).await);
        assert!(service.queries.lock().unwrap().is_empty());
        assert_eq!(
            notifier.warnings.borrow().as_slice(),
            &["No selected tests to delete!"]
        );
    }

    #[tokio::test]
    async fn test_delete_selected_addresses_ids() {
        let service = ScriptedService::returning(Ok(200));
        let notifier = RecordingNotifier::default();
        let mut state = SessionState::new();
        state.set_selection(vec![1, 14]);
        state.take_refresh();

        assert!(delete_selected(&service, &notifier, &mut state).await);
        assert_eq!(
            service.queries.lock().unwrap().as_slice(),
            &[TestQuery::new().with_ids(vec![1, 14])]
        );
        assert_eq!(
            notifier.successes.borrow().as_slice(),
            &["Tests deleted successfully"]
        );
        // The next render must re-fetch.
        assert!(state.take_refresh());
    }

    #[tokio::test]
    async fn test_delete_not_modified_warns() {
        let service = ScriptedService::returning(Ok(304));
        let notifier = RecordingNotifier::default();
        let mut state = SessionState::new();
        state.set_selection(vec![999]);

        assert!(!delete_selected(&service, &notifier, &mut state).await);
        assert_eq!(
            notifier.warnings.borrow().as_slice(),
            &["No tests were deleted"]
        );
    }

    #[tokio::test]
    async fn test_delete_failure_notifies_and_abandons() {
        let service = ScriptedService::returning(Err("scripted failure".to_string()));
        let notifier = RecordingNotifier::default();
        let mut state = SessionState::new();
        state.set_selection(vec![1]);
        state.take_refresh();

        assert!(!delete_selected(&service, &notifier, &mut state).await);
        // One attempt, no retry.
        assert_eq!(service.queries.lock().unwrap().len(), 1);
        assert!(notifier.warnings.borrow()[0].contains("scripted failure"));
        assert!(!state.take_refresh());
    }

    #[tokio::test]
    async fn test_enrich_selected_flow() {
        let service = ScriptedService::returning(Ok(200));
        let notifier = RecordingNotifier::default();
        let mut state = SessionState::new();
        state.set_selection(vec![14]);

        let patch = Test::new("User service load test", Outcome::Passed);
        assert!(enrich_selected(&service, &notifier, &mut state, &patch).await);
        assert_eq!(
            service.queries.lock().unwrap().as_slice(),
            &[TestQuery::new().with_ids(vec![14])]
        );
    }

    #[tokio::test]
    async fn test_enrich_not_modified_is_distinct() {
        let service = ScriptedService::returning(Ok(304));
        let notifier = RecordingNotifier::default();
        let mut state = SessionState::new();
        state.set_selection(vec![14]);

        let patch = Test::new("User service load test", Outcome::Passed);
        assert!(!enrich_selected(&service, &notifier, &mut state, &patch).await);
        assert!(notifier.successes.borrow().is_empty());
        assert_eq!(
            notifier.warnings.borrow().as_slice(),
            &["No tests were modified"]
        );
    }
}
