use crate::notify::Notifier;
use crate::state::SessionState;
use client::{ResultsService, TestQuery, TestRecord};
use serde_json::Value;
use tracing::debug;

/// Page size used by the table; anything past it needs an explicit offset.
pub const PAGE_LIMIT: u32 = 250;

/// Fetches the first page of tests matching `query` and projects each one
/// down to the field values named by `headers`, in header order. Headers are
/// matched against field names case-insensitively; unknown headers render
/// empty. On any client error the user is notified and the table is empty.
pub async fn test_table<S: ResultsService>(
    service: &S,
    notifier: &dyn Notifier,
    query: Option<&TestQuery>,
    headers: &[String],
) -> Vec<Vec<String>> {
    let result = match service.get_tests(query, 0, PAGE_LIMIT).await {
        Ok(result) => result,
        Err(e) => {
            notifier.warning(&format!("Failed to fetch tests: {}", e));
            return Vec::new();
        }
    };

    debug!("projecting {} tests onto {} columns", result.tests.len(), headers.len());
    result
        .tests
        .iter()
        .map(|record| project_row(record, headers))
        .collect()
}

/// Re-fetches the table for the session's active query and columns. A
/// refresh resets the selection, exactly like a full table reload in the
/// frontend.
pub async fn refresh<S: ResultsService>(
    service: &S,
    notifier: &dyn Notifier,
    state: &mut SessionState,
) -> Vec<Vec<String>> {
    let query = state.active_query().cloned();
    let headers = state.columns().to_vec();

    let rows = test_table(service, notifier, query.as_ref(), &headers).await;
    state.clear_selection();
    rows
}

fn project_row(record: &TestRecord, headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|header| {
            record
                .get_ignore_case(header)
                .map(display_value)
                .unwrap_or_default()
        })
        .collect()
}

/// Strings render bare; everything else renders as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Title-cases a header for display ("test owner" -> "Test Owner").
pub fn to_title_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.to_lowercase().chars() {
        if at_word_start && c.is_alphanumeric() {
            result.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            if c.is_whitespace() {
                at_word_start = true;
            }
            result.push(c);
        }
    }
    result
}

/// Formats headers and rows as an aligned text table.
pub fn render(headers: &[String], rows: &[Vec<String>]) -> String {
    let display_headers: Vec<String> = headers.iter().map(|h| to_title_case(h)).collect();

    let mut widths: Vec<usize> = display_headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let format_line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_line(&display_headers)];
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(format_line(row));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::RecordingNotifier;
    use async_trait::async_trait;
    use client::{ClientError, ClientResult, Outcome, Test, TestQueryResult};
    use serde_json::json;

    struct FixedService {
        tests: Vec<Test>,
        fail: bool,
    }

    impl FixedService {
        fn with_tests(tests: Vec<Test>) -> Self {
            Self { tests, fail: false }
        }

        fn failing() -> Self {
            Self {
                tests: Vec::new(),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl ResultsService for FixedService {
        async fn add_test(&self, _test: &Test) -> ClientResult<u64> {
            Ok(1)
        }

        async fn health(&self) -> bool {
            !self.fail
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
            if self.fail {
                return Err(ClientError::service("tests are unreachable"));
            }
            Ok(TestQueryResult {
                count: self.tests.len() as u64,
                tests: self.tests.iter().cloned().map(TestRecord::from).collect(),
            })
        }

        async fn enrich_tests(&self, _patch: &Test, _query: &TestQuery) -> ClientResult<u16> {
            Ok(200)
        }

        async fn delete_tests(&self, _query: &TestQuery) -> ClientResult<u16> {
            Ok(200)
        }
    }

    fn sample_test() -> Test {
        let mut test = Test::new("User service load test", Outcome::Passed)
            .with_doc_field("owner", json!("Sandy Cheeks"))
            .with_doc_field("maxRPS", json!(300));
        test.id = 14;
        test
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_projects_fields_in_header_order() {
        let service = FixedService::with_tests(vec![sample_test()]);
        let notifier = RecordingNotifier::default();

        let rows = test_table(
            &service,
            &notifier,
            None,
            &headers(&["id", "summary"]),
        )
        .await;

        assert_eq!(rows, vec![vec!["14".to_string(), "User service load test".to_string()]]);
        assert!(notifier.warnings.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_headers_match_case_insensitively() {
        let service = FixedService::with_tests(vec![sample_test()]);
        let notifier = RecordingNotifier::default();

        let rows = test_table(&service, &notifier, None, &headers(&["Summary", "OUTCOME"])).await;
        assert_eq!(
            rows,
            vec![vec!["User service load test".to_string(), "Passed".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_doc_fields_are_projectable() {
        let service = FixedService::with_tests(vec![sample_test()]);
        let notifier = RecordingNotifier::default();

        let rows = test_table(&service, &notifier, None, &headers(&["owner", "maxRPS"])).await;
        assert_eq!(
            rows,
            vec![vec!["Sandy Cheeks".to_string(), "300".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_unknown_headers_render_empty() {
        let service = FixedService::with_tests(vec![sample_test()]);
        let notifier = RecordingNotifier::default();

        let rows = test_table(&service, &notifier, None, &headers(&["id", "no such field"])).await;
        assert_eq!(rows, vec![vec!["14".to_string(), String::new()]]);
    }

    #[tokio::test]
    async fn test_error_notifies_and_returns_empty_table() {
        let service = FixedService::failing();
        let notifier = RecordingNotifier::default();

        let rows = test_table(&service, &notifier, None, &headers(&["id"])).await;
        assert!(rows.is_empty());

        let warnings = notifier.warnings.borrow();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("tests are unreachable"));
    }

    #[tokio::test]
    async fn test_refresh_resets_selection() {
        let service = FixedService::with_tests(vec![sample_test()]);
        let notifier = RecordingNotifier::default();
        let mut state = SessionState::new();
        state.set_selection(vec![14]);

        let rows = refresh(&service, &notifier, &mut state).await;
        assert_eq!(rows.len(), 1);
        assert!(state.selected_ids().is_empty());
    }

    #[test]
    fn test_to_title_case() {
        assert_eq!(to_title_case("summary"), "Summary");
        assert_eq!(to_title_case("test owner"), "Test Owner");
        assert_eq!(to_title_case("MAXRPS"), "Maxrps");
    }

    #[test]
    fn test_render_aligns_columns() {
        let rendered = render(
            &headers(&["id", "summary"]),
            &[
                vec!["14".to_string(), "User service load test".to_string()],
                vec!["9".to_string(), "short".to_string()],
            ],
        );

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Id  Summary");
        assert!(lines[1].starts_with("--"));
        assert!(lines[2].starts_with("14  User service load test"));
        assert!(lines[3].starts_with("9 "));
    }
}
